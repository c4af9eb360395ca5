//! Product image candidate discovery and filtering

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::debug;
use url::Url;

static IMG: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("img").ok());

/// Meta/link sources in lookup order: `(selector, attribute)`
static META_IMAGE: Lazy<Vec<(Selector, &'static str)>> = Lazy::new(|| {
    [
        ("meta[property='og:image']", "content"),
        ("link[rel='image_src']", "href"),
        ("meta[name='twitter:image']", "content"),
    ]
    .iter()
    .filter_map(|(css, attr)| Selector::parse(css).ok().map(|s| (s, *attr)))
    .collect()
});

const DENYLIST: &[&str] = &["placeholder", "logo", "icon", "banner", "sprite", "data:", "transparent-pixel"];
const EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp", ".gif", ".avif"];
const CDN_FRAGMENTS: &[&str] = &[
    "media-amazon.com",
    "images-amazon.com",
    "ssl-images-amazon",
    "rukminim",
    "flixcart.com/image",
];
const MIN_ABSOLUTE_LEN: usize = 30;

/// Candidate URLs carried by an `<img>`, in preference order
pub fn candidate_urls(element: ElementRef<'_>) -> Vec<String> {
    let attrs = element.value();
    let mut candidates = Vec::new();

    if let Some(hires) = attrs.attr("data-old-hires") {
        candidates.push(hires.to_string());
    }
    if let Some(dynamic) = attrs.attr("data-a-dynamic-image").and_then(largest_dynamic_image) {
        candidates.push(dynamic);
    }
    for name in ["data-src", "src"] {
        if let Some(value) = attrs.attr(name) {
            candidates.push(value.to_string());
        }
    }
    if let Some(first) = attrs
        .attr("srcset")
        .and_then(|srcset| srcset.split(',').next())
        .and_then(|entry| entry.split_whitespace().next())
    {
        candidates.push(first.to_string());
    }

    candidates.retain(|c| !c.trim().is_empty());
    candidates
}

/// `data-a-dynamic-image` maps URL to `[width, height]`; take the largest
fn largest_dynamic_image(raw: &str) -> Option<String> {
    let map: serde_json::Map<String, Value> = match serde_json::from_str(raw) {
        Ok(map) => map,
        Err(e) => {
            debug!("Ignoring unreadable data-a-dynamic-image: {}", e);
            return None;
        }
    };

    map.into_iter()
        .map(|(url, dims)| {
            let area = dims
                .as_array()
                .map(|d| d.iter().filter_map(Value::as_f64).product::<f64>())
                .unwrap_or(0.0);
            (url, area)
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(url, _)| url)
}

/// Whether a raw candidate looks like a real product image
pub fn is_acceptable(candidate: &str) -> bool {
    let lower = candidate.trim().to_lowercase();
    if lower.is_empty() || DENYLIST.iter().any(|bad| lower.contains(bad)) {
        return false;
    }

    let path = lower.split(['?', '#']).next().unwrap_or_default();
    EXTENSIONS.iter().any(|ext| path.ends_with(ext))
        || CDN_FRAGMENTS.iter().any(|cdn| lower.contains(cdn))
        || (lower.starts_with("http") && lower.len() >= MIN_ABSOLUTE_LEN)
}

/// Resolve `candidate` against `origin`
pub fn absolutize(candidate: &str, origin: &Url) -> Option<String> {
    match origin.join(candidate.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url.to_string()),
        Ok(url) => {
            debug!("Ignoring image with scheme {}: {}", url.scheme(), candidate);
            None
        }
        Err(e) => {
            debug!("Ignoring image candidate '{}': {}", candidate, e);
            None
        }
    }
}

fn first_acceptable<'a>(images: impl Iterator<Item = ElementRef<'a>>, origin: &Url) -> Option<String> {
    images
        .flat_map(candidate_urls)
        .filter(|c| is_acceptable(c))
        .find_map(|c| absolutize(&c, origin))
}

/// Images inside one product image container (the container may be the `<img>`)
pub fn from_container(html: &Html, container: &Selector, origin: &Url) -> Option<String> {
    let img = IMG.as_ref()?;
    html.select(container).find_map(|scope| {
        let own = scope.value().name().eq_ignore_ascii_case("img").then_some(scope);
        first_acceptable(own.into_iter().chain(scope.select(img)), origin)
    })
}

/// Every `<img>` in document order
pub fn from_document(html: &Html, origin: &Url) -> Option<String> {
    first_acceptable(html.select(IMG.as_ref()?), origin)
}

/// `og:image`, `link[rel=image_src]` and `twitter:image`
pub fn from_meta(html: &Html, origin: &Url) -> Option<String> {
    META_IMAGE.iter().find_map(|(selector, attr)| {
        html.select(selector)
            .filter_map(|el| el.value().attr(attr))
            .filter(|c| is_acceptable(c))
            .find_map(|c| absolutize(c, origin))
    })
}
