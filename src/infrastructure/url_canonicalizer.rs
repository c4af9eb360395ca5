//! Product URL canonicalization
//!
//! Canonical URLs are the dedup key for tracked products: shortened links are
//! resolved to the product page and tracking noise is removed. Every step
//! fails open and hands back its input.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::domain::{Retailer, SiteVariant};
use crate::infrastructure::http_client::{FetchRequest, HtmlTransport};
use crate::infrastructure::parsing::patterns;

/// Query keys removed outright
const TRACKING_PARAMS: &[&str] = &[
    "ref",
    "ref_",
    "tag",
    "linkcode",
    "linkid",
    "creative",
    "creativeasin",
    "ascsubtag",
    "camp",
    "psc",
    "smid",
    "spla",
    "sprefix",
    "crid",
    "keywords",
    "qid",
    "sr",
    "th",
    "content-id",
    "dib",
    "dib_tag",
    "affid",
    "affextparam1",
    "affextparam2",
    "otracker",
    "otracker1",
    "iid",
    "ssid",
    "lid",
    "marketplace",
    "store",
    "srno",
    "fm",
    "ppt",
    "ppn",
    "cmpid",
    "fbclid",
    "gclid",
    "msclkid",
    "igshid",
    "_encoding",
];

/// Query key prefixes removed (campaign families)
const TRACKING_PREFIXES: &[&str] = &["utm_", "pf_rd_", "pd_rd_"];

static CANONICAL_LINK: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("link[rel='canonical']").ok());
static META_REFRESH: Lazy<Option<Selector>> =
    Lazy::new(|| Selector::parse("meta[http-equiv='refresh'], meta[http-equiv='Refresh']").ok());

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    TRACKING_PARAMS.contains(&key.as_str()) || TRACKING_PREFIXES.iter().any(|prefix| key.starts_with(prefix))
}

/// Map Flipkart app deep links, strip tracking query parameters, Amazon
/// `/ref=` path segments and the fragment. Unparseable input is returned
/// unchanged.
pub fn normalize_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw.trim()) else {
        debug!("Leaving unparseable URL as is: {}", raw);
        return raw.to_string();
    };

    let segments: Vec<&str> = url.path().split('/').collect();
    if segments.iter().any(|s| s.starts_with("ref=")) {
        let path = segments
            .iter()
            .filter(|s| !s.starts_with("ref="))
            .copied()
            .collect::<Vec<_>>()
            .join("/");
        url.set_path(&path);
    }

    if Retailer::is_deep_link(&url) {
        let desktop = Retailer::Flipkart.variant_url(url.as_str(), SiteVariant::Desktop);
        if let Ok(parsed) = Url::parse(&desktop) {
            url = parsed;
        }
    }

    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    let kept: Vec<&(String, String)> = pairs.iter().filter(|(k, _)| !is_tracking_param(k)).collect();
    if kept.is_empty() {
        url.set_query(None);
    } else if kept.len() != pairs.len() {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    url.set_fragment(None);
    url.to_string()
}

/// Short-link resolution through the HTML transport
#[derive(Clone)]
pub struct UrlResolver {
    transport: Arc<dyn HtmlTransport>,
    max_redirects: usize,
    timeout: Duration,
}

impl UrlResolver {
    pub fn new(transport: Arc<dyn HtmlTransport>, max_redirects: usize, timeout: Duration) -> Self {
        Self {
            transport,
            max_redirects,
            timeout,
        }
    }

    /// `normalize_url(resolve_short_url(url))`
    pub async fn canonicalize(&self, url: &str) -> String {
        normalize_url(&self.resolve_short_url(url).await)
    }

    /// Expand a retailer short link; anything else is returned unchanged.
    ///
    /// Tries a HEAD probe along `Location` headers, then a redirect-following
    /// GET, then a canonical link or meta refresh in the returned markup.
    pub async fn resolve_short_url(&self, raw: &str) -> String {
        let Ok(start) = Url::parse(raw.trim()) else {
            return raw.to_string();
        };
        if !Retailer::is_short_link(&start) {
            return raw.to_string();
        }

        if let Some(resolved) = self.probe_redirects(&start).await {
            debug!("Resolved {} via redirect probe: {}", raw, resolved);
            return resolved.to_string();
        }
        if let Some(resolved) = self.follow_get(&start).await {
            debug!("Resolved {} via full fetch: {}", raw, resolved);
            return resolved.to_string();
        }

        warn!("Could not resolve short link, keeping original: {}", raw);
        raw.to_string()
    }

    /// Follow `Location` headers hop by hop without downloading bodies
    async fn probe_redirects(&self, start: &Url) -> Option<Url> {
        let mut current = start.clone();
        for _ in 0..self.max_redirects {
            let request = FetchRequest::head(current.as_str(), self.timeout);
            let response = match self.transport.send(&request).await {
                Ok(response) => response,
                Err(e) => {
                    debug!("Redirect probe failed for {}: {}", current, e);
                    return None;
                }
            };
            if !response.is_redirect() {
                break;
            }
            current = current.join(response.location()?).ok()?;
            if !Retailer::is_short_link(&current) {
                return Some(current);
            }
        }
        None
    }

    async fn follow_get(&self, start: &Url) -> Option<Url> {
        let request = FetchRequest::get(start.as_str(), self.timeout);
        let response = match self.transport.send(&request).await {
            Ok(response) => response,
            Err(e) => {
                debug!("Short link fetch failed for {}: {}", start, e);
                return None;
            }
        };

        let effective = Url::parse(&response.final_url).unwrap_or_else(|_| start.clone());
        if !Retailer::is_short_link(&effective) {
            return Some(effective);
        }
        markup_target(&response.body, &effective).filter(|target| !Retailer::is_short_link(target))
    }
}

/// `<link rel="canonical">` or `<meta http-equiv="refresh">` target
pub fn markup_target(body: &str, base: &Url) -> Option<Url> {
    let html = Html::parse_document(body);

    let canonical = CANONICAL_LINK
        .as_ref()
        .and_then(|selector| html.select(selector).find_map(|el| el.value().attr("href")))
        .map(str::to_string);
    let refresh = || {
        META_REFRESH
            .as_ref()
            .and_then(|selector| html.select(selector).find_map(|el| el.value().attr("content")))
            .and_then(patterns::meta_refresh_target)
    };

    let target = canonical.or_else(refresh)?;
    base.join(target.trim()).ok()
}
