//! Bot-challenge page detection

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use crate::infrastructure::parsing::cascade::document_text;

/// Phrases shown on CAPTCHA and robot-check interstitials
const TEXT_SIGNATURES: &[&str] = &[
    "captcha",
    "verify you are human",
    "unusual traffic",
    "robot check",
    "enter the characters you see below",
    "not a robot",
];

static MARKUP_SIGNATURES: Lazy<Vec<(&'static str, Selector)>> = Lazy::new(|| {
    [
        "form[action*='validateCaptcha']",
        "#captchacharacters",
        ".g-recaptcha",
        "iframe[src*='recaptcha']",
        "img[src*='captcha']",
    ]
    .iter()
    .filter_map(|css| Selector::parse(css).ok().map(|s| (*css, s)))
    .collect()
});

/// Which signature flagged the page, if any
pub fn block_signature(markup: &str) -> Option<String> {
    let html = Html::parse_document(markup);

    if let Some((css, _)) = MARKUP_SIGNATURES
        .iter()
        .find(|(_, selector)| html.select(selector).next().is_some())
    {
        return Some(format!("markup {css}"));
    }

    let text = document_text(&html).to_lowercase();
    TEXT_SIGNATURES
        .iter()
        .find(|phrase| text.contains(*phrase))
        .map(|phrase| format!("text \"{phrase}\""))
}

/// Whether `markup` is a bot challenge rather than a product page
pub fn is_block_page(markup: &str) -> bool {
    block_signature(markup).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amazon_robot_check() {
        let markup = r#"<html><head><title>Amazon.in</title></head><body>
            <h4>Enter the characters you see below</h4>
            <form method="get" action="/errors/validateCaptcha"><input id="captchacharacters"></form>
        </body></html>"#;
        assert!(is_block_page(markup));
    }

    #[test]
    fn test_text_only_challenge() {
        let markup = "<html><body><p>Our systems have detected Unusual Traffic from your network.</p></body></html>";
        assert_eq!(block_signature(markup).as_deref(), Some("text \"unusual traffic\""));
    }

    #[test]
    fn test_recaptcha_widget() {
        assert!(is_block_page(r#"<div class="g-recaptcha" data-sitekey="k"></div>"#));
    }

    #[test]
    fn test_product_page_is_not_blocked() {
        let markup = r#"<html><body><span id="productTitle">Echo Dot</span>
            <span class="a-offscreen">₹4,499</span></body></html>"#;
        assert!(!is_block_page(markup));
    }
}
