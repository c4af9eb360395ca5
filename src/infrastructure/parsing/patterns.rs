//! Regex fallbacks
//!
//! Every regular expression used during extraction lives here: price-like
//! key/value pairs inside inline scripts, currency amounts in page text and
//! meta-refresh targets. Structured queries go through `scraper` instead.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::price::{localize_price, parse_price};

/// Key/value pairs found in retailer state blobs, most specific first
static SCRIPT_PRICE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#""priceAmount"\s*:\s*"?([0-9][0-9,]*(?:\.[0-9]+)?)"#,
        r#""displayPrice"\s*:\s*"([^"]*[0-9][^"]*)""#,
        r#""finalPrice"\s*:\s*\{?\s*(?:"value"\s*:\s*)?"?([0-9][0-9,]*(?:\.[0-9]+)?)"#,
        r#""sellingPrice"\s*:\s*\{?\s*(?:"value"\s*:\s*)?"?([0-9][0-9,]*(?:\.[0-9]+)?)"#,
        r#""price"\s*:\s*"?([0-9][0-9,]*(?:\.[0-9]+)?)"#,
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Rupee amounts in visible text: "₹1,299", "Rs. 999", "INR 1,23,456.50"
static CURRENCY_AMOUNT: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?:₹|Rs\.?|INR)\s*([0-9]{1,3}(?:,[0-9]{2,3})+(?:\.[0-9]{1,2})?|[0-9]+(?:\.[0-9]{1,2})?)").ok()
});

static META_REFRESH_URL: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#"(?i)url\s*=\s*['"]?([^'"\s;]+)"#).ok());

/// First positive price in an inline script payload.
///
/// Values that already carry a currency marker are returned as found;
/// bare numbers are rendered as rupee strings.
pub fn find_script_price(script: &str) -> Option<String> {
    for pattern in SCRIPT_PRICE_PATTERNS.iter() {
        for captures in pattern.captures_iter(script) {
            let Some(raw) = captures.get(1).map(|m| m.as_str().trim()) else {
                continue;
            };
            if let Some(price) = localize_price(raw, "INR") {
                return Some(price);
            }
        }
    }
    None
}

/// First positive rupee amount in `text`, normalized to `₹<amount>`
pub fn find_currency_amount(text: &str) -> Option<String> {
    let regex = CURRENCY_AMOUNT.as_ref()?;
    regex
        .captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .map(|amount| format!("₹{}", amount.as_str()))
        .find(|candidate| parse_price(candidate).is_some_and(|v| v > 0.0))
}

/// Target of a `<meta http-equiv="refresh" content="0; url=...">`
pub fn meta_refresh_target(content: &str) -> Option<String> {
    META_REFRESH_URL
        .as_ref()?
        .captures(content)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_price_prefers_specific_keys() {
        let script = r#"window.state = {"price": 10, "priceAmount": 1299.0};"#;
        assert_eq!(find_script_price(script).as_deref(), Some("₹1,299"));
    }

    #[test]
    fn test_script_display_price_kept_verbatim() {
        let script = r#"{"displayPrice":"₹2,499.00","other":1}"#;
        assert_eq!(find_script_price(script).as_deref(), Some("₹2,499.00"));
    }

    #[test]
    fn test_script_nested_final_price() {
        let script = r#"{"pricing":{"finalPrice":{"value":54999,"currency":"INR"}}}"#;
        assert_eq!(find_script_price(script).as_deref(), Some("₹54,999"));
    }

    #[test]
    fn test_script_skips_zero_prices() {
        let script = r#"{"price": 0, "sellingPrice": 349}"#;
        assert_eq!(find_script_price(script).as_deref(), Some("₹349"));
        assert_eq!(find_script_price("var x = 1;"), None);
    }

    #[test]
    fn test_currency_amount_in_text() {
        assert_eq!(find_currency_amount("Deal of the day Rs. 1,499 only").as_deref(), Some("₹1,499"));
        assert_eq!(find_currency_amount("₹0 delivery, now ₹1,23,456").as_deref(), Some("₹1,23,456"));
        assert_eq!(find_currency_amount("INR 999.50").as_deref(), Some("₹999.50"));
        assert_eq!(find_currency_amount("no prices here"), None);
    }

    #[test]
    fn test_meta_refresh_target() {
        assert_eq!(
            meta_refresh_target("0; URL='https://www.amazon.in/dp/B0TEST'").as_deref(),
            Some("https://www.amazon.in/dp/B0TEST")
        );
        assert_eq!(meta_refresh_target("5"), None);
    }
}
