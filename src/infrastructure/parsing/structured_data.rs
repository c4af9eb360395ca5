//! Structured product metadata embedded in product pages
//!
//! Reads schema.org `Product` data from JSON-LD blocks and microdata
//! attributes. Malformed blocks are skipped.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

use crate::domain::price::localize_price;

static JSON_LD: Lazy<Option<Selector>> =
    Lazy::new(|| Selector::parse("script[type='application/ld+json']").ok());
static MICRODATA_PRICE: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("[itemprop='price']").ok());
static MICRODATA_CURRENCY: Lazy<Option<Selector>> =
    Lazy::new(|| Selector::parse("[itemprop='priceCurrency']").ok());

/// Fields of the first schema.org `Product` found in the page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredProduct {
    pub name: Option<String>,
    pub price: Option<String>,
    pub image: Option<String>,
}

/// Extract the first `Product` node from the page's JSON-LD blocks
pub fn extract_json_ld(html: &Html) -> Option<StructuredProduct> {
    let selector = JSON_LD.as_ref()?;

    for script in html.select(selector) {
        let raw = script.text().collect::<String>();
        let value: Value = match serde_json::from_str(raw.trim()) {
            Ok(value) => value,
            Err(e) => {
                debug!("Skipping malformed JSON-LD block: {}", e);
                continue;
            }
        };

        if let Some(product) = find_product_node(&value) {
            return Some(StructuredProduct {
                name: product
                    .get("name")
                    .and_then(Value::as_str)
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty()),
                price: product.get("offers").and_then(offer_price),
                image: product.get("image").and_then(image_value),
            });
        }
    }
    None
}

/// Price from `itemprop="price"` microdata (content attribute or text)
pub fn extract_microdata_price(html: &Html) -> Option<String> {
    let element = html.select(MICRODATA_PRICE.as_ref()?).next()?;
    let raw = element
        .value()
        .attr("content")
        .map(str::to_string)
        .unwrap_or_else(|| element.text().collect::<String>());
    let raw = raw.trim();

    let currency = MICRODATA_CURRENCY
        .as_ref()
        .and_then(|selector| html.select(selector).next())
        .and_then(|el| el.value().attr("content"))
        .unwrap_or("INR");

    localize_price(raw, currency)
}

fn find_product_node(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find_map(find_product_node),
        Value::Object(map) => {
            if is_product_type(map.get("@type")) {
                return Some(value);
            }
            map.get("@graph").and_then(find_product_node)
        }
        _ => None,
    }
}

fn is_product_type(kind: Option<&Value>) -> bool {
    match kind {
        Some(Value::String(s)) => s == "Product" || s.ends_with("/Product"),
        Some(Value::Array(kinds)) => kinds.iter().any(|k| is_product_type(Some(k))),
        _ => false,
    }
}

fn offer_price(offers: &Value) -> Option<String> {
    match offers {
        Value::Array(items) => items.iter().find_map(offer_price),
        Value::Object(map) => {
            let currency = map.get("priceCurrency").and_then(Value::as_str).unwrap_or("INR");
            ["price", "lowPrice"]
                .iter()
                .filter_map(|key| map.get(*key))
                .find_map(|price| match price {
                    Value::Number(n) => n.as_f64().and_then(|v| localize_price(&v.to_string(), currency)),
                    Value::String(s) => localize_price(s, currency),
                    _ => None,
                })
                .or_else(|| map.get("priceSpecification").and_then(offer_price))
        }
        _ => None,
    }
}

fn image_value(image: &Value) -> Option<String> {
    match image {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Array(items) => items.iter().find_map(image_value),
        Value::Object(map) => map
            .get("url")
            .or_else(|| map.get("contentUrl"))
            .and_then(image_value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(body: &str) -> Html {
        Html::parse_document(&format!("<html><head>{body}</head><body></body></html>"))
    }

    #[test]
    fn test_json_ld_product_with_offer() {
        let html = doc(r#"<script type="application/ld+json">
            {"@context":"https://schema.org","@type":"Product","name":"Steel Bottle",
             "image":["https://rukminim2.flixcart.com/image/bottle.jpeg"],
             "offers":{"@type":"Offer","price":"749","priceCurrency":"INR"}}
        </script>"#);
        let product = extract_json_ld(&html).unwrap();
        assert_eq!(product.name.as_deref(), Some("Steel Bottle"));
        assert_eq!(product.price.as_deref(), Some("₹749"));
        assert_eq!(product.image.as_deref(), Some("https://rukminim2.flixcart.com/image/bottle.jpeg"));
    }

    #[test]
    fn test_json_ld_graph_and_aggregate_offer() {
        let html = doc(r#"<script type="application/ld+json">
            {"@graph":[{"@type":"BreadcrumbList"},
              {"@type":["Product","Thing"],"name":"Mixer",
               "offers":[{"@type":"AggregateOffer","lowPrice":2399.5,"priceCurrency":"INR"}]}]}
        </script>"#);
        let product = extract_json_ld(&html).unwrap();
        assert_eq!(product.price.as_deref(), Some("₹2,399.50"));
        assert_eq!(product.image, None);
    }

    #[test]
    fn test_malformed_block_is_skipped() {
        let html = doc(r#"<script type="application/ld+json">{not json</script>
            <script type="application/ld+json">{"@type":"Product","name":"Lamp"}</script>"#);
        let product = extract_json_ld(&html).unwrap();
        assert_eq!(product.name.as_deref(), Some("Lamp"));
        assert_eq!(product.price, None);
    }

    #[test]
    fn test_no_product_node() {
        let html = doc(r#"<script type="application/ld+json">{"@type":"Organization"}</script>"#);
        assert_eq!(extract_json_ld(&html), None);
    }

    #[test]
    fn test_microdata_price() {
        let html = Html::parse_document(
            r#"<div itemscope><meta itemprop="priceCurrency" content="INR"><span itemprop="price" content="1299.00">₹1,299</span></div>"#,
        );
        assert_eq!(extract_microdata_price(&html).as_deref(), Some("₹1,299"));
    }
}
