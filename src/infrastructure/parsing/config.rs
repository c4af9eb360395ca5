//! Parsing configuration for product page extraction
//!
//! Centralized CSS selectors per retailer. Each list is ordered: current
//! site markup first, legacy and alternate page variants later.

use serde::{Deserialize, Serialize};

use crate::domain::Retailer;

/// Selector sets for every supported retailer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub amazon: RetailerSelectors,
    pub flipkart: RetailerSelectors,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            amazon: RetailerSelectors::amazon(),
            flipkart: RetailerSelectors::flipkart(),
        }
    }
}

impl SelectorConfig {
    pub const fn for_retailer(&self, retailer: Retailer) -> &RetailerSelectors {
        match retailer {
            Retailer::Amazon => &self.amazon,
            Retailer::Flipkart => &self.flipkart,
        }
    }
}

/// CSS selectors for one retailer's product page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetailerSelectors {
    /// Elements whose text is the selling price
    pub price: Vec<String>,

    /// Elements whose text is the product title
    pub title: Vec<String>,

    /// Containers of the main product image, searched for `<img>` first
    pub image_container: Vec<String>,
}

impl RetailerSelectors {
    pub fn amazon() -> Self {
        Self {
            price: vec![
                "#corePriceDisplay_desktop_feature_div .a-price .a-offscreen".to_string(),
                "#corePrice_feature_div .a-price .a-offscreen".to_string(),
                ".apexPriceToPay .a-offscreen".to_string(),
                ".priceToPay .a-offscreen".to_string(),
                "#priceblock_dealprice".to_string(),
                "#priceblock_ourprice".to_string(),
                "#priceblock_saleprice".to_string(),
                "#price_inside_buybox".to_string(),
                "#newBuyBoxPrice".to_string(),
                "#kindle-price".to_string(),
                ".a-price .a-offscreen".to_string(),
                ".a-price-whole".to_string(),
            ],
            title: vec![
                "#productTitle".to_string(),
                "#title".to_string(),
                "h1#title span".to_string(),
                "#btAsinTitle".to_string(),
                "h1.a-size-large".to_string(),
            ],
            image_container: vec![
                "#imgTagWrapperId".to_string(),
                "#main-image-container".to_string(),
                "#imageBlock".to_string(),
                "#ebooksImageBlockContainer".to_string(),
                "#img-canvas".to_string(),
            ],
        }
    }

    pub fn flipkart() -> Self {
        Self {
            price: vec![
                "div.Nx9bqj.CxhGGd".to_string(),
                "div.hl05eU .Nx9bqj".to_string(),
                "div.Nx9bqj".to_string(),
                "div._30jeq3._16Jk6d".to_string(),
                "div._25b18c ._30jeq3".to_string(),
                "div._30jeq3".to_string(),
                "div._1vC4OE._3qQ9m1".to_string(),
            ],
            title: vec![
                "span.VU-ZEz".to_string(),
                "span.B_NuCI".to_string(),
                "h1._6EBuvT span".to_string(),
                "h1.yhB1nd".to_string(),
                "h1".to_string(),
            ],
            image_container: vec![
                "div._3kidJX".to_string(),
                "div.CXW8mj".to_string(),
                "div._8id3KM".to_string(),
                "div.vU5WPQ".to_string(),
                "div._1BweB8".to_string(),
            ],
        }
    }
}
