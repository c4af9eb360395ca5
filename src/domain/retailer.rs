//! Supported retailers and their site variants

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// A supported e-commerce site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Retailer {
    Amazon,
    Flipkart,
}

/// Rendering of a retailer's product page requested by a fetch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteVariant {
    Mobile,
    Desktop,
}

/// Shortener hosts per retailer
const AMAZON_SHORT_HOSTS: &[&str] = &["amzn.to", "amzn.in", "amzn.eu", "amzn.asia", "a.co"];
const FLIPKART_SHORT_HOSTS: &[&str] = &["fkrt.it", "fkrt.cc", "fkrt.to"];

/// Public suffixes Amazon marketplaces are served under
const AMAZON_SUFFIXES: &[&str] = &[
    "in", "com", "co.uk", "de", "fr", "it", "es", "nl", "se", "pl", "ca", "ae", "sa", "sg", "eg", "cn",
    "com.au", "co.jp", "com.br", "com.mx", "com.tr", "com.be",
];

/// Mobile deep-link host for Flipkart product pages
const FLIPKART_DEEP_LINK_HOST: &str = "dl.flipkart.com";

/// `amazon.<suffix>` or a subdomain of it
fn is_amazon_host(host: &str) -> bool {
    AMAZON_SUFFIXES.iter().any(|suffix| {
        let domain = format!("amazon.{suffix}");
        host == domain || host.ends_with(&format!(".{domain}"))
    })
}

impl Retailer {
    /// Classify a URL by hostname. Anything unparseable or unknown is `None`.
    pub fn classify(url: &str) -> Option<Self> {
        let parsed = Url::parse(url.trim()).ok()?;
        let host = parsed.host_str()?.to_ascii_lowercase();
        Self::classify_host(&host)
    }

    /// Classify a bare hostname
    pub fn classify_host(host: &str) -> Option<Self> {
        let host = host.trim_start_matches("www.");
        if AMAZON_SHORT_HOSTS.contains(&host) || is_amazon_host(host) {
            return Some(Self::Amazon);
        }
        if FLIPKART_SHORT_HOSTS.contains(&host)
            || host == "flipkart.com"
            || host.ends_with(".flipkart.com")
        {
            return Some(Self::Flipkart);
        }
        None
    }

    /// Whether `host` is a link shortener for any supported retailer.
    /// Flipkart's deep-link host only shortens under `/s/`.
    pub fn is_short_link(url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        let host = host.trim_start_matches("www.");
        AMAZON_SHORT_HOSTS.contains(&host)
            || FLIPKART_SHORT_HOSTS.contains(&host)
            || (host == FLIPKART_DEEP_LINK_HOST && url.path().starts_with("/s/"))
    }

    /// Whether `url` is a Flipkart app deep link (`dl.flipkart.com/dl/...`)
    pub fn is_deep_link(url: &Url) -> bool {
        url.host_str()
            .is_some_and(|host| host.eq_ignore_ascii_case(FLIPKART_DEEP_LINK_HOST))
            && (url.path() == "/dl" || url.path().starts_with("/dl/"))
    }

    /// Origin used to absolutize relative links found in markup
    pub const fn origin(self) -> &'static str {
        match self {
            Self::Amazon => "https://www.amazon.in",
            Self::Flipkart => "https://www.flipkart.com",
        }
    }

    /// Whether the retailer serves a lighter mobile rendering that is less
    /// aggressively bot-checked than the desktop domain
    pub const fn has_mobile_variant(self) -> bool {
        matches!(self, Self::Flipkart)
    }

    /// Rewrite `url` to request the given site variant.
    ///
    /// Only retailers with a mobile variant are rewritten; for the rest both
    /// variants map to the URL unchanged.
    pub fn variant_url(self, url: &str, variant: SiteVariant) -> String {
        if !self.has_mobile_variant() {
            return url.to_string();
        }
        let Ok(mut parsed) = Url::parse(url) else {
            return url.to_string();
        };

        match (self, variant) {
            (Self::Flipkart, SiteVariant::Mobile) => {
                if parsed.host_str() != Some(FLIPKART_DEEP_LINK_HOST) {
                    let path = format!("/dl{}", parsed.path());
                    if parsed.set_host(Some(FLIPKART_DEEP_LINK_HOST)).is_err() {
                        return url.to_string();
                    }
                    parsed.set_path(&path);
                }
            }
            (Self::Flipkart, SiteVariant::Desktop) => {
                if Self::is_deep_link(&parsed) {
                    let path = match parsed.path().strip_prefix("/dl") {
                        Some("") => "/".to_string(),
                        Some(rest) => rest.to_string(),
                        None => parsed.path().to_string(),
                    };
                    if parsed.set_host(Some("www.flipkart.com")).is_err() {
                        return url.to_string();
                    }
                    parsed.set_path(&path);
                }
            }
            (Self::Amazon, _) => {}
        }
        parsed.to_string()
    }
}

impl fmt::Display for Retailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Amazon => write!(f, "amazon"),
            Self::Flipkart => write!(f, "flipkart"),
        }
    }
}

impl fmt::Display for SiteVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mobile => write!(f, "mobile"),
            Self::Desktop => write!(f, "desktop"),
        }
    }
}
