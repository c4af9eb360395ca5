//! Fetch strategy: browser identities, retry plan and paced page fetching
//!
//! A scrape walks an explicit [`RetryPlan`]. Every [`Attempt`] names the site
//! variant to request; the [`PageFetcher`] applies the pacing delay, picks a
//! fresh browser identity and sends the request through the transport.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::domain::{Retailer, SiteVariant};
use crate::infrastructure::config::ScrapingConfig;
use crate::infrastructure::http_client::{FetchError, FetchRequest, FetchResponse, HtmlTransport};

/// A realistic browser fingerprint: user agent plus matching client hints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowserIdentity {
    pub user_agent: &'static str,
    /// `Sec-CH-UA`; Safari and Firefox do not send client hints
    pub client_hints: Option<&'static str>,
    pub platform: &'static str,
    pub mobile: bool,
}

const DESKTOP_IDENTITIES: &[BrowserIdentity] = &[
    BrowserIdentity {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        client_hints: Some(r#""Chromium";v="124", "Google Chrome";v="124", "Not-A.Brand";v="99""#),
        platform: "\"Windows\"",
        mobile: false,
    },
    BrowserIdentity {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
        client_hints: Some(r#""Google Chrome";v="123", "Not:A-Brand";v="8", "Chromium";v="123""#),
        platform: "\"macOS\"",
        mobile: false,
    },
    BrowserIdentity {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
        client_hints: Some(r#""Chromium";v="124", "Microsoft Edge";v="124", "Not-A.Brand";v="99""#),
        platform: "\"Windows\"",
        mobile: false,
    },
    BrowserIdentity {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
        client_hints: None,
        platform: "\"macOS\"",
        mobile: false,
    },
    BrowserIdentity {
        user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
        client_hints: None,
        platform: "\"Linux\"",
        mobile: false,
    },
];

const MOBILE_IDENTITIES: &[BrowserIdentity] = &[
    BrowserIdentity {
        user_agent: "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Mobile Safari/537.36",
        client_hints: Some(r#""Chromium";v="124", "Google Chrome";v="124", "Not-A.Brand";v="99""#),
        platform: "\"Android\"",
        mobile: true,
    },
    BrowserIdentity {
        user_agent: "Mozilla/5.0 (Linux; Android 13; SM-S918B) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Mobile Safari/537.36",
        client_hints: Some(r#""Google Chrome";v="123", "Not:A-Brand";v="8", "Chromium";v="123""#),
        platform: "\"Android\"",
        mobile: true,
    },
    BrowserIdentity {
        user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
        client_hints: None,
        platform: "\"iOS\"",
        mobile: true,
    },
];

impl BrowserIdentity {
    pub const fn pool(variant: SiteVariant) -> &'static [Self] {
        match variant {
            SiteVariant::Desktop => DESKTOP_IDENTITIES,
            SiteVariant::Mobile => MOBILE_IDENTITIES,
        }
    }

    /// Uniformly random identity matching `variant`
    pub fn random(variant: SiteVariant) -> &'static Self {
        let pool = Self::pool(variant);
        &pool[fastrand::usize(..pool.len())]
    }

    /// Browser-like request headers for this identity
    pub fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![
            ("User-Agent".to_string(), self.user_agent.to_string()),
            (
                "Accept".to_string(),
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8".to_string(),
            ),
            ("Accept-Language".to_string(), "en-IN,en-GB;q=0.9,en-US;q=0.8,en;q=0.7".to_string()),
            ("Upgrade-Insecure-Requests".to_string(), "1".to_string()),
            ("Cache-Control".to_string(), "max-age=0".to_string()),
        ];
        if let Some(hints) = self.client_hints {
            headers.push(("Sec-CH-UA".to_string(), hints.to_string()));
            headers.push((
                "Sec-CH-UA-Mobile".to_string(),
                if self.mobile { "?1" } else { "?0" }.to_string(),
            ));
            headers.push(("Sec-CH-UA-Platform".to_string(), self.platform.to_string()));
        }
        headers
    }
}

/// One planned fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// 0 for the first try
    pub index: u32,
    pub variant: SiteVariant,
    pub is_last: bool,
}

/// Attempt 0 plus `max_retries` escalations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPlan {
    attempts: Vec<Attempt>,
}

impl RetryPlan {
    /// Retailers with a mobile variant alternate Mobile, Desktop, Mobile...;
    /// the rest stay on Desktop and only rotate identities.
    pub fn for_retailer(retailer: Retailer, max_retries: u32) -> Self {
        let attempts = (0..=max_retries)
            .map(|index| {
                let variant = if retailer.has_mobile_variant() && index % 2 == 0 {
                    SiteVariant::Mobile
                } else {
                    SiteVariant::Desktop
                };
                Attempt {
                    index,
                    variant,
                    is_last: index == max_retries,
                }
            })
            .collect();
        Self { attempts }
    }

    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }
}

/// Delays applied before each attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayPolicy {
    pub initial_min_ms: u64,
    pub initial_max_ms: u64,
    pub backoff_base_ms: u64,
}

impl DelayPolicy {
    pub const fn from_config(config: &ScrapingConfig) -> Self {
        Self {
            initial_min_ms: config.initial_delay_min_ms,
            initial_max_ms: config.initial_delay_max_ms,
            backoff_base_ms: config.retry_backoff_base_ms,
        }
    }

    /// Jitter before attempt 0, exponential backoff before retries
    pub fn delay_before(&self, attempt: &Attempt) -> Duration {
        if attempt.index == 0 {
            let max = self.initial_max_ms.max(self.initial_min_ms);
            Duration::from_millis(fastrand::u64(self.initial_min_ms..=max))
        } else {
            let factor = 2_u64.saturating_pow(attempt.index - 1);
            Duration::from_millis(self.backoff_base_ms.saturating_mul(factor))
        }
    }
}

/// Sends planned attempts through the transport
#[derive(Clone)]
pub struct PageFetcher {
    transport: Arc<dyn HtmlTransport>,
    delays: DelayPolicy,
    request_timeout: Duration,
}

impl PageFetcher {
    pub fn new(transport: Arc<dyn HtmlTransport>, config: &ScrapingConfig) -> Self {
        Self {
            transport,
            delays: DelayPolicy::from_config(config),
            request_timeout: config.request_timeout(),
        }
    }

    pub fn transport(&self) -> Arc<dyn HtmlTransport> {
        Arc::clone(&self.transport)
    }

    /// Fetch `url` as the attempt's site variant; non-success statuses are errors
    pub async fn fetch(&self, url: &str, retailer: Retailer, attempt: &Attempt) -> Result<FetchResponse, FetchError> {
        let delay = self.delays.delay_before(attempt);
        if !delay.is_zero() {
            debug!("Waiting {:?} before attempt {}", delay, attempt.index);
            tokio::time::sleep(delay).await;
        }

        let target = retailer.variant_url(url, attempt.variant);
        let identity = BrowserIdentity::random(attempt.variant);
        info!("🌐 HTTP GET (attempt {}, {}): {}", attempt.index, attempt.variant, target);

        let request = FetchRequest::get(target.as_str(), self.request_timeout).with_headers(identity.headers());
        let mut response = self.transport.send(&request).await?;
        if response.final_url.is_empty() {
            response.final_url = target;
        }
        response.into_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flipkart_plan_alternates_variants() {
        let plan = RetryPlan::for_retailer(Retailer::Flipkart, 2);
        let variants: Vec<_> = plan.attempts().iter().map(|a| a.variant).collect();
        assert_eq!(
            variants,
            vec![SiteVariant::Mobile, SiteVariant::Desktop, SiteVariant::Mobile]
        );
        assert_eq!(plan.attempts().iter().filter(|a| a.is_last).count(), 1);
        assert!(plan.attempts()[2].is_last);
    }

    #[test]
    fn test_amazon_plan_stays_on_desktop() {
        let plan = RetryPlan::for_retailer(Retailer::Amazon, 2);
        assert_eq!(plan.len(), 3);
        assert!(plan.attempts().iter().all(|a| a.variant == SiteVariant::Desktop));
    }

    #[test]
    fn test_zero_retries_is_single_last_attempt() {
        let plan = RetryPlan::for_retailer(Retailer::Amazon, 0);
        assert_eq!(
            plan.attempts(),
            &[Attempt {
                index: 0,
                variant: SiteVariant::Desktop,
                is_last: true
            }]
        );
    }

    #[test]
    fn test_delays() {
        let policy = DelayPolicy {
            initial_min_ms: 500,
            initial_max_ms: 2000,
            backoff_base_ms: 1000,
        };
        let plan = RetryPlan::for_retailer(Retailer::Amazon, 3);
        let first = policy.delay_before(&plan.attempts()[0]);
        assert!(first >= Duration::from_millis(500) && first <= Duration::from_millis(2000));
        assert_eq!(policy.delay_before(&plan.attempts()[1]), Duration::from_millis(1000));
        assert_eq!(policy.delay_before(&plan.attempts()[2]), Duration::from_millis(2000));
        assert_eq!(policy.delay_before(&plan.attempts()[3]), Duration::from_millis(4000));
    }

    #[test]
    fn test_identity_headers_match_variant() {
        for _ in 0..20 {
            let mobile = BrowserIdentity::random(SiteVariant::Mobile);
            assert!(mobile.mobile);
            let headers = mobile.headers();
            assert!(headers.iter().any(|(k, v)| k == "Accept-Language" && v.starts_with("en-IN")));
            if mobile.client_hints.is_some() {
                assert!(headers.iter().any(|(k, v)| k == "Sec-CH-UA-Mobile" && v == "?1"));
            }
            assert!(!BrowserIdentity::random(SiteVariant::Desktop).mobile);
        }
    }
}
