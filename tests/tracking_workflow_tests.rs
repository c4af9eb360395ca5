//! End-to-end tracking workflows over a mocked HTML transport
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use price_tracker_lib::domain::{NotificationType, TrackedProductRepository, TrackerError};
use price_tracker_lib::infrastructure::config::{AppConfig, ScrapingConfig, TrackingConfig};
use price_tracker_lib::infrastructure::http_client::{FetchError, FetchMethod, FetchRequest, FetchResponse, HtmlTransport};
use price_tracker_lib::infrastructure::memory_store::{
    InMemoryDeviceTokenStore, InMemoryProductStore, LoggingNotificationSink,
};
use price_tracker_lib::infrastructure::product_scraper::ProductScraper;
use price_tracker_lib::PriceTrackerService;

/// Answers by exact URL; unknown URLs are unreachable
#[derive(Default)]
struct SiteMock {
    pages: Mutex<HashMap<String, FetchResponse>>,
    redirects: Mutex<HashMap<String, String>>,
    log: Mutex<Vec<(FetchMethod, String)>>,
}

impl SiteMock {
    fn serve(&self, url: &str, status: u16, body: String) {
        self.pages.lock().unwrap().insert(
            url.to_string(),
            FetchResponse {
                status,
                final_url: url.to_string(),
                body,
                ..Default::default()
            },
        );
    }

    fn redirect(&self, from: &str, to: &str) {
        self.redirects.lock().unwrap().insert(from.to_string(), to.to_string());
    }

    fn requests_to(&self, url: &str) -> usize {
        self.log.lock().unwrap().iter().filter(|(_, u)| u == url).count()
    }
}

#[async_trait]
impl HtmlTransport for SiteMock {
    async fn send(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        self.log.lock().unwrap().push((request.method, request.url.clone()));

        if let Some(target) = self.redirects.lock().unwrap().get(&request.url) {
            return Ok(FetchResponse {
                status: 301,
                final_url: request.url.clone(),
                headers: HashMap::from([("location".to_string(), target.clone())]),
                ..Default::default()
            });
        }
        self.pages
            .lock()
            .unwrap()
            .get(&request.url)
            .cloned()
            .ok_or_else(|| FetchError::Unreachable {
                url: request.url.clone(),
                reason: "no route".to_string(),
            })
    }
}

fn amazon_page(title: &str, price: &str) -> String {
    format!(
        r#"<html><head><meta property="og:image" content="https://m.media-amazon.com/images/I/71kettle._SL1500_.jpg"></head>
        <body><span id="productTitle"> {title} </span>
        <div id="corePriceDisplay_desktop_feature_div"><span class="a-price"><span class="a-offscreen">{price}</span></span></div>
        <div class="a-price"><span class="a-offscreen">₹99,999</span></div>
        </body></html>"#
    )
}

struct Harness {
    site: Arc<SiteMock>,
    store: Arc<InMemoryProductStore>,
    sink: Arc<LoggingNotificationSink>,
    service: Arc<PriceTrackerService>,
}

fn harness() -> Harness {
    let site = Arc::new(SiteMock::default());
    let store = Arc::new(InMemoryProductStore::new());
    let tokens = Arc::new(InMemoryDeviceTokenStore::new());
    let sink = Arc::new(LoggingNotificationSink::new());

    let config = AppConfig {
        scraping: ScrapingConfig {
            max_retries: 1,
            ..ScrapingConfig::without_delays()
        },
        tracking: TrackingConfig { batch_item_delay_ms: 0 },
        ..AppConfig::default()
    };
    let scraper = ProductScraper::new(site.clone(), &config).unwrap();
    let service = PriceTrackerService::new(store.clone(), tokens, sink.clone(), scraper, &config.tracking);

    Harness {
        site,
        store,
        sink,
        service: Arc::new(service),
    }
}

#[tokio::test]
async fn track_then_refresh_reaches_threshold_once() {
    let h = harness();
    let canonical = "https://www.amazon.in/dp/ABC";
    h.site.serve(canonical, 200, amazon_page("Electric Kettle", "₹500"));
    h.service.register_device_token("owner1", "device-1").await.unwrap();

    let tracked = h
        .service
        .track_product("https://www.amazon.in/dp/ABC?ref=xyz", "owner1", Some(450.0))
        .await
        .unwrap();
    assert_eq!(tracked.url, canonical);
    assert_eq!(tracked.price, "₹500");
    assert_eq!(tracked.title, "Electric Kettle");
    assert!(tracked.image.starts_with("https://m.media-amazon.com/"));
    assert!(!tracked.threshold_reached);

    h.site.serve(canonical, 200, amazon_page("Electric Kettle", "₹400"));
    let refreshed = h.service.refresh_product(&tracked.id, "owner1").await.unwrap();
    assert!(refreshed.threshold_reached);
    assert_eq!(refreshed.notification_type, Some(NotificationType::ThresholdReached));
    assert_eq!(refreshed.price_history.len(), 2);

    let sent = h.sink.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].device_token, "device-1");
    assert_eq!(sent[0].data.get("type").map(String::as_str), Some("threshold_reached"));

    // Still below the threshold: the level holds, no second alert
    h.site.serve(canonical, 200, amazon_page("Electric Kettle", "₹380"));
    let again = h.service.refresh_product(&tracked.id, "owner1").await.unwrap();
    assert!(again.threshold_reached);
    assert_ne!(again.notification_type, Some(NotificationType::ThresholdReached));
    assert_eq!(h.sink.sent().await.len(), 2);
    assert_eq!(h.sink.sent().await[1].data.get("type").map(String::as_str), Some("price_drop"));

    let stored = h.store.find_by_id(&tracked.id).await.unwrap().unwrap();
    assert_eq!(stored.price, "₹380");
    assert_eq!(stored.price_history.len(), 3);
}

#[tokio::test]
async fn short_link_dedupes_against_canonical_url() {
    let h = harness();
    let canonical = "https://www.amazon.in/dp/B0SHORT";
    h.site.serve(canonical, 200, amazon_page("Desk Lamp", "₹1,299"));
    h.site.redirect("https://amzn.to/3lamp", "https://www.amazon.in/dp/B0SHORT?ref_=share&tag=x-21");

    let first = h
        .service
        .track_product("https://amzn.to/3lamp", "owner1", None)
        .await
        .unwrap();
    assert_eq!(first.url, canonical);

    let err = h.service.track_product(canonical, "owner1", None).await.unwrap_err();
    assert!(matches!(err, TrackerError::Duplicate { .. }));
    assert_eq!(err.status_code(), 409);

    h.service.track_product(canonical, "owner2", None).await.unwrap();
    assert_eq!(h.store.len().await, 2);
}

#[tokio::test]
async fn captcha_page_escalates_then_fails_cleanly() {
    let h = harness();
    let canonical = "https://www.amazon.in/dp/B0BLOCK";
    h.site.serve(
        canonical,
        200,
        r#"<html><body><form action="/errors/validateCaptcha"><input id="captchacharacters"></form></body></html>"#
            .to_string(),
    );

    let err = h.service.track_product(canonical, "owner1", None).await.unwrap_err();
    assert!(matches!(err, TrackerError::Extraction { .. } | TrackerError::Network { .. }));
    // One first attempt plus one escalation
    assert_eq!(h.site.requests_to(canonical), 2);
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn batch_check_survives_failing_items() {
    let h = harness();
    let healthy = "https://www.amazon.in/dp/B0OK";
    let flaky = "https://www.amazon.in/dp/B0FLAKY";
    h.site.serve(healthy, 200, amazon_page("Mixer", "₹2,000"));
    h.site.serve(flaky, 200, amazon_page("Toaster", "₹1,500"));

    h.service.track_product(flaky, "owner1", None).await.unwrap();
    h.service.track_product(healthy, "owner1", None).await.unwrap();

    h.site.serve(flaky, 503, String::new());
    h.site.serve(healthy, 200, amazon_page("Mixer", "₹1,800"));

    let report = h.service.spawn_check_all().await.unwrap().unwrap();
    assert_eq!(report.total, 2);
    assert_eq!(report.refreshed, 1);
    assert_eq!(report.notifications, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].url, flaky);

    let listed = h.service.list_products("owner1").await.unwrap();
    let mixer = listed.iter().find(|p| p.url == healthy).unwrap();
    assert_eq!(mixer.price, "₹1,800");
    assert_eq!(mixer.notification_type, Some(NotificationType::PriceDrop));
}
