//! Price tracking use cases
//!
//! `PriceTrackerService` composes the scraper, the history/notification
//! engine, the product store and push dispatch into the operations a routing
//! layer or scheduler calls.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::application::notification_service::NotificationService;
use crate::domain::{
    DeviceTokenRepository, NotificationDecision, ProductSnapshot, PushNotificationSink, Retailer,
    TrackedProduct, TrackedProductRepository, TrackerError, TrackerResult, apply_refresh, format_price,
};
use crate::infrastructure::config::TrackingConfig;
use crate::infrastructure::product_scraper::{ProductScraper, ScrapeError, ScrapeOutcome};

/// One product that could not be refreshed during a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailure {
    pub product_id: String,
    pub url: String,
    pub reason: String,
}

/// Result of a `check_all_products` run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub total: usize,
    pub refreshed: usize,
    pub price_changes: usize,
    pub notifications: usize,
    pub failures: Vec<BatchFailure>,
}

/// Entry point for tracking workflows
pub struct PriceTrackerService {
    store: Arc<dyn TrackedProductRepository>,
    tokens: Arc<dyn DeviceTokenRepository>,
    notifier: NotificationService,
    scraper: ProductScraper,
    batch_item_delay: Duration,
}

/// Rejects NaN, infinities and non-positive values
fn validate_threshold(value: f64) -> TrackerResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(TrackerError::validation("Threshold price must be a positive number"))
    }
}

/// Threshold must sit strictly below the current price
fn validate_threshold_below(value: f64, current_price: &str, current: Option<f64>) -> TrackerResult<()> {
    let current = current.ok_or_else(|| {
        TrackerError::validation(format!("Current price {current_price:?} is not numeric; cannot set a threshold"))
    })?;
    if value >= current {
        return Err(TrackerError::validation(format!(
            "Threshold {} must be lower than the current price {}",
            format_price(value, "INR"),
            current_price
        )));
    }
    Ok(())
}

fn require(value: &str, what: &str) -> TrackerResult<()> {
    if value.trim().is_empty() {
        Err(TrackerError::validation(format!("{what} is required")))
    } else {
        Ok(())
    }
}

impl PriceTrackerService {
    pub fn new(
        store: Arc<dyn TrackedProductRepository>,
        tokens: Arc<dyn DeviceTokenRepository>,
        sink: Arc<dyn PushNotificationSink>,
        scraper: ProductScraper,
        config: &TrackingConfig,
    ) -> Self {
        Self {
            notifier: NotificationService::new(Arc::clone(&tokens), sink),
            store,
            tokens,
            scraper,
            batch_item_delay: Duration::from_millis(config.batch_item_delay_ms),
        }
    }

    pub fn scraper(&self) -> &ProductScraper {
        &self.scraper
    }

    /// One-off scrape; failures are logged and surface as `None`
    pub async fn scrape_product(&self, url: &str) -> Option<ProductSnapshot> {
        self.scraper.scrape_product(url).await
    }

    /// One-off scrape with the strategy report
    pub async fn scrape_product_detailed(&self, url: &str) -> Result<ScrapeOutcome, ScrapeError> {
        self.scraper.scrape_product_detailed(url).await
    }

    /// Start tracking `url` for `owner_id`
    pub async fn track_product(
        &self,
        url: &str,
        owner_id: &str,
        threshold_price: Option<f64>,
    ) -> TrackerResult<TrackedProduct> {
        require(url, "Product URL")?;
        require(owner_id, "Owner id")?;
        if let Some(threshold) = threshold_price {
            validate_threshold(threshold)?;
        }
        if Retailer::classify(url).is_none() {
            return Err(TrackerError::validation("Only Amazon and Flipkart product URLs are supported"));
        }

        let canonical = self.scraper.canonicalize(url).await;
        let retailer = Retailer::classify(&canonical)
            .ok_or_else(|| TrackerError::validation("Only Amazon and Flipkart product URLs are supported"))?;

        // Check-then-act; the store gives no uniqueness guarantee
        if self.store.find_by_owner_and_url(owner_id, &canonical).await?.is_some() {
            warn!("⚠️ {} already tracks {}", owner_id, canonical);
            return Err(TrackerError::Duplicate { url: canonical });
        }

        let outcome = self
            .scraper
            .scrape_canonical(&canonical)
            .await
            .map_err(|e| e.into_tracker_error(&canonical))?;
        let snapshot = outcome.snapshot;

        if let Some(threshold) = threshold_price {
            validate_threshold_below(threshold, &snapshot.price, snapshot.numeric_price())?;
        }

        let product = TrackedProduct::new(owner_id, canonical, retailer, snapshot, threshold_price, Utc::now());
        self.store.insert(&product).await?;

        info!(
            "✅ Tracking {} for {} at {} ({})",
            product.title, owner_id, product.price, product.url
        );
        Ok(product)
    }

    /// Scrape a stored product again and apply the price change rules
    pub async fn refresh_product(&self, id: &str, owner_id: &str) -> TrackerResult<TrackedProduct> {
        let product = self.load_owned(id, owner_id).await?;
        let (product, _) = self.refresh_loaded(product).await?;
        Ok(product)
    }

    async fn refresh_loaded(&self, mut product: TrackedProduct) -> TrackerResult<(TrackedProduct, NotificationDecision)> {
        let outcome = self
            .scraper
            .scrape_canonical(&product.url)
            .await
            .map_err(|e| e.into_tracker_error(&product.url))?;

        let decision = apply_refresh(&mut product, &outcome.snapshot, Utc::now());
        self.store.update(&product).await?;

        if decision.notification.is_some() {
            self.notifier.dispatch(&product).await;
        }
        Ok((product, decision))
    }

    pub async fn set_threshold(&self, id: &str, owner_id: &str, value: f64) -> TrackerResult<TrackedProduct> {
        validate_threshold(value)?;
        let mut product = self.load_owned(id, owner_id).await?;
        validate_threshold_below(value, &product.price, product.numeric_price())?;

        product.threshold_price = Some(value);
        product.threshold_reached = false;
        self.store.update(&product).await?;
        debug!("Threshold for {} set to {}", product.id, value);
        Ok(product)
    }

    pub async fn remove_threshold(&self, id: &str, owner_id: &str) -> TrackerResult<TrackedProduct> {
        let mut product = self.load_owned(id, owner_id).await?;
        product.threshold_price = None;
        product.threshold_reached = false;
        self.store.update(&product).await?;
        Ok(product)
    }

    /// Products of `owner_id`, oldest first
    pub async fn list_products(&self, owner_id: &str) -> TrackerResult<Vec<TrackedProduct>> {
        require(owner_id, "Owner id")?;
        Ok(self.store.find_by_owner(owner_id).await?)
    }

    pub async fn remove_product(&self, id: &str, owner_id: &str) -> TrackerResult<()> {
        let product = self.load_owned(id, owner_id).await?;
        self.store.delete(&product.id).await?;
        info!("🗑️ Stopped tracking {} for {}", product.url, owner_id);
        Ok(())
    }

    /// Purchased products are deleted together with their history
    pub async fn mark_as_bought(&self, id: &str, owner_id: &str) -> TrackerResult<()> {
        let product = self.load_owned(id, owner_id).await?;
        self.store.delete(&product.id).await?;
        info!("🛒 {} marked as bought by {} at {}", product.title, owner_id, product.price);
        Ok(())
    }

    pub async fn clear_notification(&self, id: &str, owner_id: &str) -> TrackerResult<TrackedProduct> {
        let mut product = self.load_owned(id, owner_id).await?;
        if product.has_notification {
            product.clear_notification();
            self.store.update(&product).await?;
        }
        Ok(product)
    }

    pub async fn register_device_token(&self, owner_id: &str, token: &str) -> TrackerResult<()> {
        require(owner_id, "Owner id")?;
        require(token, "Device token")?;
        self.tokens.register(owner_id, token.trim()).await?;
        Ok(())
    }

    /// Refresh every stored product one at a time.
    ///
    /// Items are spaced by the configured delay; a failing item is recorded
    /// and the batch moves on.
    pub async fn check_all_products(&self) -> TrackerResult<BatchReport> {
        let products = self.store.find_all().await?;
        let mut report = BatchReport {
            total: products.len(),
            ..BatchReport::default()
        };
        info!("🔄 Checking {} tracked products", report.total);

        for (index, product) in products.into_iter().enumerate() {
            if index > 0 && !self.batch_item_delay.is_zero() {
                tokio::time::sleep(self.batch_item_delay).await;
            }

            let (id, url) = (product.id.clone(), product.url.clone());
            match self.refresh_loaded(product).await {
                Ok((_, decision)) => {
                    report.refreshed += 1;
                    if decision.append_history {
                        report.price_changes += 1;
                    }
                    if decision.notification.is_some() {
                        report.notifications += 1;
                    }
                }
                Err(e) => {
                    warn!("⚠️ Batch refresh failed for {}: {}", url, e);
                    report.failures.push(BatchFailure {
                        product_id: id,
                        url,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "✅ Batch done: {}/{} refreshed, {} price changes, {} notifications, {} failures",
            report.refreshed,
            report.total,
            report.price_changes,
            report.notifications,
            report.failures.len()
        );
        Ok(report)
    }

    /// Run `check_all_products` in the background and return immediately
    pub fn spawn_check_all(self: &Arc<Self>) -> JoinHandle<TrackerResult<BatchReport>> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let result = service.check_all_products().await;
            if let Err(e) = &result {
                error!("❌ Background batch check aborted: {}", e);
            }
            result
        })
    }

    async fn load_owned(&self, id: &str, owner_id: &str) -> TrackerResult<TrackedProduct> {
        require(id, "Product id")?;
        require(owner_id, "Owner id")?;
        match self.store.find_by_id(id).await? {
            Some(product) if product.is_owned_by(owner_id) => Ok(product),
            _ => Err(TrackerError::not_found(id)),
        }
    }
}
