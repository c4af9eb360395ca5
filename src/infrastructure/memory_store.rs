//! In-memory implementations of the store and delivery interfaces
//!
//! Used by the binary and by tests. State lives behind `tokio::sync::RwLock`
//! and is lost on drop.

use anyhow::{Result, bail};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::domain::{
    DeliveryOutcome, DeviceTokenRepository, PushMessage, PushNotificationSink, TrackedProduct,
    TrackedProductRepository,
};

/// Tracked products keyed by id
#[derive(Debug, Clone, Default)]
pub struct InMemoryProductStore {
    products: Arc<RwLock<HashMap<String, TrackedProduct>>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.products.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.products.read().await.is_empty()
    }
}

/// Oldest first, so listings are stable
fn sorted(mut products: Vec<TrackedProduct>) -> Vec<TrackedProduct> {
    products.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    products
}

#[async_trait]
impl TrackedProductRepository for InMemoryProductStore {
    async fn insert(&self, product: &TrackedProduct) -> Result<()> {
        let mut products = self.products.write().await;
        if products.contains_key(&product.id) {
            bail!("Product id already exists: {}", product.id);
        }
        products.insert(product.id.clone(), product.clone());
        debug!("Stored product {} for owner {}", product.id, product.owner_id);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<TrackedProduct>> {
        Ok(self.products.read().await.get(id).cloned())
    }

    async fn update(&self, product: &TrackedProduct) -> Result<()> {
        let mut products = self.products.write().await;
        match products.get_mut(&product.id) {
            Some(existing) => {
                *existing = product.clone();
                Ok(())
            }
            None => bail!("Cannot update missing product: {}", product.id),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.products.write().await.remove(id);
        Ok(())
    }

    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<TrackedProduct>> {
        let products = self.products.read().await;
        Ok(sorted(
            products.values().filter(|p| p.owner_id == owner_id).cloned().collect(),
        ))
    }

    async fn find_by_owner_and_url(&self, owner_id: &str, url: &str) -> Result<Option<TrackedProduct>> {
        let products = self.products.read().await;
        Ok(products
            .values()
            .find(|p| p.owner_id == owner_id && p.url == url)
            .cloned())
    }

    async fn find_all(&self) -> Result<Vec<TrackedProduct>> {
        Ok(sorted(self.products.read().await.values().cloned().collect()))
    }
}

/// Push tokens per owner, deduplicated, in registration order
#[derive(Debug, Clone, Default)]
pub struct InMemoryDeviceTokenStore {
    tokens: Arc<RwLock<HashMap<String, Vec<String>>>>,
}

impl InMemoryDeviceTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceTokenRepository for InMemoryDeviceTokenStore {
    async fn register(&self, owner_id: &str, token: &str) -> Result<()> {
        let mut tokens = self.tokens.write().await;
        let owned = tokens.entry(owner_id.to_string()).or_default();
        if !owned.iter().any(|t| t == token) {
            owned.push(token.to_string());
        }
        Ok(())
    }

    async fn tokens_for_owner(&self, owner_id: &str) -> Result<Vec<String>> {
        Ok(self.tokens.read().await.get(owner_id).cloned().unwrap_or_default())
    }

    async fn remove(&self, owner_id: &str, token: &str) -> Result<()> {
        if let Some(owned) = self.tokens.write().await.get_mut(owner_id) {
            owned.retain(|t| t != token);
        }
        Ok(())
    }
}

/// Push sink that logs every message instead of delivering it.
///
/// Tokens registered with [`LoggingNotificationSink::reject_token`] are
/// answered with `InvalidToken`.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotificationSink {
    sent: Arc<RwLock<Vec<PushMessage>>>,
    rejected: Arc<RwLock<HashSet<String>>>,
}

impl LoggingNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn reject_token(&self, token: &str) {
        self.rejected.write().await.insert(token.to_string());
    }

    /// Messages accepted so far
    pub async fn sent(&self) -> Vec<PushMessage> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl PushNotificationSink for LoggingNotificationSink {
    async fn send(&self, message: &PushMessage) -> DeliveryOutcome {
        if self.rejected.read().await.contains(&message.device_token) {
            return DeliveryOutcome::InvalidToken;
        }
        info!(
            "📣 Push to {}: {} - {}",
            message.device_token, message.title, message.body
        );
        self.sent.write().await.push(message.clone());
        DeliveryOutcome::Delivered
    }
}
