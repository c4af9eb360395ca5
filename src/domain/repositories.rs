//! Repository and delivery interfaces for price tracking
//!
//! The document store, the device-token store and the push sink are external
//! collaborators; these traits are the contracts the use cases depend on.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::product::TrackedProduct;

#[async_trait]
pub trait TrackedProductRepository: Send + Sync {
    async fn insert(&self, product: &TrackedProduct) -> Result<()>;
    async fn find_by_id(&self, id: &str) -> Result<Option<TrackedProduct>>;
    async fn update(&self, product: &TrackedProduct) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<()>;

    // Equality queries
    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<TrackedProduct>>;
    async fn find_by_owner_and_url(&self, owner_id: &str, url: &str) -> Result<Option<TrackedProduct>>;
    async fn find_all(&self) -> Result<Vec<TrackedProduct>>;
}

#[async_trait]
pub trait DeviceTokenRepository: Send + Sync {
    async fn register(&self, owner_id: &str, token: &str) -> Result<()>;
    async fn tokens_for_owner(&self, owner_id: &str) -> Result<Vec<String>>;
    async fn remove(&self, owner_id: &str, token: &str) -> Result<()>;
}

/// Message handed to the push transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub device_token: String,
    pub title: String,
    pub body: String,
    pub data: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// The transport reports the token as permanently invalid
    InvalidToken,
    Failed(String),
}

#[async_trait]
pub trait PushNotificationSink: Send + Sync {
    async fn send(&self, message: &PushMessage) -> DeliveryOutcome;
}
