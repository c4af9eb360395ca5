//! Tracked product entities
//!
//! Contains the scrape snapshot, the price history entry and the tracked
//! product document persisted per owner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::price::parse_price;
use crate::domain::retailer::Retailer;

/// Title used when no extraction strategy resolves one
pub const PLACEHOLDER_TITLE: &str = "Unknown Product";

/// Raw extraction result of a single successful scrape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    /// Localized currency string, never empty
    pub price: String,
    pub title: String,
    /// Absolute image URL or empty
    pub image: String,
}

impl ProductSnapshot {
    pub fn new(price: String, title: Option<String>, image: Option<String>) -> Self {
        Self {
            price,
            title: title.unwrap_or_else(|| PLACEHOLDER_TITLE.to_string()),
            image: image.unwrap_or_default(),
        }
    }

    pub fn has_placeholder_title(&self) -> bool {
        self.title == PLACEHOLDER_TITLE
    }

    pub fn numeric_price(&self) -> Option<f64> {
        parse_price(&self.price)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceHistoryEntry {
    pub price: String,
    pub date: DateTime<Utc>,
}

impl PriceHistoryEntry {
    pub fn new(price: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            price: price.into(),
            date,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    ThresholdReached,
    PriceDrop,
}

impl NotificationType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ThresholdReached => "threshold_reached",
            Self::PriceDrop => "price_drop",
        }
    }

    /// Push title shown on the device
    pub const fn push_title(self) -> &'static str {
        match self {
            Self::ThresholdReached => "🎯 Target price reached!",
            Self::PriceDrop => "📉 Price dropped!",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A product tracked by one owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedProduct {
    pub id: String,
    pub owner_id: String,
    /// Canonical URL, unique per owner
    pub url: String,
    pub retailer: Retailer,
    pub price: String,
    pub title: String,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub last_checked: DateTime<Utc>,
    pub price_history: Vec<PriceHistoryEntry>,
    pub threshold_price: Option<f64>,
    pub threshold_reached: bool,

    pub has_notification: bool,
    pub notification_type: Option<NotificationType>,
    pub notification_message: Option<String>,
    pub notification_timestamp: Option<DateTime<Utc>>,
}

impl TrackedProduct {
    /// Create a freshly tracked product from its first snapshot
    pub fn new(
        owner_id: &str,
        url: String,
        retailer: Retailer,
        snapshot: ProductSnapshot,
        threshold_price: Option<f64>,
        now: DateTime<Utc>,
    ) -> Self {
        let history = vec![PriceHistoryEntry::new(snapshot.price.clone(), now)];
        let threshold_reached = match (threshold_price, snapshot.numeric_price()) {
            (Some(threshold), Some(current)) => current <= threshold,
            _ => false,
        };

        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            url,
            retailer,
            price: snapshot.price,
            title: snapshot.title,
            image: snapshot.image,
            created_at: now,
            last_checked: now,
            price_history: history,
            threshold_price,
            threshold_reached,
            has_notification: false,
            notification_type: None,
            notification_message: None,
            notification_timestamp: None,
        }
    }

    pub fn numeric_price(&self) -> Option<f64> {
        parse_price(&self.price)
    }

    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        self.owner_id == owner_id
    }

    /// Price of the most recent history entry, falling back to the stored price
    pub fn previous_price(&self) -> &str {
        self.price_history
            .last()
            .map_or(self.price.as_str(), |entry| entry.price.as_str())
    }

    pub fn clear_notification(&mut self) {
        self.has_notification = false;
        self.notification_type = None;
        self.notification_message = None;
        self.notification_timestamp = None;
    }
}
