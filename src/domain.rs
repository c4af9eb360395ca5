//! Domain module - Core business logic and entities
//!
//! Products, prices, retailers and the refresh decision logic. Nothing in
//! here performs I/O except through the repository traits.

pub mod errors;
pub mod price;
pub mod price_history;
pub mod product;
pub mod repositories;
pub mod retailer;

// Re-export commonly used items for convenience
pub use errors::{TrackerError, TrackerResult};
pub use price::{format_price, localize_price, parse_price};
pub use price_history::{MAX_HISTORY_ENTRIES, NotificationDecision, apply_refresh};
pub use product::{NotificationType, PLACEHOLDER_TITLE, PriceHistoryEntry, ProductSnapshot, TrackedProduct};
pub use repositories::{
    DeliveryOutcome, DeviceTokenRepository, PushMessage, PushNotificationSink, TrackedProductRepository,
};
pub use retailer::{Retailer, SiteVariant};
