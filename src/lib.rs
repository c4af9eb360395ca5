//! Price Tracker - Amazon/Flipkart product price tracking
//!
//! Scrapes product pages through a multi-strategy extraction cascade, keeps a
//! bounded price history per tracked product and raises threshold and
//! price-drop notifications.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

// Re-export the main entry points for easier access
pub use application::{BatchReport, PriceTrackerService};
pub use domain::{ProductSnapshot, TrackedProduct, TrackerError, TrackerResult};
pub use infrastructure::{AppConfig, ProductScraper, ReqwestTransport};
