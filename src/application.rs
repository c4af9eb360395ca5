//! Application layer module
//!
//! Tracking workflows and push dispatch that orchestrate the domain logic
//! over the infrastructure collaborators.

pub mod notification_service;
pub mod tracking_use_cases;

// Re-export commonly used items
pub use notification_service::{DispatchSummary, NotificationService};
pub use tracking_use_cases::{BatchFailure, BatchReport, PriceTrackerService};
