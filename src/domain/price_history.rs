//! Price history and notification decisions
//!
//! Pure state transition applied to a [`TrackedProduct`] on every refresh.
//! The threshold alert is edge-triggered: it fires on the transition into
//! the reached state only, while the `threshold_reached` flag always tracks
//! the current level. A price drop alert is evaluated only when the
//! threshold alert did not fire in the same cycle.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::price::{format_price, parse_price};
use crate::domain::product::{NotificationType, PriceHistoryEntry, ProductSnapshot, TrackedProduct};

/// Maximum number of retained history entries
pub const MAX_HISTORY_ENTRIES: usize = 30;

/// Outcome of comparing a fresh price against the stored product
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationDecision {
    pub append_history: bool,
    /// Level state after this refresh; `None` when no threshold evaluation ran
    pub threshold_reached: Option<bool>,
    pub notification: Option<(NotificationType, String)>,
}

impl NotificationDecision {
    pub fn notification_type(&self) -> Option<NotificationType> {
        self.notification.as_ref().map(|(kind, _)| *kind)
    }
}

/// Decide what a refresh with `new_price` does to `product`.
pub fn evaluate(product: &TrackedProduct, new_price: &str) -> NotificationDecision {
    let previous_price = product.previous_price();
    let append_history = product
        .price_history
        .last()
        .is_none_or(|last| last.price != new_price);

    let new_value = parse_price(new_price);
    let threshold = product
        .threshold_price
        .filter(|t| t.is_finite() && *t > 0.0);

    let threshold_reached = match (threshold, new_value) {
        (Some(threshold), Some(value)) => Some(value <= threshold),
        _ => None,
    };

    let mut notification = None;

    if let (Some(true), Some(threshold)) = (threshold_reached, threshold) {
        if !product.threshold_reached {
            notification = Some((
                NotificationType::ThresholdReached,
                format!(
                    "{} is now {}, at or below your target of {}",
                    product.title,
                    new_price,
                    format_price(threshold, "INR")
                ),
            ));
        }
    }

    if notification.is_none() {
        if let (Some(prev), Some(value)) = (parse_price(previous_price), new_value) {
            if value < prev {
                notification = Some((
                    NotificationType::PriceDrop,
                    format!(
                        "{} dropped from {} to {}",
                        product.title, previous_price, new_price
                    ),
                ));
            }
        }
    }

    NotificationDecision {
        append_history,
        threshold_reached,
        notification,
    }
}

/// Append `entry` unless it repeats the latest price, evicting the oldest
/// entries beyond [`MAX_HISTORY_ENTRIES`]. Returns whether it was appended.
pub fn append_history(history: &mut Vec<PriceHistoryEntry>, entry: PriceHistoryEntry) -> bool {
    if history.last().is_some_and(|last| last.price == entry.price) {
        return false;
    }
    history.push(entry);
    if history.len() > MAX_HISTORY_ENTRIES {
        let excess = history.len() - MAX_HISTORY_ENTRIES;
        history.drain(..excess);
    }
    true
}

/// Apply a fresh snapshot to `product` and return the decision taken.
pub fn apply_refresh(
    product: &mut TrackedProduct,
    snapshot: &ProductSnapshot,
    now: DateTime<Utc>,
) -> NotificationDecision {
    let decision = evaluate(product, &snapshot.price);

    if decision.append_history {
        append_history(
            &mut product.price_history,
            PriceHistoryEntry::new(snapshot.price.clone(), now),
        );
    }

    product.price = snapshot.price.clone();
    if !snapshot.has_placeholder_title() {
        product.title = snapshot.title.clone();
    }
    if !snapshot.image.is_empty() {
        product.image = snapshot.image.clone();
    }
    product.last_checked = now;

    if let Some(reached) = decision.threshold_reached {
        product.threshold_reached = reached;
    }

    match &decision.notification {
        Some((kind, message)) => {
            product.has_notification = true;
            product.notification_type = Some(*kind);
            product.notification_message = Some(message.clone());
            product.notification_timestamp = Some(now);
        }
        None => product.clear_notification(),
    }

    debug!(
        "Refresh of {} -> {} (history appended: {}, notification: {:?})",
        product.id,
        product.price,
        decision.append_history,
        decision.notification_type()
    );

    decision
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::retailer::Retailer;
    use chrono::Duration;

    fn product_with(price: &str, threshold: Option<f64>) -> TrackedProduct {
        TrackedProduct::new(
            "owner-1",
            "https://www.amazon.in/dp/ABC".to_string(),
            Retailer::Amazon,
            ProductSnapshot::new(price.to_string(), Some("Kettle".to_string()), None),
            threshold,
            Utc::now() - Duration::hours(1),
        )
    }

    fn snap(price: &str) -> ProductSnapshot {
        ProductSnapshot::new(price.to_string(), Some("Kettle".to_string()), None)
    }

    #[test]
    fn test_same_price_does_not_append() {
        let mut product = product_with("₹100", None);
        let decision = apply_refresh(&mut product, &snap("₹100"), Utc::now());
        assert!(!decision.append_history);
        assert_eq!(product.price_history.len(), 1);
        assert!(!product.has_notification);
    }

    #[test]
    fn test_changed_price_appends_exactly_once() {
        let mut product = product_with("₹100", None);
        apply_refresh(&mut product, &snap("₹90"), Utc::now());
        assert_eq!(product.price_history.len(), 2);
        assert_eq!(product.price_history[1].price, "₹90");
    }

    #[test]
    fn test_history_capped_with_fifo_eviction() {
        let mut history: Vec<PriceHistoryEntry> = (0..MAX_HISTORY_ENTRIES)
            .map(|i| PriceHistoryEntry::new(format!("₹{}", 1000 + i), Utc::now()))
            .collect();
        assert!(append_history(&mut history, PriceHistoryEntry::new("₹1", Utc::now())));
        assert_eq!(history.len(), MAX_HISTORY_ENTRIES);
        assert_eq!(history[0].price, "₹1001");
        assert_eq!(history.last().unwrap().price, "₹1");
    }

    #[test]
    fn test_threshold_fires_once_then_holds_level() {
        let mut product = product_with("₹600", Some(500.0));

        let first = apply_refresh(&mut product, &snap("₹450"), Utc::now());
        assert_eq!(first.notification_type(), Some(NotificationType::ThresholdReached));
        assert!(product.threshold_reached);
        assert!(product.has_notification);

        let second = apply_refresh(&mut product, &snap("₹400"), Utc::now());
        assert_ne!(second.notification_type(), Some(NotificationType::ThresholdReached));
        assert!(product.threshold_reached);
    }

    #[test]
    fn test_price_drop_suppressed_when_threshold_fires() {
        let mut product = product_with("₹600", Some(500.0));
        let decision = apply_refresh(&mut product, &snap("₹450"), Utc::now());
        // Both conditions hold; only the threshold alert is produced
        assert_eq!(decision.notification_type(), Some(NotificationType::ThresholdReached));
        assert_eq!(product.notification_type, Some(NotificationType::ThresholdReached));
    }

    #[test]
    fn test_price_drop_without_threshold() {
        let mut product = product_with("₹600", None);
        let decision = apply_refresh(&mut product, &snap("₹550"), Utc::now());
        assert_eq!(decision.notification_type(), Some(NotificationType::PriceDrop));
        assert!(product.notification_message.as_deref().unwrap().contains("₹600"));
    }

    #[test]
    fn test_price_rise_clears_notification() {
        let mut product = product_with("₹600", None);
        apply_refresh(&mut product, &snap("₹550"), Utc::now());
        assert!(product.has_notification);
        apply_refresh(&mut product, &snap("₹700"), Utc::now());
        assert!(!product.has_notification);
        assert_eq!(product.notification_type, None);
    }

    #[test]
    fn test_threshold_rearms_after_price_rises_above() {
        let mut product = product_with("₹600", Some(500.0));
        apply_refresh(&mut product, &snap("₹450"), Utc::now());
        apply_refresh(&mut product, &snap("₹650"), Utc::now());
        assert!(!product.threshold_reached);
        let decision = apply_refresh(&mut product, &snap("₹480"), Utc::now());
        assert_eq!(decision.notification_type(), Some(NotificationType::ThresholdReached));
    }

    #[test]
    fn test_invalid_threshold_is_ignored() {
        let mut product = product_with("₹600", Some(f64::NAN));
        let decision = apply_refresh(&mut product, &snap("₹450"), Utc::now());
        assert_eq!(decision.threshold_reached, None);
        assert_eq!(decision.notification_type(), Some(NotificationType::PriceDrop));
        assert!(!product.threshold_reached);
    }

    #[test]
    fn test_unparsable_new_price_keeps_flags() {
        let mut product = product_with("₹600", Some(500.0));
        let decision = apply_refresh(&mut product, &snap("Currently unavailable"), Utc::now());
        assert_eq!(decision.threshold_reached, None);
        assert!(decision.notification.is_none());
        assert!(decision.append_history);
    }

    #[test]
    fn test_placeholder_title_does_not_overwrite() {
        let mut product = product_with("₹600", None);
        let placeholder = ProductSnapshot::new("₹600".to_string(), None, None);
        apply_refresh(&mut product, &placeholder, Utc::now());
        assert_eq!(product.title, "Kettle");
    }
}
