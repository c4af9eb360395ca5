//! Push dispatch for product notifications

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::{
    DeliveryOutcome, DeviceTokenRepository, NotificationType, PushMessage, PushNotificationSink, TrackedProduct,
};

/// Per-dispatch delivery counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub delivered: usize,
    pub pruned: usize,
    pub failed: usize,
}

/// Fans a product notification out to every device of its owner.
///
/// Delivery never fails the caller: rejected tokens are pruned from the
/// token store and other failures are logged.
#[derive(Clone)]
pub struct NotificationService {
    tokens: Arc<dyn DeviceTokenRepository>,
    sink: Arc<dyn PushNotificationSink>,
}

impl NotificationService {
    pub fn new(tokens: Arc<dyn DeviceTokenRepository>, sink: Arc<dyn PushNotificationSink>) -> Self {
        Self { tokens, sink }
    }

    /// Payload for one device
    pub fn build_message(product: &TrackedProduct, kind: NotificationType, body: &str, token: &str) -> PushMessage {
        let data = HashMap::from([
            ("productId".to_string(), product.id.clone()),
            ("type".to_string(), kind.as_str().to_string()),
            ("url".to_string(), product.url.clone()),
            ("price".to_string(), product.price.clone()),
        ]);
        PushMessage {
            device_token: token.to_string(),
            title: kind.push_title().to_string(),
            body: body.to_string(),
            data,
        }
    }

    /// Send the product's pending notification, if it has one
    pub async fn dispatch(&self, product: &TrackedProduct) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        let (Some(kind), Some(body)) = (product.notification_type, product.notification_message.as_deref()) else {
            return summary;
        };

        let tokens = match self.tokens.tokens_for_owner(&product.owner_id).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!("⚠️ Could not load device tokens for {}: {}", product.owner_id, e);
                return summary;
            }
        };
        if tokens.is_empty() {
            debug!("No devices registered for owner {}", product.owner_id);
            return summary;
        }

        for token in &tokens {
            let message = Self::build_message(product, kind, body, token);
            match self.sink.send(&message).await {
                DeliveryOutcome::Delivered => summary.delivered += 1,
                DeliveryOutcome::InvalidToken => {
                    summary.pruned += 1;
                    if let Err(e) = self.tokens.remove(&product.owner_id, token).await {
                        warn!("⚠️ Failed to prune invalid token for {}: {}", product.owner_id, e);
                    }
                }
                DeliveryOutcome::Failed(reason) => {
                    summary.failed += 1;
                    warn!("⚠️ Push delivery failed for product {}: {}", product.id, reason);
                }
            }
        }

        info!(
            "📣 {} notification for {}: {} delivered, {} pruned, {} failed",
            kind, product.id, summary.delivered, summary.pruned, summary.failed
        );
        summary
    }
}
