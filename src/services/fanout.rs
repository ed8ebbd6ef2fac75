use std::sync::Arc;

use futures::future::join_all;

use crate::config::IntakeMode;
use crate::error::AppError;
use crate::models::order::OrderSubmission;
use crate::services::notifier::{NotificationOutcome, Notifier};

/// How per-channel outcomes fold into the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPolicy {
    /// Success when any attempted channel delivered.
    AtLeastOne,
    /// One channel; its error is the request's error.
    Single,
}

impl From<IntakeMode> for DeliveryPolicy {
    fn from(mode: IntakeMode) -> Self {
        match mode {
            IntakeMode::Fanout => DeliveryPolicy::AtLeastOne,
            IntakeMode::EmailOnly => DeliveryPolicy::Single,
        }
    }
}

#[derive(Debug, Default)]
pub struct FanoutReport {
    pub outcomes: Vec<NotificationOutcome>,
}

impl FanoutReport {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn delivered(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Nothing attempted counts as success.
    pub fn decide(self, policy: DeliveryPolicy) -> Result<(), AppError> {
        if self.outcomes.is_empty() || self.delivered() > 0 {
            return Ok(());
        }
        match policy {
            DeliveryPolicy::AtLeastOne => Err(AppError::AllChannelsFailed),
            DeliveryPolicy::Single => {
                let err = self
                    .outcomes
                    .into_iter()
                    .find_map(|o| o.result.err())
                    .ok_or_else(|| AppError::Internal("failed outcome without error".into()))?;
                Err(AppError::NotificationFailed(err))
            }
        }
    }
}

/// Send `order` through every notifier at once and wait for all of them.
///
/// A channel error becomes a failed outcome; it never short-circuits the join.
pub async fn dispatch(order: &OrderSubmission, notifiers: &[Arc<dyn Notifier>]) -> FanoutReport {
    let sends = notifiers.iter().map(|notifier| async move {
        let channel = notifier.channel();
        let result = notifier.send(order).await;
        match &result {
            Ok(delivery) => tracing::info!(
                %channel,
                message_id = delivery.message_id.as_deref().unwrap_or("-"),
                "Order notification delivered"
            ),
            Err(e) => tracing::warn!(
                %channel,
                reason = e.reason(),
                error = %e,
                "Order notification failed"
            ),
        }
        NotificationOutcome { channel, result }
    });

    FanoutReport {
        outcomes: join_all(sends).await,
    }
}
