use async_trait::async_trait;
use chrono_tz::Tz;
use serde::Serialize;
use thiserror::Error;

use crate::models::order::OrderSubmission;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Telegram,
    Email,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Telegram => write!(f, "telegram"),
            Channel::Email => write!(f, "email"),
        }
    }
}

/// Why a single channel could not deliver an order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("authentication rejected: {0}")]
    Auth(String),
    #[error("remote unreachable: {0}")]
    Unreachable(String),
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),
    #[error("rejected by remote: {0}")]
    RemoteRejected(String),
    #[error("could not build message: {0}")]
    Message(String),
}

impl NotifyError {
    /// Short stable label, used as a log field.
    pub fn reason(&self) -> &'static str {
        match self {
            NotifyError::Auth(_) => "auth",
            NotifyError::Unreachable(_) => "unreachable",
            NotifyError::InvalidRecipient(_) => "invalid_recipient",
            NotifyError::RemoteRejected(_) => "remote_rejected",
            NotifyError::Message(_) => "message",
        }
    }
}

/// Delivery metadata returned by a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    pub message_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NotificationOutcome {
    pub channel: Channel,
    pub result: Result<Delivery, NotifyError>,
}

impl NotificationOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Wall-clock time in the operator's zone, as shown in notifications.
pub fn received_at(timezone: &Tz) -> String {
    chrono::Utc::now()
        .with_timezone(timezone)
        .format("%d.%m.%Y, %H:%M:%S")
        .to_string()
}

/// A configured channel that can deliver an order.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn channel(&self) -> Channel;

    async fn send(&self, order: &OrderSubmission) -> Result<Delivery, NotifyError>;

    /// Check the remote side at start-up. Never fails the process.
    async fn check_connection(&self) -> Result<String, NotifyError>;
}
