use crate::config::Config;
use crate::services::fanout::DeliveryPolicy;
use crate::services::notifier::Notifier;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Channels configured at start-up; unconfigured ones are never built.
    pub notifiers: Arc<[Arc<dyn Notifier>]>,
}

impl AppState {
    pub fn new(config: Config, notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        Self {
            config: Arc::new(config),
            notifiers: notifiers.into(),
        }
    }

    pub fn delivery_policy(&self) -> DeliveryPolicy {
        self.config.intake_mode.into()
    }

    pub fn requires_email(&self) -> bool {
        self.config.intake_mode.requires_email()
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.notifiers
            .iter()
            .map(|n| n.channel().to_string())
            .collect()
    }
}
