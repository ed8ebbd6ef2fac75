pub mod email;
pub mod fanout;
pub mod notifier;
pub mod telegram;

use std::sync::Arc;

use anyhow::Result;

use crate::config::{Config, IntakeMode};
use notifier::Notifier;

/// Build one notifier per configured channel allowed by the intake mode.
pub fn build_notifiers(config: &Config) -> Result<Vec<Arc<dyn Notifier>>> {
    let mut notifiers: Vec<Arc<dyn Notifier>> = Vec::new();

    match (&config.telegram, config.intake_mode) {
        (Some(telegram), IntakeMode::Fanout) => {
            notifiers.push(Arc::new(telegram::TelegramNotifier::new(
                telegram.clone(),
                config.notify_timeout,
                config.timezone,
            )?));
        }
        (Some(_), IntakeMode::EmailOnly) => {
            tracing::info!("Telegram is configured but ignored in email_only mode");
        }
        (None, _) => {
            tracing::warn!("Telegram not configured (TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID missing)");
        }
    }

    match &config.email {
        Some(email) => notifiers.push(Arc::new(email::EmailNotifier::new(
            email.clone(),
            config.notify_timeout,
            config.timezone,
        )?)),
        None => tracing::warn!("Email not configured (EMAIL_USER, EMAIL_PASSWORD or EMAIL_TO missing)"),
    }

    if notifiers.is_empty() {
        tracing::warn!("No notification channel configured, orders will be accepted without being forwarded");
    }

    Ok(notifiers)
}

/// Check every channel once. Failures are logged, never fatal.
pub async fn check_connections(notifiers: &[Arc<dyn Notifier>]) {
    let checks = notifiers.iter().map(|n| async move {
        let channel = n.channel();
        match n.check_connection().await {
            Ok(detail) => tracing::info!(%channel, %detail, "Channel connection ok"),
            Err(e) => tracing::warn!(%channel, reason = e.reason(), error = %e, "Channel connection check failed"),
        }
    });
    futures::future::join_all(checks).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::notifier::Channel;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<&str, &str> = pairs.iter().copied().collect();
        Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap()
    }

    const ALL_CHANNELS: &[(&str, &str)] = &[
        ("TELEGRAM_BOT_TOKEN", "123:abc"),
        ("TELEGRAM_CHAT_ID", "42"),
        ("EMAIL_USER", "shop@example.com"),
        ("EMAIL_PASSWORD", "pw"),
        ("EMAIL_TO", "orders@example.com"),
    ];

    fn channels(notifiers: &[Arc<dyn Notifier>]) -> Vec<Channel> {
        notifiers.iter().map(|n| n.channel()).collect()
    }

    #[tokio::test]
    async fn unconfigured_channels_are_not_built() {
        assert!(build_notifiers(&config(&[])).unwrap().is_empty());

        let only_telegram = config(&ALL_CHANNELS[..2]);
        assert_eq!(channels(&build_notifiers(&only_telegram).unwrap()), vec![Channel::Telegram]);
    }

    #[tokio::test]
    async fn fanout_builds_both_channels() {
        let notifiers = build_notifiers(&config(ALL_CHANNELS)).unwrap();
        assert_eq!(channels(&notifiers), vec![Channel::Telegram, Channel::Email]);
    }

    #[tokio::test]
    async fn email_only_skips_telegram() {
        let mut pairs = ALL_CHANNELS.to_vec();
        pairs.push(("INTAKE_MODE", "email_only"));
        let notifiers = build_notifiers(&config(&pairs)).unwrap();
        assert_eq!(channels(&notifiers), vec![Channel::Email]);
    }
}
