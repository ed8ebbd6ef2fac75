use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use std::time::Duration;

/// Which handler variant the order endpoint runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeMode {
    /// Telegram and email in parallel, success when at least one delivers.
    Fanout,
    /// Email is required on the form and is the only channel.
    EmailOnly,
}

impl IntakeMode {
    pub fn requires_email(self) -> bool {
        matches!(self, IntakeMode::EmailOnly)
    }
}

impl std::str::FromStr for IntakeMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fanout" => Ok(IntakeMode::Fanout),
            "email_only" | "email-only" => Ok(IntakeMode::EmailOnly),
            other => bail!("unknown INTAKE_MODE '{}', expected 'fanout' or 'email_only'", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub api_url: String,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub user: String,
    pub password: String,
    pub to: String,
    pub from_name: String,
    pub smtp_host: String,
    pub smtp_port: u16,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub production: bool,
    pub cors_origin: Option<String>,
    pub intake_mode: IntakeMode,
    pub notify_timeout: Duration,
    pub timezone: Tz,
    pub telegram: Option<TelegramConfig>,
    pub email: Option<EmailConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let production = var("APP_ENV").is_some_and(|v| v.eq_ignore_ascii_case("production"));

        let cors_origin = var("CORS_ORIGIN").or_else(|| {
            if production {
                None
            } else {
                Some("http://localhost:5173".into())
            }
        });

        let telegram = match (var("TELEGRAM_BOT_TOKEN"), var("TELEGRAM_CHAT_ID")) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramConfig {
                bot_token,
                chat_id,
                api_url: var("TELEGRAM_API_URL")
                    .unwrap_or_else(|| "https://api.telegram.org".into())
                    .trim_end_matches('/')
                    .to_string(),
            }),
            _ => None,
        };

        let email = match (var("EMAIL_USER"), var("EMAIL_PASSWORD"), var("EMAIL_TO")) {
            (Some(user), Some(password), Some(to)) => Some(EmailConfig {
                user,
                password,
                to,
                from_name: var("EMAIL_FROM_NAME").unwrap_or_else(|| "Delivery Service".into()),
                smtp_host: var("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".into()),
                smtp_port: var("SMTP_PORT")
                    .unwrap_or_else(|| "465".into())
                    .parse()
                    .context("SMTP_PORT must be a number")?,
            }),
            _ => None,
        };

        Ok(Config {
            port: var("PORT")
                .unwrap_or_else(|| "3000".into())
                .parse()
                .context("PORT must be a number")?,
            production,
            cors_origin,
            intake_mode: var("INTAKE_MODE")
                .unwrap_or_else(|| "fanout".into())
                .parse()?,
            notify_timeout: Duration::from_secs(
                var("NOTIFY_TIMEOUT_SECS")
                    .unwrap_or_else(|| "10".into())
                    .parse()
                    .context("NOTIFY_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            timezone: var("NOTIFY_TIMEZONE")
                .unwrap_or_else(|| "Europe/Moscow".into())
                .parse::<Tz>()
                .map_err(|e| anyhow::anyhow!("NOTIFY_TIMEZONE is not a known timezone: {}", e))?,
            telegram,
            email,
        })
    }

    pub fn environment(&self) -> &'static str {
        if self.production {
            "production"
        } else {
            "development"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_any_variables() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 3000);
        assert!(!config.production);
        assert_eq!(config.cors_origin.as_deref(), Some("http://localhost:5173"));
        assert_eq!(config.intake_mode, IntakeMode::Fanout);
        assert_eq!(config.notify_timeout, Duration::from_secs(10));
        assert_eq!(config.timezone, chrono_tz::Europe::Moscow);
        assert!(config.telegram.is_none());
        assert!(config.email.is_none());
    }

    #[test]
    fn telegram_needs_token_and_chat() {
        let config = config_from(&[("TELEGRAM_BOT_TOKEN", "123:abc")]).unwrap();
        assert!(config.telegram.is_none());

        let config = config_from(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_CHAT_ID", "-100200"),
            ("TELEGRAM_API_URL", "http://localhost:8081/"),
        ])
        .unwrap();
        let telegram = config.telegram.unwrap();
        assert_eq!(telegram.chat_id, "-100200");
        assert_eq!(telegram.api_url, "http://localhost:8081");
    }

    #[test]
    fn email_needs_credentials_and_destination() {
        let config = config_from(&[("EMAIL_USER", "shop@example.com"), ("EMAIL_PASSWORD", "pw")]).unwrap();
        assert!(config.email.is_none());

        let config = config_from(&[
            ("EMAIL_USER", "shop@example.com"),
            ("EMAIL_PASSWORD", "pw"),
            ("EMAIL_TO", "orders@example.com"),
        ])
        .unwrap();
        let email = config.email.unwrap();
        assert_eq!(email.smtp_host, "smtp.gmail.com");
        assert_eq!(email.smtp_port, 465);
        assert_eq!(email.from_name, "Delivery Service");
    }

    #[test]
    fn blank_values_are_unset() {
        let config = config_from(&[("TELEGRAM_BOT_TOKEN", "  "), ("TELEGRAM_CHAT_ID", "1")]).unwrap();
        assert!(config.telegram.is_none());
    }

    #[test]
    fn production_has_no_default_origin() {
        let config = config_from(&[("APP_ENV", "production")]).unwrap();
        assert!(config.production);
        assert!(config.cors_origin.is_none());
        assert_eq!(config.environment(), "production");
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(config_from(&[("PORT", "http")]).is_err());
        assert!(config_from(&[("INTAKE_MODE", "sms")]).is_err());
        assert!(config_from(&[("NOTIFY_TIMEZONE", "Mars/Olympus")]).is_err());
        assert!(config_from(&[("NOTIFY_TIMEOUT_SECS", "-1")]).is_err());
    }

    #[test]
    fn parses_email_only_mode() {
        let config = config_from(&[("INTAKE_MODE", "email_only")]).unwrap();
        assert_eq!(config.intake_mode, IntakeMode::EmailOnly);
        assert!(config.intake_mode.requires_email());
    }
}
