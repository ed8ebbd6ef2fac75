//! SMTP email channel.
//!
//! Renders an HTML body with a plain-text alternative and sends it through an
//! authenticated relay (implicit TLS, Gmail by default).

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono_tz::Tz;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tera::Tera;

use crate::config::EmailConfig;
use crate::models::order::OrderSubmission;
use crate::services::notifier::{received_at, Channel, Delivery, Notifier, NotifyError};

const HTML_TEMPLATE: &str = "order_email.html";
const TEXT_TEMPLATE: &str = "order_email.txt";

pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: String,
    templates: Tera,
    timezone: Tz,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig, timeout: Duration, timezone: Tz) -> Result<Self> {
        let address: Address = config
            .user
            .parse()
            .context("EMAIL_USER must be a full email address")?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .with_context(|| format!("invalid SMTP host {}", config.smtp_host))?
            .port(config.smtp_port)
            .credentials(Credentials::new(config.user, config.password))
            .timeout(Some(timeout))
            .build();

        Ok(Self {
            transport,
            from: Mailbox::new(Some(config.from_name), address),
            to: config.to,
            templates: templates()?,
            timezone,
        })
    }

    fn render(&self, order: &OrderSubmission) -> Result<(String, String), NotifyError> {
        let mut ctx = tera::Context::new();
        ctx.insert("order", order);
        ctx.insert("received_at", &received_at(&self.timezone));
        ctx.insert("sender", &self.from.name.clone().unwrap_or_default());

        let render = |name: &str| {
            self.templates
                .render(name, &ctx)
                .map_err(|e| NotifyError::Message(format!("{}: {}", name, e)))
        };
        Ok((render(HTML_TEMPLATE)?, render(TEXT_TEMPLATE)?))
    }

    fn build_message(&self, order: &OrderSubmission) -> Result<Message, NotifyError> {
        let to: Mailbox = self
            .to
            .parse()
            .map_err(|e| NotifyError::InvalidRecipient(format!("{}: {}", self.to, e)))?;
        let (html, text) = self.render(order)?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(format!("New order from {}", order.name))
            .multipart(MultiPart::alternative_plain_html(text, html))
            .map_err(|e| NotifyError::Message(e.to_string()))
    }
}

pub fn templates() -> Result<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        (HTML_TEMPLATE, include_str!("../../templates/order_email.html")),
        (TEXT_TEMPLATE, include_str!("../../templates/order_email.txt")),
    ])
    .context("email templates failed to parse")?;
    Ok(tera)
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn send(&self, order: &OrderSubmission) -> Result<Delivery, NotifyError> {
        let message = self.build_message(order)?;
        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| classify_smtp_error(&e))?;

        let reply = response.message().collect::<Vec<_>>().join(" ");
        Ok(Delivery {
            message_id: (!reply.is_empty()).then_some(reply),
        })
    }

    async fn check_connection(&self) -> Result<String, NotifyError> {
        match self.transport.test_connection().await {
            Ok(true) => Ok(format!("SMTP relay ready, sending to {}", self.to)),
            Ok(false) => Err(NotifyError::Unreachable("SMTP relay did not answer NOOP".into())),
            Err(e) => Err(classify_smtp_error(&e)),
        }
    }
}

fn classify_smtp_error(err: &lettre::transport::smtp::Error) -> NotifyError {
    let code = err.status().and_then(|c| c.to_string().parse::<u16>().ok());
    if code.is_none() && err.is_client() {
        return NotifyError::RemoteRejected(err.to_string());
    }
    classify_smtp_reply(code, &err.to_string())
}

/// Map an SMTP reply code (`None` when the server never replied) to a failure reason.
pub fn classify_smtp_reply(code: Option<u16>, detail: &str) -> NotifyError {
    match code {
        Some(530 | 534 | 535) => NotifyError::Auth(format!(
            "SMTP login rejected, check EMAIL_USER and EMAIL_PASSWORD (app password): {}",
            detail
        )),
        Some(550 | 551 | 553) => NotifyError::InvalidRecipient(detail.to_string()),
        Some(other) => NotifyError::RemoteRejected(format!("SMTP {}: {}", other, detail)),
        None => NotifyError::Unreachable(format!("could not reach SMTP relay: {}", detail)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(to: &str) -> EmailConfig {
        EmailConfig {
            user: "shop@example.com".into(),
            password: "app-password".into(),
            to: to.into(),
            from_name: "Delivery Service".into(),
            smtp_host: "smtp.example.com".into(),
            smtp_port: 465,
        }
    }

    fn order(comment: &str) -> OrderSubmission {
        OrderSubmission {
            name: "Ann <script>".into(),
            phone: "+7 900 123 45 67".into(),
            address: "Lenina 1".into(),
            comment: comment.into(),
            email: Some("ann@example.com".into()),
        }
    }

    #[tokio::test]
    async fn html_body_is_escaped_and_text_is_not() {
        let notifier = EmailNotifier::new(config("orders@example.com"), Duration::from_secs(5), chrono_tz::UTC).unwrap();
        let (html, text) = notifier.render(&order("")).unwrap();

        assert!(html.contains("Ann &lt;script&gt;"));
        assert!(html.contains("tel:+7 900 123 45 67"));
        assert!(html.contains("ann@example.com"));
        assert!(!html.contains("Comment:"));
        assert!(html.contains("Delivery Service"));

        assert!(text.contains("Name: Ann <script>"));
        assert!(!text.contains("Comment:"));
    }

    #[tokio::test]
    async fn comment_is_rendered_when_present() {
        let notifier = EmailNotifier::new(config("orders@example.com"), Duration::from_secs(5), chrono_tz::UTC).unwrap();
        let (html, text) = notifier.render(&order("call first")).unwrap();
        assert!(html.contains("call first"));
        assert!(text.contains("Comment: call first"));
    }

    #[tokio::test]
    async fn unparseable_destination_is_invalid_recipient() {
        let notifier = EmailNotifier::new(config("not an address"), Duration::from_secs(5), chrono_tz::UTC).unwrap();
        assert!(matches!(
            notifier.build_message(&order("")),
            Err(NotifyError::InvalidRecipient(_))
        ));
    }

    #[tokio::test]
    async fn sender_must_be_an_address() {
        let mut cfg = config("orders@example.com");
        cfg.user = "shop".into();
        assert!(EmailNotifier::new(cfg, Duration::from_secs(5), chrono_tz::UTC).is_err());
    }

    #[test]
    fn classifies_smtp_replies() {
        assert!(matches!(
            classify_smtp_reply(Some(535), "5.7.8 Username and Password not accepted"),
            NotifyError::Auth(_)
        ));
        assert!(matches!(
            classify_smtp_reply(Some(550), "5.1.1 mailbox unavailable"),
            NotifyError::InvalidRecipient(_)
        ));
        assert!(matches!(
            classify_smtp_reply(Some(421), "4.7.0 try again later"),
            NotifyError::RemoteRejected(_)
        ));
        assert!(matches!(
            classify_smtp_reply(None, "connection refused"),
            NotifyError::Unreachable(_)
        ));
    }
}
