//! Telegram Bot API channel.
//!
//! One `sendMessage` call per order, HTML parse mode. Remote errors are
//! classified by the Bot API `error_code`; a request that never got a reply
//! is reported as unreachable.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::config::TelegramConfig;
use crate::models::order::OrderSubmission;
use crate::services::notifier::{received_at, Channel, Delivery, Notifier, NotifyError};

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: String,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Deserialize)]
struct ApiReply<T> {
    ok: bool,
    result: Option<T>,
    error_code: Option<u16>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct SentMessage {
    message_id: i64,
}

#[derive(Deserialize)]
struct BotUser {
    username: Option<String>,
    first_name: String,
    id: i64,
}

pub struct TelegramNotifier {
    client: reqwest::Client,
    config: TelegramConfig,
    timezone: Tz,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig, timeout: Duration, timezone: Tz) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            config,
            timezone,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.config.api_url, self.config.bot_token, method)
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, NotifyError> {
        let resp = request.send().await.map_err(transport_error)?;
        let status = resp.status();
        let reply: ApiReply<T> = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                transport_error(e)
            } else {
                NotifyError::RemoteRejected(format!(
                    "unreadable Bot API reply ({}): {}",
                    status,
                    e.without_url()
                ))
            }
        })?;

        match reply {
            ApiReply {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiReply {
                error_code,
                description,
                ..
            } => Err(classify_api_error(
                error_code.unwrap_or(status.as_u16()),
                description.as_deref().unwrap_or("no description"),
            )),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn channel(&self) -> Channel {
        Channel::Telegram
    }

    async fn send(&self, order: &OrderSubmission) -> Result<Delivery, NotifyError> {
        let body = SendMessageRequest {
            chat_id: &self.config.chat_id,
            text: format_order_message(order, &self.timezone),
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        let sent: SentMessage = self
            .call(self.client.post(self.method_url("sendMessage")).json(&body))
            .await?;

        Ok(Delivery {
            message_id: Some(sent.message_id.to_string()),
        })
    }

    async fn check_connection(&self) -> Result<String, NotifyError> {
        let bot: BotUser = self.call(self.client.get(self.method_url("getMe"))).await?;
        Ok(format!(
            "bot @{} ({}, id {})",
            bot.username.as_deref().unwrap_or("-"),
            bot.first_name,
            bot.id
        ))
    }
}

/// Map a Bot API error code to a failure reason.
pub fn classify_api_error(code: u16, description: &str) -> NotifyError {
    match code {
        401 => NotifyError::Auth(format!("bot token rejected: {}", description)),
        403 => NotifyError::InvalidRecipient(format!("bot has no access to the chat: {}", description)),
        404 => NotifyError::InvalidRecipient(format!("chat not found: {}", description)),
        400 => NotifyError::RemoteRejected(format!("malformed message: {}", description)),
        other => NotifyError::RemoteRejected(format!("Bot API error {}: {}", other, description)),
    }
}

fn transport_error(e: reqwest::Error) -> NotifyError {
    if e.is_builder() {
        return NotifyError::RemoteRejected(format!("could not build request: {}", e));
    }
    let kind = if e.is_timeout() {
        "timed out"
    } else if e.is_connect() {
        "connection failed"
    } else {
        "no response"
    };
    // reqwest errors embed the URL, which carries the bot token.
    NotifyError::Unreachable(format!("{}: {}", kind, e.without_url()))
}

pub fn format_order_message(order: &OrderSubmission, timezone: &Tz) -> String {
    let timestamp = received_at(timezone);

    let mut text = format!(
        "🆕 <b>NEW ORDER!</b>\n\
         \n\
         👤 <b>Name:</b> {}\n\
         📞 <b>Phone:</b> <code>{}</code>\n\
         📍 <b>Address:</b> {}\n",
        escape_html(&order.name),
        escape_html(&order.phone),
        escape_html(&order.address),
    );
    if let Some(email) = &order.email {
        text.push_str(&format!("✉️ <b>Email:</b> {}\n", escape_html(email)));
    }
    if order.has_comment() {
        text.push_str(&format!("💬 <b>Comment:</b> {}\n", escape_html(&order.comment)));
    }
    text.push_str(&format!(
        "\n🕐 <b>Received:</b> {}\n\n<i>Contact the customer as soon as possible!</i>",
        timestamp
    ));
    text
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
