//! Telegram Bot API: inbound update types and the outbound messaging client

use axion_core::{Keyboard, ParseMode, Reply};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// One inbound webhook event
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    #[serde(default)]
    pub update_id: Option<i64>,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// A control activation on a message the bot sent
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    #[serde(default)]
    pub data: Option<String>,
    /// Absent for controls on inline-mode messages
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{method} rejected: {description}")]
    Api {
        method: &'static str,
        description: String,
    },
}

/// Outbound messaging operations
///
/// These are best-effort: callers log failures and carry on, so nothing
/// should depend on a call having succeeded.
pub trait Messenger: Send + Sync {
    /// Send a new message to a chat
    fn send_message(
        &self,
        chat_id: i64,
        reply: &Reply,
    ) -> impl Future<Output = Result<(), TelegramError>> + Send;

    /// Replace the text and controls of an existing message
    fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        reply: &Reply,
    ) -> impl Future<Output = Result<(), TelegramError>> + Send;

    /// Acknowledge a control activation, optionally with a short toast
    fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> impl Future<Output = Result<(), TelegramError>> + Send;
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<ParseMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a Keyboard>,
    disable_web_page_preview: bool,
}

#[derive(Serialize)]
struct EditMessageRequest<'a> {
    chat_id: i64,
    message_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<ParseMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a Keyboard>,
    disable_web_page_preview: bool,
}

#[derive(Serialize)]
struct AnswerCallbackRequest<'a> {
    callback_query_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

/// Envelope of every Bot API response
#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Bot API client
#[derive(Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    /// `{api_base}/bot{token}`
    endpoint: Arc<str>,
}

impl TelegramClient {
    pub fn new(api_base: &str, token: &str, timeout: Duration) -> Result<Self, TelegramError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let endpoint = format!("{}/bot{}", api_base.trim_end_matches('/'), token);

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    async fn call<T: Serialize>(&self, method: &'static str, body: &T) -> Result<(), TelegramError> {
        let url = format!("{}/{}", self.endpoint, method);
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        let envelope: ApiResponse = response.json().await?;

        if !envelope.ok {
            return Err(TelegramError::Api {
                method,
                description: envelope
                    .description
                    .unwrap_or_else(|| format!("status {}", status)),
            });
        }

        debug!(method, "Bot API call succeeded");
        Ok(())
    }
}

impl Messenger for TelegramClient {
    async fn send_message(&self, chat_id: i64, reply: &Reply) -> Result<(), TelegramError> {
        let request = SendMessageRequest {
            chat_id,
            text: &reply.text,
            parse_mode: reply.parse_mode,
            reply_markup: reply.keyboard.as_ref(),
            disable_web_page_preview: reply.disable_preview,
        };
        self.call("sendMessage", &request).await
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        reply: &Reply,
    ) -> Result<(), TelegramError> {
        let request = EditMessageRequest {
            chat_id,
            message_id,
            text: &reply.text,
            parse_mode: reply.parse_mode,
            reply_markup: reply.keyboard.as_ref(),
            disable_web_page_preview: reply.disable_preview,
        };
        self.call("editMessageText", &request).await
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<(), TelegramError> {
        let request = AnswerCallbackRequest {
            callback_query_id: callback_id,
            text,
        };
        self.call("answerCallbackQuery", &request).await
    }
}
