//! Telegram adapter (teloxide).
//!
//! Implements the `etb-core` MessagingPort over the Bot API `sendMessage` call.

use async_trait::async_trait;
use teloxide::{prelude::*, types::ParseMode, ApiError, RequestError};
use tokio::time::sleep;

pub mod handlers;
pub mod router;

use etb_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{port::MessagingPort, types::MessagingCapabilities},
    Result,
};

pub const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// One `sendMessage`, waiting out a single 429 before giving up.
    async fn send(
        &self,
        chat_id: ChatId,
        text: &str,
        html: bool,
    ) -> std::result::Result<Message, RequestError> {
        let chat = teloxide::types::ChatId(chat_id.0);
        let mut waited = false;
        loop {
            let mut req = self
                .bot
                .send_message(chat, text)
                .disable_web_page_preview(true);
            if html {
                req = req.parse_mode(ParseMode::Html);
            }
            match req.await {
                Err(RequestError::RetryAfter(wait)) if !waited => {
                    waited = true;
                    tracing::warn!(chat_id = chat_id.0, retry_after = ?wait, "sendMessage rate limited");
                    sleep(wait).await;
                }
                res => return res,
            }
        }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            max_message_len: TELEGRAM_MESSAGE_LIMIT,
        }
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        let sent = match self.send(chat_id, html, true).await {
            // Markup Telegram refuses still gets delivered, as plain text.
            Err(RequestError::Api(reason @ ApiError::CantParseEntities)) => {
                tracing::warn!(chat_id = chat_id.0, %reason, "html rejected; resending as plain text");
                self.send(chat_id, html, false).await
            }
            other => other,
        };
        let msg = sent.map_err(|e| Error::External(format!("telegram sendMessage failed: {e}")))?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }
}
