//! Telegram update handlers.
//!
//! The adapter only converts a private text message into an `IncomingText`;
//! every decision lives in `etb_core::handler::MessageHandler`.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use etb_core::{
    domain::{ChatId, UserId},
    messaging::types::IncomingText,
};

use crate::router::AppState;

/// Map a Telegram message to the core's incoming model; `None` for non-text or bot senders.
pub fn to_incoming(msg: &Message) -> Option<IncomingText> {
    let user = msg.from()?;
    if user.is_bot {
        return None;
    }
    let text = msg.text()?;
    Some(IncomingText {
        chat_id: ChatId(msg.chat.id.0),
        user_id: UserId::from(user.id.0),
        text: text.to_string(),
    })
}

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(incoming) = to_incoming(&msg) else {
        tracing::debug!(chat_id = msg.chat.id.0, "ignoring non-text message");
        return Ok(());
    };

    // Failures are already turned into replies; only the send itself can fail here.
    if let Err(e) = state.handler.handle(&incoming).await {
        tracing::error!(
            chat_id = incoming.chat_id.0,
            user_id = %incoming.user_id,
            error = %e,
            "failed to send reply"
        );
    }

    Ok(())
}
