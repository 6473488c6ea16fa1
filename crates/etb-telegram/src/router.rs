use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use etb_core::{
    config::Config, gateway::SpreadsheetGateway, handler::MessageHandler,
    messaging::port::MessagingPort, registry::UserRegistry,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<MessageHandler>,
}

pub async fn run_polling(
    cfg: Arc<Config>,
    registry: Arc<dyn UserRegistry>,
    gateway: Arc<dyn SpreadsheetGateway>,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    // Basic startup info.
    match bot.get_me().await {
        Ok(me) => tracing::info!(username = %me.username(), "etb started"),
        Err(e) => tracing::warn!(error = %e, "could not fetch bot identity"),
    }
    tracing::info!(
        registry = %cfg.registry_path.display(),
        users = registry.user_count().await,
        "registry loaded"
    );

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let handler = Arc::new(
        MessageHandler::new(registry, gateway, messenger)
            .with_recent_limit(cfg.summary_recent_limit),
    );

    let state = Arc::new(AppState { handler });

    // Only private chats; groups and channels are ignored.
    let tree = dptree::entry().branch(
        Update::filter_message()
            .filter(|msg: Message| msg.chat.is_private())
            .endpoint(handlers::handle_message),
    );

    Dispatcher::builder(bot, tree)
        .dependencies(dptree::deps![state])
        .default_handler(|_| async {})
        .build()
        .dispatch()
        .await;

    Ok(())
}
