//! Per-message orchestration.
//!
//! A user is `Unregistered` until the registry holds a sheet for them. Each
//! incoming message yields exactly one reply; remote failures become a short
//! error reply and never stop the process.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::{
    command::Command,
    domain::{SheetId, UserId},
    errors::ValidationError,
    formatting::{escape_html, format_amount, truncate_message},
    gateway::SpreadsheetGateway,
    messaging::{port::MessagingPort, types::IncomingText},
    registry::UserRegistry,
    summary::Summary,
    Result,
};

pub const DEFAULT_RECENT_LIMIT: usize = 5;

const USAGE_HINT: &str = "Please use format: <code>Category Amount</code> (e.g. <code>Food 250</code>)\n\
Type <code>!help</code> to see all commands.";

const SETUP_FIRST: &str = "You need to set up your expense tracking first! Use:\n\
<code>!setup your.email@example.com</code>\n\n\
Type <code>!help</code> to see all commands.";

const SETUP_USAGE: &str = "Use: <code>!setup your.email@example.com</code>";

const HELP_TEXT: &str = "📋 <b>Expense Tracker Bot Commands:</b>\n\n\
<b>Setup:</b>\n\
• <code>!setup your.email@example.com</code> - Set up your personal expense sheet\n\
• <code>!url</code> (or <code>!sheet</code>, <code>!link</code>) - Get the link to your expense sheet\n\n\
<b>Expense Logging:</b>\n\
• <code>Category Amount</code> - Log an expense (e.g. <code>Food 250</code>, <code>Gas 45.50</code>)\n\
• Categories can be anything you choose (Food, Transport, Rent, etc). They are case-sensitive.\n\n\
<b>Analysis:</b>\n\
• <code>!summary</code> (or <code>!expenses</code>, <code>!stats</code>) - View a summary of your expenses\n\n\
<b>Other:</b>\n\
• <code>!help</code> - Show this help message";

const SETUP_FAILED: &str = "❌ Setup failed. Please check the email address and try again later.";
const APPEND_FAILED: &str = "❌ Could not log your expense. Please try again later.";
const READ_FAILED: &str = "❌ Could not read your expenses. Please try again later.";

pub struct MessageHandler {
    registry: Arc<dyn UserRegistry>,
    gateway: Arc<dyn SpreadsheetGateway>,
    messenger: Arc<dyn MessagingPort>,
    recent_limit: usize,
}

impl MessageHandler {
    pub fn new(
        registry: Arc<dyn UserRegistry>,
        gateway: Arc<dyn SpreadsheetGateway>,
        messenger: Arc<dyn MessagingPort>,
    ) -> Self {
        Self {
            registry,
            gateway,
            messenger,
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }

    pub fn with_recent_limit(mut self, recent_limit: usize) -> Self {
        self.recent_limit = recent_limit;
        self
    }

    /// Handle one message and send its single reply.
    pub async fn handle(&self, msg: &IncomingText) -> Result<()> {
        let reply = self.reply_for(&msg.user_id, &msg.text).await;
        let max_len = self.messenger.capabilities().max_message_len;
        self.messenger
            .send_html(msg.chat_id, &truncate_message(&reply, max_len))
            .await?;
        Ok(())
    }

    /// Dispatch a message to its reply text without sending it.
    pub async fn reply_for(&self, user_id: &UserId, text: &str) -> String {
        let command = Command::parse(text);
        info!(user_id = %user_id, command = command.kind(), "handling message");

        let sheet = self.registry.get_sheet(user_id).await;
        match (command, sheet) {
            (Command::Help, _) => HELP_TEXT.to_string(),
            (Command::Setup { email }, _) => self.setup(user_id, &email).await,
            (
                Command::Invalid(
                    err @ (ValidationError::MissingEmail | ValidationError::InvalidEmail(_)),
                ),
                _,
            ) => format!("⚠️ {}\n{SETUP_USAGE}", escape_html(&err.to_string())),
            (_, None) => SETUP_FIRST.to_string(),
            (Command::Expense { category, amount }, Some(sheet)) => {
                self.log_expense(user_id, &sheet, &category, amount).await
            }
            (Command::Summary, Some(sheet)) => self.summary(user_id, &sheet).await,
            (Command::Url, Some(sheet)) => format!(
                "Here's the link to your expense sheet: {}",
                self.gateway.sheet_url(&sheet)
            ),
            (Command::Invalid(err), Some(_)) => {
                format!("⚠️ {}\n{USAGE_HINT}", escape_html(&err.to_string()))
            }
            (Command::Unrecognized, Some(_)) => USAGE_HINT.to_string(),
        }
    }

    async fn setup(&self, user_id: &UserId, email: &str) -> String {
        let sheet = match self.gateway.provision(user_id, email).await {
            Ok(sheet) => sheet,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "sheet provisioning failed");
                return SETUP_FAILED.to_string();
            }
        };

        if let Err(e) = self
            .registry
            .set_sheet(user_id, sheet.clone(), Some(email.to_string()))
            .await
        {
            error!(user_id = %user_id, sheet_id = %sheet, error = %e, "failed to persist registry");
            return SETUP_FAILED.to_string();
        }

        info!(user_id = %user_id, sheet_id = %sheet, "user registered");
        format!(
            "✅ Setup complete! Your expenses will be logged to:\n{}\n\n\
📝 To log an expense, send: <code>Category Amount</code>\n\
🔗 To get your sheet link: <code>!url</code>\n\
📊 To see your expense summary: <code>!summary</code>",
            self.gateway.sheet_url(&sheet)
        )
    }

    async fn log_expense(
        &self,
        user_id: &UserId,
        sheet: &SheetId,
        category: &str,
        amount: f64,
    ) -> String {
        match self.gateway.append(sheet, category, amount).await {
            Ok(()) => {
                info!(user_id = %user_id, sheet_id = %sheet, category, amount, "expense logged");
                format!(
                    "Logged: {} - {}",
                    escape_html(category),
                    format_amount(amount)
                )
            }
            Err(e) => {
                warn!(user_id = %user_id, sheet_id = %sheet, error = %e, "append failed");
                APPEND_FAILED.to_string()
            }
        }
    }

    async fn summary(&self, user_id: &UserId, sheet: &SheetId) -> String {
        match self.gateway.read_all(sheet).await {
            Ok(rows) => Summary::from_rows(&rows, self.recent_limit)
                .to_html_within(self.messenger.capabilities().max_message_len),
            Err(e) => {
                warn!(user_id = %user_id, sheet_id = %sheet, error = %e, "read failed");
                READ_FAILED.to_string()
            }
        }
    }
}
