//! Classifier for a single incoming text line.
//!
//! Tokens are case-sensitive and categories are kept verbatim, so `Food` and
//! `food` end up as different categories in summaries.

use crate::errors::ValidationError;

pub const SETUP: &str = "!setup";
pub const SUMMARY: &[&str] = &["!summary", "!expenses", "!stats"];
pub const URL: &[&str] = &["!url", "!sheet", "!link"];
pub const HELP: &[&str] = &["!help", "!commands"];

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Setup { email: String },
    Summary,
    Url,
    Help,
    Expense { category: String, amount: f64 },
    Invalid(ValidationError),
    Unrecognized,
}

impl Command {
    pub fn parse(text: &str) -> Self {
        let line = text.trim();

        if let Some(rest) = strip_token(line, SETUP) {
            return parse_setup(rest);
        }
        if SUMMARY.contains(&line) {
            return Command::Summary;
        }
        if URL.contains(&line) {
            return Command::Url;
        }
        if HELP.contains(&line) {
            return Command::Help;
        }

        parse_expense(line)
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Command::Setup { .. } => "setup",
            Command::Summary => "summary",
            Command::Url => "url",
            Command::Help => "help",
            Command::Expense { .. } => "expense",
            Command::Invalid(_) => "invalid",
            Command::Unrecognized => "unrecognized",
        }
    }
}

/// `!setup` must be a whole token: `!setupx` is not a setup command.
fn strip_token<'a>(line: &'a str, token: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(token)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

fn parse_setup(arg: &str) -> Command {
    if arg.is_empty() {
        return Command::Invalid(ValidationError::MissingEmail);
    }
    if !arg.contains('@') || arg.split_whitespace().count() != 1 {
        return Command::Invalid(ValidationError::InvalidEmail(arg.to_string()));
    }
    Command::Setup {
        email: arg.to_string(),
    }
}

fn parse_expense(line: &str) -> Command {
    let mut parts = line.split_whitespace();
    let (Some(category), Some(raw_amount), None) = (parts.next(), parts.next(), parts.next())
    else {
        return Command::Unrecognized;
    };

    let amount = match raw_amount.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            return Command::Invalid(ValidationError::NonNumericAmount(raw_amount.to_string()))
        }
    };
    if amount < 0.0 {
        return Command::Invalid(ValidationError::NegativeAmount);
    }

    Command::Expense {
        category: category.to_string(),
        amount,
    }
}
