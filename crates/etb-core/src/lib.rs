//! Core domain + application logic for the expense-tracking Telegram bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and the spreadsheet
//! service live behind ports (traits) implemented in adapter crates.

pub mod command;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod gateway;
pub mod handler;
pub mod logging;
pub mod messaging;
pub mod registry;
pub mod summary;

pub use errors::{Error, Result};
