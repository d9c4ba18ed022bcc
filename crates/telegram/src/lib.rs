//! Telegram publisher plug-in for reshare.
//!
//! Implements `PublisherPlugin` with the teloxide Bot API client: `getMe`
//! for credential checks and `sendMessage` (HTML parse mode) for delivery.

pub mod config;
pub mod plugin;

pub use {config::TelegramConfig, plugin::TelegramPublisher};

/// Telegram rejects messages longer than this many characters.
pub const TELEGRAM_MAX_MESSAGE_LEN: usize = 4096;
