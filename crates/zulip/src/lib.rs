//! Zulip publisher plug-in for reshare.
//!
//! Posts event announcements to a stream topic through the Zulip REST API,
//! authenticating as a bot with HTTP basic auth (email + API key).

pub mod config;
pub mod plugin;

pub use {config::ZulipConfig, plugin::ZulipPublisher};

/// Zulip's default maximum message length.
pub const ZULIP_MAX_MESSAGE_LEN: usize = 10_000;
