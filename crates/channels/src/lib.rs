//! Channel plug-in system.
//!
//! Each output channel (Telegram, Zulip, etc.) implements the
//! [`PublisherPlugin`] capability: credential validation, content validation,
//! and delivery. Plug-ins are looked up by channel name through an explicit
//! [`PublisherRegistry`].

pub mod error;
pub mod format;
pub mod plugin;
pub mod registry;

pub use {
    error::{Error, Result},
    plugin::PublisherPlugin,
    registry::PublisherRegistry,
};
