//! Builds the publisher registry from configuration.

use std::sync::Arc;

use {
    anyhow::Context,
    reshare_channels::PublisherRegistry,
    reshare_config::ReshareConfig,
    reshare_telegram::TelegramPublisher,
    reshare_zulip::ZulipPublisher,
    tracing::warn,
};

/// Instantiate the built-in plug-in for every active channel.
///
/// Channels without a built-in plug-in are left out of the registry, so the
/// coordinator reports them as invalid instead of silently skipping them.
pub fn from_config(config: &ReshareConfig) -> anyhow::Result<PublisherRegistry> {
    let mut registry = PublisherRegistry::new();
    for channel in config.active_channels() {
        let Some(settings) = config.channel(&channel.name) else {
            continue;
        };
        let options = settings.plugin_config();
        match channel.name.as_str() {
            "telegram" => registry.register(Arc::new(
                TelegramPublisher::from_value(options).context("invalid telegram settings")?,
            )),
            "zulip" => registry.register(Arc::new(
                ZulipPublisher::from_value(options).context("invalid zulip settings")?,
            )),
            other => warn!(channel = other, "no built-in publisher for channel"),
        }
    }
    Ok(registry)
}
