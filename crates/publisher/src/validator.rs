//! Pre-delivery screening of every channel in a batch.

use std::time::Duration;

use {
    futures::future::join_all,
    reshare_channels::{Error as ChannelError, PublisherRegistry},
    reshare_common::{Channel, Event},
    tokio::time::timeout,
    tracing::{debug, warn},
};

use crate::report::ChannelFailure;

/// Channels that failed the credential check and the content check.
///
/// A channel may appear in both lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub invalid_credentials: Vec<ChannelFailure>,
    pub invalid_event: Vec<ChannelFailure>,
}

impl ValidationOutcome {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.invalid_credentials.is_empty() && self.invalid_event.is_empty()
    }
}

/// Runs credential and content checks for each channel without delivering.
#[derive(Debug, Clone)]
pub struct ChannelValidator {
    registry: PublisherRegistry,
    timeout: Duration,
}

impl ChannelValidator {
    pub fn new(registry: PublisherRegistry, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    /// Check every channel. Channels are evaluated concurrently and
    /// independently; one failing never short-circuits another.
    pub async fn validate(&self, event: &Event, channels: &[Channel]) -> ValidationOutcome {
        let checks = channels.iter().map(|channel| self.check_channel(event, channel));
        let results = join_all(checks).await;

        let mut outcome = ValidationOutcome::default();
        for (credentials, content) in results {
            outcome.invalid_credentials.extend(credentials);
            outcome.invalid_event.extend(content);
        }
        outcome
    }

    async fn check_channel(
        &self,
        event: &Event,
        channel: &Channel,
    ) -> (Option<ChannelFailure>, Option<ChannelFailure>) {
        let Some(plugin) = self.registry.get(&channel.name) else {
            let reason = ChannelError::unknown_publisher(&channel.name).to_string();
            warn!(channel = %channel.name, reason = %reason, "channel has no publisher");
            return (Some(ChannelFailure::new(&channel.name, reason)), None);
        };

        let (credentials, content) = tokio::join!(
            timeout(self.timeout, plugin.validate_credentials(channel)),
            timeout(self.timeout, plugin.validate_content(event)),
        );

        let credentials = self.failure(channel, "credentials", credentials);
        let content = self.failure(channel, "content", content);
        if credentials.is_none() && content.is_none() {
            debug!(channel = %channel.name, event_id = %event.external_id, "channel valid");
        }
        (credentials, content)
    }

    fn failure(
        &self,
        channel: &Channel,
        check: &'static str,
        result: Result<reshare_channels::Result<()>, tokio::time::error::Elapsed>,
    ) -> Option<ChannelFailure> {
        let reason = match result {
            Ok(Ok(())) => return None,
            Ok(Err(e)) => e.reason(),
            Err(_) => format!("{check} check timed out after {:?}", self.timeout),
        };
        warn!(channel = %channel.name, check, reason = %reason, "channel failed validation");
        Some(ChannelFailure::new(&channel.name, reason))
    }
}
