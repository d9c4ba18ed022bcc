//! Per-channel delivery with a single timeout policy.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use {
    futures::future::join_all,
    reshare_channels::{PublisherPlugin, PublisherRegistry},
    reshare_common::{Channel, Event, Publication},
    tracing::{debug, warn},
};

/// Delivers an event to each channel exactly once and records the outcome.
///
/// Each delivery runs on its own tokio task, so a channel that is slow,
/// fails or panics never affects another, and a delivery already in flight
/// keeps running if the caller stops waiting for it.
#[derive(Debug, Clone)]
pub struct DeliveryExecutor {
    registry: PublisherRegistry,
    timeout: Duration,
}

impl DeliveryExecutor {
    pub fn new(registry: PublisherRegistry, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    /// Deliver to every channel and wait for all of them.
    ///
    /// Returns one terminal publication per channel, in `channels` order.
    pub async fn deliver_all(&self, event: &Event, channels: &[Channel]) -> Vec<Publication> {
        let deliveries = channels.iter().map(|channel| self.deliver(event, channel));
        join_all(deliveries).await
    }

    /// Deliver to a single channel. Never fails: every error, timeout or
    /// panic becomes a `FAILED` publication carrying the reason.
    pub async fn deliver(&self, event: &Event, channel: &Channel) -> Publication {
        let mut publication = Publication::new(event.external_id, &channel.name);
        if let Err(e) = publication.dispatch() {
            warn!(channel = %channel.name, error = %e, "could not mark publication as dispatched");
        }
        debug!(
            channel = %channel.name,
            event_id = %event.external_id,
            publication_id = %publication.id,
            "dispatching delivery"
        );

        let outcome = match self.registry.get(&channel.name) {
            Some(plugin) => self.spawn_delivery(plugin, event, channel).await,
            None => Err(format!("no publisher registered for channel: {}", channel.name)),
        };
        settle(&mut publication, outcome);
        publication
    }

    async fn spawn_delivery(
        &self,
        plugin: Arc<dyn PublisherPlugin>,
        event: &Event,
        channel: &Channel,
    ) -> Result<(), String> {
        let limit = self.timeout;
        let event = event.clone();
        let channel = channel.clone();
        let started = Instant::now();

        let handle = tokio::spawn(async move {
            match tokio::time::timeout(limit, plugin.deliver(&event, &channel)).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e.reason()),
                Err(_) => Err(format!("delivery timed out after {limit:?}")),
            }
        });

        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => Err("delivery task panicked".to_string()),
            Err(e) => Err(format!("delivery task aborted: {e}")),
        };
        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = outcome.is_ok(),
            "delivery finished"
        );
        outcome
    }
}

/// Move a dispatched publication to its terminal state.
fn settle(publication: &mut Publication, outcome: Result<(), String>) {
    let transition = match outcome {
        Ok(()) => publication.complete(),
        Err(reason) => {
            warn!(
                channel = %publication.channel,
                event_id = %publication.event_id,
                reason = %reason,
                "delivery failed"
            );
            publication.fail(reason)
        },
    };
    if let Err(e) = transition {
        warn!(publication_id = %publication.id, error = %e, "could not settle publication");
    }
}
