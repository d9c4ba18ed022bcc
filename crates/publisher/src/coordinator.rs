use std::time::{Duration, Instant};

use {
    reshare_channels::PublisherRegistry,
    reshare_common::{Channel, Event},
    tracing::{info, warn},
};

use crate::{
    executor::DeliveryExecutor, report::Report, validator::ChannelValidator,
};

/// Timeouts applied by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Upper bound for one channel's delivery call.
    pub delivery_timeout: Duration,
    /// Upper bound for each credential or content check.
    pub validation_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            delivery_timeout: Duration::from_secs(30),
            validation_timeout: Duration::from_secs(15),
        }
    }
}

/// Entry point for publishing one event to a set of channels.
///
/// Holds only the plug-in registry and timeouts; every `publish` call is
/// independent of the others.
#[derive(Debug, Clone)]
pub struct Coordinator {
    validator: ChannelValidator,
    executor: DeliveryExecutor,
}

impl Coordinator {
    pub fn new(registry: PublisherRegistry, config: CoordinatorConfig) -> Self {
        Self {
            validator: ChannelValidator::new(registry.clone(), config.validation_timeout),
            executor: DeliveryExecutor::new(registry, config.delivery_timeout),
        }
    }

    /// Validate all channels, then deliver to each of them.
    ///
    /// If any channel fails validation nothing is delivered and the report
    /// carries the failing channels instead of publications. Otherwise the
    /// report holds exactly one terminal publication per channel.
    pub async fn publish(&self, event: &Event, channels: &[Channel]) -> Report {
        let started = Instant::now();

        let validation = self.validator.validate(event, channels).await;
        if !validation.is_valid() {
            warn!(
                event_id = %event.external_id,
                invalid_credentials = validation.invalid_credentials.len(),
                invalid_event = validation.invalid_event.len(),
                "validation failed, nothing delivered"
            );
            return Report::validation_failed(event.clone(), validation);
        }
        info!(
            event_id = %event.external_id,
            channels = channels.len(),
            "validation passed"
        );

        let publications = self.executor.deliver_all(event, channels).await;
        let report = Report::from_publications(event.clone(), publications);
        info!(
            event_id = %event.external_id,
            status = %report.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "publish finished"
        );
        report
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            ReportStatus,
            mock::{MockPlugin, channels, registry, sample_event},
        },
        reshare_common::PublicationStatus,
        std::sync::{Arc, atomic::Ordering},
    };

    fn coordinator(plugins: Vec<MockPlugin>) -> Coordinator {
        Coordinator::new(registry(plugins), CoordinatorConfig::default())
    }

    #[tokio::test]
    async fn all_deliveries_succeed() {
        let c = coordinator(vec![MockPlugin::ok("a"), MockPlugin::ok("b")]);
        let report = c.publish(&sample_event(), &channels(&["a", "b"])).await;

        assert_eq!(report.status, ReportStatus::Success);
        assert_eq!(report.publications.len(), 2);
        assert!(
            report
                .publications
                .iter()
                .all(|p| p.status == PublicationStatus::Completed)
        );
    }

    #[tokio::test]
    async fn one_failing_channel_is_partial_failure() {
        let c = coordinator(vec![
            MockPlugin::ok("a"),
            MockPlugin::failing("b", "rate limited"),
            MockPlugin::ok("c"),
        ]);
        let report = c.publish(&sample_event(), &channels(&["a", "b", "c"])).await;

        assert_eq!(report.status, ReportStatus::PartialFailure);
        let b = report.outcome("b").unwrap();
        assert_eq!(b.status, PublicationStatus::Failed);
        assert_eq!(b.reason.as_deref(), Some("rate limited"));
        assert_eq!(
            report.outcome("a").unwrap().status,
            PublicationStatus::Completed
        );
        assert_eq!(
            report.outcome("c").unwrap().status,
            PublicationStatus::Completed
        );
    }

    #[tokio::test]
    async fn every_channel_failing_is_failure() {
        let c = coordinator(vec![
            MockPlugin::failing("a", "down"),
            MockPlugin::failing("b", "down"),
        ]);
        let report = c.publish(&sample_event(), &channels(&["a", "b"])).await;
        assert_eq!(report.status, ReportStatus::Failure);
        assert_eq!(report.failed().count(), 2);
        assert!(!report.is_validation_failure());
    }

    #[tokio::test]
    async fn any_invalid_channel_blocks_every_delivery() {
        let good = MockPlugin::ok("a");
        let good_count = good.deliveries();
        let bad = MockPlugin {
            bad_content: Some("too long".into()),
            ..MockPlugin::ok("b")
        };
        let bad_count = bad.deliveries();

        let c = coordinator(vec![good, bad]);
        let report = c.publish(&sample_event(), &channels(&["a", "b"])).await;

        assert_eq!(report.status, ReportStatus::Failure);
        assert!(report.publications.is_empty());
        assert!(report.invalid_credentials.is_empty());
        assert_eq!(report.invalid_event.len(), 1);
        assert_eq!(report.invalid_event[0].channel, "b");
        assert_eq!(good_count.load(Ordering::SeqCst), 0);
        assert_eq!(bad_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn report_accounts_for_every_channel() {
        let names = ["a", "b", "c", "d", "e"];
        let plugins = names
            .iter()
            .enumerate()
            .map(|(i, n)| {
                if i % 2 == 0 {
                    MockPlugin::ok(n)
                } else {
                    MockPlugin::failing(n, "nope")
                }
            })
            .collect();
        let c = coordinator(plugins);
        let report = c.publish(&sample_event(), &channels(&names)).await;

        let mut seen: Vec<&str> = report
            .publications
            .iter()
            .map(|p| p.channel.as_str())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, names);
        assert!(report.publications.iter().all(|p| p.status.is_terminal()));
    }

    #[tokio::test]
    async fn slow_channel_times_out_without_blocking_others() {
        let slow = MockPlugin {
            delay: Some(Duration::from_secs(10)),
            ..MockPlugin::ok("slow")
        };
        let config = CoordinatorConfig {
            delivery_timeout: Duration::from_millis(50),
            ..CoordinatorConfig::default()
        };
        let c = Coordinator::new(registry(vec![slow, MockPlugin::ok("fast")]), config);
        let report = c.publish(&sample_event(), &channels(&["slow", "fast"])).await;

        assert_eq!(report.status, ReportStatus::PartialFailure);
        let slow = report.outcome("slow").unwrap();
        assert_eq!(slow.status, PublicationStatus::Failed);
        assert!(slow.reason.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn abandoned_publish_lets_deliveries_finish() {
        let slowish = MockPlugin {
            delay: Some(Duration::from_millis(100)),
            ..MockPlugin::ok("a")
        };
        let count = slowish.deliveries();
        let c = Arc::new(coordinator(vec![slowish]));

        let task = {
            let c = Arc::clone(&c);
            tokio::spawn(async move { c.publish(&sample_event(), &channels(&["a"])).await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;
        task.abort();

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_publishes_are_independent() {
        let c = coordinator(vec![MockPlugin::ok("a")]);
        let mut other = sample_event();
        other.external_id = uuid::Uuid::from_u128(0xE2);
        let batch = channels(&["a"]);
        let first_event = sample_event();

        let (first, second) = tokio::join!(
            c.publish(&first_event, &batch),
            c.publish(&other, &batch)
        );
        assert_eq!(first.event.external_id, sample_event().external_id);
        assert_eq!(second.event.external_id, other.external_id);
        assert_ne!(first.publications[0].id, second.publications[0].id);
    }
}
