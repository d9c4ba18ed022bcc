//! `reshare start`: publish the next waiting event and commit the outcome.

use std::process::ExitCode;

use {
    chrono::{DateTime, Utc},
    reshare_common::{Channel, Event, EventPublicationStatus},
    reshare_config::ReshareConfig,
    reshare_publisher::{Coordinator, CoordinatorConfig, Error, Report, Result},
    reshare_storage::{PersistenceGateway, SqliteGateway, TimeWindow},
    tracing::{error, info},
};

use crate::registry;

/// Exit code when a commit failed after deliveries may have happened.
const EXIT_STATE_UNKNOWN: u8 = 2;

/// Publish `event` and commit the report.
///
/// A validation failure is returned as [`Error::Validation`] and commits
/// nothing. A commit failure is returned as [`Error::Persistence`]; the
/// deliveries in the lost report did happen.
pub async fn publish_and_commit(
    coordinator: &Coordinator,
    gateway: &dyn PersistenceGateway,
    event: &Event,
    channels: &[Channel],
) -> Result<Report> {
    let report = coordinator.publish(event, channels).await.into_result()?;
    gateway
        .commit(&report)
        .await
        .map_err(|e| Error::persistence(format!("commit report ({})", report.summary()), e))?;
    Ok(report)
}

/// Earliest-beginning event that was never attempted and has not started.
pub async fn next_event(
    gateway: &dyn PersistenceGateway,
    now: DateTime<Utc>,
) -> reshare_storage::Result<Option<Event>> {
    let events = gateway
        .events_without_publications(TimeWindow::since(now))
        .await?;
    Ok(events
        .into_iter()
        .find(|e| e.status == EventPublicationStatus::Waiting))
}

/// Pick the next event and publish it. `None` when there is nothing to do.
pub async fn publish_next(
    coordinator: &Coordinator,
    gateway: &dyn PersistenceGateway,
    channels: &[Channel],
    now: DateTime<Utc>,
) -> Result<Option<Report>> {
    let event = next_event(gateway, now)
        .await
        .map_err(|e| Error::persistence("select next event", e))?;
    let Some(event) = event else {
        return Ok(None);
    };
    info!(event_id = %event.external_id, name = %event.name, "publishing event");
    publish_and_commit(coordinator, gateway, &event, channels)
        .await
        .map(Some)
}

pub async fn run(config: &ReshareConfig) -> anyhow::Result<ExitCode> {
    let channels = config.active_channels();
    if channels.is_empty() {
        anyhow::bail!("no active channel configured; enable one under [channels.<name>]");
    }

    let gateway = SqliteGateway::open(&config.database.resolved_path()).await?;
    gateway.sync_channels(&channels).await?;

    let coordinator = Coordinator::new(registry::from_config(config)?, CoordinatorConfig {
        delivery_timeout: config.publishing.delivery_timeout(),
        validation_timeout: config.publishing.validation_timeout(),
    });

    match publish_next(&coordinator, &gateway, &channels, Utc::now()).await {
        Ok(None) => {
            println!("No event to publish found");
            Ok(ExitCode::SUCCESS)
        },
        Ok(Some(report)) => {
            println!("{}: {}", report.event.name, report.summary());
            Ok(if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        },
        Err(Error::Validation {
            invalid_credentials,
            invalid_event,
        }) => {
            eprintln!("Validation failed, nothing was published:");
            for failure in &invalid_credentials {
                eprintln!("  credentials  {}: {}", failure.channel, failure.reason);
            }
            for failure in &invalid_event {
                eprintln!("  content      {}: {}", failure.channel, failure.reason);
            }
            Ok(ExitCode::FAILURE)
        },
        Err(e @ Error::Persistence { .. }) => {
            error!(error = %e, "state unknown, do not retry blindly");
            eprintln!("Error: {e}");
            eprintln!(
                "Deliveries may have happened but were not recorded. Check the channels before retrying."
            );
            Ok(ExitCode::from(EXIT_STATE_UNKNOWN))
        },
    }
}
