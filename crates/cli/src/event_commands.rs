//! Event hand-off and read-only inspection commands.

use std::{path::Path, process::ExitCode};

use {
    anyhow::Context,
    chrono::{DateTime, NaiveDate, Utc},
    clap::{Args, ValueEnum},
    reshare_common::{Event, EventPublicationStatus, Publication, PublicationStatus},
    reshare_config::ReshareConfig,
    reshare_storage::{PersistenceGateway, SqliteGateway, TimeWindow},
    uuid::Uuid,
};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum EventFilter {
    All,
    Waiting,
    Failed,
    Partial,
    Completed,
}

impl EventFilter {
    fn status(self) -> Option<EventPublicationStatus> {
        match self {
            Self::All => None,
            Self::Waiting => Some(EventPublicationStatus::Waiting),
            Self::Failed => Some(EventPublicationStatus::Failed),
            Self::Partial => Some(EventPublicationStatus::Partial),
            Self::Completed => Some(EventPublicationStatus::Completed),
        }
    }
}

#[derive(Args)]
pub struct InspectArgs {
    /// Which events to list.
    #[arg(value_enum, default_value_t = EventFilter::All)]
    pub filter: EventFilter,
    /// Only events beginning at or after this time (RFC 3339 or YYYY-MM-DD).
    #[arg(long, value_parser = parse_datetime)]
    pub begin: Option<DateTime<Utc>>,
    /// Only events beginning at or before this time.
    #[arg(long, value_parser = parse_datetime)]
    pub end: Option<DateTime<Utc>>,
}

#[derive(Args)]
pub struct PublicationsArgs {
    /// Publication status to list (waiting, completed, failed).
    #[arg(long, value_parser = parse_publication_status)]
    pub status: PublicationStatus,
    /// Restrict to one event's external id.
    #[arg(long)]
    pub event: Option<Uuid>,
    #[arg(long, value_parser = parse_datetime)]
    pub from: Option<DateTime<Utc>>,
    #[arg(long, value_parser = parse_datetime)]
    pub to: Option<DateTime<Utc>>,
}

/// Accepts RFC 3339 timestamps or plain dates (midnight UTC).
fn parse_datetime(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("invalid date \"{value}\", expected RFC 3339 or YYYY-MM-DD"))
}

fn parse_publication_status(value: &str) -> Result<PublicationStatus, String> {
    value.parse().map_err(|e: reshare_common::Error| e.to_string())
}

async fn open_gateway(config: &ReshareConfig) -> anyhow::Result<SqliteGateway> {
    let path = config.database.resolved_path();
    SqliteGateway::open(&path)
        .await
        .with_context(|| format!("failed to open database {}", path.display()))
}

/// Parse a JSON array of events.
fn read_events(path: &Path) -> anyhow::Result<Vec<Event>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid event file {}", path.display()))
}

pub async fn ingest(config: &ReshareConfig, file: &Path) -> anyhow::Result<ExitCode> {
    let events = read_events(file)?;
    let gateway = open_gateway(config).await?;
    let stored = gateway.save_new_events(&events).await?;
    println!("Stored {} new event(s) of {}", stored.len(), events.len());
    Ok(ExitCode::SUCCESS)
}

pub async fn inspect(config: &ReshareConfig, args: InspectArgs) -> anyhow::Result<ExitCode> {
    let gateway = open_gateway(config).await?;
    let events = list_events(&gateway, &args).await?;
    if events.is_empty() {
        println!("No events found.");
    }
    for event in &events {
        println!("{}", event_line(event));
    }
    Ok(ExitCode::SUCCESS)
}

async fn list_events(
    gateway: &dyn PersistenceGateway,
    args: &InspectArgs,
) -> reshare_storage::Result<Vec<Event>> {
    let window = TimeWindow::new(args.begin, args.end);
    match args.filter.status() {
        Some(status) => gateway.events_with_status(&[status], window).await,
        None => gateway.get_all_events(window).await,
    }
}

pub async fn publications(
    config: &ReshareConfig,
    args: PublicationsArgs,
) -> anyhow::Result<ExitCode> {
    let gateway = open_gateway(config).await?;
    let found = gateway
        .publications_with_status(args.status, args.event, TimeWindow::new(args.from, args.to))
        .await?;
    if found.is_empty() {
        println!("No publications found.");
    }
    for publication in &found {
        println!("{}", publication_line(publication));
    }
    Ok(ExitCode::SUCCESS)
}

fn event_line(event: &Event) -> String {
    format!(
        "{}  {:<9}  {}  {}",
        event.begin_datetime.format(DATETIME_FORMAT),
        event.status,
        event.external_id,
        event.name
    )
}

fn publication_line(publication: &Publication) -> String {
    let mut line = format!(
        "{}  {:<9}  {:<10}  {}",
        publication.timestamp.format(DATETIME_FORMAT),
        publication.status,
        publication.channel,
        publication.event_id
    );
    if let Some(reason) = &publication.reason {
        line.push_str("  ");
        line.push_str(reason);
    }
    line
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        chrono::{Duration, TimeZone},
        reshare_publisher::Report,
        reshare_storage::InMemoryGateway,
        rstest::rstest,
        std::io::Write,
    };

    #[rstest]
    #[case("2030-05-01", Utc.with_ymd_and_hms(2030, 5, 1, 0, 0, 0).unwrap())]
    #[case("2030-05-01T12:30:00Z", Utc.with_ymd_and_hms(2030, 5, 1, 12, 30, 0).unwrap())]
    #[case("2030-05-01T14:30:00+02:00", Utc.with_ymd_and_hms(2030, 5, 1, 12, 30, 0).unwrap())]
    fn datetime_arguments(#[case] input: &str, #[case] expected: DateTime<Utc>) {
        assert_eq!(parse_datetime(input).unwrap(), expected);
    }

    #[test]
    fn bad_datetime_is_rejected() {
        assert!(parse_datetime("next tuesday").is_err());
    }

    #[test]
    fn publication_status_argument() {
        assert_eq!(
            parse_publication_status("failed").unwrap(),
            PublicationStatus::Failed
        );
        assert!(parse_publication_status("sent").is_err());
    }

    #[test]
    fn event_file_parses_without_status() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{
                "external_id": "00000000-0000-0000-0000-000000000001",
                "name": "Repair café",
                "link": "https://mobilizon.example/events/1",
                "begin_datetime": "2030-05-01T18:00:00Z",
                "end_datetime": "2030-05-01T21:00:00Z"
            }}]"#
        )
        .unwrap();

        let events = read_events(file.path()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, EventPublicationStatus::Waiting);
        assert!(events[0].description.is_none());
    }

    #[test]
    fn malformed_event_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"not\": \"a list\"}}").unwrap();
        assert!(read_events(file.path()).is_err());
    }

    #[tokio::test]
    async fn inspect_filters_by_derived_status() {
        let gateway = InMemoryGateway::new();
        let begin = Utc.with_ymd_and_hms(2030, 5, 1, 18, 0, 0).unwrap();
        let make = |n: u128| Event {
            external_id: Uuid::from_u128(n),
            name: format!("event {n}"),
            description: None,
            link: "https://mobilizon.example".into(),
            thumbnail_link: None,
            location: None,
            begin_datetime: begin + Duration::days(n as i64),
            end_datetime: begin + Duration::days(n as i64) + Duration::hours(1),
            status: EventPublicationStatus::Waiting,
        };
        let (failed, waiting) = (make(1), make(2));
        gateway
            .save_new_events(&[failed.clone(), waiting.clone()])
            .await
            .unwrap();
        let mut p = Publication::new(failed.external_id, "zulip");
        p.dispatch().unwrap();
        p.fail("stream missing").unwrap();
        gateway
            .commit(&Report::from_publications(failed.clone(), vec![p]))
            .await
            .unwrap();

        let args = InspectArgs {
            filter: EventFilter::Failed,
            begin: None,
            end: None,
        };
        let listed = list_events(&gateway, &args).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].external_id, failed.external_id);
        assert!(event_line(&listed[0]).contains("FAILED"));

        let args = InspectArgs {
            filter: EventFilter::All,
            begin: Some(waiting.begin_datetime),
            end: None,
        };
        let listed = list_events(&gateway, &args).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].external_id, waiting.external_id);
    }

    #[test]
    fn publication_line_shows_reason() {
        let mut p = Publication::new(Uuid::nil(), "telegram");
        p.dispatch().unwrap();
        p.fail("rate limited").unwrap();
        let line = publication_line(&p);
        assert!(line.contains("FAILED"));
        assert!(line.contains("telegram"));
        assert!(line.ends_with("rate limited"));
    }
}
