//! The persistence contract shared by the SQLite and in-memory stores.

use {
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    reshare_common::{Channel, Event, EventPublicationStatus, Publication, PublicationStatus},
    reshare_publisher::Report,
    uuid::Uuid,
};

use crate::{Error, Result};

/// Inclusive time range; an open side is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeWindow {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }

    /// From `from` onwards.
    #[must_use]
    pub fn since(from: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            to: None,
        }
    }

    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| at >= from) && self.to.is_none_or(|to| at <= to)
    }

    /// Bounds as epoch milliseconds, open sides mapped to the i64 extremes.
    #[must_use]
    pub fn bounds_ms(&self) -> (i64, i64) {
        (
            self.from.map_or(i64::MIN, |t| t.timestamp_millis()),
            self.to.map_or(i64::MAX, |t| t.timestamp_millis()),
        )
    }
}

/// What a `commit` changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitSummary {
    /// Publications written by this commit.
    pub inserted: usize,
    /// Publications skipped because their id was already stored.
    pub duplicates: usize,
    /// The event's derived status after the commit.
    pub status: EventPublicationStatus,
}

/// The only writer of durable state.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Apply a publish report atomically.
    ///
    /// Inserts every publication of the report, skipping ids that are
    /// already stored, then recomputes the event's status over all of its
    /// publications. A report without publications changes nothing and
    /// returns the stored status. Fails with `EventNotFound` for an unknown
    /// event either way.
    async fn commit(&self, report: &Report) -> Result<CommitSummary>;

    /// Make sure a publisher row exists for every channel.
    async fn sync_channels(&self, channels: &[Channel]) -> Result<()>;

    /// Store events whose external id is not known yet; returns those.
    async fn save_new_events(&self, events: &[Event]) -> Result<Vec<Event>>;

    async fn get_event(&self, external_id: Uuid) -> Result<Event>;

    /// Every publication of an event, oldest first.
    async fn event_publications(&self, external_id: Uuid) -> Result<Vec<Publication>>;

    /// Events beginning within `window`, ordered by begin time.
    async fn get_all_events(&self, window: TimeWindow) -> Result<Vec<Event>>;

    /// Events beginning within `window` whose derived status is one of
    /// `statuses`.
    async fn events_with_status(
        &self,
        statuses: &[EventPublicationStatus],
        window: TimeWindow,
    ) -> Result<Vec<Event>>;

    /// Events beginning within `window` that were never attempted.
    async fn events_without_publications(&self, window: TimeWindow) -> Result<Vec<Event>>;

    /// Publications with `status` whose timestamp falls in `window`,
    /// optionally restricted to one event.
    async fn publications_with_status(
        &self,
        status: PublicationStatus,
        event: Option<Uuid>,
        window: TimeWindow,
    ) -> Result<Vec<Publication>>;
}

/// Reject reports whose publications point at a different event.
pub(crate) fn check_report(report: &Report) -> Result<()> {
    let event_id = report.event.external_id;
    match report.publications.iter().find(|p| p.event_id != event_id) {
        Some(stray) => Err(Error::message(format!(
            "publication {} belongs to event {}, not {event_id}",
            stray.id, stray.event_id
        ))),
        None => Ok(()),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, chrono::TimeZone, rstest::rstest};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, hour, 0, 0).unwrap()
    }

    #[rstest]
    #[case(TimeWindow::all(), 5, true)]
    #[case(TimeWindow::since(at(5)), 5, true)]
    #[case(TimeWindow::since(at(6)), 5, false)]
    #[case(TimeWindow::new(Some(at(1)), Some(at(5))), 5, true)]
    #[case(TimeWindow::new(None, Some(at(4))), 5, false)]
    fn window_is_inclusive(#[case] window: TimeWindow, #[case] hour: u32, #[case] inside: bool) {
        assert_eq!(window.contains(at(hour)), inside);
    }

    #[test]
    fn open_bounds_cover_everything() {
        assert_eq!(TimeWindow::all().bounds_ms(), (i64::MIN, i64::MAX));
        let (from, to) = TimeWindow::since(at(0)).bounds_ms();
        assert_eq!(from, at(0).timestamp_millis());
        assert_eq!(to, i64::MAX);
    }
}
