//! In-memory gateway for testing. No persistence.

use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
};

use {
    async_trait::async_trait,
    reshare_common::{
        Channel, Event, EventPublicationStatus, Publication, PublicationStatus, derive_status,
    },
    reshare_publisher::Report,
    tracing::debug,
    uuid::Uuid,
};

use crate::{
    Error, Result,
    gateway::{CommitSummary, PersistenceGateway, TimeWindow, check_report},
};

struct StoredPublication {
    publication: Publication,
    attempt: u32,
}

#[derive(Default)]
struct State {
    events: Vec<Event>,
    /// Publisher name to account reference.
    publishers: BTreeMap<String, Option<String>>,
    publications: Vec<StoredPublication>,
}

impl State {
    fn event_index(&self, external_id: Uuid) -> Result<usize> {
        self.events
            .iter()
            .position(|e| e.external_id == external_id)
            .ok_or_else(|| Error::event_not_found(external_id))
    }

    fn publications_of(&self, external_id: Uuid) -> impl Iterator<Item = &Publication> {
        self.publications
            .iter()
            .map(|stored| &stored.publication)
            .filter(move |p| p.event_id == external_id)
    }

    fn with_derived_status(&self, event: &Event) -> Event {
        Event {
            status: derive_status(self.publications_of(event.external_id).map(|p| p.status)),
            ..event.clone()
        }
    }

    /// Events beginning within `window`, by begin time.
    fn events_in(&self, window: TimeWindow) -> Vec<Event> {
        let mut events: Vec<Event> = self
            .events
            .iter()
            .filter(|e| window.contains(e.begin_datetime))
            .map(|e| self.with_derived_status(e))
            .collect();
        events.sort_by_key(|e| e.begin_datetime);
        events
    }
}

/// Gateway holding everything in a mutex-guarded state. Each operation is
/// one critical section, which gives it the same atomicity as a SQLite
/// transaction.
#[derive(Default)]
pub struct InMemoryGateway {
    state: Mutex<State>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Attempt numbers stored for one (event, channel) pair.
    pub fn attempts(&self, external_id: Uuid, channel: &str) -> Vec<u32> {
        self.state()
            .publications
            .iter()
            .filter(|s| s.publication.event_id == external_id && s.publication.channel == channel)
            .map(|s| s.attempt)
            .collect()
    }

    /// Names of known publishers, sorted.
    pub fn publishers(&self) -> Vec<String> {
        self.state().publishers.keys().cloned().collect()
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryGateway {
    async fn commit(&self, report: &Report) -> Result<CommitSummary> {
        let external_id = report.event.external_id;
        let mut state = self.state();
        let index = state.event_index(external_id)?;
        if report.publications.is_empty() {
            debug!(event_id = %external_id, "report has no outcomes, nothing to commit");
            return Ok(CommitSummary {
                inserted: 0,
                duplicates: 0,
                status: state.with_derived_status(&state.events[index]).status,
            });
        }
        check_report(report)?;

        let mut inserted = 0;
        let mut duplicates = 0;
        for publication in &report.publications {
            if state
                .publications
                .iter()
                .any(|s| s.publication.id == publication.id)
            {
                duplicates += 1;
                continue;
            }
            let previous = state
                .publications_of(external_id)
                .filter(|p| p.channel == publication.channel)
                .count();
            state
                .publishers
                .entry(publication.channel.clone())
                .or_insert(None);
            state.publications.push(StoredPublication {
                publication: publication.clone(),
                attempt: u32::try_from(previous + 1).unwrap_or(u32::MAX),
            });
            inserted += 1;
        }

        let status = derive_status(state.publications_of(external_id).map(|p| p.status));
        state.events[index].status = status;
        debug!(event_id = %external_id, inserted, duplicates, status = %status, "report committed");
        Ok(CommitSummary {
            inserted,
            duplicates,
            status,
        })
    }

    async fn sync_channels(&self, channels: &[Channel]) -> Result<()> {
        let mut state = self.state();
        for channel in channels {
            state
                .publishers
                .insert(channel.name.clone(), channel.account_ref.clone());
        }
        Ok(())
    }

    async fn save_new_events(&self, events: &[Event]) -> Result<Vec<Event>> {
        let mut state = self.state();
        let mut stored = Vec::new();
        for event in events {
            if state.event_index(event.external_id).is_ok() {
                continue;
            }
            let event = Event {
                status: EventPublicationStatus::Waiting,
                ..event.clone()
            };
            state.events.push(event.clone());
            stored.push(event);
        }
        Ok(stored)
    }

    async fn get_event(&self, external_id: Uuid) -> Result<Event> {
        let state = self.state();
        let index = state.event_index(external_id)?;
        Ok(state.with_derived_status(&state.events[index]))
    }

    async fn event_publications(&self, external_id: Uuid) -> Result<Vec<Publication>> {
        let state = self.state();
        state.event_index(external_id)?;
        let mut publications: Vec<Publication> =
            state.publications_of(external_id).cloned().collect();
        publications.sort_by_key(|p| p.timestamp);
        Ok(publications)
    }

    async fn get_all_events(&self, window: TimeWindow) -> Result<Vec<Event>> {
        Ok(self.state().events_in(window))
    }

    async fn events_with_status(
        &self,
        statuses: &[EventPublicationStatus],
        window: TimeWindow,
    ) -> Result<Vec<Event>> {
        let mut events = self.state().events_in(window);
        events.retain(|e| statuses.contains(&e.status));
        Ok(events)
    }

    async fn events_without_publications(&self, window: TimeWindow) -> Result<Vec<Event>> {
        let state = self.state();
        let mut events = state.events_in(window);
        events.retain(|e| state.publications_of(e.external_id).next().is_none());
        Ok(events)
    }

    async fn publications_with_status(
        &self,
        status: PublicationStatus,
        event: Option<Uuid>,
        window: TimeWindow,
    ) -> Result<Vec<Publication>> {
        let state = self.state();
        let mut publications: Vec<Publication> = state
            .publications
            .iter()
            .map(|s| &s.publication)
            .filter(|p| p.status == status)
            .filter(|p| event.is_none_or(|id| p.event_id == id))
            .filter(|p| window.contains(p.timestamp))
            .cloned()
            .collect();
        publications.sort_by_key(|p| p.timestamp);
        Ok(publications)
    }
}
