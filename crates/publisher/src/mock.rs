#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    chrono::{TimeZone, Utc},
    reshare_channels::{Error, PublisherPlugin, PublisherRegistry, Result},
    reshare_common::{Channel, Event, EventPublicationStatus},
    uuid::Uuid,
};

pub fn sample_event() -> Event {
    Event {
        external_id: Uuid::from_u128(0xE),
        name: "Community picnic".into(),
        description: Some("Bring food".into()),
        link: "https://mobilizon.example/events/e".into(),
        thumbnail_link: None,
        location: Some("Park".into()),
        begin_datetime: Utc.with_ymd_and_hms(2030, 6, 1, 12, 0, 0).unwrap(),
        end_datetime: Utc.with_ymd_and_hms(2030, 6, 1, 16, 0, 0).unwrap(),
        status: EventPublicationStatus::Waiting,
    }
}

/// Scripted plug-in that counts how often each capability is invoked.
#[derive(Default)]
pub struct MockPlugin {
    pub id: String,
    pub bad_credentials: Option<String>,
    pub bad_content: Option<String>,
    pub delivery_error: Option<String>,
    pub delay: Option<Duration>,
    pub panic_on_deliver: bool,
    pub deliveries: Arc<AtomicUsize>,
    pub checks: Arc<AtomicUsize>,
}

impl MockPlugin {
    pub fn ok(id: &str) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn failing(id: &str, reason: &str) -> Self {
        Self {
            delivery_error: Some(reason.into()),
            ..Self::ok(id)
        }
    }

    pub fn deliveries(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.deliveries)
    }
}

#[async_trait]
impl PublisherPlugin for MockPlugin {
    fn id(&self) -> &str {
        &self.id
    }

    async fn validate_credentials(&self, _channel: &Channel) -> Result<()> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        match &self.bad_credentials {
            Some(reason) => Err(Error::invalid_credentials(&self.id, reason)),
            None => Ok(()),
        }
    }

    async fn validate_content(&self, _event: &Event) -> Result<()> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        match &self.bad_content {
            Some(reason) => Err(Error::invalid_content(&self.id, reason)),
            None => Ok(()),
        }
    }

    async fn deliver(&self, _event: &Event, _channel: &Channel) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.panic_on_deliver {
            panic!("plug-in bug");
        }
        self.deliveries.fetch_add(1, Ordering::SeqCst);
        match &self.delivery_error {
            Some(reason) => Err(Error::delivery(&self.id, reason)),
            None => Ok(()),
        }
    }
}

pub fn registry(plugins: Vec<MockPlugin>) -> PublisherRegistry {
    let mut registry = PublisherRegistry::new();
    for plugin in plugins {
        registry.register(Arc::new(plugin));
    }
    registry
}

pub fn channels(names: &[&str]) -> Vec<Channel> {
    names.iter().map(|name| Channel::new(*name)).collect()
}
