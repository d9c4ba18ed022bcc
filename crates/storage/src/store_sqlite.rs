//! SQLite-backed persistence gateway using sqlx.

use std::{path::Path, str::FromStr, sync::Arc};

use {
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    dashmap::DashMap,
    reshare_common::{
        Channel, Event, EventPublicationStatus, Publication, PublicationStatus, derive_status,
    },
    reshare_publisher::Report,
    sqlx::{
        Row, SqliteConnection, SqlitePool,
        sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    },
    tokio::sync::Mutex,
    tracing::{debug, info},
    uuid::Uuid,
};

use crate::{
    Error, Result,
    gateway::{CommitSummary, PersistenceGateway, TimeWindow, check_report},
};

const EVENT_SELECT: &str = "SELECT e.external_id, e.name, e.description, e.link,
        e.thumbnail_link, e.location, e.begin_ms, e.end_ms,
        GROUP_CONCAT(p.status) AS statuses
     FROM events e
     LEFT JOIN publications p ON p.event_id = e.id";

const PUBLICATION_SELECT: &str = "SELECT p.id, e.external_id, pb.name AS channel,
        p.status, p.reason, p.timestamp_ms
     FROM publications p
     JOIN events e ON e.id = p.event_id
     JOIN publishers pb ON pb.id = p.publisher_id";

/// SQLite persistence for events, publishers and publications.
pub struct SqliteGateway {
    pool: SqlitePool,
    /// Serialises commits per event id within this process.
    commit_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl SqliteGateway {
    /// Connect to `database_url` and run migrations.
    ///
    /// `sqlite::memory:` databases live in a single connection that is never
    /// recycled, since every new connection would see an empty database.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        crate::run_migrations(&pool).await?;
        Ok(Self::with_pool(pool))
    }

    /// Open (or create) the database file at `path`, creating parent dirs.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        crate::run_migrations(&pool).await?;
        info!(path = %path.display(), "opened database");
        Ok(Self::with_pool(pool))
    }

    /// Use an existing pool. Call [`crate::run_migrations`] first.
    pub fn with_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            commit_locks: DashMap::new(),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn commit_lock(&self, external_id: Uuid) -> Arc<Mutex<()>> {
        Arc::clone(self.commit_locks.entry(external_id).or_default().value())
    }

    /// Drop the event's lock entry once no other commit holds or awaits it.
    fn release_commit_lock(&self, external_id: Uuid) {
        self.commit_locks
            .remove_if(&external_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Write `report` in one transaction. The caller holds the event's
    /// commit lock.
    async fn commit_locked(&self, report: &Report) -> Result<CommitSummary> {
        let external_id = report.event.external_id;
        let mut tx = self.pool.begin().await?;

        // Write first so the transaction holds the database write lock from
        // the start; a later read-to-write upgrade could fail with SQLITE_BUSY.
        let touched = sqlx::query("UPDATE events SET status = status WHERE external_id = ?")
            .bind(external_id.to_string())
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Err(Error::event_not_found(external_id));
        }
        let event_row: i64 = sqlx::query_scalar("SELECT id FROM events WHERE external_id = ?")
            .bind(external_id.to_string())
            .fetch_one(&mut *tx)
            .await?;

        let mut inserted = 0;
        let mut duplicates = 0;
        for publication in &report.publications {
            let id = publication.id.to_string();
            let known: Option<i64> = sqlx::query_scalar("SELECT 1 FROM publications WHERE id = ?")
                .bind(&id)
                .fetch_optional(&mut *tx)
                .await?;
            if known.is_some() {
                debug!(publication_id = %id, "publication already stored, skipping");
                duplicates += 1;
                continue;
            }

            let publisher = publisher_id(&mut tx, &publication.channel).await?;
            let previous: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM publications WHERE event_id = ? AND publisher_id = ?",
            )
            .bind(event_row)
            .bind(publisher)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO publications (id, event_id, publisher_id, attempt, status, reason, timestamp_ms)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&id)
            .bind(event_row)
            .bind(publisher)
            .bind(previous + 1)
            .bind(publication.status.as_str())
            .bind(&publication.reason)
            .bind(publication.timestamp.timestamp_millis())
            .execute(&mut *tx)
            .await?;
            inserted += 1;
        }

        let status = derive_status(stored_statuses(&mut tx, event_row).await?);
        sqlx::query("UPDATE events SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(event_row)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(
            event_id = %external_id,
            inserted,
            duplicates,
            status = %status,
            "report committed"
        );
        Ok(CommitSummary {
            inserted,
            duplicates,
            status,
        })
    }

    async fn query_events(
        &self,
        window: TimeWindow,
        having: Option<&str>,
    ) -> Result<Vec<Event>> {
        let (from, to) = window.bounds_ms();
        let sql = format!(
            "{EVENT_SELECT}
             WHERE e.begin_ms BETWEEN ? AND ?
             GROUP BY e.id
             {}
             ORDER BY e.begin_ms, e.id",
            having.map(|h| format!("HAVING {h}")).unwrap_or_default()
        );
        let rows = sqlx::query(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;
        debug!(rows = rows.len(), "loaded events");
        rows.iter().map(event_from_row).collect()
    }
}

async fn publisher_id(conn: &mut SqliteConnection, name: &str) -> Result<i64> {
    sqlx::query("INSERT INTO publishers (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
        .bind(name)
        .execute(&mut *conn)
        .await?;
    let id = sqlx::query_scalar("SELECT id FROM publishers WHERE name = ?")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(id)
}

async fn stored_statuses(
    conn: &mut SqliteConnection,
    event_row: i64,
) -> Result<Vec<PublicationStatus>> {
    let statuses: Vec<String> =
        sqlx::query_scalar("SELECT status FROM publications WHERE event_id = ?")
            .bind(event_row)
            .fetch_all(&mut *conn)
            .await?;
    statuses.iter().map(String::as_str).map(parse_status).collect()
}

fn parse_status(value: &str) -> Result<PublicationStatus> {
    value
        .parse()
        .map_err(|e| Error::invalid_row("status", e))
}

fn parse_uuid(column: &'static str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| Error::invalid_row(column, e))
}

fn from_ms(column: &'static str, ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| Error::invalid_row(column, format!("timestamp {ms} out of range")))
}

fn event_from_row(row: &SqliteRow) -> Result<Event> {
    let statuses: Option<String> = row.try_get("statuses")?;
    let statuses = statuses
        .as_deref()
        .into_iter()
        .flat_map(|joined| joined.split(','))
        .map(parse_status)
        .collect::<Result<Vec<_>>>()?;

    Ok(Event {
        external_id: parse_uuid("external_id", &row.try_get::<String, _>("external_id")?)?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        link: row.try_get("link")?,
        thumbnail_link: row.try_get("thumbnail_link")?,
        location: row.try_get("location")?,
        begin_datetime: from_ms("begin_ms", row.try_get("begin_ms")?)?,
        end_datetime: from_ms("end_ms", row.try_get("end_ms")?)?,
        status: derive_status(statuses),
    })
}

fn publication_from_row(row: &SqliteRow) -> Result<Publication> {
    Ok(Publication {
        id: parse_uuid("id", &row.try_get::<String, _>("id")?)?,
        event_id: parse_uuid("external_id", &row.try_get::<String, _>("external_id")?)?,
        channel: row.try_get("channel")?,
        status: parse_status(&row.try_get::<String, _>("status")?)?,
        timestamp: from_ms("timestamp_ms", row.try_get("timestamp_ms")?)?,
        reason: row.try_get("reason")?,
    })
}

#[async_trait]
impl PersistenceGateway for SqliteGateway {
    async fn commit(&self, report: &Report) -> Result<CommitSummary> {
        let external_id = report.event.external_id;
        if report.publications.is_empty() {
            debug!(event_id = %external_id, "report has no outcomes, nothing to commit");
            return Ok(CommitSummary {
                inserted: 0,
                duplicates: 0,
                status: self.get_event(external_id).await?.status,
            });
        }
        check_report(report)?;

        let lock = self.commit_lock(external_id);
        let result = {
            let _guard = lock.lock().await;
            self.commit_locked(report).await
        };
        drop(lock);
        self.release_commit_lock(external_id);
        result
    }

    async fn sync_channels(&self, channels: &[Channel]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for channel in channels {
            sqlx::query(
                "INSERT INTO publishers (name, account_ref) VALUES (?, ?)
                 ON CONFLICT(name) DO UPDATE SET account_ref = excluded.account_ref",
            )
            .bind(&channel.name)
            .bind(&channel.account_ref)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        debug!(channels = channels.len(), "publishers synced");
        Ok(())
    }

    async fn save_new_events(&self, events: &[Event]) -> Result<Vec<Event>> {
        let mut tx = self.pool.begin().await?;
        let mut stored = Vec::new();
        for event in events {
            let result = sqlx::query(
                "INSERT INTO events (external_id, name, description, link, thumbnail_link, location, begin_ms, end_ms, status)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(external_id) DO NOTHING",
            )
            .bind(event.external_id.to_string())
            .bind(&event.name)
            .bind(&event.description)
            .bind(&event.link)
            .bind(&event.thumbnail_link)
            .bind(&event.location)
            .bind(event.begin_datetime.timestamp_millis())
            .bind(event.end_datetime.timestamp_millis())
            .bind(EventPublicationStatus::Waiting.as_str())
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 1 {
                stored.push(Event {
                    status: EventPublicationStatus::Waiting,
                    ..event.clone()
                });
            }
        }
        tx.commit().await?;
        info!(received = events.len(), stored = stored.len(), "saved new events");
        Ok(stored)
    }

    async fn get_event(&self, external_id: Uuid) -> Result<Event> {
        let sql = format!("{EVENT_SELECT} WHERE e.external_id = ? GROUP BY e.id");
        let row = sqlx::query(&sql)
            .bind(external_id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::event_not_found(external_id))?;
        event_from_row(&row)
    }

    async fn event_publications(&self, external_id: Uuid) -> Result<Vec<Publication>> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM events WHERE external_id = ?")
            .bind(external_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(Error::event_not_found(external_id));
        }

        let sql = format!("{PUBLICATION_SELECT} WHERE e.external_id = ? ORDER BY p.timestamp_ms, p.rowid");
        let rows = sqlx::query(&sql)
            .bind(external_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(publication_from_row).collect()
    }

    async fn get_all_events(&self, window: TimeWindow) -> Result<Vec<Event>> {
        self.query_events(window, None).await
    }

    async fn events_with_status(
        &self,
        statuses: &[EventPublicationStatus],
        window: TimeWindow,
    ) -> Result<Vec<Event>> {
        let events = self.query_events(window, None).await?;
        Ok(events
            .into_iter()
            .filter(|event| statuses.contains(&event.status))
            .collect())
    }

    async fn events_without_publications(&self, window: TimeWindow) -> Result<Vec<Event>> {
        self.query_events(window, Some("COUNT(p.id) = 0")).await
    }

    async fn publications_with_status(
        &self,
        status: PublicationStatus,
        event: Option<Uuid>,
        window: TimeWindow,
    ) -> Result<Vec<Publication>> {
        let (from, to) = window.bounds_ms();
        let event = event.map(|id| id.to_string());
        let sql = format!(
            "{PUBLICATION_SELECT}
             WHERE p.status = ?
               AND p.timestamp_ms BETWEEN ? AND ?
               AND (? IS NULL OR e.external_id = ?)
             ORDER BY p.timestamp_ms, p.rowid"
        );
        let rows = sqlx::query(&sql)
            .bind(status.as_str())
            .bind(from)
            .bind(to)
            .bind(&event)
            .bind(&event)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(publication_from_row).collect()
    }
}
