use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    AggregateId, EventMetadata, EventQuery, EventRecord, EventStoreError, PendingEvent, Result,
    Version,
    store::{EventStore, EventStream},
};

const SELECT_COLUMNS: &str = "SELECT record_id, aggregate_id, aggregate_type, event_type, payload, metadata, occurred_on, version, created_at FROM events";

/// PostgreSQL-backed event store.
///
/// Each append runs in its own transaction. The `unique_aggregate_version`
/// constraint is the final arbiter between racing writers: whichever
/// transaction inserts a given `(aggregate_id, version)` first wins, the
/// other rolls back and reports a conflict.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_record(row: PgRow) -> Result<EventRecord> {
        let metadata: EventMetadata = serde_json::from_value(row.try_get("metadata")?)?;

        Ok(EventRecord {
            record_id: row.try_get("record_id")?,
            aggregate_id: AggregateId::from_uuid(row.try_get::<Uuid, _>("aggregate_id")?),
            aggregate_type: row.try_get("aggregate_type")?,
            event_type: row.try_get("event_type")?,
            payload: row.try_get("payload")?,
            metadata,
            occurred_on: row.try_get("occurred_on")?,
            version: Version::new(row.try_get("version")?),
            created_at: row.try_get("created_at")?,
        })
    }

    async fn fetch(&self, sql: &str) -> Result<Vec<EventRecord>> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_record).collect()
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn append(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        events: Vec<PendingEvent>,
        expected_version: Version,
    ) -> Result<Vec<EventRecord>> {
        if events.is_empty() {
            return Ok(Vec::new());
        }

        // Dropping the transaction without commit rolls it back, so a
        // cancelled append leaves no partial rows behind.
        let mut tx = self.pool.begin().await?;

        let current: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM events WHERE aggregate_id = $1")
                .bind(aggregate_id.as_uuid())
                .fetch_one(&mut *tx)
                .await?;
        let actual = Version::new(current.unwrap_or(0));

        if actual != expected_version {
            metrics::counter!("event_store_concurrency_conflicts_total").increment(1);
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }

        let count = events.len();
        let mut appended = Vec::with_capacity(count);
        for (offset, event) in events.into_iter().enumerate() {
            let version = expected_version.advance(offset + 1);
            let mut record = event.into_record(aggregate_id, aggregate_type, version, Utc::now());
            let metadata_json = serde_json::to_value(&record.metadata)?;

            let created_at: DateTime<Utc> = sqlx::query_scalar(
                r#"
                INSERT INTO events (record_id, aggregate_id, aggregate_type, event_type, payload, metadata, occurred_on, version)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING created_at
                "#,
            )
            .bind(record.record_id)
            .bind(aggregate_id.as_uuid())
            .bind(&record.aggregate_type)
            .bind(&record.event_type)
            .bind(&record.payload)
            .bind(metadata_json)
            .bind(record.occurred_on)
            .bind(version.as_i64())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("unique_aggregate_version")
                {
                    metrics::counter!("event_store_concurrency_conflicts_total").increment(1);
                    return EventStoreError::ConcurrencyConflict {
                        aggregate_id,
                        expected: expected_version,
                        actual: version,
                    };
                }
                EventStoreError::Database(e)
            })?;

            record.created_at = created_at;
            appended.push(record);
        }

        tx.commit().await?;

        metrics::counter!("event_store_appends_total").increment(1);
        metrics::counter!("event_store_events_appended_total").increment(count as u64);
        tracing::debug!(%aggregate_id, aggregate_type, count, "appended events");

        Ok(appended)
    }

    async fn load(&self, aggregate_id: AggregateId) -> Result<Vec<EventRecord>> {
        self.load_from(aggregate_id, Version::initial()).await
    }

    async fn load_from(
        &self,
        aggregate_id: AggregateId,
        from_version: Version,
    ) -> Result<Vec<EventRecord>> {
        let sql = format!(
            "{SELECT_COLUMNS} WHERE aggregate_id = $1 AND version > $2 ORDER BY version ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(aggregate_id.as_uuid())
            .bind(from_version.as_i64())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_record).collect()
    }

    async fn list_all(&self) -> Result<Vec<EventRecord>> {
        self.fetch(&format!("{SELECT_COLUMNS} ORDER BY created_at ASC, sequence ASC"))
            .await
    }

    async fn query_events(&self, query: EventQuery) -> Result<Vec<EventRecord>> {
        let mut sql = format!("{SELECT_COLUMNS} WHERE 1=1");
        let mut param_count = 0;

        if query.aggregate_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND aggregate_id = ${param_count}"));
        }
        if query.aggregate_type.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND aggregate_type = ${param_count}"));
        }
        if query.event_types.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND event_type = ANY(${param_count})"));
        }
        if query.stored_after.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND created_at >= ${param_count}"));
        }
        if query.stored_before.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND created_at <= ${param_count}"));
        }

        sql.push_str(" ORDER BY created_at ASC, sequence ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);

        if let Some(id) = query.aggregate_id {
            sqlx_query = sqlx_query.bind(id.as_uuid());
        }
        if let Some(aggregate_type) = query.aggregate_type {
            sqlx_query = sqlx_query.bind(aggregate_type);
        }
        if let Some(event_types) = query.event_types {
            sqlx_query = sqlx_query.bind(event_types);
        }
        if let Some(after) = query.stored_after {
            sqlx_query = sqlx_query.bind(after);
        }
        if let Some(before) = query.stored_before {
            sqlx_query = sqlx_query.bind(before);
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(row_count(limit));
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(row_count(offset));
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_record).collect()
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        use futures_util::stream;

        // The stream must outlive the borrow of the pool, so the page is
        // materialized first.
        let records = self.list_all().await?;
        Ok(Box::pin(stream::iter(records.into_iter().map(Ok))))
    }

    async fn current_version(&self, aggregate_id: AggregateId) -> Result<Version> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM events WHERE aggregate_id = $1")
                .bind(aggregate_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        Ok(Version::new(version.unwrap_or(0)))
    }
}

/// LIMIT and OFFSET are BIGINT; anything larger is clamped rather than wrapped.
fn row_count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_count_clamps_instead_of_wrapping() {
        assert_eq!(row_count(0), 0);
        assert_eq!(row_count(25), 25);
        assert_eq!(row_count(usize::MAX), i64::MAX);
    }
}
