//! Request store trait and SQLite implementation.

use crate::error::{StoreError, StoreResult};
use crate::repos::{CancellationReasonRepo, ExpirationRepo, QueueRepo, RequestRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined request store trait.
#[async_trait]
pub trait RequestStore:
    RequestRepo + QueueRepo + ExpirationRepo + CancellationReasonRepo + Send + Sync
{
    /// Run database migrations.
    async fn migrate(&self) -> StoreResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> StoreResult<()>;
}

/// SQLite-based request store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    #[allow(dead_code)] // Reserved for future timeout wrapper implementation
    query_timeout_secs: u64,
}

impl SqliteStore {
    /// Create a new SQLite store.
    pub async fn new(
        path: impl AsRef<Path>,
        query_timeout_secs: Option<u64>,
    ) -> StoreResult<Self> {
        let path = path.as_ref();
        let query_timeout_secs = query_timeout_secs.unwrap_or(600);

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection
            // avoids persistent "database is locked" failures under
            // test/axum concurrency.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self {
            pool,
            query_timeout_secs,
        };
        store.migrate().await?;

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl RequestStore for SqliteStore {
    async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Detect a UNIQUE violation on the per-item queue position index.
///
/// SQLite reports UNIQUE violations in two formats:
/// 1. With columns: "UNIQUE constraint failed: requests.item_id, requests.position"
/// 2. With index name: "UNIQUE constraint failed: index 'idx_requests_item_position'"
fn queue_position_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        let msg = db_err.message();
        msg.contains("UNIQUE constraint")
            && (msg.contains("requests.position") || msg.contains("idx_requests_item_position"))
    } else {
        false
    }
}

/// Map a queue-index UNIQUE violation to the position conflict error; every
/// other database error passes through.
fn map_queue_violation(err: sqlx::Error) -> StoreError {
    if queue_position_violation(&err) {
        StoreError::PositionConflict
    } else {
        err.into()
    }
}

fn reason_name_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        let msg = db_err.message();
        msg.contains("UNIQUE constraint") && msg.contains("cancellation_reasons.name")
    } else {
        false
    }
}

// Implement the repository traits for SqliteStore
mod sqlite_impl {
    use super::*;
    use crate::models::{CancellationReasonRow, RequestRow};
    use crate::repos::RequestFilter;
    use carrel_core::{RequestStatus, stamps_awaiting_pickup_closed_date, system_user_id};
    use time::OffsetDateTime;
    use uuid::Uuid;

    /// Full-record update, excluding creation metadata and the id.
    const UPDATE_REQUEST_SQL: &str = r#"
        UPDATE requests SET
            item_id = ?, requester_id = ?, proxy_user_id = ?, request_type = ?,
            fulfilment_preference = ?, delivery_address_type_id = ?, status = ?,
            position = ?, request_date = ?, request_expiration_date = ?,
            hold_shelf_expiration_date = ?, awaiting_pickup_request_closed_date = ?,
            cancellation_reason_id = ?, cancelled_by_user_id = ?,
            cancellation_additional_information = ?, cancelled_date = ?,
            item_snapshot = ?, requester_snapshot = ?, proxy_snapshot = ?,
            instance_snapshot = ?, search_index = ?,
            updated_date = ?, updated_by_user_id = ?
        WHERE id = ?
        "#;

    /// The awaiting-pickup closure date to persist for a status write:
    /// stamped with the write time on a qualifying transition, otherwise the
    /// stored value carried forward (clients never write this field).
    fn carried_closed_date(
        prev: &RequestRow,
        new_status: &str,
        write_time: OffsetDateTime,
    ) -> Option<OffsetDateTime> {
        match (RequestStatus::parse(&prev.status), RequestStatus::parse(new_status)) {
            (Some(before), Some(after)) if stamps_awaiting_pickup_closed_date(before, after) => {
                Some(write_time)
            }
            _ => prev.awaiting_pickup_request_closed_date,
        }
    }

    async fn update_request_in_tx(
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        prev: &RequestRow,
        row: &RequestRow,
    ) -> Result<(), sqlx::Error> {
        let closed_date = carried_closed_date(prev, &row.status, row.updated_date);
        sqlx::query(UPDATE_REQUEST_SQL)
            .bind(row.item_id)
            .bind(row.requester_id)
            .bind(row.proxy_user_id)
            .bind(&row.request_type)
            .bind(&row.fulfilment_preference)
            .bind(row.delivery_address_type_id)
            .bind(&row.status)
            .bind(row.position)
            .bind(row.request_date)
            .bind(row.request_expiration_date)
            .bind(row.hold_shelf_expiration_date)
            .bind(closed_date)
            .bind(row.cancellation_reason_id)
            .bind(row.cancelled_by_user_id)
            .bind(&row.cancellation_additional_information)
            .bind(row.cancelled_date)
            .bind(&row.item_snapshot)
            .bind(&row.requester_snapshot)
            .bind(&row.proxy_snapshot)
            .bind(&row.instance_snapshot)
            .bind(&row.search_index)
            .bind(row.updated_date)
            .bind(row.updated_by_user_id)
            .bind(row.id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn insert_request_in_tx(
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        row: &RequestRow,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO requests (
                id, item_id, requester_id, proxy_user_id, request_type,
                fulfilment_preference, delivery_address_type_id, status,
                position, request_date, request_expiration_date,
                hold_shelf_expiration_date, awaiting_pickup_request_closed_date,
                cancellation_reason_id, cancelled_by_user_id,
                cancellation_additional_information, cancelled_date,
                item_snapshot, requester_snapshot, proxy_snapshot,
                instance_snapshot, search_index,
                created_date, created_by_user_id, updated_date, updated_by_user_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(row.id)
        .bind(row.item_id)
        .bind(row.requester_id)
        .bind(row.proxy_user_id)
        .bind(&row.request_type)
        .bind(&row.fulfilment_preference)
        .bind(row.delivery_address_type_id)
        .bind(&row.status)
        .bind(row.position)
        .bind(row.request_date)
        .bind(row.request_expiration_date)
        .bind(row.hold_shelf_expiration_date)
        .bind(row.cancellation_reason_id)
        .bind(row.cancelled_by_user_id)
        .bind(&row.cancellation_additional_information)
        .bind(row.cancelled_date)
        .bind(&row.item_snapshot)
        .bind(&row.requester_snapshot)
        .bind(&row.proxy_snapshot)
        .bind(&row.instance_snapshot)
        .bind(&row.search_index)
        .bind(row.created_date)
        .bind(row.created_by_user_id)
        .bind(row.updated_date)
        .bind(row.updated_by_user_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    #[async_trait]
    impl RequestRepo for SqliteStore {
        async fn get_request(&self, id: Uuid) -> StoreResult<Option<RequestRow>> {
            let row = sqlx::query_as::<_, RequestRow>("SELECT * FROM requests WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn list_requests(&self, filter: &RequestFilter) -> StoreResult<Vec<RequestRow>> {
            let rows = match (&filter.status, filter.item_id) {
                (Some(status), Some(item_id)) => {
                    sqlx::query_as::<_, RequestRow>(
                        "SELECT * FROM requests WHERE status = ? AND item_id = ? \
                         ORDER BY created_date, id LIMIT ? OFFSET ?",
                    )
                    .bind(status)
                    .bind(item_id)
                    .bind(filter.limit)
                    .bind(filter.offset)
                    .fetch_all(&self.pool)
                    .await?
                }
                (Some(status), None) => {
                    sqlx::query_as::<_, RequestRow>(
                        "SELECT * FROM requests WHERE status = ? \
                         ORDER BY created_date, id LIMIT ? OFFSET ?",
                    )
                    .bind(status)
                    .bind(filter.limit)
                    .bind(filter.offset)
                    .fetch_all(&self.pool)
                    .await?
                }
                (None, Some(item_id)) => {
                    sqlx::query_as::<_, RequestRow>(
                        "SELECT * FROM requests WHERE item_id = ? \
                         ORDER BY created_date, id LIMIT ? OFFSET ?",
                    )
                    .bind(item_id)
                    .bind(filter.limit)
                    .bind(filter.offset)
                    .fetch_all(&self.pool)
                    .await?
                }
                (None, None) => {
                    sqlx::query_as::<_, RequestRow>(
                        "SELECT * FROM requests ORDER BY created_date, id LIMIT ? OFFSET ?",
                    )
                    .bind(filter.limit)
                    .bind(filter.offset)
                    .fetch_all(&self.pool)
                    .await?
                }
            };
            Ok(rows)
        }

        async fn delete_request(&self, id: Uuid) -> StoreResult<()> {
            let result = sqlx::query("DELETE FROM requests WHERE id = ?")
                .bind(id)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound(format!("request {id} not found")));
            }
            Ok(())
        }

        async fn get_queue(&self, item_id: Uuid) -> StoreResult<Vec<RequestRow>> {
            let rows = sqlx::query_as::<_, RequestRow>(
                "SELECT * FROM requests WHERE item_id = ? AND position IS NOT NULL ORDER BY position",
            )
            .bind(item_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }
    }

    #[async_trait]
    impl QueueRepo for SqliteStore {
        async fn upsert_request(&self, row: &RequestRow) -> StoreResult<()> {
            let mut tx = self.pool.begin().await?;

            let existing = sqlx::query_as::<_, RequestRow>("SELECT * FROM requests WHERE id = ?")
                .bind(row.id)
                .fetch_optional(&mut *tx)
                .await?;

            // Statement-time queue check. A single-record write may keep its
            // own position, so the row's own id is excluded here; the batch
            // path below deliberately does not exclude it.
            if let Some(position) = row.position {
                let occupied: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM requests WHERE item_id = ? AND position = ? AND id != ?)",
                )
                .bind(row.item_id)
                .bind(position)
                .bind(row.id)
                .fetch_one(&mut *tx)
                .await?;
                if occupied {
                    tx.rollback().await?;
                    return Err(StoreError::PositionConflict);
                }
            }

            match existing {
                Some(prev) => update_request_in_tx(&mut tx, &prev, row)
                    .await
                    .map_err(map_queue_violation)?,
                None => insert_request_in_tx(&mut tx, row)
                    .await
                    .map_err(map_queue_violation)?,
            }

            tx.commit().await?;
            Ok(())
        }

        async fn apply_batch(&self, rows: &[RequestRow]) -> StoreResult<()> {
            let mut tx = self.pool.begin().await?;

            for (index, row) in rows.iter().enumerate() {
                let prev =
                    sqlx::query_as::<_, RequestRow>("SELECT * FROM requests WHERE id = ?")
                        .bind(row.id)
                        .fetch_optional(&mut *tx)
                        .await?;
                let Some(prev) = prev else {
                    tx.rollback().await?;
                    return Err(StoreError::NotFound(format!(
                        "request {} (batch entry {index}) not found",
                        row.id
                    )));
                };

                // Checked against the queue state as of this statement,
                // without excluding the entry's own row: re-asserting a
                // currently-held position fails, which is what forces the
                // two-phase clear-then-assign protocol on reorders.
                if let Some(position) = row.position {
                    let occupied: bool = sqlx::query_scalar(
                        "SELECT EXISTS(SELECT 1 FROM requests WHERE item_id = ? AND position = ?)",
                    )
                    .bind(row.item_id)
                    .bind(position)
                    .fetch_one(&mut *tx)
                    .await?;
                    if occupied {
                        tx.rollback().await?;
                        return Err(StoreError::PositionConflict);
                    }
                }

                update_request_in_tx(&mut tx, &prev, row)
                    .await
                    .map_err(map_queue_violation)?;
            }

            tx.commit().await?;
            Ok(())
        }
    }

    #[async_trait]
    impl ExpirationRepo for SqliteStore {
        async fn get_expired_unfilled(
            &self,
            now: OffsetDateTime,
            limit: u32,
        ) -> StoreResult<Vec<RequestRow>> {
            let rows = sqlx::query_as::<_, RequestRow>(
                r#"
                SELECT * FROM requests
                WHERE status = ?
                  AND request_expiration_date IS NOT NULL
                  AND request_expiration_date < ?
                ORDER BY request_expiration_date
                LIMIT ?
                "#,
            )
            .bind(RequestStatus::OpenNotYetFilled.as_str())
            .bind(now)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn get_expired_awaiting_pickup(
            &self,
            now: OffsetDateTime,
            limit: u32,
        ) -> StoreResult<Vec<RequestRow>> {
            let rows = sqlx::query_as::<_, RequestRow>(
                r#"
                SELECT * FROM requests
                WHERE status = ?
                  AND hold_shelf_expiration_date IS NOT NULL
                  AND hold_shelf_expiration_date < ?
                ORDER BY hold_shelf_expiration_date
                LIMIT ?
                "#,
            )
            .bind(RequestStatus::OpenAwaitingPickup.as_str())
            .bind(now)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn close_expired_request(
            &self,
            id: Uuid,
            expected_status: RequestStatus,
            new_status: RequestStatus,
            now: OffsetDateTime,
        ) -> StoreResult<bool> {
            // Conditioned on the row still carrying the status it was
            // selected with; a concurrent client write makes this a no-op.
            let result = if stamps_awaiting_pickup_closed_date(expected_status, new_status) {
                sqlx::query(
                    r#"
                    UPDATE requests
                    SET status = ?, position = NULL,
                        awaiting_pickup_request_closed_date = ?,
                        updated_date = ?, updated_by_user_id = ?
                    WHERE id = ? AND status = ?
                    "#,
                )
                .bind(new_status.as_str())
                .bind(now)
                .bind(now)
                .bind(system_user_id())
                .bind(id)
                .bind(expected_status.as_str())
                .execute(&self.pool)
                .await?
            } else {
                sqlx::query(
                    r#"
                    UPDATE requests
                    SET status = ?, position = NULL,
                        updated_date = ?, updated_by_user_id = ?
                    WHERE id = ? AND status = ?
                    "#,
                )
                .bind(new_status.as_str())
                .bind(now)
                .bind(now)
                .bind(system_user_id())
                .bind(id)
                .bind(expected_status.as_str())
                .execute(&self.pool)
                .await?
            };
            Ok(result.rows_affected() > 0)
        }

        async fn compact_queue(&self, item_id: Uuid, now: OffsetDateTime) -> StoreResult<u64> {
            let mut tx = self.pool.begin().await?;

            let queue: Vec<(Uuid, i64)> = sqlx::query_as(
                "SELECT id, position FROM requests WHERE item_id = ? AND position IS NOT NULL ORDER BY position",
            )
            .bind(item_id)
            .fetch_all(&mut *tx)
            .await?;

            let mut moved = 0u64;
            for (index, (id, position)) in queue.into_iter().enumerate() {
                let target = (index + 1) as i64;
                if position == target {
                    continue;
                }
                // Ascending renumber only ever moves rows to lower, freed
                // positions, so no transient collision with rows not yet
                // renumbered.
                sqlx::query(
                    "UPDATE requests SET position = ?, updated_date = ?, updated_by_user_id = ? WHERE id = ?",
                )
                .bind(target)
                .bind(now)
                .bind(system_user_id())
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(map_queue_violation)?;
                moved += 1;
            }

            tx.commit().await?;
            Ok(moved)
        }
    }

    #[async_trait]
    impl CancellationReasonRepo for SqliteStore {
        async fn create_cancellation_reason(
            &self,
            row: &CancellationReasonRow,
        ) -> StoreResult<()> {
            if self.get_cancellation_reason(row.id).await?.is_some() {
                return Err(StoreError::AlreadyExists(format!(
                    "cancellation reason {} already exists",
                    row.id
                )));
            }

            sqlx::query(
                r#"
                INSERT INTO cancellation_reasons (
                    id, name, description, public_description,
                    created_date, created_by_user_id, updated_date, updated_by_user_id
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(row.id)
            .bind(&row.name)
            .bind(&row.description)
            .bind(&row.public_description)
            .bind(row.created_date)
            .bind(row.created_by_user_id)
            .bind(row.updated_date)
            .bind(row.updated_by_user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if reason_name_violation(&e) {
                    StoreError::AlreadyExists(format!(
                        "cancellation reason name '{}' already exists",
                        row.name
                    ))
                } else {
                    e.into()
                }
            })?;
            Ok(())
        }

        async fn get_cancellation_reason(
            &self,
            id: Uuid,
        ) -> StoreResult<Option<CancellationReasonRow>> {
            let row = sqlx::query_as::<_, CancellationReasonRow>(
                "SELECT * FROM cancellation_reasons WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn list_cancellation_reasons(&self) -> StoreResult<Vec<CancellationReasonRow>> {
            let rows = sqlx::query_as::<_, CancellationReasonRow>(
                "SELECT * FROM cancellation_reasons ORDER BY name",
            )
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn update_cancellation_reason(
            &self,
            row: &CancellationReasonRow,
        ) -> StoreResult<()> {
            let result = sqlx::query(
                r#"
                UPDATE cancellation_reasons
                SET name = ?, description = ?, public_description = ?,
                    updated_date = ?, updated_by_user_id = ?
                WHERE id = ?
                "#,
            )
            .bind(&row.name)
            .bind(&row.description)
            .bind(&row.public_description)
            .bind(row.updated_date)
            .bind(row.updated_by_user_id)
            .bind(row.id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if reason_name_violation(&e) {
                    StoreError::AlreadyExists(format!(
                        "cancellation reason name '{}' already exists",
                        row.name
                    ))
                } else {
                    StoreError::from(e)
                }
            })?;

            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound(format!(
                    "cancellation reason {} not found",
                    row.id
                )));
            }
            Ok(())
        }

        async fn delete_cancellation_reason(&self, id: Uuid) -> StoreResult<()> {
            let mut tx = self.pool.begin().await?;

            // Any referencing request blocks the delete, whatever its
            // status: closed and cancelled requests keep their reason.
            let referenced: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM requests WHERE cancellation_reason_id = ?)",
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
            if referenced {
                tx.rollback().await?;
                return Err(StoreError::ReasonInUse(id.to_string()));
            }

            let result = sqlx::query("DELETE FROM cancellation_reasons WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() == 0 {
                tx.rollback().await?;
                return Err(StoreError::NotFound(format!(
                    "cancellation reason {id} not found"
                )));
            }

            tx.commit().await?;
            Ok(())
        }
    }
}

const SCHEMA_SQL: &str = r#"
-- Circulation requests
CREATE TABLE IF NOT EXISTS requests (
    id BLOB PRIMARY KEY,
    item_id BLOB NOT NULL,
    requester_id BLOB,
    proxy_user_id BLOB,
    request_type TEXT NOT NULL,
    fulfilment_preference TEXT NOT NULL DEFAULT 'Hold Shelf',
    delivery_address_type_id BLOB,
    status TEXT NOT NULL DEFAULT 'Open - Not yet filled',
    position INTEGER,
    request_date TEXT,
    request_expiration_date TEXT,
    hold_shelf_expiration_date TEXT,
    -- System-owned; stamped when a request leaves awaiting-pickup into a
    -- pickup-expired or cancelled state.
    awaiting_pickup_request_closed_date TEXT,
    cancellation_reason_id BLOB,
    cancelled_by_user_id BLOB,
    cancellation_additional_information TEXT,
    cancelled_date TEXT,
    -- Denormalized snapshots maintained by the external feed (opaque JSON)
    item_snapshot TEXT,
    requester_snapshot TEXT,
    proxy_snapshot TEXT,
    instance_snapshot TEXT,
    search_index TEXT,
    created_date TEXT NOT NULL,
    created_by_user_id BLOB NOT NULL,
    updated_date TEXT NOT NULL,
    updated_by_user_id BLOB NOT NULL
);
-- Queue uniqueness: at most one request per (item, position). Partial so
-- unqueued rows (position IS NULL) never collide.
CREATE UNIQUE INDEX IF NOT EXISTS idx_requests_item_position
ON requests(item_id, position) WHERE position IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_requests_item ON requests(item_id, position);
CREATE INDEX IF NOT EXISTS idx_requests_request_expiration
ON requests(status, request_expiration_date);
CREATE INDEX IF NOT EXISTS idx_requests_hold_shelf_expiration
ON requests(status, hold_shelf_expiration_date);
CREATE INDEX IF NOT EXISTS idx_requests_cancellation_reason
ON requests(cancellation_reason_id);

-- Cancellation reasons
CREATE TABLE IF NOT EXISTS cancellation_reasons (
    id BLOB PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL,
    public_description TEXT,
    created_date TEXT NOT NULL,
    created_by_user_id BLOB NOT NULL,
    updated_date TEXT NOT NULL,
    updated_by_user_id BLOB NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_cancellation_reasons_name ON cancellation_reasons(name);
"#;
