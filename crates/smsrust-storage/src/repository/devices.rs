//! Device repository

use crate::db::DatabasePool;
use crate::models::{CreateDevice, Device};
use async_trait::async_trait;
use smsrust_common::types::DeviceId;
use smsrust_common::{Error, Result};
use uuid::Uuid;

/// Device repository trait
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    /// Create a new device
    async fn create(&self, input: CreateDevice) -> Result<Device>;

    /// Get a device by ID
    async fn get(&self, id: DeviceId) -> Result<Option<Device>>;

    /// Atomically reserve one send slot against the device's daily cap.
    ///
    /// Returns `true` and increments `daily_sent` when the cap allows it,
    /// `false` when the cap is reached. Safe under concurrent callers; this
    /// is a single check-and-increment, never a read-then-write.
    async fn try_reserve_send(&self, id: DeviceId) -> Result<bool>;

    /// Zero `daily_sent` on every device; returns the number touched
    async fn reset_daily_counters(&self) -> Result<u64>;
}

/// Database device repository
#[derive(Clone)]
pub struct DbDeviceRepository {
    pool: DatabasePool,
}

impl DbDeviceRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceRepository for DbDeviceRepository {
    async fn create(&self, input: CreateDevice) -> Result<Device> {
        let id = Uuid::new_v4();

        sqlx::query_as::<_, Device>(
            r#"
            INSERT INTO devices (id, name, endpoint, daily_limit)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.endpoint)
        .bind(input.daily_limit.unwrap_or(15000))
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn get(&self, id: DeviceId) -> Result<Option<Device>> {
        sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    async fn try_reserve_send(&self, id: DeviceId) -> Result<bool> {
        // Single-statement check-and-increment; the WHERE clause is the cap check.
        let reserved: Option<(Uuid,)> = sqlx::query_as(
            r#"
            UPDATE devices
            SET daily_sent = daily_sent + 1, updated_at = NOW()
            WHERE id = $1 AND enabled = TRUE AND daily_sent < daily_limit
            RETURNING id
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(reserved.is_some())
    }

    async fn reset_daily_counters(&self) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE devices SET daily_sent = 0, updated_at = NOW() WHERE daily_sent > 0",
        )
        .execute(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
