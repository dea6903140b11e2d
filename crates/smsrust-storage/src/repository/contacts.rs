//! Contact repository

use crate::db::DatabasePool;
use crate::models::{Contact, CreateContact};
use async_trait::async_trait;
use smsrust_common::types::{ContactId, ContactListId, DeviceId, PhoneNumber};
use smsrust_common::{Error, Result};
use uuid::Uuid;

/// Contact repository trait
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Create a new contact
    async fn create(&self, input: CreateContact) -> Result<Contact>;

    /// Get a contact by ID
    async fn get(&self, id: ContactId) -> Result<Option<Contact>>;

    /// All opted-in contacts of a list, in insertion order
    async fn list_opted_in(&self, list_id: ContactListId) -> Result<Vec<Contact>>;

    /// Flip the opt-in flag
    async fn set_opted_in(&self, id: ContactId, opted_in: bool) -> Result<()>;

    /// Record the device/SIM last used for this contact
    async fn set_sim_affinity(&self, id: ContactId, device_id: DeviceId, slot: i32) -> Result<()>;
}

/// Database contact repository
#[derive(Clone)]
pub struct DbContactRepository {
    pool: DatabasePool,
}

impl DbContactRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContactRepository for DbContactRepository {
    async fn create(&self, input: CreateContact) -> Result<Contact> {
        let id = Uuid::new_v4();
        let phone: PhoneNumber = input.phone_number.parse()?;
        let attributes = input.attributes.unwrap_or_else(|| serde_json::json!({}));

        sqlx::query_as::<_, Contact>(
            r#"
            INSERT INTO contacts (id, contact_list_id, phone_number, name, opted_in, attributes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.contact_list_id)
        .bind(phone.as_str())
        .bind(&input.name)
        .bind(input.opted_in.unwrap_or(true))
        .bind(&attributes)
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn get(&self, id: ContactId) -> Result<Option<Contact>> {
        sqlx::query_as::<_, Contact>("SELECT * FROM contacts WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    async fn list_opted_in(&self, list_id: ContactListId) -> Result<Vec<Contact>> {
        sqlx::query_as::<_, Contact>(
            r#"
            SELECT * FROM contacts
            WHERE contact_list_id = $1 AND opted_in = TRUE
            ORDER BY created_at ASC
            "#,
        )
        .bind(list_id)
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn set_opted_in(&self, id: ContactId, opted_in: bool) -> Result<()> {
        sqlx::query("UPDATE contacts SET opted_in = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(opted_in)
            .execute(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn set_sim_affinity(&self, id: ContactId, device_id: DeviceId, slot: i32) -> Result<()> {
        sqlx::query(
            "UPDATE contacts SET sim_device_id = $2, sim_slot = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(device_id)
        .bind(slot)
        .execute(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }
}
