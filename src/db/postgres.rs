//! PostgreSQL store.
//!
//! Each entity is kept as a JSONB document next to the columns used for
//! scoping and ordering.

use async_trait::async_trait;
use chrono::Utc;
use deadpool_postgres::{Config, Pool, Runtime};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_postgres::error::SqlState;
use tokio_postgres::{NoTls, Row};
use uuid::Uuid;

use super::Database;
use crate::bids::{Bid, BidPatch, BidSnapshot};
use crate::config::DatabaseConfig;
use crate::error::DatabaseError;
use crate::invoices::Invoice;
use crate::pricing::{NewRate, RateEntry};
use crate::profile::UserProfile;
use crate::proposals::ProposalResponse;

mod embedded {
    refinery::embed_migrations!("migrations");
}

pub struct PgDatabase {
    pool: Pool,
}

impl PgDatabase {
    /// Create the pool and check that a connection can be made.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let mut cfg = Config::new();
        cfg.url = Some(config.url().to_string());
        cfg.pool = Some(deadpool_postgres::PoolConfig {
            max_size: config.pool_size,
            ..Default::default()
        });

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| DatabaseError::Pool(e.to_string()))?;

        let _ = pool.get().await?;
        tracing::info!("Connected to PostgreSQL (pool size {})", config.pool_size);

        Ok(Self { pool })
    }

    /// Apply embedded migrations.
    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        let mut client = self.conn().await?;
        let report = embedded::migrations::runner()
            .run_async(&mut **client)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;
        tracing::info!("Applied {} migration(s)", report.applied_migrations().len());
        Ok(())
    }

    async fn conn(&self) -> Result<deadpool_postgres::Object, DatabaseError> {
        Ok(self.pool.get().await?)
    }
}

fn decode<T: DeserializeOwned>(row: &Row) -> Result<T, DatabaseError> {
    let data: serde_json::Value = row.try_get("data")?;
    Ok(serde_json::from_value(data)?)
}

fn encode<T: Serialize>(value: &T) -> Result<serde_json::Value, DatabaseError> {
    Ok(serde_json::to_value(value)?)
}

fn decode_all<T: DeserializeOwned>(rows: &[Row]) -> Result<Vec<T>, DatabaseError> {
    rows.iter().map(decode::<T>).collect()
}

impl PgDatabase {
    /// Read-modify-write a bid under a row lock.
    async fn modify_bid<F>(&self, owner: &str, id: Uuid, f: F) -> Result<Bid, DatabaseError>
    where
        F: FnOnce(&mut Bid) + Send,
    {
        let mut conn = self.conn().await?;
        let tx = conn.transaction().await?;
        let row = tx
            .query_opt(
                "SELECT data FROM bids WHERE id = $1 AND owner = $2 FOR UPDATE",
                &[&id, &owner],
            )
            .await?
            .ok_or(DatabaseError::NotFound { entity: "bid", id })?;
        let mut bid: Bid = decode(&row)?;
        f(&mut bid);

        tx.execute(
            "UPDATE bids SET data = $1, updated_at = $2 WHERE id = $3",
            &[&encode(&bid)?, &bid.updated_at, &id],
        )
        .await?;
        tx.commit().await?;
        Ok(bid)
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn list_bids(&self, owner: &str) -> Result<Vec<Bid>, DatabaseError> {
        let conn = self.conn().await?;
        let rows = conn
            .query(
                "SELECT data FROM bids WHERE owner = $1 ORDER BY updated_at DESC",
                &[&owner],
            )
            .await?;
        decode_all(&rows)
    }

    async fn get_bid(&self, id: Uuid) -> Result<Option<Bid>, DatabaseError> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt("SELECT data FROM bids WHERE id = $1", &[&id])
            .await?;
        row.as_ref().map(decode).transpose()
    }

    async fn create_bid(&self, owner: &str, snapshot: &BidSnapshot) -> Result<Bid, DatabaseError> {
        let bid = Bid::new(owner, snapshot.clone());
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO bids (id, owner, data, created_at, updated_at) VALUES ($1, $2, $3, $4, $5)",
            &[&bid.id, &owner, &encode(&bid)?, &bid.created_at, &bid.updated_at],
        )
        .await?;
        tracing::debug!("Created bid {} for {}", bid.id, owner);
        Ok(bid)
    }

    async fn update_bid(
        &self,
        owner: &str,
        id: Uuid,
        snapshot: &BidSnapshot,
    ) -> Result<Bid, DatabaseError> {
        let snapshot = snapshot.clone();
        self.modify_bid(owner, id, move |bid| bid.replace(snapshot))
            .await
    }

    async fn patch_bid(
        &self,
        owner: &str,
        id: Uuid,
        patch: &BidPatch,
    ) -> Result<Bid, DatabaseError> {
        self.modify_bid(owner, id, |bid| bid.apply_patch(patch)).await
    }

    async fn delete_bid(&self, owner: &str, id: Uuid) -> Result<bool, DatabaseError> {
        let conn = self.conn().await?;
        let n = conn
            .execute("DELETE FROM bids WHERE id = $1 AND owner = $2", &[&id, &owner])
            .await?;
        Ok(n > 0)
    }

    async fn list_rates(&self, owner: &str) -> Result<Vec<RateEntry>, DatabaseError> {
        let conn = self.conn().await?;
        let rows = conn
            .query(
                "SELECT data FROM service_rates WHERE owner = $1 ORDER BY created_at DESC",
                &[&owner],
            )
            .await?;
        decode_all(&rows)
    }

    async fn create_rate(&self, owner: &str, rate: &NewRate) -> Result<RateEntry, DatabaseError> {
        let entry = RateEntry::new(owner, rate.clone());
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO service_rates (id, owner, data, created_at) VALUES ($1, $2, $3, $4)",
            &[&entry.id, &owner, &encode(&entry)?, &entry.created_at],
        )
        .await?;
        Ok(entry)
    }

    async fn update_rate(
        &self,
        owner: &str,
        id: Uuid,
        rate: &NewRate,
    ) -> Result<RateEntry, DatabaseError> {
        let mut conn = self.conn().await?;
        let tx = conn.transaction().await?;
        let row = tx
            .query_opt(
                "SELECT data FROM service_rates WHERE id = $1 AND owner = $2 FOR UPDATE",
                &[&id, &owner],
            )
            .await?
            .ok_or(DatabaseError::NotFound { entity: "rate", id })?;
        let mut entry: RateEntry = decode(&row)?;
        entry.apply(rate.clone());
        tx.execute(
            "UPDATE service_rates SET data = $1 WHERE id = $2",
            &[&encode(&entry)?, &id],
        )
        .await?;
        tx.commit().await?;
        Ok(entry)
    }

    async fn delete_rate(&self, owner: &str, id: Uuid) -> Result<bool, DatabaseError> {
        let conn = self.conn().await?;
        let n = conn
            .execute(
                "DELETE FROM service_rates WHERE id = $1 AND owner = $2",
                &[&id, &owner],
            )
            .await?;
        Ok(n > 0)
    }

    async fn list_responses_for_bids(
        &self,
        bid_ids: &[Uuid],
    ) -> Result<Vec<ProposalResponse>, DatabaseError> {
        if bid_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn().await?;
        let ids: Vec<Uuid> = bid_ids.to_vec();
        let rows = conn
            .query(
                "SELECT data FROM proposal_responses WHERE bid_id = ANY($1) ORDER BY created_at ASC",
                &[&ids],
            )
            .await?;
        decode_all(&rows)
    }

    async fn create_response(&self, response: &ProposalResponse) -> Result<(), DatabaseError> {
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO proposal_responses (id, bid_id, data, created_at) VALUES ($1, $2, $3, $4)",
            &[
                &response.id,
                &response.bid_id,
                &encode(response)?,
                &response.created_at,
            ],
        )
        .await
        .map_err(|e| {
            if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                DatabaseError::Duplicate {
                    entity: "Proposal response",
                    id: response.bid_id,
                }
            } else {
                DatabaseError::Postgres(e)
            }
        })?;
        Ok(())
    }

    async fn list_invoices(&self, owner: &str) -> Result<Vec<Invoice>, DatabaseError> {
        let conn = self.conn().await?;
        let rows = conn
            .query(
                "SELECT data FROM invoices WHERE owner = $1 ORDER BY created_at DESC",
                &[&owner],
            )
            .await?;
        decode_all(&rows)
    }

    async fn get_invoice(&self, owner: &str, id: Uuid) -> Result<Option<Invoice>, DatabaseError> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt(
                "SELECT data FROM invoices WHERE id = $1 AND owner = $2",
                &[&id, &owner],
            )
            .await?;
        row.as_ref().map(decode).transpose()
    }

    async fn create_invoice(&self, invoice: &Invoice) -> Result<(), DatabaseError> {
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO invoices (id, owner, data, created_at) VALUES ($1, $2, $3, $4)",
            &[
                &invoice.id,
                &invoice.owner,
                &encode(invoice)?,
                &invoice.created_at,
            ],
        )
        .await?;
        Ok(())
    }

    async fn update_invoice(&self, invoice: &Invoice) -> Result<(), DatabaseError> {
        let mut stored = invoice.clone();
        stored.updated_at = Utc::now();
        let conn = self.conn().await?;
        let n = conn
            .execute(
                "UPDATE invoices SET data = $1 WHERE id = $2 AND owner = $3",
                &[&encode(&stored)?, &invoice.id, &invoice.owner],
            )
            .await?;
        if n == 0 {
            return Err(DatabaseError::NotFound {
                entity: "invoice",
                id: invoice.id,
            });
        }
        Ok(())
    }

    async fn delete_invoice(&self, owner: &str, id: Uuid) -> Result<bool, DatabaseError> {
        let conn = self.conn().await?;
        let n = conn
            .execute(
                "DELETE FROM invoices WHERE id = $1 AND owner = $2",
                &[&id, &owner],
            )
            .await?;
        Ok(n > 0)
    }

    async fn get_profile(&self, owner: &str) -> Result<Option<UserProfile>, DatabaseError> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt("SELECT data FROM user_profiles WHERE owner = $1", &[&owner])
            .await?;
        row.as_ref().map(decode).transpose()
    }

    async fn save_profile(&self, owner: &str, profile: &UserProfile) -> Result<(), DatabaseError> {
        let data = encode(&profile.clone().normalized())?;
        let conn = self.conn().await?;
        conn.execute(
            r#"
            INSERT INTO user_profiles (owner, data, updated_at) VALUES ($1, $2, NOW())
            ON CONFLICT (owner) DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()
            "#,
            &[&owner, &data],
        )
        .await?;
        Ok(())
    }
}
