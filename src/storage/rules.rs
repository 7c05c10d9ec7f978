//! SQLite pricing-rule store.
//!
//! One table, created on connect if missing. Money is stored as decimal
//! text and the conditions payload as JSON text so that nothing is lost
//! to floating point.

use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};
use uuid::Uuid;

use super::PricingRuleSink;
use crate::types::{PricingRuleRecord, StayRateError};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS pricing_rules (
    id TEXT PRIMARY KEY,
    property_id TEXT NOT NULL,
    rule_type TEXT NOT NULL,
    rule_name TEXT NOT NULL,
    conditions TEXT NOT NULL,
    price_adjustment TEXT NOT NULL,
    is_percentage INTEGER NOT NULL,
    is_active INTEGER NOT NULL,
    created_at TEXT NOT NULL
)";

pub struct SqliteRuleStore {
    pool: SqlitePool,
}

impl SqliteRuleStore {
    /// Open (creating if needed) the database at `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {database_url}"))?
            .create_if_missing(true);

        // Every connection to an in-memory database is a separate database,
        // so those get exactly one connection that never expires.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await
        } else {
            SqlitePoolOptions::new().max_connections(4).connect_with(options).await
        }
        .with_context(|| format!("Failed to open rule database: {database_url}"))?;

        sqlx::query(CREATE_TABLE)
            .execute(&pool)
            .await
            .context("Failed to create pricing_rules table")?;

        info!(database_url, "Pricing rule store ready");
        Ok(Self { pool })
    }

    /// A private in-memory store (tests, dry runs).
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }

    /// All stored rules, optionally for one property, oldest first.
    pub async fn list_rules(&self, property_id: Option<&str>) -> Result<Vec<PricingRuleRecord>> {
        let rows = match property_id {
            Some(id) => {
                sqlx::query("SELECT * FROM pricing_rules WHERE property_id = ? ORDER BY created_at, id")
                    .bind(id)
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                sqlx::query("SELECT * FROM pricing_rules ORDER BY created_at, id")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .context("Failed to query pricing rules")?;

        rows.iter().map(row_to_record).collect()
    }

    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM pricing_rules")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count pricing rules")?;
        Ok(row.try_get("n")?)
    }

    /// Close the pool; later writes fail with a storage error.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn row_to_record(row: &SqliteRow) -> Result<PricingRuleRecord> {
    let id: String = row.try_get("id")?;
    let rule_type: String = row.try_get("rule_type")?;
    let conditions: String = row.try_get("conditions")?;
    let adjustment: String = row.try_get("price_adjustment")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(PricingRuleRecord {
        id: Uuid::parse_str(&id).with_context(|| format!("Bad rule id {id}"))?,
        property_id: row.try_get("property_id")?,
        rule_type: rule_type.parse()?,
        rule_name: row.try_get("rule_name")?,
        conditions: serde_json::from_str(&conditions).context("Bad conditions payload")?,
        price_adjustment: Decimal::from_str(&adjustment)
            .with_context(|| format!("Bad price adjustment {adjustment}"))?,
        is_percentage: row.try_get("is_percentage")?,
        is_active: row.try_get("is_active")?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .with_context(|| format!("Bad timestamp {created_at}"))?
            .with_timezone(&Utc),
    })
}

#[async_trait]
impl PricingRuleSink for SqliteRuleStore {
    async fn insert_rule(&self, record: &PricingRuleRecord) -> Result<()> {
        let conditions = serde_json::to_string(&record.conditions)
            .context("Failed to serialise rule conditions")?;

        sqlx::query(
            "INSERT INTO pricing_rules
             (id, property_id, rule_type, rule_name, conditions, price_adjustment,
              is_percentage, is_active, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.to_string())
        .bind(&record.property_id)
        .bind(record.rule_type.as_str())
        .bind(&record.rule_name)
        .bind(conditions)
        .bind(record.price_adjustment.to_string())
        .bind(record.is_percentage)
        .bind(record.is_active)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StayRateError::Storage(format!("pricing rule insert failed: {e}")))?;

        debug!(rule_id = %record.id, property_id = %record.property_id, "Pricing rule stored");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
