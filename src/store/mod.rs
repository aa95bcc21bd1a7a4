//! SQLite-backed listing store, keyed by listing link.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::models::{Listing, ListingSummary, StoredListing};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS apartments (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    title      TEXT NOT NULL,
    price      TEXT NOT NULL,
    bail       TEXT,
    tax        TEXT,
    services   TEXT,
    address    TEXT,
    "desc"     TEXT,
    images     TEXT,
    link       TEXT UNIQUE,
    scraped_at TEXT
)
"#;

const LINK_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_link ON apartments(link)";

/// Durable table of listings with upsert-by-link semantics.
///
/// Every row is identified by its `link`; `upsert` fully replaces the row
/// sharing that link. Reads are ordered by rowid descending, i.e. most
/// recently inserted first.
pub struct ListingStore {
    pool: SqlitePool,
}

impl ListingStore {
    /// Open (or create) the database at `path`. The parent directory is
    /// created when missing. Initialization failures are fatal and
    /// propagate to the caller.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).with_context(|| {
                    format!("failed to create database directory {}", dir.display())
                })?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .with_context(|| format!("failed to open database {}", path.display()))?;

        let store = Self { pool };
        store.init_schema().await?;
        debug!(path = %path.display(), "listing store ready");
        Ok(store)
    }

    /// In-memory database, used by tests. A single connection is forced so
    /// every query sees the same database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("failed to open in-memory database")?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .context("failed to create apartments table")?;
        sqlx::query(LINK_INDEX)
            .execute(&self.pool)
            .await
            .context("failed to create link index")?;
        Ok(())
    }

    /// True iff a row with this link is already present.
    pub async fn exists(&self, link: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM apartments WHERE link = ?")
            .bind(link)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Insert the listing, or fully replace the row sharing its link.
    /// Every column is rewritten; nothing is merged.
    pub async fn upsert(&self, listing: &Listing) -> Result<()> {
        let images = serde_json::to_string(&listing.images)?;

        sqlx::query(
            r#"
            INSERT INTO apartments
                (title, price, bail, tax, services, address, "desc", images, link, scraped_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(link) DO UPDATE SET
                title = excluded.title,
                price = excluded.price,
                bail = excluded.bail,
                tax = excluded.tax,
                services = excluded.services,
                address = excluded.address,
                "desc" = excluded."desc",
                images = excluded.images,
                scraped_at = excluded.scraped_at
            "#,
        )
        .bind(&listing.title)
        .bind(&listing.price)
        .bind(&listing.deposit)
        .bind(&listing.commission)
        .bind(&listing.utilities)
        .bind(&listing.address)
        .bind(&listing.description)
        .bind(&images)
        .bind(&listing.link)
        .bind(listing.scraped_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to save listing {}", listing.link))?;

        Ok(())
    }

    /// Most recently inserted listings, newest first.
    pub async fn recent(&self, limit: i64) -> Result<Vec<ListingSummary>> {
        let rows = sqlx::query(
            "SELECT title, price, address, images, link \
             FROM apartments ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let images = decode_images(row.try_get("images")?);
                Ok(ListingSummary {
                    title: row.try_get("title")?,
                    price: row.try_get("price")?,
                    address: row.try_get::<Option<String>, _>("address")?.unwrap_or_default(),
                    image_count: images.len(),
                    link: row.try_get::<Option<String>, _>("link")?.unwrap_or_default(),
                })
            })
            .collect()
    }

    /// One page of full rows for browsing, newest first.
    pub async fn page(&self, offset: i64, limit: i64) -> Result<Vec<StoredListing>> {
        let rows = sqlx::query(
            r#"SELECT id, title, price, bail, tax, services, address, "desc", images, link, scraped_at
               FROM apartments ORDER BY id DESC LIMIT ? OFFSET ?"#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_listing).collect()
    }

    /// Total number of stored listings.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM apartments")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Full row by rowid, if present.
    pub async fn by_id(&self, id: i64) -> Result<Option<StoredListing>> {
        let row = sqlx::query(
            r#"SELECT id, title, price, bail, tax, services, address, "desc", images, link, scraped_at
               FROM apartments WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_listing).transpose()
    }
}

fn row_to_listing(row: &SqliteRow) -> Result<StoredListing> {
    let images = decode_images(row.try_get("images")?);

    Ok(StoredListing {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        price: row.try_get("price")?,
        deposit: row.try_get::<Option<String>, _>("bail")?.unwrap_or_default(),
        commission: row.try_get::<Option<String>, _>("tax")?.unwrap_or_default(),
        utilities: row.try_get::<Option<String>, _>("services")?.unwrap_or_default(),
        address: row.try_get::<Option<String>, _>("address")?.unwrap_or_default(),
        description: row.try_get::<Option<String>, _>("desc")?.unwrap_or_default(),
        images,
        link: row.try_get::<Option<String>, _>("link")?.unwrap_or_default(),
        scraped_at: row.try_get::<Option<DateTime<Utc>>, _>("scraped_at")?,
    })
}

/// The images column holds a JSON array of URLs; anything unreadable
/// counts as no images.
fn decode_images(raw: Option<String>) -> Vec<String> {
    raw.as_deref()
        .map(|json| serde_json::from_str(json).unwrap_or_default())
        .unwrap_or_default()
}
