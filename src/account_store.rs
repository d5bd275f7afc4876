use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::error::Result;
use crate::models::{AccountId, City, MarkerColor};

/// Opens (creating if missing) the SQLite database and makes sure all tables exist.
pub async fn open(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let opts = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePool::connect_with(opts).await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS cities (
            id INTEGER PRIMARY KEY,
            city TEXT NOT NULL UNIQUE,
            lat REAL NOT NULL,
            lng REAL NOT NULL,
            country TEXT NOT NULL,
            population INTEGER NOT NULL DEFAULT 0
        )"
    ).execute(&pool).await?;

    // No uniqueness on (account_id, city_id): repeated saves append.
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS account_saved_cities (
            account_id INTEGER NOT NULL,
            city_id INTEGER NOT NULL REFERENCES cities(id),
            saved_at INTEGER NOT NULL
        )"
    ).execute(&pool).await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS account_settings (
            account_id INTEGER PRIMARY KEY,
            marker_color TEXT NOT NULL DEFAULT 'red'
        )"
    ).execute(&pool).await?;

    Ok(pool)
}

/// Per-account saved cities and marker color.
///
/// Every method is one self-contained statement against the pool. There is no
/// locking: concurrent color updates are last-write-wins, concurrent saves both land.
pub struct AccountStore {
    pool: SqlitePool,
    catalog: Arc<Catalog>,
}

impl AccountStore {
    pub fn new(pool: SqlitePool, catalog: Arc<Catalog>) -> Self {
        Self { pool, catalog }
    }

    /// Appends `city_name` to the account's list. Returns `false` without touching
    /// the store when the catalog does not know the name.
    pub async fn add_saved_city(&self, account_id: AccountId, city_name: &str) -> Result<bool> {
        let Some(city) = self.catalog.get(city_name) else {
            debug!("account {} tried to save unknown city '{}'", account_id, city_name);
            return Ok(false);
        };

        sqlx::query(
            "INSERT INTO account_saved_cities (account_id, city_id, saved_at) VALUES (?, ?, ?)"
        )
        .bind(account_id)
        .bind(city.id)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        debug!("account {} saved city {} ({})", account_id, city.name, city.id);
        Ok(true)
    }

    /// Saved cities in insertion order, duplicates included. Empty for unknown accounts.
    pub async fn get_saved_cities(&self, account_id: AccountId) -> Result<Vec<City>> {
        let cities: Vec<City> = sqlx::query_as(
            "SELECT cities.id, cities.city, cities.lat, cities.lng, cities.country, cities.population
             FROM account_saved_cities
             JOIN cities ON account_saved_cities.city_id = cities.id
             WHERE account_saved_cities.account_id = ?
             ORDER BY account_saved_cities.rowid"
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(cities)
    }

    pub async fn set_marker_color(&self, account_id: AccountId, color: MarkerColor) -> Result<()> {
        sqlx::query(
            "INSERT INTO account_settings (account_id, marker_color) VALUES (?, ?)
             ON CONFLICT(account_id) DO UPDATE SET marker_color = excluded.marker_color"
        )
        .bind(account_id)
        .bind(color.as_str())
        .execute(&self.pool)
        .await?;

        debug!("account {} marker color set to {}", account_id, color);
        Ok(())
    }

    pub async fn get_marker_color(&self, account_id: AccountId) -> Result<MarkerColor> {
        let stored: Option<String> = sqlx::query_scalar(
            "SELECT marker_color FROM account_settings WHERE account_id = ?"
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(stored) = stored else {
            return Ok(MarkerColor::default());
        };

        match stored.parse() {
            Ok(color) => Ok(color),
            Err(_) => {
                warn!("account {} has unrecognised marker color '{}', using default", account_id, stored);
                Ok(MarkerColor::default())
            }
        }
    }
}
