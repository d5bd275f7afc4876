use std::path::Path;

use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::Result;

/// One row of the dataset. Extra CSV columns are ignored.
#[derive(Deserialize, Debug, Clone)]
pub struct CityRecord {
    pub city: String,
    pub lat: f64,
    pub lng: f64,
    pub country: String,
    #[serde(default)]
    pub population: Option<f64>,
}

impl CityRecord {
    fn on_globe(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

pub async fn city_count(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM cities")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Inserts records in order inside one transaction. Records whose name already
/// exists or whose coordinates are off the globe are skipped. Returns the number
/// of rows actually inserted.
pub async fn import_records(
    pool: &SqlitePool,
    records: impl IntoIterator<Item = CityRecord>,
) -> Result<u64> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for record in records {
        if !record.on_globe() {
            warn!(
                "city '{}' has coordinates ({}, {}) outside the globe, skipped",
                record.city, record.lat, record.lng
            );
            continue;
        }

        let population = record.population.unwrap_or(0.0).max(0.0) as i64;
        let result = sqlx::query(
            "INSERT OR IGNORE INTO cities (city, lat, lng, country, population) VALUES (?, ?, ?, ?, ?)"
        )
        .bind(&record.city)
        .bind(record.lat)
        .bind(record.lng)
        .bind(&record.country)
        .bind(population)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            warn!("duplicate city name '{}' ({}) skipped", record.city, record.country);
        } else {
            inserted += 1;
        }
    }

    tx.commit().await?;
    Ok(inserted)
}

pub async fn import_csv(pool: &SqlitePool, path: &Path) -> Result<u64> {
    let mut reader = csv::Reader::from_path(path)?;
    let records = reader
        .deserialize::<CityRecord>()
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let inserted = import_records(pool, records).await?;
    info!("imported {} cities from {}", inserted, path.display());
    Ok(inserted)
}

/// Imports `path` only when the catalog table is still empty.
pub async fn seed_if_empty(pool: &SqlitePool, path: &Path) -> Result<u64> {
    if city_count(pool).await? > 0 {
        info!("catalog already populated, skipping seed from {}", path.display());
        return Ok(0);
    }
    import_csv(pool, path).await
}
