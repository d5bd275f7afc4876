#![allow(dead_code)]

use std::sync::Arc;

use citymap::account_store::{self, AccountStore};
use citymap::seed::{self, CityRecord};
use citymap::Catalog;
use sqlx::SqlitePool;
use tempfile::TempDir;

pub fn record(city: &str, lat: f64, lng: f64, country: &str, population: u64) -> CityRecord {
    CityRecord {
        city: city.to_string(),
        lat,
        lng,
        country: country.to_string(),
        population: Some(population as f64),
    }
}

pub fn sample_records() -> Vec<CityRecord> {
    vec![
        record("Paris", 48.8566, 2.3522, "France", 2_148_000),
        record("Marseille", 43.2964, 5.37, "France", 873_076),
        record("Berlin", 52.52, 13.405, "Germany", 3_644_826),
        record("Tokyo", 35.6897, 139.6922, "Japan", 37_732_000),
        record("New York", 40.6943, -73.9249, "United States", 18_908_608),
        record("Lima", -12.06, -77.0375, "Peru", 11_283_787),
    ]
}

pub struct TestStore {
    pub dir: TempDir,
    pub pool: SqlitePool,
    pub catalog: Arc<Catalog>,
    pub store: AccountStore,
}

pub async fn open_store() -> TestStore {
    let dir = tempfile::tempdir().unwrap();
    let pool = account_store::open(&dir.path().join("citymap.db")).await.unwrap();
    seed::import_records(&pool, sample_records()).await.unwrap();
    let catalog = Arc::new(Catalog::load(&pool).await.unwrap());
    let store = AccountStore::new(pool.clone(), catalog.clone());
    TestStore { dir, pool, catalog, store }
}
