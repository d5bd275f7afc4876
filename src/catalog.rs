use std::collections::HashMap;

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::{DirectoryError, Result};
use crate::models::City;

/// Read-only after startup. Lookups are exact and case-sensitive.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    cities: Vec<City>,
    by_name: HashMap<String, usize>,
}

impl Catalog {
    /// Builds a catalog from records in iteration order. A repeated name keeps its
    /// first record, matching the `UNIQUE` constraint on `cities.city`.
    pub fn from_cities(cities: impl IntoIterator<Item = City>) -> Self {
        let mut catalog = Catalog::default();
        for city in cities {
            if catalog.by_name.contains_key(&city.name) {
                continue;
            }
            catalog.by_name.insert(city.name.clone(), catalog.cities.len());
            catalog.cities.push(city);
        }
        catalog
    }

    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let rows: Vec<City> = sqlx::query_as(
            "SELECT id, city, lat, lng, country, population FROM cities ORDER BY id",
        )
        .fetch_all(pool)
        .await?;

        let catalog = Self::from_cities(rows.into_iter().filter(|city| {
            let valid = (-90.0..=90.0).contains(&city.latitude)
                && (-180.0..=180.0).contains(&city.longitude);
            if !valid {
                warn!("ignoring catalog row {} ({}) with coordinates off the globe", city.id, city.name);
            }
            valid
        }));
        info!("catalog loaded with {} cities", catalog.len());
        Ok(catalog)
    }

    pub fn lookup(&self, name: &str) -> Result<&City> {
        self.get(name)
            .ok_or_else(|| DirectoryError::NotFound(format!("city '{}'", name)))
    }

    pub fn get(&self, name: &str) -> Option<&City> {
        self.by_name.get(name).map(|&idx| &self.cities[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &City> {
        self.cities.iter()
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn city(id: i64, name: &str, country: &str) -> City {
        City {
            id,
            name: name.to_string(),
            latitude: 10.0,
            longitude: 20.0,
            country: country.to_string(),
            population: 1000,
        }
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let catalog = Catalog::from_cities(vec![city(1, "Paris", "France")]);
        assert!(catalog.lookup("Paris").is_ok());
        assert!(matches!(catalog.lookup("paris"), Err(DirectoryError::NotFound(_))));
    }

    #[test]
    fn repeated_name_keeps_first_record() {
        let catalog = Catalog::from_cities(vec![
            city(1, "Paris", "France"),
            city(2, "Paris", "United States"),
        ]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.lookup("Paris").unwrap().country, "France");
    }

    #[test]
    fn iteration_keeps_insertion_order() {
        let catalog = Catalog::from_cities(vec![
            city(3, "Oslo", "Norway"),
            city(1, "Lima", "Peru"),
        ]);
        let names: Vec<&str> = catalog.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Oslo", "Lima"]);
    }
}
