use crate::account_store::AccountStore;
use crate::catalog::Catalog;
use crate::error::{DirectoryError, Result};
use crate::models::{AccountId, City, RenderKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopulationRange {
    pub min: u64,
    /// `None` is unbounded above.
    pub max: Option<u64>,
}

impl PopulationRange {
    pub fn new(min: u64, max: Option<u64>) -> Self {
        Self { min, max }
    }

    /// Parses raw bound tokens. `min` is required and both must be non-negative integers.
    pub fn parse(min: Option<&str>, max: Option<&str>) -> Result<Self> {
        let min = min.ok_or_else(|| {
            DirectoryError::InvalidArgument("min_population is required".to_string())
        })?;
        let min = parse_bound("min_population", min)?;
        let max = max.map(|m| parse_bound("max_population", m)).transpose()?;
        Ok(Self { min, max })
    }

    pub fn contains(&self, population: u64) -> bool {
        population >= self.min && self.max.map_or(true, |max| population <= max)
    }
}

fn parse_bound(field: &str, raw: &str) -> Result<u64> {
    raw.trim().parse::<u64>().map_err(|_| {
        DirectoryError::InvalidArgument(format!(
            "{} must be a non-negative integer, got '{}'",
            field, raw
        ))
    })
}

// Results keep catalog order. Empty results are not errors.
pub fn by_country(catalog: &Catalog, country: &str) -> Vec<City> {
    catalog
        .iter()
        .filter(|c| c.country == country)
        .cloned()
        .collect()
}

pub fn by_population(catalog: &Catalog, min: u64, max: Option<u64>) -> Vec<City> {
    let range = PopulationRange::new(min, max);
    catalog
        .iter()
        .filter(|c| range.contains(c.population))
        .cloned()
        .collect()
}

pub fn by_country_and_population(
    catalog: &Catalog,
    country: &str,
    min: u64,
    max: Option<u64>,
) -> Vec<City> {
    let range = PopulationRange::new(min, max);
    catalog
        .iter()
        .filter(|c| c.country == country && range.contains(c.population))
        .cloned()
        .collect()
}

pub async fn saved_by_account(store: &AccountStore, account_id: AccountId) -> Result<Vec<City>> {
    store.get_saved_cities(account_id).await
}

/// A catalog-wide filter composed from optional request parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum CityFilter {
    Country(String),
    Population(PopulationRange),
    CountryPopulation(String, PopulationRange),
}

impl CityFilter {
    pub fn from_params(
        country: Option<&str>,
        min_population: Option<&str>,
        max_population: Option<&str>,
    ) -> Result<Self> {
        let country = country.map(str::trim).filter(|c| !c.is_empty());
        let has_bounds = min_population.is_some() || max_population.is_some();

        match (country, has_bounds) {
            (Some(country), false) => Ok(CityFilter::Country(country.to_string())),
            (None, true) => Ok(CityFilter::Population(PopulationRange::parse(
                min_population,
                max_population,
            )?)),
            (Some(country), true) => Ok(CityFilter::CountryPopulation(
                country.to_string(),
                PopulationRange::parse(min_population, max_population)?,
            )),
            (None, false) => Err(DirectoryError::InvalidArgument(
                "expected a country, a population range, or both".to_string(),
            )),
        }
    }

    pub fn apply(&self, catalog: &Catalog) -> Vec<City> {
        match self {
            CityFilter::Country(country) => by_country(catalog, country),
            CityFilter::Population(range) => by_population(catalog, range.min, range.max),
            CityFilter::CountryPopulation(country, range) => {
                by_country_and_population(catalog, country, range.min, range.max)
            }
        }
    }

    pub fn kind(&self) -> RenderKind {
        match self {
            CityFilter::Country(_) => RenderKind::Country,
            CityFilter::Population(_) => RenderKind::Population,
            CityFilter::CountryPopulation(..) => RenderKind::CountryPopulation,
        }
    }

    pub fn describe(&self) -> String {
        let range = |r: &PopulationRange| match r.max {
            Some(max) => format!("population {}..={}", r.min, max),
            None => format!("population >= {}", r.min),
        };
        match self {
            CityFilter::Country(country) => format!("country '{}'", country),
            CityFilter::Population(r) => range(r),
            CityFilter::CountryPopulation(country, r) => {
                format!("country '{}' with {}", country, range(r))
            }
        }
    }
}
