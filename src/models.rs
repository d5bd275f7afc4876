use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DirectoryError;

/// Opaque account identifier. Equal to the caller's chat/user id; there is no signup.
pub type AccountId = i64;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct City {
    pub id: i64,
    #[sqlx(rename = "city")]
    pub name: String,
    #[sqlx(rename = "lat")]
    pub latitude: f64,
    #[sqlx(rename = "lng")]
    pub longitude: f64,
    pub country: String,
    #[sqlx(try_from = "i64")]
    pub population: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum MarkerColor {
    #[default]
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
    Black,
}

impl MarkerColor {
    pub const ALL: [MarkerColor; 6] = [
        MarkerColor::Red,
        MarkerColor::Blue,
        MarkerColor::Green,
        MarkerColor::Yellow,
        MarkerColor::Purple,
        MarkerColor::Black,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerColor::Red => "red",
            MarkerColor::Blue => "blue",
            MarkerColor::Green => "green",
            MarkerColor::Yellow => "yellow",
            MarkerColor::Purple => "purple",
            MarkerColor::Black => "black",
        }
    }

    pub fn rgba(&self) -> [u8; 4] {
        match self {
            MarkerColor::Red => [214, 39, 40, 255],
            MarkerColor::Blue => [31, 119, 180, 255],
            MarkerColor::Green => [44, 160, 44, 255],
            MarkerColor::Yellow => [255, 215, 0, 255],
            MarkerColor::Purple => [148, 103, 189, 255],
            MarkerColor::Black => [0, 0, 0, 255],
        }
    }

    /// Outline drawn around a marker so it stays visible on any fill.
    pub fn outline_rgba(&self) -> [u8; 4] {
        match self {
            MarkerColor::Black => [255, 255, 255, 255],
            _ => [0, 0, 0, 255],
        }
    }
}

impl fmt::Display for MarkerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarkerColor {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        MarkerColor::ALL
            .into_iter()
            .find(|c| c.as_str() == lowered)
            .ok_or_else(|| {
                let allowed: Vec<&str> = MarkerColor::ALL.iter().map(|c| c.as_str()).collect();
                DirectoryError::InvalidArgument(format!(
                    "unsupported color '{}', allowed: {}",
                    s,
                    allowed.join(", ")
                ))
            })
    }
}

/// What a rendered map was asked for. Used to name output files and log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderKind {
    City,
    Saved,
    Country,
    Population,
    CountryPopulation,
}

impl RenderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderKind::City => "city",
            RenderKind::Saved => "saved",
            RenderKind::Country => "country",
            RenderKind::Population => "population",
            RenderKind::CountryPopulation => "country_population",
        }
    }
}

impl fmt::Display for RenderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
