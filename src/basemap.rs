//! Static world layers drawn under every map.
//!
//! Geometry comes from a GeoJSON `FeatureCollection` whose features carry a
//! `layer` property (`land`, `lake`, `river` or `border`). Coordinates are
//! `[longitude, latitude]`. Only outer polygon rings are used; holes are ignored.

use std::path::Path;

use serde::Deserialize;

use crate::error::{DirectoryError, Result};

const EMBEDDED: &str = include_str!("../data/basemap.geojson");

/// `(longitude, latitude)` pairs.
pub type Path2 = Vec<(f64, f64)>;

#[derive(Debug, Clone, Default)]
pub struct Basemap {
    /// Land polygons. Their outlines double as the coastline layer.
    pub land: Vec<Path2>,
    pub lakes: Vec<Path2>,
    pub rivers: Vec<Path2>,
    pub borders: Vec<Path2>,
}

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    properties: Properties,
    geometry: Geometry,
}

#[derive(Deserialize)]
struct Properties {
    layer: Layer,
}

#[derive(Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
enum Layer {
    Land,
    Lake,
    River,
    Border,
}

#[derive(Deserialize)]
#[serde(tag = "type", content = "coordinates")]
enum Geometry {
    LineString(Vec<[f64; 2]>),
    MultiLineString(Vec<Vec<[f64; 2]>>),
    Polygon(Vec<Vec<[f64; 2]>>),
    MultiPolygon(Vec<Vec<Vec<[f64; 2]>>>),
}

impl Basemap {
    pub fn embedded() -> Result<Self> {
        Self::from_geojson_str(EMBEDDED)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_geojson_str(&content)
    }

    pub fn from_geojson_str(content: &str) -> Result<Self> {
        let collection: FeatureCollection = serde_json::from_str(content)
            .map_err(|e| DirectoryError::Basemap(e.to_string()))?;

        let mut basemap = Basemap::default();
        for feature in collection.features {
            let layer = feature.properties.layer;
            let polygonal = matches!(layer, Layer::Land | Layer::Lake);
            let paths = match feature.geometry {
                Geometry::LineString(line) if !polygonal => vec![line],
                Geometry::MultiLineString(lines) if !polygonal => lines,
                Geometry::Polygon(rings) if polygonal => outer_ring(rings).into_iter().collect(),
                Geometry::MultiPolygon(polygons) if polygonal => {
                    polygons.into_iter().filter_map(outer_ring).collect()
                }
                _ => {
                    return Err(DirectoryError::Basemap(format!(
                        "geometry type does not fit layer {:?}",
                        layer
                    )))
                }
            };

            for raw in paths {
                let path = to_path(raw, polygonal)?;
                match layer {
                    Layer::Land => basemap.land.push(path),
                    Layer::Lake => basemap.lakes.push(path),
                    Layer::River => basemap.rivers.push(path),
                    Layer::Border => basemap.borders.push(path),
                }
            }
        }
        Ok(basemap)
    }
}

fn outer_ring(mut rings: Vec<Vec<[f64; 2]>>) -> Option<Vec<[f64; 2]>> {
    if rings.is_empty() {
        None
    } else {
        Some(rings.swap_remove(0))
    }
}

fn to_path(raw: Vec<[f64; 2]>, closed: bool) -> Result<Path2> {
    let mut path: Path2 = Vec::with_capacity(raw.len());
    for [lon, lat] in raw {
        if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
            return Err(DirectoryError::Basemap(format!(
                "coordinate out of range: [{}, {}]",
                lon, lat
            )));
        }
        path.push((lon, lat));
    }

    // GeoJSON rings repeat the first point at the end.
    if closed && path.len() > 1 && path.first() == path.last() {
        path.pop();
    }

    let min_points = if closed { 3 } else { 2 };
    if path.len() < min_points {
        return Err(DirectoryError::Basemap(format!(
            "path with {} points, need at least {}",
            path.len(),
            min_points
        )));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_basemap_has_every_layer() {
        let basemap = Basemap::embedded().unwrap();
        assert!(!basemap.land.is_empty());
        assert!(!basemap.lakes.is_empty());
        assert!(!basemap.rivers.is_empty());
        assert!(!basemap.borders.is_empty());
    }

    #[test]
    fn closing_point_is_dropped() {
        let basemap = Basemap::from_geojson_str(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{"layer":"land"},
                 "geometry":{"type":"Polygon","coordinates":[[[0,0],[10,0],[10,10],[0,0]],[[1,1],[2,1],[2,2],[1,1]]]}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(basemap.land, vec![vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]]);
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        let err = Basemap::from_geojson_str(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{"layer":"river"},
                 "geometry":{"type":"LineString","coordinates":[[0,0],[190,10]]}}
            ]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DirectoryError::Basemap(_)));
    }

    #[test]
    fn rejects_line_geometry_for_land() {
        let err = Basemap::from_geojson_str(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{"layer":"land"},
                 "geometry":{"type":"LineString","coordinates":[[0,0],[10,10]]}}
            ]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DirectoryError::Basemap(_)));
    }
}
