//! GeoJSON types for basin input and footprint output.

use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};

use crate::error::{FootprintError, Result};

/// A GeoJSON position; extra ordinates beyond x and y are ignored.
pub type Position = Vec<f64>;

/// A GeoJSON FeatureCollection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(bound(deserialize = "P: Deserialize<'de> + Default"))]
pub struct FeatureCollection<P> {
    /// Type identifier (always "FeatureCollection").
    #[serde(rename = "type")]
    pub type_: String,

    pub features: Vec<Feature<P>>,
}

impl<P> FeatureCollection<P> {
    pub fn new(features: Vec<Feature<P>>) -> Self {
        Self {
            type_: "FeatureCollection".to_string(),
            features,
        }
    }
}

/// A GeoJSON Feature with typed properties.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(bound(deserialize = "P: Deserialize<'de> + Default"))]
pub struct Feature<P> {
    /// Type identifier (always "Feature").
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub geometry: Option<Geometry>,

    #[serde(default)]
    pub properties: P,
}

impl<P> Feature<P> {
    pub fn new(id: impl Into<String>, geometry: Geometry, properties: P) -> Self {
        Self {
            type_: "Feature".to_string(),
            id: Some(id.into()),
            geometry: Some(geometry),
            properties,
        }
    }
}

/// Areal GeoJSON geometries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Geometry {
    /// Array of linear rings (first is exterior, rest are holes).
    Polygon { coordinates: Vec<Vec<Position>> },

    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },

    GeometryCollection { geometries: Vec<Geometry> },
}

impl Geometry {
    /// GeoJSON form of a polygon.
    pub fn from_polygon(polygon: &Polygon<f64>) -> Self {
        Geometry::Polygon {
            coordinates: polygon_positions(polygon),
        }
    }

    /// GeoJSON form of a multipolygon.
    pub fn from_multi_polygon(multi: &MultiPolygon<f64>) -> Self {
        Geometry::MultiPolygon {
            coordinates: multi.0.iter().map(polygon_positions).collect(),
        }
    }

    /// Every polygon in this geometry.
    pub fn polygons(&self) -> Result<Vec<Polygon<f64>>> {
        match self {
            Geometry::Polygon { coordinates } => Ok(vec![to_polygon(coordinates)?]),
            Geometry::MultiPolygon { coordinates } => coordinates.iter().map(|p| to_polygon(p)).collect(),
            Geometry::GeometryCollection { geometries } => {
                let mut all = Vec::new();
                for g in geometries {
                    all.extend(g.polygons()?);
                }
                Ok(all)
            }
        }
    }
}

fn polygon_positions(polygon: &Polygon<f64>) -> Vec<Vec<Position>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring| ring.0.iter().map(|c| vec![c.x, c.y]).collect())
        .collect()
}

fn to_polygon(rings: &[Vec<Position>]) -> Result<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| to_ring(ring));
    let exterior = rings
        .next()
        .ok_or_else(|| FootprintError::basin("polygon without rings"))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn to_ring(positions: &[Position]) -> Result<LineString<f64>> {
    if positions.len() < 4 {
        return Err(FootprintError::basin(format!(
            "ring has {} positions, at least 4 are required",
            positions.len()
        )));
    }
    positions
        .iter()
        .map(|p| match p.as_slice() {
            [x, y, ..] if x.is_finite() && y.is_finite() => Ok(Coord { x: *x, y: *y }),
            _ => Err(FootprintError::basin(format!("invalid position {:?}", p))),
        })
        .collect::<Result<Vec<_>>>()
        .map(LineString::from)
}

/// Collect every polygon from a GeoJSON document: a FeatureCollection, a
/// Feature or a bare geometry.
pub fn read_polygons(text: &str) -> Result<MultiPolygon<f64>> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let geometries: Vec<Geometry> = match value.get("type").and_then(|t| t.as_str()) {
        Some("FeatureCollection") => {
            let fc: FeatureCollection<serde_json::Value> = serde_json::from_value(value)?;
            fc.features.into_iter().filter_map(|f| f.geometry).collect()
        }
        Some("Feature") => {
            let feature: Feature<serde_json::Value> = serde_json::from_value(value)?;
            feature.geometry.into_iter().collect()
        }
        Some(_) => vec![serde_json::from_value(value)?],
        None => return Err(FootprintError::basin("document has no GeoJSON type")),
    };

    let mut polygons = Vec::new();
    for geometry in &geometries {
        polygons.extend(geometry.polygons()?);
    }
    Ok(MultiPolygon(polygons))
}
