//! Coordinate Reference System types and utilities.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{GridError, GridResult};

/// Well-known CRS codes used by the supported gridded products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrsCode {
    /// WGS84 Geographic (lon/lat in degrees), used by gridMET
    Epsg4326,
    /// NAD83 Geographic, used by PRISM
    Epsg4269,
    /// NAD83 / CONUS Albers Equal Area (meters)
    Epsg5070,
    /// Daymet V4 Lambert Conformal Conic (meters)
    DaymetLcc,
}

impl CrsCode {
    /// Parse a CRS identifier.
    ///
    /// Accepts formats like:
    /// - "EPSG:4326"
    /// - "epsg:5070"
    /// - "CRS:84" (equivalent to EPSG:4326 with lon/lat axis order)
    /// - "DAYMET" / "DAYMET:LCC"
    pub fn parse(s: &str) -> GridResult<Self> {
        let normalized = s.trim().to_uppercase();

        match normalized.as_str() {
            "EPSG:4326" | "CRS:84" | "WGS84" => Ok(CrsCode::Epsg4326),
            "EPSG:4269" | "NAD83" => Ok(CrsCode::Epsg4269),
            "EPSG:5070" => Ok(CrsCode::Epsg5070),
            "DAYMET" | "DAYMET:LCC" => Ok(CrsCode::DaymetLcc),
            _ => Err(GridError::UnsupportedCrs(s.to_string())),
        }
    }

    /// Full projection definition for this code.
    pub fn definition(&self) -> Crs {
        match self {
            CrsCode::Epsg4326 => Crs::Geographic {
                ellipsoid: Ellipsoid::Wgs84,
            },
            CrsCode::Epsg4269 => Crs::Geographic {
                ellipsoid: Ellipsoid::Grs80,
            },
            CrsCode::Epsg5070 => Crs::AlbersEqualArea(ConicParams {
                lat0: 23.0,
                lon0: -96.0,
                lat1: 29.5,
                lat2: 45.5,
                false_easting: 0.0,
                false_northing: 0.0,
                ellipsoid: Ellipsoid::Grs80,
            }),
            CrsCode::DaymetLcc => Crs::LambertConformal(ConicParams {
                lat0: 42.5,
                lon0: -100.0,
                lat1: 25.0,
                lat2: 60.0,
                false_easting: 0.0,
                false_northing: 0.0,
                ellipsoid: Ellipsoid::Wgs84,
            }),
        }
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            CrsCode::Epsg4326 => "EPSG:4326",
            CrsCode::Epsg4269 => "EPSG:4269",
            CrsCode::Epsg5070 => "EPSG:5070",
            CrsCode::DaymetLcc => "DAYMET:LCC",
        };
        write!(f, "{}", code)
    }
}

/// Reference ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ellipsoid {
    Wgs84,
    Grs80,
    Sphere { radius: f64 },
}

impl Ellipsoid {
    /// Semi-major axis in meters.
    pub fn semi_major(&self) -> f64 {
        match self {
            Ellipsoid::Wgs84 | Ellipsoid::Grs80 => 6_378_137.0,
            Ellipsoid::Sphere { radius } => *radius,
        }
    }

    /// Flattening.
    pub fn flattening(&self) -> f64 {
        match self {
            Ellipsoid::Wgs84 => 1.0 / 298.257_223_563,
            Ellipsoid::Grs80 => 1.0 / 298.257_222_101,
            Ellipsoid::Sphere { .. } => 0.0,
        }
    }

    /// First eccentricity.
    pub fn eccentricity(&self) -> f64 {
        let f = self.flattening();
        (2.0 * f - f * f).sqrt()
    }

    fn proj_name(&self) -> String {
        match self {
            Ellipsoid::Wgs84 => "+ellps=WGS84".to_string(),
            Ellipsoid::Grs80 => "+ellps=GRS80".to_string(),
            Ellipsoid::Sphere { radius } => format!("+R={}", radius),
        }
    }
}

/// Parameters shared by the two-standard-parallel conic projections.
///
/// Angles are in degrees, offsets in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConicParams {
    /// Latitude of origin
    pub lat0: f64,
    /// Central meridian
    pub lon0: f64,
    /// First standard parallel
    pub lat1: f64,
    /// Second standard parallel
    pub lat2: f64,
    #[serde(default)]
    pub false_easting: f64,
    #[serde(default)]
    pub false_northing: f64,
    pub ellipsoid: Ellipsoid,
}

impl ConicParams {
    /// Reject parameter sets the conic formulas cannot handle.
    pub fn validate(&self) -> GridResult<()> {
        let in_range = |v: f64| v.is_finite() && v.abs() < 90.0;
        if !in_range(self.lat0) || !in_range(self.lat1) || !in_range(self.lat2) {
            return Err(GridError::InvalidCrs(format!(
                "latitudes must lie strictly inside (-90, 90): {:?}",
                self
            )));
        }
        if (self.lat1 + self.lat2).abs() < 1e-10 {
            return Err(GridError::InvalidCrs(
                "standard parallels must not be symmetric about the equator".to_string(),
            ));
        }
        if !self.lon0.is_finite() {
            return Err(GridError::InvalidCrs("central meridian must be finite".to_string()));
        }
        Ok(())
    }

    fn proj_terms(&self) -> String {
        format!(
            "+lat_0={} +lon_0={} +lat_1={} +lat_2={} +x_0={} +y_0={} {}",
            self.lat0,
            self.lon0,
            self.lat1,
            self.lat2,
            self.false_easting,
            self.false_northing,
            self.ellipsoid.proj_name()
        )
    }
}

/// Full CRS definition with projection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Crs {
    /// Longitude/latitude in degrees
    Geographic { ellipsoid: Ellipsoid },
    /// Lambert Conformal Conic, meters
    LambertConformal(ConicParams),
    /// Albers Conic Equal Area, meters
    AlbersEqualArea(ConicParams),
}

impl Crs {
    /// Check if this is a geographic (lon/lat) CRS.
    pub fn is_geographic(&self) -> bool {
        matches!(self, Crs::Geographic { .. })
    }

    /// Check if planar areas computed in this CRS are undistorted.
    pub fn is_equal_area(&self) -> bool {
        matches!(self, Crs::AlbersEqualArea(_))
    }

    /// Underlying ellipsoid.
    pub fn ellipsoid(&self) -> Ellipsoid {
        match self {
            Crs::Geographic { ellipsoid } => *ellipsoid,
            Crs::LambertConformal(p) | Crs::AlbersEqualArea(p) => p.ellipsoid,
        }
    }

    /// Validate projection parameters.
    pub fn validate(&self) -> GridResult<()> {
        match self {
            Crs::Geographic { .. } => Ok(()),
            Crs::LambertConformal(p) | Crs::AlbersEqualArea(p) => p.validate(),
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Geographic { ellipsoid } => write!(f, "+proj=longlat {}", ellipsoid.proj_name()),
            Crs::LambertConformal(p) => write!(f, "+proj=lcc {}", p.proj_terms()),
            Crs::AlbersEqualArea(p) => write!(f, "+proj=aea {}", p.proj_terms()),
        }
    }
}

/// CRS as written in configuration: either a well-known code or an explicit
/// definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CrsSpec {
    Code(String),
    Custom(Crs),
}

impl CrsSpec {
    /// Resolve to a validated CRS definition.
    pub fn resolve(&self) -> GridResult<Crs> {
        let crs = match self {
            CrsSpec::Code(code) => CrsCode::parse(code)?.definition(),
            CrsSpec::Custom(crs) => *crs,
        };
        crs.validate()?;
        Ok(crs)
    }
}

impl From<CrsCode> for CrsSpec {
    fn from(code: CrsCode) -> Self {
        CrsSpec::Code(code.to_string())
    }
}
