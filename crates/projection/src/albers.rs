//! Albers Conic Equal Area projection.
//!
//! EPSG:5070 (NAD83 / CONUS Albers) is the reference frame for every area and
//! overlap measurement: planar areas computed from projected coordinates
//! equal the areas on the ellipsoid.

use basin_common::ConicParams;

use crate::conic::{msfn, phi_from_q, qsfn, wrap_lon, TO_DEG, TO_RAD};
use crate::error::{ProjectionError, Result};

/// Ellipsoidal Albers Conic Equal Area projection.
#[derive(Debug, Clone)]
pub struct AlbersEqualArea {
    /// Central meridian in radians
    pub lon0: f64,
    /// Semi-major axis (meters)
    pub a: f64,
    /// First eccentricity
    pub e: f64,
    pub false_easting: f64,
    pub false_northing: f64,
    /// Cone constant (n)
    n: f64,
    /// C constant
    c: f64,
    /// Rho at the latitude of origin
    rho0: f64,
}

impl AlbersEqualArea {
    /// Create a projection from conic parameters (degrees).
    pub fn new(params: &ConicParams) -> Result<Self> {
        let lat0 = params.lat0 * TO_RAD;
        let lat1 = params.lat1 * TO_RAD;
        let lat2 = params.lat2 * TO_RAD;
        let a = params.ellipsoid.semi_major();
        let e = params.ellipsoid.eccentricity();

        let m1 = msfn(lat1, e);
        let q1 = qsfn(lat1, e);

        let n = if (lat1 - lat2).abs() < 1e-10 {
            lat1.sin()
        } else {
            let m2 = msfn(lat2, e);
            let q2 = qsfn(lat2, e);
            (m1 * m1 - m2 * m2) / (q2 - q1)
        };

        if n.abs() < 1e-10 || !n.is_finite() {
            return Err(ProjectionError::InvalidParameters(format!(
                "degenerate Albers cone constant {} for {:?}",
                n, params
            )));
        }

        let c = m1 * m1 + n * q1;
        let rho0 = a * (c - n * qsfn(lat0, e)).sqrt() / n;

        Ok(Self {
            lon0: params.lon0 * TO_RAD,
            a,
            e,
            false_easting: params.false_easting,
            false_northing: params.false_northing,
            n,
            c,
            rho0,
        })
    }

    /// Convert geographic coordinates (degrees) to projected meters.
    pub fn forward(&self, lon_deg: f64, lat_deg: f64) -> Option<(f64, f64)> {
        let lat = lat_deg * TO_RAD;
        let lon = lon_deg * TO_RAD;

        let radicand = self.c - self.n * qsfn(lat, self.e);
        if radicand < 0.0 {
            return None;
        }
        let rho = self.a * radicand.sqrt() / self.n;
        let theta = self.n * wrap_lon(lon - self.lon0);

        let x = rho * theta.sin() + self.false_easting;
        let y = self.rho0 - rho * theta.cos() + self.false_northing;

        (x.is_finite() && y.is_finite()).then_some((x, y))
    }

    /// Convert projected meters to geographic coordinates (lon, lat in degrees).
    pub fn inverse(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let x = x - self.false_easting;
        let dy = self.rho0 - (y - self.false_northing);
        let sign = self.n.signum();

        let rho = (x * x + dy * dy).sqrt();
        let theta = (sign * x).atan2(sign * dy);

        let q = (self.c - (rho * self.n / self.a).powi(2)) / self.n;
        let lat = phi_from_q(q, self.e)?;
        let lon = theta / self.n + self.lon0;

        let (lon, lat) = (wrap_lon(lon) * TO_DEG, lat * TO_DEG);
        (lon.is_finite() && lat.is_finite()).then_some((lon, lat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basin_common::{Crs, CrsCode};

    fn conus_albers() -> AlbersEqualArea {
        match CrsCode::Epsg5070.definition() {
            Crs::AlbersEqualArea(p) => AlbersEqualArea::new(&p).unwrap(),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_origin_maps_to_zero() {
        let proj = conus_albers();
        let (x, y) = proj.forward(-96.0, 23.0).unwrap();
        assert!(x.abs() < 1e-6, "x should be ~0, got {}", x);
        assert!(y.abs() < 1e-6, "y should be ~0, got {}", y);
    }

    #[test]
    fn test_preserves_area_of_one_degree_cell() {
        // Ellipsoidal area of the 1x1 degree cell: a^2/2 * dlon * (q(lat2) - q(lat1))
        let proj = conus_albers();
        let (lon0, lat0) = (-94.0, 36.0);
        let steps = 200;
        let mut ring = Vec::with_capacity(steps * 4);
        for i in 0..steps {
            let t = i as f64 / steps as f64;
            ring.push(proj.forward(lon0 + t, lat0).unwrap());
        }
        for i in 0..steps {
            let t = i as f64 / steps as f64;
            ring.push(proj.forward(lon0 + 1.0, lat0 + t).unwrap());
        }
        for i in 0..steps {
            let t = i as f64 / steps as f64;
            ring.push(proj.forward(lon0 + 1.0 - t, lat0 + 1.0).unwrap());
        }
        for i in 0..steps {
            let t = i as f64 / steps as f64;
            ring.push(proj.forward(lon0, lat0 + 1.0 - t).unwrap());
        }
        let mut twice_area = 0.0;
        for i in 0..ring.len() {
            let (x1, y1) = ring[i];
            let (x2, y2) = ring[(i + 1) % ring.len()];
            twice_area += x1 * y2 - x2 * y1;
        }
        let projected = twice_area / 2.0;

        let e = proj.e;
        let expected = proj.a * proj.a / 2.0
            * TO_RAD
            * (qsfn((lat0 + 1.0) * TO_RAD, e) - qsfn(lat0 * TO_RAD, e));
        let rel = (projected - expected).abs() / expected;
        assert!(rel < 1e-6, "relative area error {} ({} vs {})", rel, projected, expected);
    }

    #[test]
    fn test_roundtrip() {
        let proj = conus_albers();
        for &(lon, lat) in &[(-94.2, 36.1), (-122.4, 37.8), (-70.0, 45.0), (-80.0, 25.0)] {
            let (x, y) = proj.forward(lon, lat).unwrap();
            let (lon2, lat2) = proj.inverse(x, y).unwrap();
            assert!((lon - lon2).abs() < 1e-8, "lon roundtrip failed: {} vs {}", lon, lon2);
            assert!((lat - lat2).abs() < 1e-8, "lat roundtrip failed: {} vs {}", lat, lat2);
        }
    }
}
