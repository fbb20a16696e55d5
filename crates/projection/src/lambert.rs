//! Lambert Conformal Conic projection.
//!
//! Daymet V4 distributes its 1 km surfaces on a secant Lambert Conformal
//! cone over North America. It maps a cone secant to the ellipsoid onto a
//! flat plane; shapes are preserved locally but areas are not, which is why
//! cell areas are never measured in this frame.
//!
//! The projection parameters include:
//! - Latitude of origin (lat0)
//! - Central meridian (lon0)
//! - Standard parallels: lat1 and lat2 (can be equal for tangent cone)
//! - False easting/northing

use basin_common::ConicParams;

use crate::conic::{msfn, phi_from_t, tsfn, wrap_lon, TO_DEG, TO_RAD};
use crate::error::{ProjectionError, Result};

/// Ellipsoidal Lambert Conformal Conic projection.
#[derive(Debug, Clone)]
pub struct LambertConformal {
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
    /// F constant
    f: f64,
    /// Rho at the latitude of origin
    rho0: f64,
}

impl LambertConformal {
    /// Create a projection from conic parameters (degrees).
    pub fn new(params: &ConicParams) -> Result<Self> {
        let lat0 = params.lat0 * TO_RAD;
        let lat1 = params.lat1 * TO_RAD;
        let lat2 = params.lat2 * TO_RAD;
        let a = params.ellipsoid.semi_major();
        let e = params.ellipsoid.eccentricity();

        let m1 = msfn(lat1, e);
        let t1 = tsfn(lat1, e);

        // Compute cone constant n
        let n = if (lat1 - lat2).abs() < 1e-10 {
            // Tangent cone (single standard parallel)
            lat1.sin()
        } else {
            // Secant cone (two standard parallels)
            let m2 = msfn(lat2, e);
            let t2 = tsfn(lat2, e);
            (m1.ln() - m2.ln()) / (t1.ln() - t2.ln())
        };

        if n.abs() < 1e-10 || !n.is_finite() {
            return Err(ProjectionError::InvalidParameters(format!(
                "degenerate Lambert cone constant {} for {:?}",
                n, params
            )));
        }

        let f = m1 / (n * t1.powf(n));
        let rho0 = a * f * tsfn(lat0, e).powf(n);

        Ok(Self {
            lon0: params.lon0 * TO_RAD,
            a,
            e,
            false_easting: params.false_easting,
            false_northing: params.false_northing,
            n,
            f,
            rho0,
        })
    }

    /// Convert geographic coordinates (degrees) to projected meters.
    pub fn forward(&self, lon_deg: f64, lat_deg: f64) -> Option<(f64, f64)> {
        let lat = lat_deg * TO_RAD;
        let lon = lon_deg * TO_RAD;

        let rho = self.a * self.f * tsfn(lat, self.e).powf(self.n);
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

        let rho = sign * (x * x + dy * dy).sqrt();
        let theta = (sign * x).atan2(sign * dy);

        let lat = if rho == 0.0 {
            sign * std::f64::consts::FRAC_PI_2
        } else {
            let t = (rho / (self.a * self.f)).powf(1.0 / self.n);
            phi_from_t(t, self.e)?
        };
        let lon = theta / self.n + self.lon0;

        let (lon, lat) = (wrap_lon(lon) * TO_DEG, lat * TO_DEG);
        (lon.is_finite() && lat.is_finite()).then_some((lon, lat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basin_common::CrsCode;
    use basin_common::Crs;

    fn daymet() -> LambertConformal {
        match CrsCode::DaymetLcc.definition() {
            Crs::LambertConformal(p) => LambertConformal::new(&p).unwrap(),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_origin_maps_to_zero() {
        let proj = daymet();
        let (x, y) = proj.forward(-100.0, 42.5).unwrap();
        assert!(x.abs() < 1e-6, "x should be ~0, got {}", x);
        assert!(y.abs() < 1e-6, "y should be ~0, got {}", y);
    }

    #[test]
    fn test_roundtrip() {
        let proj = daymet();
        for &(lon, lat) in &[(-94.2, 36.1), (-122.4, 37.8), (-70.0, 45.0), (-100.0, 20.0)] {
            let (x, y) = proj.forward(lon, lat).unwrap();
            let (lon2, lat2) = proj.inverse(x, y).unwrap();
            assert!((lon - lon2).abs() < 1e-9, "lon roundtrip failed: {} vs {}", lon, lon2);
            assert!((lat - lat2).abs() < 1e-9, "lat roundtrip failed: {} vs {}", lat, lat2);
        }
    }

    #[test]
    fn test_east_of_meridian_is_positive_x() {
        let proj = daymet();
        let (x, _) = proj.forward(-90.0, 42.5).unwrap();
        assert!(x > 0.0);
        let (_, y) = proj.forward(-100.0, 50.0).unwrap();
        assert!(y > 0.0);
    }
}
