//! Ellipsoid helpers shared by the conic projections (Snyder, USGS PP 1395).

use std::f64::consts::PI;

pub(crate) const TO_RAD: f64 = PI / 180.0;
pub(crate) const TO_DEG: f64 = 180.0 / PI;

/// Normalize a longitude difference to [-π, π].
pub(crate) fn wrap_lon(mut dlon: f64) -> f64 {
    while dlon > PI {
        dlon -= 2.0 * PI;
    }
    while dlon < -PI {
        dlon += 2.0 * PI;
    }
    dlon
}

/// Snyder eq. 14-15: m = cos φ / sqrt(1 - e² sin² φ)
pub(crate) fn msfn(phi: f64, e: f64) -> f64 {
    let s = e * phi.sin();
    phi.cos() / (1.0 - s * s).sqrt()
}

/// Snyder eq. 15-9: t = tan(π/4 - φ/2) / ((1 - e sin φ) / (1 + e sin φ))^(e/2)
pub(crate) fn tsfn(phi: f64, e: f64) -> f64 {
    let s = e * phi.sin();
    (PI / 4.0 - phi / 2.0).tan() / ((1.0 - s) / (1.0 + s)).powf(e / 2.0)
}

/// Snyder eq. 3-12: authalic q for the given latitude.
pub(crate) fn qsfn(phi: f64, e: f64) -> f64 {
    let sin_phi = phi.sin();
    if e < 1e-12 {
        return 2.0 * sin_phi;
    }
    let s = e * sin_phi;
    (1.0 - e * e) * (sin_phi / (1.0 - s * s) - (1.0 / (2.0 * e)) * ((1.0 - s) / (1.0 + s)).ln())
}

/// Latitude from the conformal t value (Snyder eq. 7-9, iterated).
pub(crate) fn phi_from_t(t: f64, e: f64) -> Option<f64> {
    let mut phi = PI / 2.0 - 2.0 * t.atan();
    for _ in 0..15 {
        let s = e * phi.sin();
        let next = PI / 2.0 - 2.0 * (t * ((1.0 - s) / (1.0 + s)).powf(e / 2.0)).atan();
        if (next - phi).abs() < 1e-12 {
            return Some(next);
        }
        phi = next;
    }
    phi.is_finite().then_some(phi)
}

/// Latitude from the authalic q value (Snyder eq. 14-19, iterated).
pub(crate) fn phi_from_q(q: f64, e: f64) -> Option<f64> {
    let ratio = (q / 2.0).clamp(-1.0, 1.0);
    let mut phi = ratio.asin();
    if e < 1e-12 {
        return Some(phi);
    }
    let es = e * e;
    for _ in 0..25 {
        let sin_phi = phi.sin();
        let cos_phi = phi.cos();
        if cos_phi.abs() < 1e-12 {
            return Some(phi);
        }
        let s = e * sin_phi;
        let one_minus = 1.0 - s * s;
        let delta = one_minus * one_minus / (2.0 * cos_phi)
            * (q / (1.0 - es) - sin_phi / one_minus + (1.0 / (2.0 * e)) * ((1.0 - s) / (1.0 + s)).ln());
        phi += delta;
        if delta.abs() < 1e-12 {
            return Some(phi);
        }
    }
    phi.is_finite().then_some(phi)
}
