//! Two-impulse transfer arithmetic between circular coplanar orbits.
//! Radii in metres, times in seconds, angles in degrees.

use crate::utils::normalize_degrees;
use std::f64::consts::PI;

/// Circular orbit period for radius `r` around a body with parameter `mu`
pub fn orbital_period(r: f64, mu: f64) -> f64 {
    2.0 * PI * (r.powi(3) / mu).sqrt()
}

/// Delta-v of the departure burn from radius `r1` into a transfer ellipse reaching `r2`
pub fn departure_delta_v(r1: f64, r2: f64, mu: f64) -> f64 {
    (mu / r1).sqrt() * ((2.0 * r2 / (r1 + r2)).sqrt() - 1.0)
}

/// Time of flight along half the transfer ellipse
pub fn transfer_time(r1: f64, r2: f64, mu: f64) -> f64 {
    PI * ((r1 + r2).powi(3) / (8.0 * mu)).sqrt()
}

/// Lead angle the target must have at departure to meet the vessel at apoapsis
pub fn phase_angle(r1: f64, r2: f64, mu: f64) -> f64 {
    let flight = transfer_time(r1, r2, mu);
    180.0 - flight / orbital_period(r2, mu) * 360.0
}

/// Seconds until the current phase angle closes to `required`.
/// The vessel's inner orbit gains on the target at the synodic rate.
pub fn time_to_ignition(current: f64, required: f64, vessel_period: f64, target_period: f64) -> Option<f64> {
    let closing_rate = 360.0 / vessel_period - 360.0 / target_period; // deg/s
    if !closing_rate.is_finite() || closing_rate <= 0.0 {
        return None;
    }
    let gap = normalize_degrees(current - required);
    Some(gap / closing_rate)
}

/// Plan of a transfer burn
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferPlan {
    pub delta_v: f64,
    pub transfer_time: f64,
    pub phase_angle: f64,
}

pub fn hohmann(r1: f64, r2: f64, mu: f64) -> TransferPlan {
    TransferPlan {
        delta_v: departure_delta_v(r1, r2, mu),
        transfer_time: transfer_time(r1, r2, mu),
        phase_angle: phase_angle(r1, r2, mu),
    }
}
