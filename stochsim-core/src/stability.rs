//! Upfront stability gates for the explicit schemes.
//!
//! Both checks run before any field is allocated; a rejection carries the
//! computed ratio and the threshold it exceeded.

use tracing::{debug, warn};

use crate::error::{Scheme, SimError};

pub const HEAT_LIMIT: f64 = 0.5;
pub const CFL_LIMIT: f64 = 1.0;
/// Heuristic bound for the 2-D five-point diffusion stencil; advisory only.
pub const DIFFUSIVE_HEURISTIC: f64 = 0.25;

/// `alpha * dt / dx^2`
pub fn diffusion_number(alpha: f64, dt: f64, dx: f64) -> f64 {
    alpha * dt / (dx * dx)
}

/// `c * dt / dx`
pub fn cfl_number(c: f64, dt: f64, dx: f64) -> f64 {
    c * dt / dx
}

/// Returns the diffusion number when it is within the explicit bound.
pub fn check_heat(alpha: f64, dt: f64, dx: f64) -> Result<f64, SimError> {
    let r = diffusion_number(alpha, dt, dx);
    gate(Scheme::Heat, r, HEAT_LIMIT)
}

/// Returns the CFL number when it is within the leapfrog bound.
pub fn check_wave(c: f64, dt: f64, dx: f64) -> Result<f64, SimError> {
    let cfl = cfl_number(c, dt, dx);
    gate(Scheme::Wave, cfl, CFL_LIMIT)
}

/// Largest per-species diffusion number of the reaction-diffusion system.
///
/// Never rejects; warns when past [`DIFFUSIVE_HEURISTIC`] since the run may
/// then trip the finiteness check.
pub fn advise_reaction(du: f64, dv: f64, dt: f64, dx: f64) -> f64 {
    let r = diffusion_number(du.max(dv), dt, dx);
    if r > DIFFUSIVE_HEURISTIC {
        warn!(
            ratio = r,
            limit = DIFFUSIVE_HEURISTIC,
            "reaction-diffusion parameters exceed the diffusive heuristic; run may diverge"
        );
    }
    r
}

fn gate(scheme: Scheme, ratio: f64, limit: f64) -> Result<f64, SimError> {
    // NaN compares false, so reject anything not provably within the limit
    if ratio <= limit {
        debug!(%scheme, ratio, limit, "stability check passed");
        Ok(ratio)
    } else {
        Err(SimError::Unstable {
            scheme,
            ratio,
            limit,
        })
    }
}
