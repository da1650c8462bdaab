//! Newton-Raphson solution of Kepler's equation.

use std::f64::consts;

/// Convergence tolerance on the Newton step (radians).
const TOLERANCE: f64 = 1e-9;
/// Iteration cap; the last iterate is returned if it is reached.
const MAX_ITERATIONS: u32 = 100;
/// Below this `|f'(E)|` the step is abandoned to avoid division blow-up.
const DERIVATIVE_FLOOR: f64 = 1e-10;

/// Solve `M = E - e*sin(E)` for the eccentric anomaly `E` (radians).
///
/// `mean_anomaly` may be any real angle but callers normally pre-normalize
/// it to `[0, 2π)`; `eccentricity` must be in `[0, 1)` for a closed orbit.
///
/// The function is total: it always returns a finite angle. When the
/// derivative underflows near `e ≈ 1` the best iterate so far is returned
/// and callers must treat the result as approximate.
pub fn solve_eccentric_anomaly(mean_anomaly: f64, eccentricity: f64) -> f64 {
    // E = M is a good starter at low eccentricity; π keeps the iteration
    // convergent for near-parabolic orbits.
    let mut ea = if eccentricity < 0.8 {
        mean_anomaly
    } else {
        consts::PI
    };

    for _ in 0..MAX_ITERATIONS {
        let f = ea - eccentricity * libm::sin(ea) - mean_anomaly;
        let fp = 1.0 - eccentricity * libm::cos(ea);

        if libm::fabs(fp) < DERIVATIVE_FLOOR {
            break;
        }

        let delta = f / fp;
        ea -= delta;

        if libm::fabs(delta) < TOLERANCE {
            break;
        }
    }

    ea
}
