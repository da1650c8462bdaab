//! The simulated-calendar clock and its acceleration control.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// Years added to wall-clock UTC to reach the simulated calendar.
pub const SIM_YEAR_OFFSET: i32 = 1286;
/// Control inputs below this magnitude mean real time, exactly.
pub const CONTROL_DEADZONE: f64 = 0.05;
/// Steepness of the control curve; higher gives finer control near zero.
const CONTROL_EXPONENT: i32 = 5;
/// Acceleration at full control deflection.
pub const MAX_ACCELERATION: f64 = 1.0e7;

/// Map a wall-clock UTC instant onto the simulated calendar.
///
/// A leap-day source date that lands on a non-leap target year clamps the
/// day-of-month to the 28th.
pub fn sim_epoch_from(utc: OffsetDateTime) -> OffsetDateTime {
    let year = utc.year() + SIM_YEAR_OFFSET;
    utc.replace_year(year).unwrap_or_else(|_| {
        utc.replace_day(28)
            .and_then(|d| d.replace_year(year))
            .unwrap_or(utc)
    })
}

/// Acceleration factor for a normalized control input `u` in `[-1, 1]`.
/// Antisymmetric, zero inside the deadzone.
pub fn acceleration_from_control(u: f64) -> f64 {
    if u.abs() < CONTROL_DEADZONE {
        0.0
    } else {
        u.signum() * u.abs().powi(CONTROL_EXPONENT) * MAX_ACCELERATION
    }
}

/// The simulation clock: an absolute simulated instant plus the current
/// acceleration factor. No hidden state; advancing is a pure function of
/// the frame delta and the control curve.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimClock {
    /// Current simulated instant.
    pub current: OffsetDateTime,
    acceleration: f64,
}

impl SimClock {
    /// A clock starting at the simulated image of the current wall clock.
    pub fn now() -> Self {
        Self::starting_at(sim_epoch_from(OffsetDateTime::now_utc()))
    }

    pub fn starting_at(current: OffsetDateTime) -> Self {
        Self {
            current,
            acceleration: 0.0,
        }
    }

    pub fn set_control(&mut self, u: f64) {
        self.acceleration = acceleration_from_control(u);
    }

    pub fn acceleration(&self) -> f64 {
        self.acceleration
    }

    /// Advance by one rendered frame of `frame_dt_seconds` wall time.
    /// Saturates at the calendar limits rather than overflowing.
    pub fn advance(&mut self, frame_dt_seconds: f64) {
        let dt = if self.acceleration == 0.0 {
            frame_dt_seconds
        } else {
            frame_dt_seconds * (1.0 + self.acceleration)
        };
        self.current = self
            .current
            .checked_add(Duration::seconds_f64(dt))
            .unwrap_or(self.current);
    }

    /// Snap back to the simulated image of the current wall clock.
    pub fn reset(&mut self) {
        self.current = sim_epoch_from(OffsetDateTime::now_utc());
    }
}
