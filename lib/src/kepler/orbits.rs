//! Keplerian orbits.

use std::f64::consts;

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::kepler::solver::solve_eccentric_anomaly;

pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Orbit-path vertices sampled per body at load time.
pub const DEFAULT_PATH_POINTS: usize = 480;

/// Reference instant for the mean anomaly of an orbit.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Epoch {
    /// Epoch parsed from the source record.
    Absolute(OffsetDateTime),
    /// The record's epoch string was unparsable; the orbital phase is
    /// frozen at whatever instant the orbit is evaluated.
    QueryTime,
}

/// Raw orbital elements as loaded from a body record.
///
/// Angles are stored in degrees (the source convention) and converted to
/// radians where they are consumed. A missing field makes the orbit
/// unresolvable: the body still exists, but its position degrades to the
/// degenerate fallback and it contributes no path geometry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OrbitalElements {
    /// Semi-major axis (AU).
    pub semi_major_axis: Option<f64>,
    /// Eccentricity (dimensionless, `0 <= e < 1` for a closed orbit).
    pub eccentricity: Option<f64>,
    /// Inclination (degrees).
    pub inclination: Option<f64>,
    /// Longitude of the ascending node (degrees).
    pub ascending_node: Option<f64>,
    /// Argument of periapsis (degrees).
    pub arg_periapsis: Option<f64>,
    /// Orbital period (days, nonzero).
    pub period: Option<f64>,
    /// Mean anomaly at epoch (degrees).
    pub mean_anomaly: Option<f64>,
    /// Reference epoch for the mean anomaly.
    pub epoch: Option<Epoch>,
}

impl OrbitalElements {
    /// Validated view for time-indexed position solves.
    ///
    /// `None` unless all six elements plus the epoch are present and
    /// finite and the period is nonzero.
    pub fn resolved(&self) -> Option<ResolvedOrbit> {
        let period = finite(self.period)?;
        if period == 0.0 {
            return None;
        }
        Some(ResolvedOrbit {
            shape: self.shape()?,
            period,
            mean_anomaly: finite(self.mean_anomaly)?.to_radians(),
            epoch: self.epoch?,
        })
    }

    /// Validated view of the orbit geometry alone, for path sampling.
    pub fn shape(&self) -> Option<OrbitShape> {
        Some(OrbitShape {
            semi_major_axis: finite(self.semi_major_axis)?,
            eccentricity: finite(self.eccentricity)?,
            inclination: finite(self.inclination)?.to_radians(),
            ascending_node: finite(self.ascending_node)?.to_radians(),
            arg_periapsis: finite(self.arg_periapsis)?.to_radians(),
        })
    }
}

fn finite(x: Option<f64>) -> Option<f64> {
    x.filter(|v| v.is_finite())
}

/// The five geometric elements of an orbit, angles in radians.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct OrbitShape {
    /// Semi-major axis (AU).
    pub semi_major_axis: f64,
    /// Eccentricity.
    pub eccentricity: f64,
    /// Inclination (radians).
    pub inclination: f64,
    /// Longitude of the ascending node (radians).
    pub ascending_node: f64,
    /// Argument of periapsis (radians).
    pub arg_periapsis: f64,
}

impl OrbitShape {
    fn perifocal_to_reference(&self) -> Matrix3<f64> {
        let (i, lan, argpe) = (self.inclination, self.ascending_node, self.arg_periapsis);
        let m11 = libm::cos(lan) * libm::cos(argpe)
            - libm::sin(lan) * libm::sin(argpe) * libm::cos(i);
        let m12 = -libm::cos(lan) * libm::sin(argpe)
            - libm::sin(lan) * libm::cos(argpe) * libm::cos(i);
        let m13 = libm::sin(lan) * libm::sin(i);
        let m21 = libm::sin(lan) * libm::cos(argpe)
            + libm::cos(lan) * libm::sin(argpe) * libm::cos(i);
        let m22 = -libm::sin(lan) * libm::sin(argpe)
            + libm::cos(lan) * libm::cos(argpe) * libm::cos(i);
        let m23 = -libm::cos(lan) * libm::sin(i);
        let m31 = libm::sin(argpe) * libm::sin(i);
        let m32 = libm::cos(argpe) * libm::sin(i);
        let m33 = libm::cos(i);

        Matrix3::new(m11, m12, m13, m21, m22, m23, m31, m32, m33)
    }

    /// Sample the full ellipse into a polyline in the parent's frame (AU).
    ///
    /// True anomaly is swept uniformly and inclusively over `[0, 2π]`, so
    /// the first and last vertices coincide and the path closes. The
    /// radius comes from the polar ellipse equation directly; no Kepler
    /// solve is involved because this traces the shape, not a
    /// time-indexed position. Open trajectories (`e >= 1`) yield no path.
    pub fn sample_path(&self, points: usize) -> Vec<Vector3<f64>> {
        if self.eccentricity >= 1.0 || points < 2 {
            return Vec::new();
        }
        let mat = self.perifocal_to_reference();
        let semi_latus = self.semi_major_axis * (1.0 - self.eccentricity * self.eccentricity);
        (0..points)
            .map(|k| {
                let nu = k as f64 * consts::TAU / (points - 1) as f64;
                let r = semi_latus / (1.0 + self.eccentricity * libm::cos(nu));
                mat * Vector3::new(r * libm::cos(nu), r * libm::sin(nu), 0.0)
            })
            .collect()
    }
}

/// A fully-specified closed orbit, ready for a position solve.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ResolvedOrbit {
    pub shape: OrbitShape,
    /// Orbital period (days).
    pub period: f64,
    /// Mean anomaly at epoch (radians).
    pub mean_anomaly: f64,
    pub epoch: Epoch,
}

impl ResolvedOrbit {
    /// Position relative to the parent body at time `t` (AU).
    ///
    /// Pure and bit-reproducible: mean anomaly advances linearly from the
    /// epoch, the eccentric anomaly comes from the Newton solve, and the
    /// planar coordinates are rotated into the parent's frame.
    pub fn position_at(&self, t: OffsetDateTime) -> Vector3<f64> {
        let t0 = match self.epoch {
            Epoch::Absolute(t0) => t0,
            Epoch::QueryTime => t,
        };
        let delta_days = (t - t0).as_seconds_f64() / SECONDS_PER_DAY;

        // Mean motion in radians per day.
        let n = consts::TAU / self.period;
        let m = (self.mean_anomaly + n * delta_days).rem_euclid(consts::TAU);

        let e = self.shape.eccentricity;
        let ea = solve_eccentric_anomaly(m, e);
        let sin_e = libm::sin(ea);
        let cos_e = libm::cos(ea);

        let one_minus_e_sq = f64::max(0.0, 1.0 - e * e);
        let nu = libm::atan2(libm::sqrt(one_minus_e_sq) * sin_e, cos_e - e)
            .rem_euclid(consts::TAU);

        let r = self.shape.semi_major_axis * (1.0 - e * cos_e);
        let xp = r * libm::cos(nu);
        let yp = r * libm::sin(nu);

        self.shape.perifocal_to_reference() * Vector3::new(xp, yp, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts;

    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use time::{Date, Duration, Month};

    use super::{Epoch, OrbitShape, OrbitalElements};

    fn epoch_2017() -> time::OffsetDateTime {
        Date::from_calendar_date(2017, Month::January, 1)
            .unwrap()
            .midnight()
            .assume_utc()
    }

    fn elements(a: f64, e: f64, m0_deg: f64, period: f64) -> OrbitalElements {
        OrbitalElements {
            semi_major_axis: Some(a),
            eccentricity: Some(e),
            inclination: Some(0.0),
            ascending_node: Some(0.0),
            arg_periapsis: Some(0.0),
            period: Some(period),
            mean_anomaly: Some(m0_deg),
            epoch: Some(Epoch::Absolute(epoch_2017())),
        }
    }

    #[test]
    fn circular_orbit_magnitude_is_semi_major_axis() {
        let orbit = elements(1.5, 0.0, 73.0, 365.25).resolved().unwrap();
        for days in [0, 17, 100, 4000] {
            let pos = orbit.position_at(epoch_2017() + Duration::days(days));
            assert_relative_eq!(pos.norm(), 1.5, max_relative = 1e-9);
        }
    }

    #[test]
    fn position_at_epoch_recovers_mean_anomaly() {
        // With e = 0 and no orientation angles the position angle at t0 is
        // the mean anomaly itself.
        let orbit = elements(2.0, 0.0, 45.0, 687.0).resolved().unwrap();
        let pos = orbit.position_at(epoch_2017());
        let angle = pos.y.atan2(pos.x).rem_euclid(consts::TAU);
        assert_relative_eq!(angle, 45.0f64.to_radians(), max_relative = 1e-9);
    }

    #[test]
    fn elliptic_radius_matches_polar_equation_at_epoch() {
        let a = 1.3;
        let e = 0.4;
        let orbit = elements(a, e, 120.0, 500.0).resolved().unwrap();
        let pos = orbit.position_at(epoch_2017());
        // Orientation angles are zero, so the true anomaly can be read off
        // the planar coordinates and fed back through the ellipse equation.
        let nu = pos.y.atan2(pos.x);
        let expected = a * (1.0 - e * e) / (1.0 + e * nu.cos());
        assert_relative_eq!(pos.norm(), expected, max_relative = 1e-9);
    }

    #[test]
    fn position_repeats_after_one_period() {
        let orbit = elements(1.0, 0.21, 333.0, 365.25).resolved().unwrap();
        let p0 = orbit.position_at(epoch_2017());
        let p1 = orbit.position_at(epoch_2017() + Duration::seconds_f64(365.25 * 86_400.0));
        assert_abs_diff_eq!((p1 - p0).norm(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn query_time_epoch_freezes_the_phase() {
        let mut el = elements(1.0, 0.1, 200.0, 100.0);
        el.epoch = Some(Epoch::QueryTime);
        let orbit = el.resolved().unwrap();
        let p0 = orbit.position_at(epoch_2017());
        let p1 = orbit.position_at(epoch_2017() + Duration::days(4321));
        assert_eq!(p0, p1);
    }

    #[test]
    fn unresolvable_when_a_field_is_missing_or_absurd() {
        let mut el = elements(1.0, 0.1, 0.0, 365.25);
        el.inclination = None;
        assert!(el.resolved().is_none());
        assert!(el.shape().is_none());

        let mut el = elements(1.0, 0.1, 0.0, 365.25);
        el.period = Some(0.0);
        assert!(el.resolved().is_none());
        // The geometry is still fine without a period.
        assert!(el.shape().is_some());

        let mut el = elements(1.0, 0.1, 0.0, 365.25);
        el.eccentricity = Some(f64::NAN);
        assert!(el.resolved().is_none());
    }

    #[test]
    fn path_sampling_rejects_open_trajectories() {
        for e in [1.0, 1.5, 20.0] {
            let mut el = elements(1.0, e, 0.0, 365.25);
            el.eccentricity = Some(e);
            assert!(el.shape().unwrap().sample_path(128).is_empty());
        }
    }

    #[test]
    fn path_sampling_is_closed_and_exact_in_count() {
        let shape = elements(2.5, 0.6, 0.0, 1.0).shape().unwrap();
        let path = shape.sample_path(300);
        assert_eq!(path.len(), 300);
        assert_abs_diff_eq!((path[0] - path[299]).norm(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn circular_path_stays_on_the_sphere() {
        let shape = OrbitShape {
            semi_major_axis: 3.0,
            eccentricity: 0.0,
            inclination: 45.0f64.to_radians(),
            ascending_node: 80.0f64.to_radians(),
            arg_periapsis: 12.0f64.to_radians(),
        };
        for p in shape.sample_path(64) {
            assert_relative_eq!(p.norm(), 3.0, max_relative = 1e-9);
        }
    }

    #[test]
    fn ninety_degree_inclination_tilts_the_plane() {
        let shape = OrbitShape {
            semi_major_axis: 1.0,
            eccentricity: 0.0,
            inclination: consts::FRAC_PI_2,
            ascending_node: 0.0,
            arg_periapsis: 0.0,
        };
        // With the node on the x-axis a polar orbit has no y-extent.
        for p in shape.sample_path(90) {
            assert_abs_diff_eq!(p.y, 0.0, epsilon = 1e-9);
        }
    }
}
