//! Viewer configuration.

use std::fs;

use orrery::{
    camera::{BODY_PERSPECTIVE_STRENGTH, CAMERA_DISTANCE_OFFSET},
    kepler::orbits::DEFAULT_PATH_POINTS,
};
use serde::Deserialize;
use tracing::warn;

const CONFIG_FILE: &str = "orrery.toml";

/// Overrides loaded from `orrery.toml` in the working directory. Every
/// field is optional and a missing or malformed file falls back to the
/// compiled-in defaults.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub window_width: f32,
    pub window_height: f32,
    /// Vertices sampled per orbit path at load time.
    pub orbit_path_points: usize,
    pub perspective_strength: f64,
    pub camera_distance_offset: f64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window_width: 1400.0,
            window_height: 800.0,
            orbit_path_points: DEFAULT_PATH_POINTS,
            perspective_strength: BODY_PERSPECTIVE_STRENGTH,
            camera_distance_offset: CAMERA_DISTANCE_OFFSET,
        }
    }
}

impl ViewerConfig {
    pub fn load() -> Self {
        match fs::read_to_string(CONFIG_FILE) {
            Ok(raw) => toml::from_str(&raw).unwrap_or_else(|e| {
                warn!("ignoring malformed {CONFIG_FILE}: {e}");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }
}
