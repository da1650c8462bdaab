//! World-to-screen transform: the fixed axis remap, the two-axis view
//! rotation, the perspective projection with its clamped screen range, and
//! painter's-algorithm depth ordering.

use std::cmp::Reverse;

use nalgebra::{Matrix3, Vector3};
use ordered_float::OrderedFloat;

/// Screen coordinates are clamped to this range before they reach the
/// drawing layer, which cannot survive unbounded or non-finite values.
pub const COORD_MIN: i32 = -32_760;
pub const COORD_MAX: i32 = 32_760;

/// Guard against a perspective divisor of exactly zero.
const DIVISOR_EPSILON: f64 = 1e-6;
/// Perspective factor substituted for points at or behind the camera plane.
const PERSPECTIVE_FLOOR: f64 = 1e-4;

/// Camera distance term of the perspective divisor.
pub const CAMERA_DISTANCE_OFFSET: f64 = 50.0;
/// Perspective strength for body sprites and orbit paths.
pub const BODY_PERSPECTIVE_STRENGTH: f64 = 0.005;
/// Weaker strength for the wide reference plane.
pub const PLANE_PERSPECTIVE_STRENGTH: f64 = 0.001;
/// Stronger strength for the short axis lines.
pub const AXIS_PERSPECTIVE_STRENGTH: f64 = 0.01;

/// Nominal projection scale the initial-zoom fit is computed against.
const FIT_REFERENCE_SCALE: f64 = 20.0;

pub const MIN_ZOOM: f64 = 0.01;
const ZOOM_STEP: f64 = 1.1;
const PITCH_LIMIT_DEG: f64 = 89.0;
const DRAG_DEGREES_PER_PIXEL: f64 = 0.5;

/// Remap storage axes to the display convention: storage-Z becomes
/// screen-up and storage-Y becomes screen-depth. Applied to every point
/// once, before the camera rotation.
pub fn world_from_sim(v: Vector3<f64>) -> Vector3<f64> {
    Vector3::new(v.x, -v.z, v.y)
}

/// View state: two independent rotation angles, zoom, and a screen-space
/// pan applied after projection.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Camera {
    /// Pitch (degrees), clamped to ±89 so the view never flips over.
    pub rotation_x: f64,
    /// Yaw (degrees).
    pub rotation_y: f64,
    pub zoom: f64,
    pub pan_x: f64,
    pub pan_y: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            rotation_x: 0.0,
            rotation_y: 0.0,
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }
}

impl Camera {
    /// Rotate a world-space point into camera space: pitch about the
    /// screen-horizontal axis first, then yaw about the vertical. The
    /// order is what makes a vertical drag pitch and a horizontal drag
    /// yaw; swapping it changes the drag feel entirely.
    pub fn rotate(&self, v: Vector3<f64>) -> Vector3<f64> {
        let rx = self.rotation_x.to_radians();
        let ry = self.rotation_y.to_radians();
        let pitch = Matrix3::new(
            1.0,
            0.0,
            0.0,
            0.0,
            libm::cos(rx),
            -libm::sin(rx),
            0.0,
            libm::sin(rx),
            libm::cos(rx),
        );
        let yaw = Matrix3::new(
            libm::cos(ry),
            0.0,
            libm::sin(ry),
            0.0,
            1.0,
            0.0,
            -libm::sin(ry),
            0.0,
            libm::cos(ry),
        );
        yaw * (pitch * v)
    }

    /// Apply a mouse drag in pixels.
    pub fn drag_rotate(&mut self, dx: f64, dy: f64) {
        self.rotation_y += dx * DRAG_DEGREES_PER_PIXEL;
        self.rotation_x = (self.rotation_x - dy * DRAG_DEGREES_PER_PIXEL)
            .clamp(-PITCH_LIMIT_DEG, PITCH_LIMIT_DEG);
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    pub fn zoom_in(&mut self) {
        self.zoom *= ZOOM_STEP;
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / ZOOM_STEP).max(MIN_ZOOM);
    }

    /// Initial zoom that frames a reference plane of the given radius in a
    /// viewport of the given pixel size.
    pub fn fit_to_plane(&mut self, plane_radius_au: f64, viewport: (f64, f64)) {
        if plane_radius_au > 0.0 {
            let target = f64::min(viewport.0, viewport.1) * 10.0;
            let denominator = plane_radius_au * FIT_REFERENCE_SCALE;
            self.zoom = if denominator == 0.0 {
                1.0
            } else {
                (target * CAMERA_DISTANCE_OFFSET) / denominator
            };
            self.zoom = self.zoom.max(MIN_ZOOM);
        } else {
            self.zoom = 0.1;
        }
    }

    /// Back to the default orientation; the zoom is refit by the caller.
    pub fn reset_orientation(&mut self) {
        self.rotation_x = 0.0;
        self.rotation_y = 0.0;
        self.pan_x = 0.0;
        self.pan_y = 0.0;
    }
}

/// One projected point: clamped integer screen coordinates plus the
/// perspective factor, which callers reuse for sprite scaling.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
    pub perspective: f64,
}

/// Perspective projection of camera-space points onto the screen.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Projection {
    /// Screen center the projected offsets are added to (px).
    pub center: (f64, f64),
    /// Zoom scale applied to the projected offsets.
    pub scale: f64,
    /// Distance term of the perspective divisor.
    pub distance_offset: f64,
    /// Perspective strength; larger exaggerates depth.
    pub strength: f64,
}

impl Projection {
    pub fn project(&self, v: Vector3<f64>) -> ScreenPoint {
        let divisor = v.z * self.strength + self.distance_offset + DIVISOR_EPSILON;
        let perspective = if divisor <= DIVISOR_EPSILON {
            PERSPECTIVE_FLOOR
        } else {
            1.0 / divisor
        };
        let sx = self.center.0 + v.x * self.scale * perspective;
        let sy = self.center.1 + v.y * self.scale * perspective;
        ScreenPoint {
            x: clamp_coord(sx),
            y: clamp_coord(sy),
            perspective,
        }
    }
}

/// Clamp to the safe drawing range; non-finite values land on the extreme
/// matching their sign.
fn clamp_coord(v: f64) -> i32 {
    if v.is_finite() {
        v.clamp(f64::from(COORD_MIN), f64::from(COORD_MAX)) as i32
    } else if v > 0.0 {
        COORD_MAX
    } else {
        COORD_MIN
    }
}

/// Sprite radius under perspective, floored at one pixel.
pub fn sprite_radius(radius_px: f64, perspective: f64) -> f64 {
    f64::max(1.0, (radius_px * libm::sqrt(perspective)).trunc())
}

/// A drawable and its representative camera-space depth: a body uses its
/// own depth, a path the mean depth of its samples.
#[derive(Clone, Debug)]
pub struct Drawable<T> {
    pub item: T,
    pub depth: f64,
}

/// Mean camera-space depth of a point run; zero for an empty run.
pub fn mean_depth(points: &[Vector3<f64>]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    points.iter().map(|p| p.z).sum::<f64>() / points.len() as f64
}

/// Painter's algorithm: farthest drawables first. The sort is the sole
/// occlusion mechanism; there is no depth buffer downstream.
pub fn sort_back_to_front<T>(drawables: &mut [Drawable<T>]) {
    drawables.sort_by_key(|d| Reverse(OrderedFloat(d.depth)));
}

#[cfg(test)]
mod tests {
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use nalgebra::Vector3;

    use super::{
        mean_depth, sort_back_to_front, sprite_radius, world_from_sim, Camera, Drawable,
        Projection, COORD_MAX, COORD_MIN,
    };

    fn projection() -> Projection {
        Projection {
            center: (700.0, 400.0),
            scale: 20.0,
            distance_offset: 50.0,
            strength: 0.005,
        }
    }

    #[test]
    fn axis_remap_swaps_up_and_depth() {
        let v = world_from_sim(Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(v, Vector3::new(1.0, -3.0, 2.0));
    }

    #[test]
    fn pitch_is_applied_before_yaw() {
        let camera = Camera {
            rotation_x: 90.0,
            rotation_y: 90.0,
            ..Camera::default()
        };
        // Pitch takes +Y to +Z, then yaw takes +Z to +X. In the other
        // order the same point would stay on +Z.
        let v = camera.rotate(Vector3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(v.x, 1.0, max_relative = 1e-12);
        assert_abs_diff_eq!(v.y, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn yaw_rotates_about_the_vertical() {
        let camera = Camera {
            rotation_y: 90.0,
            ..Camera::default()
        };
        let v = camera.rotate(Vector3::new(1.0, 0.0, 0.0));
        assert_abs_diff_eq!(v.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(v.z, -1.0, max_relative = 1e-12);
    }

    #[test]
    fn pitch_clamps_at_the_pole() {
        let mut camera = Camera::default();
        camera.drag_rotate(0.0, -1000.0);
        assert_eq!(camera.rotation_x, 89.0);
        camera.drag_rotate(0.0, 5000.0);
        assert_eq!(camera.rotation_x, -89.0);
    }

    #[test]
    fn origin_projects_to_the_screen_center() {
        let p = projection().project(Vector3::zeros());
        assert_eq!((p.x, p.y), (700, 400));
        assert_relative_eq!(p.perspective, 1.0 / (50.0 + 1e-6), max_relative = 1e-12);
    }

    #[test]
    fn behind_camera_divisor_is_floored() {
        // z * 0.005 = -50 cancels the distance offset exactly.
        let p = projection().project(Vector3::new(1.0, 1.0, -10_000.0));
        assert_eq!(p.perspective, 1e-4);
    }

    #[test]
    fn huge_coordinates_clamp_to_the_safe_range() {
        let p = projection().project(Vector3::new(1e12, -1e12, 0.0));
        assert_eq!(p.x, COORD_MAX);
        assert_eq!(p.y, COORD_MIN);
    }

    #[test]
    fn non_finite_coordinates_clamp_with_their_sign() {
        let p = projection().project(Vector3::new(f64::INFINITY, f64::NEG_INFINITY, 0.0));
        assert_eq!(p.x, COORD_MAX);
        assert_eq!(p.y, COORD_MIN);
        // NaN has no sign and lands on the low extreme.
        let p = projection().project(Vector3::new(f64::NAN, 0.0, 0.0));
        assert_eq!(p.x, COORD_MIN);
    }

    #[test]
    fn depth_sort_is_back_to_front() {
        let mut drawables: Vec<Drawable<&str>> = vec![
            Drawable {
                item: "mid",
                depth: 5.0,
            },
            Drawable {
                item: "near",
                depth: -3.0,
            },
            Drawable {
                item: "far",
                depth: 0.0,
            },
        ];
        sort_back_to_front(&mut drawables);
        let depths: Vec<f64> = drawables.iter().map(|d| d.depth).collect();
        assert_eq!(depths, vec![5.0, 0.0, -3.0]);
    }

    #[test]
    fn path_depth_is_the_sample_mean() {
        let points = [
            Vector3::new(0.0, 0.0, 2.0),
            Vector3::new(0.0, 0.0, 4.0),
            Vector3::new(0.0, 0.0, 9.0),
        ];
        assert_relative_eq!(mean_depth(&points), 5.0, max_relative = 1e-12);
        assert_eq!(mean_depth(&[]), 0.0);
    }

    #[test]
    fn sprite_radius_never_vanishes() {
        assert_eq!(sprite_radius(8.0, 1e-12), 1.0);
        assert_eq!(sprite_radius(20.0, 0.04), 4.0);
    }

    #[test]
    fn initial_zoom_fits_the_reference_plane() {
        let mut camera = Camera::default();
        camera.fit_to_plane(50.0, (1400.0, 800.0));
        // min(1400, 800) * 10 * 50 / (50 * 20)
        assert_relative_eq!(camera.zoom, 400.0, max_relative = 1e-12);
        camera.fit_to_plane(0.0, (1400.0, 800.0));
        assert_eq!(camera.zoom, 0.1);
    }
}
