//! The body forest and per-tick position composition.

use std::collections::HashMap;

use nalgebra::Vector3;
use time::OffsetDateTime;
use tracing::debug;

use crate::bodies::{Body, BodyId, Resolution};
use crate::kepler::orbits::OrbitalElements;

/// Reference-plane radius used when a system gives no size hint (AU).
pub const DEFAULT_PLANE_RADIUS_AU: f64 = 50.0;

/// The composed body forest of one loaded system.
///
/// Built in bulk when a system loads and replaced wholesale when another
/// one does; individual bodies are never added or removed. The traversal
/// order is fixed at build time: ascending depth, so every parent is
/// composed before any of its children.
#[derive(Clone, Debug)]
pub struct SystemMap {
    bodies: Vec<Body>,
    index: HashMap<BodyId, usize>,
    /// Body indices in ascending-depth order.
    traversal: Vec<usize>,
    root: Option<BodyId>,
    plane_radius: f64,
    focus: Option<BodyId>,
    focus_offset: Vector3<f64>,
}

impl Default for SystemMap {
    fn default() -> Self {
        Self::new(Vec::new(), None, DEFAULT_PLANE_RADIUS_AU)
    }
}

impl SystemMap {
    pub fn new(bodies: Vec<Body>, root: Option<BodyId>, plane_radius: f64) -> Self {
        let index = bodies
            .iter()
            .enumerate()
            .map(|(ix, b)| (b.id, ix))
            .collect();
        let mut traversal: Vec<usize> = (0..bodies.len()).collect();
        traversal.sort_by_key(|&ix| bodies[ix].depth);
        debug!(
            bodies = bodies.len(),
            plane_radius, "composed system traversal order"
        );
        Self {
            bodies,
            index,
            traversal,
            root,
            plane_radius: if plane_radius > 0.0 {
                plane_radius
            } else {
                DEFAULT_PLANE_RADIUS_AU
            },
            focus: None,
            focus_offset: Vector3::zeros(),
        }
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn get(&self, id: BodyId) -> Option<&Body> {
        self.index.get(&id).map(|&ix| &self.bodies[ix])
    }

    /// The designated root star; `None` only for an empty map.
    pub fn root(&self) -> Option<BodyId> {
        self.root
    }

    pub fn plane_radius(&self) -> f64 {
        self.plane_radius
    }

    pub fn focus(&self) -> Option<BodyId> {
        self.focus
    }

    /// Designate the body every position is re-based against, or `None`
    /// to return to the system origin. Takes effect on the next tick.
    pub fn set_focus(&mut self, focus: Option<BodyId>) {
        self.focus = focus;
    }

    /// The vector subtracted from every position during the last tick's
    /// re-basing; zero when no focus body is set.
    pub fn focus_offset(&self) -> Vector3<f64> {
        self.focus_offset
    }

    /// Recompute every body position for the instant `t`.
    ///
    /// Always a full recompute from the current orbital phase; there is no
    /// incremental update to drift. Bodies with unresolvable elements get
    /// the degenerate stand-in and never block their descendants. Focus
    /// re-basing happens in a second pass only after every absolute
    /// position is known.
    pub fn tick(&mut self, t: OffsetDateTime) {
        let mut absolute: HashMap<BodyId, Vector3<f64>> =
            HashMap::with_capacity(self.bodies.len());

        for &ix in &self.traversal {
            let body = &self.bodies[ix];
            let (local, resolution) = match body.elements.resolved() {
                Some(orbit) => (orbit.position_at(t), Resolution::Resolved),
                None => (degenerate_offset(&body.elements), Resolution::Degenerate),
            };
            let parent_pos = body
                .parent
                .and_then(|p| absolute.get(&p).copied())
                .unwrap_or_else(Vector3::zeros);
            let position = local + parent_pos;
            absolute.insert(body.id, position);

            let body = &mut self.bodies[ix];
            body.local_position = local;
            body.absolute_position = position;
            body.parent_offset = parent_pos;
            body.resolution = resolution;
        }

        self.focus_offset = self
            .focus
            .and_then(|f| absolute.get(&f).copied())
            .unwrap_or_else(Vector3::zeros);
        if self.focus.is_some() {
            let offset = self.focus_offset;
            for body in &mut self.bodies {
                body.absolute_position -= offset;
                body.parent_offset -= offset;
            }
        }
    }
}

/// The stand-in position for a body whose elements do not resolve: half
/// the semi-major axis along +X, or the origin when even that is missing.
/// A visual placeholder, not a physical location.
fn degenerate_offset(elements: &OrbitalElements) -> Vector3<f64> {
    let sma = elements
        .semi_major_axis
        .filter(|a| a.is_finite())
        .unwrap_or(0.0);
    Vector3::new(sma * 0.5, 0.0, 0.0)
}
