//! Definitions of celestial bodies.

use std::sync::Arc;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::kepler::orbits::OrbitalElements;

/// Base on-screen radius of a one-solar-radius star (px).
pub const STAR_BASE_RADIUS_PX: f64 = 20.0;
/// Fixed anchor size for barycentres (px).
pub const BARYCENTRE_RADIUS_PX: f64 = 3.0;
/// Pixel bounds for generic bodies.
pub const MIN_BODY_RADIUS_PX: f64 = 2.0;
pub const MAX_BODY_RADIUS_PX: f64 = 8.0;
/// Linear km-to-px factor applied before clamping.
pub const BODY_RADIUS_SCALE: f64 = 1000.0;

/// Identifier of a body within its system, from the source record.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct BodyId(pub i64);

/// Closed classification of body types.
///
/// Source records carry free-form type and subtype labels; anything the
/// enumeration does not know collapses into `Unclassified` instead of
/// falling through string comparisons.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyClass {
    Star,
    RockyBody,
    MetalRichBody,
    HighMetalContentWorld,
    EarthLikeWorld,
    IcyBody,
    ClassIGasGiant,
    ClassIIGasGiant,
    GasGiantWaterLife,
    GasGiantAmmoniaLife,
    HeliumRichGasGiant,
    WaterWorld,
    AmmoniaWorld,
    RockyIceWorld,
    Barycentre,
    Unclassified,
}

impl BodyClass {
    /// Classify a record from its type and subtype labels. The subtype is
    /// the more specific of the two and wins for non-stellar bodies.
    pub fn classify(body_type: Option<&str>, sub_type: Option<&str>) -> Self {
        match body_type {
            Some("Star") => return BodyClass::Star,
            Some("Barycentre") => return BodyClass::Barycentre,
            _ => {}
        }
        Self::from_label(sub_type.or(body_type).unwrap_or(""))
    }

    pub fn from_label(label: &str) -> Self {
        match label {
            "Star" => BodyClass::Star,
            "Rocky body" => BodyClass::RockyBody,
            "Metal-rich body" => BodyClass::MetalRichBody,
            "High metal content world" => BodyClass::HighMetalContentWorld,
            "Earth-like world" => BodyClass::EarthLikeWorld,
            "Icy body" => BodyClass::IcyBody,
            "Class I gas giant" => BodyClass::ClassIGasGiant,
            "Class II gas giant" => BodyClass::ClassIIGasGiant,
            "Gas giant with water-based life" => BodyClass::GasGiantWaterLife,
            "Gas giant with ammonia-based life" => BodyClass::GasGiantAmmoniaLife,
            "Helium-rich gas giant" => BodyClass::HeliumRichGasGiant,
            "Water world" => BodyClass::WaterWorld,
            "Ammonia world" => BodyClass::AmmoniaWorld,
            "Rocky ice world" => BodyClass::RockyIceWorld,
            "Barycentre" => BodyClass::Barycentre,
            _ => BodyClass::Unclassified,
        }
    }

    /// Display label for the overlay.
    pub fn label(self) -> &'static str {
        match self {
            BodyClass::Star => "Star",
            BodyClass::RockyBody => "Rocky body",
            BodyClass::MetalRichBody => "Metal-rich body",
            BodyClass::HighMetalContentWorld => "High metal content world",
            BodyClass::EarthLikeWorld => "Earth-like world",
            BodyClass::IcyBody => "Icy body",
            BodyClass::ClassIGasGiant => "Class I gas giant",
            BodyClass::ClassIIGasGiant => "Class II gas giant",
            BodyClass::GasGiantWaterLife => "Gas giant with water-based life",
            BodyClass::GasGiantAmmoniaLife => "Gas giant with ammonia-based life",
            BodyClass::HeliumRichGasGiant => "Helium-rich gas giant",
            BodyClass::WaterWorld => "Water world",
            BodyClass::AmmoniaWorld => "Ammonia world",
            BodyClass::RockyIceWorld => "Rocky ice world",
            BodyClass::Barycentre => "Barycentre",
            BodyClass::Unclassified => "Unclassified",
        }
    }
}

/// Display radius in pixels, precomputed once at load.
///
/// Stars scale with the square root of their solar radius, barycentres are
/// a fixed minimal anchor, and everything else maps its physical km radius
/// linearly into a clamped pixel band.
pub fn display_radius(
    class: BodyClass,
    solar_radius: Option<f64>,
    km_radius: Option<f64>,
) -> f64 {
    match class {
        BodyClass::Star => {
            STAR_BASE_RADIUS_PX * libm::sqrt(f64::max(0.1, solar_radius.unwrap_or(1.0)))
        }
        BodyClass::Barycentre => BARYCENTRE_RADIUS_PX,
        _ => (km_radius.unwrap_or(1000.0) * BODY_RADIUS_SCALE)
            .clamp(MIN_BODY_RADIUS_PX, MAX_BODY_RADIUS_PX),
    }
}

/// Outcome tag of a per-tick local-position solve.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// Position came from a full Kepler solve.
    Resolved,
    /// Elements were unresolvable; the position is the fallback stand-in.
    #[default]
    Degenerate,
}

/// A celestial body and its per-tick derived state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub id: BodyId,
    /// Immediate parent; `None` only for the system root.
    pub parent: Option<BodyId>,
    /// Number of ancestors; the root sits at depth 0.
    pub depth: usize,
    pub name: Arc<str>,
    pub class: BodyClass,
    /// Human-readable atmosphere summary for the label overlay.
    pub atmosphere: Arc<str>,
    /// Display radius (px), precomputed from the physical radius.
    pub radius_px: f64,
    pub elements: OrbitalElements,
    /// Static orbit polyline in the parent's frame (AU), sampled at load;
    /// empty when the orbit geometry is unresolvable or open.
    pub orbit_path: Vec<Vector3<f64>>,
    /// Parent-relative position this tick (AU).
    pub local_position: Vector3<f64>,
    /// System-absolute position this tick (AU), re-based to the focus.
    pub absolute_position: Vector3<f64>,
    /// Absolute position of the parent this tick; anchors `orbit_path`.
    pub parent_offset: Vector3<f64>,
    /// Whether the last solve was genuine or the degenerate fallback.
    pub resolution: Resolution,
}

impl Body {
    /// A body with no derived state yet; positions fill in on the first
    /// tick.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: BodyId,
        parent: Option<BodyId>,
        depth: usize,
        name: Arc<str>,
        class: BodyClass,
        atmosphere: Arc<str>,
        radius_px: f64,
        elements: OrbitalElements,
        orbit_path: Vec<Vector3<f64>>,
    ) -> Self {
        Self {
            id,
            parent,
            depth,
            name,
            class,
            atmosphere,
            radius_px,
            elements,
            orbit_path,
            local_position: Vector3::zeros(),
            absolute_position: Vector3::zeros(),
            parent_offset: Vector3::zeros(),
            resolution: Resolution::Degenerate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{display_radius, BodyClass};

    #[test]
    fn unknown_labels_are_unclassified() {
        assert_eq!(BodyClass::from_label("Quark star"), BodyClass::Unclassified);
        assert_eq!(BodyClass::from_label(""), BodyClass::Unclassified);
        assert_eq!(
            BodyClass::classify(Some("Planet"), Some("Chocolate world")),
            BodyClass::Unclassified
        );
    }

    #[test]
    fn stellar_records_classify_by_their_type() {
        // Stars carry spectral subtypes that are not in the enumeration;
        // the record type decides.
        assert_eq!(
            BodyClass::classify(Some("Star"), Some("K (Yellow-Orange) Star")),
            BodyClass::Star
        );
        assert_eq!(
            BodyClass::classify(Some("Barycentre"), None),
            BodyClass::Barycentre
        );
        assert_eq!(
            BodyClass::classify(Some("Planet"), Some("Icy body")),
            BodyClass::IcyBody
        );
    }

    #[test]
    fn star_radius_scales_with_sqrt_solar_radius() {
        assert!((display_radius(BodyClass::Star, Some(4.0), None) - 40.0).abs() < 1e-12);
        // Tiny stars are floored rather than vanishing.
        let dwarf = display_radius(BodyClass::Star, Some(0.0), None);
        assert!((dwarf - 20.0 * 0.1f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn generic_radius_is_clamped_to_the_pixel_band() {
        assert_eq!(display_radius(BodyClass::RockyBody, None, Some(6371.0)), 8.0);
        assert_eq!(display_radius(BodyClass::IcyBody, None, Some(1e-9)), 2.0);
        assert_eq!(display_radius(BodyClass::Barycentre, None, None), 3.0);
    }
}
