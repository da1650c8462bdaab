//! Ingestion of raw system-dump records into a composed body map.
//!
//! Everything here is total in the spirit of the rest of the engine: a
//! malformed record degrades to an unresolvable orbit or is skipped with a
//! warning, it never fails the load of the remaining system.

use std::collections::HashMap;
use std::sync::Arc;

use color_eyre::eyre::{self, OptionExt};
use itertools::Itertools;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use time::{format_description, OffsetDateTime, PrimitiveDateTime};
use tracing::{info, warn};

use crate::bodies::{display_radius, Body, BodyClass, BodyId};
use crate::kepler::orbits::{Epoch, OrbitalElements};
use crate::system::SystemMap;

/// Headroom factor between the widest top-level orbit and the reference
/// plane drawn around the system.
const PLANE_RADIUS_MARGIN: f64 = 1.3;
/// Plane radius for a bare star system, scaled from its solar radius.
const STAR_PLANE_SCALE: f64 = 0.05;

/// Galactic coordinates of a system (ly).
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemCoords {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// One body record of a system dump. Every field the engine reads is
/// optional, so a sparse record still loads; unknown fields are ignored.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BodyRecord {
    pub body_id: Option<i64>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub body_type: Option<String>,
    pub sub_type: Option<String>,
    /// Ancestor chain, nearest first, each entry a single-key map from the
    /// ancestor's type label to its id.
    pub parents: Option<Vec<HashMap<String, i64>>>,
    pub main_star: Option<bool>,
    pub is_main_star: Option<bool>,
    /// Stellar radius in solar radii.
    pub solar_radius: Option<f64>,
    /// Physical radius (km).
    pub radius: Option<f64>,
    pub atmosphere_type: Option<String>,
    pub atmosphere_composition: Option<HashMap<String, f64>>,
    /// Semi-major axis (AU).
    pub semi_major_axis: Option<f64>,
    pub orbital_eccentricity: Option<f64>,
    /// Inclination (degrees).
    pub orbital_inclination: Option<f64>,
    /// Longitude of the ascending node (degrees).
    pub ascending_node: Option<f64>,
    /// Argument of periapsis (degrees).
    pub arg_of_periapsis: Option<f64>,
    /// Orbital period (days).
    pub orbital_period: Option<f64>,
    /// Mean anomaly at epoch (degrees).
    pub mean_anomaly: Option<f64>,
    /// Field-name to timestamp-string map; the `meanAnomaly` entry (or
    /// `distanceToArrival` as a stand-in) dates the mean anomaly.
    pub timestamps: Option<HashMap<String, String>>,
}

/// A parsed system dump: the record list plus display metadata.
#[derive(Clone, Debug, Default)]
pub struct SystemDump {
    pub name: Option<String>,
    pub coords: SystemCoords,
    pub bodies: Vec<BodyRecord>,
}

#[derive(Deserialize)]
struct DumpEnvelope {
    system: Option<DumpSystem>,
    bodies: Option<Vec<BodyRecord>>,
    coords: Option<SystemCoords>,
    name: Option<String>,
}

#[derive(Deserialize)]
struct DumpSystem {
    bodies: Option<Vec<BodyRecord>>,
    coords: Option<SystemCoords>,
    name: Option<String>,
}

/// Parse a dump file. The body list lives either under a `system` object
/// or at the top level, depending on the dump's vintage.
pub fn parse_dump(json: &str) -> eyre::Result<SystemDump> {
    let DumpEnvelope {
        system,
        bodies,
        coords,
        name,
    } = serde_json::from_str(json)?;
    let (sys_bodies, sys_coords, sys_name) = match system {
        Some(sys) => (sys.bodies, sys.coords, sys.name),
        None => (None, None, None),
    };
    let records = sys_bodies
        .or(bodies)
        .ok_or_eyre("system dump contains no body records")?;
    Ok(SystemDump {
        name: sys_name.or(name),
        coords: sys_coords.or(coords).unwrap_or_default(),
        bodies: records,
    })
}

const FMT_ISO_ZULU: &str = "[year]-[month]-[day]T[hour]:[minute]:[second]Z";
const FMT_ISO_BARE: &str = "[year]-[month]-[day]T[hour]:[minute]:[second]";
const FMT_SPACED: &str = "[year]-[month]-[day] [hour]:[minute]:[second]";

/// Parse a record epoch string in any of the three source formats. An
/// unparsable string freezes the orbital phase at the query time instead
/// of failing the record.
pub fn parse_epoch(raw: &str) -> Epoch {
    match try_parse_epoch(raw) {
        Some(t) => Epoch::Absolute(t),
        None => Epoch::QueryTime,
    }
}

fn try_parse_epoch(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if raw.contains('T') && raw.ends_with('Z') {
        return parse_with(raw, FMT_ISO_ZULU);
    }
    // A numeric zone suffix; the prefix is already UTC.
    if let Some((head, _offset)) = raw.split_once('+') {
        return parse_with(head.trim(), FMT_SPACED);
    }
    parse_with(raw, FMT_ISO_BARE).or_else(|| parse_with(raw, FMT_SPACED))
}

fn parse_with(raw: &str, description: &str) -> Option<OffsetDateTime> {
    let format = format_description::parse(description).ok()?;
    PrimitiveDateTime::parse(raw, format.as_slice())
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

fn record_parent(record: &BodyRecord) -> Option<i64> {
    record
        .parents
        .as_ref()
        .and_then(|p| p.first())
        .and_then(|entry| entry.values().next())
        .copied()
}

fn record_depth(record: &BodyRecord) -> Option<usize> {
    record
        .parents
        .as_ref()
        .filter(|p| !p.is_empty())
        .map(Vec::len)
}

/// Designate the system root: an explicit main-star marker wins, then the
/// shallowest body whose declared parent is unknown to the record set,
/// then the first record. A nonempty record set always yields a root.
fn designate_root(records: &[BodyRecord]) -> Option<BodyId> {
    if let Some(id) = records
        .iter()
        .find(|r| r.main_star == Some(true) || r.is_main_star == Some(true))
        .and_then(|r| r.body_id)
    {
        return Some(BodyId(id));
    }

    let known: std::collections::HashSet<i64> =
        records.iter().filter_map(|r| r.body_id).collect();
    let mut best: Option<(usize, i64)> = None;
    for record in records {
        let Some(id) = record.body_id else { continue };
        let orphan = record_parent(record).map_or(true, |p| !known.contains(&p));
        if !orphan {
            continue;
        }
        let depth = record_depth(record).unwrap_or(0);
        if best.map_or(true, |(d, _)| depth < d) {
            best = Some((depth, id));
        }
    }
    best.map(|(_, id)| BodyId(id))
        .or_else(|| records.iter().find_map(|r| r.body_id).map(BodyId))
}

/// Atmosphere summary for the label overlay: the declared type when it
/// carries information, else the top two composition constituents.
fn atmosphere_summary(record: &BodyRecord) -> String {
    if let Some(atm) = record
        .atmosphere_type
        .as_deref()
        .filter(|t| !t.is_empty() && *t != "None")
    {
        return atm.to_owned();
    }
    let constituents: Vec<&str> = record
        .atmosphere_composition
        .iter()
        .flatten()
        .sorted_by_key(|(_, share)| std::cmp::Reverse(OrderedFloat(**share)))
        .take(2)
        .map(|(name, _)| name.as_str())
        .collect();
    if constituents.is_empty() {
        "No Atmosphere".to_owned()
    } else {
        constituents.join(", ")
    }
}

/// Build a composed system from raw records. Total: malformed records
/// degrade or are skipped, they never fail the build.
pub fn build_system(records: &[BodyRecord], path_points: usize) -> SystemMap {
    let root = designate_root(records);
    let mut bodies = Vec::with_capacity(records.len());
    let mut max_top_level_sma = 0.0f64;
    let mut root_star_radius: Option<f64> = None;

    for record in records {
        let Some(raw_id) = record.body_id else {
            warn!(name = record.name.as_deref(), "record has no body id, skipping");
            continue;
        };
        let id = BodyId(raw_id);

        let (parent, depth) = match record_depth(record) {
            Some(depth) => (record_parent(record).map(BodyId), depth),
            None if Some(id) == root => (None, 0),
            None => (root, 1),
        };

        let class = BodyClass::classify(record.body_type.as_deref(), record.sub_type.as_deref());
        if Some(id) == root && class == BodyClass::Star {
            root_star_radius = Some(record.solar_radius.unwrap_or(1.0));
        }
        if depth == 1 {
            if let Some(a) = record.semi_major_axis.filter(|a| a.is_finite()) {
                max_top_level_sma = max_top_level_sma.max(a);
            }
        }

        let epoch = record
            .timestamps
            .as_ref()
            .and_then(|t| t.get("meanAnomaly").or_else(|| t.get("distanceToArrival")))
            .map(|raw| parse_epoch(raw));
        let elements = OrbitalElements {
            semi_major_axis: record.semi_major_axis,
            eccentricity: record.orbital_eccentricity,
            inclination: record.orbital_inclination,
            ascending_node: record.ascending_node,
            arg_periapsis: record.arg_of_periapsis,
            period: record.orbital_period,
            mean_anomaly: record.mean_anomaly,
            epoch,
        };
        if elements.semi_major_axis.is_some() && elements.resolved().is_none() {
            warn!(
                body = record.name.as_deref().unwrap_or("N/A"),
                "orbital elements incomplete, body falls back to a fixed position"
            );
        }
        let orbit_path = elements
            .shape()
            .map(|shape| shape.sample_path(path_points))
            .unwrap_or_default();

        bodies.push(Body::new(
            id,
            parent,
            depth,
            Arc::from(record.name.as_deref().unwrap_or("N/A")),
            class,
            Arc::from(atmosphere_summary(record)),
            display_radius(class, record.solar_radius, record.radius),
            elements,
            orbit_path,
        ));
    }

    let plane_radius = if max_top_level_sma > 0.0 {
        max_top_level_sma * PLANE_RADIUS_MARGIN
    } else if let Some(solar_radius) = root_star_radius {
        solar_radius * STAR_PLANE_SCALE
    } else {
        0.0
    };

    let map = SystemMap::new(bodies, root, plane_radius);
    info!(
        bodies = map.len(),
        plane_radius_au = map.plane_radius(),
        "loaded system"
    );
    map
}

#[cfg(test)]
mod tests {
    use time::{Date, Month};

    use super::{build_system, parse_dump, parse_epoch, BodyRecord};
    use crate::bodies::{BodyClass, BodyId};
    use crate::kepler::orbits::Epoch;

    fn expected_utc(
        y: i32,
        mo: Month,
        d: u8,
        h: u8,
        mi: u8,
        s: u8,
    ) -> time::OffsetDateTime {
        Date::from_calendar_date(y, mo, d)
            .unwrap()
            .with_hms(h, mi, s)
            .unwrap()
            .assume_utc()
    }

    #[test]
    fn epoch_parses_all_three_source_formats() {
        let expected = expected_utc(2017, Month::August, 24, 20, 35, 31);
        assert_eq!(
            parse_epoch("2017-08-24T20:35:31Z"),
            Epoch::Absolute(expected)
        );
        assert_eq!(
            parse_epoch("2017-08-24 20:35:31+00"),
            Epoch::Absolute(expected)
        );
        assert_eq!(
            parse_epoch("2017-08-24T20:35:31"),
            Epoch::Absolute(expected)
        );
    }

    #[test]
    fn unparsable_epoch_freezes_the_phase() {
        assert_eq!(parse_epoch("three days after the flood"), Epoch::QueryTime);
        assert_eq!(parse_epoch(""), Epoch::QueryTime);
        assert_eq!(parse_epoch("2017-13-40T99:99:99Z"), Epoch::QueryTime);
    }

    const DUMP: &str = r#"{
        "system": {
            "name": "Test System",
            "coords": { "x": 1.0, "y": -2.0, "z": 3.5 },
            "bodies": [
                {
                    "bodyId": 0,
                    "name": "Test A",
                    "type": "Star",
                    "subType": "K (Yellow-Orange) Star",
                    "mainStar": true,
                    "solarRadius": 0.81
                },
                {
                    "bodyId": 1,
                    "name": "Test A 1",
                    "type": "Planet",
                    "subType": "High metal content world",
                    "parents": [{ "Star": 0 }],
                    "radius": 5200.0,
                    "semiMajorAxis": 2.5,
                    "orbitalEccentricity": 0.03,
                    "orbitalInclination": 1.2,
                    "ascendingNode": 100.0,
                    "argOfPeriapsis": 40.0,
                    "orbitalPeriod": 600.0,
                    "meanAnomaly": 42.0,
                    "atmosphereComposition": { "Nitrogen": 91.5, "Oxygen": 8.0, "Argon": 0.5 },
                    "timestamps": { "meanAnomaly": "2017-08-24T20:35:31Z" }
                },
                {
                    "bodyId": 2,
                    "name": "Test A 1 a",
                    "type": "Planet",
                    "subType": "Rocky body",
                    "parents": [{ "Planet": 1 }, { "Star": 0 }],
                    "radius": 800.0,
                    "semiMajorAxis": 0.01
                }
            ]
        }
    }"#;

    #[test]
    fn dump_parses_and_builds_a_composed_system() {
        let dump = parse_dump(DUMP).unwrap();
        assert_eq!(dump.name.as_deref(), Some("Test System"));
        assert_eq!(dump.coords.z, 3.5);
        assert_eq!(dump.bodies.len(), 3);

        let map = build_system(&dump.bodies, 64);
        assert_eq!(map.root(), Some(BodyId(0)));

        let star = map.get(BodyId(0)).unwrap();
        assert_eq!(star.depth, 0);
        assert_eq!(star.parent, None);
        assert_eq!(star.class, BodyClass::Star);
        assert!(star.orbit_path.is_empty());

        let planet = map.get(BodyId(1)).unwrap();
        assert_eq!(planet.depth, 1);
        assert_eq!(planet.parent, Some(BodyId(0)));
        assert_eq!(planet.orbit_path.len(), 64);
        assert_eq!(&*planet.atmosphere, "Nitrogen, Oxygen");
        assert!(planet.elements.resolved().is_some());

        let moon = map.get(BodyId(2)).unwrap();
        assert_eq!(moon.depth, 2);
        assert_eq!(moon.parent, Some(BodyId(1)));
        // Semi-major axis alone resolves nothing and samples nothing.
        assert!(moon.elements.resolved().is_none());
        assert!(moon.orbit_path.is_empty());

        // 1.3 times the widest depth-1 orbit.
        assert!((map.plane_radius() - 3.25).abs() < 1e-12);
    }

    #[test]
    fn top_level_body_list_is_accepted() {
        let dump = parse_dump(r#"{ "bodies": [ { "bodyId": 7, "name": "Lone" } ] }"#).unwrap();
        assert_eq!(dump.bodies.len(), 1);
        let map = build_system(&dump.bodies, 64);
        assert_eq!(map.root(), Some(BodyId(7)));
        assert_eq!(map.get(BodyId(7)).unwrap().depth, 0);
    }

    #[test]
    fn dump_without_bodies_is_an_error() {
        assert!(parse_dump(r#"{ "name": "Empty" }"#).is_err());
    }

    #[test]
    fn root_designation_prefers_the_marker() {
        let records: Vec<BodyRecord> = serde_json::from_str(
            r#"[
                { "bodyId": 3, "type": "Star" },
                { "bodyId": 5, "type": "Star", "isMainStar": true }
            ]"#,
        )
        .unwrap();
        assert_eq!(build_system(&records, 8).root(), Some(BodyId(5)));
    }

    #[test]
    fn root_designation_falls_back_to_the_shallowest_orphan() {
        let records: Vec<BodyRecord> = serde_json::from_str(
            r#"[
                { "bodyId": 9, "parents": [{ "Star": 1 }, { "Star": 0 }] },
                { "bodyId": 4, "parents": [{ "Star": 0 }] }
            ]"#,
        )
        .unwrap();
        // Neither parent id exists in the set; the shallower orphan wins.
        assert_eq!(build_system(&records, 8).root(), Some(BodyId(4)));
    }

    #[test]
    fn records_without_ids_are_skipped_not_fatal() {
        let records: Vec<BodyRecord> = serde_json::from_str(
            r#"[ { "name": "ghost" }, { "bodyId": 1, "name": "real" } ]"#,
        )
        .unwrap();
        let map = build_system(&records, 8);
        assert_eq!(map.len(), 1);
        assert_eq!(map.root(), Some(BodyId(1)));
    }

    #[test]
    fn unparented_non_root_hangs_off_the_root() {
        let records: Vec<BodyRecord> = serde_json::from_str(
            r#"[
                { "bodyId": 0, "type": "Star", "mainStar": true },
                { "bodyId": 6, "name": "drifter" }
            ]"#,
        )
        .unwrap();
        let map = build_system(&records, 8);
        let drifter = map.get(BodyId(6)).unwrap();
        assert_eq!(drifter.parent, Some(BodyId(0)));
        assert_eq!(drifter.depth, 1);
    }

    #[test]
    fn bare_star_system_gets_a_stellar_plane_radius() {
        let records: Vec<BodyRecord> = serde_json::from_str(
            r#"[ { "bodyId": 0, "type": "Star", "mainStar": true, "solarRadius": 2.0 } ]"#,
        )
        .unwrap();
        let map = build_system(&records, 8);
        assert!((map.plane_radius() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn declared_atmosphere_type_wins_over_composition() {
        let records: Vec<BodyRecord> = serde_json::from_str(
            r#"[ {
                "bodyId": 0,
                "atmosphereType": "Thin Sulphur Dioxide",
                "atmosphereComposition": { "Sulphur dioxide": 100.0 }
            } ]"#,
        )
        .unwrap();
        let map = build_system(&records, 8);
        assert_eq!(&*map.get(BodyId(0)).unwrap().atmosphere, "Thin Sulphur Dioxide");
    }
}
