//! The extracted building record and all subentities.
//!
//! Every optional field serialises as an explicit `null`; nothing in the
//! domain model is dropped from the wire form. The ground-truth adapter
//! and the verifier both rely on that: "absent" always means "the
//! extractor said null", never "the key was omitted".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::types::fragments::{Domain, ExtractionStatus};

/// Qualitative confidence attached to classifications and estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// One step down; `Low` stays `Low`.
    pub fn downgraded(self) -> Self {
        match self {
            Self::High => Self::Medium,
            Self::Medium | Self::Low => Self::Low,
        }
    }
}

/// Primary fuel classification for the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelType {
    Electric,
    Gas,
    Mixed,
}

/// Scalar project metadata from the title block and compliance forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProjectInfo {
    pub title: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    /// California climate zone, 1-16.
    pub climate_zone: Option<u8>,
    pub fuel_type: Option<FuelType>,
    pub house_type: Option<String>,
    pub dwelling_units: Option<u32>,
    pub stories: Option<u32>,
    pub bedrooms: Option<u32>,
    /// Degrees clockwise from true north, [0, 360).
    pub front_orientation: Option<f64>,
    pub orientation_confidence: Option<Confidence>,
    pub flags: ProjectFlags,
}

/// Compliance-form checkboxes that change how downstream fields are read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProjectFlags {
    pub new_construction: Option<bool>,
    pub addition: Option<bool>,
    pub alteration: Option<bool>,
}

/// Aggregate envelope scalars, square feet unless noted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Envelope {
    pub conditioned_floor_area: Option<f64>,
    pub window_area: Option<f64>,
    /// Window-to-floor ratio, [0, 1].
    pub window_to_floor_ratio: Option<f64>,
    pub exterior_wall_area: Option<f64>,
    pub door_area: Option<f64>,
    pub roof_ceiling_area: Option<f64>,
    /// Feet.
    pub avg_ceiling_height: Option<f64>,
}

/// A named thermal zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub zone_type: Option<String>,
    pub floor_area: Option<f64>,
    /// Cubic feet.
    pub volume: Option<f64>,
}

/// An exterior wall segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    pub name: String,
    /// Back-reference to `Zone::name`.
    pub zone: Option<String>,
    /// Facing azimuth in degrees clockwise from true north.
    pub azimuth: Option<f64>,
    pub gross_area: Option<f64>,
    /// Gross area minus fenestration and door openings.
    pub net_area: Option<f64>,
    /// Assembly name as drawn in the construction schedule.
    pub construction: Option<String>,
    /// 90 for vertical walls.
    pub tilt_degrees: Option<f64>,
}

/// A fenestration entry (window or glazed door).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub name: String,
    /// Back-reference to `Wall::name`.
    pub wall: Option<String>,
    /// Feet.
    pub height: Option<f64>,
    /// Feet.
    pub width: Option<f64>,
    /// Identical units drawn once in the schedule.
    pub multiplier: Option<u32>,
    pub area: Option<f64>,
    pub u_factor: Option<f64>,
    /// Solar heat gain coefficient, [0, 1].
    pub shgc: Option<f64>,
    /// Feet of fixed overhang above the window head.
    pub overhang_depth: Option<f64>,
}

/// One HVAC system with its optional sub-records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HvacSystem {
    pub name: String,
    pub system_type: Option<String>,
    pub heating: Option<HeatingSystem>,
    pub cooling: Option<CoolingSystem>,
    pub distribution: Option<DistributionSystem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HeatingSystem {
    pub equipment_type: Option<String>,
    pub fuel: Option<FuelType>,
    /// Name of the rated metric (AFUE, HSPF, COP...).
    pub efficiency_metric: Option<String>,
    pub efficiency_value: Option<f64>,
    pub capacity_btuh: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CoolingSystem {
    pub equipment_type: Option<String>,
    /// Name of the rated metric (SEER, SEER2, EER...).
    pub efficiency_metric: Option<String>,
    pub efficiency_value: Option<f64>,
    pub capacity_btuh: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DistributionSystem {
    pub system_kind: Option<String>,
    pub duct_location: Option<String>,
    pub duct_r_value: Option<f64>,
}

/// One water-heating system owning its heater units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterHeatingSystem {
    pub name: String,
    pub system_type: Option<String>,
    pub heaters: Vec<WaterHeater>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WaterHeater {
    pub heater_type: Option<String>,
    pub fuel: Option<FuelType>,
    pub uniform_energy_factor: Option<f64>,
    pub tank_volume_gal: Option<f64>,
    pub count: Option<u32>,
}

/// How a duplicate or violation was settled during merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    KeptFirst,
    SchemaViolation,
}

/// A field-level disagreement recorded by the merge engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConflict {
    /// Dotted path of the disputed field, e.g. `zones[Zone 1].floor_area`.
    pub field: String,
    pub source_extractor: String,
    pub reported_value: serde_json::Value,
    pub conflicting_extractor: String,
    pub conflicting_value: serde_json::Value,
    pub resolution: ConflictResolution,
}

/// A schema-rule violation found by [`BuildingSpec::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaViolation {
    pub field: String,
    pub message: String,
}

/// The complete extracted record for one evaluation case.
///
/// Created by the merge engine after parallel extraction completes and
/// immutable afterwards; a new iteration produces a new record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BuildingSpec {
    pub project: ProjectInfo,
    pub envelope: Envelope,
    pub zones: Vec<Zone>,
    pub walls: Vec<Wall>,
    pub windows: Vec<Window>,
    pub hvac_systems: Vec<HvacSystem>,
    pub water_heating_systems: Vec<WaterHeatingSystem>,
    /// Per-domain extraction outcome, keyed in canonical domain order.
    pub extraction_status: BTreeMap<Domain, ExtractionStatus>,
    pub conflicts: Vec<FieldConflict>,
}

impl BuildingSpec {
    /// Check every schema rule and return the violations found.
    ///
    /// Never fails hard: the merge engine folds the result into
    /// `conflicts` so a partially-wrong record still persists.
    pub fn validate(&self) -> Vec<SchemaViolation> {
        let mut violations = Vec::new();

        self.validate_project(&mut violations);
        self.validate_envelope(&mut violations);
        self.validate_names(&mut violations);
        self.validate_references(&mut violations);
        self.validate_walls(&mut violations);
        self.validate_windows(&mut violations);
        self.validate_area_sums(&mut violations);

        violations
    }

    fn validate_project(&self, out: &mut Vec<SchemaViolation>) {
        if let Some(zone) = self.project.climate_zone {
            if !(1..=16).contains(&zone) {
                out.push(violation(
                    "project.climate_zone",
                    format!("climate zone {zone} outside 1-16"),
                ));
            }
        }
        if let Some(units) = self.project.dwelling_units {
            if units < 1 {
                out.push(violation("project.dwelling_units", "must be at least 1"));
            }
        }
        if let Some(stories) = self.project.stories {
            if stories < 1 {
                out.push(violation("project.stories", "must be at least 1"));
            }
        }
        if let Some(az) = self.project.front_orientation {
            if !(0.0..360.0).contains(&az) {
                out.push(violation(
                    "project.front_orientation",
                    format!("azimuth {az} outside [0, 360)"),
                ));
            }
        }
    }

    fn validate_envelope(&self, out: &mut Vec<SchemaViolation>) {
        if let Some(cfa) = self.envelope.conditioned_floor_area {
            if cfa <= 0.0 {
                out.push(violation(
                    "envelope.conditioned_floor_area",
                    "must be positive",
                ));
            }
        }
        for (field, value) in [
            ("envelope.window_area", self.envelope.window_area),
            ("envelope.exterior_wall_area", self.envelope.exterior_wall_area),
            ("envelope.door_area", self.envelope.door_area),
            ("envelope.roof_ceiling_area", self.envelope.roof_ceiling_area),
        ] {
            if let Some(v) = value {
                if v < 0.0 {
                    out.push(violation(field, "must be non-negative"));
                }
            }
        }
        if let Some(ratio) = self.envelope.window_to_floor_ratio {
            if !(0.0..=1.0).contains(&ratio) {
                out.push(violation(
                    "envelope.window_to_floor_ratio",
                    format!("ratio {ratio} outside [0, 1]"),
                ));
            }
        }
    }

    fn validate_names(&self, out: &mut Vec<SchemaViolation>) {
        check_unique_names("zones", self.zones.iter().map(|z| z.name.as_str()), out);
        check_unique_names("walls", self.walls.iter().map(|w| w.name.as_str()), out);
        check_unique_names("windows", self.windows.iter().map(|w| w.name.as_str()), out);
        check_unique_names(
            "hvac_systems",
            self.hvac_systems.iter().map(|h| h.name.as_str()),
            out,
        );
        check_unique_names(
            "water_heating_systems",
            self.water_heating_systems.iter().map(|w| w.name.as_str()),
            out,
        );
    }

    fn validate_references(&self, out: &mut Vec<SchemaViolation>) {
        let zone_names: crate::FxHashSet<&str> =
            self.zones.iter().map(|z| z.name.as_str()).collect();
        let wall_names: crate::FxHashSet<&str> =
            self.walls.iter().map(|w| w.name.as_str()).collect();

        for wall in &self.walls {
            if let Some(zone) = &wall.zone {
                if !zone_names.contains(zone.as_str()) {
                    out.push(violation(
                        format!("walls[{}].zone", wall.name),
                        format!("unresolved zone reference '{zone}'"),
                    ));
                }
            }
        }
        for window in &self.windows {
            if let Some(wall) = &window.wall {
                if !wall_names.contains(wall.as_str()) {
                    out.push(violation(
                        format!("windows[{}].wall", window.name),
                        format!("unresolved wall reference '{wall}'"),
                    ));
                }
            }
        }
    }

    fn validate_walls(&self, out: &mut Vec<SchemaViolation>) {
        for wall in &self.walls {
            if let (Some(net), Some(gross)) = (wall.net_area, wall.gross_area) {
                if net > gross {
                    out.push(violation(
                        format!("walls[{}].net_area", wall.name),
                        format!("net area {net} exceeds gross area {gross}"),
                    ));
                }
            }
            if let Some(az) = wall.azimuth {
                if !(0.0..360.0).contains(&az) {
                    out.push(violation(
                        format!("walls[{}].azimuth", wall.name),
                        format!("azimuth {az} outside [0, 360)"),
                    ));
                }
            }
        }
    }

    fn validate_windows(&self, out: &mut Vec<SchemaViolation>) {
        for window in &self.windows {
            if let Some(u) = window.u_factor {
                if u <= 0.0 {
                    out.push(violation(
                        format!("windows[{}].u_factor", window.name),
                        "must be positive",
                    ));
                }
            }
            if let Some(shgc) = window.shgc {
                if !(0.0..=1.0).contains(&shgc) {
                    out.push(violation(
                        format!("windows[{}].shgc", window.name),
                        format!("shgc {shgc} outside [0, 1]"),
                    ));
                }
            }
            if let Some(mult) = window.multiplier {
                if mult < 1 {
                    out.push(violation(
                        format!("windows[{}].multiplier", window.name),
                        "must be at least 1",
                    ));
                }
            }
            if let (Some(area), Some(h), Some(w)) = (window.area, window.height, window.width) {
                let mult = window.multiplier.unwrap_or(1) as f64;
                let expected = h * w * mult;
                let tolerance = (expected * constants::AREA_SUM_TOLERANCE).max(0.5);
                if (area - expected).abs() > tolerance {
                    out.push(violation(
                        format!("windows[{}].area", window.name),
                        format!("area {area} inconsistent with {h} x {w} x {mult}"),
                    ));
                }
            }
        }
    }

    /// Wall and window area sums should approximate the envelope
    /// aggregates within 1%. Recorded, not fatal.
    fn validate_area_sums(&self, out: &mut Vec<SchemaViolation>) {
        if let Some(total) = self.envelope.exterior_wall_area {
            let sum: f64 = self.walls.iter().filter_map(|w| w.gross_area).sum();
            if !self.walls.is_empty()
                && self.walls.iter().all(|w| w.gross_area.is_some())
                && relative_gap(sum, total) > constants::AREA_SUM_TOLERANCE
            {
                out.push(violation(
                    "envelope.exterior_wall_area",
                    format!("wall areas sum to {sum}, envelope says {total}"),
                ));
            }
        }
        if let Some(total) = self.envelope.window_area {
            let sum: f64 = self.windows.iter().filter_map(|w| w.area).sum();
            if !self.windows.is_empty()
                && self.windows.iter().all(|w| w.area.is_some())
                && relative_gap(sum, total) > constants::AREA_SUM_TOLERANCE
            {
                out.push(violation(
                    "envelope.window_area",
                    format!("window areas sum to {sum}, envelope says {total}"),
                ));
            }
        }
    }

    /// Find a zone by name.
    pub fn zone(&self, name: &str) -> Option<&Zone> {
        self.zones.iter().find(|z| z.name == name)
    }

    /// Find a wall by name.
    pub fn wall(&self, name: &str) -> Option<&Wall> {
        self.walls.iter().find(|w| w.name == name)
    }
}

fn violation(field: impl Into<String>, message: impl Into<String>) -> SchemaViolation {
    SchemaViolation {
        field: field.into(),
        message: message.into(),
    }
}

fn check_unique_names<'a>(
    list: &str,
    names: impl Iterator<Item = &'a str>,
    out: &mut Vec<SchemaViolation>,
) {
    let mut seen = crate::FxHashSet::default();
    for name in names {
        if !seen.insert(name) {
            out.push(violation(
                format!("{list}[{name}]"),
                "duplicate name".to_string(),
            ));
        }
    }
}

fn relative_gap(sum: f64, total: f64) -> f64 {
    if total.abs() < f64::EPSILON {
        if sum.abs() < f64::EPSILON {
            0.0
        } else {
            f64::INFINITY
        }
    } else {
        (sum - total).abs() / total.abs()
    }
}
