//! Registries mapping loose resource names onto BES path segments.
//!
//! `"air handler"`, `"Air_Handlers"` and `"block_air_handlers"` all name the
//! same thing; each resolver normalizes its input and then requires an exact
//! registry match.

use crate::error::{Error, Result};

/// Block sub-resources: `(singular, path, foreign key)`.
const BLOCK_RESOURCES: [(&str, &str, &str); 10] = [
    ("air_handler", "block_air_handlers", "air_handler_id"),
    ("fixture", "block_fixtures", "fixture_id"),
    ("floor", "block_floors", "floor_id"),
    ("plant", "block_plants", "plant_id"),
    ("roof", "block_roofs", "roof_id"),
    ("skylight", "block_skylights", "skylight_id"),
    ("wall", "block_walls", "wall_id"),
    ("water_heater", "block_water_heaters", "water_heater_id"),
    ("window", "block_windows", "window_id"),
    ("zone_equipment", "block_zone_equipments", "zone_equipment_id"),
];

/// Building-scoped resources.
const BUILDING_RESOURCES: [&str; 14] = [
    "air_handlers",
    "blocks",
    "fixtures",
    "floors",
    "notes",
    "operations",
    "plants",
    "roofs",
    "skylights",
    "surfaces",
    "walls",
    "water_heaters",
    "windows",
    "zone_equipments",
];

/// Immutable type catalogs.
const RESOURCE_TYPES: [&str; 22] = [
    "air_handler_types",
    "assessment_types",
    "boiler_types",
    "chiller_types",
    "cooling_tower_types",
    "fixture_types",
    "floor_types",
    "framing_types",
    "fuel_types",
    "glass_types",
    "lamp_types",
    "mounting_types",
    "plant_types",
    "roof_types",
    "shape_types",
    "skylight_types",
    "status_types",
    "use_types",
    "wall_types",
    "water_heater_types",
    "window_types",
    "zone_equipment_types",
];

/// Singularizing these would corrupt the registry key.
const NEVER_SINGULAR: [&str; 2] = ["glass", "status"];

fn normalize(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

fn singularize(name: &str) -> &str {
    name.strip_suffix('s').unwrap_or(name)
}

/// Resolves a block sub-resource to `(path, foreign key)`.
pub fn block_resource(name: &str) -> Result<(&'static str, &'static str)> {
    let norm = normalize(name);
    let stem = norm.strip_prefix("block_").unwrap_or(&norm);
    let singular = singularize(stem);
    BLOCK_RESOURCES
        .iter()
        .find(|(s, _, _)| *s == singular)
        .map(|(_, path, fk)| (*path, *fk))
        .ok_or_else(|| Error::validation(format!("{} is not a valid block resource name", name)))
}

/// Resolves a building-scoped resource to its plural path segment.
pub fn resource_name(name: &str) -> Result<&'static str> {
    let norm = normalize(name);
    let plural = format!("{}s", singularize(&norm));
    BUILDING_RESOURCES
        .iter()
        .copied()
        .find(|r| *r == plural)
        .ok_or_else(|| Error::validation(format!("{} is not a valid resource name", name)))
}

/// Resolves a type catalog, e.g. `"boiler"` → `"boiler_types"`.
pub fn resource_type(name: &str) -> Result<&'static str> {
    let norm = normalize(name);
    let stem = norm
        .strip_suffix("_types")
        .or_else(|| norm.strip_suffix("_type"))
        .unwrap_or(&norm);
    let singular = if NEVER_SINGULAR.contains(&stem) {
        stem
    } else {
        singularize(stem)
    };
    let key = format!("{}_types", singular);
    RESOURCE_TYPES
        .iter()
        .copied()
        .find(|t| *t == key)
        .ok_or_else(|| Error::validation(format!("{} is not a valid resource type", name)))
}
