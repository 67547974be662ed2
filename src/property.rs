//! Turning an external property record into a BES preview building.
//!
//! The record layout is `{"state": {...fields..., "extra_data": {...}}}`;
//! `extra_data` may override or supply fields the main state lacks.

use serde_json::{Map, Value};

use crate::current::{CurrentClient, NewPreviewBuilding};
use crate::error::{Error, Result};

/// Earliest construction year BES accepts.
pub const MIN_BES_YEAR: i64 = 1900;

const DEFAULT_ASSESSMENT_TYPE: &str = "Real";
const DEFAULT_ORIENTATION: &str = "North/South";
const ADDRESS_LINES: [&str; 2] = ["address_line_1", "address_line_2"];

/// Self-selected property types → BES use types. `None` marks types BES
/// has no equivalent for.
const PROPERTY_TYPES: &[(&str, Option<&str>)] = &[
    ("Adult Education", Some("Education")),
    ("Aquarium", None),
    ("Bank Branch", Some("Office")),
    ("Bar/Nightclub", Some("Retail")),
    ("Barracks", Some("Lodging")),
    ("College/University", Some("Education")),
    ("Convenience Store with Gas Station", Some("Retail")),
    ("Convenience Store without Gas Station", Some("Retail")),
    ("Courthouse", Some("Courthouse")),
    ("Data Center", None),
    ("Distribution Center", Some("Post Office")),
    ("Drinking Water Treatment & Distribution", None),
    ("Enclosed Mall", Some("Retail")),
    ("Energy/Power Station", None),
    ("Financial Office", Some("Office")),
    ("Fire Station", Some("Police Station")),
    ("Food Sales", None),
    ("Food Service", None),
    ("Hospital (General Medical & Surgical)", None),
    ("Hotel", Some("Lodging")),
    ("Ice/Curling Rink", None),
    ("Indoor Arena", Some("Community Center")),
    ("K-12 School", Some("Education")),
    ("Laboratory", None),
    ("Library", Some("Library")),
    ("Lifestyle Center", Some("Senior Center")),
    ("Mailing Center/Post Office", Some("Post Office")),
    ("Manufacturing/Industrial Plant", None),
    ("Medical Office", Some("Medical Office")),
    ("Mixed Use Property", None),
    ("Movie Theater", Some("Community Center")),
    ("Multifamily Housing", Some("Multi-family (4 floors or greater)")),
    ("Museum", Some("Community Center")),
    ("Non-Refrigerated Warehouse", Some("Warehouse non-refrigerated")),
    ("Office", Some("Office")),
    ("Other - Education", Some("Education")),
    ("Other - Entertainment/Public Assembly", Some("Community Center")),
    ("Other - Lodging/Residential", Some("Lodging")),
    ("Other - Office", Some("Office")),
    ("Other - Other", None),
    ("Other - Public Service", Some("City Hall")),
    ("Other - Recreation", Some("Community Center")),
    ("Other - Restaurant/Bar", None),
    ("Other - Retail/Mall", Some("Retail")),
    ("Other - Services", Some("Retail")),
    ("Other - Specialty Hospital", None),
    ("Other - Stadium", None),
    ("Other - Technology/Science", Some("Office")),
    ("Other - Utility", None),
    ("Outpatient Rehabilitation/Physical Therapy", Some("Medical Office")),
    ("Parking", Some("parking-garage")),
    ("Performing Arts", Some("Community Center")),
    ("Personal Services (Health/Beauty, Dry Cleaning, etc)", Some("Retail")),
    ("Police Station", Some("Police Station")),
    ("Pre-school/Daycare", Some("Education")),
    ("Prison/Incarceration", Some("Police Station")),
    ("Race Track", None),
    ("Refrigerated Warehouse", None),
    ("Repair Services (Vehicle, Shoe, Locksmith, etc)", Some("Retail")),
    ("Residence Hall/Dormitory", Some("Lodging")),
    ("Residential Care Facility", Some("Assisted Living Facility")),
    ("Restaurant", None),
    ("Retail Store", Some("Retail")),
    ("Roller Rink", Some("Community Center")),
    ("Self-Storage Facility", Some("Warehouse non-refrigerated")),
    ("Senior Care Community", Some("Assisted Living Facility")),
    ("Single Family Home", None),
    ("Social/Meeting Hall", Some("Community Center")),
    ("Stadium (Closed)", None),
    ("Stadium (Open)", None),
    ("Strip Mall", Some("Retail")),
    ("Supermarket/Grocery Store", None),
    ("Swimming Pool", None),
    ("Transportation Terminal/Station", None),
    ("Urgent Care/Clinic/Other Outpatient", Some("Medical Office")),
    ("Veterinary Office", Some("Medical Office")),
    ("Vocational School", Some("Education")),
    ("Wastewater Treatment Plant", None),
    ("Wholesale Club/Supercenter", Some("Retail")),
    ("Worship Facility", Some("Religious Building")),
    ("Zoo", None),
];

/// Clamps construction years before 1900 up to 1900.
pub fn convert_bes_year(year: i64) -> i64 {
    year.max(MIN_BES_YEAR)
}

/// Maps a self-selected property type onto the BES use type.
///
/// Types without a mapping (or mapped to nothing) pass through unchanged.
pub fn bes_property_type(value: &str) -> &str {
    PROPERTY_TYPES
        .iter()
        .find(|(k, _)| *k == value)
        .and_then(|(_, v)| *v)
        .unwrap_or(value)
}

/// Joins the non-empty address lines of `addr` with a space.
pub fn address_line(addr: &Map<String, Value>, parts: Option<&[&str]>) -> String {
    parts
        .unwrap_or(&ADDRESS_LINES)
        .iter()
        .filter_map(|k| addr.get(*k))
        .filter_map(non_empty_text)
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_empty_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Builds the preview-building payload for a property record. Every field
/// must end up non-empty.
pub fn preview_payload(property: &Value) -> Result<NewPreviewBuilding> {
    let empty = Map::new();
    let state = property
        .get("state")
        .and_then(Value::as_object)
        .ok_or_else(|| Error::validation("property record has no state"))?;
    let extra = state
        .get("extra_data")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let mut missing = Vec::new();
    let year = pick(extra, state, "year_completed")
        .or_else(|| state.get("year_built"))
        .and_then(as_i64)
        .map(convert_bes_year);
    let floor_area = state.get("gross_floor_area").and_then(Value::as_f64);
    let number_floors = extra.get("number_floors").and_then(as_i64);
    let use_type = state
        .get("property_type")
        .and_then(Value::as_str)
        .map(|t| Value::String(bes_property_type(t).to_string()));
    let street = Value::String(address_line(state, None));

    let payload = NewPreviewBuilding {
        building_name: required_text(&mut missing, "building_name", state.get("property_name")),
        year_completed: year.map(|y| y.to_string()).unwrap_or_default(),
        floor_area: floor_area.unwrap_or_default(),
        street: required_text(&mut missing, "street", Some(&street)),
        city: required_text(&mut missing, "city", state.get("city")),
        state: required_text(&mut missing, "state", state.get("state")),
        postal_code: required_text(&mut missing, "postal_code", state.get("postal_code")),
        assessment_type: pick(extra, state, "assessment_type")
            .and_then(non_empty_text)
            .unwrap_or_else(|| DEFAULT_ASSESSMENT_TYPE.to_string()),
        use_type: required_text(&mut missing, "use_type", use_type.as_ref()),
        orientation: pick(extra, state, "orientation")
            .and_then(non_empty_text)
            .unwrap_or_else(|| DEFAULT_ORIENTATION.to_string()),
        number_floors: number_floors.unwrap_or_default(),
    };

    if year.is_none() {
        missing.push("year_completed");
    }
    if floor_area.is_none_or(|a| a == 0.0) {
        missing.push("floor_area");
    }
    if number_floors.is_none_or(|n| n == 0) {
        missing.push("number_floors");
    }
    if !missing.is_empty() {
        return Err(Error::validation(format!(
            "One or more required values are Null: {}",
            missing.join(", ")
        )));
    }
    Ok(payload)
}

/// `extra_data` wins over the main state.
fn pick<'a>(
    extra: &'a Map<String, Value>,
    state: &'a Map<String, Value>,
    key: &str,
) -> Option<&'a Value> {
    extra
        .get(key)
        .filter(|v| !v.is_null())
        .or_else(|| state.get(key).filter(|v| !v.is_null()))
}

fn required_text(missing: &mut Vec<&'static str>, key: &'static str, v: Option<&Value>) -> String {
    match v.and_then(non_empty_text) {
        Some(s) => s,
        None => {
            missing.push(key);
            String::new()
        }
    }
}

fn as_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Creates a BES preview building from a property record.
pub fn create_preview_building_from_property(
    client: &CurrentClient<'_>,
    property: &Value,
) -> Result<Value> {
    let payload = preview_payload(property)?;
    client.create_preview_building(&payload)
}
