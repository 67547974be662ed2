//! Driving BES buildings to a rated report.
//!
//! BES simulates asynchronously: a building moves `Editing → Running → Rated`
//! and the only way to learn about progress is to re-read its status. The
//! helpers here kick off validation and simulation when a building is idle
//! and assemble the report once it is rated; callers poll by calling again.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{error, info, warn};

use crate::client::Client;
use crate::current::{CurrentClient, PreviewReport};
use crate::endpoint::site_root;
use crate::error::{Error, Result};
use crate::legacy::LegacyClient;

/// `status_type_id → display name`, from the `status_types` catalog.
pub type StatusMap = HashMap<i64, String>;

/// Outcome of one pass over a building: the report if it is rated, plus the
/// last status seen.
pub type Outcome = (Option<Report>, Option<BuildingStatus>);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BuildingStatus {
    Editing,
    Running,
    Rated,
    Submitted,
    Other(String),
}

impl BuildingStatus {
    pub fn is_rated(&self) -> bool {
        matches!(self, BuildingStatus::Rated)
    }

    /// `Running` or `Rated`: nothing to start.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, BuildingStatus::Running | BuildingStatus::Rated)
    }

    pub fn as_str(&self) -> &str {
        match self {
            BuildingStatus::Editing => "Editing",
            BuildingStatus::Running => "Running",
            BuildingStatus::Rated => "Rated",
            BuildingStatus::Submitted => "Submitted",
            BuildingStatus::Other(s) => s,
        }
    }
}

impl From<&str> for BuildingStatus {
    fn from(s: &str) -> Self {
        match s {
            "Editing" => BuildingStatus::Editing,
            "Running" => BuildingStatus::Running,
            "Rated" => BuildingStatus::Rated,
            "Submitted" => BuildingStatus::Submitted,
            other => BuildingStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for BuildingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BuildingKind {
    Full,
    Preview,
}

impl fmt::Display for BuildingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildingKind::Full => f.write_str("Full"),
            BuildingKind::Preview => f.write_str("Preview"),
        }
    }
}

/// A building that did not reach `Rated` during a [`BuildingReports`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncompleteBldg {
    pub bldg_id: i64,
    pub bldg_type: BuildingKind,
    pub status: Option<BuildingStatus>,
}

/// Frozen report for a rated building.
///
/// Base record fields, then score fields, then derived fields; later layers
/// win on key collisions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Report(Map<String, Value>);

impl Report {
    fn merge(base: Map<String, Value>, score: Map<String, Value>, derived: Map<String, Value>) -> Self {
        let mut fields = base;
        fields.extend(score);
        fields.extend(derived);
        Report(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Fetches the status catalog once; reuse it across buildings.
pub fn full_status_map(legacy: &LegacyClient<'_>) -> Result<StatusMap> {
    let statuses = legacy.list_resource_types("status")?;
    Ok(statuses
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .filter_map(|s| {
            let id = s.get("id")?.as_i64()?;
            let name = s.get("display_name")?.as_str()?;
            Some((id, name.to_string()))
        })
        .collect())
}

fn full_status(building: &Value, status_map: &StatusMap) -> Option<BuildingStatus> {
    let id = building.get("status_type_id")?.as_i64()?;
    status_map.get(&id).map(|s| BuildingStatus::from(s.as_str()))
}

fn preview_status(building: &Value) -> Option<BuildingStatus> {
    building
        .get("status!")
        .and_then(Value::as_str)
        .map(BuildingStatus::from)
}

fn record_id(record: &Value, key: &str) -> Result<i64> {
    record
        .get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| Error::validation("building_id must be an integer"))
}

fn into_object(v: Value) -> Map<String, Value> {
    match v {
        Value::Object(m) => m,
        _ => Map::new(),
    }
}

/// Validates and simulates a full building, then re-reads its status.
///
/// Validation and simulation failures are logged only; BES is unreliable
/// about reporting them.
pub fn initiate_full_simulation(
    legacy: &LegacyClient<'_>,
    building_id: i64,
    status_map: &StatusMap,
) -> Result<Option<BuildingStatus>> {
    let started = legacy
        .validate_building(building_id)
        .and_then(|_| legacy.simulate_building(building_id));
    if let Err(err) = started {
        error!(building_id, "Error validating or simulating: {}", err);
    }
    let building = legacy.get_building(building_id)?;
    Ok(full_status(&building, status_map))
}

/// One polling pass over a full building record.
///
/// Fails only if `building` has no integer `id`; remote errors end up in
/// the log and the returned status.
pub fn full_report(client: &Client, building: &Value, status_map: &StatusMap) -> Result<Outcome> {
    let legacy = client.legacy();
    let building_id = record_id(building, "id")?;
    let mut status = full_status(building, status_map);

    if !status.as_ref().is_some_and(BuildingStatus::is_in_progress) {
        status = match initiate_full_simulation(&legacy, building_id, status_map) {
            Ok(s) => s,
            Err(err) => {
                error!(building_id, "Error getting status for full building: {}", err);
                return Ok((None, status));
            }
        };
    }

    if !status.as_ref().is_some_and(BuildingStatus::is_rated) {
        info!(building_id, status = ?status, "full building not rated yet");
        return Ok((None, status));
    }

    let score = match legacy.get_building_score(building_id) {
        Ok(score) => score,
        Err(err) => {
            error!(building_id, "Error getting score for full building: {}", err);
            return Ok((None, status));
        }
    };
    let score = into_object(score.get("score").cloned().unwrap_or(Value::Null));

    let mut derived = Map::new();
    derived.insert(
        "pdf_url".into(),
        Value::String(full_pdf_url(client.url(), building_id)),
    );
    derived.insert(
        "number_floors".into(),
        Value::from(
            building
                .get("floors")
                .and_then(Value::as_array)
                .map_or(0, Vec::len),
        ),
    );
    derived.insert("property_type".into(), property_type(building));
    derived.insert("bes_type".into(), Value::from(BuildingKind::Full.to_string()));
    derived.insert("bes_building_id".into(), Value::from(building_id));
    derived.insert("bes_status".into(), Value::from(BuildingStatus::Rated.as_str()));

    let report = Report::merge(into_object(building.clone()), score, derived);
    Ok((Some(report), status))
}

/// v1 score replies omit the report link, but it always lives at
/// `{site}/buildings/{id}/report.pdf`.
fn full_pdf_url(base_url: &str, building_id: i64) -> String {
    format!("{}/buildings/{}/report.pdf", site_root(base_url), building_id)
}

/// Display name of the building's first use type.
fn property_type(building: &Value) -> Value {
    building
        .get("use_types")
        .and_then(Value::as_array)
        .and_then(|types| types.first())
        .and_then(|t| t.get("display_name"))
        .cloned()
        .unwrap_or(Value::Null)
}

/// Validates and simulates a preview building, then re-reads its status.
pub fn initiate_preview_simulation(
    current: &CurrentClient<'_>,
    building_id: i64,
) -> Result<Option<BuildingStatus>> {
    let started = current
        .validate_preview_building(building_id)
        .and_then(|_| current.simulate_preview_building(building_id));
    if let Err(err) = started {
        error!(
            building_id,
            "Error validating or simulating: {}, Asset Score ID: {}", err, building_id
        );
    }
    let building = current.get_preview_building(building_id, None)?;
    Ok(preview_status(&building))
}

/// One polling pass over a preview building. `status` saves a round trip
/// when the caller already knows it.
pub fn preview_report(client: &Client, building_id: i64, status: Option<BuildingStatus>) -> Outcome {
    let current = client.current();
    let mut status = match status {
        Some(s) => Some(s),
        None => match current.get_preview_building(building_id, None) {
            Ok(building) => preview_status(&building),
            Err(err) => {
                error!(building_id, "Error getting preview building: {}", err);
                return (None, None);
            }
        },
    };

    if !status.as_ref().is_some_and(BuildingStatus::is_in_progress) {
        status = match initiate_preview_simulation(&current, building_id) {
            Ok(s) => s,
            Err(err) => {
                error!(building_id, "Error getting status for preview building: {}", err);
                return (None, status);
            }
        };
    }

    if !status.as_ref().is_some_and(BuildingStatus::is_rated) {
        info!(building_id, status = ?status, "preview building not rated yet");
        return (None, status);
    }

    let assembled = current
        .get_preview_building(building_id, Some(PreviewReport::Pdf))
        .and_then(|score| Ok((score, client.legacy().get_building(building_id)?)));
    let (score, base) = match assembled {
        Ok(parts) => parts,
        Err(err) => {
            error!(
                building_id,
                "Error getting score for preview building: {}, Asset Score ID: {}",
                err,
                building_id
            );
            return (None, status);
        }
    };

    let mut score = into_object(score);
    let pdf_url = score.remove("pdf_url").unwrap_or(Value::Null);
    score.remove("name");
    score.remove("id");

    let mut derived = Map::new();
    derived.insert("bes_type".into(), Value::from(BuildingKind::Preview.to_string()));
    derived.insert("bes_building_id".into(), Value::from(building_id));
    derived.insert("bes_status".into(), Value::from(BuildingStatus::Rated.as_str()));
    derived.insert("pdf_url".into(), pdf_url);

    (Some(Report::merge(into_object(base), score, derived)), status)
}

/// Which buildings a [`BuildingReports`] run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every full building, with preview-listed ids routed to the preview
    /// workflow.
    All,
    /// These full building ids.
    Full(Vec<i64>),
    /// These preview building ids.
    Preview(Vec<i64>),
}

/// Lazily yields `(report, kind)` for every rated building; one building's
/// round trips happen per call to `next`.
///
/// Buildings that are not rated yet are appended to the caller's
/// `incomplete` list instead.
pub struct BuildingReports<'a> {
    client: &'a Client,
    status_map: StatusMap,
    preview_ids: HashSet<i64>,
    candidates: std::vec::IntoIter<Candidate>,
    incomplete: &'a mut Vec<IncompleteBldg>,
}

/// A listed record, or an id whose record is fetched when its turn comes.
enum Candidate {
    Listed(Value),
    Full(i64),
    Preview(i64),
}

/// Prepares a [`BuildingReports`] run.
///
/// `status_map` is fetched when not supplied. With [`Selection::All`] the
/// listings are fetched here; failures are logged and the run is empty.
/// Explicitly selected buildings are fetched as iteration reaches them, and
/// one that cannot be fetched is recorded as incomplete with no status.
pub fn fetch_reports<'a>(
    client: &'a Client,
    incomplete: &'a mut Vec<IncompleteBldg>,
    selection: Selection,
    status_map: Option<StatusMap>,
) -> Result<BuildingReports<'a>> {
    let status_map = match status_map {
        Some(map) => map,
        None => full_status_map(&client.legacy())?,
    };

    let (candidates, preview_ids): (Vec<Candidate>, HashSet<i64>) = match selection {
        Selection::Full(ids) => (ids.into_iter().map(Candidate::Full).collect(), HashSet::new()),
        Selection::Preview(ids) => (
            ids.iter().copied().map(Candidate::Preview).collect(),
            ids.into_iter().collect(),
        ),
        Selection::All => {
            let legacy = client.legacy();
            let listed = legacy
                .list_buildings()
                .and_then(|all| Ok((all, client.current().list_preview_buildings()?)));
            match listed {
                Ok((all, previews)) => {
                    let preview_ids = previews
                        .as_array()
                        .map(Vec::as_slice)
                        .unwrap_or_default()
                        .iter()
                        .filter_map(|b| b.get("building_id").and_then(Value::as_i64))
                        .collect();
                    let listed = into_array(all).into_iter().map(Candidate::Listed).collect();
                    (listed, preview_ids)
                }
                Err(err) => {
                    error!("Error downloading: {}", err);
                    (Vec::new(), HashSet::new())
                }
            }
        }
    };

    Ok(BuildingReports {
        client,
        status_map,
        preview_ids,
        candidates: candidates.into_iter(),
        incomplete,
    })
}

fn into_array(v: Value) -> Vec<Value> {
    match v {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

/// Id and status of a listed record from either generation.
fn identify(record: &Value, status_map: &StatusMap) -> Option<(i64, Option<BuildingStatus>)> {
    match (record.get("id").and_then(Value::as_i64), record.get("status_type_id")) {
        (Some(id), Some(_)) => Some((id, full_status(record, status_map))),
        _ => {
            let id = record.get("building_id").and_then(Value::as_i64)?;
            Some((id, preview_status(record)))
        }
    }
}

impl Iterator for BuildingReports<'_> {
    type Item = (Report, BuildingKind);

    fn next(&mut self) -> Option<Self::Item> {
        for candidate in self.candidates.by_ref() {
            let (record, requested) = match candidate {
                Candidate::Listed(record) => (record, None),
                Candidate::Full(id) => match self.client.legacy().get_building(id) {
                    Ok(record) => (record, Some(id)),
                    Err(err) => {
                        error!(building_id = id, "Error getting full building: {}", err);
                        self.incomplete.push(IncompleteBldg {
                            bldg_id: id,
                            bldg_type: BuildingKind::Full,
                            status: None,
                        });
                        continue;
                    }
                },
                Candidate::Preview(id) => match self.client.current().get_preview_building(id, None) {
                    Ok(record) => (record, Some(id)),
                    Err(err) => {
                        error!(building_id = id, "Error getting preview building: {}", err);
                        self.incomplete.push(IncompleteBldg {
                            bldg_id: id,
                            bldg_type: BuildingKind::Preview,
                            status: None,
                        });
                        continue;
                    }
                },
            };
            // A selected building keeps the id it was requested under.
            let identified = identify(&record, &self.status_map).or_else(|| {
                requested.map(|id| {
                    let status = full_status(&record, &self.status_map)
                        .or_else(|| preview_status(&record));
                    (id, status)
                })
            });
            let Some((bldg_id, status)) = identified else {
                warn!("skipping BES record without a building id");
                continue;
            };

            let (kind, outcome) = if self.preview_ids.contains(&bldg_id) {
                let outcome = preview_report(self.client, bldg_id, status);
                (BuildingKind::Preview, outcome)
            } else {
                let outcome = full_report(self.client, &record, &self.status_map)
                    .unwrap_or_else(|err| {
                        error!(bldg_id, "Error processing full building: {}", err);
                        (None, status)
                    });
                (BuildingKind::Full, outcome)
            };

            match outcome {
                (Some(report), _) => return Some((report, kind)),
                (None, status) => self.incomplete.push(IncompleteBldg {
                    bldg_id,
                    bldg_type: kind,
                    status,
                }),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn status_map() -> StatusMap {
        [(1, "Editing"), (2, "Running"), (3, "Rated"), (4, "Submitted")]
            .into_iter()
            .map(|(k, v)| (k, v.to_string()))
            .collect()
    }

    #[test]
    fn pdf_url_follows_site_root() {
        assert_eq!(
            full_pdf_url("http://baseurl.xx/api", 1),
            "http://baseurl.xx/buildings/1/report.pdf"
        );
    }

    #[test]
    fn property_type_from_first_use_type() {
        let b = json!({"use_types": [{"display_name": "Office", "id": 4}, {"display_name": "Retail"}]});
        assert_eq!(property_type(&b), json!("Office"));
        assert_eq!(property_type(&json!({"use_types": []})), Value::Null);
    }

    #[test]
    fn statuses_parse() {
        assert_eq!(BuildingStatus::from("Rated"), BuildingStatus::Rated);
        assert_eq!(
            BuildingStatus::from("Pending"),
            BuildingStatus::Other("Pending".into())
        );
        assert!(BuildingStatus::Running.is_in_progress());
        assert!(!BuildingStatus::Submitted.is_in_progress());
        assert_eq!(BuildingStatus::Other("X".into()).to_string(), "X");
    }

    #[test]
    fn full_status_via_map() {
        let map = status_map();
        assert_eq!(full_status(&json!({"status_type_id": 3}), &map), Some(BuildingStatus::Rated));
        assert_eq!(full_status(&json!({"status_type_id": 9}), &map), None);
        assert_eq!(preview_status(&json!({"status!": "Editing"})), Some(BuildingStatus::Editing));
    }

    #[test]
    fn report_layers_derived_last() {
        let base = into_object(json!({"id": 1, "name": "base", "pdf_url": "old"}));
        let score = into_object(json!({"source_eui": 12.5, "name": "score"}));
        let derived = into_object(json!({"pdf_url": "new", "bes_type": "Full"}));
        let report = Report::merge(base, score, derived);
        assert_eq!(report.get("pdf_url"), Some(&json!("new")));
        assert_eq!(report.get("name"), Some(&json!("score")));
        assert_eq!(report.len(), 5);
        assert_eq!(serde_json::to_value(&report).unwrap(), report.clone().into_value());
    }

    #[test]
    fn full_report_requires_integer_id() {
        let client = Client::with_token("http://127.0.0.1:9", "token").unwrap();
        let err = full_report(&client, &json!({"id": "x"}), &status_map()).unwrap_err();
        assert_eq!(err.to_string(), "building_id must be an integer");
    }

    #[test]
    fn records_identify_by_generation() {
        let map = status_map();
        assert_eq!(
            identify(&json!({"id": 4, "status_type_id": 2}), &map),
            Some((4, Some(BuildingStatus::Running)))
        );
        assert_eq!(
            identify(&json!({"id": 4, "building_id": 7, "status!": "Rated"}), &map),
            Some((7, Some(BuildingStatus::Rated)))
        );
        assert_eq!(identify(&json!({"name": "orphan"}), &map), None);
    }

    #[test]
    fn kinds_display() {
        assert_eq!(BuildingKind::Full.to_string(), "Full");
        assert_eq!(BuildingKind::Preview.to_string(), "Preview");
    }
}
