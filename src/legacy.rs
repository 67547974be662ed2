//! The v1 ("full building") API: buildings, blocks, their sub-resources and
//! the read-only type catalogs.

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::client::Client;
use crate::endpoint::{ApiVersion, Endpoint};
use crate::error::{Error, Result, join_values};
use crate::operations::ResourceOperations;
use crate::params::{Params, RequestParams, fix_legacy_params};
use crate::resources::{block_resource, resource_name, resource_type};

#[derive(Debug, Clone, Serialize)]
pub struct NewBuilding {
    pub assessment_type_id: i64,
    pub name: String,
    pub year_of_construction: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub reported_floor_area: f64,
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Params,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewBlock {
    pub shape_id: i64,
    pub name: String,
    pub floor_to_floor_height: f64,
    pub floor_to_ceiling_height: f64,
    pub is_above_ground: bool,
    pub number_of_floors: i64,
    pub orientation: f64,
    pub position: String,
    pub vertices: String,
    pub dimension_1: f64,
    pub dimension_2: f64,
    pub has_drop_ceiling: Option<bool>,
    #[serde(flatten)]
    pub extra: Params,
}

#[derive(Debug, serde::Deserialize)]
struct Validation {
    #[serde(default)]
    valid: bool,
    #[serde(default)]
    errors: Vec<Value>,
}

/// v1 view of a [`Client`] session.
#[derive(Debug, Clone, Copy)]
pub struct LegacyClient<'a> {
    client: &'a Client,
}

impl ResourceOperations for LegacyClient<'_> {
    fn session(&self) -> &Client {
        self.client
    }

    fn api_version(&self) -> ApiVersion {
        ApiVersion::V1
    }

    fn prepare(&self, params: Params) -> Params {
        fix_legacy_params(params)
    }
}

impl<'a> LegacyClient<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    // Buildings

    pub fn create_building(&self, building: &NewBuilding) -> Result<Value> {
        let params = building.to_request_map(&[], &[])?;
        self.create("buildings", params)
    }

    pub fn get_building(&self, building_id: i64) -> Result<Value> {
        self.fetch("buildings", building_id)
    }

    /// The rendered report as PDF bytes.
    pub fn get_building_pdf(&self, building_id: i64) -> Result<Vec<u8>> {
        let endpoint = Endpoint::new("buildings").id(building_id).action("report");
        let response = self.request(
            Method::GET,
            endpoint,
            Params::new(),
            "Unable to get building report",
        )?;
        Ok(response.into_bytes())
    }

    /// Streams the PDF report to `target`.
    pub fn download_building_pdf(&self, building_id: i64, target: &Path) -> Result<PathBuf> {
        let endpoint = Endpoint::new("buildings")
            .id(building_id)
            .action("report")
            .version(self.api_version());
        self.client
            .download(&endpoint, target, "Unable to download building report")
    }

    pub fn get_building_blocks(&self, building_id: i64) -> Result<Value> {
        self.list_children("buildings", building_id, "blocks")
    }

    pub fn get_building_resources(&self, resource: &str, building_id: i64) -> Result<Value> {
        let name = resource_name(resource)?;
        self.list_children("buildings", building_id, name)
    }

    pub fn get_building_score(&self, building_id: i64) -> Result<Value> {
        self.list_children("buildings", building_id, "score")
    }

    pub fn list_buildings(&self) -> Result<Value> {
        self.list("buildings")
    }

    /// CSV export covering `building_ids`.
    pub fn manage_buildings(&self, building_ids: &[i64]) -> Result<Vec<u8>> {
        if building_ids.is_empty() {
            return Err(Error::validation("building_ids is a compulsory field"));
        }
        let ids = building_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let mut params = Params::new();
        params.insert("building_ids".to_string(), Value::String(ids));
        let endpoint = Endpoint::new("manage_buildings")
            .action("csv")
            .allow_action_without_id();
        let response = self.request(Method::GET, endpoint, params, "Unable to export buildings")?;
        Ok(response.into_bytes())
    }

    pub fn simulate_building(&self, building_id: i64) -> Result<Value> {
        let endpoint = Endpoint::new("buildings").id(building_id).action("simulate");
        self.request(
            Method::POST,
            endpoint,
            Params::new(),
            "Unable to simulate building",
        )?
        .json()
    }

    pub fn update_building(&self, building_id: i64, params: &impl RequestParams) -> Result<Value> {
        let params = params.to_request_map(&[], &[])?;
        self.update("buildings", building_id, params)
    }

    pub fn delete_building(&self, building_id: i64) -> Result<()> {
        self.remove("buildings", building_id)
    }

    /// Succeeds only when BES reports the building as valid; otherwise fails
    /// with [`Error::Validation`] listing the reported problems.
    pub fn validate_building(&self, building_id: i64) -> Result<bool> {
        let endpoint = Endpoint::new("buildings").id(building_id).action("validate");
        let response = self.request(
            Method::GET,
            endpoint,
            Params::new(),
            "Unable to validate building",
        )?;
        let validation: Validation = response.json()?;
        if !validation.valid {
            return Err(Error::validation(format!(
                "Unable to validate building {}: {}",
                building_id,
                join_values(&validation.errors)
            )));
        }
        Ok(true)
    }

    // Building resources

    pub fn create_resource(
        &self,
        resource: &str,
        building_id: i64,
        params: &impl RequestParams,
    ) -> Result<Value> {
        let name = resource_name(resource)?;
        let params = params.to_request_map(&[], &[])?;
        self.create_child("buildings", building_id, name, params)
    }

    pub fn get_resource(&self, resource: &str, resource_id: i64) -> Result<Value> {
        self.fetch(resource_name(resource)?, resource_id)
    }

    pub fn update_resource(
        &self,
        resource: &str,
        resource_id: i64,
        params: &impl RequestParams,
    ) -> Result<Value> {
        let name = resource_name(resource)?;
        let params = params.to_request_map(&[], &[])?;
        self.update(name, resource_id, params)
    }

    pub fn delete_resource(&self, resource: &str, resource_id: i64) -> Result<()> {
        self.remove(resource_name(resource)?, resource_id)
    }

    // Type catalogs

    pub fn get_resource_type(&self, resource: &str, type_id: i64) -> Result<Value> {
        self.fetch(resource_type(resource)?, type_id)
    }

    pub fn list_resource_types(&self, resource: &str) -> Result<Value> {
        self.list(resource_type(resource)?)
    }

    // Blocks

    pub fn create_block(&self, building_id: i64, block: &NewBlock) -> Result<Value> {
        let params = block.to_request_map(&[], &[])?;
        self.create_child("buildings", building_id, "blocks", params)
    }

    pub fn get_block(&self, block_id: i64) -> Result<Value> {
        self.fetch("blocks", block_id)
    }

    pub fn update_block(
        &self,
        block_id: i64,
        shape_id: i64,
        params: &impl RequestParams,
    ) -> Result<Value> {
        let mut params = params.to_request_map(&["shape_id"], &[])?;
        params.insert("shape_id".to_string(), Value::from(shape_id));
        self.update("blocks", block_id, params)
    }

    pub fn delete_block(&self, block_id: i64) -> Result<()> {
        self.remove("blocks", block_id)
    }

    // Block resources

    /// `params` must carry the resource's foreign key, e.g. `air_handler_id`.
    pub fn create_block_resource(
        &self,
        resource: &str,
        block_id: i64,
        name: &str,
        params: &impl RequestParams,
    ) -> Result<Value> {
        let (path, fk) = block_resource(resource)?;
        let mut params = params.to_request_map(&["name"], &[fk])?;
        params.insert("name".to_string(), Value::from(name));
        self.create_child("blocks", block_id, path, params)
    }

    pub fn get_block_resource(&self, resource: &str, resource_id: i64) -> Result<Value> {
        let (path, _) = block_resource(resource)?;
        self.fetch(path, resource_id)
    }

    pub fn get_block_resources(&self, resource: &str, block_id: i64) -> Result<Value> {
        let (path, _) = block_resource(resource)?;
        self.list_children("blocks", block_id, path)
    }

    pub fn update_block_resource(
        &self,
        resource: &str,
        resource_id: i64,
        fk_id: i64,
        params: &impl RequestParams,
    ) -> Result<Value> {
        let (path, fk) = block_resource(resource)?;
        let mut params = params.to_request_map(&[fk], &[])?;
        params.insert(fk.to_string(), Value::from(fk_id));
        self.update(path, resource_id, params)
    }

    pub fn delete_block_resource(&self, resource: &str, resource_id: i64) -> Result<()> {
        let (path, _) = block_resource(resource)?;
        self.remove(path, resource_id)
    }
}
