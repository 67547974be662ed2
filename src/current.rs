//! The v2 API: preview buildings and user management.

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::client::Client;
use crate::endpoint::{ApiVersion, Endpoint};
use crate::error::{Error, Result};
use crate::operations::ResourceOperations;
use crate::params::{Params, RequestParams};

const MIN_PASSWORD_CHARS: usize = 8;

#[derive(Debug, Clone, Serialize)]
pub struct NewPreviewBuilding {
    pub building_name: String,
    pub year_completed: String,
    pub floor_area: f64,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub assessment_type: String,
    pub use_type: String,
    pub orientation: String,
    pub number_floors: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub organization_token: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Alternate renderings of a preview building.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewReport {
    Simple,
    /// Score payload including the `pdf_url` of the rendered report.
    Pdf,
}

impl PreviewReport {
    fn action(self) -> &'static str {
        match self {
            PreviewReport::Simple => "simple",
            PreviewReport::Pdf => "report",
        }
    }
}

impl FromStr for PreviewReport {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(PreviewReport::Simple),
            "pdf" | "report" => Ok(PreviewReport::Pdf),
            _ => Err(Error::validation(format!("{} is not a valid report type", s))),
        }
    }
}

impl fmt::Display for PreviewReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.action())
    }
}

#[derive(Debug, serde::Deserialize)]
struct CreatedUser {
    id: i64,
    organization_id: i64,
    role_id: i64,
}

/// v2 view of a [`Client`] session.
#[derive(Debug, Clone, Copy)]
pub struct CurrentClient<'a> {
    client: &'a Client,
}

impl ResourceOperations for CurrentClient<'_> {
    fn session(&self) -> &Client {
        self.client
    }

    fn api_version(&self) -> ApiVersion {
        ApiVersion::V2
    }
}

impl<'a> CurrentClient<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    // Preview buildings

    pub fn create_preview_building(&self, building: &NewPreviewBuilding) -> Result<Value> {
        let building = building.to_request_map(&[], &[])?;
        self.create("preview_buildings", wrap_building(building))
    }

    pub fn get_preview_building(
        &self,
        building_id: i64,
        report: Option<PreviewReport>,
    ) -> Result<Value> {
        match report {
            None => self.fetch("preview_buildings", building_id),
            Some(report) => self.building_action(building_id, report.action()),
        }
    }

    pub fn list_preview_buildings(&self) -> Result<Value> {
        self.list("preview_buildings")
    }

    pub fn update_preview_building(
        &self,
        building_id: i64,
        block_id: i64,
        params: &impl RequestParams,
    ) -> Result<Value> {
        let mut building = params.to_request_map(&["block_id"], &[])?;
        building.insert("block_id".to_string(), Value::from(block_id));
        self.update("preview_buildings", building_id, wrap_building(building))
    }

    pub fn delete_preview_building(&self, building_id: i64) -> Result<()> {
        self.remove("preview_buildings", building_id)
    }

    pub fn duplicate_preview_building(&self, building_id: i64) -> Result<Value> {
        self.building_action(building_id, "duplicate")
    }

    pub fn simulate_preview_building(&self, building_id: i64) -> Result<Value> {
        self.building_action(building_id, "simulate")
    }

    pub fn validate_preview_building(&self, building_id: i64) -> Result<Value> {
        self.building_action(building_id, "validate")
    }

    fn building_action(&self, building_id: i64, action: &str) -> Result<Value> {
        let prefix = format!("Unable to {} preview building", action);
        let endpoint = Endpoint::new("preview_buildings")
            .id(building_id)
            .action(action);
        self.request(Method::GET, endpoint, Params::new(), &prefix)?
            .json()
    }

    // Users

    pub fn get_user(&self, user_id: i64) -> Result<Value> {
        self.fetch("users", user_id)
    }

    pub fn update_user(&self, user_id: i64, update: &UserUpdate) -> Result<()> {
        match (&update.password, &update.password_confirmation) {
            (None, None) => {}
            (Some(password), Some(confirmation)) => {
                check_passwords(password, confirmation)?;
            }
            _ => {
                return Err(Error::validation(
                    "Password and password_confirmation must be supplied",
                ));
            }
        }
        let params = update.to_request_map(&[], &[])?;
        self.update("users", user_id, params)?;
        Ok(())
    }

    pub(crate) fn create_user(&self, user: &NewUser) -> Result<(i64, i64, i64)> {
        check_passwords(&user.password, &user.password_confirmation)?;
        let params = user.to_request_map(&[], &["organization_token", "email"])?;
        let created: CreatedUser = serde_json::from_value(self.create("users", params)?)?;
        Ok((created.id, created.organization_id, created.role_id))
    }
}

fn wrap_building(building: Params) -> Params {
    let mut params = Params::new();
    params.insert("building".to_string(), Value::Object(building));
    params
}

fn check_passwords(password: &str, confirmation: &str) -> Result<()> {
    if password != confirmation {
        return Err(Error::validation("Passwords do not match!"));
    }
    verify_password(password, MIN_PASSWORD_CHARS)?;
    Ok(())
}

/// Enforces the BES password policy: at least `min_chars` characters with an
/// uppercase letter, a lowercase letter, a digit and a symbol.
pub fn verify_password(password: &str, min_chars: usize) -> Result<&str> {
    let rules: [(fn(&char) -> bool, &str); 4] = [
        (char::is_ascii_uppercase, "uppercase letter"),
        (char::is_ascii_lowercase, "lowercase letter"),
        (char::is_ascii_digit, "digit"),
        (char::is_ascii_punctuation, "symbol"),
    ];
    for (rule, what) in rules {
        if !password.chars().any(|c| rule(&c)) {
            return Err(Error::validation(format!(
                "Password must contain at least one {}",
                what
            )));
        }
    }
    if password.chars().count() < min_chars {
        return Err(Error::validation(format!(
            "Password must be at least {} characters long",
            min_chars
        )));
    }
    Ok(password)
}
