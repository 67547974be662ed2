//! A blocking Rust client for the Building Energy Asset Score (BES) API.
//!
//! BES exposes two API generations: the legacy v1 API for full buildings,
//! blocks and their components, and the current v2 API for preview buildings
//! and users. A [`Client`] holds the session; [`Client::legacy`] and
//! [`Client::current`] give the per-generation calls. The [`workflow`] module
//! drives buildings through validation and simulation to a rated report.
//!
//! ## Quick start
//! - Configure authentication via environment variables (`BES_URL`, `BES_TOKEN`,
//!   or `BES_EMAIL`/`BES_PASSWORD`/`BES_ORGANIZATION_TOKEN`) or a `.besapirc`
//!   file (supported in the current directory and in your home directory).
//! - Call [`workflow::fetch_reports`] and iterate over the rated buildings.
//!
//! ```no_run
//! use anyhow::Result;
//! use besapi::Client;
//! use besapi::workflow::{Selection, fetch_reports};
//!
//! fn main() -> Result<()> {
//!     let client = Client::from_env()?;
//!     let mut incomplete = Vec::new();
//!     for (report, kind) in fetch_reports(&client, &mut incomplete, Selection::All, None)? {
//!         println!("{} {:?}", kind, report.get("bes_building_id"));
//!     }
//!     println!("{} buildings still running", incomplete.len());
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

mod client;
mod config;
mod current;
mod endpoint;
mod error;
mod legacy;
mod operations;
mod params;
pub mod property;
pub mod resources;
pub mod unroll;
pub mod workflow;

pub use client::{
    ApiResponse, Attachment, BASE_URL, Client, ClientConfig, Credentials, DEFAULT_TIMEOUT,
    Encoding, LEGACY_TIMEOUT, create_api_user,
};
pub use current::{CurrentClient, NewPreviewBuilding, NewUser, PreviewReport, UserUpdate, verify_password};
pub use endpoint::{ApiVersion, Endpoint, ResourceId};
pub use error::{Error, Result, check_call_success};
pub use legacy::{LegacyClient, NewBlock, NewBuilding};
pub use operations::ResourceOperations;
pub use params::{Params, RequestParams, excluded_keys, fix_legacy_params, params_from_map};
