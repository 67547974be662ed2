use reqwest::Method;
use serde_json::Value;

use crate::client::{ApiResponse, Client, Encoding};
use crate::endpoint::{ApiVersion, Endpoint, ResourceId};
use crate::error::{Error, Result, check_call_success};
use crate::params::Params;

/// Generic resource calls shared by both API generations.
///
/// Implementors pick the version prefix and may rewrite parameters before
/// they are sent; everything else is common.
pub trait ResourceOperations {
    fn session(&self) -> &Client;

    fn api_version(&self) -> ApiVersion;

    /// Last chance to adjust parameters for the generation's quirks.
    fn prepare(&self, params: Params) -> Params {
        params
    }

    /// Sends one request and fails with [`Error::Api`] on a non-2xx reply.
    fn request(
        &self,
        method: Method,
        endpoint: Endpoint,
        params: Params,
        prefix: &str,
    ) -> Result<ApiResponse> {
        let endpoint = endpoint.version(self.api_version());
        let params = self.prepare(params);
        let session = self.session();
        let response = match method {
            Method::GET => session.get(&endpoint, params)?,
            Method::POST => session.post(&endpoint, params, &[])?,
            Method::PUT => session.put(&endpoint, params, Encoding::Json, &[])?,
            Method::PATCH => session.patch(&endpoint, params, &[])?,
            Method::DELETE => session.delete(&endpoint, params)?,
            other => {
                return Err(Error::validation(format!("unsupported method {}", other)));
            }
        };
        check_call_success(&response, Some(prefix), None)?;
        Ok(response)
    }

    fn create(&self, resource: &str, params: Params) -> Result<Value> {
        let prefix = format!("Unable to create {}", resource);
        self.request(Method::POST, Endpoint::new(resource), params, &prefix)?
            .json()
    }

    /// `POST {parent}/{id}/{child}`.
    fn create_child(
        &self,
        parent: &str,
        parent_id: impl Into<ResourceId>,
        child: &str,
        params: Params,
    ) -> Result<Value> {
        let prefix = format!("Unable to create {}", child);
        let endpoint = Endpoint::new(parent).id(parent_id).action(child);
        self.request(Method::POST, endpoint, params, &prefix)?.json()
    }

    fn fetch(&self, resource: &str, id: impl Into<ResourceId>) -> Result<Value> {
        let prefix = format!("Unable to get {}", resource);
        self.request(Method::GET, Endpoint::new(resource).id(id), Params::new(), &prefix)?
            .json()
    }

    fn list(&self, resource: &str) -> Result<Value> {
        let prefix = format!("Unable to list {}", resource);
        self.request(Method::GET, Endpoint::new(resource), Params::new(), &prefix)?
            .json()
    }

    /// `GET {parent}/{id}/{child}`.
    fn list_children(
        &self,
        parent: &str,
        parent_id: impl Into<ResourceId>,
        child: &str,
    ) -> Result<Value> {
        let prefix = format!("Unable to get {}", child);
        let endpoint = Endpoint::new(parent).id(parent_id).action(child);
        self.request(Method::GET, endpoint, Params::new(), &prefix)?.json()
    }

    fn update(&self, resource: &str, id: impl Into<ResourceId>, params: Params) -> Result<Value> {
        let prefix = format!("Unable to update {}", resource);
        self.request(Method::PUT, Endpoint::new(resource).id(id), params, &prefix)?
            .json()
    }

    fn remove(&self, resource: &str, id: impl Into<ResourceId>) -> Result<()> {
        let prefix = format!("Unable to delete {}", resource);
        self.request(Method::DELETE, Endpoint::new(resource).id(id), Params::new(), &prefix)?;
        Ok(())
    }
}
