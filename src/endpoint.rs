use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Versioned path prefix, rendered as `v<N>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ApiVersion(pub u32);

impl ApiVersion {
    /// Full buildings, blocks and type catalogs.
    pub const V1: ApiVersion = ApiVersion(1);
    /// Preview buildings and users.
    pub const V2: ApiVersion = ApiVersion(2);
}

impl Default for ApiVersion {
    fn default() -> Self {
        ApiVersion::V2
    }
}

impl From<u32> for ApiVersion {
    fn from(v: u32) -> Self {
        ApiVersion(v)
    }
}

impl FromStr for ApiVersion {
    type Err = Error;

    /// Accepts `"2"`, `"v2"` and `"V2"`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let digits = s
            .strip_prefix('v')
            .or_else(|| s.strip_prefix('V'))
            .unwrap_or(s);
        digits
            .parse::<u32>()
            .map(ApiVersion)
            .map_err(|_| Error::validation(format!("{} is not a valid api version", s)))
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Resource id as supplied by the caller; must turn out to be an integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceId {
    Int(i64),
    Text(String),
}

impl ResourceId {
    fn to_int(&self) -> Result<i64> {
        match self {
            ResourceId::Int(i) => Ok(*i),
            ResourceId::Text(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| Error::validation(format!("id must be an integer, got {}", s))),
        }
    }
}

impl From<i64> for ResourceId {
    fn from(v: i64) -> Self {
        ResourceId::Int(v)
    }
}

impl From<i32> for ResourceId {
    fn from(v: i32) -> Self {
        ResourceId::Int(v.into())
    }
}

impl From<u32> for ResourceId {
    fn from(v: u32) -> Self {
        ResourceId::Int(v.into())
    }
}

impl From<&str> for ResourceId {
    fn from(v: &str) -> Self {
        ResourceId::Text(v.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(v: String) -> Self {
        ResourceId::Text(v)
    }
}

/// One API endpoint: `{base}/{version}/{resource}[/{id}][/{action}]`.
///
/// Anything not set here falls back to the session defaults in
/// [`Endpoint::resolve`].
#[derive(Debug, Clone, Default)]
pub struct Endpoint {
    resource: String,
    id: Option<ResourceId>,
    action: Option<String>,
    version: Option<ApiVersion>,
    base_url: Option<String>,
    action_without_id: bool,
}

impl Endpoint {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            ..Default::default()
        }
    }

    pub fn id(mut self, id: impl Into<ResourceId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn version(mut self, version: impl Into<ApiVersion>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Permits an action on the collection itself (e.g. `manage_buildings/csv`).
    pub fn allow_action_without_id(mut self) -> Self {
        self.action_without_id = true;
        self
    }

    pub fn resolve(&self, default_base: &str, default_version: ApiVersion) -> Result<String> {
        let base = self
            .base_url
            .as_deref()
            .unwrap_or(default_base)
            .trim_end_matches('/');
        let version = self.version.unwrap_or(default_version);
        let resource = self.resource.trim_matches('/');

        let mut url = format!("{}/{}/{}", base, version, resource);
        match &self.id {
            Some(id) => url.push_str(&format!("/{}", id.to_int()?)),
            None if self.action.is_some() && !self.action_without_id => {
                return Err(Error::validation("id must be supplied with action"));
            }
            None => {}
        }
        if let Some(action) = &self.action {
            url.push('/');
            url.push_str(action.trim_matches('/'));
        }
        Ok(url)
    }
}

/// Host root of an API base url, e.g. `https://host/api` → `https://host`.
pub(crate) fn site_root(base: &str) -> &str {
    let b = base.trim_end_matches('/');
    b.strip_suffix("/api").unwrap_or(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://api.labworks.org/api";

    fn url(e: Endpoint) -> Result<String> {
        e.resolve(BASE, ApiVersion::V2)
    }

    #[test]
    fn resource_only() {
        assert_eq!(url(Endpoint::new("endpoint")).unwrap(), format!("{BASE}/v2/endpoint"));
        assert_eq!(url(Endpoint::new("/endpoint/")).unwrap(), format!("{BASE}/v2/endpoint"));
    }

    #[test]
    fn with_id_and_action() {
        assert_eq!(
            url(Endpoint::new("endpoint").id(1)).unwrap(),
            format!("{BASE}/v2/endpoint/1")
        );
        assert_eq!(
            url(Endpoint::new("endpoint").id(1).action("/action")).unwrap(),
            format!("{BASE}/v2/endpoint/1/action")
        );
    }

    #[test]
    fn full_composition() {
        let u = Endpoint::new("buildings")
            .id(5)
            .action("simulate")
            .version(2)
            .resolve("https://x/api", ApiVersion::V1)
            .unwrap();
        assert_eq!(u, "https://x/api/v2/buildings/5/simulate");
    }

    #[test]
    fn base_url_and_version_overrides() {
        assert_eq!(
            url(Endpoint::new("endpoint").base_url("baseurl/")).unwrap(),
            "baseurl/v2/endpoint"
        );
        let v1: ApiVersion = "v1".parse().unwrap();
        assert_eq!(
            url(Endpoint::new("endpoint").version(v1)).unwrap(),
            format!("{BASE}/v1/endpoint")
        );
    }

    #[test]
    fn string_ids_are_coerced() {
        let v: ApiVersion = "1".parse().unwrap();
        assert_eq!(
            url(Endpoint::new("endpoint").version(v).id("2").action("action")).unwrap(),
            format!("{BASE}/v1/endpoint/2/action")
        );
        assert!(matches!(
            url(Endpoint::new("endpoint").id("two")),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn action_requires_id() {
        let err = url(Endpoint::new("endpoint").action("action")).unwrap_err();
        assert_eq!(err.to_string(), "id must be supplied with action");
        assert_eq!(
            url(Endpoint::new("manage_buildings").action("csv").allow_action_without_id())
                .unwrap(),
            format!("{BASE}/v2/manage_buildings/csv")
        );
    }

    #[test]
    fn version_parsing() {
        assert_eq!("V3".parse::<ApiVersion>().unwrap(), ApiVersion(3));
        assert_eq!(ApiVersion::from(1).to_string(), "v1");
        assert!("latest".parse::<ApiVersion>().is_err());
    }

    #[test]
    fn site_root_strips_api_suffix() {
        assert_eq!(site_root("http://baseurl.xx/api"), "http://baseurl.xx");
        assert_eq!(site_root("http://baseurl.xx/api/"), "http://baseurl.xx");
        assert_eq!(site_root("http://127.0.0.1:1234"), "http://127.0.0.1:1234");
    }
}
