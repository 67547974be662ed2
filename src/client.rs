use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Method;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::config::load_config;
use crate::current::{CurrentClient, NewUser};
use crate::endpoint::{ApiVersion, Endpoint};
use crate::error::{Error, Result, check_call_success, render_value};
use crate::legacy::LegacyClient;
use crate::params::{Params, RequestParams, with_token};

/// Production API root.
pub const BASE_URL: &str = "https://buildingenergyscore.energy.gov/api";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout historically used against the v1 API. Too low for real traffic;
/// kept for callers that need to reproduce the old behaviour.
pub const LEGACY_TIMEOUT: Duration = Duration::from_millis(500);

/// Login details exchanged for a token by the `users/authenticate` endpoint.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub organization_token: String,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, typically `https://buildingenergyscore.energy.gov/api`.
    pub url: String,
    /// Version used when an endpoint does not name one.
    pub api_version: ApiVersion,
    /// Pre-obtained access token. Takes precedence over `credentials`.
    pub token: Option<String>,
    /// Exchanged for a token at construction when no token is given.
    pub credentials: Option<Credentials>,
    pub timeout: Duration,
    /// Whether to verify TLS certificates.
    pub verify: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: BASE_URL.to_string(),
            api_version: ApiVersion::V2,
            token: None,
            credentials: None,
            timeout: DEFAULT_TIMEOUT,
            verify: true,
        }
    }
}

/// Body encoding for `PUT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Json,
    Query,
}

/// A file sent as a multipart part alongside the request parameters.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub field: String,
    pub file_name: String,
    pub content: Vec<u8>,
    pub mime: Option<String>,
}

/// Status and raw body of a completed call.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parses the body; an empty body reads as `null`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.body
    }
}

/// A BES API session: base url, token and timeout shared by every call.
#[derive(Debug, Clone)]
pub struct Client {
    url: String,
    api_version: ApiVersion,
    token: Option<String>,
    user_id: Option<i64>,

    timeout: Duration,
    progress: bool,

    http: HttpClient,
}

#[derive(Debug, serde::Deserialize)]
struct AuthReply {
    user_id: i64,
    token: String,
}

impl Client {
    /// Creates a client from `BES_*` environment variables and/or `.besapirc`.
    ///
    /// This is equivalent to `Client::from_sources(None, None)`.
    pub fn from_env() -> Result<Self> {
        Self::from_sources(None, None)
    }

    /// Creates a client using (in order of precedence):
    /// - explicit `url`/`token` arguments
    /// - environment variables `BES_URL` / `BES_TOKEN` / `BES_EMAIL` / ...
    /// - config file from `BES_RC` or `.besapirc`
    pub fn from_sources(url: Option<String>, token: Option<String>) -> Result<Self> {
        Self::new(load_config(url, token)?)
    }

    /// Creates a client with a pre-obtained token.
    pub fn with_token(url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        Self::new(ClientConfig {
            url: url.into(),
            token: Some(token.into()),
            ..Default::default()
        })
    }

    /// Builds the session, authenticating first if only credentials are known.
    pub fn new(cfg: ClientConfig) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("besapi-rs/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("besapi-rs")),
        );

        let mut builder = HttpClient::builder().default_headers(default_headers);
        if !cfg.verify {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let http = builder.build()?;

        let mut client = Self {
            url: cfg.url.trim_end_matches('/').to_string(),
            api_version: cfg.api_version,
            token: cfg.token,
            user_id: None,
            timeout: cfg.timeout,
            progress: false,
            http,
        };

        if client.token.is_none() {
            if let Some(credentials) = &cfg.credentials {
                let (user_id, token) = client.authenticate(credentials)?;
                client.user_id = Some(user_id);
                client.token = Some(token);
            }
        }
        Ok(client)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_api_version(mut self, api_version: ApiVersion) -> Self {
        self.api_version = api_version;
        self
    }

    /// Show a progress bar while downloading reports.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Id of the authenticated user, known only after a credential login.
    pub fn user_id(&self) -> Option<i64> {
        self.user_id
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Full buildings, blocks and type catalogs (v1).
    pub fn legacy(&self) -> LegacyClient<'_> {
        LegacyClient::new(self)
    }

    /// Preview buildings and users (v2).
    pub fn current(&self) -> CurrentClient<'_> {
        CurrentClient::new(self)
    }

    fn authenticate(&self, credentials: &Credentials) -> Result<(i64, String)> {
        let mut params = credentials.to_request_map(&[], &[])?;
        params.insert(
            "password_confirmation".to_string(),
            Value::String(credentials.password.clone()),
        );
        let endpoint = Endpoint::new("users/authenticate").version(ApiVersion::V2);
        let response = self.post(&endpoint, params, &[])?;
        check_call_success(&response, Some("Unable to obtain access token"), None)?;
        let reply: AuthReply = response.json()?;
        debug!(user_id = reply.user_id, "authenticated");
        Ok((reply.user_id, reply.token))
    }

    pub fn get(&self, endpoint: &Endpoint, params: Params) -> Result<ApiResponse> {
        self.send(Method::GET, endpoint, params, Encoding::Query, &[])
    }

    pub fn post(
        &self,
        endpoint: &Endpoint,
        params: Params,
        files: &[Attachment],
    ) -> Result<ApiResponse> {
        self.send(Method::POST, endpoint, params, Encoding::Json, files)
    }

    pub fn put(
        &self,
        endpoint: &Endpoint,
        params: Params,
        encoding: Encoding,
        files: &[Attachment],
    ) -> Result<ApiResponse> {
        self.send(Method::PUT, endpoint, params, encoding, files)
    }

    pub fn patch(
        &self,
        endpoint: &Endpoint,
        params: Params,
        files: &[Attachment],
    ) -> Result<ApiResponse> {
        self.send(Method::PATCH, endpoint, params, Encoding::Json, files)
    }

    pub fn delete(&self, endpoint: &Endpoint, params: Params) -> Result<ApiResponse> {
        self.send(Method::DELETE, endpoint, params, Encoding::Query, &[])
    }

    fn send(
        &self,
        method: Method,
        endpoint: &Endpoint,
        params: Params,
        encoding: Encoding,
        files: &[Attachment],
    ) -> Result<ApiResponse> {
        if encoding == Encoding::Query && !files.is_empty() {
            return Err(Error::validation(
                "attachments cannot be sent with query encoding",
            ));
        }
        let url = endpoint.resolve(&self.url, self.api_version)?;
        let params = with_token(params, self.token.as_deref());
        debug!(%method, %url, "BES request");

        let req = self.http.request(method, &url).timeout(self.timeout);
        let req = match encoding {
            Encoding::Query => req.query(&query_pairs(&params)),
            Encoding::Json if !files.is_empty() => req.multipart(multipart_form(&params, files)?),
            Encoding::Json => req.json(&params),
        };

        let mut resp = req.send()?;
        let status = resp.status().as_u16();
        let mut body = Vec::new();
        resp.read_to_end(&mut body)?;
        debug!(status, bytes = body.len(), "BES response");
        Ok(ApiResponse { status, body })
    }

    /// Streams the response of a `GET` on `endpoint` into `target`.
    pub(crate) fn download(
        &self,
        endpoint: &Endpoint,
        target: &Path,
        prefix: &str,
    ) -> Result<PathBuf> {
        let url = endpoint.resolve(&self.url, self.api_version)?;
        let params = with_token(Params::new(), self.token.as_deref());
        let mut resp = self
            .http
            .get(&url)
            .timeout(self.timeout)
            .query(&query_pairs(&params))
            .send()?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let mut body = Vec::new();
            resp.read_to_end(&mut body)?;
            check_call_success(&ApiResponse { status, body }, Some(prefix), None)?;
        }

        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let pb = if self.progress {
            let pb = ProgressBar::new(resp.content_length().unwrap_or(0));
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.green} {bytes}/{total_bytes} ({bytes_per_sec}) {wide_bar} {eta}",
            ) {
                pb.set_style(style.progress_chars("=>-"));
            }
            Some(pb)
        } else {
            None
        };

        let mut out = File::create(target)?;
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = resp.read(&mut buf)?;
            if n == 0 {
                break;
            }
            out.write_all(&buf[..n])?;
            if let Some(pb) = &pb {
                pb.inc(n as u64);
            }
        }
        out.flush()?;
        if let Some(pb) = &pb {
            pb.finish_and_clear();
        }
        Ok(target.to_path_buf())
    }
}

fn query_pairs(params: &Params) -> Vec<(String, String)> {
    params
        .iter()
        .map(|(k, v)| (k.clone(), render_value(v)))
        .collect()
}

fn multipart_form(params: &Params, files: &[Attachment]) -> Result<Form> {
    let mut form = Form::new();
    for (k, v) in params {
        form = form.text(k.clone(), render_value(v));
    }
    for file in files {
        let mut part = Part::bytes(file.content.clone()).file_name(file.file_name.clone());
        if let Some(mime) = &file.mime {
            part = part.mime_str(mime)?;
        }
        form = form.part(file.field.clone(), part);
    }
    Ok(form)
}

/// Registers a new API user and returns `(id, organization_id, role_id)`.
///
/// Needs no token; `config` only supplies the url and timeout.
pub fn create_api_user(config: ClientConfig, user: &NewUser) -> Result<(i64, i64, i64)> {
    let client = Client::new(ClientConfig {
        token: None,
        credentials: None,
        ..config
    })?;
    client.current().create_user(user)
}
