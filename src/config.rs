use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::{BASE_URL, ClientConfig, Credentials};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct RcConfig {
    url: Option<String>,
    token: Option<String>,
    email: Option<String>,
    password: Option<String>,
    organization_token: Option<String>,
    timeout: Option<f64>,
    verify: Option<bool>,
}

/// Resolves client configuration, in order of precedence, from explicit
/// arguments, `BES_*` environment variables and the first `.besapirc` found.
pub(crate) fn load_config(url: Option<String>, token: Option<String>) -> Result<ClientConfig> {
    let mut url = url.or_else(|| env("BES_URL"));
    let mut token = token.or_else(|| env("BES_TOKEN"));
    let mut email = env("BES_EMAIL");
    let mut password = env("BES_PASSWORD");
    let mut organization_token = env("BES_ORGANIZATION_TOKEN");
    let mut timeout = None;
    let mut verify = None;

    for rc_path in &rc_candidates() {
        if rc_path.exists() {
            let cfg = read_rc(rc_path).map_err(|e| {
                Error::Config(format!(
                    "failed to read configuration file {}: {}",
                    rc_path.display(),
                    e
                ))
            })?;
            url = url.or(cfg.url);
            token = token.or(cfg.token);
            email = email.or(cfg.email);
            password = password.or(cfg.password);
            organization_token = organization_token.or(cfg.organization_token);
            timeout = cfg.timeout;
            verify = cfg.verify;
            break;
        }
    }

    let credentials = match (email, password, organization_token) {
        (Some(email), Some(password), Some(organization_token)) => Some(Credentials {
            email,
            password,
            organization_token,
        }),
        (None, None, None) => None,
        _ => {
            return Err(Error::Config(
                "email, password and organization_token must be supplied together".to_string(),
            ));
        }
    };

    let defaults = ClientConfig::default();
    Ok(ClientConfig {
        url: url.unwrap_or_else(|| BASE_URL.to_string()),
        token,
        credentials,
        timeout: timeout
            .filter(|t| *t > 0.0)
            .map(Duration::from_secs_f64)
            .unwrap_or(defaults.timeout),
        verify: verify.unwrap_or(defaults.verify),
        ..defaults
    })
}

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn read_rc(path: &Path) -> Result<RcConfig> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_rc(&text))
}

fn parse_rc(text: &str) -> RcConfig {
    let mut cfg = RcConfig::default();

    // A key may carry its value on the following line.
    let mut pending_key: Option<&str> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(pk) = pending_key.take() {
            if !line.contains(':') {
                apply(&mut cfg, pk, strip_quotes(line));
                continue;
            }
        }

        if let Some((k, v)) = line.split_once(':') {
            let k = k.trim();
            let v = strip_quotes(v.trim());
            if v.is_empty() {
                pending_key = Some(k);
            } else {
                apply(&mut cfg, k, v);
            }
        }
    }

    cfg
}

fn apply(cfg: &mut RcConfig, key: &str, value: &str) {
    let value = value.to_string();
    match key {
        "url" => cfg.url = Some(value),
        "token" => cfg.token = Some(value),
        "email" => cfg.email = Some(value),
        "password" => cfg.password = Some(value),
        "organization_token" => cfg.organization_token = Some(value),
        "timeout" => cfg.timeout = value.parse().ok(),
        "verify" => cfg.verify = Some(value != "0"),
        _ => {}
    }
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn rc_candidates() -> Vec<PathBuf> {
    // 1) BES_RC (explicit)
    // 2) ./.besapirc
    // 3) ~/.besapirc
    if let Ok(p) = std::env::var("BES_RC") {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(".besapirc"));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(".besapirc"));
    }
    v
}
