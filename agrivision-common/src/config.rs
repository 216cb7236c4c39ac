//! Configuration loading and endpoint resolution
//!
//! Bootstrap settings come from a TOML file; every endpoint value resolves
//! with this priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is not an error: a warning is logged and the
//! compiled defaults are used.

use crate::error::{Error, Result};
use crate::validation::UrlPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "AGRIVISION_CONFIG";

pub const ENV_LOCAL_URL: &str = "AGRIVISION_LOCAL_URL";
pub const ENV_CLOUD_URL: &str = "AGRIVISION_CLOUD_URL";
pub const ENV_PREDICTION_KEY: &str = "AGRIVISION_PREDICTION_KEY";
pub const ENV_SCORING_URL: &str = "AGRIVISION_SCORING_URL";
pub const ENV_SCORING_TOKEN: &str = "AGRIVISION_SCORING_TOKEN";
pub const ENV_CHAT_URL: &str = "AGRIVISION_CHAT_URL";

const DEFAULT_LOCAL_URL: &str = "http://localhost:5000";
const DEFAULT_SCORING_URL: &str = "http://localhost:5001/score";
const DEFAULT_CHAT_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Per-request timeout (default 30)
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Accept `data:` image URLs
    #[serde(default)]
    pub allow_data_urls: bool,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub endpoints: EndpointsConfig,

    #[serde(default)]
    pub auth: AuthConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// JSON field name carrying the image URL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UrlField {
    /// `{"url": ...}`
    #[default]
    #[serde(rename = "url")]
    Lower,
    /// `{"Url": ...}`
    #[serde(rename = "Url")]
    Pascal,
}

impl UrlField {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrlField::Lower => "url",
            UrlField::Pascal => "Url",
        }
    }
}

/// `[endpoints]` table, every entry optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// Base URL of the local classifier (serves `/image` and `/url`)
    pub local_vision_url: Option<String>,
    /// Base URL of the cloud vision API
    pub cloud_vision_url: Option<String>,
    pub prediction_key: Option<String>,
    /// Full URL of the crop model scoring endpoint
    pub scoring_url: Option<String>,
    pub scoring_token: Option<String>,
    /// Base URL of the advisory chat service (serves `/chat`)
    pub chat_url: Option<String>,
    #[serde(default)]
    pub url_field: UrlField,
}

/// `[auth]` table for the static credential verifier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    pub username: Option<String>,
    /// SHA-256 of the password, hex encoded
    pub password_sha256: Option<String>,
}

/// Command-line overrides, highest priority
#[derive(Debug, Clone, Default)]
pub struct EndpointOverrides {
    pub local_vision_url: Option<String>,
    pub cloud_vision_url: Option<String>,
    pub prediction_key: Option<String>,
    pub scoring_url: Option<String>,
    pub scoring_token: Option<String>,
    pub chat_url: Option<String>,
}

/// Fully resolved endpoint set used by the dispatcher
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoints {
    pub local_vision_url: String,
    pub cloud_vision_url: String,
    pub prediction_key: Option<String>,
    pub scoring_url: String,
    pub scoring_token: Option<String>,
    pub chat_url: String,
    pub url_field: UrlField,
    /// Image URLs the dispatcher will send
    pub url_policy: UrlPolicy,
    pub timeout: Duration,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            local_vision_url: DEFAULT_LOCAL_URL.to_string(),
            cloud_vision_url: DEFAULT_LOCAL_URL.to_string(),
            prediction_key: None,
            scoring_url: DEFAULT_SCORING_URL.to_string(),
            scoring_token: None,
            chat_url: DEFAULT_CHAT_URL.to_string(),
            url_field: UrlField::Lower,
            url_policy: UrlPolicy::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Endpoints {
    /// Resolve every endpoint: CLI → ENV → TOML → default
    pub fn resolve(cli: &EndpointOverrides, toml: &TomlConfig) -> Self {
        let t = &toml.endpoints;
        let local_vision_url = resolve_setting(
            "local_vision_url",
            cli.local_vision_url.as_deref(),
            ENV_LOCAL_URL,
            t.local_vision_url.as_deref(),
        )
        .unwrap_or_else(|| DEFAULT_LOCAL_URL.to_string());

        // Cloud falls back to the local host, which proxies both in development
        let cloud_vision_url = resolve_setting(
            "cloud_vision_url",
            cli.cloud_vision_url.as_deref(),
            ENV_CLOUD_URL,
            t.cloud_vision_url.as_deref(),
        )
        .unwrap_or_else(|| local_vision_url.clone());

        Self {
            cloud_vision_url,
            local_vision_url,
            prediction_key: resolve_setting(
                "prediction_key",
                cli.prediction_key.as_deref(),
                ENV_PREDICTION_KEY,
                t.prediction_key.as_deref(),
            ),
            scoring_url: resolve_setting(
                "scoring_url",
                cli.scoring_url.as_deref(),
                ENV_SCORING_URL,
                t.scoring_url.as_deref(),
            )
            .unwrap_or_else(|| DEFAULT_SCORING_URL.to_string()),
            scoring_token: resolve_setting(
                "scoring_token",
                cli.scoring_token.as_deref(),
                ENV_SCORING_TOKEN,
                t.scoring_token.as_deref(),
            ),
            chat_url: resolve_setting(
                "chat_url",
                cli.chat_url.as_deref(),
                ENV_CHAT_URL,
                t.chat_url.as_deref(),
            )
            .unwrap_or_else(|| DEFAULT_CHAT_URL.to_string()),
            url_field: t.url_field,
            url_policy: UrlPolicy::new(toml.allow_data_urls),
            timeout: Duration::from_secs(
                toml.request_timeout_secs
                    .filter(|s| *s > 0)
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
        }
    }
}

/// Pick the highest-priority non-blank value
///
/// Warns when more than one source supplies a value; that is usually a
/// leftover from an earlier setup.
pub fn resolve_setting(
    name: &str,
    cli: Option<&str>,
    env_var: &str,
    toml: Option<&str>,
) -> Option<String> {
    let env = std::env::var(env_var).ok();
    let candidates = [
        ("command line", cli.map(str::to_string)),
        ("environment", env),
        ("TOML", toml.map(str::to_string)),
    ];

    let present: Vec<(&str, String)> = candidates
        .into_iter()
        .filter_map(|(source, v)| v.filter(|s| is_valid_value(s)).map(|s| (source, s)))
        .collect();

    if present.len() > 1 {
        let sources: Vec<&str> = present.iter().map(|(s, _)| *s).collect();
        warn!(
            "{} found in multiple sources: {}. Using {} (highest priority).",
            name,
            sources.join(", "),
            sources[0]
        );
    }

    present.into_iter().next().map(|(source, value)| {
        debug!(setting = name, source, "Resolved setting");
        value.trim().to_string()
    })
}

/// Non-empty, non-whitespace
pub fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Default config file location: `<config_dir>/agrivision/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("agrivision").join("config.toml"))
}

/// Load configuration
///
/// An explicit path (argument or [`CONFIG_ENV_VAR`]) must exist. The default
/// location is optional: when absent, compiled defaults are returned.
pub fn load_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let env_path = std::env::var(CONFIG_ENV_VAR)
        .ok()
        .filter(|s| is_valid_value(s))
        .map(PathBuf::from);

    if let Some(path) = explicit.map(Path::to_path_buf).or(env_path) {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        return read_toml_config(&path);
    }

    match default_config_path() {
        Some(path) if path.exists() => read_toml_config(&path),
        Some(path) => {
            warn!(
                "No config file at {}, using compiled defaults",
                path.display()
            );
            Ok(TomlConfig::default())
        }
        None => {
            warn!("Could not determine config directory, using compiled defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Parse a TOML config file
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Write a config file atomically (temp file + rename)
///
/// The file can hold API keys and tokens, so on Unix it is readable by the
/// owner only (0600).
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&tmp, path)?;
    info!("Wrote config to {}", path.display());
    Ok(())
}
