//! Configuration file loading with environment variable overrides.

use std::fmt;
use std::path::{Path, PathBuf};

use reqwest::Url;
use serde::Deserialize;

use crate::error::BlueprintError;
use crate::intake::DEFAULT_MAX_UPLOAD_BYTES;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Relay server settings.
    #[serde(default)]
    pub relay: RelayConfig,

    /// Client settings used by `generate`.
    #[serde(default)]
    pub client: ClientConfig,
}

/// Relay server settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Socket address the relay listens on.
    pub listen: String,
    /// Internal host name of the backend in production deployments.
    pub service_name: String,
    /// Backend URL in development when `NEXT_PUBLIC_API_URL` is unset.
    pub dev_backend_url: String,
    /// Backend port in production when `PORT` is unset.
    pub default_backend_port: u16,
    /// Largest accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3000".to_string(),
            service_name: "blueprint3d-backend".to_string(),
            dev_backend_url: "http://localhost:8000".to_string(),
            default_backend_port: 10000,
            // A 10 MiB upload grows by a third once base64 encoded.
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Client settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the relay.
    pub relay_url: String,
    /// Origin that relative image URLs are resolved against; the relay if unset.
    pub asset_origin: Option<String>,
    /// Remote image hosts that downloads may be fetched from.
    pub image_domains: Vec<String>,
    /// Upload size cap in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_url: "http://localhost:3000".to_string(),
            asset_origin: None,
            image_domains: vec!["ark-project.tos-cn-beijing.volces.com".to_string()],
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Config {
    /// Load configuration from the given path, or return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
        toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
    }
}

impl ClientConfig {
    /// Relay URL, preferring `BLUEPRINT3D_RELAY_URL`.
    #[must_use]
    pub fn relay_url(&self) -> String {
        std::env::var("BLUEPRINT3D_RELAY_URL").unwrap_or_else(|_| self.relay_url.clone())
    }

    /// Hosts a download may come from: the asset origin, the relay, and the
    /// configured image domains.
    #[must_use]
    pub fn download_hosts(&self, relay_url: &str) -> Vec<String> {
        let mut hosts: Vec<String> = [Some(relay_url), self.asset_origin.as_deref()]
            .into_iter()
            .flatten()
            .filter_map(|u| Url::parse(u).ok())
            .filter_map(|u| u.host_str().map(str::to_string))
            .collect();
        hosts.extend(self.image_domains.iter().cloned());
        hosts
    }
}

/// Deployment mode of the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentMode {
    /// Local development.
    Development,
    /// Anything else.
    Production,
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => f.write_str("development"),
            Self::Production => f.write_str("production"),
        }
    }
}

/// Where the relay forwards to. Resolved once at startup.
#[derive(Debug, Clone)]
pub struct BackendTarget {
    /// Mode the target was resolved for.
    pub mode: DeploymentMode,
    /// Backend origin, e.g. `http://blueprint3d-backend:10000`.
    pub origin: Url,
}

impl BackendTarget {
    /// Resolve from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting origin is not a valid URL.
    pub fn from_env(relay: &RelayConfig) -> Result<Self, BlueprintError> {
        Self::resolve(relay, |key| std::env::var(key).ok())
    }

    /// Resolve using `env` for variable lookup.
    ///
    /// `NODE_ENV=development` selects development mode, which uses
    /// `NEXT_PUBLIC_API_URL` or the configured local default. Otherwise the
    /// internal service name is used with `PORT` or the default port.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting origin is not a valid URL.
    pub fn resolve(
        relay: &RelayConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, BlueprintError> {
        let mode = if env("NODE_ENV").as_deref() == Some("development") {
            DeploymentMode::Development
        } else {
            DeploymentMode::Production
        };

        let raw = match mode {
            DeploymentMode::Development => env("NEXT_PUBLIC_API_URL")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| relay.dev_backend_url.clone()),
            DeploymentMode::Production => {
                let port = match env("PORT").filter(|v| !v.is_empty()) {
                    Some(p) => p.parse::<u16>().map_err(|e| {
                        BlueprintError::Config(format!("Invalid PORT '{p}': {e}"))
                    })?,
                    None => relay.default_backend_port,
                };
                format!("http://{}:{port}", relay.service_name)
            }
        };

        let origin = Url::parse(&raw)
            .map_err(|e| BlueprintError::Config(format!("Invalid backend URL '{raw}': {e}")))?;
        Ok(Self { mode, origin })
    }

    /// Full URL of the backend's generate endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be joined onto the origin.
    pub fn generate_url(&self) -> Result<Url, BlueprintError> {
        self.origin
            .join("/api/generate")
            .map_err(|e| BlueprintError::Config(format!("Invalid backend URL: {e}")))
    }
}

/// Discover the config file path using the resolution order:
/// 1. Explicit path (from `--config` flag)
/// 2. `BLUEPRINT3D_CONFIG` environment variable
/// 3. `~/.config/blueprint3d/config.toml`
#[must_use]
pub fn discover_config_path(explicit: Option<&str>) -> PathBuf {
    if let Some(p) = explicit {
        return PathBuf::from(p);
    }

    if let Ok(p) = std::env::var("BLUEPRINT3D_CONFIG") {
        return PathBuf::from(p);
    }

    default_config_path()
}

fn default_config_path() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".config/blueprint3d/config.toml")
    } else {
        PathBuf::from("blueprint3d.toml")
    }
}
