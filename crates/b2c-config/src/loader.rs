//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError, SchemeConfig};
use std::env;
use std::path::PathBuf;
use tracing::info;

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "config.toml",
    "b2c.toml",
    "./config/b2c.toml",
    "/etc/b2c-integration/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::default();

        if let Some(path) = self.find_config_file() {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        apply_overrides(&mut config, |key| env::var(key).ok());

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
        }

        if let Ok(path) = env::var("B2C_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        CONFIG_PATHS
            .iter()
            .map(|path| PathBuf::from(*path))
            .find(|path| path.exists())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply `B2C_*` overrides looked up through `var`.
///
/// Scheme-level overrides target the first configured scheme; one with
/// default names is created when the file declared none.
pub(crate) fn apply_overrides<F>(config: &mut AppConfig, var: F)
where
    F: Fn(&str) -> Option<String>,
{
    // HTTP
    if let Some(val) = var("B2C_HTTP_HOST") {
        config.http.host = val;
    }
    if let Some(port) = var("B2C_HTTP_PORT").and_then(|v| v.parse().ok()) {
        config.http.port = port;
    }
    if let Some(val) = var("B2C_EXTERNAL_BASE_URL") {
        config.http.external_base_url = val;
    }

    const SCHEME_KEYS: &[&str] = &[
        "B2C_CLIENT_ID",
        "B2C_CLIENT_SECRET",
        "B2C_INSTANCE",
        "B2C_DOMAIN",
        "B2C_SIGN_UP_SIGN_IN_POLICY",
        "B2C_RESET_PASSWORD_POLICY",
        "B2C_EDIT_PROFILE_POLICY",
    ];
    if !SCHEME_KEYS.iter().any(|key| var(key).is_some()) {
        return;
    }

    if config.schemes.is_empty() {
        config.schemes.push(SchemeConfig::default());
    }
    let scheme = &mut config.schemes[0];

    if let Some(val) = var("B2C_CLIENT_ID") {
        scheme.client_id = val;
    }
    if let Some(val) = var("B2C_CLIENT_SECRET") {
        scheme.client_secret = Some(val);
    }
    if let Some(val) = var("B2C_INSTANCE") {
        scheme.instance = val;
    }
    if let Some(val) = var("B2C_DOMAIN") {
        scheme.domain = val;
    }
    if let Some(val) = var("B2C_SIGN_UP_SIGN_IN_POLICY") {
        scheme.sign_up_sign_in_policy_id = val;
    }
    if let Some(val) = var("B2C_RESET_PASSWORD_POLICY") {
        scheme.reset_password_policy_id = Some(val);
    }
    if let Some(val) = var("B2C_EDIT_PROFILE_POLICY") {
        scheme.edit_profile_policy_id = Some(val);
    }
}
