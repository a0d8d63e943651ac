//! B2C Integration Configuration
//!
//! TOML-based configuration for the dev server with environment variable
//! overrides. Each `[[schemes]]` table describes one virtual B2C scheme;
//! omitted scheme names fall back to the library defaults at registration.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub schemes: Vec<SchemeConfig>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub port: u16,
    pub host: String,
    /// Public base URL used to build absolute callback URLs
    pub external_base_url: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            host: "127.0.0.1".to_string(),
            external_base_url: "https://localhost:5001".to_string(),
        }
    }
}

/// One virtual B2C scheme and the options forwarded to its handlers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemeConfig {
    /// Virtual scheme name (library default when omitted)
    pub scheme: Option<String>,
    pub open_id_connect_scheme: Option<String>,
    pub cookie_scheme: Option<String>,
    pub display_name: Option<String>,

    /// B2C login instance, e.g. `https://contoso.b2clogin.com/tfp/`
    pub instance: String,
    /// Tenant domain, e.g. `contoso.onmicrosoft.com`
    pub domain: String,
    pub client_id: String,
    pub client_secret: Option<String>,

    pub sign_up_sign_in_policy_id: String,
    pub reset_password_policy_id: Option<String>,
    pub edit_profile_policy_id: Option<String>,

    pub callback_path: Option<String>,
    pub signed_out_callback_path: Option<String>,
    pub response_type: Option<String>,
    pub scopes: Vec<String>,

    pub cookie_name: Option<String>,
    pub cookie_path: Option<String>,
    pub cookie_expiration_secs: Option<u64>,
}

impl SchemeConfig {
    /// Explicitly configured scheme names, in virtual/oidc/cookie order.
    pub fn explicit_names(&self) -> impl Iterator<Item = &str> {
        [&self.scheme, &self.open_id_connect_scheme, &self.cookie_scheme]
            .into_iter()
            .filter_map(|name| name.as_deref())
    }

    fn uses_default_names(&self) -> bool {
        self.scheme.is_none() && self.open_id_connect_scheme.is_none() && self.cookie_scheme.is_none()
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration with environment variable override
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load()
    }

    /// Check scheme naming rules that would otherwise only fail at registration.
    ///
    /// Names may not be blank and may not repeat across schemes; at most one
    /// scheme may rely entirely on the default names.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schemes.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one [[schemes]] entry is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut defaulted = 0usize;
        for (index, scheme) in self.schemes.iter().enumerate() {
            if scheme.uses_default_names() {
                defaulted += 1;
            }
            for name in scheme.explicit_names() {
                if name.trim().is_empty() {
                    return Err(ConfigError::ValidationError(format!(
                        "schemes[{}] has a blank scheme name",
                        index
                    )));
                }
                if !seen.insert(name) {
                    return Err(ConfigError::ValidationError(format!(
                        "scheme name '{}' is used more than once",
                        name
                    )));
                }
            }
        }

        if defaulted > 1 {
            return Err(ConfigError::ValidationError(
                "only one scheme may omit its scheme names".to_string(),
            ));
        }

        Ok(())
    }

    /// Generate an example TOML configuration
    pub fn example_toml() -> String {
        r#"# B2C Integration Configuration
# Environment variables override these settings

[http]
port = 5000
host = "127.0.0.1"
external_base_url = "https://localhost:5001"

[[schemes]]
# scheme = "AzureADB2C"
# open_id_connect_scheme = "AzureADB2COpenID"
# cookie_scheme = "AzureADB2CCookie"
# display_name = "Azure Active Directory B2C"
instance = "https://contoso.b2clogin.com/tfp/"
domain = "contoso.onmicrosoft.com"
client_id = "00000000-0000-0000-0000-000000000000"
sign_up_sign_in_policy_id = "B2C_1_susi"
reset_password_policy_id = "B2C_1_reset"
edit_profile_policy_id = "B2C_1_edit"
callback_path = "/signin-oidc"
signed_out_callback_path = "/signout/B2C_1_susi"
scopes = []
# cookie_name = ".b2c.session"
# cookie_path = "/"
# cookie_expiration_secs = 1209600
"#
        .to_string()
    }
}
