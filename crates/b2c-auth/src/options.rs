//! Option objects for the virtual scheme and its two concrete handlers

use std::sync::Arc;

use axum_extra::extract::cookie::SameSite;
use time::Duration;

use crate::error::{AuthSchemeError, Result};
use crate::events::B2cOpenIdConnectEvents;
use crate::routes::AccountRoutes;

/// User-facing configuration of one virtual B2C scheme.
///
/// Everything is optional at construction time; [`B2cOptions::validate`]
/// reports what a working scheme still lacks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct B2cOptions {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Login host including its path prefix, e.g. `https://contoso.b2clogin.com/tfp/`
    pub instance: Option<String>,
    /// Tenant domain, e.g. `contoso.onmicrosoft.com`
    pub domain: Option<String>,

    /// Default policy, used for every challenge without a policy item
    pub sign_up_sign_in_policy_id: Option<String>,
    pub reset_password_policy_id: Option<String>,
    pub edit_profile_policy_id: Option<String>,

    pub callback_path: Option<String>,
    pub signed_out_callback_path: Option<String>,
    pub response_type: Option<String>,
    /// Extra scopes requested on top of the handler defaults
    pub scopes: Vec<String>,

    pub cookie_name: Option<String>,
    pub cookie_path: Option<String>,
    pub cookie_expiration: Option<Duration>,
}

impl B2cOptions {
    pub fn default_policy(&self) -> Option<&str> {
        self.sign_up_sign_in_policy_id.as_deref()
    }

    /// Check the values every B2C scheme needs to build its authority.
    pub fn validate(&self, scheme: &str) -> Result<()> {
        let required = [
            ("client_id", &self.client_id),
            ("instance", &self.instance),
            ("domain", &self.domain),
            ("sign_up_sign_in_policy_id", &self.sign_up_sign_in_policy_id),
        ];

        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
            .map(|(field, _)| *field)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AuthSchemeError::invalid_options(
                scheme,
                format!("missing {}", missing.join(", ")),
            ))
        }
    }
}

/// Options read by the host's OpenID Connect handler.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenIdConnectOptions {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Issuer base, e.g. `https://contoso.b2clogin.com/tfp/contoso.onmicrosoft.com/B2C_1_susi/v2.0`
    pub authority: Option<String>,
    pub response_type: String,
    pub callback_path: String,
    pub signed_out_callback_path: String,
    pub scope: Vec<String>,
    /// Cookie scheme that persists the identity after the callback
    pub sign_in_scheme: Option<String>,
    pub use_token_lifetime: bool,
    pub name_claim_type: String,
    pub events: Option<Arc<B2cOpenIdConnectEvents>>,
}

impl Default for OpenIdConnectOptions {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            authority: None,
            response_type: "id_token".to_string(),
            callback_path: "/signin-oidc".to_string(),
            signed_out_callback_path: "/signout-callback-oidc".to_string(),
            scope: vec!["openid".to_string(), "profile".to_string()],
            sign_in_scheme: None,
            use_token_lifetime: false,
            name_claim_type: "sub".to_string(),
            events: None,
        }
    }
}

impl OpenIdConnectOptions {
    /// Space separated scope string as sent to the identity provider.
    pub fn scope_string(&self) -> String {
        self.scope.join(" ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CookieSettings {
    pub name: Option<String>,
    pub path: String,
    pub http_only: bool,
    pub same_site: SameSite,
    pub secure: bool,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            name: None,
            path: "/".to_string(),
            http_only: true,
            same_site: SameSite::Lax,
            secure: true,
        }
    }
}

/// Options read by the host's cookie handler.
#[derive(Debug, Clone, PartialEq)]
pub struct CookieAuthenticationOptions {
    pub cookie: CookieSettings,
    pub expire_time_span: Duration,
    pub sliding_expiration: bool,
    pub login_path: String,
    pub logout_path: String,
    pub access_denied_path: String,
}

impl Default for CookieAuthenticationOptions {
    fn default() -> Self {
        Self {
            cookie: CookieSettings::default(),
            expire_time_span: Duration::days(14),
            sliding_expiration: true,
            login_path: "/account/login".to_string(),
            logout_path: "/account/logout".to_string(),
            access_denied_path: AccountRoutes::access_denied().to_string(),
        }
    }
}
