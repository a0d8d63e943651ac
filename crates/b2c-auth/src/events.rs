//! B2C behaviour hooked into the OpenID Connect handler
//!
//! B2C runs one issuer per policy. Challenges carrying a `Policy` item are
//! redirected to that policy's issuer instead of the default one, and
//! protocol failures from the identity provider are mapped onto the
//! account routes.

use std::collections::HashMap;

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::defaults::{FORGOT_PASSWORD_ERROR, ID_TOKEN_RESPONSE_TYPE, OPEN_ID_PROFILE_SCOPE, POLICY_KEY};
use crate::routes::AccountRoutes;

/// State carried from the challenge to the callback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthenticationProperties {
    pub redirect_uri: Option<String>,
    pub items: HashMap<String, String>,
}

impl AuthenticationProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    pub fn with_item(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.items.insert(key.into(), value.into());
        self
    }

    /// Policy requested for this challenge, if any.
    pub fn policy(&self) -> Option<&str> {
        self.items.get(POLICY_KEY).map(String::as_str)
    }
}

/// Authorization request about to be sent to the identity provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtocolMessage {
    /// Authorization endpoint
    pub issuer_address: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub response_type: String,
    pub scope: String,
    pub state: String,
    pub nonce: String,
}

impl ProtocolMessage {
    pub fn create_authentication_request_url(&self) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type={}&scope={}&response_mode=form_post&state={}&nonce={}",
            self.issuer_address,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&self.response_type),
            urlencoding::encode(&self.scope),
            urlencoding::encode(&self.state),
            urlencoding::encode(&self.nonce),
        )
    }
}

#[derive(Debug)]
pub struct RedirectContext {
    pub properties: AuthenticationProperties,
    pub message: ProtocolMessage,
}

/// Failure reported by the remote leg of an OpenID Connect sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteFailure {
    /// Error returned by the identity provider
    Protocol {
        error: String,
        description: Option<String>,
    },
    Other(String),
}

impl RemoteFailure {
    fn protocol_contains(&self, needle: &str) -> bool {
        match self {
            RemoteFailure::Protocol { error, description } => {
                error.contains(needle)
                    || description.as_deref().is_some_and(|d| d.contains(needle))
            }
            RemoteFailure::Other(_) => false,
        }
    }
}

/// OpenID Connect events attached to every B2C scheme.
#[derive(Debug)]
pub struct B2cOpenIdConnectEvents {
    scheme: String,
    default_policy: Option<String>,
    issuer_by_policy: DashMap<String, String>,
}

impl PartialEq for B2cOpenIdConnectEvents {
    fn eq(&self, other: &Self) -> bool {
        self.scheme == other.scheme && self.default_policy == other.default_policy
    }
}

impl B2cOpenIdConnectEvents {
    pub fn new(scheme: impl Into<String>, default_policy: Option<String>) -> Self {
        Self {
            scheme: scheme.into(),
            default_policy,
            issuer_by_policy: DashMap::new(),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Switch the request to the policy named in the properties.
    ///
    /// Only applies when the policy is set and differs (ignoring case) from
    /// the default policy; the policy item is consumed in that case. Without
    /// a default policy the issuer has no segment to replace and the request
    /// is left as is.
    pub fn on_redirect_to_identity_provider(&self, context: &mut RedirectContext) {
        let Some(policy) = context.properties.policy().filter(|p| !p.is_empty()) else {
            return;
        };
        let Some(default_policy) = self.default_policy.as_deref().filter(|p| !p.is_empty()) else {
            warn!(scheme = %self.scheme, policy = %policy, "No default policy to switch from");
            return;
        };
        if policy.eq_ignore_ascii_case(default_policy) {
            return;
        }

        let policy = policy.to_string();
        context.message.scope = OPEN_ID_PROFILE_SCOPE.to_string();
        context.message.response_type = ID_TOKEN_RESPONSE_TYPE.to_string();
        context.message.issuer_address =
            self.issuer_address(&context.message.issuer_address, default_policy, &policy);
        context.properties.items.remove(POLICY_KEY);

        debug!(scheme = %self.scheme, policy = %policy, "Challenge switched to policy");
    }

    /// Redirect target for a failed remote sign-in.
    pub fn on_remote_failure(&self, failure: &RemoteFailure, path_base: &str) -> String {
        let path_base = path_base.trim_end_matches('/');

        if failure.protocol_contains(FORGOT_PASSWORD_ERROR) {
            format!("{}{}", path_base, AccountRoutes::reset_password(&self.scheme))
        } else if failure.protocol_contains("access_denied") {
            format!("{}/", path_base)
        } else {
            warn!(scheme = %self.scheme, failure = ?failure, "Remote sign-in failed");
            format!("{}{}", path_base, AccountRoutes::error())
        }
    }

    fn issuer_address(&self, current: &str, default_policy: &str, policy: &str) -> String {
        self.issuer_by_policy
            .entry(policy.to_string())
            .or_insert_with(|| {
                current.to_lowercase().replace(
                    &format!("/{}/", default_policy.to_lowercase()),
                    &format!("/{}/", policy.to_lowercase()),
                )
            })
            .value()
            .clone()
    }
}
