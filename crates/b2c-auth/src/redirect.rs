//! Redirect-based authentication service
//!
//! Implements the per-request half of the host: challenges are resolved
//! through the scheme table to a concrete handler and turned into
//! redirects. Only the outbound leg lives here; token exchange and the
//! callback belong to the OpenID Connect handler.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::Rng;
use tracing::{debug, info};

use crate::account::AuthenticationService;
use crate::error::Result;
use crate::events::{AuthenticationProperties, ProtocolMessage, RedirectContext, RemoteFailure};
use crate::host::{AuthenticationRuntime, AuthenticationScheme, HandlerKind, SchemeAction};
use crate::options::{CookieAuthenticationOptions, OpenIdConnectOptions};
use crate::routes::AccountRoutes;

pub struct RedirectAuthenticationService {
    runtime: Arc<AuthenticationRuntime>,
    /// Public base URL used for callback and post-logout URLs
    external_base_url: String,
}

impl RedirectAuthenticationService {
    pub fn new(runtime: Arc<AuthenticationRuntime>, external_base_url: impl Into<String>) -> Self {
        Self {
            runtime,
            external_base_url: external_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Redirect target for a failed remote sign-in on `scheme`.
    pub fn remote_failure(&self, scheme: &str, failure: &RemoteFailure, path_base: &str) -> Result<String> {
        let target = self
            .runtime
            .schemes()
            .forward_target(scheme, SchemeAction::Challenge)?;
        let options = self.runtime.open_id_connect_options(&target.name);

        Ok(match &options.events {
            Some(events) => events.on_remote_failure(failure, path_base),
            None => format!("{}{}", path_base.trim_end_matches('/'), AccountRoutes::error()),
        })
    }

    fn open_id_connect_challenge(
        &self,
        scheme: &AuthenticationScheme,
        properties: AuthenticationProperties,
    ) -> Response {
        let options = self.runtime.open_id_connect_options(&scheme.name);

        let mut context = RedirectContext {
            properties,
            message: ProtocolMessage {
                issuer_address: authorization_endpoint(&options),
                client_id: options.client_id.clone().unwrap_or_default(),
                redirect_uri: format!("{}{}", self.external_base_url, options.callback_path),
                response_type: options.response_type.clone(),
                scope: options.scope_string(),
                state: generate_random_string(32),
                nonce: generate_random_string(32),
            },
        };

        if let Some(events) = &options.events {
            events.on_redirect_to_identity_provider(&mut context);
        }

        info!(
            scheme = %scheme.name,
            issuer = %context.message.issuer_address,
            "Redirecting to identity provider"
        );

        see_other(context.message.create_authentication_request_url())
    }

    fn cookie_challenge(&self, scheme: &AuthenticationScheme, properties: AuthenticationProperties) -> Response {
        let options = self.runtime.cookie_options(&scheme.name);
        let return_url = properties.redirect_uri.unwrap_or_else(|| "/".to_string());

        see_other(format!(
            "{}?return_url={}",
            options.login_path,
            urlencoding::encode(&return_url)
        ))
    }
}

#[async_trait]
impl AuthenticationService for RedirectAuthenticationService {
    async fn challenge(&self, scheme: &str, properties: AuthenticationProperties) -> Result<Response> {
        let target = self
            .runtime
            .schemes()
            .forward_target(scheme, SchemeAction::Challenge)?;
        debug!(scheme = %scheme, target = %target.name, "Challenge forwarded");

        Ok(match target.handler {
            HandlerKind::OpenIdConnect => self.open_id_connect_challenge(target, properties),
            _ => self.cookie_challenge(target, properties),
        })
    }

    async fn sign_out(&self, schemes: &[String], properties: AuthenticationProperties) -> Result<Response> {
        let mut jar = CookieJar::new();
        let mut end_session: Option<String> = None;

        for scheme in schemes {
            let target = self
                .runtime
                .schemes()
                .forward_target(scheme, SchemeAction::SignOut)?;

            match target.handler {
                HandlerKind::Cookie => {
                    let options = self.runtime.cookie_options(&target.name);
                    if let Some(cookie) = removal_cookie(&options) {
                        jar = jar.add(cookie);
                    }
                }
                HandlerKind::OpenIdConnect => {
                    let options = self.runtime.open_id_connect_options(&target.name);
                    end_session = end_session.or_else(|| self.end_session_url(&options, &properties));
                }
                HandlerKind::Virtual(_) => {}
            }
            info!(scheme = %target.name, "Signed out");
        }

        let location = end_session
            .or(properties.redirect_uri)
            .unwrap_or_else(|| "/".to_string());

        Ok((jar, see_other(location)).into_response())
    }
}

impl RedirectAuthenticationService {
    fn end_session_url(
        &self,
        options: &OpenIdConnectOptions,
        properties: &AuthenticationProperties,
    ) -> Option<String> {
        let authority = options.authority.as_deref()?;
        let post_logout = match &properties.redirect_uri {
            Some(uri) if uri.starts_with('/') => format!("{}{}", self.external_base_url, uri),
            Some(uri) => uri.clone(),
            None => format!("{}{}", self.external_base_url, options.signed_out_callback_path),
        };
        Some(format!(
            "{}?post_logout_redirect_uri={}",
            endpoint(authority, "logout"),
            urlencoding::encode(&post_logout)
        ))
    }
}

fn removal_cookie(options: &CookieAuthenticationOptions) -> Option<Cookie<'static>> {
    let name = options.cookie.name.clone()?;
    let mut cookie = Cookie::build((name, ""))
        .path(options.cookie.path.clone())
        .http_only(options.cookie.http_only)
        .secure(options.cookie.secure)
        .same_site(options.cookie.same_site)
        .build();
    cookie.make_removal();
    Some(cookie)
}

fn see_other(location: String) -> Response {
    (StatusCode::SEE_OTHER, [(header::LOCATION, location)]).into_response()
}

fn authorization_endpoint(options: &OpenIdConnectOptions) -> String {
    options
        .authority
        .as_deref()
        .map(|authority| endpoint(authority, "authorize"))
        .unwrap_or_default()
}

/// OAuth endpoint under a B2C or Entra authority.
fn endpoint(authority: &str, name: &str) -> String {
    let base = authority.trim_end_matches('/');
    match base.strip_suffix("/v2.0") {
        Some(prefix) => format!("{}/oauth2/v2.0/{}", prefix, name),
        None => format!("{}/{}", base, name),
    }
}

fn generate_random_string(length: usize) -> String {
    let mut bytes = vec![0u8; length];
    rand::rng().fill(&mut bytes[..]);
    URL_SAFE_NO_PAD.encode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        assert_eq!(
            endpoint("https://contoso.b2clogin.com/tfp/contoso.onmicrosoft.com/B2C_1_susi/v2.0", "authorize"),
            "https://contoso.b2clogin.com/tfp/contoso.onmicrosoft.com/B2C_1_susi/oauth2/v2.0/authorize"
        );
        assert_eq!(endpoint("https://idp.example/", "logout"), "https://idp.example/logout");
    }

    #[test]
    fn test_random_strings_differ() {
        let a = generate_random_string(32);
        let b = generate_random_string(32);
        assert_eq!(a.len(), 43);
        assert_ne!(a, b);
    }

    #[test]
    fn test_removal_cookie_requires_name() {
        let mut options = CookieAuthenticationOptions::default();
        assert!(removal_cookie(&options).is_none());

        options.cookie.name = Some("b2c.session".to_string());
        let cookie = removal_cookie(&options).unwrap();
        assert_eq!(cookie.name(), "b2c.session");
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
    }
}
