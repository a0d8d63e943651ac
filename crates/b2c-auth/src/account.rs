//! B2C Account Endpoints
//!
//! Sign-in, password reset, profile editing and sign-out for each virtual
//! scheme, plus the static pages the cookie handler and the remote-failure
//! events redirect to.
//!
//! Flow:
//! 1. GET /b2c/account/sign-in/{scheme} - Challenges the virtual scheme
//! 2. The host forwards the challenge to the OpenID Connect scheme
//! 3. The user authenticates at B2C and returns through the host callback
//! 4. GET /b2c/account/sign-out/{scheme} - Signs out of both concrete schemes

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Path, Query, State},
    response::{Html, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::info;
use utoipa::{IntoParams, OpenApi};

use crate::composer::B2cSchemes;
use crate::defaults::POLICY_KEY;
use crate::error::{ErrorResponse, Result};
use crate::events::AuthenticationProperties;
use crate::routes::AccountRoutes;

/// Per-request authentication actions the account endpoints rely on.
#[async_trait]
pub trait AuthenticationService: Send + Sync {
    /// Start an interactive sign-in on `scheme`.
    async fn challenge(&self, scheme: &str, properties: AuthenticationProperties) -> Result<Response>;

    /// Sign out of every scheme in `schemes`.
    async fn sign_out(&self, schemes: &[String], properties: AuthenticationProperties) -> Result<Response>;
}

/// Account API state
#[derive(Clone)]
pub struct AccountState {
    pub schemes: B2cSchemes,
    pub auth: Arc<dyn AuthenticationService>,
}

impl AccountState {
    pub fn new(schemes: B2cSchemes, auth: Arc<dyn AuthenticationService>) -> Self {
        Self { schemes, auth }
    }
}

/// Sign-in query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SignInParams {
    /// Local path to return to after sign-in
    pub return_url: Option<String>,
}

/// Only local paths are accepted as return targets.
///
/// Browsers treat `/\host` like `//host`, so a backslash in second position
/// is rejected along with control characters.
fn local_redirect(return_url: Option<&str>) -> String {
    match return_url {
        Some(url) if is_local_url(url) => url.to_string(),
        _ => "/".to_string(),
    }
}

fn is_local_url(url: &str) -> bool {
    let mut chars = url.chars();
    if chars.next() != Some('/') {
        return false;
    }
    if matches!(chars.next(), Some('/') | Some('\\')) {
        return false;
    }
    !url.chars().any(char::is_control)
}

// ==================== Endpoints ====================

/// Sign in with a virtual scheme
#[utoipa::path(
    get,
    path = "/b2c/account/sign-in/{scheme}",
    tag = "b2c-account",
    params(
        ("scheme" = String, Path, description = "Virtual scheme name"),
        SignInParams
    ),
    responses(
        (status = 303, description = "Redirect to the identity provider"),
        (status = 404, description = "Scheme not found", body = ErrorResponse)
    )
)]
pub async fn sign_in(
    State(state): State<AccountState>,
    Path(scheme): Path<String>,
    Query(params): Query<SignInParams>,
) -> Result<Response> {
    state.schemes.resolve(&scheme)?;

    let properties = AuthenticationProperties::new()
        .with_redirect_uri(local_redirect(params.return_url.as_deref()));
    state.auth.challenge(&scheme, properties).await
}

/// Reset the password through the scheme's reset-password policy
#[utoipa::path(
    get,
    path = "/b2c/account/reset-password/{scheme}",
    tag = "b2c-account",
    params(("scheme" = String, Path, description = "Virtual scheme name")),
    responses(
        (status = 303, description = "Redirect to the identity provider"),
        (status = 404, description = "Scheme not found", body = ErrorResponse)
    )
)]
pub async fn reset_password(
    State(state): State<AccountState>,
    Path(scheme): Path<String>,
) -> Result<Response> {
    let options = state.schemes.options(&scheme)?;
    challenge_with_policy(&state, &scheme, options.reset_password_policy_id.as_deref()).await
}

/// Edit the profile through the scheme's edit-profile policy
#[utoipa::path(
    get,
    path = "/b2c/account/edit-profile/{scheme}",
    tag = "b2c-account",
    params(("scheme" = String, Path, description = "Virtual scheme name")),
    responses(
        (status = 303, description = "Redirect to the identity provider"),
        (status = 404, description = "Scheme not found", body = ErrorResponse)
    )
)]
pub async fn edit_profile(
    State(state): State<AccountState>,
    Path(scheme): Path<String>,
) -> Result<Response> {
    let options = state.schemes.options(&scheme)?;
    challenge_with_policy(&state, &scheme, options.edit_profile_policy_id.as_deref()).await
}

async fn challenge_with_policy(
    state: &AccountState,
    scheme: &str,
    policy: Option<&str>,
) -> Result<Response> {
    let mut properties = AuthenticationProperties::new().with_redirect_uri("/");
    if let Some(policy) = policy {
        properties = properties.with_item(POLICY_KEY, policy);
    }
    info!(scheme = %scheme, policy = ?policy, "Policy challenge");
    state.auth.challenge(scheme, properties).await
}

/// Sign out of the cookie and OpenID Connect schemes
#[utoipa::path(
    get,
    path = "/b2c/account/sign-out/{scheme}",
    tag = "b2c-account",
    params(("scheme" = String, Path, description = "Virtual scheme name")),
    responses(
        (status = 303, description = "Redirect to the signed-out page or the identity provider"),
        (status = 404, description = "Scheme not found", body = ErrorResponse)
    )
)]
pub async fn sign_out(
    State(state): State<AccountState>,
    Path(scheme): Path<String>,
) -> Result<Response> {
    let mapping = state.schemes.resolve(&scheme)?;
    let schemes = vec![mapping.cookie_scheme.clone(), mapping.open_id_connect_scheme.clone()];

    let properties = AuthenticationProperties::new().with_redirect_uri(AccountRoutes::signed_out());
    state.auth.sign_out(&schemes, properties).await
}

fn page(title: &str, message: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html><html><head><title>{title}</title></head><body><h1>{title}</h1><p>{message}</p></body></html>"
    ))
}

/// Signed-out confirmation page
#[utoipa::path(
    get,
    path = "/b2c/account/signed-out",
    tag = "b2c-account",
    responses((status = 200, description = "Signed-out page", content_type = "text/html"))
)]
pub async fn signed_out() -> Html<String> {
    page("Signed out", "You have successfully signed out.")
}

/// Access denied page
#[utoipa::path(
    get,
    path = "/b2c/account/access-denied",
    tag = "b2c-account",
    responses((status = 200, description = "Access denied page", content_type = "text/html"))
)]
pub async fn access_denied() -> Html<String> {
    page("Access denied", "You do not have access to this resource.")
}

/// Sign-in error page
#[utoipa::path(
    get,
    path = "/b2c/account/error",
    tag = "b2c-account",
    responses((status = 200, description = "Error page", content_type = "text/html"))
)]
pub async fn error() -> Html<String> {
    page("Error", "An error occurred while processing your request.")
}

/// Create the account router
pub fn account_router(state: AccountState) -> Router {
    Router::new()
        .route(AccountRoutes::SIGN_IN_PATTERN, get(sign_in))
        .route(AccountRoutes::RESET_PASSWORD_PATTERN, get(reset_password))
        .route(AccountRoutes::EDIT_PROFILE_PATTERN, get(edit_profile))
        .route(AccountRoutes::SIGN_OUT_PATTERN, get(sign_out))
        .route(AccountRoutes::SIGNED_OUT_PATH, get(signed_out))
        .route(AccountRoutes::ACCESS_DENIED_PATH, get(access_denied))
        .route(AccountRoutes::ERROR_PATH, get(error))
        .with_state(state)
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "B2C Account API",
        version = "0.1.0",
        description = "Account endpoints of the Azure AD B2C virtual schemes"
    ),
    paths(sign_in, reset_password, edit_profile, sign_out, signed_out, access_denied, error),
    components(schemas(ErrorResponse)),
    tags((name = "b2c-account", description = "Sign-in, policy and sign-out redirects"))
)]
pub struct AccountApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_redirect() {
        assert_eq!(local_redirect(Some("/orders?id=1")), "/orders?id=1");
        assert_eq!(local_redirect(Some("//evil.example")), "/");
        assert_eq!(local_redirect(Some("https://evil.example")), "/");
        assert_eq!(local_redirect(Some("/\\evil.example")), "/");
        assert_eq!(local_redirect(Some("/orders\r\nLocation: x")), "/");
        assert_eq!(local_redirect(Some("/")), "/");
        assert_eq!(local_redirect(Some("/a\\b")), "/a\\b");
        assert_eq!(local_redirect(None), "/");
    }

    #[test]
    fn test_openapi_lists_account_paths() {
        let doc = AccountApiDoc::openapi();
        assert!(doc.paths.paths.contains_key(AccountRoutes::SIGN_IN_PATTERN));
        assert!(doc.paths.paths.contains_key(AccountRoutes::ERROR_PATH));
    }
}
