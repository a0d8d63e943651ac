//! Account router tests
//!
//! Requests go through the axum router with `tower::ServiceExt::oneshot`,
//! once against a recording authentication service and once against the
//! redirect service backed by a real host.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use parking_lot::Mutex;
use tower::ServiceExt;

use b2c_auth::{
    account_router, AccountState, AuthenticationBuilder, AuthenticationProperties,
    AuthenticationService, B2cOptions, RedirectAuthenticationService, RemoteFailure,
    VirtualSchemeComposer,
};

fn contoso(options: &mut B2cOptions) {
    options.client_id = Some("client-id".to_string());
    options.instance = Some("https://contoso.b2clogin.com/tfp/".to_string());
    options.domain = Some("contoso.onmicrosoft.com".to_string());
    options.sign_up_sign_in_policy_id = Some("B2C_1_susi".to_string());
    options.reset_password_policy_id = Some("B2C_1_reset".to_string());
    options.edit_profile_policy_id = Some("B2C_1_edit".to_string());
}

fn composed() -> (AuthenticationBuilder, VirtualSchemeComposer) {
    let mut host = AuthenticationBuilder::new();
    let mut composer = VirtualSchemeComposer::default();
    composer
        .register(&mut host, "b2c", "b2c-oidc", "b2c-cookie", "B2C", contoso)
        .unwrap();
    (host, composer)
}

async fn get(router: Router, uri: &str) -> Response {
    router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Challenge(String, AuthenticationProperties),
    SignOut(Vec<String>, AuthenticationProperties),
}

#[derive(Default)]
struct RecordingService {
    calls: Mutex<Vec<Call>>,
}

#[async_trait]
impl AuthenticationService for RecordingService {
    async fn challenge(&self, scheme: &str, properties: AuthenticationProperties) -> b2c_auth::Result<Response> {
        self.calls.lock().push(Call::Challenge(scheme.to_string(), properties));
        Ok(StatusCode::UNAUTHORIZED.into_response())
    }

    async fn sign_out(&self, schemes: &[String], properties: AuthenticationProperties) -> b2c_auth::Result<Response> {
        self.calls.lock().push(Call::SignOut(schemes.to_vec(), properties));
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}

fn recording_router() -> (Router, Arc<RecordingService>) {
    let (_, composer) = composed();
    let service = Arc::new(RecordingService::default());
    let state = AccountState::new(composer.finish(), service.clone());
    (account_router(state), service)
}

mod recording_tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_in_challenges_virtual_scheme() {
        let (router, service) = recording_router();

        let response = get(router, "/b2c/account/sign-in/b2c?return_url=%2Forders").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let calls = service.calls.lock();
        assert_eq!(
            calls.as_slice(),
            &[Call::Challenge(
                "b2c".to_string(),
                AuthenticationProperties::new().with_redirect_uri("/orders")
            )]
        );
    }

    #[tokio::test]
    async fn test_reset_password_sets_policy() {
        let (router, service) = recording_router();
        get(router, "/b2c/account/reset-password/b2c").await;

        let calls = service.calls.lock();
        match &calls[0] {
            Call::Challenge(scheme, properties) => {
                assert_eq!(scheme, "b2c");
                assert_eq!(properties.policy(), Some("B2C_1_reset"));
            }
            other => panic!("unexpected call: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_edit_profile_sets_policy() {
        let (router, service) = recording_router();
        get(router, "/b2c/account/edit-profile/b2c").await;

        let calls = service.calls.lock();
        assert!(matches!(&calls[0], Call::Challenge(_, p) if p.policy() == Some("B2C_1_edit")));
    }

    #[tokio::test]
    async fn test_sign_out_covers_both_schemes() {
        let (router, service) = recording_router();
        let response = get(router, "/b2c/account/sign-out/b2c").await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let calls = service.calls.lock();
        assert_eq!(
            calls.as_slice(),
            &[Call::SignOut(
                vec!["b2c-cookie".to_string(), "b2c-oidc".to_string()],
                AuthenticationProperties::new().with_redirect_uri("/b2c/account/signed-out")
            )]
        );
    }

    #[tokio::test]
    async fn test_unknown_scheme_is_not_found() {
        let (router, service) = recording_router();
        let response = get(router, "/b2c/account/sign-in/unknown").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "SCHEME_NOT_FOUND");
        assert!(service.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_static_pages() {
        for path in ["/b2c/account/signed-out", "/b2c/account/access-denied", "/b2c/account/error"] {
            let (router, _) = recording_router();
            let response = get(router, path).await;
            assert_eq!(response.status(), StatusCode::OK, "{path}");
        }
    }
}

mod redirect_tests {
    use super::*;

    fn redirect_router() -> (Router, Arc<RedirectAuthenticationService>) {
        let (host, composer) = composed();
        let service = Arc::new(RedirectAuthenticationService::new(
            host.build(),
            "https://app.example/",
        ));
        let state = AccountState::new(composer.finish(), service.clone());
        (account_router(state), service)
    }

    #[tokio::test]
    async fn test_sign_in_redirects_to_default_policy() {
        let (router, _) = redirect_router();
        let response = get(router, "/b2c/account/sign-in/b2c").await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = location(&response);
        assert!(location.starts_with(
            "https://contoso.b2clogin.com/tfp/contoso.onmicrosoft.com/B2C_1_susi/oauth2/v2.0/authorize?"
        ));
        assert!(location.contains("client_id=client-id"));
        assert!(location.contains("redirect_uri=https%3A%2F%2Fapp.example%2Fsignin-oidc"));
    }

    #[tokio::test]
    async fn test_reset_password_switches_issuer() {
        let (router, _) = redirect_router();
        let response = get(router, "/b2c/account/reset-password/b2c").await;

        let location = location(&response);
        assert!(location.starts_with(
            "https://contoso.b2clogin.com/tfp/contoso.onmicrosoft.com/b2c_1_reset/oauth2/v2.0/authorize?"
        ));
        assert!(location.contains("scope=openid%20profile"));
        assert!(location.contains("response_type=id_token"));
    }

    #[tokio::test]
    async fn test_sign_out_clears_cookie_and_ends_session() {
        let (router, _) = redirect_router();
        let response = get(router, "/b2c/account/sign-out/b2c").await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(location(&response).starts_with(
            "https://contoso.b2clogin.com/tfp/contoso.onmicrosoft.com/B2C_1_susi/oauth2/v2.0/logout?post_logout_redirect_uri=https%3A%2F%2Fapp.example%2Fb2c%2Faccount%2Fsigned-out"
        ));

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(cookie.starts_with("b2c-cookie.session="));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn test_forgot_password_failure_redirects_to_reset() {
        let (_, service) = redirect_router();
        let failure = RemoteFailure::Protocol {
            error: "access_denied".to_string(),
            description: Some("AADB2C90118: The user has forgotten their password.".to_string()),
        };

        assert_eq!(
            service.remote_failure("b2c", &failure, "").unwrap(),
            "/b2c/account/reset-password/b2c"
        );
    }
}
