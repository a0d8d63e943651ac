//! B2C Dev Server
//!
//! Registers every configured B2C virtual scheme and serves its account
//! endpoints:
//! - `/b2c/account/*`: sign-in, policy, sign-out redirects and pages
//! - `/swagger-ui`, `/q/openapi`: API documentation
//! - `/health`: liveness
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `B2C_CONFIG` | - | Path to the TOML config file |
//! | `B2C_HTTP_HOST` | `127.0.0.1` | Bind address |
//! | `B2C_HTTP_PORT` | `5000` | HTTP port |
//! | `B2C_EXTERNAL_BASE_URL` | `https://localhost:5001` | Public URL for callbacks |
//! | `B2C_CLIENT_ID` | - | Application id of the first scheme |
//! | `B2C_DOMAIN` | - | Tenant domain of the first scheme |
//! | `RUST_LOG` | `info` | Log level |
//! | `LOG_FORMAT` | `text` | `json` for structured output |

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{response::Json, routing::get, Router};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use b2c_auth::defaults::{AUTHENTICATION_SCHEME, COOKIE_SCHEME, DISPLAY_NAME, OPEN_ID_SCHEME};
use b2c_auth::{
    account_router, AccountApiDoc, AccountState, AuthenticationBuilder, B2cOptions,
    RedirectAuthenticationService, SchemeMappingRegistry, VirtualSchemeComposer,
};
use b2c_config::{AppConfig, ConfigLoader, SchemeConfig};

#[tokio::main]
async fn main() -> Result<()> {
    b2c_common::init_logging("b2c-dev-server");

    info!("Starting B2C Dev Server");

    let config = ConfigLoader::new().load().context("loading configuration")?;
    config.validate()?;

    let app = build_app(&config)?;

    let addr = format!("{}:{}", config.http.host, config.http.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Account endpoints listening on http://{}", addr);
    info!("Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("B2C Dev Server shutdown complete");
    Ok(())
}

fn build_app(config: &AppConfig) -> Result<Router> {
    let mut host = AuthenticationBuilder::new();
    let mut composer = VirtualSchemeComposer::new(SchemeMappingRegistry::new());

    for scheme in &config.schemes {
        let options = scheme_options(scheme)?;
        composer.register(
            &mut host,
            scheme.scheme.as_deref().unwrap_or(AUTHENTICATION_SCHEME),
            scheme.open_id_connect_scheme.as_deref().unwrap_or(OPEN_ID_SCHEME),
            scheme.cookie_scheme.as_deref().unwrap_or(COOKIE_SCHEME),
            scheme.display_name.as_deref().unwrap_or(DISPLAY_NAME),
            move |target: &mut B2cOptions| target.clone_from(&options),
        )?;
    }

    let schemes = composer.finish();
    schemes.validate()?;
    for mapping in schemes.mappings() {
        info!(
            scheme = %mapping.virtual_scheme,
            sign_in = %b2c_auth::AccountRoutes::sign_in(&mapping.virtual_scheme),
            "Scheme ready"
        );
    }

    let auth = Arc::new(RedirectAuthenticationService::new(
        host.build(),
        config.http.external_base_url.clone(),
    ));
    let state = AccountState::new(schemes, auth);

    Ok(account_router(state)
        .route("/health", get(health_handler))
        .merge(SwaggerUi::new("/swagger-ui").url("/q/openapi", AccountApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)))
}

/// Virtual scheme options described by one `[[schemes]]` entry.
fn scheme_options(config: &SchemeConfig) -> Result<B2cOptions> {
    fn non_empty(value: &str) -> Option<String> {
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    }

    let cookie_expiration = config
        .cookie_expiration_secs
        .map(|secs| {
            i64::try_from(secs)
                .map(time::Duration::seconds)
                .with_context(|| format!("cookie_expiration_secs out of range: {}", secs))
        })
        .transpose()?;

    Ok(B2cOptions {
        client_id: non_empty(&config.client_id),
        client_secret: config.client_secret.clone(),
        instance: non_empty(&config.instance),
        domain: non_empty(&config.domain),
        sign_up_sign_in_policy_id: non_empty(&config.sign_up_sign_in_policy_id),
        reset_password_policy_id: config.reset_password_policy_id.clone(),
        edit_profile_policy_id: config.edit_profile_policy_id.clone(),
        callback_path: config.callback_path.clone(),
        signed_out_callback_path: config.signed_out_callback_path.clone(),
        response_type: config.response_type.clone(),
        scopes: config.scopes.clone(),
        cookie_name: config.cookie_name.clone(),
        cookie_path: config.cookie_path.clone(),
        cookie_expiration,
    })
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "UP",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received...");
}
