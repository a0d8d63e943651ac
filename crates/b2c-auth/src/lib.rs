//! Azure AD B2C virtual authentication scheme
//!
//! A virtual scheme is one logical name backed by an OpenID Connect scheme
//! (challenge) and a cookie scheme (everything else). This crate provides:
//! - `mapping`: the registry of virtual → concrete scheme triples
//! - `forwarder`: derivation of the concrete handler options
//! - `composer`: registration against an [`AuthenticationHost`]
//! - `host`: an in-process host with per-action scheme forwarding
//! - `account`: the account endpoints served for every virtual scheme
//!
//! ```rust,ignore
//! let mut host = AuthenticationBuilder::new();
//! let mut composer = VirtualSchemeComposer::new(SchemeMappingRegistry::new());
//! composer.add_azure_ad_b2c(&mut host, |options| {
//!     options.domain = Some("contoso.onmicrosoft.com".into());
//! })?;
//! let schemes = composer.finish();
//! let runtime = host.build();
//! ```

pub mod account;
pub mod composer;
pub mod defaults;
pub mod error;
pub mod events;
pub mod forwarder;
pub mod host;
pub mod mapping;
pub mod monitor;
pub mod options;
pub mod redirect;
pub mod routes;

pub use account::{account_router, AccountApiDoc, AccountState, AuthenticationService};
pub use composer::{B2cSchemes, VirtualSchemeComposer};
pub use error::{AuthSchemeError, ErrorResponse, Result};
pub use events::{AuthenticationProperties, B2cOpenIdConnectEvents, ProtocolMessage, RedirectContext, RemoteFailure};
pub use host::{
    AuthenticationBuilder, AuthenticationHost, AuthenticationRuntime, AuthenticationScheme,
    ForwardSchemes, HandlerKind, HostError, SchemeAction, SchemeProvider,
};
pub use mapping::{SchemeMapping, SchemeMappingRegistry};
pub use monitor::{ConfigureFn, OptionsMonitor};
pub use options::{B2cOptions, CookieAuthenticationOptions, CookieSettings, OpenIdConnectOptions};
pub use redirect::RedirectAuthenticationService;
pub use routes::{AccountRoutes, ACCOUNT_AREA};
