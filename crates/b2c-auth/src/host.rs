//! Host authentication system
//!
//! The composer talks to the host only through [`AuthenticationHost`].
//! [`AuthenticationBuilder`] is the in-process implementation: it keeps the
//! scheme table and one options monitor per handler kind, and freezes into
//! an [`AuthenticationRuntime`] shared by request handlers.

use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

use crate::monitor::{ConfigureFn, OptionsMonitor};
use crate::options::{CookieAuthenticationOptions, OpenIdConnectOptions};

/// Forwarding chains longer than this are treated as loops.
const MAX_FORWARD_DEPTH: usize = 8;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("Scheme already exists: {0}")]
    SchemeAlreadyExists(String),

    #[error("Unknown authentication scheme: {0}")]
    UnknownScheme(String),

    #[error("Forwarding loop detected at scheme: {0}")]
    ForwardLoop(String),

    #[error("Scheme {0} has no handler for this action")]
    NoHandler(String),

    #[error("Scheme {scheme} is not of kind {expected}")]
    HandlerMismatch { scheme: String, expected: &'static str },
}

/// Per-request authentication actions a scheme can forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeAction {
    Authenticate,
    Challenge,
    Forbid,
    SignIn,
    SignOut,
}

/// Forwarding targets of a virtual scheme.
///
/// An action without a specific target falls back to `default`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardSchemes {
    pub default: Option<String>,
    pub authenticate: Option<String>,
    pub challenge: Option<String>,
    pub forbid: Option<String>,
    pub sign_in: Option<String>,
    pub sign_out: Option<String>,
}

impl ForwardSchemes {
    pub fn target(&self, action: SchemeAction) -> Option<&str> {
        let specific = match action {
            SchemeAction::Authenticate => &self.authenticate,
            SchemeAction::Challenge => &self.challenge,
            SchemeAction::Forbid => &self.forbid,
            SchemeAction::SignIn => &self.sign_in,
            SchemeAction::SignOut => &self.sign_out,
        };
        specific.as_deref().or(self.default.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerKind {
    Virtual(ForwardSchemes),
    OpenIdConnect,
    Cookie,
}

impl HandlerKind {
    pub fn label(&self) -> &'static str {
        match self {
            HandlerKind::Virtual(_) => "virtual",
            HandlerKind::OpenIdConnect => "OpenID Connect",
            HandlerKind::Cookie => "cookie",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationScheme {
    pub name: String,
    pub display_name: Option<String>,
    pub handler: HandlerKind,
}

/// Scheme table in registration order.
#[derive(Debug, Clone, Default)]
pub struct SchemeProvider {
    schemes: IndexMap<String, AuthenticationScheme>,
}

impl SchemeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, scheme: AuthenticationScheme) -> Result<(), HostError> {
        if self.schemes.contains_key(&scheme.name) {
            return Err(HostError::SchemeAlreadyExists(scheme.name));
        }
        self.schemes.insert(scheme.name.clone(), scheme);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&AuthenticationScheme> {
        self.schemes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemes.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AuthenticationScheme> {
        self.schemes.values()
    }

    /// Follow virtual forwarding from `name` to the concrete scheme that
    /// handles `action`.
    pub fn forward_target(
        &self,
        name: &str,
        action: SchemeAction,
    ) -> Result<&AuthenticationScheme, HostError> {
        let mut current = name;
        for _ in 0..MAX_FORWARD_DEPTH {
            let scheme = self
                .get(current)
                .ok_or_else(|| HostError::UnknownScheme(current.to_string()))?;

            match &scheme.handler {
                HandlerKind::Virtual(forward) => {
                    current = forward
                        .target(action)
                        .ok_or_else(|| HostError::NoHandler(scheme.name.clone()))?;
                }
                _ => return Ok(scheme),
            }
        }
        Err(HostError::ForwardLoop(name.to_string()))
    }
}

/// Registration surface of a host authentication system.
pub trait AuthenticationHost {
    fn has_scheme(&self, name: &str) -> bool;

    /// Handler kind of a registered scheme.
    fn handler_kind(&self, name: &str) -> Option<HandlerKind>;

    /// Declare a scheme that only forwards to other schemes.
    fn add_virtual_scheme(
        &mut self,
        name: &str,
        display_name: Option<&str>,
        forward: ForwardSchemes,
    ) -> Result<(), HostError>;

    fn add_open_id_connect(
        &mut self,
        name: &str,
        display_name: Option<&str>,
        configure: ConfigureFn<OpenIdConnectOptions>,
    ) -> Result<(), HostError>;

    fn add_cookie(
        &mut self,
        name: &str,
        display_name: Option<&str>,
        configure: ConfigureFn<CookieAuthenticationOptions>,
    ) -> Result<(), HostError>;

    /// Attach another lazy configure action to an existing OpenID Connect scheme.
    fn configure_open_id_connect(
        &mut self,
        name: &str,
        configure: ConfigureFn<OpenIdConnectOptions>,
    ) -> Result<(), HostError>;

    fn configure_cookie(
        &mut self,
        name: &str,
        configure: ConfigureFn<CookieAuthenticationOptions>,
    ) -> Result<(), HostError>;
}

/// In-process [`AuthenticationHost`].
#[derive(Debug, Default)]
pub struct AuthenticationBuilder {
    schemes: SchemeProvider,
    open_id_connect: Arc<OptionsMonitor<OpenIdConnectOptions>>,
    cookie: Arc<OptionsMonitor<CookieAuthenticationOptions>>,
}

impl AuthenticationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schemes(&self) -> &SchemeProvider {
        &self.schemes
    }

    pub fn build(self) -> Arc<AuthenticationRuntime> {
        debug!(schemes = self.schemes.schemes.len(), "Authentication host built");
        Arc::new(AuthenticationRuntime {
            schemes: self.schemes,
            open_id_connect: self.open_id_connect,
            cookie: self.cookie,
        })
    }

    fn add_scheme(
        &mut self,
        name: &str,
        display_name: Option<&str>,
        handler: HandlerKind,
    ) -> Result<(), HostError> {
        self.schemes.add(AuthenticationScheme {
            name: name.to_string(),
            display_name: display_name.map(str::to_string),
            handler,
        })
    }

    fn expect_kind(&self, name: &str, expected: &HandlerKind) -> Result<(), HostError> {
        let scheme = self
            .schemes
            .get(name)
            .ok_or_else(|| HostError::UnknownScheme(name.to_string()))?;
        if &scheme.handler != expected {
            return Err(HostError::HandlerMismatch {
                scheme: name.to_string(),
                expected: expected.label(),
            });
        }
        Ok(())
    }
}

impl AuthenticationHost for AuthenticationBuilder {
    fn has_scheme(&self, name: &str) -> bool {
        self.schemes.contains(name)
    }

    fn handler_kind(&self, name: &str) -> Option<HandlerKind> {
        self.schemes.get(name).map(|scheme| scheme.handler.clone())
    }

    fn add_virtual_scheme(
        &mut self,
        name: &str,
        display_name: Option<&str>,
        forward: ForwardSchemes,
    ) -> Result<(), HostError> {
        self.add_scheme(name, display_name, HandlerKind::Virtual(forward))
    }

    fn add_open_id_connect(
        &mut self,
        name: &str,
        display_name: Option<&str>,
        configure: ConfigureFn<OpenIdConnectOptions>,
    ) -> Result<(), HostError> {
        self.add_scheme(name, display_name, HandlerKind::OpenIdConnect)?;
        self.open_id_connect.configure_arc(name, configure);
        Ok(())
    }

    fn add_cookie(
        &mut self,
        name: &str,
        display_name: Option<&str>,
        configure: ConfigureFn<CookieAuthenticationOptions>,
    ) -> Result<(), HostError> {
        self.add_scheme(name, display_name, HandlerKind::Cookie)?;

        let cookie_name = format!("{}.session", name);
        self.cookie.configure(name, move |options| {
            options.cookie.name.get_or_insert_with(|| cookie_name.clone());
        });
        self.cookie.configure_arc(name, configure);
        Ok(())
    }

    fn configure_open_id_connect(
        &mut self,
        name: &str,
        configure: ConfigureFn<OpenIdConnectOptions>,
    ) -> Result<(), HostError> {
        self.expect_kind(name, &HandlerKind::OpenIdConnect)?;
        self.open_id_connect.configure_arc(name, configure);
        Ok(())
    }

    fn configure_cookie(
        &mut self,
        name: &str,
        configure: ConfigureFn<CookieAuthenticationOptions>,
    ) -> Result<(), HostError> {
        self.expect_kind(name, &HandlerKind::Cookie)?;
        self.cookie.configure_arc(name, configure);
        Ok(())
    }
}

/// Frozen host state shared with request handlers.
#[derive(Debug)]
pub struct AuthenticationRuntime {
    schemes: SchemeProvider,
    open_id_connect: Arc<OptionsMonitor<OpenIdConnectOptions>>,
    cookie: Arc<OptionsMonitor<CookieAuthenticationOptions>>,
}

impl AuthenticationRuntime {
    pub fn schemes(&self) -> &SchemeProvider {
        &self.schemes
    }

    pub fn open_id_connect_options(&self, scheme: &str) -> Arc<OpenIdConnectOptions> {
        self.open_id_connect.get(scheme)
    }

    pub fn cookie_options(&self, scheme: &str) -> Arc<CookieAuthenticationOptions> {
        self.cookie.get(scheme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn virtual_to(default: &str, challenge: &str) -> ForwardSchemes {
        ForwardSchemes {
            default: Some(default.to_string()),
            challenge: Some(challenge.to_string()),
            ..Default::default()
        }
    }

    fn noop<T>() -> ConfigureFn<T> {
        Arc::new(|_: &mut T| {})
    }

    fn host() -> AuthenticationBuilder {
        let mut host = AuthenticationBuilder::new();
        host.add_cookie("cookie", None, noop()).unwrap();
        host.add_open_id_connect("oidc", None, noop()).unwrap();
        host.add_virtual_scheme("b2c", Some("B2C"), virtual_to("cookie", "oidc"))
            .unwrap();
        host
    }

    #[test]
    fn test_forward_target_per_action() {
        let host = host();
        let schemes = host.schemes();

        assert_eq!(schemes.forward_target("b2c", SchemeAction::Challenge).unwrap().name, "oidc");
        assert_eq!(schemes.forward_target("b2c", SchemeAction::Authenticate).unwrap().name, "cookie");
        assert_eq!(schemes.forward_target("b2c", SchemeAction::SignOut).unwrap().name, "cookie");
        assert_eq!(schemes.forward_target("cookie", SchemeAction::Challenge).unwrap().name, "cookie");
    }

    #[test]
    fn test_forward_errors() {
        let mut host = host();
        host.add_virtual_scheme("a", None, virtual_to("b", "b")).unwrap();
        host.add_virtual_scheme("b", None, virtual_to("a", "a")).unwrap();
        host.add_virtual_scheme("empty", None, ForwardSchemes::default()).unwrap();
        let schemes = host.schemes();

        assert_eq!(
            schemes.forward_target("a", SchemeAction::Challenge).unwrap_err(),
            HostError::ForwardLoop("a".to_string())
        );
        assert_eq!(
            schemes.forward_target("empty", SchemeAction::Challenge).unwrap_err(),
            HostError::NoHandler("empty".to_string())
        );
        assert_eq!(
            schemes.forward_target("missing", SchemeAction::Challenge).unwrap_err(),
            HostError::UnknownScheme("missing".to_string())
        );
    }

    #[test]
    fn test_duplicate_scheme_rejected() {
        let mut host = host();
        let err = host.add_cookie("oidc", None, noop()).unwrap_err();
        assert_eq!(err, HostError::SchemeAlreadyExists("oidc".to_string()));
    }

    #[test]
    fn test_configure_checks_handler_kind() {
        let mut host = host();
        let err = host
            .configure_cookie("oidc", noop())
            .unwrap_err();
        assert!(matches!(err, HostError::HandlerMismatch { ref scheme, .. } if scheme == "oidc"));

        let err = host
            .configure_open_id_connect("missing", noop())
            .unwrap_err();
        assert_eq!(err, HostError::UnknownScheme("missing".to_string()));
    }

    #[test]
    fn test_cookie_name_defaults_to_scheme() {
        let mut host = host();
        host.add_cookie(
            "named",
            None,
            Arc::new(|options: &mut CookieAuthenticationOptions| {
                options.cookie.name = Some(".custom".to_string())
            }),
        )
        .unwrap();
        let runtime = host.build();

        assert_eq!(runtime.cookie_options("cookie").cookie.name.as_deref(), Some("cookie.session"));
        assert_eq!(runtime.cookie_options("named").cookie.name.as_deref(), Some(".custom"));
    }
}
