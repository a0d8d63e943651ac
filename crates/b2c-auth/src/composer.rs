//! Virtual scheme registration
//!
//! The composer owns the mapping registry and the B2C options during
//! startup. Each registration declares the virtual scheme on the host,
//! makes sure the OpenID Connect and cookie schemes exist, and hooks the
//! forwarder into their lazy options so the handlers read values derived
//! from the virtual scheme's options.

use std::sync::Arc;

use tracing::info;

use crate::defaults::{AUTHENTICATION_SCHEME, COOKIE_SCHEME, DISPLAY_NAME, OPEN_ID_SCHEME};
use crate::error::{AuthSchemeError, Result};
use crate::forwarder;
use crate::host::{AuthenticationHost, ForwardSchemes, HandlerKind, HostError};
use crate::mapping::{SchemeMapping, SchemeMappingRegistry};
use crate::monitor::{ConfigureFn, OptionsMonitor};
use crate::options::{B2cOptions, CookieAuthenticationOptions, OpenIdConnectOptions};

pub struct VirtualSchemeComposer {
    registry: SchemeMappingRegistry,
    options: Arc<OptionsMonitor<B2cOptions>>,
}

impl VirtualSchemeComposer {
    pub fn new(registry: SchemeMappingRegistry) -> Self {
        Self {
            registry,
            options: Arc::new(OptionsMonitor::new()),
        }
    }

    pub fn registry(&self) -> &SchemeMappingRegistry {
        &self.registry
    }

    /// Register the default `AzureADB2C` scheme.
    pub fn add_azure_ad_b2c<H, F>(&mut self, host: &mut H, configure: F) -> Result<SchemeMapping>
    where
        H: AuthenticationHost + ?Sized,
        F: Fn(&mut B2cOptions) + Send + Sync + 'static,
    {
        self.register(
            host,
            AUTHENTICATION_SCHEME,
            OPEN_ID_SCHEME,
            COOKIE_SCHEME,
            DISPLAY_NAME,
            configure,
        )
    }

    /// Register a virtual scheme backed by an OpenID Connect and a cookie scheme.
    ///
    /// Every check runs before the host or the registry is touched: names
    /// must be non-empty and distinct, unknown to the registry, the virtual
    /// name free on the host, and existing concrete schemes of the right
    /// kind. Host failures are returned as-is.
    pub fn register<H, F>(
        &mut self,
        host: &mut H,
        virtual_scheme: &str,
        open_id_connect_scheme: &str,
        cookie_scheme: &str,
        display_name: &str,
        configure: F,
    ) -> Result<SchemeMapping>
    where
        H: AuthenticationHost + ?Sized,
        F: Fn(&mut B2cOptions) + Send + Sync + 'static,
    {
        validate_names(virtual_scheme, open_id_connect_scheme, cookie_scheme)?;

        let mapping = SchemeMapping::new(virtual_scheme, open_id_connect_scheme, cookie_scheme);
        self.registry.check_available(&mapping)?;
        if host.has_scheme(virtual_scheme) {
            return Err(HostError::SchemeAlreadyExists(virtual_scheme.to_string()).into());
        }
        ensure_kind(host, open_id_connect_scheme, HandlerKind::OpenIdConnect)?;
        ensure_kind(host, cookie_scheme, HandlerKind::Cookie)?;

        host.add_virtual_scheme(
            virtual_scheme,
            Some(display_name),
            ForwardSchemes {
                default: Some(cookie_scheme.to_string()),
                challenge: Some(open_id_connect_scheme.to_string()),
                ..Default::default()
            },
        )?;

        let oidc_action = self.open_id_connect_forwarder(&mapping);
        if host.has_scheme(open_id_connect_scheme) {
            host.configure_open_id_connect(open_id_connect_scheme, oidc_action)?;
        } else {
            host.add_open_id_connect(open_id_connect_scheme, None, oidc_action)?;
        }

        let cookie_action = self.cookie_forwarder(&mapping);
        if host.has_scheme(cookie_scheme) {
            host.configure_cookie(cookie_scheme, cookie_action)?;
        } else {
            host.add_cookie(cookie_scheme, None, cookie_action)?;
        }

        self.registry.add(mapping.clone())?;
        self.options.configure(virtual_scheme, configure);

        info!(
            scheme = %virtual_scheme,
            open_id_connect_scheme = %open_id_connect_scheme,
            cookie_scheme = %cookie_scheme,
            "Virtual scheme registered"
        );

        Ok(mapping)
    }

    /// Freeze the registry and options for request-time use.
    pub fn finish(self) -> B2cSchemes {
        B2cSchemes {
            registry: Arc::new(self.registry),
            options: self.options,
        }
    }

    fn open_id_connect_forwarder(&self, mapping: &SchemeMapping) -> ConfigureFn<OpenIdConnectOptions> {
        let mapping = mapping.clone();
        let options = Arc::clone(&self.options);
        Arc::new(move |target: &mut OpenIdConnectOptions| {
            let virtual_options = options.get(&mapping.virtual_scheme);
            forwarder::configure_open_id_connect(&mapping, &virtual_options, target);
        })
    }

    fn cookie_forwarder(&self, mapping: &SchemeMapping) -> ConfigureFn<CookieAuthenticationOptions> {
        let mapping = mapping.clone();
        let options = Arc::clone(&self.options);
        Arc::new(move |target: &mut CookieAuthenticationOptions| {
            let virtual_options = options.get(&mapping.virtual_scheme);
            forwarder::configure_cookie(&mapping, &virtual_options, target);
        })
    }
}

impl Default for VirtualSchemeComposer {
    fn default() -> Self {
        Self::new(SchemeMappingRegistry::new())
    }
}

/// An existing scheme named `name` must be of the `expected` kind.
fn ensure_kind<H>(host: &H, name: &str, expected: HandlerKind) -> Result<()>
where
    H: AuthenticationHost + ?Sized,
{
    match host.handler_kind(name) {
        Some(kind) if kind != expected => Err(HostError::HandlerMismatch {
            scheme: name.to_string(),
            expected: expected.label(),
        }
        .into()),
        _ => Ok(()),
    }
}

fn validate_names(virtual_scheme: &str, open_id_connect_scheme: &str, cookie_scheme: &str) -> Result<()> {
    let names = [
        ("virtual", virtual_scheme),
        ("OpenID Connect", open_id_connect_scheme),
        ("cookie", cookie_scheme),
    ];

    for (kind, name) in names {
        if name.trim().is_empty() {
            return Err(AuthSchemeError::invalid_scheme_name(format!(
                "{} scheme name must not be empty",
                kind
            )));
        }
    }

    if open_id_connect_scheme == cookie_scheme
        || open_id_connect_scheme == virtual_scheme
        || cookie_scheme == virtual_scheme
    {
        return Err(AuthSchemeError::invalid_scheme_name(format!(
            "scheme names must be distinct: {}, {}, {}",
            virtual_scheme, open_id_connect_scheme, cookie_scheme
        )));
    }

    Ok(())
}

/// Read-only view of the registered virtual schemes.
#[derive(Debug, Clone)]
pub struct B2cSchemes {
    registry: Arc<SchemeMappingRegistry>,
    options: Arc<OptionsMonitor<B2cOptions>>,
}

impl B2cSchemes {
    pub fn resolve(&self, virtual_scheme: &str) -> Result<&SchemeMapping> {
        self.registry.resolve(virtual_scheme)
    }

    /// Resolved options of a registered virtual scheme.
    pub fn options(&self, virtual_scheme: &str) -> Result<Arc<B2cOptions>> {
        self.registry.resolve(virtual_scheme)?;
        Ok(self.options.get(virtual_scheme))
    }

    pub fn mappings(&self) -> impl Iterator<Item = &SchemeMapping> {
        self.registry.iter()
    }

    /// Validate the options of every registered scheme.
    pub fn validate(&self) -> Result<()> {
        for mapping in self.registry.iter() {
            self.options.get(&mapping.virtual_scheme).validate(&mapping.virtual_scheme)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::AuthenticationBuilder;

    #[test]
    fn test_rejects_colliding_names() {
        let mut host = AuthenticationBuilder::new();
        let mut composer = VirtualSchemeComposer::default();

        for (v, o, c) in [("b2c", "same", "same"), ("b2c", "b2c", "cookie"), ("b2c", "oidc", "b2c"), ("", "oidc", "cookie")] {
            let err = composer.register(&mut host, v, o, c, "B2C", |_| {}).unwrap_err();
            assert!(matches!(err, AuthSchemeError::InvalidSchemeName { .. }), "{v}/{o}/{c}");
        }
        assert!(composer.registry().is_empty());
        assert!(host.schemes().iter().next().is_none());
    }

    #[test]
    fn test_existing_concrete_scheme_is_configured() {
        let mut host = AuthenticationBuilder::new();
        host.add_cookie(
            "shared-cookie",
            None,
            Arc::new(|options: &mut CookieAuthenticationOptions| options.sliding_expiration = false),
        )
        .unwrap();

        let mut composer = VirtualSchemeComposer::default();
        composer
            .register(&mut host, "b2c", "b2c-oidc", "shared-cookie", "B2C", |_| {})
            .unwrap();

        let runtime = host.build();
        let cookie = runtime.cookie_options("shared-cookie");
        assert!(!cookie.sliding_expiration);
        assert_eq!(cookie.login_path, "/b2c/account/sign-in/b2c");
    }

    #[test]
    fn test_host_errors_propagate() {
        let mut host = AuthenticationBuilder::new();
        host.add_virtual_scheme("b2c", None, ForwardSchemes::default()).unwrap();

        let mut composer = VirtualSchemeComposer::default();
        let err = composer
            .register(&mut host, "b2c", "b2c-oidc", "b2c-cookie", "B2C", |_| {})
            .unwrap_err();
        assert!(matches!(err, AuthSchemeError::Host(HostError::SchemeAlreadyExists(ref s)) if s == "b2c"));
        assert!(composer.registry().is_empty());
        assert!(!host.has_scheme("b2c-oidc"));
        assert!(!host.has_scheme("b2c-cookie"));
    }

    #[test]
    fn test_wrong_kind_leaves_registry_and_host_unchanged() {
        let mut host = AuthenticationBuilder::new();
        host.add_cookie("b2c-oidc", None, Arc::new(|_: &mut CookieAuthenticationOptions| {}))
            .unwrap();

        let mut composer = VirtualSchemeComposer::default();
        let err = composer
            .register(&mut host, "b2c", "b2c-oidc", "b2c-cookie", "B2C", |_| {})
            .unwrap_err();
        assert!(matches!(
            err,
            AuthSchemeError::Host(HostError::HandlerMismatch { ref scheme, .. }) if scheme == "b2c-oidc"
        ));
        assert_eq!(err.to_string(), "Scheme b2c-oidc is not of kind OpenID Connect");

        assert!(composer.registry().is_empty());
        assert!(!host.has_scheme("b2c"));
        assert!(!host.has_scheme("b2c-cookie"));
        assert_eq!(host.schemes().iter().count(), 1);

        // The real cause is reported again on retry
        let err = composer
            .register(&mut host, "b2c", "b2c-oidc", "b2c-cookie", "B2C", |_| {})
            .unwrap_err();
        assert!(matches!(err, AuthSchemeError::Host(HostError::HandlerMismatch { .. })));
    }

    #[test]
    fn test_options_configured_lazily() {
        let mut host = AuthenticationBuilder::new();
        let mut composer = VirtualSchemeComposer::default();
        composer
            .add_azure_ad_b2c(&mut host, |options| {
                options.client_id = Some("client".to_string());
            })
            .unwrap();

        let schemes = composer.finish();
        assert_eq!(
            schemes.options(AUTHENTICATION_SCHEME).unwrap().client_id.as_deref(),
            Some("client")
        );
        assert!(matches!(
            schemes.options("unknown").unwrap_err(),
            AuthSchemeError::SchemeNotFound { .. }
        ));
        assert!(matches!(
            schemes.validate().unwrap_err(),
            AuthSchemeError::InvalidOptions { .. }
        ));
    }
}
