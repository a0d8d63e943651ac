//! Copies virtual scheme options onto the concrete handler options
//!
//! Both functions only overwrite what the virtual options actually carry,
//! so applying them twice yields the same target.

use std::sync::Arc;

use axum_extra::extract::cookie::SameSite;

use crate::events::B2cOpenIdConnectEvents;
use crate::mapping::SchemeMapping;
use crate::options::{B2cOptions, CookieAuthenticationOptions, OpenIdConnectOptions};
use crate::routes::AccountRoutes;

/// `{instance}/{domain}/{default policy}/v2.0`, when all three are set.
pub fn build_authority(options: &B2cOptions) -> Option<String> {
    let instance = options.instance.as_deref()?.trim_end_matches('/');
    let domain = options.domain.as_deref()?;
    let policy = options.default_policy()?;
    Some(format!("{}/{}/{}/v2.0", instance, domain, policy))
}

pub fn configure_open_id_connect(
    mapping: &SchemeMapping,
    options: &B2cOptions,
    target: &mut OpenIdConnectOptions,
) {
    if let Some(client_id) = &options.client_id {
        target.client_id = Some(client_id.clone());
    }
    if let Some(secret) = &options.client_secret {
        target.client_secret = Some(secret.clone());
    }
    if let Some(authority) = build_authority(options) {
        target.authority = Some(authority);
    }
    if let Some(response_type) = &options.response_type {
        target.response_type = response_type.clone();
    }
    if let Some(path) = &options.callback_path {
        target.callback_path = path.clone();
    }
    if let Some(path) = &options.signed_out_callback_path {
        target.signed_out_callback_path = path.clone();
    }
    for scope in &options.scopes {
        if !target.scope.contains(scope) {
            target.scope.push(scope.clone());
        }
    }

    target.sign_in_scheme = Some(mapping.cookie_scheme.clone());
    target.use_token_lifetime = true;
    target.name_claim_type = "name".to_string();
    target.events = Some(Arc::new(B2cOpenIdConnectEvents::new(
        mapping.virtual_scheme.clone(),
        options.sign_up_sign_in_policy_id.clone(),
    )));
}

pub fn configure_cookie(
    mapping: &SchemeMapping,
    options: &B2cOptions,
    target: &mut CookieAuthenticationOptions,
) {
    if let Some(name) = &options.cookie_name {
        target.cookie.name = Some(name.clone());
    }
    if let Some(path) = &options.cookie_path {
        target.cookie.path = path.clone();
    }
    if let Some(expiration) = options.cookie_expiration {
        target.expire_time_span = expiration;
    }

    target.login_path = AccountRoutes::sign_in(&mapping.virtual_scheme);
    target.logout_path = AccountRoutes::sign_out(&mapping.virtual_scheme);
    target.access_denied_path = AccountRoutes::access_denied().to_string();
    // The identity provider posts the callback cross-site.
    target.cookie.same_site = SameSite::None;
}
