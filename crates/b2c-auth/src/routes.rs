//! Account route manifest
//!
//! Fixed table of the account endpoints served per virtual scheme. The
//! cookie handler's login/logout/access-denied paths and the remote-failure
//! redirects are all derived from here, so the router and the forwarded
//! options can never disagree.

/// Path prefix shared by every account route.
pub const ACCOUNT_AREA: &str = "/b2c/account";

/// Route patterns and concrete paths of the account endpoints.
pub struct AccountRoutes;

impl AccountRoutes {
    pub const SIGN_IN_PATTERN: &'static str = "/b2c/account/sign-in/{scheme}";
    pub const RESET_PASSWORD_PATTERN: &'static str = "/b2c/account/reset-password/{scheme}";
    pub const EDIT_PROFILE_PATTERN: &'static str = "/b2c/account/edit-profile/{scheme}";
    pub const SIGN_OUT_PATTERN: &'static str = "/b2c/account/sign-out/{scheme}";
    pub const SIGNED_OUT_PATH: &'static str = "/b2c/account/signed-out";
    pub const ACCESS_DENIED_PATH: &'static str = "/b2c/account/access-denied";
    pub const ERROR_PATH: &'static str = "/b2c/account/error";

    pub fn sign_in(scheme: &str) -> String {
        format!("{}/sign-in/{}", ACCOUNT_AREA, scheme)
    }

    pub fn reset_password(scheme: &str) -> String {
        format!("{}/reset-password/{}", ACCOUNT_AREA, scheme)
    }

    pub fn edit_profile(scheme: &str) -> String {
        format!("{}/edit-profile/{}", ACCOUNT_AREA, scheme)
    }

    pub fn sign_out(scheme: &str) -> String {
        format!("{}/sign-out/{}", ACCOUNT_AREA, scheme)
    }

    pub fn signed_out() -> &'static str {
        Self::SIGNED_OUT_PATH
    }

    pub fn access_denied() -> &'static str {
        Self::ACCESS_DENIED_PATH
    }

    pub fn error() -> &'static str {
        Self::ERROR_PATH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_match_patterns() {
        let pairs = [
            (AccountRoutes::sign_in("b2c"), AccountRoutes::SIGN_IN_PATTERN),
            (AccountRoutes::reset_password("b2c"), AccountRoutes::RESET_PASSWORD_PATTERN),
            (AccountRoutes::edit_profile("b2c"), AccountRoutes::EDIT_PROFILE_PATTERN),
            (AccountRoutes::sign_out("b2c"), AccountRoutes::SIGN_OUT_PATTERN),
        ];
        for (path, pattern) in pairs {
            assert_eq!(path, pattern.replace("{scheme}", "b2c"));
        }
        assert!(AccountRoutes::signed_out().starts_with(ACCOUNT_AREA));
    }
}
