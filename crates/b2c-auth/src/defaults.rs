//! Default scheme names and well-known keys

/// Virtual scheme registered by [`VirtualSchemeComposer::add_azure_ad_b2c`](crate::VirtualSchemeComposer::add_azure_ad_b2c).
pub const AUTHENTICATION_SCHEME: &str = "AzureADB2C";

/// OpenID Connect scheme behind the default virtual scheme.
pub const OPEN_ID_SCHEME: &str = "AzureADB2COpenID";

/// Cookie scheme behind the default virtual scheme.
pub const COOKIE_SCHEME: &str = "AzureADB2CCookie";

pub const DISPLAY_NAME: &str = "Azure Active Directory B2C";

/// Authentication property item naming the B2C policy to challenge with.
pub const POLICY_KEY: &str = "Policy";

/// Scope requested when switching away from the default policy.
pub const OPEN_ID_PROFILE_SCOPE: &str = "openid profile";

/// Response type requested when switching away from the default policy.
pub const ID_TOKEN_RESPONSE_TYPE: &str = "id_token";

/// B2C error code returned when the user clicks "forgot password" on a
/// sign-up/sign-in policy.
pub const FORGOT_PASSWORD_ERROR: &str = "AADB2C90118";
