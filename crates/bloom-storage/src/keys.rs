//! Storage key constants.

/// Storage keys used by the client
pub struct StorageKeys;

impl StorageKeys {
    /// Short-lived bearer access token
    pub const ACCESS_TOKEN: &'static str = "access_token";

    /// Longer-lived refresh token
    pub const REFRESH_TOKEN: &'static str = "refresh_token";

    /// Cached user record (JSON)
    pub const USER_INFO: &'static str = "user_info";
}
