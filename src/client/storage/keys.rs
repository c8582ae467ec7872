//! Well-known storage keys.

pub const ACCESS_TOKEN: &str = "accessToken";
pub const REFRESH_TOKEN: &str = "refreshToken";
pub const USER_PROFILE: &str = "user";
pub const OFFLINE_QUEUE: &str = "offlineQueue";

/// Namespace for every cache entry
pub const CACHE_PREFIX: &str = "cache:";

/// Keys removed when the session ends
pub const AUTH_KEYS: [&str; 3] = [ACCESS_TOKEN, REFRESH_TOKEN, USER_PROFILE];

/// Cache key for one resource, e.g. `studentProfile:42`
pub fn resource_key(resource: &str, id: &str) -> String {
    format!("{}:{}", resource, id)
}
