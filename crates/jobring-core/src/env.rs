//! Environment variable utilities
//!
//! Every `JR_*` override in the workspace goes through these helpers, so a
//! malformed value silently falls back to the compiled-in default instead
//! of aborting pool creation.
//!
//! ```ignore
//! use jobring_core::env::{env_get, env_get_bool};
//!
//! let workers: usize = env_get("JR_NUM_WORKERS", 4);
//! let flush: bool = env_get_bool("JR_FLUSH_EPRINT", false);
//! ```

use std::str::FromStr;

/// Get environment variable parsed as `T`, or `None` if unset or unparsable
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Get environment variable parsed as `T`, or return `default`
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// Get environment variable as boolean
///
/// "1", "true", "yes", "on" (case-insensitive) are true, anything else set
/// is false. Unset returns `default`.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => matches!(val.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_get_default() {
        let val: usize = env_get("__JR_TEST_UNSET_VAR__", 42);
        assert_eq!(val, 42);

        let val: Option<usize> = env_get_opt("__JR_TEST_UNSET_VAR__");
        assert!(val.is_none());
    }

    #[test]
    fn test_env_get_with_set_var() {
        std::env::set_var("__JR_TEST_NUM__", " 123 ");
        let val: usize = env_get("__JR_TEST_NUM__", 0);
        assert_eq!(val, 123);
        std::env::remove_var("__JR_TEST_NUM__");
    }

    #[test]
    fn test_env_get_invalid_parse() {
        std::env::set_var("__JR_TEST_INVALID__", "not_a_number");
        let val: usize = env_get("__JR_TEST_INVALID__", 99);
        assert_eq!(val, 99);
        std::env::remove_var("__JR_TEST_INVALID__");
    }

    #[test]
    fn test_env_get_bool_variants() {
        assert!(env_get_bool("__JR_TEST_BOOL_UNSET__", true));
        assert!(!env_get_bool("__JR_TEST_BOOL_UNSET__", false));

        for truthy in ["1", "true", "TRUE", "yes", "on"] {
            std::env::set_var("__JR_TEST_BOOL__", truthy);
            assert!(env_get_bool("__JR_TEST_BOOL__", false), "{} should be true", truthy);
        }
        for falsy in ["0", "false", "garbage"] {
            std::env::set_var("__JR_TEST_BOOL__", falsy);
            assert!(!env_get_bool("__JR_TEST_BOOL__", true), "{} should be false", falsy);
        }
        std::env::remove_var("__JR_TEST_BOOL__");
    }
}
