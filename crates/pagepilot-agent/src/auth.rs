//! API key lookup for the completion provider

use pagepilot_core::{PilotError, Result};
use std::env;

/// Read the provider API key from the configured environment variable
///
/// Blank values are treated as missing.
pub fn get_api_key(env_name: &str) -> Result<String> {
    match env::var(env_name) {
        Ok(key) if !key.trim().is_empty() => {
            tracing::debug!("Using API key from {}", env_name);
            Ok(key.trim().to_string())
        }
        _ => Err(PilotError::Auth(format!(
            "No API key found. Set {}=... in the environment or a .env file",
            env_name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to prevent concurrent env var modifications
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn with_env_var<F, R>(key: &str, value: Option<&str>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = ENV_LOCK.lock().unwrap();
        let original = env::var(key).ok();

        match value {
            Some(v) => env::set_var(key, v),
            None => env::remove_var(key),
        }

        let result = f();

        match original {
            Some(v) => env::set_var(key, v),
            None => env::remove_var(key),
        }

        result
    }

    #[test]
    fn test_key_present() {
        with_env_var("PAGEPILOT_TEST_KEY", Some(" abc123 "), || {
            assert_eq!(get_api_key("PAGEPILOT_TEST_KEY").unwrap(), "abc123");
        });
    }

    #[test]
    fn test_key_missing() {
        with_env_var("PAGEPILOT_TEST_KEY", None, || {
            let err = get_api_key("PAGEPILOT_TEST_KEY").unwrap_err();
            assert!(matches!(err, PilotError::Auth(_)));
            assert!(err.to_string().contains("PAGEPILOT_TEST_KEY"));
        });
    }

    #[test]
    fn test_key_blank() {
        with_env_var("PAGEPILOT_TEST_KEY", Some("   "), || {
            assert!(get_api_key("PAGEPILOT_TEST_KEY").is_err());
        });
    }
}
