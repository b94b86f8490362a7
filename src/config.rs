//! Environment-based configuration.
//!
//! All options are read once at startup. Unrecognized or invalid values
//! are logged and replaced with documented defaults rather than failing.

use std::env;
use std::time::Duration;

use tracing::warn;

/// Disable emoji prefixes in composed commit messages.
pub const DISABLE_EMOJIS_ENV_VAR: &str = "QIT_DISABLE_EMOJIS";

/// Override the per-invocation git timeout, in seconds.
pub const GIT_TIMEOUT_ENV_VAR: &str = "QIT_GIT_TIMEOUT";

/// Default timeout for a single git invocation (2 minutes).
const DEFAULT_GIT_TIMEOUT_SECS: u64 = 120;

/// Maximum length of a commit summary line.
pub const SUMMARY_MAX_LEN: usize = 72;

/// The recognized `QIT_*` environment variables.
const RECOGNIZED_VARS: &[&str] = &[DISABLE_EMOJIS_ENV_VAR, GIT_TIMEOUT_ENV_VAR];

/// Runtime configuration derived from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// When true, composed messages never carry an emoji.
    pub emojis_disabled: bool,
    /// Upper bound for a single git invocation.
    pub git_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            emojis_disabled: false,
            git_timeout: Duration::from_secs(DEFAULT_GIT_TIMEOUT_SECS),
        }
    }
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Logs a warning for any `QIT_*` variable that is not recognized and
    /// for recognized variables with values that cannot be parsed; both
    /// fall back to the defaults.
    pub fn from_env() -> Self {
        for (key, _) in env::vars() {
            if key.starts_with("QIT_") && !RECOGNIZED_VARS.contains(&key.as_str()) {
                warn!("Ignoring unrecognized environment variable {}", key);
            }
        }

        Self {
            emojis_disabled: read_bool(DISABLE_EMOJIS_ENV_VAR, false),
            git_timeout: read_timeout(),
        }
    }
}

/// Parse a boolean-like environment variable.
///
/// Accepts true/false, 1/0, yes/no (case-insensitive). Anything else logs
/// a warning and yields the default.
fn read_bool(var: &str, default: bool) -> bool {
    match env::var(var) {
        Ok(v) if !v.is_empty() => match v.to_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            other => {
                warn!(
                    "Invalid {} value '{}', using default {}",
                    var, other, default
                );
                default
            }
        },
        _ => default,
    }
}

/// Read the git timeout, falling back to the default on invalid input.
fn read_timeout() -> Duration {
    match env::var(GIT_TIMEOUT_ENV_VAR) {
        Ok(v) if !v.is_empty() => match v.parse::<u64>() {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => {
                warn!(
                    "Invalid {} value '{}', using default {}s",
                    GIT_TIMEOUT_ENV_VAR, v, DEFAULT_GIT_TIMEOUT_SECS
                );
                Duration::from_secs(DEFAULT_GIT_TIMEOUT_SECS)
            }
        },
        _ => Duration::from_secs(DEFAULT_GIT_TIMEOUT_SECS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_defaults_with_no_env() {
        temp_env::with_vars_unset([DISABLE_EMOJIS_ENV_VAR, GIT_TIMEOUT_ENV_VAR], || {
            let config = Config::from_env();
            assert!(!config.emojis_disabled);
            assert_eq!(
                config.git_timeout,
                Duration::from_secs(DEFAULT_GIT_TIMEOUT_SECS)
            );
        });
    }

    #[test]
    #[serial]
    fn test_disable_emojis_true() {
        temp_env::with_var(DISABLE_EMOJIS_ENV_VAR, Some("true"), || {
            assert!(Config::from_env().emojis_disabled);
        });
    }

    #[test]
    #[serial]
    fn test_disable_emojis_one() {
        temp_env::with_var(DISABLE_EMOJIS_ENV_VAR, Some("1"), || {
            assert!(Config::from_env().emojis_disabled);
        });
    }

    #[test]
    #[serial]
    fn test_disable_emojis_invalid_falls_back() {
        temp_env::with_var(DISABLE_EMOJIS_ENV_VAR, Some("maybe"), || {
            assert!(!Config::from_env().emojis_disabled);
        });
    }

    #[test]
    #[serial]
    fn test_timeout_from_env() {
        temp_env::with_var(GIT_TIMEOUT_ENV_VAR, Some("30"), || {
            assert_eq!(Config::from_env().git_timeout, Duration::from_secs(30));
        });
    }

    #[test]
    #[serial]
    fn test_timeout_zero_falls_back() {
        temp_env::with_var(GIT_TIMEOUT_ENV_VAR, Some("0"), || {
            assert_eq!(
                Config::from_env().git_timeout,
                Duration::from_secs(DEFAULT_GIT_TIMEOUT_SECS)
            );
        });
    }

    #[test]
    #[serial]
    fn test_timeout_not_a_number_falls_back() {
        temp_env::with_var(GIT_TIMEOUT_ENV_VAR, Some("soon"), || {
            assert_eq!(
                Config::from_env().git_timeout,
                Duration::from_secs(DEFAULT_GIT_TIMEOUT_SECS)
            );
        });
    }
}
