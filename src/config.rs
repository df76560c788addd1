//! # Configuration Management
//!
//! Configuration is read from the Worker environment once per isolate and
//! shared via `Arc`. Every setting has a default, so a bare deployment still
//! serves requests.
//!
//! ## Configuration Sources
//!
//! 1. **Worker vars / secrets**: `CURRENT_VERSION`, `AirScript_Token`,
//!    `UPSTREAM_ENDPOINT`, `UPSTREAM_TIMEOUT_SECS`
//! 2. **Build time**: `GATEWAY_BUNDLED_VERSION`, the bundled default version
//! 3. **Defaults**: see [`crate::constants`]
//!
//! ## Example
//!
//! ```rust,ignore
//! let config = Config::load(&env, &logger);
//! println!("Serving version {}", config.resolve_version());
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use worker::Env;

use crate::constants::{
    BUNDLED_VERSION, DEFAULT_UPSTREAM_ENDPOINT, DEFAULT_UPSTREAM_TIMEOUT_SECS, FALLBACK_VERSION,
    UPSTREAM_ENDPOINT_VAR, UPSTREAM_TIMEOUT_VAR, UPSTREAM_TOKEN_VAR, VERSION_VAR,
};
use crate::log_data;
use crate::logging::Logger;

/// Configuration structure for the gateway.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Version reported by `GET /api/version`, when set.
    pub version_override: Option<String>,

    /// Version bundled with the build, used when no override is set.
    pub bundled_version: Option<String>,

    /// Credential forwarded unchanged in the `AirScript-Token` header.
    pub upstream_token: Option<String>,

    /// Upstream URL template with `{file_id}` and `{task_id}` placeholders.
    pub upstream_endpoint: String,

    /// Upper bound on a single upstream call.
    pub upstream_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version_override: None,
            bundled_version: BUNDLED_VERSION.map(str::to_string),
            upstream_token: None,
            upstream_endpoint: DEFAULT_UPSTREAM_ENDPOINT.to_string(),
            upstream_timeout_secs: DEFAULT_UPSTREAM_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Loads configuration from Worker vars and secrets with fallback to defaults.
    ///
    /// A missing binding is not an error: the corresponding default is used.
    /// An unparsable timeout is logged and replaced by the default.
    pub fn load(env: &Env, logger: &Logger) -> Self {
        let var = |name: &str| {
            env.var(name)
                .ok()
                .map(|v| v.to_string())
                .filter(|v| !v.trim().is_empty())
        };

        let upstream_token = env
            .secret(UPSTREAM_TOKEN_VAR)
            .ok()
            .map(|v| v.to_string())
            .or_else(|| var(UPSTREAM_TOKEN_VAR));
        if upstream_token.is_none() {
            logger.warn("Upstream token is not configured", log_data!("binding" => UPSTREAM_TOKEN_VAR));
        }

        let upstream_timeout_secs = match var(UPSTREAM_TIMEOUT_VAR) {
            Some(raw) => parse_timeout_secs(&raw).unwrap_or_else(|| {
                logger.warn(
                    "Invalid upstream timeout, using default",
                    log_data!("value" => raw, "default" => DEFAULT_UPSTREAM_TIMEOUT_SECS),
                );
                DEFAULT_UPSTREAM_TIMEOUT_SECS
            }),
            None => DEFAULT_UPSTREAM_TIMEOUT_SECS,
        };

        let config = Self {
            version_override: var(VERSION_VAR),
            upstream_token,
            upstream_endpoint: var(UPSTREAM_ENDPOINT_VAR)
                .unwrap_or_else(|| DEFAULT_UPSTREAM_ENDPOINT.to_string()),
            upstream_timeout_secs,
            ..Self::default()
        };

        logger.info(
            "Configuration loaded",
            log_data!(
                "version" => config.resolve_version(),
                "upstream_endpoint" => config.upstream_endpoint,
                "upstream_timeout_secs" => config.upstream_timeout_secs
            ),
        );
        config
    }

    /// Override first, then the bundled default, then `"1.0.0"`.
    pub fn resolve_version(&self) -> &str {
        self.version_override
            .as_deref()
            .or(self.bundled_version.as_deref())
            .unwrap_or(FALLBACK_VERSION)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

/// Accepts a positive whole number of seconds.
fn parse_timeout_secs(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|secs| *secs > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_falls_back_to_literal() {
        let config = Config {
            bundled_version: None,
            ..Config::default()
        };
        assert_eq!(config.resolve_version(), "1.0.0");
    }

    #[test]
    fn bundled_version_used_without_override() {
        let config = Config {
            bundled_version: Some("2.3.0".to_string()),
            ..Config::default()
        };
        assert_eq!(config.resolve_version(), "2.3.0");
    }

    #[test]
    fn override_wins_over_bundled_version() {
        let config = Config {
            version_override: Some("3.0.1".to_string()),
            bundled_version: Some("2.3.0".to_string()),
            ..Config::default()
        };
        assert_eq!(config.resolve_version(), "3.0.1");
    }

    #[test]
    fn timeout_parsing_rejects_zero_and_garbage() {
        assert_eq!(parse_timeout_secs(" 15 "), Some(15));
        assert_eq!(parse_timeout_secs("0"), None);
        assert_eq!(parse_timeout_secs("soon"), None);
    }
}
