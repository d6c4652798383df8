//! Environment-driven gateway configuration.

use std::{path::PathBuf, time::Duration};

use crate::session::DEFAULT_SWEEP_INTERVAL;

const DEFAULT_PORT: u16 = 8081;
const DEFAULT_RUNS_DIR: &str = "./tmp/runs";
const DEFAULT_SANDBOX_URL: &str = "http://localhost:3000";

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// `PORT` is not a valid TCP port.
    #[error("invalid PORT '{value}'")]
    InvalidPort { value: String },

    /// `SESSION_SWEEP_INTERVAL_SECS` is not a positive integer.
    #[error("invalid SESSION_SWEEP_INTERVAL_SECS '{value}'")]
    InvalidSweepInterval { value: String },

    /// `ADMIN_PASSWORD_HASH` is not a hex SHA-256 digest.
    #[error("ADMIN_PASSWORD_HASH must be 64 hex characters")]
    InvalidPasswordHash,

    /// A boolean flag has an unrecognised value.
    #[error("invalid boolean for {name}: '{value}'")]
    InvalidFlag { name: &'static str, value: String },
}

/// Gateway settings.
///
/// | Variable | Default |
/// |---|---|
/// | `CODEGATE_LISTEN_ADDR` | `0.0.0.0:$PORT` |
/// | `PORT` | `8081` |
/// | `RUNS_DIR` | `./tmp/runs`, resolved against the working directory |
/// | `SANDBOX_SERVICE_URL` | `http://localhost:3000` |
/// | `ADMIN_PASSWORD_HASH` | unset: admin login disabled |
/// | `IP_HASH_SALT` | unset: random per process |
/// | `TRUST_FORWARDED_FOR` | `true` |
/// | `SESSION_SWEEP_INTERVAL_SECS` | `3600` |
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct GatewayConfig {
    /// Socket address to bind.
    pub listen_addr: String,
    /// Archive directory.
    pub runs_dir: PathBuf,
    /// Base URL of the sandbox service.
    pub sandbox_url: String,
    /// Lowercase hex SHA-256 of the admin password.
    pub admin_password_hash: Option<String>,
    /// Salt for caller-address hashes.
    pub ip_hash_salt: Option<String>,
    /// Take the caller address from `X-Forwarded-For` / `X-Real-IP`.
    pub trust_forwarded_for: bool,
    /// Period of the expired-session sweep.
    pub sweep_interval: Duration,
}

impl GatewayConfig {
    /// Read the configuration from the process environment.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`. Empty values count as unset.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if a variable is set to an unusable value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let listen_addr = match get("CODEGATE_LISTEN_ADDR") {
            Some(addr) => addr,
            None => {
                let port = match get("PORT") {
                    Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidPort { value: raw })?,
                    None => DEFAULT_PORT,
                };
                format!("0.0.0.0:{port}")
            }
        };

        let runs_dir = resolve_runs_dir(get("RUNS_DIR").as_deref().unwrap_or(DEFAULT_RUNS_DIR));

        let admin_password_hash = get("ADMIN_PASSWORD_HASH")
            .map(|hash| {
                if hash.len() == 64 && hash.bytes().all(|b| b.is_ascii_hexdigit()) {
                    Ok(hash.to_ascii_lowercase())
                } else {
                    Err(ConfigError::InvalidPasswordHash)
                }
            })
            .transpose()?;

        let trust_forwarded_for = match get("TRUST_FORWARDED_FOR") {
            None => true,
            Some(raw) => parse_flag("TRUST_FORWARDED_FOR", &raw)?,
        };

        let sweep_interval = match get("SESSION_SWEEP_INTERVAL_SECS") {
            None => DEFAULT_SWEEP_INTERVAL,
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(ConfigError::InvalidSweepInterval { value: raw }),
            },
        };

        Ok(Self {
            listen_addr,
            runs_dir,
            sandbox_url: get("SANDBOX_SERVICE_URL").unwrap_or_else(|| DEFAULT_SANDBOX_URL.to_owned()),
            admin_password_hash,
            ip_hash_salt: get("IP_HASH_SALT"),
            trust_forwarded_for,
            sweep_interval,
        })
    }
}

fn resolve_runs_dir(raw: &str) -> PathBuf {
    let dir = PathBuf::from(raw);
    if dir.is_absolute() {
        return dir;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(dir),
        Err(_) => dir,
    }
}

fn parse_flag(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag { name, value: raw.to_owned() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<GatewayConfig, ConfigError> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        GatewayConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = match config_from(&[]) {
            Ok(c) => c,
            Err(e) => panic!("defaults must be valid: {e}"),
        };
        assert_eq!(config.listen_addr, "0.0.0.0:8081");
        assert!(config.runs_dir.is_absolute());
        assert!(config.runs_dir.ends_with("tmp/runs"));
        assert_eq!(config.sandbox_url, "http://localhost:3000");
        assert!(config.admin_password_hash.is_none());
        assert!(config.ip_hash_salt.is_none());
        assert!(config.trust_forwarded_for);
        assert_eq!(config.sweep_interval, Duration::from_secs(3600));
    }

    #[test]
    fn empty_values_count_as_unset() {
        let config = config_from(&[("PORT", ""), ("ADMIN_PASSWORD_HASH", "  ")]);
        assert!(config.is_ok_and(|c| c.listen_addr == "0.0.0.0:8081" && c.admin_password_hash.is_none()));
    }

    #[test]
    fn listen_addr_overrides_port() {
        let config = config_from(&[("PORT", "9000"), ("CODEGATE_LISTEN_ADDR", "127.0.0.1:7000")]);
        assert!(config.is_ok_and(|c| c.listen_addr == "127.0.0.1:7000"));

        let config = config_from(&[("PORT", "9000")]);
        assert!(config.is_ok_and(|c| c.listen_addr == "0.0.0.0:9000"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(config_from(&[("PORT", "http")]), Err(ConfigError::InvalidPort { .. })));
        assert!(matches!(
            config_from(&[("SESSION_SWEEP_INTERVAL_SECS", "0")]),
            Err(ConfigError::InvalidSweepInterval { .. })
        ));
        assert!(matches!(
            config_from(&[("ADMIN_PASSWORD_HASH", "secret")]),
            Err(ConfigError::InvalidPasswordHash)
        ));
        assert!(matches!(
            config_from(&[("TRUST_FORWARDED_FOR", "maybe")]),
            Err(ConfigError::InvalidFlag { .. })
        ));
    }

    #[test]
    fn password_hash_is_normalised_to_lowercase() {
        let upper = "AB".repeat(32);
        let config = config_from(&[("ADMIN_PASSWORD_HASH", upper.as_str())]);
        assert!(config.is_ok_and(|c| c.admin_password_hash == Some("ab".repeat(32))));
    }

    #[test]
    fn absolute_runs_dir_is_kept() {
        let config = config_from(&[("RUNS_DIR", "/var/lib/codegate/runs")]);
        assert!(config.is_ok_and(|c| c.runs_dir == PathBuf::from("/var/lib/codegate/runs")));
    }
}
