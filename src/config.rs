//! Settings read from the environment (after loading `.env`).

use std::time::Duration;

use rand::{thread_rng, RngCore};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::external::check_table_name;
use crate::session::{ReadPolicy, SessionPolicy};

pub const DEFAULT_SCORES_TABLE: &str = "scores";
pub const DEFAULT_EXTERNAL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    Missing(&'static str),
    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(name: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name,
            value: value.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Which external service backs logins and rows.
pub enum Backend {
    Supabase { url: String, key: SecretString },
    Memory { accounts: String },
}

pub struct Settings {
    pub secret_key: SecretString,
    pub backend: Backend,
    pub scores_table: String,
    pub read_policy: ReadPolicy,
    pub session_policy: SessionPolicy,
    pub external_timeout: Duration,
    pub cors_allow_origin: String,
}

impl Settings {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| dotenv::var(name).ok())
    }

    /// Builds settings from an arbitrary variable lookup.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let secret_key = match var("SECRET_KEY") {
            Some(key) if !key.is_empty() => SecretString::from(key),
            _ => random_secret(),
        };

        let backend = match var("ACCOUNT_BACKEND").as_deref().unwrap_or("supabase") {
            "supabase" => Backend::Supabase {
                url: var("SUPABASE_URL").ok_or(ConfigError::Missing("SUPABASE_URL"))?,
                key: var("SUPABASE_KEY")
                    .map(SecretString::from)
                    .ok_or(ConfigError::Missing("SUPABASE_KEY"))?,
            },
            "memory" => Backend::Memory {
                accounts: var("MEMORY_ACCOUNTS").unwrap_or_default(),
            },
            other => {
                return Err(ConfigError::invalid(
                    "ACCOUNT_BACKEND",
                    other,
                    "expected `supabase` or `memory`",
                ))
            }
        };

        let scores_table = var("SCORES_TABLE").unwrap_or_else(|| DEFAULT_SCORES_TABLE.to_owned());
        check_table_name(&scores_table)
            .map_err(|err| ConfigError::invalid("SCORES_TABLE", &scores_table, err.to_string()))?;

        let scores_require_auth = match var("SCORES_REQUIRE_AUTH") {
            Some(value) => parse_bool("SCORES_REQUIRE_AUTH", &value)?,
            None => false,
        };

        let mut session_policy = SessionPolicy::default();
        if let Some(value) = var("SESSION_TTL_SECS") {
            session_policy.ttl = parse_secs("SESSION_TTL_SECS", &value)?;
        }
        if let Some(value) = var("SESSION_MAX") {
            session_policy.max_sessions = match value.trim().parse::<usize>() {
                Ok(0) => return Err(ConfigError::invalid("SESSION_MAX", &value, "must be positive")),
                Ok(max) => max,
                Err(err) => return Err(ConfigError::invalid("SESSION_MAX", &value, err.to_string())),
            };
        }

        let external_timeout = match var("EXTERNAL_TIMEOUT_SECS") {
            Some(value) => parse_secs("EXTERNAL_TIMEOUT_SECS", &value)?,
            None => DEFAULT_EXTERNAL_TIMEOUT,
        };

        Ok(Self {
            secret_key,
            backend,
            scores_table,
            read_policy: ReadPolicy {
                scores_require_auth,
            },
            session_policy,
            external_timeout,
            cors_allow_origin: var("CORS_ALLOW_ORIGIN").unwrap_or_else(|| "*".to_owned()),
        })
    }

    /// Hex form of the 256-bit key Rocket uses for private cookies.
    /// Any secret string is accepted; it is hashed down to the right size.
    pub fn cookie_key_hex(&self) -> String {
        let digest = Sha256::digest(self.secret_key.expose_secret().as_bytes());
        hex::encode(digest)
    }
}

fn random_secret() -> SecretString {
    let mut bytes = [0u8; 32];
    thread_rng().fill_bytes(&mut bytes);
    SecretString::from(hex::encode(bytes))
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(name, value, "expected a boolean")),
    }
}

fn parse_secs(name: &'static str, value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::invalid(name, value, "must be positive")),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(err) => Err(ConfigError::invalid(name, value, err.to_string())),
    }
}
