use std::env;

use keylatch_core::{LockError, LockResult};
use keylatch_infrastructure::{DEFAULT_KEY_ATTRIBUTE, DEFAULT_LOCK_TABLE};
use tracing_subscriber::EnvFilter;

const DEFAULT_REDIS_KEY_PREFIX: &str = "keylatch:lock";
const DEFAULT_TTL_SECONDS: u32 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockStoreConfig {
    Memory,
    Redis {
        url: String,
        key_prefix: String,
        key_attribute: String,
    },
    Postgres {
        database_url: String,
        table: String,
        key_attribute: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockctlConfig {
    pub store: LockStoreConfig,
    pub default_ttl_seconds: u32,
}

impl LockctlConfig {
    pub fn load() -> LockResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> LockResult<Self> {
        let optional = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let required = |name: &str| {
            optional(name).ok_or_else(|| LockError::Validation(format!("{name} is required")))
        };

        let key_attribute =
            optional("LOCK_KEY_ATTRIBUTE").unwrap_or_else(|| DEFAULT_KEY_ATTRIBUTE.to_owned());

        let store = match optional("LOCK_STORE").as_deref().unwrap_or("memory") {
            "memory" => LockStoreConfig::Memory,
            "redis" => LockStoreConfig::Redis {
                url: required("REDIS_URL")?,
                key_prefix: optional("LOCK_REDIS_KEY_PREFIX")
                    .unwrap_or_else(|| DEFAULT_REDIS_KEY_PREFIX.to_owned()),
                key_attribute,
            },
            "postgres" => LockStoreConfig::Postgres {
                database_url: required("DATABASE_URL")?,
                table: optional("LOCK_TABLE").unwrap_or_else(|| DEFAULT_LOCK_TABLE.to_owned()),
                key_attribute,
            },
            other => {
                return Err(LockError::Validation(format!(
                    "LOCK_STORE must be one of 'memory', 'redis' or 'postgres', got '{other}'"
                )));
            }
        };

        let default_ttl_seconds = match optional("LOCK_TTL_SECONDS") {
            Some(value) => parse_ttl("LOCK_TTL_SECONDS", value.as_str())?,
            None => DEFAULT_TTL_SECONDS,
        };

        Ok(Self {
            store,
            default_ttl_seconds,
        })
    }
}

pub fn parse_ttl(name: &str, value: &str) -> LockResult<u32> {
    let ttl_seconds = value.parse::<u32>().map_err(|error| {
        LockError::Validation(format!("invalid {name} value '{value}': {error}"))
    })?;

    if ttl_seconds == 0 {
        return Err(LockError::Validation(format!(
            "{name} must be greater than zero"
        )));
    }

    Ok(ttl_seconds)
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
