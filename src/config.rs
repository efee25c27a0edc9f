use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::models::Address;

#[derive(Debug, thiserror::Error)]
#[error("{name} must be {expected}, got `{value}`")]
pub struct ConfigError {
    name: &'static str,
    expected: &'static str,
    value: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: String,
    pub contract_info: PathBuf,
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
    /// Account that signs resets; the node's first account when unset.
    pub admin_account: Option<Address>,
    pub receipt_timeout: Duration,
    pub receipt_poll: Duration,
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError {
            name,
            expected,
            value,
        }),
    }
}

fn parse_positive(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    expected: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    match parse(lookup, name, expected, default)? {
        0 => Err(ConfigError {
            name,
            expected,
            value: "0".to_string(),
        }),
        n => Ok(n),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let admin_account = match lookup("ADMIN_ACCOUNT").filter(|v| !v.trim().is_empty()) {
            None => None,
            Some(value) => Some(value.parse().map_err(|_| ConfigError {
                name: "ADMIN_ACCOUNT",
                expected: "a 0x-prefixed 20-byte address",
                value,
            })?),
        };

        Ok(Config {
            rpc_url: lookup("RPC_URL").unwrap_or_else(|| "http://127.0.0.1:7545".to_string()),
            contract_info: lookup("CONTRACT_INFO")
                .unwrap_or_else(|| "contract_info.json".to_string())
                .into(),
            host: lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse(&lookup, "SERVER_PORT", "a valid u16", 5000)?,
            static_dir: lookup("STATIC_DIR")
                .unwrap_or_else(|| "static".to_string())
                .into(),
            admin_account,
            receipt_timeout: Duration::from_secs(parse(
                &lookup,
                "RECEIPT_TIMEOUT_SECS",
                "a number of seconds",
                120,
            )?),
            receipt_poll: Duration::from_millis(parse_positive(
                &lookup,
                "RECEIPT_POLL_MS",
                "a positive number of milliseconds",
                100,
            )?),
        })
    }
}
