//! Settings definitions and the resolved runtime configuration.
//!
//! Settings are persisted as a nested JSON tree under the `settings` key of
//! the config document. Only the keys in [`KEY_DEFINITIONS`] may be written;
//! each carries a default and inclusive bounds.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::{AppError, AppResult};

/// Directory name under the per-user config root.
pub const APP_DIR_NAME: &str = "agent-mongo";
/// Config file name inside [`config_dir`].
pub const CONFIG_FILE_NAME: &str = "config.json";
/// Environment variable naming the connection alias to use.
pub const CONNECTION_ENV: &str = "AGENT_MONGO_CONNECTION";
/// Environment variable that disables the OS secret store.
pub const DISABLE_KEYRING_ENV: &str = "AGENT_MONGO_DISABLE_KEYRING";

/// Static definition of a tunable setting.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct KeyDefinition {
    pub key: &'static str,
    #[serde(rename = "type")]
    pub value_type: &'static str,
    #[serde(rename = "default")]
    pub default_value: i64,
    pub min: i64,
    pub max: i64,
    pub description: &'static str,
}

pub const DEFAULT_LIMIT: &str = "defaults.limit";
pub const DEFAULT_SAMPLE_SIZE: &str = "defaults.sampleSize";
pub const QUERY_TIMEOUT: &str = "query.timeout";
pub const QUERY_MAX_DOCUMENTS: &str = "query.maxDocuments";
pub const TRUNCATION_MAX_LENGTH: &str = "truncation.maxLength";

/// All valid setting keys, in display order.
pub static KEY_DEFINITIONS: [KeyDefinition; 5] = [
    KeyDefinition {
        key: DEFAULT_LIMIT,
        value_type: "number",
        default_value: 20,
        min: 1,
        max: 1000,
        description: "Default result limit for list/query commands",
    },
    KeyDefinition {
        key: DEFAULT_SAMPLE_SIZE,
        value_type: "number",
        default_value: 5,
        min: 1,
        max: 100,
        description: "Default sample size for query sample",
    },
    KeyDefinition {
        key: QUERY_TIMEOUT,
        value_type: "number",
        default_value: 30000,
        min: 1000,
        max: 300000,
        description: "Query timeout in milliseconds",
    },
    KeyDefinition {
        key: QUERY_MAX_DOCUMENTS,
        value_type: "number",
        default_value: 100,
        min: 1,
        max: 10000,
        description: "Maximum documents returned per query",
    },
    KeyDefinition {
        key: TRUNCATION_MAX_LENGTH,
        value_type: "number",
        default_value: 200,
        min: 50,
        max: 100000,
        description: "Max string length before truncation (any field)",
    },
];

/// Looks up the definition for a dotted key.
pub fn key_definition(key: &str) -> AppResult<&'static KeyDefinition> {
    KEY_DEFINITIONS
        .iter()
        .find(|def| def.key == key)
        .ok_or_else(|| AppError::UnknownSettingKey {
            key: key.to_string(),
            valid: valid_keys(),
        })
}

pub fn valid_keys() -> Vec<String> {
    KEY_DEFINITIONS.iter().map(|def| def.key.to_string()).collect()
}

/// Parses a raw CLI value for `key`, enforcing integer type and bounds.
pub fn parse_setting_value(key: &str, raw: &str) -> AppResult<i64> {
    let def = key_definition(key)?;
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| AppError::Validation(format!("\"{}\" must be an integer. Got: \"{}\"", key, raw)))?;
    check_bounds(def, value)?;
    Ok(value)
}

fn check_bounds(def: &KeyDefinition, value: i64) -> AppResult<()> {
    if value < def.min {
        return Err(AppError::Validation(format!(
            "\"{}\" minimum is {}. Got: {}",
            def.key, def.min, value
        )));
    }
    if value > def.max {
        return Err(AppError::Validation(format!(
            "\"{}\" maximum is {}. Got: {}",
            def.key, def.max, value
        )));
    }
    Ok(())
}

/// Reads a value from a settings tree by dotted path.
pub fn lookup<'a>(settings: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    let mut parts = key.split('.');
    let first = parts.next()?;
    let mut current = settings.get(first)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Per-user config directory.
///
/// `$XDG_CONFIG_HOME/agent-mongo` when set and non-blank, otherwise
/// `~/.config/agent-mongo`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        let xdg = xdg.trim();
        if !xdg.is_empty() {
            return PathBuf::from(xdg).join(APP_DIR_NAME);
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join(APP_DIR_NAME)
}

/// Explicit configuration object handed to every component.
///
/// Built once per invocation from the stored settings. Stored values that are
/// missing, non-integer or out of bounds fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub default_limit: u64,
    pub default_sample_size: u64,
    pub query_timeout_ms: u64,
    pub max_documents: u64,
    pub max_string_length: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::from_settings(&Map::new())
    }
}

impl RuntimeConfig {
    pub fn from_settings(settings: &Map<String, Value>) -> Self {
        Self {
            default_limit: resolved(settings, DEFAULT_LIMIT) as u64,
            default_sample_size: resolved(settings, DEFAULT_SAMPLE_SIZE) as u64,
            query_timeout_ms: resolved(settings, QUERY_TIMEOUT) as u64,
            max_documents: resolved(settings, QUERY_MAX_DOCUMENTS) as u64,
            max_string_length: resolved(settings, TRUNCATION_MAX_LENGTH) as usize,
        }
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    /// Effective page size: the requested value (or the default) capped by
    /// `query.maxDocuments`.
    pub fn page_size(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.default_limit)
            .min(self.max_documents)
    }
}

fn resolved(settings: &Map<String, Value>, key: &'static str) -> i64 {
    let Some(def) = KEY_DEFINITIONS.iter().find(|def| def.key == key) else {
        return 0;
    };
    match lookup(settings, key).and_then(Value::as_i64) {
        Some(value) if check_bounds(def, value).is_ok() => value,
        Some(value) => {
            tracing::warn!(key, value, "Stored setting out of bounds, using default");
            def.default_value
        }
        None => def.default_value,
    }
}
