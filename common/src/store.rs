//! Settings store backed by a single JSON file.
//!
//! Every operation reads the whole document, changes it and writes it back.
//! Concurrent invocations are last-writer-wins.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::{self, config_dir, RuntimeConfig, CONFIG_FILE_NAME};
use crate::errors::{AppError, AppResult};
use crate::models::{Connection, ConnectionUpdate, Credential, CredentialStorage, StoredCredential};
use crate::secret::{password_account, secret_backend_from_env, username_account, SecretBackend};

/// On-disk config document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_connection: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub connections: BTreeMap<String, Connection>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub credentials: BTreeMap<String, StoredCredential>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub settings: Map<String, Value>,
}

impl ConfigDocument {
    pub fn connection_aliases(&self) -> Vec<String> {
        self.connections.keys().cloned().collect()
    }

    pub fn credential_aliases(&self) -> Vec<String> {
        self.credentials.keys().cloned().collect()
    }

    /// Aliases of connections that reference `credential`.
    pub fn connections_using(&self, credential: &str) -> Vec<String> {
        self.connections
            .iter()
            .filter(|(_, conn)| conn.credential.as_deref() == Some(credential))
            .map(|(alias, _)| alias.clone())
            .collect()
    }

    fn connection_not_found(&self, alias: &str) -> AppError {
        AppError::ConnectionNotFound {
            alias: alias.to_string(),
            available: self.connection_aliases(),
        }
    }

    fn credential_not_found(&self, alias: &str) -> AppError {
        AppError::CredentialNotFound {
            alias: alias.to_string(),
            available: self.credential_aliases(),
        }
    }
}

/// Persistent connections, credentials and settings.
pub struct SettingsStore {
    path: PathBuf,
    secrets: Arc<dyn SecretBackend>,
}

impl SettingsStore {
    /// Store rooted at `dir` (the file is `dir/config.json`).
    pub fn new(dir: impl Into<PathBuf>, secrets: Arc<dyn SecretBackend>) -> Self {
        Self {
            path: dir.into().join(CONFIG_FILE_NAME),
            secrets,
        }
    }

    /// Store in the per-user config directory with the environment's secret backend.
    pub fn open_default() -> Self {
        Self::new(config_dir(), secret_backend_from_env())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the document. A missing or unparsable file yields an empty one.
    pub fn read(&self) -> ConfigDocument {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return ConfigDocument::default(),
        };
        match serde_json::from_str(&raw) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable config file");
                ConfigDocument::default()
            }
        }
    }

    /// Writes the document, creating the directory when needed.
    pub fn write(&self, doc: &ConfigDocument) -> AppResult<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut body = serde_json::to_string_pretty(doc).map_err(anyhow::Error::from)?;
        body.push('\n');

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "Config written");
        Ok(())
    }

    // ---- connections ----

    pub fn connections(&self) -> BTreeMap<String, Connection> {
        self.read().connections
    }

    pub fn connection(&self, alias: &str) -> Option<Connection> {
        self.read().connections.remove(alias)
    }

    pub fn default_connection_alias(&self) -> Option<String> {
        self.read().default_connection
    }

    /// Inserts or replaces a connection. The first one becomes the default.
    pub fn store_connection(&self, alias: &str, connection: Connection) -> AppResult<()> {
        let mut doc = self.read();
        doc.connections.insert(alias.to_string(), connection);
        if doc.default_connection.is_none() {
            doc.default_connection = Some(alias.to_string());
        }
        self.write(&doc)
    }

    /// Removes a connection, moving the default to the first remaining alias.
    pub fn remove_connection(&self, alias: &str) -> AppResult<()> {
        let mut doc = self.read();
        if doc.connections.remove(alias).is_none() {
            return Err(doc.connection_not_found(alias));
        }
        if doc.default_connection.as_deref() == Some(alias) {
            doc.default_connection = doc.connections.keys().next().cloned();
        }
        self.write(&doc)
    }

    pub fn set_default_connection(&self, alias: &str) -> AppResult<()> {
        let mut doc = self.read();
        if !doc.connections.contains_key(alias) {
            return Err(doc.connection_not_found(alias));
        }
        doc.default_connection = Some(alias.to_string());
        self.write(&doc)
    }

    /// Applies a partial update and returns the resulting connection.
    pub fn update_connection(&self, alias: &str, update: ConnectionUpdate) -> AppResult<Connection> {
        let mut doc = self.read();
        let Some(connection) = doc.connections.get_mut(alias) else {
            return Err(doc.connection_not_found(alias));
        };
        update.apply(connection);
        let updated = connection.clone();
        self.write(&doc)?;
        Ok(updated)
    }

    // ---- credentials ----

    pub fn credentials(&self) -> BTreeMap<String, StoredCredential> {
        self.read().credentials
    }

    /// Stores a credential, preferring the secret backend.
    ///
    /// Both secrets must be written for the backend to be used; otherwise any
    /// partial entries are removed and the credential is kept inline.
    pub fn store_credential(&self, alias: &str, credential: Credential) -> AppResult<CredentialStorage> {
        let user_account = username_account(alias);
        let pass_account = password_account(alias);

        let external = self
            .secrets
            .set(&user_account, &credential.username)
            .and_then(|_| self.secrets.set(&pass_account, &credential.password));

        let stored = match external {
            Ok(()) => StoredCredential::external(),
            Err(e) => {
                debug!(alias, error = %e, "Secret backend unavailable, storing credential inline");
                let _ = self.secrets.delete(&user_account);
                let _ = self.secrets.delete(&pass_account);
                StoredCredential::Inline {
                    username: credential.username,
                    password: credential.password,
                }
            }
        };

        let storage = stored.storage();
        let mut doc = self.read();
        doc.credentials.insert(alias.to_string(), stored);
        self.write(&doc)?;
        Ok(storage)
    }

    /// Resolves a credential. Externally stored credentials with an unreadable
    /// field resolve to `None`.
    pub fn get_credential(&self, alias: &str) -> Option<Credential> {
        let stored = self.read().credentials.remove(alias)?;
        self.resolve_credential(alias, stored)
    }

    pub fn resolve_credential(&self, alias: &str, stored: StoredCredential) -> Option<Credential> {
        match stored {
            StoredCredential::Inline { username, password } => Some(Credential { username, password }),
            StoredCredential::External { .. } => {
                let username = self.secrets.get(&username_account(alias));
                let password = self.secrets.get(&password_account(alias));
                match (username, password) {
                    (Ok(username), Ok(password)) => Some(Credential { username, password }),
                    _ => {
                        debug!(alias, "Credential secrets unreadable");
                        None
                    }
                }
            }
        }
    }

    /// Removes a credential and its secrets.
    ///
    /// Fails while connections reference it, unless `force` is set, in which
    /// case those references are cleared first. Returns the cleared aliases.
    pub fn remove_credential(&self, alias: &str, force: bool) -> AppResult<Vec<String>> {
        let mut doc = self.read();
        if !doc.credentials.contains_key(alias) {
            return Err(doc.credential_not_found(alias));
        }

        let used_by = doc.connections_using(alias);
        if !used_by.is_empty() && !force {
            return Err(AppError::CredentialInUse {
                alias: alias.to_string(),
                used_by,
            });
        }
        for user in &used_by {
            if let Some(connection) = doc.connections.get_mut(user) {
                connection.credential = None;
            }
        }

        doc.credentials.remove(alias);
        self.write(&doc)?;

        let _ = self.secrets.delete(&username_account(alias));
        let _ = self.secrets.delete(&password_account(alias));
        Ok(used_by)
    }

    // ---- settings ----

    pub fn settings(&self) -> Map<String, Value> {
        self.read().settings
    }

    pub fn get_setting(&self, key: &str) -> Option<Value> {
        config::lookup(&self.read().settings, key).cloned()
    }

    /// Validates and stores a setting, creating intermediate objects.
    /// Non-object intermediates are replaced.
    pub fn update_setting(&self, key: &str, raw: &str) -> AppResult<i64> {
        let value = config::parse_setting_value(key, raw)?;
        let mut doc = self.read();

        let parts: Vec<&str> = key.split('.').collect();
        insert_path(&mut doc.settings, &parts, Value::from(value));

        self.write(&doc)?;
        Ok(value)
    }

    /// Drops all settings; connections and credentials are untouched.
    pub fn reset_settings(&self) -> AppResult<()> {
        let mut doc = self.read();
        doc.settings = Map::new();
        self.write(&doc)
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig::from_settings(&self.read().settings)
    }
}

fn insert_path(map: &mut Map<String, Value>, parts: &[&str], value: Value) {
    match parts {
        [] => {}
        [leaf] => {
            map.insert(leaf.to_string(), value);
        }
        [head, rest @ ..] => {
            let slot = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(child) = slot {
                insert_path(child, rest, value);
            }
        }
    }
}
