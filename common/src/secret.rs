//! Secret storage backends.
//!
//! Credential material can live in the OS secret store instead of the config
//! file. Backends are best-effort: any error means "unavailable" for that call
//! and the settings store falls back to inline storage.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;

use crate::config::{APP_DIR_NAME, DISABLE_KEYRING_ENV};
use crate::errors::{AppError, AppResult};

/// Service name under which all secrets are stored.
pub const SERVICE_NAME: &str = APP_DIR_NAME;

pub fn username_account(alias: &str) -> String {
    format!("username:{}", alias)
}

pub fn password_account(alias: &str) -> String {
    format!("password:{}", alias)
}

/// Get/set/delete access to named secrets.
pub trait SecretBackend: Send + Sync {
    fn get(&self, account: &str) -> AppResult<String>;
    fn set(&self, account: &str, secret: &str) -> AppResult<()>;
    fn delete(&self, account: &str) -> AppResult<()>;
}

/// OS-native secret store via the `keyring` crate.
#[derive(Debug, Default)]
pub struct KeyringBackend;

impl KeyringBackend {
    fn entry(account: &str) -> AppResult<keyring::Entry> {
        keyring::Entry::new(SERVICE_NAME, account).map_err(keyring_error)
    }
}

impl SecretBackend for KeyringBackend {
    fn get(&self, account: &str) -> AppResult<String> {
        Self::entry(account)?.get_password().map_err(keyring_error)
    }

    fn set(&self, account: &str, secret: &str) -> AppResult<()> {
        Self::entry(account)?
            .set_password(secret)
            .map_err(keyring_error)
    }

    fn delete(&self, account: &str) -> AppResult<()> {
        Self::entry(account)?
            .delete_credential()
            .map_err(keyring_error)
    }
}

fn keyring_error(err: keyring::Error) -> AppError {
    AppError::Internal(anyhow!("secret backend unavailable: {}", err))
}

/// Process-local secret map.
#[derive(Debug, Default)]
pub struct MemorySecretBackend {
    secrets: Mutex<HashMap<String, String>>,
}

impl MemorySecretBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, account: &str) -> bool {
        self.secrets
            .lock()
            .map(|secrets| secrets.contains_key(account))
            .unwrap_or(false)
    }

    fn with_secrets<T>(&self, f: impl FnOnce(&mut HashMap<String, String>) -> T) -> AppResult<T> {
        let mut secrets = self
            .secrets
            .lock()
            .map_err(|_| AppError::Internal(anyhow!("secret map poisoned")))?;
        Ok(f(&mut secrets))
    }
}

impl SecretBackend for MemorySecretBackend {
    fn get(&self, account: &str) -> AppResult<String> {
        self.with_secrets(|secrets| secrets.get(account).cloned())?
            .ok_or_else(|| AppError::Internal(anyhow!("no secret for {}", account)))
    }

    fn set(&self, account: &str, secret: &str) -> AppResult<()> {
        self.with_secrets(|secrets| {
            secrets.insert(account.to_string(), secret.to_string());
        })
    }

    fn delete(&self, account: &str) -> AppResult<()> {
        self.with_secrets(|secrets| {
            secrets.remove(account);
        })
    }
}

/// Backend that is never available.
#[derive(Debug, Default)]
pub struct DisabledSecretBackend;

impl SecretBackend for DisabledSecretBackend {
    fn get(&self, _account: &str) -> AppResult<String> {
        Err(disabled())
    }

    fn set(&self, _account: &str, _secret: &str) -> AppResult<()> {
        Err(disabled())
    }

    fn delete(&self, _account: &str) -> AppResult<()> {
        Err(disabled())
    }
}

fn disabled() -> AppError {
    AppError::Internal(anyhow!("secret backend disabled"))
}

/// Whether this platform's keyring survives a reboot. The Linux kernel keyring
/// is session-scoped, so credentials stay inline there.
pub const KEYRING_PERSISTS: bool = cfg!(any(target_os = "macos", target_os = "windows"));

/// OS keyring, unless `AGENT_MONGO_DISABLE_KEYRING` is set or the platform
/// keyring does not persist.
pub fn secret_backend_from_env() -> Arc<dyn SecretBackend> {
    let disabled = std::env::var(DISABLE_KEYRING_ENV).is_ok_and(|value| !value.trim().is_empty());
    secret_backend(disabled, KEYRING_PERSISTS)
}

fn secret_backend(disabled: bool, persists: bool) -> Arc<dyn SecretBackend> {
    if disabled {
        tracing::debug!("Secret backend disabled by environment");
        return Arc::new(DisabledSecretBackend);
    }
    if !persists {
        tracing::debug!("Platform keyring is not persistent, storing credentials inline");
        return Arc::new(DisabledSecretBackend);
    }
    Arc::new(KeyringBackend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_names() {
        assert_eq!(username_account("prod"), "username:prod");
        assert_eq!(password_account("prod"), "password:prod");
    }

    #[test]
    fn test_memory_backend_roundtrip() {
        let backend = MemorySecretBackend::new();
        backend.set("password:prod", "s3cret").unwrap();
        assert_eq!(backend.get("password:prod").unwrap(), "s3cret");
        backend.delete("password:prod").unwrap();
        assert!(backend.get("password:prod").is_err());
        assert!(!backend.contains("password:prod"));
    }

    #[test]
    fn test_disabled_backend_always_fails() {
        let backend = DisabledSecretBackend;
        assert!(backend.set("username:x", "u").is_err());
        assert!(backend.get("username:x").is_err());
    }

    #[test]
    fn test_non_persistent_keyring_falls_back_to_inline() {
        let backend = secret_backend(false, false);
        assert!(backend.set("username:x", "u").is_err());
        assert!(secret_backend(true, true).set("username:x", "u").is_err());
        assert_eq!(KEYRING_PERSISTS, cfg!(any(target_os = "macos", target_os = "windows")));
    }
}
