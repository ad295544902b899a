//! Credential models.
//!
//! A credential is either stored inline in the config file or kept in the
//! OS secret store, in which case the config file only records that fact.

use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{AppError, AppResult};

/// Where the secret material of a credential lives.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialStorage {
    /// Username and password live in the OS secret store.
    SecretBackend,
    /// Username and password are written to the config file.
    Inline,
}

/// On-disk form of a credential (value side of the `credentials` map).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum StoredCredential {
    Inline { username: String, password: String },
    External { storage: CredentialStorage },
}

impl StoredCredential {
    pub fn external() -> Self {
        StoredCredential::External {
            storage: CredentialStorage::SecretBackend,
        }
    }

    pub fn storage(&self) -> CredentialStorage {
        match self {
            StoredCredential::Inline { .. } => CredentialStorage::Inline,
            StoredCredential::External { .. } => CredentialStorage::SecretBackend,
        }
    }
}

/// Resolved username/password pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Request for adding or replacing a credential.
#[derive(Debug, Clone, Validate)]
pub struct NewCredential {
    #[validate(length(min = 1, max = 64, message = "Credential name must be 1-64 characters"))]
    pub alias: String,
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl NewCredential {
    pub fn check(&self) -> AppResult<()> {
        self.validate()
            .map_err(|e| AppError::Validation(e.to_string()))
    }
}

/// Credential item for listings (password always redacted).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialItem {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub password: &'static str,
    pub storage: CredentialStorage,
    pub used_by: Vec<String>,
}
