//! Connection configuration models.
//!
//! Contains models for stored MongoDB connections.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{AppError, AppResult};

/// URI schemes accepted for a connection string.
const ACCEPTED_SCHEMES: [&str; 2] = ["mongodb://", "mongodb+srv://"];

/// Stored connection (value side of the `connections` map, keyed by alias).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Connection {
    /// MongoDB connection URI.
    pub connection_string: String,
    /// Display name, defaults to the alias.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Database override; takes precedence over the URI path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Alias of a stored credential used for authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl Connection {
    /// Database for sessions opened on this connection: the explicit override,
    /// else the path component of the URI.
    pub fn database_name(&self) -> Option<String> {
        self.database
            .clone()
            .or_else(|| parse_db_from_uri(&self.connection_string))
    }
}

/// Request for adding a connection.
#[derive(Debug, Clone, Validate)]
pub struct NewConnection {
    /// Short name for this connection.
    #[validate(length(min = 1, max = 64, message = "Alias must be 1-64 characters"))]
    pub alias: String,
    /// MongoDB connection URI.
    #[validate(length(min = 1, message = "Connection string is required"))]
    pub connection_string: String,
    /// Database override.
    pub database: Option<String>,
    /// Credential alias.
    pub credential: Option<String>,
}

impl NewConnection {
    /// Validates field lengths and the URI scheme.
    pub fn check(&self) -> AppResult<()> {
        self.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        if !ACCEPTED_SCHEMES
            .iter()
            .any(|scheme| self.connection_string.starts_with(scheme))
        {
            return Err(AppError::Validation(format!(
                "Invalid connection string: must start with {}",
                ACCEPTED_SCHEMES.join(" or ")
            )));
        }
        Ok(())
    }

    /// Converts the request into the stored form.
    pub fn into_connection(self) -> (String, Connection) {
        let connection = Connection {
            connection_string: self.connection_string,
            name: Some(self.alias.clone()),
            database: self.database,
            credential: self.credential,
        };
        (self.alias, connection)
    }
}

/// Partial update of a stored connection. Only `Some` fields are applied.
///
/// `credential: Some(None)` clears the credential reference.
#[derive(Debug, Clone, Default)]
pub struct ConnectionUpdate {
    pub database: Option<String>,
    pub credential: Option<Option<String>>,
}

impl ConnectionUpdate {
    pub fn clear_credential() -> Self {
        Self {
            credential: Some(None),
            ..Default::default()
        }
    }

    /// Names of the fields this update touches.
    pub fn updated_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.database.is_some() {
            fields.push("database");
        }
        if self.credential.is_some() {
            fields.push("credential");
        }
        fields
    }

    pub fn apply(self, connection: &mut Connection) {
        if let Some(database) = self.database {
            connection.database = Some(database);
        }
        if let Some(credential) = self.credential {
            connection.credential = credential;
        }
    }
}

/// Connection item for listings.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionItem {
    pub alias: String,
    pub connection_string: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
    pub default: bool,
}

impl ConnectionItem {
    pub fn new(alias: &str, connection: &Connection, default_alias: Option<&str>) -> Self {
        Self {
            alias: alias.to_string(),
            connection_string: connection.connection_string.clone(),
            database: connection.database.clone(),
            credential: connection.credential.clone(),
            default: default_alias == Some(alias),
        }
    }
}

/// Extracts the database name from the path component of a MongoDB URI.
///
/// `mongodb://host:27017/shop?retryWrites=true` yields `shop`. Returns `None`
/// for URIs without a path or with an empty one.
pub fn parse_db_from_uri(uri: &str) -> Option<String> {
    let rest = ACCEPTED_SCHEMES
        .iter()
        .find_map(|scheme| uri.strip_prefix(scheme))?;
    let (_, path) = rest.split_once('/')?;
    let name = path.split('?').next().unwrap_or_default();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
