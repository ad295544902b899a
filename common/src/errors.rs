//! Application error types.
//!
//! Every failure the CLI can report is an [`AppError`]. The binary turns it
//! into a `{"error": "..."}` envelope on stderr, so the `Display` text of each
//! variant is the user-facing message and must stay actionable.

use thiserror::Error;

/// Result alias used across the workspace.
pub type AppResult<T> = Result<T, AppError>;

/// Coarse error taxonomy used for exit handling and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown connection, credential, collection or document.
    NotFound,
    /// No connection alias could be determined.
    Unresolved,
    /// Malformed input, out-of-range setting or rejected pipeline.
    Validation,
    /// Operation blocked by existing references.
    Conflict,
    /// Remote operation exceeded its time bound.
    Timeout,
    /// Anything else reported by the driver or the environment.
    Transport,
}

/// Application-wide error enum.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(
        "Connection \"{alias}\" not found. Available: {}. Run: agent-mongo connection add <alias> <connection-string>",
        list_or_none(.available)
    )]
    ConnectionNotFound { alias: String, available: Vec<String> },

    #[error(
        "Credential \"{alias}\" not found. Available: {}. Run: agent-mongo credential add <alias> --username <user> --password <pass>",
        list_or_none(.available)
    )]
    CredentialNotFound { alias: String, available: Vec<String> },

    #[error(
        "Collection \"{collection}\" not found in database \"{database}\". Available: {}",
        list_or_none(.available)
    )]
    CollectionNotFound {
        database: String,
        collection: String,
        available: Vec<String>,
    },

    #[error("Document not found: _id={id} in {database}.{collection}")]
    DocumentNotFound {
        id: String,
        database: String,
        collection: String,
    },

    #[error(
        "No connection specified. Available: {}. Run: agent-mongo connection add <alias> <connection-string>",
        list_or_none(.available)
    )]
    Unresolved { available: Vec<String> },

    #[error("{0}")]
    Validation(String),

    #[error("Unknown key: \"{key}\". Valid keys: {}", .valid.join(", "))]
    UnknownSettingKey { key: String, valid: Vec<String> },

    #[error("Write stage \"{operator}\" is not allowed. agent-mongo is read-only.")]
    UnsafePipeline { operator: String },

    #[error("Invalid JSON for --{argument}: {input}")]
    InvalidJson { argument: String, input: String },

    #[error(
        "Credential \"{alias}\" is used by connections: {}. Use --force to remove it anyway.",
        .used_by.join(", ")
    )]
    CredentialInUse { alias: String, used_by: Vec<String> },

    #[error("{}", timeout_message(.message, .timeout_ms, .context))]
    Timeout {
        message: String,
        timeout_ms: u64,
        context: Option<(String, String)>,
    },

    #[error("{0}")]
    DatabaseConnection(String),

    #[error("{0}")]
    DatabaseQuery(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Returns the taxonomy bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::ConnectionNotFound { .. }
            | AppError::CredentialNotFound { .. }
            | AppError::CollectionNotFound { .. }
            | AppError::DocumentNotFound { .. } => ErrorKind::NotFound,
            AppError::Unresolved { .. } => ErrorKind::Unresolved,
            AppError::Validation(_)
            | AppError::UnknownSettingKey { .. }
            | AppError::UnsafePipeline { .. }
            | AppError::InvalidJson { .. } => ErrorKind::Validation,
            AppError::CredentialInUse { .. } => ErrorKind::Conflict,
            AppError::Timeout { .. } => ErrorKind::Timeout,
            AppError::DatabaseConnection(_)
            | AppError::DatabaseQuery(_)
            | AppError::Io(_)
            | AppError::Internal(_) => ErrorKind::Transport,
        }
    }

    /// Stable error code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ConnectionNotFound { .. } => "CONNECTION_NOT_FOUND",
            AppError::CredentialNotFound { .. } => "CREDENTIAL_NOT_FOUND",
            AppError::CollectionNotFound { .. } => "COLLECTION_NOT_FOUND",
            AppError::DocumentNotFound { .. } => "DOCUMENT_NOT_FOUND",
            AppError::Unresolved { .. } => "CONNECTION_UNRESOLVED",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::UnknownSettingKey { .. } => "UNKNOWN_SETTING_KEY",
            AppError::UnsafePipeline { .. } => "UNSAFE_PIPELINE",
            AppError::InvalidJson { .. } => "INVALID_JSON",
            AppError::CredentialInUse { .. } => "CREDENTIAL_IN_USE",
            AppError::Timeout { .. } => "TIMEOUT",
            AppError::DatabaseConnection(_) => "DATABASE_CONNECTION_ERROR",
            AppError::DatabaseQuery(_) => "DATABASE_QUERY_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Attaches database/collection context to a timeout so the message can
    /// point at the index listing command. Other variants pass through.
    pub fn with_collection_context(self, database: &str, collection: &str) -> Self {
        match self {
            AppError::Timeout {
                message,
                timeout_ms,
                ..
            } => AppError::Timeout {
                message,
                timeout_ms,
                context: Some((database.to_string(), collection.to_string())),
            },
            other => other,
        }
    }
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}

fn timeout_message(message: &str, timeout_ms: &u64, context: &Option<(String, String)>) -> String {
    let mut hints = vec![
        format!("Query timed out after {}ms", timeout_ms),
        "Increase with: agent-mongo config set query.timeout <ms>".to_string(),
    ];
    if let Some((database, collection)) = context {
        hints.push(format!(
            "Check indexes: agent-mongo collection indexes {} {}",
            database, collection
        ));
    }
    format!("{}. {}", message.trim_end_matches('.'), hints.join(". "))
}
