//! Connection resolution and the per-run session cache.
//!
//! The manager turns an optional alias into an open [`DocumentSession`]. The
//! alias comes from, in order: the explicit argument, `AGENT_MONGO_CONNECTION`,
//! the stored default. Sessions are cached by alias for the lifetime of the
//! manager and released by [`SessionManager::close_all`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use common::config::CONNECTION_ENV;
use common::errors::{AppError, AppResult};
use common::models::Credential;
use common::session::DocumentSession;
use common::{RuntimeConfig, SettingsStore};

/// Everything needed to open a session for one alias.
#[derive(Debug, Clone)]
pub struct SessionTarget {
    pub alias: String,
    pub connection_string: String,
    pub credential: Option<Credential>,
    /// Upper bound for establishing the session.
    pub timeout: Duration,
}

/// Opens sessions. Implemented by the MongoDB driver adapter and by test fakes.
#[async_trait]
pub trait SessionOpener: Send + Sync {
    async fn open(&self, target: &SessionTarget) -> AppResult<Arc<dyn DocumentSession>>;
}

/// A session together with how it was resolved.
#[derive(Clone)]
pub struct ResolvedSession {
    pub alias: String,
    /// Connection override, else the URI path, else `None`.
    pub database: Option<String>,
    pub session: Arc<dyn DocumentSession>,
}

/// Resolves aliases to sessions and owns them until [`close_all`](Self::close_all).
pub struct SessionManager {
    store: Arc<SettingsStore>,
    opener: Arc<dyn SessionOpener>,
    env_alias: Option<String>,
    connect_timeout: Duration,
    sessions: Mutex<HashMap<String, Arc<dyn DocumentSession>>>,
}

impl SessionManager {
    /// Creates a manager reading the alias override from the environment.
    pub fn new(store: Arc<SettingsStore>, opener: Arc<dyn SessionOpener>, config: &RuntimeConfig) -> Self {
        Self {
            store,
            opener,
            env_alias: std::env::var(CONNECTION_ENV).ok(),
            connect_timeout: config.query_timeout(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Replaces the environment-provided alias.
    pub fn with_env_alias(mut self, alias: Option<String>) -> Self {
        self.env_alias = alias;
        self
    }

    /// Picks the alias to use. Blank values are ignored.
    pub fn resolve_alias(&self, explicit: Option<&str>) -> AppResult<String> {
        let non_blank = |value: &str| {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        };

        if let Some(alias) = explicit.and_then(non_blank) {
            return Ok(alias);
        }
        if let Some(alias) = self.env_alias.as_deref().and_then(non_blank) {
            return Ok(alias);
        }
        if let Some(alias) = self.store.default_connection_alias() {
            return Ok(alias);
        }
        Err(AppError::Unresolved {
            available: self.store.read().connection_aliases(),
        })
    }

    /// Resolves the alias and returns its session, opening it on first use.
    pub async fn resolve(&self, explicit: Option<&str>) -> AppResult<ResolvedSession> {
        let alias = self.resolve_alias(explicit)?;
        let doc = self.store.read();
        let Some(connection) = doc.connections.get(&alias) else {
            return Err(AppError::ConnectionNotFound {
                alias,
                available: doc.connection_aliases(),
            });
        };
        let database = connection.database_name();

        if let Some(session) = self.sessions.lock().await.get(&alias).cloned() {
            tracing::debug!(alias = %alias, "Reusing session");
            return Ok(ResolvedSession {
                alias,
                database,
                session,
            });
        }

        let credential = match &connection.credential {
            Some(name) => Some(self.store.get_credential(name).ok_or_else(|| {
                AppError::CredentialNotFound {
                    alias: name.clone(),
                    available: doc.credential_aliases(),
                }
            })?),
            None => None,
        };

        let target = SessionTarget {
            alias: alias.clone(),
            connection_string: connection.connection_string.clone(),
            credential,
            timeout: self.connect_timeout,
        };
        let opened = self.opener.open(&target).await?;

        // A concurrent open of the same alias keeps the first session.
        let (session, surplus) = {
            let mut sessions = self.sessions.lock().await;
            let session = sessions
                .entry(alias.clone())
                .or_insert_with(|| opened.clone())
                .clone();
            let surplus = (!Arc::ptr_eq(&session, &opened)).then_some(opened);
            (session, surplus)
        };
        match surplus {
            Some(extra) => {
                if let Err(e) = extra.close().await {
                    tracing::warn!(alias = %alias, error = %e, "Failed to close duplicate session");
                }
            }
            None => tracing::debug!(alias = %alias, "Session opened"),
        }

        Ok(ResolvedSession {
            alias,
            database,
            session,
        })
    }

    /// Aliases with an open session.
    pub async fn open_aliases(&self) -> Vec<String> {
        let mut aliases: Vec<String> = self.sessions.lock().await.keys().cloned().collect();
        aliases.sort();
        aliases
    }

    /// Closes every cached session once. Close failures are logged and dropped.
    pub async fn close_all(&self) {
        let sessions: Vec<(String, Arc<dyn DocumentSession>)> =
            self.sessions.lock().await.drain().collect();
        for (alias, session) in sessions {
            match session.close().await {
                Ok(()) => tracing::debug!(alias = %alias, "Session closed"),
                Err(e) => tracing::warn!(alias = %alias, error = %e, "Failed to close session"),
            }
        }
    }
}
