//! Per-invocation application state.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use common::errors::AppResult;
use common::response::{ExpandMode, PageInfo, Truncator};
use common::utils::Serializer;
use common::value::UuidEncoding;
use common::{OutputMode, OutputShaper, RuntimeConfig, SettingsStore};
use connection::{ConnectionService, CredentialService, MongoOpener, ResolvedSession, SessionManager};
use query::{DiscoveryService, QueryService, SchemaInferencer};

use crate::args::GlobalArgs;

/// Everything a command needs, built once before dispatch.
pub struct AppState {
    pub store: Arc<SettingsStore>,
    pub config: RuntimeConfig,
    pub sessions: SessionManager,
    shaper: OutputShaper,
    serializer: Serializer,
    connection: Option<String>,
}

impl AppState {
    /// Creates the state from the global flags and the stored settings.
    pub fn new(globals: &GlobalArgs) -> Self {
        let store = Arc::new(SettingsStore::open_default());
        let config = store.runtime_config();
        let sessions = SessionManager::new(store.clone(), Arc::new(MongoOpener), &config);
        let expand = ExpandMode::from_flags(globals.expand.as_deref(), globals.full);
        let uuid = if globals.uuid_strings {
            UuidEncoding::Hyphenated
        } else {
            UuidEncoding::Base64
        };

        Self {
            shaper: OutputShaper::new(Truncator::new(config.max_string_length, expand)),
            serializer: Serializer::new(uuid),
            connection: globals.connection.clone(),
            store,
            config,
            sessions,
        }
    }

    /// Resolves (or reuses) the session for `-c` / env / default.
    pub async fn session(&self) -> AppResult<ResolvedSession> {
        self.sessions.resolve(self.connection.as_deref()).await
    }

    pub fn explicit_connection(&self) -> Option<&str> {
        self.connection.as_deref()
    }

    pub fn connections(&self) -> ConnectionService {
        ConnectionService::new(self.store.clone())
    }

    pub fn credentials(&self) -> CredentialService {
        CredentialService::new(self.store.clone())
    }

    pub fn queries(&self) -> QueryService {
        QueryService::new(self.config.clone(), self.serializer)
    }

    pub fn discovery(&self) -> DiscoveryService {
        DiscoveryService::new(self.config.clone(), self.serializer)
    }

    pub fn schema(&self) -> SchemaInferencer {
        SchemaInferencer::new(self.config.clone(), self.serializer.uuid_encoding())
    }

    /// Prints a shaped payload on stdout.
    pub fn print<T: Serialize>(&self, data: &T, mode: OutputMode) -> AppResult<()> {
        println!("{}", self.shaper.render(data, mode)?);
        Ok(())
    }

    /// Prints a list envelope on stdout.
    pub fn print_page(&self, context: Value, items: Vec<Value>, page: &PageInfo) -> AppResult<()> {
        println!(
            "{}",
            self.shaper
                .render_page(context, items, page, OutputMode::Managed)?
        );
        Ok(())
    }
}
