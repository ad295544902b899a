//! Command handlers, one module per command group.

mod collection;
mod config;
mod connection;
mod credential;
mod database;
mod query;

use serde::Serialize;
use serde_json::Value;

use common::errors::{AppError, AppResult};

use crate::args::Command;
use crate::state::AppState;
use crate::usage;

/// Runs one parsed command to completion.
pub async fn dispatch(state: &AppState, command: Command) -> AppResult<()> {
    match command {
        Command::Connection { command } => connection::run(state, command).await,
        Command::Credential { command } => credential::run(state, command),
        Command::Config { command } => config::run(state, command),
        Command::Database { command } => database::run(state, command).await,
        Command::Collection { command } => collection::run(state, command).await,
        Command::Query { command } => query::run(state, command).await,
        Command::Usage => {
            usage::print(usage::OVERVIEW);
            Ok(())
        }
    }
}

/// Converts list items to JSON values for the page envelope.
fn to_values<T: Serialize>(items: &[T]) -> AppResult<Vec<Value>> {
    items
        .iter()
        .map(|item| serde_json::to_value(item).map_err(|e| AppError::Internal(e.into())))
        .collect()
}
