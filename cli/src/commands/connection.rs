use serde_json::json;

use common::errors::AppResult;
use common::models::{ConnectionUpdate, NewConnection};
use common::OutputMode;

use crate::args::ConnectionCommand;
use crate::state::AppState;
use crate::usage;

pub async fn run(state: &AppState, command: ConnectionCommand) -> AppResult<()> {
    let service = state.connections();
    match command {
        ConnectionCommand::Add {
            alias,
            uri,
            database,
            credential,
            make_default,
        } => {
            let added = service.add(
                NewConnection {
                    alias,
                    connection_string: uri,
                    database,
                    credential,
                },
                make_default,
            )?;
            state.print(&added, OutputMode::Raw)
        }
        ConnectionCommand::Update {
            alias,
            credential,
            no_credential,
            database,
        } => {
            let credential = if no_credential {
                Some(None)
            } else {
                credential.map(Some)
            };
            let updated = service.update(&alias, ConnectionUpdate { database, credential })?;
            state.print(&json!({ "ok": true, "alias": alias, "updated": updated }), OutputMode::Raw)
        }
        ConnectionCommand::Remove { alias } => {
            service.remove(&alias)?;
            state.print(&json!({ "ok": true, "removed": alias }), OutputMode::Raw)
        }
        ConnectionCommand::List => {
            state.print(&json!({ "connections": service.list() }), OutputMode::Raw)
        }
        ConnectionCommand::Test => {
            let tested = service
                .test(&state.sessions, state.explicit_connection())
                .await?;
            state.print(&tested, OutputMode::Managed)
        }
        ConnectionCommand::SetDefault { alias } => {
            service.set_default(&alias)?;
            state.print(&json!({ "ok": true, "default": alias }), OutputMode::Raw)
        }
        ConnectionCommand::Usage => {
            usage::print(usage::CONNECTION);
            Ok(())
        }
    }
}
