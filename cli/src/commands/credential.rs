use serde_json::json;

use common::errors::AppResult;
use common::models::NewCredential;
use common::OutputMode;

use crate::args::CredentialCommand;
use crate::state::AppState;
use crate::usage;

pub fn run(state: &AppState, command: CredentialCommand) -> AppResult<()> {
    let service = state.credentials();
    match command {
        CredentialCommand::Add {
            name,
            username,
            password,
        } => {
            let added = service.add(NewCredential {
                alias: name,
                username,
                password,
            })?;
            state.print(&added, OutputMode::Raw)
        }
        CredentialCommand::Remove { name, force } => {
            let removed = service.remove(&name, force)?;
            state.print(&removed, OutputMode::Raw)
        }
        CredentialCommand::List => {
            state.print(&json!({ "credentials": service.list() }), OutputMode::Raw)
        }
        CredentialCommand::Usage => {
            usage::print(usage::CREDENTIAL);
            Ok(())
        }
    }
}
