use common::errors::AppResult;
use common::OutputMode;

use crate::args::DatabaseCommand;
use crate::state::AppState;
use crate::usage;

pub async fn run(state: &AppState, command: DatabaseCommand) -> AppResult<()> {
    match command {
        DatabaseCommand::List => {
            let resolved = state.session().await?;
            let databases = state
                .discovery()
                .list_databases(resolved.session.as_ref())
                .await?;
            state.print(&databases, OutputMode::Managed)
        }
        DatabaseCommand::Stats { database } => {
            let resolved = state.session().await?;
            let stats = state
                .discovery()
                .database_stats(resolved.session.as_ref(), &database)
                .await?;
            state.print(&stats, OutputMode::Managed)
        }
        DatabaseCommand::Usage => {
            usage::print(usage::DATABASE);
            Ok(())
        }
    }
}
