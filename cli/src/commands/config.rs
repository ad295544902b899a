use serde_json::json;

use common::config::{key_definition, KEY_DEFINITIONS};
use common::errors::AppResult;
use common::OutputMode;

use crate::args::ConfigCommand;
use crate::state::AppState;
use crate::usage;

pub fn run(state: &AppState, command: ConfigCommand) -> AppResult<()> {
    match command {
        ConfigCommand::Get { key } => {
            let definition = key_definition(&key)?;
            let value = state.store.get_setting(&key);
            state.print(
                &json!({ "key": key, "value": value, "default": definition.default_value }),
                OutputMode::Raw,
            )
        }
        ConfigCommand::Set { key, value } => {
            let value = state.store.update_setting(&key, &value)?;
            state.print(&json!({ "ok": true, "key": key, "value": value }), OutputMode::Raw)
        }
        ConfigCommand::Reset => {
            state.store.reset_settings()?;
            state.print(
                &json!({ "ok": true, "message": "Settings reset to defaults" }),
                OutputMode::Raw,
            )
        }
        ConfigCommand::ListKeys => state.print(&json!({ "keys": KEY_DEFINITIONS }), OutputMode::Raw),
        ConfigCommand::Usage => {
            usage::print(usage::CONFIG);
            Ok(())
        }
    }
}
