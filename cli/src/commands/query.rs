use std::io::{IsTerminal, Read};

use anyhow::Context;
use bson::Document;
use serde_json::Value;

use common::errors::{AppError, AppResult};
use common::models::IdType;
use common::utils::extended_json::{parse_document, parse_pipeline};
use common::utils::PipelineValidator;
use common::OutputMode;
use query::FindArgs;

use crate::args::QueryCommand;
use crate::state::AppState;
use crate::usage;

const PIPELINE_MISSING: &str = "Provide --pipeline <json> or pipe a JSON array via stdin.";

pub async fn run(state: &AppState, command: QueryCommand) -> AppResult<()> {
    match command {
        QueryCommand::Find {
            database,
            collection,
            filter,
            sort,
            projection,
            page,
        } => {
            let args = FindArgs {
                filter: optional_document("filter", filter)?.unwrap_or_default(),
                sort: optional_document("sort", sort)?,
                projection: optional_document("projection", projection)?,
                limit: page.limit,
                skip: page.skip,
            };
            let resolved = state.session().await?;
            let found = state
                .queries()
                .find(resolved.session.as_ref(), &database, &collection, args)
                .await?;
            let context = serde_json::to_value(&found.context).map_err(anyhow::Error::from)?;
            state.print_page(context, found.items, &found.page)
        }
        QueryCommand::Get {
            database,
            collection,
            id,
            id_type,
            projection,
        } => {
            let id_type = id_type.as_deref().map(IdType::parse).transpose()?;
            let projection = optional_document("projection", projection)?;
            let resolved = state.session().await?;
            let document = state
                .queries()
                .get(resolved.session.as_ref(), &database, &collection, &id, id_type, projection)
                .await?;
            state.print(&document, OutputMode::Managed)
        }
        QueryCommand::Count {
            database,
            collection,
            filter,
        } => {
            let filter = optional_document("filter", filter)?.unwrap_or_default();
            let resolved = state.session().await?;
            let counted = state
                .queries()
                .count(resolved.session.as_ref(), &database, &collection, filter)
                .await?;
            state.print(&counted, OutputMode::Managed)
        }
        QueryCommand::Sample {
            database,
            collection,
            size,
            filter,
        } => {
            let filter = optional_document("filter", filter)?.unwrap_or_default();
            let resolved = state.session().await?;
            let sampled = state
                .queries()
                .sample(resolved.session.as_ref(), &database, &collection, size, filter)
                .await?;
            state.print(&sampled, OutputMode::Managed)
        }
        QueryCommand::Distinct {
            database,
            collection,
            field,
            filter,
        } => {
            let filter = optional_document("filter", filter)?.unwrap_or_default();
            let resolved = state.session().await?;
            let values = state
                .queries()
                .distinct(resolved.session.as_ref(), &database, &collection, &field, filter)
                .await?;
            state.print(&values, OutputMode::Managed)
        }
        QueryCommand::Aggregate {
            database,
            collection,
            pipeline,
            pipeline_flag,
            limit,
        } => {
            let stages = resolve_pipeline(pipeline_flag.or(pipeline))?;
            PipelineValidator::validate(&stages)?;
            let resolved = state.session().await?;
            let aggregated = state
                .queries()
                .aggregate(resolved.session.as_ref(), &database, &collection, stages, limit)
                .await?;
            state.print(&aggregated, OutputMode::Managed)
        }
        QueryCommand::Usage => {
            usage::print(usage::QUERY);
            Ok(())
        }
    }
}

fn optional_document(argument: &str, raw: Option<String>) -> AppResult<Option<Document>> {
    raw.map(|raw| parse_document(argument, &raw)).transpose()
}

/// Pipeline from the flag or positional argument, else from piped stdin.
fn resolve_pipeline(raw: Option<String>) -> AppResult<Vec<Value>> {
    let raw = match raw {
        Some(raw) => raw,
        None if !std::io::stdin().is_terminal() => read_stdin()?,
        None => return Err(AppError::Validation(PIPELINE_MISSING.to_string())),
    };
    parse_pipeline(&raw)
}

fn read_stdin() -> AppResult<String> {
    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .context("Failed to read pipeline from stdin")?;
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::Validation(format!("Empty stdin. {}", PIPELINE_MISSING)));
    }
    Ok(raw.to_string())
}
