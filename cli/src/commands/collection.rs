use serde_json::json;

use common::errors::AppResult;
use common::response::paginate;
use common::OutputMode;

use super::to_values;
use crate::args::CollectionCommand;
use crate::state::AppState;
use crate::usage;

pub async fn run(state: &AppState, command: CollectionCommand) -> AppResult<()> {
    match command {
        CollectionCommand::List { database, page } => {
            let resolved = state.session().await?;
            let listing = state
                .discovery()
                .list_collections(resolved.session.as_ref(), &database, page.limit, page.skip)
                .await?;
            state.print_page(
                json!({ "database": listing.database }),
                to_values(&listing.items)?,
                &listing.page,
            )
        }
        CollectionCommand::Schema {
            database,
            collection,
            sample_size,
            max_depth,
            page,
        } => {
            let resolved = state.session().await?;
            let schema = state
                .schema()
                .infer(resolved.session.as_ref(), &database, &collection, sample_size, max_depth)
                .await?;
            let total_fields = schema.fields.len();
            let (fields, info) = paginate(schema.fields, page.skip, page.limit.unwrap_or(u64::MAX));
            state.print_page(
                json!({
                    "database": schema.database,
                    "collection": schema.collection,
                    "sampleSize": schema.sample_size,
                    "totalDocuments": schema.total_documents,
                    "totalFields": total_fields,
                }),
                to_values(&fields)?,
                &info,
            )
        }
        CollectionCommand::Indexes { database, collection } => {
            let resolved = state.session().await?;
            let indexes = state
                .discovery()
                .list_indexes(resolved.session.as_ref(), &database, &collection)
                .await?;
            state.print(&indexes, OutputMode::Managed)
        }
        CollectionCommand::Stats { database, collection } => {
            let resolved = state.session().await?;
            let stats = state
                .discovery()
                .collection_stats(resolved.session.as_ref(), &database, &collection)
                .await?;
            state.print(&stats, OutputMode::Managed)
        }
        CollectionCommand::Usage => {
            usage::print(usage::COLLECTION);
            Ok(())
        }
    }
}
