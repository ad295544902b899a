//! Command-line argument definitions.

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "agent-mongo")]
#[command(version)]
#[command(about = "MongoDB CLI for AI agents (JSON output, read-only)")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(flatten)]
    pub globals: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Flags accepted by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Connection alias to use
    #[arg(short = 'c', long, global = true, value_name = "ALIAS")]
    pub connection: Option<String>,

    /// Expand truncated fields (comma-separated field names)
    #[arg(long, global = true, value_name = "FIELDS")]
    pub expand: Option<String>,

    /// Show full content for all truncated fields
    #[arg(long, global = true)]
    pub full: bool,

    /// Render UUID binaries as hyphenated strings
    #[arg(long, global = true)]
    pub uuid_strings: bool,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage MongoDB connections
    Connection {
        #[command(subcommand)]
        command: ConnectionCommand,
    },

    /// Manage stored credentials
    Credential {
        #[command(subcommand)]
        command: CredentialCommand,
    },

    /// Persistent settings
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Database discovery
    #[command(alias = "db")]
    Database {
        #[command(subcommand)]
        command: DatabaseCommand,
    },

    /// Collection discovery
    Collection {
        #[command(subcommand)]
        command: CollectionCommand,
    },

    /// Document retrieval (read-only)
    Query {
        #[command(subcommand)]
        command: QueryCommand,
    },

    /// Print concise documentation
    Usage,
}

#[derive(Subcommand, Debug)]
pub enum ConnectionCommand {
    /// Save a MongoDB connection
    Add {
        /// Short name (e.g. local, staging, prod)
        alias: String,
        /// mongodb:// or mongodb+srv:// URI
        uri: String,
        /// Override the database from the URI
        #[arg(long)]
        database: Option<String>,
        /// Stored credential used for authentication
        #[arg(long)]
        credential: Option<String>,
        /// Make this the default connection
        #[arg(long = "default")]
        make_default: bool,
    },

    /// Update a saved connection
    Update {
        alias: String,
        /// Set or change the credential reference
        #[arg(long, conflicts_with = "no_credential")]
        credential: Option<String>,
        /// Remove the credential from the connection
        #[arg(long)]
        no_credential: bool,
        /// Override the database name
        #[arg(long)]
        database: Option<String>,
    },

    /// Remove a saved connection
    Remove { alias: String },

    /// List saved connections
    List,

    /// Ping MongoDB to verify connectivity
    Test,

    /// Set the connection used when -c is not given
    SetDefault { alias: String },

    /// Print connection command documentation
    Usage,
}

#[derive(Subcommand, Debug)]
pub enum CredentialCommand {
    /// Store a named credential (overwrites an existing one)
    Add {
        name: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },

    /// Remove a stored credential
    Remove {
        name: String,
        /// Remove even when connections reference it
        #[arg(long)]
        force: bool,
    },

    /// List stored credentials (passwords redacted)
    List,

    /// Print credential command documentation
    Usage,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Get a config value
    Get { key: String },

    /// Set a config value
    Set { key: String, value: String },

    /// Reset all settings to defaults
    Reset,

    /// List all valid keys with defaults and ranges
    ListKeys,

    /// Print config command documentation
    Usage,
}

#[derive(Subcommand, Debug)]
pub enum DatabaseCommand {
    /// List all databases with sizes
    List,

    /// Database statistics
    Stats { database: String },

    /// Print database command documentation
    Usage,
}

#[derive(Subcommand, Debug)]
pub enum CollectionCommand {
    /// List collections in a database
    List {
        database: String,
        #[command(flatten)]
        page: PageArgs,
    },

    /// Infer collection schema by sampling documents
    Schema {
        database: String,
        collection: String,
        /// Number of documents to sample
        #[arg(long, default_value_t = query::DEFAULT_SCHEMA_SAMPLE_SIZE, value_parser = clap::value_parser!(u64).range(1..))]
        sample_size: u64,
        /// Limit nesting depth (1 = top-level only)
        #[arg(long, visible_alias = "depth", value_parser = clap::value_parser!(u32).range(1..))]
        max_depth: Option<u32>,
        #[command(flatten)]
        page: PageArgs,
    },

    /// List indexes
    Indexes { database: String, collection: String },

    /// Collection statistics
    Stats { database: String, collection: String },

    /// Print collection command documentation
    Usage,
}

/// `--limit` / `--skip` pair.
#[derive(Args, Debug, Clone, Default)]
pub struct PageArgs {
    /// Max items to return
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub limit: Option<u64>,
    /// Number of items to skip
    #[arg(long, default_value_t = 0)]
    pub skip: u64,
}

#[derive(Subcommand, Debug)]
pub enum QueryCommand {
    /// Find documents matching a filter
    Find {
        database: String,
        collection: String,
        /// Query filter (Extended JSON)
        #[arg(long, value_name = "JSON")]
        filter: Option<String>,
        /// Sort specification, default {"_id": -1}
        #[arg(long, value_name = "JSON")]
        sort: Option<String>,
        /// Field projection
        #[arg(long, value_name = "JSON")]
        projection: Option<String>,
        #[command(flatten)]
        page: PageArgs,
    },

    /// Get a document by _id
    Get {
        database: String,
        collection: String,
        id: String,
        /// Force id interpretation: objectid, string or number
        #[arg(long = "type", value_name = "TYPE")]
        id_type: Option<String>,
        #[arg(long, value_name = "JSON")]
        projection: Option<String>,
    },

    /// Count documents
    Count {
        database: String,
        collection: String,
        #[arg(long, value_name = "JSON")]
        filter: Option<String>,
    },

    /// Random documents
    Sample {
        database: String,
        collection: String,
        /// Number of documents, default defaults.sampleSize
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        size: Option<u64>,
        #[arg(long, value_name = "JSON")]
        filter: Option<String>,
    },

    /// Distinct field values
    Distinct {
        database: String,
        collection: String,
        /// Field path, dot notation allowed
        field: String,
        #[arg(long, value_name = "JSON")]
        filter: Option<String>,
    },

    /// Run a read-only aggregation pipeline
    Aggregate {
        database: String,
        collection: String,
        /// Pipeline as a JSON array
        pipeline: Option<String>,
        /// Pipeline as a JSON array (or pipe via stdin)
        #[arg(long = "pipeline", value_name = "JSON")]
        pipeline_flag: Option<String>,
        /// Max results if the pipeline has no $limit stage
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        limit: Option<u64>,
    },

    /// Print query command documentation
    Usage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "agent-mongo", "query", "find", "shop", "users", "-c", "prod", "--expand", "body", "--limit", "5",
        ])
        .unwrap();
        assert_eq!(cli.globals.connection.as_deref(), Some("prod"));
        assert_eq!(cli.globals.expand.as_deref(), Some("body"));
        match cli.command {
            Command::Query {
                command: QueryCommand::Find { page, .. },
            } => {
                assert_eq!(page.limit, Some(5));
                assert_eq!(page.skip, 0);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_db_alias_and_schema_depth() {
        let cli = Cli::try_parse_from(["agent-mongo", "db", "stats", "shop"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Database {
                command: DatabaseCommand::Stats { .. }
            }
        ));

        let cli = Cli::try_parse_from(["agent-mongo", "collection", "schema", "shop", "users", "--depth", "2"]).unwrap();
        match cli.command {
            Command::Collection {
                command: CollectionCommand::Schema { sample_size, max_depth, .. },
            } => {
                assert_eq!(sample_size, 100);
                assert_eq!(max_depth, Some(2));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_credential_flags_conflict() {
        assert!(Cli::try_parse_from([
            "agent-mongo", "connection", "update", "prod", "--credential", "acme", "--no-credential",
        ])
        .is_err());
        assert!(Cli::try_parse_from(["agent-mongo", "query", "sample", "shop", "users", "--size", "0"]).is_err());
    }
}
