//! Plain-text documentation printed by `usage` commands.
//!
//! Written for agents reading the output, so it is dense and example-led.

pub fn print(text: &str) {
    println!("{}", text.trim());
}

pub const OVERVIEW: &str = r#"
agent-mongo - MongoDB CLI for AI agents (JSON output, read-only)

COMMANDS:
  connection add|remove|update|list|test|set-default   Manage MongoDB connections
  credential add|remove|list                           Manage stored credentials
  config get|set|reset|list-keys                       Persistent settings

  database list                                        List all databases (alias: db)
  database stats <database>                            Database statistics

  collection list <database>                           List collections
  collection schema <database> <collection>            Infer schema from samples
  collection indexes <database> <collection>           List indexes
  collection stats <database> <collection>             Collection statistics

  query find <database> <collection> [--filter] [--sort]      Find documents
  query get <database> <collection> <id> [--projection]       Get document by _id
  query count <database> <collection> [--filter]              Count documents
  query sample <database> <collection> [--size] [--filter]    Random documents
  query distinct <database> <collection> <field>              Distinct field values
  query aggregate <database> <collection> [pipeline] [--pipeline <json>]   Aggregation pipeline

GLOBAL FLAGS: -c <alias> (connection), --expand <fields>, --full, --uuid-strings, -v

CONNECTION: -c flag > AGENT_MONGO_CONNECTION env > config default.
  Connections can reference stored credentials via --credential for shared auth.

SAFETY: Read-only. No write operations. Aggregation rejects $out/$merge.
  Results capped at query.maxDocuments (default 100). Timeout: query.timeout (default 30s).

OUTPUT: JSON to stdout. Errors: {"error": "..."} to stderr, exit code 1.
  Strings longer than truncation.maxLength are cut and get a <field>Length sibling.
  Use --expand <field> or --full to see them whole.

DETAIL: Run "<command> usage" for per-command docs.
"#;

pub const CONNECTION: &str = r#"
connection - Manage MongoDB connections

COMMANDS:
  connection add <alias> <uri> [--database <db>] [--credential <name>] [--default]
    Save a MongoDB connection. Alias is a short name (e.g. local, staging, prod).
    URI: mongodb://... or mongodb+srv://...
    --database overrides the database from the URI.
    --credential references a stored credential for authentication.

  connection update <alias> [--credential <name>] [--no-credential] [--database <db>]
    Update a saved connection. Only specified fields are changed.

  connection remove <alias>
    Remove a saved connection. Removing the default picks another one.

  connection list
    List all saved connections with their credential names.

  connection test [-c <alias>]
    Ping MongoDB to verify connectivity. Uses default connection if -c omitted.

  connection set-default <alias>
    Set which connection is used when -c is not specified.

RESOLUTION ORDER: -c flag > AGENT_MONGO_CONNECTION env > config default > error

CONFIG: ~/.config/agent-mongo/config.json (respects XDG_CONFIG_HOME)
"#;

pub const CREDENTIAL: &str = r#"
credential - Manage stored credentials for MongoDB authentication

COMMANDS:
  credential add <name> --username <user> --password <pass>
    Store a named credential. Overwrites if name already exists.
    Stored in the OS keychain when available, otherwise inline in config.json.
    Set AGENT_MONGO_DISABLE_KEYRING=1 to always store inline.

  credential remove <name> [--force]
    Remove a stored credential. Fails if any connection references it.
    --force removes anyway and clears credential refs from those connections.

  credential list
    List all stored credentials (passwords always redacted).
    Shows which connections reference each credential.

WORKFLOW:
  1. Store credential:   agent-mongo credential add acme --username deploy --password secret
  2. Add connections:    agent-mongo connection add prod <uri> --credential acme
  3. Rotate password:    agent-mongo credential add acme --username deploy --password new-secret
     All connections referencing "acme" pick up the new password automatically.
"#;

pub const CONFIG: &str = r#"
config - Manage CLI settings

COMMANDS:
  config get <key>              Get a config value
  config set <key> <value>      Set a config value
  config reset                  Reset all settings to defaults
  config list-keys              List all valid keys with defaults and ranges

KEYS:
  defaults.limit        (20)     Default result limit for list/query commands [1-1000]
  defaults.sampleSize   (5)      Default sample size for query sample [1-100]
  query.timeout         (30000)  Query timeout in ms [1000-300000]
  query.maxDocuments    (100)    Max documents per query [1-10000]
  truncation.maxLength  (200)    Max string length before truncation [50-100000]

EXAMPLES:
  agent-mongo config set defaults.limit 50
  agent-mongo config get query.timeout
  agent-mongo config reset
"#;

pub const DATABASE: &str = r#"
database - Database discovery (alias: db)

COMMANDS:
  database list [-c <alias>]
    List all databases with sizes. Returns name, sizeOnDisk, empty flag, and totalSize.

  database stats <database> [-c <alias>]
    Collection count, document count, data/storage/index sizes.

EXAMPLES:
  agent-mongo database list
  agent-mongo db list -c production
  agent-mongo db stats myapp
"#;

pub const COLLECTION: &str = r#"
collection - Collection discovery

COMMANDS:
  collection list <database> [--limit <n>] [--skip <n>] [-c <alias>]
    List collections sorted by name. Returns name and type (collection, view, timeseries).

  collection schema <database> <collection> [--sample-size <n>] [--max-depth <n>] [--limit <n>] [--skip <n>]
    Infer collection schema by sampling documents. Default sample: 100.
    Returns field paths, types, and presence rates (0.0-1.0).
    Array element types shown as "path.$" entries.
    Errors if collection does not exist.
    --max-depth <n>  Limit nesting depth (1 = top-level only). Alias: --depth
    --limit/--skip   Paginate large schemas; totalFields gives the full count.

  collection indexes <database> <collection>
    List all indexes with key patterns, uniqueness, TTL and partial filters.

  collection stats <database> <collection>
    Document count, data/storage/index sizes, capped flag.

EXAMPLES:
  agent-mongo collection list myapp
  agent-mongo collection schema myapp users --sample-size 500
  agent-mongo collection schema myapp events --max-depth 2 --limit 50
  agent-mongo collection indexes myapp users
"#;

pub const QUERY: &str = r#"
query - Document retrieval (read-only)

COMMANDS:
  query find <database> <collection> [--filter <json>] [--sort <json>] [--projection <json>] [--limit <n>] [--skip <n>]
    Find documents matching a filter. Default sort: {"_id": -1}. Default limit: 20.
    Returns documents, count, totalMatching and pagination.nextCursor (next --skip).

  query get <database> <collection> <id> [--type objectid|string|number] [--projection <json>]
    Get a single document by _id. Auto-detects ObjectId (24-char hex) vs string.

  query count <database> <collection> [--filter <json>]
    Count documents matching a filter. Omit --filter for the estimated total.

  query sample <database> <collection> [--size <n>] [--filter <json>]
    Random documents. Default size: defaults.sampleSize (5).

  query distinct <database> <collection> <field> [--filter <json>]
    Distinct values for a field. Supports dot notation (e.g. address.city).

  query aggregate <database> <collection> [pipeline] [--pipeline <json>] [--limit <n>]
    Run aggregation pipeline. Write stages ($out, $merge) are rejected.
    Pipeline can be passed as positional arg, via --pipeline, or piped via stdin.
    A $limit stage is appended when the pipeline has none.

JSON ARGS: MongoDB Extended JSON, e.g. {"_id": {"$oid": "..."}}, {"at": {"$date": "..."}}.

LIMITS: Results capped at query.maxDocuments (default 100). Timeout: query.timeout (default 30s).
  On timeout, hints suggest increasing timeout or checking indexes.

EXAMPLES:
  agent-mongo query find myapp users --filter '{"age":{"$gte":21}}' --limit 10
  agent-mongo query get myapp users 665a1b2c3d4e5f6a7b8c9d0e --projection '{"name":1}'
  agent-mongo query count myapp orders --filter '{"status":"pending"}'
  agent-mongo query aggregate myapp orders '[{"$group":{"_id":"$status","n":{"$sum":1}}}]'
"#;
