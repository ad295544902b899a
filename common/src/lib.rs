//! Shared building blocks for the agent-mongo workspace.
//!
//! Everything that does not need a live MongoDB session lives here: the
//! config file and its settings, secret storage, the remote value model and
//! its JSON serializer, the pipeline validator and the output shaper.

pub mod config;
pub mod errors;
pub mod models;
pub mod response;
pub mod secret;
pub mod session;
pub mod store;
pub mod utils;
pub mod value;

pub use config::RuntimeConfig;
pub use errors::{AppError, AppResult, ErrorKind};
pub use response::{OutputMode, OutputShaper};
pub use secret::SecretBackend;
pub use session::DocumentSession;
pub use store::SettingsStore;
pub use value::{RemoteValue, TypeTag};
