//! MongoDB session management for agent-mongo.
//!
//! Resolves connection aliases to live sessions, caches them for one run and
//! manages stored connections and credentials.

pub mod mongo_session;
pub mod service;
pub mod session_manager;

pub use mongo_session::{MongoOpener, MongoSession};
pub use service::{ConnectionService, CredentialService};
pub use session_manager::{ResolvedSession, SessionManager, SessionOpener, SessionTarget};
