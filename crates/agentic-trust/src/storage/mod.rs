//! Storage layer for issuer and agent records.
//!
//! # Directory layout
//!
//! By convention the default root is `~/.agentic-trust/`:
//!
//! ```text
//! ~/.agentic-trust/
//! ├── issuers/
//! │   └── {did_key}.json
//! └── agents/
//!     └── {did_key}.json
//! ```
//!
//! # Modules
//!
//! - [`record_store`]: filesystem implementations of the index repositories.

pub mod record_store;

pub use record_store::{FileAgentRepository, FileIssuerRepository};

/// Default storage root (`~/.agentic-trust`), if a home directory is known.
pub fn default_store_dir() -> Option<std::path::PathBuf> {
    std::env::var_os("HOME").map(|home| std::path::PathBuf::from(home).join(".agentic-trust"))
}
