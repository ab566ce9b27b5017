//! Receipts: evidence linking a presentation to an attested credential state.

pub mod registry;
pub mod status;

pub use registry::InMemoryReceiptRegistry;
pub use status::{CredentialRecord, ReceiptStatus, ReceiptStatusProvider};
