//! Single-use verification challenges.
//!
//! A relying party issues a challenge, the holder binds its presentation to
//! the nonce, and the verifier consumes the nonce exactly once before doing
//! any other work.

pub mod store;
pub mod types;

pub use store::ChallengeStore;
pub use types::{Challenge, ChallengeConfig, ChallengeError, ChallengeStats};
