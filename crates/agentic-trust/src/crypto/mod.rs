//! Cryptographic primitives for AgenticTrust.
//!
//! This module provides:
//! - Cryptographically secure random nonces for challenges
//! - SHA-256 filesystem-safe record keys

pub mod digest;
pub mod random;
