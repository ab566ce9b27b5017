//! Presentation verification.
//!
//! The presentation module provides:
//! - Presentation and request wire types
//! - The verification states and typed error codes
//! - The verifier that runs a presentation through every check

pub mod types;
pub mod verifier;

pub use types::{
    CredentialVerification, CredentialVerificationRequest, Disclosure, ErrorCode, Presentation,
    ReceiptRef, Rejection, Verdict, VerificationResult, VerificationState, VerifiedCredential,
    VerifiedPresentation,
};
pub use verifier::{PresentationVerifier, VerifierConfig};
