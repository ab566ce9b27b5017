//! The presentation verification state machine.
//!
//! ```text
//! RECEIVED → STRUCTURE_CHECKED → CHALLENGE_CONSUMED → ISSUER_RESOLVED
//!          → RISK_ASSESSED → RECEIPT_CHECKED → ROLE_MATCHED → VALID
//! ```
//!
//! Any step may end the run with a [`Rejection`]. Nothing after the challenge
//! step runs for a replayed or expired nonce. A panic inside a collaborator
//! ends the run as `INTERNAL_ERROR` instead of unwinding into the caller.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use serde::{Deserialize, Serialize};

use crate::challenge::{Challenge, ChallengeError, ChallengeStore};
use crate::error::TrustError;
use crate::gateway::RetryGateway;
use crate::index::TrustIndex;
use crate::issuer::Issuer;
use crate::policy::{CredentialType, FraudPolicyEngine, Recommendation, RiskAssessment};
use crate::receipt::{ReceiptStatus, ReceiptStatusProvider};

use super::types::*;

type Step<T> = std::result::Result<T, Rejection>;

/// Verifier settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// When set, challenges issued for any other audience are refused.
    pub expected_audience: Option<String>,
}

/// Last state a run reached, readable after the run is dropped.
#[derive(Debug, Default)]
struct Progress(AtomicU8);

impl Progress {
    fn reach(&self, state: VerificationState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    fn current(&self) -> VerificationState {
        VerificationState::from_u8(self.0.load(Ordering::SeqCst))
    }

    fn reject(&self, code: ErrorCode, reason: impl Into<String>) -> Rejection {
        Rejection::new(code, reason, self.current())
    }
}

/// Ties the challenge store, trust index, risk engine and receipt status
/// together into a single verdict.
pub struct PresentationVerifier {
    index: Arc<TrustIndex>,
    challenges: Arc<ChallengeStore>,
    engine: Arc<FraudPolicyEngine>,
    receipts: Arc<dyn ReceiptStatusProvider>,
    gateway: RetryGateway,
    config: VerifierConfig,
}

impl PresentationVerifier {
    pub fn new(
        index: Arc<TrustIndex>,
        challenges: Arc<ChallengeStore>,
        engine: Arc<FraudPolicyEngine>,
        receipts: Arc<dyn ReceiptStatusProvider>,
    ) -> Self {
        Self {
            index,
            challenges,
            engine,
            receipts,
            gateway: RetryGateway::default(),
            config: VerifierConfig::default(),
        }
    }

    pub fn with_gateway(mut self, gateway: RetryGateway) -> Self {
        self.gateway = gateway;
        self
    }

    pub fn with_config(mut self, config: VerifierConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    pub fn engine(&self) -> &FraudPolicyEngine {
        &self.engine
    }

    pub fn index(&self) -> &TrustIndex {
        &self.index
    }

    pub fn challenges(&self) -> &ChallengeStore {
        &self.challenges
    }

    // -----------------------------------------------------------------------
    // Entry points
    // -----------------------------------------------------------------------

    /// Run the full state machine over a presentation.
    pub async fn verify(&self, presentation: &Presentation) -> VerificationResult {
        let progress = Progress::default();
        contained(self.run(presentation, &progress), &progress).await.into()
    }

    /// Like [`verify`](Self::verify), but gives up when `cancel` resolves first.
    ///
    /// A challenge consumed before cancellation stays consumed.
    pub async fn verify_until<C>(&self, presentation: &Presentation, cancel: C) -> VerificationResult
    where
        C: Future<Output = ()>,
    {
        let progress = Progress::default();
        tokio::select! {
            result = contained(self.run(presentation, &progress), &progress) => result.into(),
            () = cancel => Verdict::Rejected(cancelled(&progress, &presentation.subject_id)),
        }
    }

    /// Verify a bare credential claim: structure, challenge, issuer and risk.
    pub async fn verify_credential(
        &self,
        request: &CredentialVerificationRequest,
    ) -> CredentialVerification {
        let progress = Progress::default();
        contained(self.run_credential(request, &progress), &progress)
            .await
            .into()
    }

    /// Like [`verify_credential`](Self::verify_credential), but gives up when
    /// `cancel` resolves first.
    pub async fn verify_credential_until<C>(
        &self,
        request: &CredentialVerificationRequest,
        cancel: C,
    ) -> CredentialVerification
    where
        C: Future<Output = ()>,
    {
        let progress = Progress::default();
        tokio::select! {
            result = contained(self.run_credential(request, &progress), &progress) => result.into(),
            () = cancel => Verdict::Rejected(cancelled(&progress, &request.issuer_did)),
        }
    }

    // -----------------------------------------------------------------------
    // Runs
    // -----------------------------------------------------------------------

    async fn run(&self, p: &Presentation, progress: &Progress) -> Step<VerifiedPresentation> {
        check_fields(
            progress,
            &[
                ("subjectId", &p.subject_id),
                ("nonce", &p.nonce),
                ("proof", &p.proof),
                ("disclosed.role", &p.disclosed.role),
                ("receipt.credentialHash", &p.receipt.credential_hash),
                ("receipt.issuerDid", &p.receipt.issuer_did),
            ],
        )?;
        progress.reach(VerificationState::StructureChecked);

        self.consume_challenge(&p.nonce, progress)?;
        progress.reach(VerificationState::ChallengeConsumed);

        let issuer = self.resolve_issuer(&p.receipt.issuer_did, progress).await?;
        progress.reach(VerificationState::IssuerResolved);

        let assessment = self.assess(&issuer, p.receipt.credential_type, progress)?;
        progress.reach(VerificationState::RiskAssessed);

        let record = match self.receipt_status(&p.receipt.credential_hash, progress).await? {
            ReceiptStatus::Valid(record) => record,
            ReceiptStatus::Revoked => {
                return Err(progress.reject(ErrorCode::CredentialRevoked, "credential has been revoked"))
            }
            ReceiptStatus::Expired => {
                return Err(progress.reject(ErrorCode::CredentialExpired, "credential has expired"))
            }
            ReceiptStatus::Unknown => {
                return Err(progress.reject(
                    ErrorCode::UnknownCredential,
                    "no attested credential matches the receipt",
                ))
            }
        };
        if !record.issued_as(&p.receipt.issuer_did, p.receipt.credential_type) {
            tracing::warn!(
                subject = %p.subject_id,
                claimed_issuer = %p.receipt.issuer_did,
                recorded_issuer = %record.issuer_did,
                claimed_type = %p.receipt.credential_type,
                recorded_type = %record.credential_type,
                "receipt does not match the attested credential"
            );
            return Err(progress.reject(
                ErrorCode::UnknownCredential,
                "no attested credential matches the receipt's issuer and credential type",
            ));
        }
        progress.reach(VerificationState::ReceiptChecked);

        if record.role != p.disclosed.role {
            tracing::warn!(
                subject = %p.subject_id,
                disclosed = %p.disclosed.role,
                "disclosed role does not match credential"
            );
            return Err(progress.reject(
                ErrorCode::RoleMismatch,
                format!("disclosed role {} does not match the credential", p.disclosed.role),
            ));
        }
        if !record.covers_scopes(&p.disclosed.scopes) {
            return Err(progress.reject(
                ErrorCode::RoleMismatch,
                "disclosed scopes exceed the credential's scopes",
            ));
        }
        progress.reach(VerificationState::RoleMatched);

        progress.reach(VerificationState::Valid);
        tracing::info!(
            subject = %p.subject_id,
            issuer = %issuer.did,
            credential_type = %p.receipt.credential_type,
            risk = %assessment.score,
            "presentation verified"
        );
        Ok(VerifiedPresentation {
            subject_id: p.subject_id.clone(),
            role: p.disclosed.role.clone(),
            scopes: p.disclosed.scopes.clone(),
            risk_score: assessment.score,
            issuer_did: issuer.did,
            credential_type: p.receipt.credential_type,
        })
    }

    async fn run_credential(
        &self,
        req: &CredentialVerificationRequest,
        progress: &Progress,
    ) -> Step<VerifiedCredential> {
        check_fields(
            progress,
            &[
                ("issuerDid", &req.issuer_did),
                ("proof", &req.proof),
                ("challenge", &req.challenge),
            ],
        )?;
        progress.reach(VerificationState::StructureChecked);

        self.consume_challenge(&req.challenge, progress)?;
        progress.reach(VerificationState::ChallengeConsumed);

        let issuer = self.resolve_issuer(&req.issuer_did, progress).await?;
        progress.reach(VerificationState::IssuerResolved);

        let assessment = self.assess(&issuer, req.credential_type, progress)?;
        progress.reach(VerificationState::Valid);

        tracing::info!(
            issuer = %issuer.did,
            credential_type = %req.credential_type,
            risk = %assessment.score,
            "credential verified"
        );
        Ok(VerifiedCredential {
            issuer_did: issuer.did,
            issuer_type: issuer.issuer_type,
            domains: issuer.domains,
            assurance_level: issuer.assurance,
            credential_type: req.credential_type,
            risk_score: assessment.score,
            risk_flags: assessment.flags,
        })
    }

    // -----------------------------------------------------------------------
    // Steps
    // -----------------------------------------------------------------------

    fn consume_challenge(&self, nonce: &str, progress: &Progress) -> Step<Challenge> {
        let challenge = self.challenges.consume(nonce).map_err(|e| {
            tracing::warn!(error = %e, "challenge rejected");
            let reason = match e {
                ChallengeError::Expired => "challenge expired",
                ChallengeError::NotFound => "challenge not found or already used",
            };
            progress.reject(ErrorCode::InvalidChallenge, reason)
        })?;

        if let Some(expected) = &self.config.expected_audience {
            if &challenge.aud != expected {
                tracing::warn!(aud = %challenge.aud, expected = %expected, "challenge audience mismatch");
                return Err(progress.reject(
                    ErrorCode::InvalidChallenge,
                    format!("challenge was issued for {}", challenge.aud),
                ));
            }
        }
        Ok(challenge)
    }

    async fn resolve_issuer(&self, did: &str, progress: &Progress) -> Step<Issuer> {
        self.index.find_issuer(did).await.map_err(|e| match e {
            TrustError::NotFound(_) => {
                tracing::warn!(did, "unknown issuer");
                progress.reject(ErrorCode::UnknownIssuer, format!("issuer {did} is not registered"))
            }
            e if e.is_unavailable() => {
                tracing::error!(did, error = %e, "issuer lookup failed");
                progress.reject(ErrorCode::ServiceUnavailable, "issuer registry unavailable")
            }
            e => {
                tracing::error!(did, error = %e, "issuer lookup failed");
                progress.reject(ErrorCode::InternalError, "issuer lookup failed")
            }
        })
    }

    fn assess(
        &self,
        issuer: &Issuer,
        credential_type: CredentialType,
        progress: &Progress,
    ) -> Step<RiskAssessment> {
        let assessment = self.engine.assess(issuer, credential_type);
        if assessment.is_blocking() {
            let code = assessment
                .reason
                .map_or(ErrorCode::InternalError, ErrorCode::from_risk_reason);
            tracing::warn!(
                did = %issuer.did,
                credential_type = %credential_type,
                code = %code,
                score = %assessment.score,
                "risk assessment blocked credential"
            );
            let reason = match assessment.reason {
                Some(r) => format!("risk assessment blocked the credential: {r}"),
                None => "risk assessment blocked the credential".to_string(),
            };
            return Err(progress.reject(code, reason).with_flags(assessment.flags));
        }
        if assessment.recommendation == Some(Recommendation::Warn) {
            tracing::warn!(
                did = %issuer.did,
                credential_type = %credential_type,
                score = %assessment.score,
                flags = ?assessment.flags,
                "proceeding despite risk warning"
            );
        }
        Ok(assessment)
    }

    async fn receipt_status(&self, credential_hash: &str, progress: &Progress) -> Step<ReceiptStatus> {
        let receipts = self.receipts.as_ref();
        self.gateway
            .call("receipts.check", move || receipts.check(credential_hash))
            .await
            .map_err(|e| {
                tracing::error!(provider = receipts.name(), error = %e, "receipt status check failed");
                if e.is_unavailable() {
                    progress.reject(ErrorCode::ServiceUnavailable, "receipt status service unavailable")
                } else {
                    progress.reject(ErrorCode::InternalError, "receipt status check failed")
                }
            })
    }
}

impl std::fmt::Debug for PresentationVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresentationVerifier")
            .field("config", &self.config)
            .field("receipts", &self.receipts.name())
            .finish_non_exhaustive()
    }
}

fn cancelled(progress: &Progress, subject: &str) -> Rejection {
    let state = progress.current();
    tracing::warn!(subject, state = %state, "verification cancelled");
    Rejection::new(ErrorCode::Cancelled, "verification cancelled by caller", state)
}

/// Run `step`, turning a panic into an `INTERNAL_ERROR` rejection.
async fn contained<T>(step: impl Future<Output = Step<T>>, progress: &Progress) -> Step<T> {
    match AssertUnwindSafe(step).catch_unwind().await {
        Ok(result) => result,
        Err(_) => {
            let state = progress.current();
            tracing::error!(state = %state, "verification step panicked");
            Err(progress.reject(ErrorCode::InternalError, "internal error during verification"))
        }
    }
}

fn check_fields(progress: &Progress, fields: &[(&str, &String)]) -> Step<()> {
    match fields.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((name, _)) => Err(progress.reject(
            ErrorCode::InvalidStructure,
            format!("missing required field {name}"),
        )),
        None => Ok(()),
    }
}
