//! Claimed-brand → issuer index.

use std::collections::HashMap;

use crate::issuer::{AssuranceLevel, Issuer, IssuerType};

/// How strongly an issuer holds a brand claim. Larger wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct ClaimStrength {
    not_revoked: bool,
    registered_entity: bool,
    assurance: AssuranceLevel,
}

impl ClaimStrength {
    fn of(issuer: &Issuer) -> Self {
        Self {
            not_revoked: !issuer.is_revoked,
            registered_entity: issuer.issuer_type != IssuerType::SelfSovereign,
            assurance: issuer.assurance,
        }
    }
}

#[derive(Debug, Clone)]
struct Claim {
    did: String,
    strength: ClaimStrength,
}

/// One issuer per normalized brand name.
///
/// On collision the stronger claimant keeps the slot: unrevoked before
/// revoked, registered entities before self-sovereign, then higher
/// assurance. Ties go to the incumbent.
#[derive(Debug, Default)]
pub(crate) struct BrandIndex {
    by_brand: HashMap<String, Claim>,
    by_did: HashMap<String, String>,
}

impl BrandIndex {
    /// Update the index for a new or changed issuer record.
    pub(crate) fn record(&mut self, issuer: &Issuer) {
        let brand = issuer.normalized_brand();

        if let Some(previous) = self.by_did.get(&issuer.did).cloned() {
            if brand.as_deref() != Some(previous.as_str()) {
                self.release(&issuer.did);
            }
        }

        let Some(brand) = brand else {
            return;
        };
        let strength = ClaimStrength::of(issuer);
        let displace = match self.by_brand.get(&brand) {
            None => true,
            Some(current) if current.did == issuer.did => true,
            Some(current) => {
                if strength > current.strength {
                    true
                } else {
                    tracing::warn!(
                        brand = %brand,
                        holder = %current.did,
                        claimant = %issuer.did,
                        "brand already held by a stronger or equal claimant"
                    );
                    false
                }
            }
        };
        if !displace {
            return;
        }

        if let Some(old) = self.by_brand.insert(
            brand.clone(),
            Claim {
                did: issuer.did.clone(),
                strength,
            },
        ) {
            if old.did != issuer.did {
                tracing::info!(brand = %brand, from = %old.did, to = %issuer.did, "brand claim displaced");
                self.by_did.remove(&old.did);
            }
        }
        self.by_did.insert(issuer.did.clone(), brand);
    }

    /// Drop whatever brand `did` holds.
    pub(crate) fn release(&mut self, did: &str) {
        if let Some(brand) = self.by_did.remove(did) {
            if self.by_brand.get(&brand).is_some_and(|c| c.did == did) {
                self.by_brand.remove(&brand);
            }
        }
    }

    /// DID holding the normalized brand.
    pub(crate) fn get(&self, normalized_brand: &str) -> Option<&str> {
        self.by_brand.get(normalized_brand).map(|c| c.did.as_str())
    }

    pub(crate) fn len(&self) -> usize {
        self.by_brand.len()
    }
}
