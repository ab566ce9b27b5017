//! Registry of well-known brands reserved for legally verified entities.

use crate::issuer::{normalize_name, AssuranceLevel, IssuerType};

use super::types::WellKnownBrand;

/// Shortest normalized token allowed to take part in a substring match.
///
/// Shorter tokens (e.g. the "aa" alias) only match exactly.
pub const MIN_PARTIAL_MATCH_LEN: usize = 3;

/// Ordered brand table. The first matching entry wins.
#[derive(Debug, Clone)]
pub struct BrandRegistry {
    brands: Vec<WellKnownBrand>,
}

impl BrandRegistry {
    /// Create a registry from an explicit table.
    pub fn new(brands: Vec<WellKnownBrand>) -> Self {
        Self { brands }
    }

    /// The built-in table of technology, finance, exchange and airline brands.
    pub fn builtin() -> Self {
        use AssuranceLevel::{BasicKyc, RegulatedEntity};
        use IssuerType::Corporation;

        Self::new(vec![
            // Technology
            WellKnownBrand::new(
                "Amazon",
                &["Amazon.com", "AWS", "Amazon Web Services"],
                Corporation,
                RegulatedEntity,
            ),
            WellKnownBrand::new(
                "Google",
                &["Google Cloud", "GCP", "Alphabet"],
                Corporation,
                RegulatedEntity,
            ),
            WellKnownBrand::new(
                "Microsoft",
                &["Microsoft Azure", "Azure"],
                Corporation,
                RegulatedEntity,
            ),
            WellKnownBrand::new("Apple", &["Apple Inc", "Apple Pay"], Corporation, RegulatedEntity),
            // Finance
            WellKnownBrand::new("Bank of America", &["BOA", "BofA"], Corporation, RegulatedEntity),
            WellKnownBrand::new(
                "JPMorgan",
                &["JP Morgan", "Chase", "JPMorgan Chase"],
                Corporation,
                RegulatedEntity,
            ),
            WellKnownBrand::new("Wells Fargo", &[], Corporation, RegulatedEntity),
            WellKnownBrand::new("Citibank", &["Citi", "Citigroup"], Corporation, RegulatedEntity),
            // Crypto exchanges
            WellKnownBrand::new("Coinbase", &["Coinbase Pro"], Corporation, RegulatedEntity),
            WellKnownBrand::new("Binance", &["Binance US"], Corporation, RegulatedEntity),
            WellKnownBrand::new("Kraken", &[], Corporation, RegulatedEntity),
            // Airlines
            WellKnownBrand::new(
                "Delta",
                &["Delta Airlines", "Delta Air Lines"],
                Corporation,
                BasicKyc,
            ),
            WellKnownBrand::new("American Airlines", &["AA", "AmericanAir"], Corporation, BasicKyc),
            WellKnownBrand::new("United Airlines", &["United"], Corporation, BasicKyc),
        ])
    }

    /// All entries in table order.
    pub fn brands(&self) -> &[WellKnownBrand] {
        &self.brands
    }

    pub fn len(&self) -> usize {
        self.brands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.brands.is_empty()
    }

    /// Find the well-known brand a claimed name refers to.
    ///
    /// Case-insensitive and trimmed; tolerant of the claim containing the
    /// brand or the brand containing the claim, for the name and every alias.
    pub fn find(&self, claimed: &str) -> Option<&WellKnownBrand> {
        let input = normalize_name(claimed);
        if input.is_empty() {
            return None;
        }
        self.brands.iter().find(|brand| {
            std::iter::once(brand.brand_name.as_str())
                .chain(brand.aliases.iter().map(String::as_str))
                .any(|name| names_match(&input, &normalize_name(name)))
        })
    }
}

impl Default for BrandRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn names_match(input: &str, known: &str) -> bool {
    if known.is_empty() {
        return false;
    }
    if input == known {
        return true;
    }
    let shorter = input.len().min(known.len());
    shorter >= MIN_PARTIAL_MATCH_LEN && (input.contains(known) || known.contains(input))
}
