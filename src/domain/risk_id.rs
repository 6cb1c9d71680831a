use std::collections::HashMap;

use super::{Requirement, Risk, RiskCategory, SeverityLevel, ValidationError};

/// Generates deterministic risk identifiers.
///
/// Identifiers have the form `{requirement_id}-{CODE}-{counter}`, where the
/// counter is scoped to the `(requirement, category)` pair, starts at 1, and
/// is zero-padded to three digits: `R001-AMB-001`, `R001-AMB-002`,
/// `R001-SEC-001`, `R002-AMB-001`.
///
/// A generator belongs to one analysis run. It is never shared implicitly, so
/// concurrent runs cannot interfere with each other.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RiskIdGenerator {
    counters: HashMap<(String, RiskCategory), usize>,
}

impl RiskIdGenerator {
    /// Create a generator with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint the next identifier for `(requirement_id, category)`.
    pub fn generate(&mut self, requirement_id: &str, category: RiskCategory) -> String {
        let counter = self
            .counters
            .entry((requirement_id.to_string(), category))
            .or_insert(0);
        *counter += 1;
        format!("{requirement_id}-{}-{counter:03}", category.code())
    }

    /// The last counter value issued for `(requirement_id, category)`.
    ///
    /// Returns 0 if no identifier has been generated for the pair.
    #[must_use]
    pub fn counter(&self, requirement_id: &str, category: RiskCategory) -> usize {
        self.counters
            .get(&(requirement_id.to_string(), category))
            .copied()
            .unwrap_or(0)
    }

    /// Clear every counter.
    pub fn reset(&mut self) {
        self.counters.clear();
    }

    /// A new generator carrying only the counters of one requirement.
    ///
    /// Used to hand a worker its own generator when requirements are analysed
    /// in parallel. Merge it back with [`RiskIdGenerator::absorb`].
    #[must_use]
    pub fn scoped(&self, requirement_id: &str) -> Self {
        let counters = self
            .counters
            .iter()
            .filter(|((id, _), _)| id == requirement_id)
            .map(|(key, value)| (key.clone(), *value))
            .collect();
        Self { counters }
    }

    /// Fold the counters of another generator into this one.
    ///
    /// Where both generators know a key, the higher counter wins.
    pub fn absorb(&mut self, other: Self) {
        for (key, value) in other.counters {
            let counter = self.counters.entry(key).or_insert(0);
            *counter = (*counter).max(value);
        }
    }
}

/// Assembles fully validated [`Risk`] records.
///
/// This is the only place new risk identifiers are minted.
#[derive(Debug, Default, Clone)]
pub struct RiskFactory {
    ids: RiskIdGenerator,
}

impl RiskFactory {
    /// Create a factory around an identifier generator.
    #[must_use]
    pub const fn new(ids: RiskIdGenerator) -> Self {
        Self { ids }
    }

    /// Create a risk with a freshly minted identifier.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the description or evidence are
    /// empty. The identifier counter is only advanced for valid risks.
    pub fn create(
        &mut self,
        requirement: &Requirement,
        category: RiskCategory,
        severity: SeverityLevel,
        description: impl Into<String>,
        evidence: impl Into<String>,
        suggestion: Option<String>,
    ) -> Result<Risk, ValidationError> {
        let description = description.into();
        let evidence = evidence.into();
        if description.trim().is_empty() {
            return Err(ValidationError::EmptyDescription);
        }
        if evidence.trim().is_empty() {
            return Err(ValidationError::EmptyEvidence);
        }

        let id = self.ids.generate(requirement.id(), category);
        Risk::new(
            id,
            requirement,
            category,
            severity,
            description,
            evidence,
            suggestion,
        )
    }

    /// The underlying identifier generator.
    #[must_use]
    pub const fn ids(&self) -> &RiskIdGenerator {
        &self.ids
    }

    /// Mutable access to the underlying identifier generator.
    pub const fn ids_mut(&mut self) -> &mut RiskIdGenerator {
        &mut self.ids
    }

    /// Consume the factory, returning its generator.
    #[must_use]
    pub fn into_ids(self) -> RiskIdGenerator {
        self.ids
    }
}
