//! Rule-driven risk detectors.
//!
//! Every detector implements [`Detector`] and is parameterised entirely by its
//! block in the [`RuleDocument`]. Shared matching and risk-construction
//! helpers live in [`DetectorContext`], which each detector owns.
//!
//! Detectors are looked up by name through a [`DetectorRegistry`]. The
//! built-in registry knows all eight categories.

use crate::{
    Requirement, Risk, RiskCategory, RiskFactory, ValidationError,
    rules::{ConfigurationError, RuleDocument},
};

mod support;
pub use support::{DetectorContext, Finding};

pub mod similarity;

mod ambiguity;
pub use ambiguity::AmbiguityDetector;

mod availability;
pub use availability::AvailabilityDetector;

mod conflict;
pub use conflict::ConflictDetector;

mod missing_detail;
pub use missing_detail::MissingDetailDetector;

mod performance;
pub use performance::PerformanceDetector;

mod scope;
pub use scope::ScopeDetector;

mod security;
pub use security::SecurityDetector;

mod traceability;
pub use traceability::TraceabilityDetector;

/// An error raised while a detector inspects a requirement.
///
/// The analyzer isolates these: a failing detector contributes no risks and
/// the run continues.
#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    /// A risk could not be constructed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The detector gave up for another reason.
    #[error("{detector} failed: {reason}")]
    Failed {
        /// Name of the failing detector.
        detector: String,
        /// What went wrong.
        reason: String,
    },
}

/// A named, independently configurable rule evaluator.
pub trait Detector: Send + Sync {
    /// Human-readable name, used in logs.
    fn name(&self) -> &'static str;

    /// The category of every risk this detector raises.
    fn category(&self) -> RiskCategory;

    /// Inspect one requirement.
    ///
    /// Identifiers for new risks are minted through `risks`.
    ///
    /// # Errors
    ///
    /// Returns a [`DetectorError`] if the requirement cannot be evaluated.
    fn detect_risks(
        &self,
        requirement: &Requirement,
        risks: &mut RiskFactory,
    ) -> Result<Vec<Risk>, DetectorError>;
}

/// A detector that inspects the requirement set as a whole.
pub trait SetDetector: Send + Sync {
    /// Human-readable name, used in logs.
    fn name(&self) -> &'static str;

    /// Inspect every requirement at once.
    ///
    /// # Errors
    ///
    /// Returns a [`DetectorError`] if the set cannot be evaluated.
    fn detect_across(
        &self,
        requirements: &[Requirement],
        risks: &mut RiskFactory,
    ) -> Result<Vec<Risk>, DetectorError>;
}

/// Builds a detector from a rule document.
pub type DetectorConstructor =
    fn(&RuleDocument) -> Result<Box<dyn Detector>, ConfigurationError>;

fn boxed<D, F>(build: F, rules: &RuleDocument) -> Result<Box<dyn Detector>, ConfigurationError>
where
    D: Detector + 'static,
    F: FnOnce(&RuleDocument) -> Result<D, ConfigurationError>,
{
    Ok(Box::new(build(rules)?))
}

/// A name-keyed table of detector constructors.
///
/// Iteration follows registration order, which is also the order in which
/// [`DetectorRegistry::create_enabled`] returns detectors.
#[derive(Debug, Clone)]
pub struct DetectorRegistry {
    entries: Vec<(&'static str, DetectorConstructor)>,
}

impl Default for DetectorRegistry {
    /// A registry containing the eight built-in detectors, in canonical
    /// category order.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(RiskCategory::Ambiguity.as_str(), |rules| {
            boxed(AmbiguityDetector::new, rules)
        });
        registry.register(RiskCategory::MissingDetail.as_str(), |rules| {
            boxed(MissingDetailDetector::new, rules)
        });
        registry.register(RiskCategory::Security.as_str(), |rules| {
            boxed(SecurityDetector::new, rules)
        });
        registry.register(RiskCategory::Conflict.as_str(), |rules| {
            boxed(ConflictDetector::new, rules)
        });
        registry.register(RiskCategory::Performance.as_str(), |rules| {
            boxed(PerformanceDetector::new, rules)
        });
        registry.register(RiskCategory::Availability.as_str(), |rules| {
            boxed(AvailabilityDetector::new, rules)
        });
        registry.register(RiskCategory::Traceability.as_str(), |rules| {
            boxed(TraceabilityDetector::new, rules)
        });
        registry.register(RiskCategory::Scope.as_str(), |rules| {
            boxed(ScopeDetector::new, rules)
        });
        registry
    }
}

impl DetectorRegistry {
    /// A registry with no detectors.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a constructor under `name`.
    ///
    /// Registering an existing name replaces its constructor in place.
    pub fn register(&mut self, name: &'static str, constructor: DetectorConstructor) {
        if let Some(entry) = self.entries.iter_mut().find(|(key, _)| *key == name) {
            entry.1 = constructor;
        } else {
            self.entries.push((name, constructor));
        }
    }

    /// Construct the named detector.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnknownDetector`] for unregistered names,
    /// and [`ConfigurationError::DetectorDisabled`] if the detector's block is
    /// disabled or absent.
    pub fn create(
        &self,
        name: &str,
        rules: &RuleDocument,
    ) -> Result<Box<dyn Detector>, ConfigurationError> {
        let (_, constructor) = self
            .entries
            .iter()
            .find(|(key, _)| *key == name)
            .ok_or_else(|| ConfigurationError::UnknownDetector(name.to_string()))?;
        constructor(rules)
    }

    /// Construct every registered detector that the rule document enables, in
    /// registration order.
    ///
    /// # Errors
    ///
    /// Propagates the first construction error.
    pub fn create_enabled(
        &self,
        rules: &RuleDocument,
    ) -> Result<Vec<Box<dyn Detector>>, ConfigurationError> {
        self.entries
            .iter()
            .filter(|(name, _)| rules.is_enabled(name))
            .map(|(_, constructor)| constructor(rules))
            .collect()
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }
}


#[cfg(test)]
mod tests {
    use super::{test_support::builtin_rules, *};
    use crate::rules::Format;

    #[test]
    fn default_registry_lists_categories_in_order() {
        let names: Vec<&str> = DetectorRegistry::default().names().collect();
        let expected: Vec<&str> = RiskCategory::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn created_detector_reports_its_category() {
        let registry = DetectorRegistry::default();
        let rules = builtin_rules();
        for category in RiskCategory::ALL {
            let detector = registry.create(category.as_str(), &rules).unwrap();
            assert_eq!(detector.category(), category);
        }
    }

    #[test]
    fn unknown_detector_is_an_error() {
        let error = DetectorRegistry::default()
            .create("grammar", &builtin_rules())
            .err().unwrap();
        assert!(matches!(error, ConfigurationError::UnknownDetector(name) if name == "grammar"));
    }

    #[test]
    fn disabled_detector_fails_at_construction() {
        let rules = RuleDocument::parse(
            "[detectors.security]\nenabled = false\n",
            Format::Toml,
            "test",
        )
        .unwrap();
        let registry = DetectorRegistry::default();

        let error = registry.create("security", &rules).err().unwrap();
        assert!(matches!(
            error,
            ConfigurationError::DetectorDisabled(RiskCategory::Security)
        ));

        // absent blocks count as disabled
        assert!(matches!(
            registry.create("scope", &rules).err().unwrap(),
            ConfigurationError::DetectorDisabled(RiskCategory::Scope)
        ));
    }

    #[test]
    fn create_enabled_skips_disabled_detectors() {
        let rules = RuleDocument::parse(
            "[detectors.scope]\nenabled = true\n[detectors.ambiguity]\nenabled = true\n[detectors.security]\nenabled = false\n",
            Format::Toml,
            "test",
        )
        .unwrap();
        let detectors = DetectorRegistry::default().create_enabled(&rules).unwrap();
        let categories: Vec<RiskCategory> = detectors.iter().map(|d| d.category()).collect();
        assert_eq!(
            categories,
            vec![RiskCategory::Ambiguity, RiskCategory::Scope]
        );
    }

    #[test]
    fn register_replaces_existing_entry() {
        let mut registry = DetectorRegistry::default();
        registry.register("ambiguity", |rules| boxed(ScopeDetector::new, rules));
        assert_eq!(registry.names().count(), 8);

        let detector = registry.create("ambiguity", &builtin_rules()).unwrap();
        assert_eq!(detector.category(), RiskCategory::Scope);
    }
}
