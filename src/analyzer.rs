//! Running detectors over a requirement set.
//!
//! The [`Analyzer`] invokes every detector on every requirement, in the order
//! the detectors were supplied. A detector that fails (or panics) on one
//! requirement is reported to the [`FailureHandler`] and contributes no risks
//! for that requirement; the run always completes.
//!
//! A detector may only report risks against the requirement it was given and
//! in its own category. Output that breaks either rule is treated as a
//! failure.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    panic::{self, AssertUnwindSafe},
};

use rayon::prelude::*;
use serde::{Serialize, ser::SerializeMap};
use tracing::instrument;

use crate::{
    Requirement, Risk, RiskFactory, SeverityLevel,
    detectors::{Detector, DetectorError, DetectorRegistry, SetDetector},
    filters::RiskFilter,
    rules::{ConfigurationError, RuleDocument},
};

/// Why a detector produced no result for a requirement.
#[derive(Debug)]
pub enum DetectorFailure {
    /// The detector returned an error.
    Error(DetectorError),
    /// The detector panicked. Holds the panic message, if it had one.
    Panicked(String),
    /// The detector returned a risk for another requirement or category.
    Misattributed {
        /// Identifier of the first offending risk.
        risk: String,
        /// How the risk is misattributed.
        reason: String,
    },
}

impl fmt::Display for DetectorFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(error) => write!(f, "{error}"),
            Self::Panicked(message) => write!(f, "panicked: {message}"),
            Self::Misattributed { risk, reason } => write!(f, "misattributed risk {risk}: {reason}"),
        }
    }
}

/// Decides what happens when a detector fails on a requirement.
///
/// Whatever the handler does, the failing pair contributes no risks and the
/// analysis continues.
pub trait FailureHandler: Send + Sync {
    /// Called once per failing (detector, requirement) pair.
    fn handle(&self, detector: &str, requirement: &Requirement, failure: &DetectorFailure);
}

/// Logs the failure as a warning and moves on.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAndSkip;

impl FailureHandler for LogAndSkip {
    fn handle(&self, detector: &str, requirement: &Requirement, failure: &DetectorFailure) {
        tracing::warn!(
            detector,
            requirement = requirement.id(),
            error = %failure,
            "detector failed, skipping"
        );
    }
}

/// Risks found per requirement.
///
/// Every analysed requirement has an entry, in input order, even if it has no
/// risks. Within an entry, risks follow detector execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisResult {
    entries: Vec<(String, Vec<Risk>)>,
    index: HashMap<String, usize>,
}

impl AnalysisResult {
    fn entry(&mut self, requirement_id: &str) -> &mut Vec<Risk> {
        let position = match self.index.get(requirement_id) {
            Some(position) => *position,
            None => {
                self.entries.push((requirement_id.to_string(), Vec::new()));
                let position = self.entries.len() - 1;
                self.index.insert(requirement_id.to_string(), position);
                position
            }
        };
        &mut self.entries[position].1
    }

    /// The risks of one requirement, or `None` if it was not analysed.
    #[must_use]
    pub fn get(&self, requirement_id: &str) -> Option<&[Risk]> {
        self.index
            .get(requirement_id)
            .map(|position| self.entries[*position].1.as_slice())
    }

    /// Requirement ids with their risks, in input order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Risk])> {
        self.entries
            .iter()
            .map(|(id, risks)| (id.as_str(), risks.as_slice()))
    }

    /// Every risk, grouped by requirement.
    pub fn risks(&self) -> impl Iterator<Item = &Risk> {
        self.entries.iter().flat_map(|(_, risks)| risks)
    }

    /// The number of requirements with an entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no requirement was analysed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The total number of risks.
    #[must_use]
    pub fn total_risks(&self) -> usize {
        self.entries.iter().map(|(_, risks)| risks.len()).sum()
    }

    /// The number of risks at or above `severity`.
    #[must_use]
    pub fn count_at_least(&self, severity: SeverityLevel) -> usize {
        self.risks().filter(|risk| risk.severity() >= severity).count()
    }

    /// Run `filter` over the risks of every entry and return how many risks
    /// it removed. Entries stay even when all of their risks are dropped.
    pub fn apply_filter(&mut self, filter: &(impl RiskFilter + ?Sized)) -> usize {
        let mut removed = 0;
        for (_, risks) in &mut self.entries {
            let before = risks.len();
            *risks = filter.filter(std::mem::take(risks));
            removed += before.saturating_sub(risks.len());
        }
        removed
    }

    /// Append risks to the entries of their requirements.
    ///
    /// Risks for requirements without an entry are dropped.
    fn append(&mut self, risks: Vec<Risk>) {
        for risk in risks {
            match self.index.get(risk.requirement_id()) {
                Some(position) => self.entries[*position].1.push(risk),
                None => tracing::warn!(
                    risk = risk.id(),
                    requirement = risk.requirement_id(),
                    "dropping risk for a requirement outside the analysed set"
                ),
            }
        }
    }
}

impl Serialize for AnalysisResult {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, risks) in &self.entries {
            map.serialize_entry(id, risks)?;
        }
        map.end()
    }
}

/// Runs a fixed list of detectors over requirement sets.
pub struct Analyzer {
    detectors: Vec<Box<dyn Detector>>,
    failures: Box<dyn FailureHandler>,
}

impl fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyzer")
            .field(
                "detectors",
                &self.detectors.iter().map(|d| d.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl Analyzer {
    /// An analyzer running `detectors` in the given order, logging failures.
    #[must_use]
    pub fn new(detectors: Vec<Box<dyn Detector>>) -> Self {
        Self {
            detectors,
            failures: Box::new(LogAndSkip),
        }
    }

    /// An analyzer running every detector the rule document enables, in
    /// registry order.
    ///
    /// # Errors
    ///
    /// Propagates detector construction errors.
    pub fn from_rules(
        rules: &RuleDocument,
        registry: &DetectorRegistry,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self::new(registry.create_enabled(rules)?))
    }

    /// Replace the failure policy.
    #[must_use]
    pub fn with_failure_handler(mut self, handler: impl FailureHandler + 'static) -> Self {
        self.failures = Box::new(handler);
        self
    }

    /// The detectors, in execution order.
    pub fn detectors(&self) -> impl Iterator<Item = &dyn Detector> {
        self.detectors.iter().map(AsRef::as_ref)
    }

    fn run_detector(
        &self,
        detector: &dyn Detector,
        requirement: &Requirement,
        risks: &mut RiskFactory,
    ) -> Vec<Risk> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            detector.detect_risks(requirement, risks)
        }));
        let failure = match outcome {
            Ok(Ok(found)) => match misattribution(detector, requirement, &found) {
                None => return found,
                Some(failure) => failure,
            },
            Ok(Err(error)) => DetectorFailure::Error(error),
            Err(payload) => DetectorFailure::Panicked(panic_message(payload.as_ref())),
        };
        self.failures.handle(detector.name(), requirement, &failure);
        Vec::new()
    }

    fn analyze_requirement(&self, requirement: &Requirement, risks: &mut RiskFactory) -> Vec<Risk> {
        self.detectors
            .iter()
            .flat_map(|detector| self.run_detector(detector.as_ref(), requirement, risks))
            .collect()
    }

    /// Run every detector on every requirement, sequentially.
    #[instrument(level = "debug", skip_all, fields(requirements = requirements.len()))]
    pub fn analyze(&self, requirements: &[Requirement], risks: &mut RiskFactory) -> AnalysisResult {
        let mut result = AnalysisResult::default();
        for requirement in requirements {
            let found = self.analyze_requirement(requirement, risks);
            result.entry(requirement.id()).extend(found);
        }
        tracing::debug!(risks = result.total_risks(), "analysis finished");
        result
    }

    /// Run every detector on every requirement, fanning out over
    /// requirements.
    ///
    /// Each worker mints identifiers from a generator scoped to its
    /// requirement, so the result is identical to [`Analyzer::analyze`].
    /// Requirement sets with repeated ids are analysed sequentially.
    #[instrument(level = "debug", skip_all, fields(requirements = requirements.len()))]
    pub fn analyze_parallel(
        &self,
        requirements: &[Requirement],
        risks: &mut RiskFactory,
    ) -> AnalysisResult {
        let mut seen = HashSet::new();
        if !requirements.iter().all(|requirement| seen.insert(requirement.id())) {
            tracing::debug!("requirement ids repeat, analysing sequentially");
            return self.analyze(requirements, risks);
        }

        let ids = risks.ids();
        let outcomes: Vec<_> = requirements
            .par_iter()
            .map(|requirement| {
                let mut scoped = RiskFactory::new(ids.scoped(requirement.id()));
                let found = self.analyze_requirement(requirement, &mut scoped);
                (found, scoped.into_ids())
            })
            .collect();

        let mut result = AnalysisResult::default();
        for (requirement, (found, scoped)) in requirements.iter().zip(outcomes) {
            risks.ids_mut().absorb(scoped);
            result.entry(requirement.id()).extend(found);
        }
        tracing::debug!(risks = result.total_risks(), "analysis finished");
        result
    }

    /// Run a set-level detector and append its risks to `result`, under the
    /// same failure policy as per-requirement detectors.
    ///
    /// A failure is reported against the first requirement of the set.
    #[instrument(level = "debug", skip_all, fields(detector = detector.name()))]
    pub fn run_set_detector(
        &self,
        detector: &dyn SetDetector,
        requirements: &[Requirement],
        risks: &mut RiskFactory,
        result: &mut AnalysisResult,
    ) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            detector.detect_across(requirements, risks)
        }));
        let failure = match outcome {
            Ok(Ok(found)) => {
                result.append(found);
                return;
            }
            Ok(Err(error)) => DetectorFailure::Error(error),
            Err(payload) => DetectorFailure::Panicked(panic_message(payload.as_ref())),
        };
        if let Some(first) = requirements.first() {
            self.failures.handle(detector.name(), first, &failure);
        }
    }
}

/// The first risk in `found` that is not about `requirement` or not in the
/// detector's category.
fn misattribution(
    detector: &dyn Detector,
    requirement: &Requirement,
    found: &[Risk],
) -> Option<DetectorFailure> {
    found.iter().find_map(|risk| {
        let reason = if risk.requirement_id() != requirement.id() {
            format!(
                "reported against {} while analysing {}",
                risk.requirement_id(),
                requirement.id()
            )
        } else if risk.category() != detector.category() {
            format!(
                "category {} differs from the detector's {}",
                risk.category(),
                detector.category()
            )
        } else {
            return None;
        };
        Some(DetectorFailure::Misattributed {
            risk: risk.id().to_string(),
            reason,
        })
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
