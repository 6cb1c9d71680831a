use tracing::instrument;

use super::{Detector, DetectorContext, DetectorError, Finding};
use crate::{
    Requirement, Risk, RiskCategory, RiskFactory, SeverityLevel,
    rules::{ConfigurationError, RuleDocument},
};

/// Out-of-scope terms that name an explicit boundary violation.
const ESCALATED_TERMS: [&str; 5] = [
    "any api",
    "all platforms",
    "every browser",
    "all providers",
    "support everything",
];

/// Flags scope creep and undefined system boundaries.
///
/// Rules:
///
/// - `out_of_scope_terms` (`keywords`): one risk per term; explicit boundary
///   violations such as "all platforms" are raised at `high`.
/// - `undefined_system_boundary` (`keywords`): one risk per term.
/// - `third_party_dependency_without_spec` (trigger-without-required): one
///   `high` risk with the requirement text as evidence.
#[derive(Debug, Clone)]
pub struct ScopeDetector {
    context: DetectorContext,
}

impl ScopeDetector {
    /// Build the detector from its rule block.
    ///
    /// # Errors
    ///
    /// Fails if the `scope` block is disabled or absent.
    pub fn new(rules: &RuleDocument) -> Result<Self, ConfigurationError> {
        Ok(Self {
            context: DetectorContext::new(rules, RiskCategory::Scope)?,
        })
    }

    fn keywords<'a>(&'a self, text: &str, rule: &str) -> Vec<&'a str> {
        self.context
            .rule(rule)
            .map(|rule| self.context.find_keywords(text, &rule.keywords))
            .unwrap_or_default()
    }
}

impl Detector for ScopeDetector {
    fn name(&self) -> &'static str {
        "Scope Detector"
    }

    fn category(&self) -> RiskCategory {
        RiskCategory::Scope
    }

    #[instrument(level = "trace", skip_all, fields(requirement = requirement.id()))]
    fn detect_risks(
        &self,
        requirement: &Requirement,
        risks: &mut RiskFactory,
    ) -> Result<Vec<Risk>, DetectorError> {
        let text = requirement.text();
        let mut findings = Vec::new();

        for term in self.keywords(text, "out_of_scope_terms") {
            let mut finding = Finding::new(format!("Potential scope creep term '{term}' detected"), term)
                .suggestion(
                    "Constrain scope with explicit platforms, versions, providers, or acceptance criteria",
                );
            if ESCALATED_TERMS.contains(&term.trim().to_lowercase().as_str()) {
                finding = finding.severity(SeverityLevel::High);
            }
            findings.push(finding);
        }

        for term in self.keywords(text, "undefined_system_boundary") {
            findings.push(
                Finding::new(
                    format!("External dependency '{term}' without defined boundary/constraints"),
                    term,
                )
                .suggestion("Specify interfaces, limits, SLAs, supported providers, or versions"),
            );
        }

        if !self
            .context
            .uncovered_triggers(text, "third_party_dependency_without_spec")
            .is_empty()
        {
            findings.push(
                Finding::new(
                    "Third-party integration mentioned without specifying provider, version, or protocol",
                    text,
                )
                .severity(SeverityLevel::High)
                .suggestion(
                    "Add constraints (specific provider, supported versions, protocol/contract, SLA)",
                ),
            );
        }

        self.context.risks(risks, requirement, findings)
    }
}
