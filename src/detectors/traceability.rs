use std::sync::LazyLock;

use regex::Regex;
use tracing::instrument;

use super::{Detector, DetectorContext, DetectorError, Finding};
use crate::{
    Requirement, Risk, RiskCategory, RiskFactory, SeverityLevel,
    rules::{ConfigurationError, RuleDocument},
};

/// Identifier styles: `R001`, `REQ-12`, `US-3`, `FR-001`, `ABC-123`.
static REQUIREMENT_IDS: LazyLock<[Regex; 5]> = LazyLock::new(|| {
    [
        r"\bR\d{3,}\b",
        r"\bREQ-\d+\b",
        r"\bUS-\d+\b",
        r"\bFR-\d+\b",
        r"\b[A-Z]{2,}-\d+\b",
    ]
    .map(|pattern| Regex::new(pattern).expect("pattern is valid"))
});

const LIST_MARKERS: [&str; 4] = ["- ", "* ", "1. ", "2. "];

const CRITERIA_WORDS: [&str; 6] = ["given", "when", "then", "acceptance", "criteria", "ac:"];

/// Severity of each individual gap once at least one signal is present.
const PARTIAL_SEVERITY: SeverityLevel = SeverityLevel::Medium;

/// Flags requirements that cannot be traced to an identifier, acceptance
/// criteria or a test.
///
/// Three signals are checked: an identifier in the text, acceptance criteria
/// (`missing_acceptance_criteria` keywords, or a list marker together with a
/// criteria word), and a test reference (`missing_test_reference` keywords).
/// With no signal at all a single risk is raised at the configured severity;
/// otherwise each missing signal raises its own risk at `medium`.
#[derive(Debug, Clone)]
pub struct TraceabilityDetector {
    context: DetectorContext,
}

impl TraceabilityDetector {
    /// Build the detector from its rule block.
    ///
    /// # Errors
    ///
    /// Fails if the `traceability` block is disabled or absent.
    pub fn new(rules: &RuleDocument) -> Result<Self, ConfigurationError> {
        Ok(Self {
            context: DetectorContext::new(rules, RiskCategory::Traceability)?,
        })
    }

    fn has_keyword(&self, text: &str, rule: &str) -> bool {
        self.context
            .rule(rule)
            .is_some_and(|rule| self.context.contains_any(text, &rule.keywords))
    }

    fn has_acceptance_criteria(&self, text: &str) -> bool {
        if self.has_keyword(text, "missing_acceptance_criteria") {
            return true;
        }
        let normalized = self.context.normalize(text);
        LIST_MARKERS.iter().any(|marker| text.contains(marker))
            && CRITERIA_WORDS.iter().any(|word| normalized.contains(word))
    }
}

fn has_requirement_id(text: &str) -> bool {
    REQUIREMENT_IDS.iter().any(|pattern| pattern.is_match(text))
}

impl Detector for TraceabilityDetector {
    fn name(&self) -> &'static str {
        "Traceability Detector"
    }

    fn category(&self) -> RiskCategory {
        RiskCategory::Traceability
    }

    #[instrument(level = "trace", skip_all, fields(requirement = requirement.id()))]
    fn detect_risks(
        &self,
        requirement: &Requirement,
        risks: &mut RiskFactory,
    ) -> Result<Vec<Risk>, DetectorError> {
        let text = requirement.text();
        let has_id = has_requirement_id(text);
        let has_criteria = self.has_acceptance_criteria(text);
        let has_test = self.has_keyword(text, "missing_test_reference");

        if !(has_id || has_criteria || has_test) {
            let finding = Finding::new(
                "No traceability signals found (ID, acceptance criteria, or test reference)",
                text,
            )
            .suggestion("Add a stable identifier, acceptance criteria, and a test reference");
            return Ok(vec![self.context.risk(risks, requirement, finding)?]);
        }

        let mut findings = Vec::new();
        if !has_id {
            findings.push(
                Finding::new("Missing requirement ID (e.g., R001, REQ-123, ABC-123)", text)
                    .severity(PARTIAL_SEVERITY)
                    .suggestion("Add a stable identifier (R###, REQ-#, US-#, FR-#, or ABC-123)"),
            );
        }
        if !has_criteria {
            findings.push(
                Finding::new(
                    "Missing acceptance criteria (e.g., Given/When/Then or 'Acceptance Criteria')",
                    text,
                )
                .severity(PARTIAL_SEVERITY)
                .suggestion("Add AC with Given/When/Then or a short checklist under the requirement"),
            );
        }
        if !has_test {
            findings.push(
                Finding::new(
                    "Missing test reference (e.g., TC-123, 'Test Case', 'validated by QA')",
                    text,
                )
                .severity(PARTIAL_SEVERITY)
                .suggestion("Reference a test artifact (TC-###) or note how it will be verified"),
            );
        }
        self.context.risks(risks, requirement, findings)
    }
}
