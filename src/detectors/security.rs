use tracing::instrument;

use super::{Detector, DetectorContext, DetectorError, Finding};
use crate::{
    Requirement, Risk, RiskCategory, RiskFactory,
    rules::{ConfigurationError, RuleDocument},
};

struct Check {
    rule: &'static str,
    description: &'static str,
    suggestion: &'static str,
}

const CHECKS: [Check; 4] = [
    Check {
        rule: "missing_authentication",
        description: "User access feature mentioned without authentication requirements",
        suggestion: "Add authentication requirements (e.g., 'users must authenticate before accessing')",
    },
    Check {
        rule: "missing_authorization",
        description: "Administrative action mentioned without authorization requirements",
        suggestion: "Add authorization requirements (e.g., 'only authorized administrators can perform this action')",
    },
    Check {
        rule: "missing_data_protection",
        description: "Data storage mentioned without protection requirements",
        suggestion: "Add data protection requirements (e.g., 'data must be encrypted', 'personal information must be protected')",
    },
    Check {
        rule: "insecure_communication",
        description: "Data transmission mentioned without security requirements",
        suggestion: "Add secure communication requirements (e.g., 'communication must use HTTPS', 'data must be encrypted in transit')",
    },
];

/// Flags security-relevant features that lack matching safeguards.
///
/// Each of the four checks is a trigger-without-required rule and raises at
/// most one risk per requirement, however many of its triggers match. The
/// evidence lists every matching trigger.
#[derive(Debug, Clone)]
pub struct SecurityDetector {
    context: DetectorContext,
}

impl SecurityDetector {
    /// Build the detector from its rule block.
    ///
    /// # Errors
    ///
    /// Fails if the `security` block is disabled or absent.
    pub fn new(rules: &RuleDocument) -> Result<Self, ConfigurationError> {
        Ok(Self {
            context: DetectorContext::new(rules, RiskCategory::Security)?,
        })
    }
}

impl Detector for SecurityDetector {
    fn name(&self) -> &'static str {
        "Security Detector"
    }

    fn category(&self) -> RiskCategory {
        RiskCategory::Security
    }

    #[instrument(level = "trace", skip_all, fields(requirement = requirement.id()))]
    fn detect_risks(
        &self,
        requirement: &Requirement,
        risks: &mut RiskFactory,
    ) -> Result<Vec<Risk>, DetectorError> {
        let findings = CHECKS
            .iter()
            .filter_map(|check| {
                let triggers = self
                    .context
                    .uncovered_triggers(requirement.text(), check.rule);
                if triggers.is_empty() {
                    return None;
                }
                let evidence = triggers
                    .iter()
                    .map(|trigger| trigger.trim())
                    .collect::<Vec<_>>()
                    .join(", ");
                Some(
                    Finding::new(format!("{} ({evidence})", check.description), evidence)
                        .suggestion(check.suggestion),
                )
            })
            .collect();

        self.context.risks(risks, requirement, findings)
    }
}
