use tracing::instrument;

use super::{Detector, DetectorContext, DetectorError, Finding};
use crate::{
    Requirement, Risk, RiskCategory, RiskFactory,
    rules::{ConfigurationError, RuleDocument},
};

/// Flags always-on services that lack an uptime target.
///
/// Rule `missing_uptime_specs` (trigger-without-required). The whole
/// requirement text is the evidence.
#[derive(Debug, Clone)]
pub struct AvailabilityDetector {
    context: DetectorContext,
}

impl AvailabilityDetector {
    /// Build the detector from its rule block.
    ///
    /// # Errors
    ///
    /// Fails if the `availability` block is disabled or absent.
    pub fn new(rules: &RuleDocument) -> Result<Self, ConfigurationError> {
        Ok(Self {
            context: DetectorContext::new(rules, RiskCategory::Availability)?,
        })
    }
}

impl Detector for AvailabilityDetector {
    fn name(&self) -> &'static str {
        "Availability Detector"
    }

    fn category(&self) -> RiskCategory {
        RiskCategory::Availability
    }

    #[instrument(level = "trace", skip_all, fields(requirement = requirement.id()))]
    fn detect_risks(
        &self,
        requirement: &Requirement,
        risks: &mut RiskFactory,
    ) -> Result<Vec<Risk>, DetectorError> {
        let text = requirement.text();
        if self
            .context
            .uncovered_triggers(text, "missing_uptime_specs")
            .is_empty()
        {
            return Ok(Vec::new());
        }

        let finding = Finding::new(
            "Service mention without availability/uptime specification",
            text,
        )
        .suggestion("Specify uptime target (e.g., 99.9%), maintenance windows, or SLOs");
        Ok(vec![self.context.risk(risks, requirement, finding)?])
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::detectors::test_support::{builtin_rules, detect};

    #[test_case("The service shall be available for all users", true; "no target")]
    #[test_case("The portal shall be online 24/7", true; "always on")]
    #[test_case("The platform shall achieve 99.9% uptime", false; "uptime target")]
    #[test_case("The service shall be available with a 99.95% SLA", false; "sla")]
    #[test_case("Passwords shall be hashed", false; "unrelated")]
    fn uptime_targets(text: &str, flagged: bool) {
        let detector = AvailabilityDetector::new(&builtin_rules()).unwrap();
        let risks = detect(&detector, text);
        assert_eq!(!risks.is_empty(), flagged, "{risks:?}");
        if flagged {
            assert_eq!(risks[0].evidence(), text);
            assert_eq!(risks[0].id(), "R001-AVA-001");
        }
    }
}
