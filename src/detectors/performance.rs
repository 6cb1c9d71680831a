use tracing::instrument;

use super::{Detector, DetectorContext, DetectorError, Finding};
use crate::{
    Requirement, Risk, RiskCategory, RiskFactory,
    rules::{ConfigurationError, RuleDocument},
};

/// Flags load-bearing features that lack a measurable performance target.
///
/// Rule `missing_performance_specs` (trigger-without-required). The whole
/// requirement text is the evidence.
#[derive(Debug, Clone)]
pub struct PerformanceDetector {
    context: DetectorContext,
}

impl PerformanceDetector {
    /// Build the detector from its rule block.
    ///
    /// # Errors
    ///
    /// Fails if the `performance` block is disabled or absent.
    pub fn new(rules: &RuleDocument) -> Result<Self, ConfigurationError> {
        Ok(Self {
            context: DetectorContext::new(rules, RiskCategory::Performance)?,
        })
    }
}

impl Detector for PerformanceDetector {
    fn name(&self) -> &'static str {
        "Performance Detector"
    }

    fn category(&self) -> RiskCategory {
        RiskCategory::Performance
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
            .uncovered_triggers(text, "missing_performance_specs")
            .is_empty()
        {
            return Ok(Vec::new());
        }

        let finding = Finding::new(
            "Performance-related feature without measurable performance specification",
            text,
        )
        .suggestion("Specify response time, throughput, or latency targets");
        Ok(vec![self.context.risk(risks, requirement, finding)?])
    }
}
