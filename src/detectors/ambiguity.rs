use tracing::instrument;

use super::{Detector, DetectorContext, DetectorError, Finding};
use crate::{
    Requirement, Risk, RiskCategory, RiskFactory,
    rules::{ConfigurationError, RuleDocument},
};

/// Flags vague terms, imprecise quantifiers and weak commitment language.
///
/// Rules: `vague_terms`, `imprecise_quantifiers`, `weak_requirements`. One
/// risk is raised per matching keyword.
#[derive(Debug, Clone)]
pub struct AmbiguityDetector {
    context: DetectorContext,
}

impl AmbiguityDetector {
    /// Build the detector from its rule block.
    ///
    /// # Errors
    ///
    /// Fails if the `ambiguity` block is disabled or absent.
    pub fn new(rules: &RuleDocument) -> Result<Self, ConfigurationError> {
        Ok(Self {
            context: DetectorContext::new(rules, RiskCategory::Ambiguity)?,
        })
    }

    fn keyword_findings<'a>(
        &'a self,
        requirement: &Requirement,
        rule: &str,
    ) -> impl Iterator<Item = &'a str> {
        self.context
            .rule(rule)
            .map(|rule| self.context.find_keywords(requirement.text(), &rule.keywords))
            .unwrap_or_default()
            .into_iter()
    }
}

impl Detector for AmbiguityDetector {
    fn name(&self) -> &'static str {
        "Ambiguity Detector"
    }

    fn category(&self) -> RiskCategory {
        RiskCategory::Ambiguity
    }

    #[instrument(level = "trace", skip_all, fields(requirement = requirement.id()))]
    fn detect_risks(
        &self,
        requirement: &Requirement,
        risks: &mut RiskFactory,
    ) -> Result<Vec<Risk>, DetectorError> {
        let mut findings = Vec::new();

        for term in self.keyword_findings(requirement, "vague_terms") {
            let term = term.trim();
            findings.push(
                Finding::new(
                    format!("Vague term '{term}' found - consider using more precise language"),
                    term,
                )
                .suggestion(format!(
                    "Replace '{term}' with more specific language (e.g., 'shall', 'must', 'will')"
                )),
            );
        }

        for quantifier in self.keyword_findings(requirement, "imprecise_quantifiers") {
            let quantifier = quantifier.trim();
            findings.push(
                Finding::new(
                    format!(
                        "Imprecise quantifier '{quantifier}' found - specify exact values or criteria"
                    ),
                    quantifier,
                )
                .suggestion(format!(
                    "Replace '{quantifier}' with specific values (e.g., 'at least 5', 'within 2 seconds', '99.9% uptime')"
                )),
            );
        }

        for term in self.keyword_findings(requirement, "weak_requirements") {
            let term = term.trim();
            findings.push(
                Finding::new(
                    format!(
                        "Weak requirement language '{term}' found - requirements should be definitive"
                    ),
                    term,
                )
                .suggestion(format!(
                    "Replace '{term}' with stronger language (e.g., 'shall', 'must', 'will')"
                )),
            );
        }

        self.context.risks(risks, requirement, findings)
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::detectors::test_support::{builtin_rules, detect, evidence};

    fn detector() -> AmbiguityDetector {
        AmbiguityDetector::new(&builtin_rules()).unwrap()
    }

    #[test]
    fn should_is_reported_as_evidence() {
        let risks = detect(&detector(), "The system should allow users to login");
        assert!(risks.iter().any(|risk| risk.evidence() == "should"));
        assert!(risks.iter().all(|risk| risk.category() == RiskCategory::Ambiguity));
    }

    #[test]
    fn one_risk_per_keyword_in_rule_order() {
        let risks = detect(
            &detector(),
            "The page might load fast and should preferably show several results",
        );
        assert_eq!(
            evidence(&risks),
            vec!["should", "might", "several", "fast", "preferably"]
        );
        let ids: Vec<&str> = risks.iter().map(Risk::id).collect();
        assert_eq!(ids[0], "R001-AMB-001");
        assert_eq!(ids[4], "R001-AMB-005");
    }

    #[test_case("Users may, at their option, export reports", "may"; "before a comma")]
    #[test_case("Export of attachments is something users may.", "may"; "before a full stop")]
    #[test_case("Reports are exported for a few", "few"; "at the end")]
    #[test_case("Only some, not all, reports are archived", "some"; "quantifier before a comma")]
    fn keywords_match_next_to_punctuation(text: &str, keyword: &str) {
        assert_eq!(evidence(&detect(&detector(), text)), vec![keyword]);
    }

    #[test_case("The system shall lock accounts after 5 failed attempts"; "precise")]
    #[test_case("The mayor shall approve budgets"; "may inside a word")]
    fn precise_requirements_are_clean(text: &str) {
        assert!(detect(&detector(), text).is_empty());
    }

    #[test]
    fn descriptions_name_the_term() {
        let risks = detect(&detector(), "Ideally the export is done within 2 seconds");
        assert_eq!(risks.len(), 1);
        assert_eq!(
            risks[0].description(),
            "Weak requirement language 'ideally' found - requirements should be definitive"
        );
    }
}
