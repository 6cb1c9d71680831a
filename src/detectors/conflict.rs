use rayon::prelude::*;
use tracing::instrument;

use super::{Detector, DetectorContext, DetectorError, Finding, SetDetector, similarity};
use crate::{
    Requirement, Risk, RiskCategory, RiskFactory,
    rules::{ConfigurationError, RuleDocument},
};

const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;

/// Characters of the duplicate's text quoted as evidence.
const EVIDENCE_PREVIEW: usize = 50;

/// Flags contradictions, competing priorities and duplicated requirements.
///
/// Per requirement:
///
/// - `contradictory_terms` (`pairs`): both members of a pair appear. A term
///   that only occurs inside its longer partner ("must" in "must not") does
///   not count.
/// - `conflicting_priorities` (`keywords`): more than one urgency keyword.
///
/// Across the set ([`SetDetector`]):
///
/// - `duplicate_requirements` (`similarity_threshold`): pairs of requirements
///   at least this similar. The risk is raised against the earlier one.
#[derive(Debug, Clone)]
pub struct ConflictDetector {
    context: DetectorContext,
    threshold: f64,
    scan_limit: Option<usize>,
}

impl ConflictDetector {
    /// Build the detector from its rule block.
    ///
    /// # Errors
    ///
    /// Fails if the `conflict` block is disabled or absent.
    pub fn new(rules: &RuleDocument) -> Result<Self, ConfigurationError> {
        let context = DetectorContext::new(rules, RiskCategory::Conflict)?;
        let threshold = context
            .rule("duplicate_requirements")
            .and_then(|rule| rule.similarity_threshold)
            .unwrap_or(DEFAULT_SIMILARITY_THRESHOLD);
        Ok(Self {
            context,
            threshold,
            scan_limit: rules.global_settings().duplicate_scan_limit,
        })
    }

    /// The similarity at or above which two requirements are duplicates.
    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Similarity of two requirement texts after normalization.
    #[must_use]
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        similarity::ratio(&self.context.normalize(a), &self.context.normalize(b))
    }

    fn contradictions(&self, text: &str, findings: &mut Vec<Finding>) {
        let Some(rule) = self.context.rule("contradictory_terms") else {
            return;
        };
        let normalized = self.context.normalize(text);
        for (first, second) in &rule.pairs {
            let a = self.context.normalize(first);
            let b = self.context.normalize(second);
            if contains_term(&normalized, &a, &b) && contains_term(&normalized, &b, &a) {
                findings.push(
                    Finding::new(
                        format!("Contradictory terms found: '{first}' and '{second}'"),
                        format!("'{first}' and '{second}'"),
                    )
                    .suggestion(format!(
                        "Clarify the requirement - it cannot both {first} and {second}"
                    )),
                );
            }
        }
    }

    fn priorities(&self, text: &str, findings: &mut Vec<Finding>) {
        let Some(rule) = self.context.rule("conflicting_priorities") else {
            return;
        };
        let found = self.context.find_keywords(text, &rule.keywords);
        if found.len() > 1 {
            let terms = found.join(", ");
            findings.push(
                Finding::new(format!("Multiple urgent priority terms found: {terms}"), terms)
                    .suggestion(
                        "Clarify the actual priority level - multiple urgent terms may indicate confusion",
                    ),
            );
        }
    }
}

/// Whether `term` occurs in `text` other than as part of `partner`.
fn contains_term(text: &str, term: &str, partner: &str) -> bool {
    if partner.len() > term.len() && partner.contains(term) {
        text.replace(partner, "\u{0}").contains(term)
    } else {
        text.contains(term)
    }
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(EVIDENCE_PREVIEW).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

impl Detector for ConflictDetector {
    fn name(&self) -> &'static str {
        "Conflict Detector"
    }

    fn category(&self) -> RiskCategory {
        RiskCategory::Conflict
    }

    #[instrument(level = "trace", skip_all, fields(requirement = requirement.id()))]
    fn detect_risks(
        &self,
        requirement: &Requirement,
        risks: &mut RiskFactory,
    ) -> Result<Vec<Risk>, DetectorError> {
        let mut findings = Vec::new();
        self.contradictions(requirement.text(), &mut findings);
        self.priorities(requirement.text(), &mut findings);
        self.context.risks(risks, requirement, findings)
    }
}

impl SetDetector for ConflictDetector {
    fn name(&self) -> &'static str {
        "Duplicate Detector"
    }

    /// Compare every pair of requirements.
    ///
    /// Pairs are scored in parallel; risks are minted afterwards in input
    /// order so identifiers are stable. When `duplicate_scan_limit` is set,
    /// only the first that many requirements are scanned.
    #[instrument(level = "debug", skip_all, fields(requirements = requirements.len()))]
    fn detect_across(
        &self,
        requirements: &[Requirement],
        risks: &mut RiskFactory,
    ) -> Result<Vec<Risk>, DetectorError> {
        let scanned = match self.scan_limit {
            Some(limit) if requirements.len() > limit => {
                tracing::warn!(
                    requirements = requirements.len(),
                    limit,
                    "duplicate scan truncated by duplicate_scan_limit"
                );
                &requirements[..limit]
            }
            _ => requirements,
        };

        let texts: Vec<(String, usize)> = scanned
            .iter()
            .map(|requirement| {
                let text = self.context.normalize(requirement.text());
                let length = text.chars().count();
                (text, length)
            })
            .collect();
        let texts = &texts;
        let threshold = self.threshold;

        let mut pairs: Vec<(usize, usize, f64)> = (0..texts.len())
            .into_par_iter()
            .flat_map_iter(move |i| {
                (i + 1..texts.len()).filter_map(move |j| {
                    let ((a, a_len), (b, b_len)) = (&texts[i], &texts[j]);
                    if similarity::upper_bound(*a_len, *b_len) < threshold {
                        return None;
                    }
                    let score = similarity::ratio(a, b);
                    (score >= threshold).then_some((i, j, score))
                })
            })
            .collect();
        pairs.sort_by_key(|&(i, j, _)| (i, j));

        let findings = pairs.into_iter().map(|(i, j, score)| {
            let (first, second) = (&scanned[i], &scanned[j]);
            let finding = Finding::new(
                format!(
                    "Duplicate requirement detected - {:.1}% similar to {}",
                    score * 100.0,
                    second.id()
                ),
                format!("Similar to: {}", preview(second.text())),
            )
            .suggestion(format!(
                "Consider merging or clarifying the difference between {} and {}",
                first.id(),
                second.id()
            ));
            (first, finding)
        });

        let mut found = Vec::new();
        for (requirement, finding) in findings {
            found.push(self.context.risk(risks, requirement, finding)?);
        }
        tracing::debug!(duplicates = found.len(), "duplicate scan finished");
        Ok(found)
    }
}
