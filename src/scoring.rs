//! Severity-weighted risk scores and the "riskiest N" ranking.

use std::{cmp::Reverse, collections::BTreeMap};

use serde::Serialize;

use crate::{Requirement, Risk, SeverityLevel, analyzer::AnalysisResult, rules::RuleDocument};

/// The aggregate risk of one requirement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreRecord {
    /// Sum of the weights of every risk.
    pub total_score: u32,
    /// `total_score / risk_count`, or `0.0` without risks.
    pub avg_severity: f64,
    /// The number of risks.
    pub risk_count: usize,
}

/// A requirement together with its score, as ranked by [`Scorer::top_n`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRequirement<'a> {
    /// The ranked requirement.
    pub requirement: &'a Requirement,
    /// Its score.
    #[serde(flatten)]
    pub record: ScoreRecord,
}

/// Turns risk lists into scores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scorer {
    weights: BTreeMap<SeverityLevel, u32>,
}

impl Default for Scorer {
    /// Weighs each risk by its severity rank.
    fn default() -> Self {
        Self {
            weights: SeverityLevel::ALL
                .into_iter()
                .map(|severity| (severity, severity.rank()))
                .collect(),
        }
    }
}

impl Scorer {
    /// Weighs each risk with the document's `severity_mapping`.
    #[must_use]
    pub fn from_rules(rules: &RuleDocument) -> Self {
        let mut scorer = Self::default();
        scorer
            .weights
            .extend(rules.severity_mapping().iter().map(|(k, v)| (*k, *v)));
        scorer
    }

    /// The weight of one risk of the given severity.
    #[must_use]
    pub fn weight(&self, severity: SeverityLevel) -> u32 {
        self.weights
            .get(&severity)
            .copied()
            .unwrap_or_else(|| severity.rank())
    }

    /// Score a single risk list.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn score_risks<'a>(&self, risks: impl IntoIterator<Item = &'a Risk>) -> ScoreRecord {
        let (total_score, risk_count) = risks
            .into_iter()
            .fold((0u32, 0usize), |(total, count), risk| {
                (total.saturating_add(self.weight(risk.severity())), count + 1)
            });
        let avg_severity = if risk_count == 0 {
            0.0
        } else {
            f64::from(total_score) / risk_count as f64
        };
        ScoreRecord {
            total_score,
            avg_severity,
            risk_count,
        }
    }

    /// Score every requirement.
    ///
    /// Requirements absent from `results` score zero.
    #[must_use]
    pub fn score(
        &self,
        requirements: &[Requirement],
        results: &AnalysisResult,
    ) -> BTreeMap<String, ScoreRecord> {
        requirements
            .iter()
            .map(|requirement| {
                let record = results
                    .get(requirement.id())
                    .map(|risks| self.score_risks(risks))
                    .unwrap_or_default();
                (requirement.id().to_string(), record)
            })
            .collect()
    }

    /// The `n` riskiest requirements.
    ///
    /// Ordered by total score, then risk count (both descending), then
    /// requirement id ascending. Requirements missing from `scores` rank as
    /// zero.
    #[must_use]
    pub fn top_n<'a>(
        &self,
        requirements: &'a [Requirement],
        scores: &BTreeMap<String, ScoreRecord>,
        n: usize,
    ) -> Vec<RankedRequirement<'a>> {
        let mut ranked: Vec<RankedRequirement<'a>> = requirements
            .iter()
            .map(|requirement| RankedRequirement {
                requirement,
                record: scores.get(requirement.id()).copied().unwrap_or_default(),
            })
            .collect();
        ranked.sort_by(|a, b| {
            (Reverse(a.record.total_score), Reverse(a.record.risk_count), a.requirement.id()).cmp(&(
                Reverse(b.record.total_score),
                Reverse(b.record.risk_count),
                b.requirement.id(),
            ))
        });
        ranked.truncate(n);
        ranked
    }
}

/// [`Scorer::score`] with rank weights.
#[must_use]
pub fn score(requirements: &[Requirement], results: &AnalysisResult) -> BTreeMap<String, ScoreRecord> {
    Scorer::default().score(requirements, results)
}

/// [`Scorer::top_n`] with rank weights.
#[must_use]
pub fn top_n<'a>(
    requirements: &'a [Requirement],
    scores: &BTreeMap<String, ScoreRecord>,
    n: usize,
) -> Vec<RankedRequirement<'a>> {
    Scorer::default().top_n(requirements, scores, n)
}
