//! Narrowing an analysis down to the risks worth reporting.
//!
//! A [`RiskFilter`] receives the risks of one requirement and returns the ones
//! it keeps, in their original order. Filters compose into a [`FilterChain`],
//! where each filter only sees what the filters before it kept.
//! [`AnalysisResult::apply_filter`](crate::AnalysisResult::apply_filter) runs a
//! filter over every entry of a result.

use std::{
    collections::{BTreeSet, HashSet},
    fmt,
};

use crate::{Risk, RiskCategory, SeverityLevel};

/// Decides which risks of a requirement are kept.
pub trait RiskFilter: Send + Sync {
    /// The risks to keep, in their original order.
    fn filter(&self, risks: Vec<Risk>) -> Vec<Risk>;
}

/// Drops risks below a minimum severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeverityThreshold {
    min: SeverityLevel,
}

impl SeverityThreshold {
    /// Keep risks at `min` or above.
    #[must_use]
    pub const fn new(min: SeverityLevel) -> Self {
        Self { min }
    }

    /// The lowest severity kept.
    #[must_use]
    pub const fn min(&self) -> SeverityLevel {
        self.min
    }
}

impl RiskFilter for SeverityThreshold {
    fn filter(&self, mut risks: Vec<Risk>) -> Vec<Risk> {
        risks.retain(|risk| risk.severity() >= self.min);
        risks
    }
}

/// Keeps risks by category.
///
/// An empty include set admits every category. Excluded categories are
/// dropped even if they are also included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryFilter {
    include: BTreeSet<RiskCategory>,
    exclude: BTreeSet<RiskCategory>,
}

impl CategoryFilter {
    /// Only admit `categories` (in addition to any already included).
    #[must_use]
    pub fn include(mut self, categories: impl IntoIterator<Item = RiskCategory>) -> Self {
        self.include.extend(categories);
        self
    }

    /// Never admit `categories`.
    #[must_use]
    pub fn exclude(mut self, categories: impl IntoIterator<Item = RiskCategory>) -> Self {
        self.exclude.extend(categories);
        self
    }

    /// Whether risks of `category` pass.
    #[must_use]
    pub fn admits(&self, category: RiskCategory) -> bool {
        (self.include.is_empty() || self.include.contains(&category))
            && !self.exclude.contains(&category)
    }

    /// Whether the filter admits every category.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

impl RiskFilter for CategoryFilter {
    fn filter(&self, mut risks: Vec<Risk>) -> Vec<Risk> {
        risks.retain(|risk| self.admits(risk.category()));
        risks
    }
}

/// Drops risks that repeat the requirement, category and evidence of an
/// earlier risk. The first occurrence is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DuplicateRiskFilter;

impl DuplicateRiskFilter {
    /// What two risks must share to count as duplicates.
    #[must_use]
    pub fn key(risk: &Risk) -> (&str, RiskCategory, &str) {
        (risk.requirement_id(), risk.category(), risk.evidence())
    }
}

impl RiskFilter for DuplicateRiskFilter {
    fn filter(&self, risks: Vec<Risk>) -> Vec<Risk> {
        let keep: Vec<bool> = {
            let mut seen = HashSet::new();
            risks.iter().map(|risk| seen.insert(Self::key(risk))).collect()
        };
        risks
            .into_iter()
            .zip(keep)
            .filter_map(|(risk, keep)| keep.then_some(risk))
            .collect()
    }
}

/// Filters applied one after another.
///
/// An empty chain keeps every risk.
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn RiskFilter>>,
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl FilterChain {
    /// A chain with no filters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `filter` to the end of the chain.
    #[must_use]
    pub fn with(mut self, filter: impl RiskFilter + 'static) -> Self {
        self.push(filter);
        self
    }

    /// Append `filter` to the end of the chain.
    pub fn push(&mut self, filter: impl RiskFilter + 'static) {
        self.filters.push(Box::new(filter));
    }

    /// The number of filters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Whether the chain has no filters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl RiskFilter for FilterChain {
    fn filter(&self, risks: Vec<Risk>) -> Vec<Risk> {
        self.filters
            .iter()
            .fold(risks, |risks, filter| filter.filter(risks))
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::{
        Requirement, RiskFactory,
        analyzer::Analyzer,
        detectors::{AmbiguityDetector, SecurityDetector},
        rules::{BuiltinRuleSource, RuleSource},
    };

    fn requirement(id: &str) -> Requirement {
        Requirement::new(id, 1, "Admin users should delete records").unwrap()
    }

    /// One risk per `(requirement, category, severity, evidence)`, minted in order.
    fn risks(specs: &[(&str, RiskCategory, SeverityLevel, &str)]) -> Vec<Risk> {
        let mut factory = RiskFactory::default();
        specs
            .iter()
            .map(|(id, category, severity, evidence)| {
                factory
                    .create(&requirement(id), *category, *severity, "risk", *evidence, None)
                    .unwrap()
            })
            .collect()
    }

    fn ids(risks: &[Risk]) -> Vec<&str> {
        risks.iter().map(Risk::id).collect()
    }

    fn mixed() -> Vec<Risk> {
        risks(&[
            ("R001", RiskCategory::Ambiguity, SeverityLevel::Low, "should"),
            ("R001", RiskCategory::Security, SeverityLevel::High, "admin"),
            ("R001", RiskCategory::Ambiguity, SeverityLevel::Medium, "many"),
            ("R001", RiskCategory::Scope, SeverityLevel::Blocker, "unlimited"),
        ])
    }

    #[test_case(SeverityLevel::Low, 4; "low keeps everything")]
    #[test_case(SeverityLevel::Medium, 3; "medium")]
    #[test_case(SeverityLevel::High, 2; "high")]
    #[test_case(SeverityLevel::Blocker, 1; "blocker")]
    fn severity_threshold_is_inclusive(min: SeverityLevel, kept: usize) {
        let kept_risks = SeverityThreshold::new(min).filter(mixed());
        assert_eq!(kept_risks.len(), kept);
        assert!(kept_risks.iter().all(|risk| risk.severity() >= min));
    }

    #[test_case(&[], &[], &["R001-AMB-001", "R001-SEC-001", "R001-AMB-002", "R001-SCO-001"]; "unrestricted")]
    #[test_case(&[RiskCategory::Ambiguity], &[], &["R001-AMB-001", "R001-AMB-002"]; "include")]
    #[test_case(&[], &[RiskCategory::Ambiguity], &["R001-SEC-001", "R001-SCO-001"]; "exclude")]
    #[test_case(
        &[RiskCategory::Ambiguity, RiskCategory::Security],
        &[RiskCategory::Ambiguity],
        &["R001-SEC-001"];
        "exclude wins over include"
    )]
    fn category_filter(include: &[RiskCategory], exclude: &[RiskCategory], expected: &[&str]) {
        let filter = CategoryFilter::default()
            .include(include.iter().copied())
            .exclude(exclude.iter().copied());
        assert_eq!(filter.is_unrestricted(), include.is_empty() && exclude.is_empty());
        assert_eq!(ids(&filter.filter(mixed())), expected);
    }

    #[test]
    fn duplicates_share_requirement_category_and_evidence() {
        let risks = risks(&[
            ("R001", RiskCategory::Ambiguity, SeverityLevel::Low, "should"),
            ("R001", RiskCategory::Ambiguity, SeverityLevel::High, "should"),
            ("R001", RiskCategory::Ambiguity, SeverityLevel::Low, "might"),
            ("R001", RiskCategory::Scope, SeverityLevel::Low, "should"),
            ("R002", RiskCategory::Ambiguity, SeverityLevel::Low, "should"),
        ]);
        assert_eq!(
            DuplicateRiskFilter::key(&risks[0]),
            DuplicateRiskFilter::key(&risks[1])
        );

        let kept = DuplicateRiskFilter.filter(risks);
        assert_eq!(
            ids(&kept),
            vec!["R001-AMB-001", "R001-AMB-003", "R001-SCO-001", "R002-AMB-001"]
        );
    }

    #[test]
    fn chain_applies_filters_in_order() {
        let chain = FilterChain::new()
            .with(SeverityThreshold::new(SeverityLevel::Medium))
            .with(CategoryFilter::default().include([RiskCategory::Security]));
        assert_eq!(chain.len(), 2);
        assert_eq!(ids(&chain.filter(mixed())), vec!["R001-SEC-001"]);
    }

    #[test]
    fn empty_chain_keeps_everything() {
        let chain = FilterChain::new();
        assert!(chain.is_empty());
        assert_eq!(chain.filter(mixed()), mixed());
    }

    #[test]
    fn filtering_a_result_keeps_every_entry() {
        let rules = BuiltinRuleSource.load().unwrap();
        let analyzer = Analyzer::new(vec![
            Box::new(AmbiguityDetector::new(&rules).unwrap()),
            Box::new(SecurityDetector::new(&rules).unwrap()),
        ]);
        let requirements = vec![
            Requirement::new("R001", 1, "Admin users should delete records").unwrap(),
            Requirement::new("R002", 2, "Users should see several reports").unwrap(),
        ];
        let mut result = analyzer.analyze(&requirements, &mut RiskFactory::default());
        let before = result.total_risks();

        let removed = result.apply_filter(&SeverityThreshold::new(SeverityLevel::High));

        assert_eq!(result.len(), 2);
        assert_eq!(removed, before - result.total_risks());
        assert!(result.get("R002").unwrap().is_empty());
        let r001: Vec<RiskCategory> = result.get("R001").unwrap().iter().map(Risk::category).collect();
        assert_eq!(r001, vec![RiskCategory::Security]);
    }
}
