use std::{borrow::Cow, collections::HashMap};

use regex::{Regex, RegexBuilder};

use super::DetectorError;
use crate::{
    Requirement, Risk, RiskCategory, RiskFactory, SeverityLevel, ValidationError,
    rules::{ConfigurationError, DetectorConfig, RuleDefinition, RuleDocument},
};

/// Helpers shared by every detector, scoped to one category's rule block.
#[derive(Debug, Clone)]
pub struct DetectorContext {
    category: RiskCategory,
    config: DetectorConfig,
    case_sensitive: bool,
    matchers: HashMap<String, Regex>,
}

impl DetectorContext {
    /// Resolve the rule block for `category` and compile a matcher for every
    /// keyword, trigger and required phrase it holds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::DetectorDisabled`] if the block is absent
    /// or disabled, and [`ConfigurationError::Invalid`] if a phrase cannot be
    /// compiled.
    pub fn new(rules: &RuleDocument, category: RiskCategory) -> Result<Self, ConfigurationError> {
        let config = rules
            .detector(category)
            .filter(|config| config.enabled)
            .ok_or(ConfigurationError::DetectorDisabled(category))?;
        let case_sensitive = rules.global_settings().case_sensitive;

        let mut matchers = HashMap::new();
        for (rule_name, rule) in &config.rules {
            for phrase in rule.keywords.iter().chain(&rule.triggers).chain(&rule.required_with) {
                if matchers.contains_key(phrase) {
                    continue;
                }
                let matcher = phrase_matcher(phrase, case_sensitive).map_err(|e| {
                    ConfigurationError::Invalid {
                        field: format!("detectors.{category}.rules.{rule_name}"),
                        reason: format!("cannot match '{phrase}': {e}"),
                    }
                })?;
                matchers.insert(phrase.clone(), matcher);
            }
        }

        Ok(Self {
            category,
            config: config.clone(),
            case_sensitive,
            matchers,
        })
    }

    /// The category this context is scoped to.
    #[must_use]
    pub const fn category(&self) -> RiskCategory {
        self.category
    }

    /// The configured default severity.
    #[must_use]
    pub const fn severity(&self) -> SeverityLevel {
        self.config.severity
    }

    /// A named rule of this detector's block.
    #[must_use]
    pub fn rule(&self, name: &str) -> Option<&RuleDefinition> {
        self.config.rule(name)
    }

    fn fold<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if self.case_sensitive {
            Cow::Borrowed(text)
        } else {
            Cow::Owned(text.to_lowercase())
        }
    }

    /// Case-fold (unless matching is case-sensitive) and trim.
    #[must_use]
    pub fn normalize(&self, text: &str) -> String {
        self.fold(text).trim().to_string()
    }

    fn matches(&self, text: &str, phrase: &str) -> bool {
        match self.matchers.get(phrase) {
            Some(matcher) => matcher.is_match(text),
            None => phrase_matcher(phrase, self.case_sensitive)
                .is_ok_and(|matcher| matcher.is_match(text)),
        }
    }

    /// The keywords contained in `text`, as written in the rule document and
    /// in rule order.
    ///
    /// A keyword matches as a whole word or phrase: "may" matches "users may,"
    /// and "users may." but not "mayor".
    #[must_use]
    pub fn find_keywords<'k>(&self, text: &str, keywords: &'k [String]) -> Vec<&'k str> {
        keywords
            .iter()
            .filter(|keyword| self.matches(text, keyword))
            .map(String::as_str)
            .collect()
    }

    /// Whether `text` contains at least one of `phrases`, matched like
    /// [`find_keywords`](Self::find_keywords).
    #[must_use]
    pub fn contains_any(&self, text: &str, phrases: &[String]) -> bool {
        phrases.iter().any(|phrase| self.matches(text, phrase))
    }

    /// The triggers of a trigger-without-required rule that fire on `text`.
    ///
    /// Empty when the rule is absent, no trigger matches, or any
    /// `required_with` phrase is present.
    #[must_use]
    pub fn uncovered_triggers<'r>(&'r self, text: &str, rule_name: &str) -> Vec<&'r str> {
        let Some(rule) = self.rule(rule_name) else {
            return Vec::new();
        };
        let triggers = self.find_keywords(text, &rule.triggers);
        if triggers.is_empty() || self.contains_any(text, &rule.required_with) {
            return Vec::new();
        }
        triggers
    }

    /// Build a risk for `requirement` in this context's category.
    ///
    /// The severity defaults to the configured severity.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the description or evidence are empty.
    pub fn risk(
        &self,
        risks: &mut RiskFactory,
        requirement: &Requirement,
        finding: Finding,
    ) -> Result<Risk, ValidationError> {
        risks.create(
            requirement,
            self.category,
            finding.severity.unwrap_or(self.config.severity),
            finding.description,
            finding.evidence,
            finding.suggestion,
        )
    }

    /// Build one risk per finding, in order.
    ///
    /// # Errors
    ///
    /// Returns a [`DetectorError`] for the first invalid finding.
    pub fn risks(
        &self,
        risks: &mut RiskFactory,
        requirement: &Requirement,
        findings: Vec<Finding>,
    ) -> Result<Vec<Risk>, DetectorError> {
        findings
            .into_iter()
            .map(|finding| {
                self.risk(risks, requirement, finding)
                    .map_err(DetectorError::from)
            })
            .collect()
    }
}

/// A matcher for `phrase` that only accepts whole words at its edges.
///
/// Surrounding whitespace is ignored. Word boundaries are only required on an
/// edge that is itself a word character, so `"etc."` needs nothing after its
/// dot and `"%"` matches in `"99.9%"`.
fn phrase_matcher(phrase: &str, case_sensitive: bool) -> Result<Regex, regex::Error> {
    let phrase = phrase.trim();
    let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');

    let mut pattern = String::with_capacity(phrase.len() + 4);
    if is_word(phrase.chars().next()) {
        pattern.push_str(r"\b");
    }
    pattern.push_str(&regex::escape(phrase));
    if is_word(phrase.chars().next_back()) {
        pattern.push_str(r"\b");
    }

    RegexBuilder::new(&pattern)
        .case_insensitive(!case_sensitive)
        .build()
}

/// What a detector found, before it becomes a [`Risk`].
#[derive(Debug, Clone)]
pub struct Finding {
    description: String,
    evidence: String,
    severity: Option<SeverityLevel>,
    suggestion: Option<String>,
}

impl Finding {
    /// A finding at the detector's default severity, with no suggestion.
    pub fn new(description: impl Into<String>, evidence: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            evidence: evidence.into(),
            severity: None,
            suggestion: None,
        }
    }

    /// Override the severity.
    #[must_use]
    pub const fn severity(mut self, severity: SeverityLevel) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Attach a remediation hint.
    #[must_use]
    pub fn suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}
