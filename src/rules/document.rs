use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use super::{ConfigurationError, Format};
use crate::{RiskCategory, SeverityLevel};

/// One named rule inside a detector block.
///
/// Each detector implements a fixed set of named rules, and each rule reads
/// only the fields of its shape:
///
/// - keyword presence reads `keywords` (or `patterns` for prefix rules)
/// - trigger-without-required reads `triggers` and `required_with`
/// - contradiction checks read `pairs`
/// - duplicate detection reads `similarity_threshold`
///
/// Loading a document rejects unknown rule names, missing fields and fields
/// the rule does not read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDefinition {
    /// Phrases whose presence raises a risk.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    /// Prefix phrases, e.g. "The system shall".
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<String>,

    /// Phrases that require one of `required_with` to also be present.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<String>,

    /// Phrases that satisfy a trigger.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_with: Vec<String>,

    /// Mutually exclusive term pairs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pairs: Vec<(String, String)>,

    /// Minimum similarity (0..=1) for two requirements to count as duplicates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_threshold: Option<f64>,

    /// Whether a keyword only counts when it lacks surrounding detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_required: Option<bool>,
}

impl RuleDefinition {
    fn validate(&self, field: &str) -> Result<(), ConfigurationError> {
        for (name, list) in [
            ("keywords", &self.keywords),
            ("patterns", &self.patterns),
            ("triggers", &self.triggers),
            ("required_with", &self.required_with),
        ] {
            if let Some(index) = list.iter().position(|entry| entry.trim().is_empty()) {
                return Err(invalid(
                    format!("{field}.{name}[{index}]"),
                    "entries cannot be empty",
                ));
            }
        }

        for (index, (left, right)) in self.pairs.iter().enumerate() {
            if left.trim().is_empty() || right.trim().is_empty() {
                return Err(invalid(
                    format!("{field}.pairs[{index}]"),
                    "both members of a pair must be non-empty",
                ));
            }
        }

        if !self.required_with.is_empty() && self.triggers.is_empty() {
            return Err(invalid(
                format!("{field}.required_with"),
                "required_with has no effect without triggers",
            ));
        }

        if let Some(threshold) = self.similarity_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(invalid(
                    format!("{field}.similarity_threshold"),
                    format!("must be between 0 and 1, got {threshold}"),
                ));
            }
        }

        Ok(())
    }

    fn present_fields(&self) -> Vec<&'static str> {
        [
            ("keywords", !self.keywords.is_empty()),
            ("patterns", !self.patterns.is_empty()),
            ("triggers", !self.triggers.is_empty()),
            ("required_with", !self.required_with.is_empty()),
            ("pairs", !self.pairs.is_empty()),
            ("similarity_threshold", self.similarity_threshold.is_some()),
            ("context_required", self.context_required.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect()
    }

    /// Check the rule against the fields `shape` reads.
    fn check_shape(
        &self,
        category: RiskCategory,
        name: &str,
        shape: RuleShape,
    ) -> Result<(), ConfigurationError> {
        let shape_error = |reason: String| ConfigurationError::RuleShape {
            detector: category,
            rule: name.to_string(),
            reason,
        };

        let present = self.present_fields();
        if let Some(missing) = shape.required().iter().find(|field| !present.contains(*field)) {
            return Err(shape_error(format!("'{missing}' is required")));
        }
        if let Some(unused) = present
            .iter()
            .find(|field| !shape.required().contains(*field) && !shape.optional().contains(*field))
        {
            return Err(shape_error(format!("'{unused}' is not read by this rule")));
        }
        Ok(())
    }
}

/// The fields a detector reads from one of its rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleShape {
    Keywords,
    ContextualKeywords,
    Patterns,
    Triggers,
    Pairs,
    Similarity,
}

impl RuleShape {
    /// Fields that must be present and non-empty.
    const fn required(self) -> &'static [&'static str] {
        match self {
            Self::Keywords | Self::ContextualKeywords => &["keywords"],
            Self::Patterns => &["patterns"],
            Self::Triggers => &["triggers", "required_with"],
            Self::Pairs => &["pairs"],
            Self::Similarity => &[],
        }
    }

    /// Fields that may be omitted.
    const fn optional(self) -> &'static [&'static str] {
        match self {
            Self::ContextualKeywords => &["context_required"],
            Self::Similarity => &["similarity_threshold"],
            Self::Keywords | Self::Patterns | Self::Triggers | Self::Pairs => &[],
        }
    }
}

/// The rules each detector implements.
const fn known_rules(category: RiskCategory) -> &'static [(&'static str, RuleShape)] {
    use RuleShape::{ContextualKeywords, Keywords, Pairs, Patterns, Similarity, Triggers};

    match category {
        RiskCategory::Ambiguity => &[
            ("vague_terms", Keywords),
            ("imprecise_quantifiers", Keywords),
            ("weak_requirements", Keywords),
        ],
        RiskCategory::MissingDetail => &[
            ("incomplete_phrases", Patterns),
            ("missing_specifications", ContextualKeywords),
            ("unspecified_actors", Keywords),
        ],
        RiskCategory::Security => &[
            ("missing_authentication", Triggers),
            ("missing_authorization", Triggers),
            ("missing_data_protection", Triggers),
            ("insecure_communication", Triggers),
        ],
        RiskCategory::Conflict => &[
            ("contradictory_terms", Pairs),
            ("conflicting_priorities", Keywords),
            ("duplicate_requirements", Similarity),
        ],
        RiskCategory::Performance => &[("missing_performance_specs", Triggers)],
        RiskCategory::Availability => &[("missing_uptime_specs", Triggers)],
        RiskCategory::Traceability => &[
            ("missing_acceptance_criteria", Keywords),
            ("missing_test_reference", Keywords),
        ],
        RiskCategory::Scope => &[
            ("out_of_scope_terms", Keywords),
            ("undefined_system_boundary", Keywords),
            ("third_party_dependency_without_spec", Triggers),
        ],
    }
}

fn rule_shape(category: RiskCategory, name: &str) -> Result<RuleShape, ConfigurationError> {
    let known = known_rules(category);
    known
        .iter()
        .find_map(|(rule, shape)| (*rule == name).then_some(*shape))
        .ok_or_else(|| ConfigurationError::UnknownRule {
            detector: category,
            rule: name.to_string(),
            expected: known
                .iter()
                .map(|(rule, _)| *rule)
                .collect::<Vec<_>>()
                .join(", "),
        })
}

/// The configuration block of one detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetectorConfig {
    /// Disabled detectors refuse to be constructed.
    #[serde(default)]
    pub enabled: bool,

    /// Default severity of risks raised by the detector.
    #[serde(default)]
    pub severity: SeverityLevel,

    /// Named rules, keyed by rule name.
    #[serde(default)]
    pub rules: BTreeMap<String, RuleDefinition>,
}

impl DetectorConfig {
    /// Look up a rule by name.
    #[must_use]
    pub fn rule(&self, name: &str) -> Option<&RuleDefinition> {
        self.rules.get(name)
    }
}

/// Settings shared by all detectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalSettings {
    /// Match keywords case-sensitively.
    #[serde(default)]
    pub case_sensitive: bool,

    /// Skip `#` and `//` comment lines when loading line-per-requirement input.
    #[serde(default = "default_true")]
    pub ignore_comments: bool,

    /// Structural units shorter than this are discarded.
    #[serde(default = "default_min_requirement_length")]
    pub min_requirement_length: usize,

    /// Cap on the number of requirements entering the pairwise duplicate scan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_scan_limit: Option<usize>,

    /// Settings without a dedicated field.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            ignore_comments: default_true(),
            min_requirement_length: default_min_requirement_length(),
            duplicate_scan_limit: None,
            extra: BTreeMap::new(),
        }
    }
}

/// Tuning constants for the requirement structure detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructureSettings {
    /// Unclassified lines longer than this may continue an open unit.
    #[serde(default = "default_continuation_min_length")]
    pub continuation_min_length: usize,

    /// Lead-ins that always mark a continuation line.
    #[serde(default = "default_lead_ins")]
    pub continuation_lead_ins: Vec<String>,

    /// Units with fewer words are discarded.
    #[serde(default = "default_min_words")]
    pub min_words: usize,

    /// User stories with fewer member lines are discarded.
    #[serde(default = "default_min_user_story_lines")]
    pub min_user_story_lines: usize,
}

impl Default for StructureSettings {
    fn default() -> Self {
        Self {
            continuation_min_length: default_continuation_min_length(),
            continuation_lead_ins: default_lead_ins(),
            min_words: default_min_words(),
            min_user_story_lines: default_min_user_story_lines(),
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_min_requirement_length() -> usize {
    10
}

const fn default_continuation_min_length() -> usize {
    10
}

fn default_lead_ins() -> Vec<String> {
    ["I want", "I need", "so that", "and ", "or ", "but "]
        .into_iter()
        .map(String::from)
        .collect()
}

const fn default_min_words() -> usize {
    3
}

const fn default_min_user_story_lines() -> usize {
    2
}

/// The document as written, before names are resolved and values validated.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRuleDocument {
    #[serde(default)]
    detectors: BTreeMap<String, DetectorConfig>,
    #[serde(default)]
    global_settings: GlobalSettings,
    #[serde(default)]
    structure: StructureSettings,
    #[serde(default)]
    severity_mapping: BTreeMap<String, i64>,
}

/// A loaded and validated rule document.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDocument {
    detectors: BTreeMap<RiskCategory, DetectorConfig>,
    global_settings: GlobalSettings,
    structure: StructureSettings,
    severity_mapping: BTreeMap<SeverityLevel, u32>,
}

impl RuleDocument {
    /// Parse and validate a document.
    ///
    /// `origin` is only used in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Parse`] for malformed input,
    /// [`ConfigurationError::UnknownRule`] or [`ConfigurationError::RuleShape`]
    /// for rules their detector does not implement as written, and
    /// [`ConfigurationError::Invalid`] for other invalid values.
    pub fn parse(text: &str, format: Format, origin: &str) -> Result<Self, ConfigurationError> {
        let parse_error = |message: String| ConfigurationError::Parse {
            origin: origin.to_string(),
            message,
        };

        let raw: RawRuleDocument = match format {
            Format::Toml => toml::from_str(text).map_err(|e| parse_error(e.to_string()))?,
            Format::Json => serde_json::from_str(text).map_err(|e| parse_error(e.to_string()))?,
            Format::Yaml => serde_yaml::from_str(text).map_err(|e| parse_error(e.to_string()))?,
        };

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawRuleDocument) -> Result<Self, ConfigurationError> {
        let mut detectors = BTreeMap::new();
        for (name, config) in raw.detectors {
            let category: RiskCategory = name.parse().map_err(|e: crate::domain::risk::UnknownName| {
                invalid(format!("detectors.{name}"), e.to_string())
            })?;
            for (rule_name, rule) in &config.rules {
                let shape = rule_shape(category, rule_name)?;
                rule.validate(&format!("detectors.{name}.rules.{rule_name}"))?;
                rule.check_shape(category, rule_name, shape)?;
            }
            detectors.insert(category, config);
        }

        if raw.global_settings.min_requirement_length == 0 {
            return Err(invalid(
                "global_settings.min_requirement_length",
                "must be at least 1",
            ));
        }
        if raw.global_settings.duplicate_scan_limit == Some(0) {
            return Err(invalid(
                "global_settings.duplicate_scan_limit",
                "must be at least 1 when set",
            ));
        }
        if let Some(index) = raw
            .structure
            .continuation_lead_ins
            .iter()
            .position(|lead_in| lead_in.is_empty())
        {
            return Err(invalid(
                format!("structure.continuation_lead_ins[{index}]"),
                "entries cannot be empty",
            ));
        }

        let mut severity_mapping: BTreeMap<SeverityLevel, u32> = SeverityLevel::ALL
            .into_iter()
            .map(|severity| (severity, severity.rank()))
            .collect();
        for (name, weight) in raw.severity_mapping {
            let field = format!("severity_mapping.{name}");
            let severity: SeverityLevel = name
                .parse()
                .map_err(|e: crate::domain::risk::UnknownName| invalid(&field, e.to_string()))?;
            let weight = u32::try_from(weight)
                .ok()
                .filter(|weight| *weight > 0)
                .ok_or_else(|| invalid(&field, format!("must be a positive integer, got {weight}")))?;
            severity_mapping.insert(severity, weight);
        }

        Ok(Self {
            detectors,
            global_settings: raw.global_settings,
            structure: raw.structure,
            severity_mapping,
        })
    }

    /// The configuration block of a detector, looked up by category name.
    ///
    /// Returns `None` for unknown or unconfigured detectors.
    #[must_use]
    pub fn detector_config(&self, name: &str) -> Option<&DetectorConfig> {
        let category: RiskCategory = name.parse().ok()?;
        self.detector(category)
    }

    /// The configuration block of a detector category.
    #[must_use]
    pub fn detector(&self, category: RiskCategory) -> Option<&DetectorConfig> {
        self.detectors.get(&category)
    }

    /// Whether the named detector is enabled. Unknown names are disabled.
    #[must_use]
    pub fn is_enabled(&self, name: &str) -> bool {
        self.detector_config(name).is_some_and(|config| config.enabled)
    }

    /// Every configured detector block, in category order.
    pub fn detectors(&self) -> impl Iterator<Item = (RiskCategory, &DetectorConfig)> {
        self.detectors.iter().map(|(category, config)| (*category, config))
    }

    /// The categories whose detectors are enabled, in category order.
    pub fn enabled_categories(&self) -> impl Iterator<Item = RiskCategory> + '_ {
        self.detectors
            .iter()
            .filter(|(_, config)| config.enabled)
            .map(|(category, _)| *category)
    }

    /// The typed global settings.
    #[must_use]
    pub const fn global_settings(&self) -> &GlobalSettings {
        &self.global_settings
    }

    /// Look up a global setting by key, falling back to `default` when the
    /// key is absent or holds a value of a different type.
    #[must_use]
    pub fn global_setting<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let settings = &self.global_settings;
        let value = match key {
            "case_sensitive" => serde_json::Value::from(settings.case_sensitive),
            "ignore_comments" => serde_json::Value::from(settings.ignore_comments),
            "min_requirement_length" => serde_json::Value::from(settings.min_requirement_length),
            "duplicate_scan_limit" => match settings.duplicate_scan_limit {
                Some(limit) => serde_json::Value::from(limit),
                None => return default,
            },
            other => match settings.extra.get(other) {
                Some(value) => value.clone(),
                None => return default,
            },
        };
        serde_json::from_value(value).unwrap_or(default)
    }

    /// Structure detector tuning.
    #[must_use]
    pub const fn structure(&self) -> &StructureSettings {
        &self.structure
    }

    /// Severity weights used for scoring. Every severity has an entry.
    #[must_use]
    pub const fn severity_mapping(&self) -> &BTreeMap<SeverityLevel, u32> {
        &self.severity_mapping
    }
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigurationError {
    ConfigurationError::Invalid {
        field: field.into(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn parse_toml(text: &str) -> Result<RuleDocument, ConfigurationError> {
        RuleDocument::parse(text, Format::Toml, "test")
    }

    fn invalid_field(error: ConfigurationError) -> String {
        match error {
            ConfigurationError::Invalid { field, .. } => field,
            other => panic!("expected an invalid-field error, got {other}"),
        }
    }

    #[test]
    fn empty_document_uses_defaults() {
        let document = parse_toml("").unwrap();
        assert_eq!(document.detectors().count(), 0);
        assert_eq!(document.global_settings(), &GlobalSettings::default());
        assert_eq!(document.structure(), &StructureSettings::default());
        assert_eq!(document.severity_mapping()[&SeverityLevel::Blocker], 5);
    }

    #[test]
    fn detector_blocks_are_keyed_by_category() {
        let document = parse_toml(
            r#"
            [detectors.ambiguity]
            enabled = true
            severity = "high"

            [detectors.ambiguity.rules.vague_terms]
            keywords = ["should", "might"]

            [detectors.scope]
            enabled = false
            "#,
        )
        .unwrap();

        assert!(document.is_enabled("ambiguity"));
        assert!(!document.is_enabled("scope"));
        assert!(!document.is_enabled("security"));
        assert!(!document.is_enabled("no_such_detector"));

        let config = document.detector_config("ambiguity").unwrap();
        assert_eq!(config.severity, SeverityLevel::High);
        assert_eq!(
            config.rule("vague_terms").unwrap().keywords,
            vec!["should".to_string(), "might".to_string()]
        );
        assert_eq!(
            document.enabled_categories().collect::<Vec<_>>(),
            vec![RiskCategory::Ambiguity]
        );
    }

    #[test]
    fn json_and_yaml_documents_parse_to_the_same_rules() {
        let json = r#"{
            "detectors": {
                "conflict": {
                    "enabled": true,
                    "severity": "medium",
                    "rules": {
                        "contradictory_terms": { "pairs": [["must", "must not"]] },
                        "duplicate_requirements": { "similarity_threshold": 0.8 }
                    }
                }
            },
            "global_settings": { "case_sensitive": false, "ignore_comments": true, "min_requirement_length": 12 },
            "severity_mapping": { "high": 7 }
        }"#;
        let yaml = r"
detectors:
  conflict:
    enabled: true
    severity: medium
    rules:
      contradictory_terms:
        pairs: [[must, must not]]
      duplicate_requirements:
        similarity_threshold: 0.8
global_settings:
  case_sensitive: false
  ignore_comments: true
  min_requirement_length: 12
severity_mapping:
  high: 7
";
        let from_json = RuleDocument::parse(json, Format::Json, "json").unwrap();
        let from_yaml = RuleDocument::parse(yaml, Format::Yaml, "yaml").unwrap();
        assert_eq!(from_json, from_yaml);
        assert_eq!(from_json.severity_mapping()[&SeverityLevel::High], 7);
        assert_eq!(from_json.severity_mapping()[&SeverityLevel::Low], 1);
        assert_eq!(from_json.global_settings().min_requirement_length, 12);
    }

    #[test]
    fn unknown_detector_is_rejected() {
        let error = parse_toml("[detectors.grammar]\nenabled = true\n").unwrap_err();
        assert_eq!(invalid_field(error), "detectors.grammar");
    }

    #[test]
    fn unknown_rule_field_is_a_parse_error() {
        let error = parse_toml(
            "[detectors.scope]\nenabled = true\n[detectors.scope.rules.x]\nkeyword = [\"a\"]\n",
        )
        .unwrap_err();
        assert!(matches!(error, ConfigurationError::Parse { .. }));
    }

    #[test]
    fn unknown_severity_is_a_parse_error() {
        let error = parse_toml("[detectors.scope]\nseverity = \"severe\"\n").unwrap_err();
        assert!(matches!(error, ConfigurationError::Parse { .. }));
    }

    #[test_case(
        "[detectors.conflict.rules.duplicate_requirements]\nsimilarity_threshold = 1.5\n",
        "detectors.conflict.rules.duplicate_requirements.similarity_threshold";
        "threshold out of range"
    )]
    #[test_case(
        "[detectors.security.rules.missing_authentication]\nrequired_with = [\"password\"]\n",
        "detectors.security.rules.missing_authentication.required_with";
        "required without triggers"
    )]
    #[test_case(
        "[detectors.ambiguity.rules.vague_terms]\nkeywords = [\"should\", \" \"]\n",
        "detectors.ambiguity.rules.vague_terms.keywords[1]";
        "blank keyword"
    )]
    #[test_case(
        "[detectors.conflict.rules.contradictory_terms]\npairs = [[\"always\", \"\"]]\n",
        "detectors.conflict.rules.contradictory_terms.pairs[0]";
        "blank pair member"
    )]
    #[test_case(
        "[global_settings]\nmin_requirement_length = 0\n",
        "global_settings.min_requirement_length";
        "zero minimum length"
    )]
    #[test_case(
        "[severity_mapping]\nhigh = 0\n",
        "severity_mapping.high";
        "zero weight"
    )]
    #[test_case(
        "[severity_mapping]\nsevere = 3\n",
        "severity_mapping.severe";
        "unknown severity weight"
    )]
    fn invalid_values_name_the_field(text: &str, field: &str) {
        assert_eq!(invalid_field(parse_toml(text).unwrap_err()), field);
    }

    #[test]
    fn misspelled_rule_name_is_rejected() {
        let error = parse_toml(
            r#"
            [detectors.security]
            enabled = true

            [detectors.security.rules.missing_authorisation]
            triggers = ["admin", "delete"]
            required_with = ["role"]
            "#,
        )
        .unwrap_err();

        match error {
            ConfigurationError::UnknownRule {
                detector,
                rule,
                expected,
            } => {
                assert_eq!(detector, RiskCategory::Security);
                assert_eq!(rule, "missing_authorisation");
                assert!(expected.contains("missing_authorization"));
            }
            other => panic!("expected an unknown-rule error, got {other}"),
        }
    }

    #[test]
    fn keywords_on_a_trigger_rule_are_rejected() {
        let error = parse_toml(
            r#"
            [detectors.security]
            enabled = true

            [detectors.security.rules.missing_authentication]
            keywords = ["login", "sign in"]
            "#,
        )
        .unwrap_err();

        assert!(matches!(
            &error,
            ConfigurationError::RuleShape { detector: RiskCategory::Security, rule, .. }
                if rule == "missing_authentication"
        ));
        assert!(error.to_string().contains("'triggers' is required"), "{error}");
    }

    #[test_case(
        "[detectors.missing_detail.rules.incomplete_phrases]\nkeywords = [\"The system shall\"]\n",
        "'patterns' is required";
        "keywords instead of patterns"
    )]
    #[test_case(
        "[detectors.conflict.rules.contradictory_terms]\nkeywords = [\"always\"]\n",
        "'pairs' is required";
        "keywords instead of pairs"
    )]
    #[test_case(
        "[detectors.performance.rules.missing_performance_specs]\ntriggers = [\"search\"]\n",
        "'required_with' is required";
        "triggers without required phrases"
    )]
    #[test_case(
        "[detectors.ambiguity.rules.vague_terms]\nkeywords = [\"should\"]\ncontext_required = true\n",
        "'context_required' is not read by this rule";
        "flag on a plain keyword rule"
    )]
    #[test_case(
        "[detectors.conflict.rules.duplicate_requirements]\nsimilarity_threshold = 0.9\nkeywords = [\"same\"]\n",
        "'keywords' is not read by this rule";
        "keywords on the duplicate rule"
    )]
    fn rule_shape_is_checked(text: &str, reason_part: &str) {
        let error = parse_toml(text).unwrap_err();
        assert!(matches!(error, ConfigurationError::RuleShape { .. }), "{error}");
        assert!(error.to_string().contains(reason_part), "{error}");
    }

    #[test]
    fn every_known_rule_shape_is_accepted() {
        let document = parse_toml(
            r#"
            [detectors.missing_detail.rules.incomplete_phrases]
            patterns = ["The system shall"]
            [detectors.missing_detail.rules.missing_specifications]
            keywords = ["handle"]
            context_required = false
            [detectors.conflict.rules.contradictory_terms]
            pairs = [["always", "never"]]
            [detectors.conflict.rules.duplicate_requirements]
            [detectors.scope.rules.third_party_dependency_without_spec]
            triggers = ["payment gateway"]
            required_with = ["provider"]
            "#,
        )
        .unwrap();
        assert_eq!(document.detectors().count(), 3);
    }

    #[test]
    fn global_setting_falls_back_to_default() {
        let document = parse_toml(
            "[global_settings]\ncase_sensitive = true\nreport_title = \"Sprint 4\"\n",
        )
        .unwrap();

        assert!(document.global_setting("case_sensitive", false));
        assert_eq!(document.global_setting("min_requirement_length", 0_usize), 10);
        assert_eq!(
            document.global_setting("report_title", String::new()),
            "Sprint 4"
        );
        assert_eq!(document.global_setting("missing", 42_u32), 42);
        // present but of the wrong type
        assert_eq!(document.global_setting("report_title", 7_u32), 7);
        assert_eq!(document.global_setting("duplicate_scan_limit", 100_usize), 100);
    }

    #[test]
    fn structure_section_overrides_tuning() {
        let document = parse_toml(
            "[structure]\ncontinuation_min_length = 20\ncontinuation_lead_ins = [\"then \"]\n",
        )
        .unwrap();
        let structure = document.structure();
        assert_eq!(structure.continuation_min_length, 20);
        assert_eq!(structure.continuation_lead_ins, vec!["then ".to_string()]);
        assert_eq!(structure.min_words, 3);
    }
}
