//! Grouping of raw document lines into requirement units.
//!
//! Requirement documents mix headings, separators, single-line "shall"
//! statements and multi-line user stories. [`StructureDetector`] classifies
//! each line with ordered pattern rules and folds consecutive related lines
//! into [`StructuralUnit`]s. The classifier is permissive;
//! [`StructureDetector::filter_valid`] removes the noise it lets through.

use std::{fmt, sync::LazyLock};

use regex::Regex;
use serde::Serialize;
use tracing::instrument;

use crate::rules::{RuleDocument, StructureSettings};

/// The classification of a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// A horizontal rule such as `---`.
    Separator,
    /// A markdown heading or numbered section title.
    Header,
    /// One fragment of a user story.
    UserStory(StoryPart),
    /// "The system shall ..." and similar.
    Functional,
    /// A named quality attribute, e.g. "Performance: ...".
    NonFunctional,
    /// Anything else. May continue an open unit.
    Unknown,
}

/// The three clauses of a user story.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryPart {
    /// "As a ...,"
    Role,
    /// "I want ...,"
    Goal,
    /// "so that ..."
    Benefit,
}

/// The kind of requirement a unit represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// A multi-line "As a / I want / so that" story.
    UserStory,
    /// A functional statement.
    Functional,
    /// A quality-attribute statement.
    NonFunctional,
}

impl UnitKind {
    /// The snake-case name, e.g. `user_story`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UserStory => "user_story",
            Self::Functional => "functional",
            Self::NonFunctional => "non_functional",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A group of consecutive lines that form one requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuralUnit {
    #[serde(rename = "type")]
    kind: UnitKind,
    lines: Vec<String>,
    line_numbers: Vec<usize>,
    text: String,
}

impl StructuralUnit {
    fn open(kind: UnitKind, line_number: usize, line: &str) -> Self {
        let mut unit = Self {
            kind,
            lines: Vec::new(),
            line_numbers: Vec::new(),
            text: String::new(),
        };
        unit.push(line_number, line);
        unit
    }

    fn push(&mut self, line_number: usize, line: &str) {
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(line);
        self.lines.push(line.to_string());
        self.line_numbers.push(line_number);
    }

    /// What kind of requirement this is.
    #[must_use]
    pub const fn kind(&self) -> UnitKind {
        self.kind
    }

    /// The member lines, trimmed.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The 1-based source line of each member line.
    #[must_use]
    pub fn line_numbers(&self) -> &[usize] {
        &self.line_numbers
    }

    /// The first source line. This is the unit's authoritative location.
    #[must_use]
    pub fn first_line(&self) -> usize {
        self.line_numbers.first().copied().unwrap_or_default()
    }

    /// The member lines joined with single spaces.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

static SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:-{3,}|={3,}|_{3,}|\*{3,})$").expect("pattern is valid"));

static HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:#+\s+|\d+\.\s+)").expect("pattern is valid"));

static STORY_ROLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^as\s+an?\s+.*,\s*$").expect("pattern is valid"));

static STORY_GOAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^i\s+want\s+.*,\s*$").expect("pattern is valid"));

static STORY_BENEFIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^so\s+that\s+").expect("pattern is valid"));

static FUNCTIONAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^the\s+(?:system\s+(?:shall|will)|application\s+must)\s+")
        .expect("pattern is valid")
});

static NON_FUNCTIONAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:performance|usability|reliability|scalability|security|availability|maintainability)\s*[-:]\s*",
    )
    .expect("pattern is valid")
});

static STORY_OPENER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^as\s+an?\s").expect("pattern is valid"));

/// Classifies lines and groups them into [`StructuralUnit`]s.
#[derive(Debug, Clone)]
pub struct StructureDetector {
    settings: StructureSettings,
    min_length: usize,
}

impl Default for StructureDetector {
    fn default() -> Self {
        Self::new(StructureSettings::default(), 10)
    }
}

impl StructureDetector {
    /// Create a detector with explicit tuning.
    ///
    /// Units whose text is shorter than `min_length` characters are dropped by
    /// [`StructureDetector::filter_valid`].
    #[must_use]
    pub const fn new(settings: StructureSettings, min_length: usize) -> Self {
        Self {
            settings,
            min_length,
        }
    }

    /// Create a detector tuned by a rule document's `structure` section and
    /// `min_requirement_length` setting.
    #[must_use]
    pub fn from_rules(rules: &RuleDocument) -> Self {
        Self::new(
            rules.structure().clone(),
            rules.global_settings().min_requirement_length,
        )
    }

    /// Classify one line. Checks run most specific first.
    #[must_use]
    pub fn classify(line: &str) -> LineKind {
        let line = line.trim();
        if SEPARATOR.is_match(line) {
            LineKind::Separator
        } else if HEADER.is_match(line) {
            LineKind::Header
        } else if STORY_ROLE.is_match(line) {
            LineKind::UserStory(StoryPart::Role)
        } else if STORY_GOAL.is_match(line) {
            LineKind::UserStory(StoryPart::Goal)
        } else if STORY_BENEFIT.is_match(line) {
            LineKind::UserStory(StoryPart::Benefit)
        } else if FUNCTIONAL.is_match(line) {
            LineKind::Functional
        } else if NON_FUNCTIONAL.is_match(line) {
            LineKind::NonFunctional
        } else {
            LineKind::Unknown
        }
    }

    /// Group raw lines into units.
    ///
    /// Line numbers are the 1-based positions in `lines`. Blank lines are
    /// skipped without closing the open unit. Consecutive user-story lines
    /// form one story, whichever clauses they hold.
    #[instrument(level = "debug", skip_all)]
    pub fn detect<I, S>(&self, lines: I) -> Vec<StructuralUnit>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut units = Vec::new();
        let mut current: Option<StructuralUnit> = None;

        for (index, line) in lines.into_iter().enumerate() {
            let line_number = index + 1;
            let line = line.as_ref().trim();
            if line.is_empty() {
                continue;
            }

            match Self::classify(line) {
                LineKind::Separator | LineKind::Header => {
                    units.extend(current.take());
                }
                LineKind::UserStory(_) => match current.as_mut() {
                    Some(unit) if unit.kind == UnitKind::UserStory => unit.push(line_number, line),
                    _ => {
                        units.extend(current.replace(StructuralUnit::open(
                            UnitKind::UserStory,
                            line_number,
                            line,
                        )));
                    }
                },
                LineKind::Functional => {
                    units.extend(current.replace(StructuralUnit::open(
                        UnitKind::Functional,
                        line_number,
                        line,
                    )));
                }
                LineKind::NonFunctional => {
                    units.extend(current.replace(StructuralUnit::open(
                        UnitKind::NonFunctional,
                        line_number,
                        line,
                    )));
                }
                LineKind::Unknown => match &mut current {
                    Some(unit) if self.looks_like_continuation(line) => {
                        unit.push(line_number, line);
                    }
                    _ => units.extend(current.take()),
                },
            }
        }
        units.extend(current);

        tracing::debug!(units = units.len(), "grouped lines into structural units");
        units
    }

    fn looks_like_continuation(&self, line: &str) -> bool {
        if line.chars().next().is_some_and(char::is_lowercase) {
            return true;
        }
        if self
            .settings
            .continuation_lead_ins
            .iter()
            .any(|lead_in| line.starts_with(lead_in.as_str()))
        {
            return true;
        }
        line.chars().count() > self.settings.continuation_min_length && !STORY_OPENER.is_match(line)
    }

    /// Drop units that are too short, have too few words, are pure
    /// punctuation, or are user stories with too few lines.
    #[must_use]
    pub fn filter_valid(&self, units: Vec<StructuralUnit>) -> Vec<StructuralUnit> {
        units
            .into_iter()
            .filter(|unit| self.is_valid(unit))
            .collect()
    }

    fn is_valid(&self, unit: &StructuralUnit) -> bool {
        let text = unit.text.trim();
        if text.chars().count() < self.min_length {
            return false;
        }
        if text.split_whitespace().count() < self.settings.min_words {
            return false;
        }
        if text
            .chars()
            .all(|c| c.is_ascii_punctuation() || c.is_whitespace())
        {
            return false;
        }
        !(unit.kind == UnitKind::UserStory && unit.lines.len() < self.settings.min_user_story_lines)
    }

    /// [`detect`](Self::detect) followed by [`filter_valid`](Self::filter_valid).
    pub fn parse<I, S>(&self, lines: I) -> Vec<StructuralUnit>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.filter_valid(self.detect(lines))
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn detector() -> StructureDetector {
        StructureDetector::default()
    }

    #[test_case("---", LineKind::Separator)]
    #[test_case("=====", LineKind::Separator)]
    #[test_case("***", LineKind::Separator)]
    #[test_case("## Login", LineKind::Header)]
    #[test_case("3. Reporting", LineKind::Header)]
    #[test_case("As a user,", LineKind::UserStory(StoryPart::Role))]
    #[test_case("As an administrator,", LineKind::UserStory(StoryPart::Role))]
    #[test_case("I want to reset my password,", LineKind::UserStory(StoryPart::Goal))]
    #[test_case("so that I can regain access.", LineKind::UserStory(StoryPart::Benefit))]
    #[test_case("The system shall log every login attempt.", LineKind::Functional)]
    #[test_case("the application must export reports", LineKind::Functional)]
    #[test_case("Performance: pages render within 2 seconds", LineKind::NonFunctional)]
    #[test_case("Security - passwords are hashed", LineKind::NonFunctional)]
    #[test_case("Users can export reports", LineKind::Unknown)]
    #[test_case("As a user", LineKind::Unknown; "role without trailing comma")]
    fn classify_lines(line: &str, expected: LineKind) {
        assert_eq!(StructureDetector::classify(line), expected);
    }

    #[test]
    fn user_story_lines_form_one_unit() {
        let units = detector().detect([
            "As a user,",
            "I want to reset my password,",
            "so that I can regain access.",
        ]);

        assert_eq!(units.len(), 1);
        let unit = &units[0];
        assert_eq!(unit.kind(), UnitKind::UserStory);
        assert_eq!(unit.line_numbers(), &[1, 2, 3]);
        assert_eq!(
            unit.text(),
            "As a user, I want to reset my password, so that I can regain access."
        );
    }

    #[test]
    fn separator_is_never_part_of_a_unit() {
        let units = detector().detect([
            "The system shall log every login attempt.",
            "---",
            "The system shall lock accounts after five failures.",
        ]);

        assert_eq!(units.len(), 2);
        assert!(units.iter().all(|unit| !unit.lines().iter().any(|l| l == "---")));
        assert_eq!(units[0].line_numbers(), &[1]);
        assert_eq!(units[1].line_numbers(), &[3]);
    }

    #[test]
    fn headers_close_the_open_unit() {
        let units = detector().detect([
            "# Authentication",
            "The system shall log every login attempt.",
            "## Reporting",
            "The system will export weekly reports.",
        ]);
        let first_lines: Vec<usize> = units.iter().map(StructuralUnit::first_line).collect();
        assert_eq!(first_lines, vec![2, 4]);
    }

    #[test]
    fn continuation_lines_are_appended() {
        let units = detector().detect([
            "The system shall export reports",
            "in CSV and PDF formats.",
            "",
            "Including a summary page for managers.",
        ]);

        assert_eq!(units.len(), 1);
        assert_eq!(units[0].line_numbers(), &[1, 2, 4]);
    }

    #[test]
    fn short_unknown_line_closes_the_unit() {
        let units = detector().detect([
            "The system shall export reports.",
            "Note:",
            "continued text",
        ]);

        assert_eq!(units.len(), 1);
        assert_eq!(units[0].line_numbers(), &[1]);
    }

    #[test]
    fn functional_line_interrupts_a_story() {
        let units = detector().detect([
            "As a user,",
            "I want to reset my password,",
            "The system shall send a reset email.",
        ]);

        let kinds: Vec<UnitKind> = units.iter().map(StructuralUnit::kind).collect();
        assert_eq!(kinds, vec![UnitKind::UserStory, UnitKind::Functional]);
    }

    #[test]
    fn consecutive_story_lines_merge() {
        let units = detector().detect([
            "As a user,",
            "I want to export data,",
            "so that I can share it.",
            "As an admin,",
            "I want to audit exports,",
        ]);

        assert_eq!(units.len(), 1);
        assert_eq!(units[0].kind(), UnitKind::UserStory);
        assert_eq!(units[0].line_numbers(), &[1, 2, 3, 4, 5]);
    }

    #[test_case(&["As a user,", "I want to export data,", "---", "As an admin,", "I want to audit exports,"]; "separator")]
    #[test_case(&["As a user,", "I want to export data,", "## Admin", "As an admin,", "I want to audit exports,"]; "header")]
    fn stories_split_on_a_break(lines: &[&str]) {
        let units = detector().detect(lines);
        assert_eq!(units.len(), 2);
        assert!(units.iter().all(|unit| unit.kind() == UnitKind::UserStory));
        assert_eq!(units[1].lines()[0], "As an admin,");
    }

    #[test]
    fn lead_ins_continue_a_story() {
        let units = detector().detect(["As a user,", "I want to log out"]);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].lines().len(), 2);
    }

    #[test]
    fn filter_rejects_punctuation() {
        let unit = StructuralUnit::open(UnitKind::Functional, 1, "...");
        assert!(detector().filter_valid(vec![unit]).is_empty());
    }

    #[test_case(UnitKind::Functional, &["Log in."]; "too short")]
    #[test_case(UnitKind::Functional, &["Authentication-required"]; "too few words")]
    #[test_case(UnitKind::Functional, &["... --- *** ___ ..."]; "punctuation only")]
    #[test_case(UnitKind::UserStory, &["As a user, I want to export everything,"]; "single line story")]
    fn filter_rejects(kind: UnitKind, lines: &[&str]) {
        let mut unit = StructuralUnit::open(kind, 1, lines[0]);
        for (offset, line) in lines.iter().enumerate().skip(1) {
            unit.push(offset + 1, line);
        }
        assert!(detector().filter_valid(vec![unit]).is_empty());
    }

    #[test]
    fn filter_keeps_complete_units() {
        let units = detector().parse([
            "As a user,",
            "I want to reset my password,",
            "so that I can regain access.",
            "---",
            "The system shall log every login attempt.",
        ]);
        assert_eq!(units.len(), 2);
    }

    #[test]
    fn tuning_comes_from_rules() {
        let rules = RuleDocument::parse(
            "[global_settings]\nmin_requirement_length = 60\n[structure]\nmin_words = 1\n",
            crate::rules::Format::Toml,
            "test",
        )
        .unwrap();
        let detector = StructureDetector::from_rules(&rules);
        let units = detector.parse(["The system shall log every login attempt."]);
        assert!(units.is_empty());
    }
}
