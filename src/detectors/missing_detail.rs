use std::sync::LazyLock;

use regex::Regex;
use tracing::instrument;

use super::{Detector, DetectorContext, DetectorError, Finding};
use crate::{
    Requirement, Risk, RiskCategory, RiskFactory,
    rules::{ConfigurationError, RuleDocument},
};

/// Minimum characters that must follow an opening phrase such as
/// "The system shall".
const MIN_COMPLETION_LENGTH: usize = 10;

/// Characters inspected on either side of an action keyword.
const CONTEXT_WINDOW: usize = 25;

const DETAIL_INDICATORS: [&str; 9] = [
    "when", "where", "how", "within", "after", "before", "if", "unless", "during",
];

static SPECIFICS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+|seconds?|minutes?|hours?|days?|%").expect("pattern is valid")
});

const QUALIFIED_ACTORS: [&str; 12] = [
    "authenticated user",
    "logged-in user",
    "registered user",
    "system administrator",
    "admin user",
    "superuser",
    "external user",
    "guest user",
    "anonymous user",
    "api client",
    "external system",
    "third-party",
];

/// Flags incomplete statements, actions without detail, and vague actors.
///
/// Rules:
///
/// - `incomplete_phrases` (`patterns`): the requirement opens with a pattern
///   and little follows it.
/// - `missing_specifications` (`keywords`): an action keyword with no timing,
///   condition or quantity nearby. With `context_required = false` every
///   occurrence is flagged.
/// - `unspecified_actors` (`keywords`): an actor keyword not covered by a
///   qualified actor phrase such as "authenticated user".
#[derive(Debug, Clone)]
pub struct MissingDetailDetector {
    context: DetectorContext,
}

impl MissingDetailDetector {
    /// Build the detector from its rule block.
    ///
    /// # Errors
    ///
    /// Fails if the `missing_detail` block is disabled or absent.
    pub fn new(rules: &RuleDocument) -> Result<Self, ConfigurationError> {
        Ok(Self {
            context: DetectorContext::new(rules, RiskCategory::MissingDetail)?,
        })
    }

    fn incomplete_phrases(&self, text: &str, findings: &mut Vec<Finding>) {
        let Some(rule) = self.context.rule("incomplete_phrases") else {
            return;
        };
        let normalized = self.context.normalize(text);
        for pattern in &rule.patterns {
            let prefix = self.context.normalize(pattern);
            let Some(rest) = normalized.strip_prefix(prefix.as_str()) else {
                continue;
            };
            if rest.trim().chars().count() < MIN_COMPLETION_LENGTH {
                findings.push(
                    Finding::new(
                        "Incomplete phrase detected - requirement ends without specifying what should be done",
                        pattern.as_str(),
                    )
                    .suggestion(format!(
                        "Complete the requirement by specifying what the system should do after '{pattern}'"
                    )),
                );
            }
        }
    }

    fn missing_specifications(&self, text: &str, findings: &mut Vec<Finding>) {
        let Some(rule) = self.context.rule("missing_specifications") else {
            return;
        };
        let context_required = rule.context_required.unwrap_or(true);
        for action in self.context.find_keywords(text, &rule.keywords) {
            if context_required && has_detail_nearby(text, action) {
                continue;
            }
            findings.push(
                Finding::new(
                    format!("Action '{action}' lacks sufficient detail about how it should be performed"),
                    action,
                )
                .suggestion(format!(
                    "Specify how '{action}' should be performed (e.g., when, where, under what conditions)"
                )),
            );
        }
    }

    fn unspecified_actors(&self, text: &str, findings: &mut Vec<Finding>) {
        let Some(rule) = self.context.rule("unspecified_actors") else {
            return;
        };
        let lowered = text.to_lowercase();
        for actor in self.context.find_keywords(text, &rule.keywords) {
            let actor_lower = actor.trim().to_lowercase();
            let singular = actor_lower.strip_suffix('s').unwrap_or(&actor_lower);
            let qualified = QUALIFIED_ACTORS
                .iter()
                .any(|phrase| lowered.contains(phrase) && phrase.contains(singular));
            if qualified {
                continue;
            }
            let actor = actor.trim();
            findings.push(
                Finding::new(format!("Actor '{actor}' is unspecified or ambiguous"), actor)
                    .suggestion(format!(
                        "Specify which '{actor}' (e.g., 'authenticated users', 'system administrators', 'external API')"
                    )),
            );
        }
    }
}

/// Whether a detail indicator or a quantity appears within
/// [`CONTEXT_WINDOW`] characters of the first occurrence of `action`.
fn has_detail_nearby(text: &str, action: &str) -> bool {
    let chars: Vec<char> = text.to_lowercase().chars().collect();
    let needle: Vec<char> = action.to_lowercase().chars().collect();
    let Some(position) = chars
        .windows(needle.len().max(1))
        .position(|window| window == needle.as_slice())
    else {
        return false;
    };

    let start = position.saturating_sub(CONTEXT_WINDOW);
    let end = (position + needle.len() + CONTEXT_WINDOW).min(chars.len());
    let window: String = chars[start..end].iter().collect();

    DETAIL_INDICATORS
        .iter()
        .any(|indicator| window.contains(indicator))
        || SPECIFICS.is_match(&window)
}

impl Detector for MissingDetailDetector {
    fn name(&self) -> &'static str {
        "Missing Detail Detector"
    }

    fn category(&self) -> RiskCategory {
        RiskCategory::MissingDetail
    }

    #[instrument(level = "trace", skip_all, fields(requirement = requirement.id()))]
    fn detect_risks(
        &self,
        requirement: &Requirement,
        risks: &mut RiskFactory,
    ) -> Result<Vec<Risk>, DetectorError> {
        let text = requirement.text();
        let mut findings = Vec::new();
        self.incomplete_phrases(text, &mut findings);
        self.missing_specifications(text, &mut findings);
        self.unspecified_actors(text, &mut findings);
        self.context.risks(risks, requirement, findings)
    }
}
