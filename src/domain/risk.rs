use std::{fmt, num::NonZeroUsize, str::FromStr};

use serde::{Deserialize, Serialize};

use super::{Requirement, ValidationError};

/// The closed set of risk categories.
///
/// Each category is produced by exactly one detector and parameterised by the
/// rule block of the same name.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    /// Vague, imprecise or weak language.
    Ambiguity,
    /// Incomplete statements, unspecified actions or actors.
    MissingDetail,
    /// Features without matching security requirements.
    Security,
    /// Contradictions, competing priorities and duplicates.
    Conflict,
    /// Load-bearing features without measurable performance criteria.
    Performance,
    /// Always-on services without uptime criteria.
    Availability,
    /// Missing identifiers, acceptance criteria or test references.
    Traceability,
    /// Scope creep and undefined system boundaries.
    Scope,
}

impl RiskCategory {
    /// Every category, in canonical detector order.
    pub const ALL: [Self; 8] = [
        Self::Ambiguity,
        Self::MissingDetail,
        Self::Security,
        Self::Conflict,
        Self::Performance,
        Self::Availability,
        Self::Traceability,
        Self::Scope,
    ];

    /// The configuration key of this category, e.g. `missing_detail`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ambiguity => "ambiguity",
            Self::MissingDetail => "missing_detail",
            Self::Security => "security",
            Self::Conflict => "conflict",
            Self::Performance => "performance",
            Self::Availability => "availability",
            Self::Traceability => "traceability",
            Self::Scope => "scope",
        }
    }

    /// The three-letter code used in risk identifiers.
    ///
    /// This is the first three letters of the configuration key, uppercased.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Ambiguity => "AMB",
            Self::MissingDetail => "MIS",
            Self::Security => "SEC",
            Self::Conflict => "CON",
            Self::Performance => "PER",
            Self::Availability => "AVA",
            Self::Traceability => "TRA",
            Self::Scope => "SCO",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown category or severity name.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
#[error("unknown {kind} '{name}'")]
pub struct UnknownName {
    kind: &'static str,
    name: String,
}

impl FromStr for RiskCategory {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| UnknownName {
                kind: "detector category",
                name: s.to_string(),
            })
    }
}

/// Ordered severity levels.
///
/// The discriminant is the severity rank used for filtering and scoring.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLevel {
    /// Rank 1.
    Low = 1,
    /// Rank 2.
    #[default]
    Medium = 2,
    /// Rank 3.
    High = 3,
    /// Rank 4.
    Critical = 4,
    /// Rank 5.
    Blocker = 5,
}

impl SeverityLevel {
    /// Every severity, lowest first.
    pub const ALL: [Self; 5] = [
        Self::Low,
        Self::Medium,
        Self::High,
        Self::Critical,
        Self::Blocker,
    ];

    /// The integer rank (1-5).
    #[must_use]
    pub const fn rank(self) -> u32 {
        self as u32
    }

    /// The lowercase configuration name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
            Self::Blocker => "blocker",
        }
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeverityLevel {
    type Err = UnknownName;

    /// Severity names are matched case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|severity| severity.as_str() == lower)
            .ok_or_else(|| UnknownName {
                kind: "severity",
                name: s.to_string(),
            })
    }
}

/// One flagged issue found in a requirement by exactly one detector.
///
/// Risks are immutable. New risks should be minted through
/// [`RiskFactory`](crate::RiskFactory) so that identifiers never collide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Risk {
    id: String,
    category: RiskCategory,
    severity: SeverityLevel,
    description: String,
    requirement_id: String,
    line_number: NonZeroUsize,
    evidence: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<String>,
}

impl Risk {
    /// Construct a risk against the given requirement.
    ///
    /// The requirement id and line number are copied from `requirement`.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the id, description or evidence are
    /// empty.
    pub fn new(
        id: impl Into<String>,
        requirement: &Requirement,
        category: RiskCategory,
        severity: SeverityLevel,
        description: impl Into<String>,
        evidence: impl Into<String>,
        suggestion: Option<String>,
    ) -> Result<Self, ValidationError> {
        let id = id.into();
        let description = description.into();
        let evidence = evidence.into();

        if id.trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }
        if description.trim().is_empty() {
            return Err(ValidationError::EmptyDescription);
        }
        if evidence.trim().is_empty() {
            return Err(ValidationError::EmptyEvidence);
        }

        Ok(Self {
            id,
            category,
            severity,
            description,
            requirement_id: requirement.id().to_string(),
            line_number: requirement.line_number(),
            evidence,
            suggestion: suggestion.filter(|s| !s.trim().is_empty()),
        })
    }

    /// The risk identifier, e.g. `R001-AMB-002`.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The category of the detector that raised this risk.
    #[must_use]
    pub const fn category(&self) -> RiskCategory {
        self.category
    }

    /// How serious the risk is.
    #[must_use]
    pub const fn severity(&self) -> SeverityLevel {
        self.severity
    }

    /// Human-readable description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Identifier of the requirement this risk was raised against.
    #[must_use]
    pub fn requirement_id(&self) -> &str {
        &self.requirement_id
    }

    /// Line number of the owning requirement.
    #[must_use]
    pub const fn line_number(&self) -> NonZeroUsize {
        self.line_number
    }

    /// The phrase that triggered the risk.
    #[must_use]
    pub fn evidence(&self) -> &str {
        &self.evidence
    }

    /// Optional remediation hint.
    #[must_use]
    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }
}

impl fmt::Display for Risk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} in {}",
            self.severity.as_str().to_uppercase(),
            self.description,
            self.requirement_id
        )
    }
}
