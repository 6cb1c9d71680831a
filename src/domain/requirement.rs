use std::{fmt, num::NonZeroUsize};

use serde::Serialize;

/// Errors raised when constructing an invalid [`Requirement`] or
/// [`Risk`](crate::Risk).
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum ValidationError {
    /// The identifier was empty.
    #[error("identifier cannot be empty")]
    EmptyId,

    /// The requirement text was empty or whitespace.
    #[error("requirement text cannot be empty")]
    EmptyText,

    /// The risk description was empty or whitespace.
    #[error("risk description cannot be empty")]
    EmptyDescription,

    /// The risk evidence was empty or whitespace.
    #[error("risk evidence cannot be empty")]
    EmptyEvidence,

    /// Line numbers are 1-based.
    #[error("line number must be positive")]
    ZeroLineNumber,
}

/// One logical unit of requirement text.
///
/// Requirements are immutable once created. The identifier is assigned in
/// discovery order (`R001`, `R002`, ...) and the line number points at the
/// first source line of the unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requirement {
    id: String,
    line_number: NonZeroUsize,
    text: String,
}

impl Requirement {
    /// Construct a new [`Requirement`].
    ///
    /// The text is trimmed.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the id is empty, the text is empty
    /// after trimming, or the line number is zero.
    pub fn new(
        id: impl Into<String>,
        line_number: usize,
        text: impl AsRef<str>,
    ) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }
        let line_number = NonZeroUsize::new(line_number).ok_or(ValidationError::ZeroLineNumber)?;
        let text = text.as_ref().trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyText);
        }

        Ok(Self {
            id,
            line_number,
            text: text.to_string(),
        })
    }

    /// The stable identifier, e.g. `R001`.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The first source line of this requirement.
    #[must_use]
    pub const fn line_number(&self) -> NonZeroUsize {
        self.line_number
    }

    /// The trimmed requirement text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.text)
    }
}

/// Format a requirement identifier from a 1-based counter.
///
/// ```
/// assert_eq!(stressspec::domain::requirement::format_id(7), "R007");
/// assert_eq!(stressspec::domain::requirement::format_id(1234), "R1234");
/// ```
#[must_use]
pub fn format_id(counter: usize) -> String {
    format!("R{counter:03}")
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn new_trims_text() {
        let requirement = Requirement::new("R001", 3, "  The system shall log in users.  ").unwrap();
        assert_eq!(requirement.id(), "R001");
        assert_eq!(requirement.line_number().get(), 3);
        assert_eq!(requirement.text(), "The system shall log in users.");
    }

    #[test_case("", 1, "text", ValidationError::EmptyId; "empty id")]
    #[test_case("  ", 1, "text", ValidationError::EmptyId; "blank id")]
    #[test_case("R001", 0, "text", ValidationError::ZeroLineNumber; "zero line")]
    #[test_case("R001", 1, "", ValidationError::EmptyText; "empty text")]
    #[test_case("R001", 1, " \t ", ValidationError::EmptyText; "whitespace text")]
    fn new_rejects_invalid(id: &str, line: usize, text: &str, expected: ValidationError) {
        assert_eq!(Requirement::new(id, line, text).unwrap_err(), expected);
    }

    #[test]
    fn display_shows_id_and_text() {
        let requirement = Requirement::new("R002", 1, "Users shall log out").unwrap();
        assert_eq!(requirement.to_string(), "R002: Users shall log out");
    }
}
