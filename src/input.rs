//! Reading requirement documents and turning them into [`Requirement`]s.
//!
//! Two input modes are supported: one requirement per line
//! ([`load_lines`] + [`RequirementParser`]), or structural units grouped by
//! [`StructureDetector`](crate::structure::StructureDetector)
//! ([`load_raw_lines`] + [`requirements_from_units`]).

use std::path::{Path, PathBuf};

use tracing::instrument;

use crate::{Requirement, ValidationError, domain::requirement::format_id, structure::StructuralUnit};

/// File extensions accepted as requirement documents.
pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["txt", "md"];

/// Errors raised while reading a requirement document.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// The document does not exist.
    #[error("requirements file not found: {}", path.display())]
    NotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// The document could not be read.
    #[error("failed to read requirements file {}: {source}", path.display())]
    Read {
        /// The unreadable path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The document is not a `.txt` or `.md` file.
    #[error("unsupported file extension for {} (expected .txt or .md)", path.display())]
    UnsupportedExtension {
        /// The offending path.
        path: PathBuf,
    },

    /// Nothing usable was found in the document.
    #[error("file contains no requirements: {}", path.display())]
    Empty {
        /// The empty document.
        path: PathBuf,
    },
}

/// One non-empty line of a requirement document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// 1-based position in the file.
    pub number: usize,
    /// The trimmed text.
    pub text: String,
}

fn read_document(path: &Path) -> Result<String, InputError> {
    let supported = path
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| extension.eq_ignore_ascii_case(supported))
        });
    if !supported {
        return Err(InputError::UnsupportedExtension {
            path: path.to_path_buf(),
        });
    }

    let bytes = std::fs::read(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            InputError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            InputError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    Ok(String::from_utf8(bytes).unwrap_or_else(|error| {
        tracing::debug!(path = %path.display(), "file is not UTF-8, decoding as Latin-1");
        error.into_bytes().into_iter().map(char::from).collect()
    }))
}

/// Read a document as one requirement per line.
///
/// Lines are trimmed and empty lines dropped. When `ignore_comments` is set,
/// lines starting with `#` or `//` are dropped too.
///
/// # Errors
///
/// Returns an [`InputError`] if the file is missing, unreadable, not a
/// supported type, or has no remaining lines.
#[instrument(level = "debug")]
pub fn load_lines(path: &Path, ignore_comments: bool) -> Result<Vec<SourceLine>, InputError> {
    let text = read_document(path)?;
    let lines: Vec<SourceLine> = text
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .filter(|(_, line)| !(ignore_comments && (line.starts_with('#') || line.starts_with("//"))))
        .map(|(number, text)| SourceLine {
            number,
            text: text.to_string(),
        })
        .collect();

    if lines.is_empty() {
        return Err(InputError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(lines)
}

/// Read every line of a document, unprocessed, for structure detection.
///
/// # Errors
///
/// Returns an [`InputError`] if the file is missing, unreadable, or not a
/// supported type.
#[instrument(level = "debug")]
pub fn load_raw_lines(path: &Path) -> Result<Vec<String>, InputError> {
    let text = read_document(path)?;
    Ok(text.lines().map(String::from).collect())
}

/// Assigns `R###` identifiers to one requirement per line.
#[derive(Debug, Default)]
pub struct RequirementParser {
    counter: usize,
}

impl RequirementParser {
    /// A parser whose next identifier is `R001`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn lines into requirements, continuing the identifier sequence.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if a line is blank or numbered zero.
    pub fn parse(&mut self, lines: &[SourceLine]) -> Result<Vec<Requirement>, ValidationError> {
        lines
            .iter()
            .map(|line| {
                self.counter += 1;
                Requirement::new(format_id(self.counter), line.number, &line.text)
            })
            .collect()
    }

    /// Restart numbering at `R001`.
    pub fn reset(&mut self) {
        self.counter = 0;
    }
}

/// Map structural units 1:1 to requirements, in order, using each unit's
/// first line number.
///
/// # Errors
///
/// Returns a [`ValidationError`] if a unit has no text or no lines.
pub fn requirements_from_units(units: &[StructuralUnit]) -> Result<Vec<Requirement>, ValidationError> {
    units
        .iter()
        .enumerate()
        .map(|(index, unit)| Requirement::new(format_id(index + 1), unit.first_line(), unit.text()))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::structure::StructureDetector;

    fn document(suffix: &str, contents: &[u8]) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[test]
    fn load_lines_keeps_source_positions() {
        let file = document(
            ".txt",
            b"# comment\n\nThe system shall log in users\n// note\n  Users shall log out  \n",
        );
        let lines = load_lines(file.path(), true).unwrap();
        assert_eq!(
            lines,
            vec![
                SourceLine {
                    number: 3,
                    text: "The system shall log in users".to_string()
                },
                SourceLine {
                    number: 5,
                    text: "Users shall log out".to_string()
                },
            ]
        );
    }

    #[test]
    fn comments_are_kept_on_request() {
        let file = document(".md", b"# Login\nThe system shall log in users\n");
        assert_eq!(load_lines(file.path(), false).unwrap().len(), 2);
    }

    #[test]
    fn only_comments_is_empty() {
        let file = document(".txt", b"# nothing\n// here\n\n");
        assert!(matches!(
            load_lines(file.path(), true).unwrap_err(),
            InputError::Empty { .. }
        ));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let file = document(".docx", b"The system shall log in users\n");
        assert!(matches!(
            load_lines(file.path(), true).unwrap_err(),
            InputError::UnsupportedExtension { .. }
        ));
    }

    #[test]
    fn missing_file_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let error = load_raw_lines(&tmp.path().join("absent.txt")).unwrap_err();
        assert!(matches!(error, InputError::NotFound { .. }));
    }

    #[test]
    fn latin1_documents_are_decoded() {
        let file = document(".txt", b"The caf\xe9 system shall open\n");
        let lines = load_raw_lines(file.path()).unwrap();
        assert_eq!(lines, vec!["The caf\u{e9} system shall open".to_string()]);
    }

    #[test]
    fn parser_numbers_requirements_and_resets() {
        let lines = vec![
            SourceLine {
                number: 2,
                text: "Users shall log in".to_string(),
            },
            SourceLine {
                number: 7,
                text: "Users shall log out".to_string(),
            },
        ];
        let mut parser = RequirementParser::new();
        let requirements = parser.parse(&lines).unwrap();
        assert_eq!(requirements[0].id(), "R001");
        assert_eq!(requirements[1].id(), "R002");
        assert_eq!(requirements[1].line_number().get(), 7);

        assert_eq!(parser.parse(&lines[..1]).unwrap()[0].id(), "R003");
        parser.reset();
        assert_eq!(parser.parse(&lines[..1]).unwrap()[0].id(), "R001");
    }

    #[test]
    fn units_map_to_requirements_by_first_line() {
        let units = StructureDetector::default().parse([
            "# Accounts",
            "As a user,",
            "I want to reset my password,",
            "so that I can regain access.",
            "---",
            "The system shall log every login attempt.",
        ]);
        let requirements = requirements_from_units(&units).unwrap();
        assert_eq!(requirements.len(), 2);
        assert_eq!(requirements[0].id(), "R001");
        assert_eq!(requirements[0].line_number().get(), 2);
        assert_eq!(requirements[1].id(), "R002");
        assert_eq!(requirements[1].line_number().get(), 6);
        assert_eq!(
            requirements[1].text(),
            "The system shall log every login attempt."
        );
    }
}
