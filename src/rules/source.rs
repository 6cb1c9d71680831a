use std::path::{Path, PathBuf};

use super::{ConfigurationError, Format, RuleDocument, RuleSource};

const BUILTIN_RULES: &str = include_str!("../../rules/default.toml");

/// Reads a rule document from disk.
///
/// The serialization is chosen from the file extension.
#[derive(Debug, Clone)]
pub struct FileRuleSource {
    path: PathBuf,
}

impl FileRuleSource {
    /// Create a source for the given path. The file is not touched until
    /// [`RuleSource::load`] is called.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The path this source reads.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RuleSource for FileRuleSource {
    fn load(&self) -> Result<RuleDocument, ConfigurationError> {
        let format =
            Format::from_path(&self.path).ok_or_else(|| ConfigurationError::UnsupportedFormat {
                path: self.path.clone(),
            })?;

        let text = std::fs::read_to_string(&self.path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigurationError::NotFound {
                    path: self.path.clone(),
                }
            } else {
                ConfigurationError::Read {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;

        tracing::debug!(path = %self.path.display(), %format, "parsing rules file");
        RuleDocument::parse(&text, format, &self.origin())
    }

    fn origin(&self) -> String {
        self.path.display().to_string()
    }
}

/// Holds a rule document in memory, either as text or already parsed.
#[derive(Debug, Clone)]
pub enum InMemoryRuleSource {
    /// Unparsed text in a known format.
    Text {
        /// The document text.
        text: String,
        /// Its serialization.
        format: Format,
    },
    /// A document that has already been validated.
    Document(RuleDocument),
}

impl InMemoryRuleSource {
    /// A source that parses `text` on every load.
    #[must_use]
    pub fn from_text(text: impl Into<String>, format: Format) -> Self {
        Self::Text {
            text: text.into(),
            format,
        }
    }
}

impl From<RuleDocument> for InMemoryRuleSource {
    fn from(document: RuleDocument) -> Self {
        Self::Document(document)
    }
}

impl RuleSource for InMemoryRuleSource {
    fn load(&self) -> Result<RuleDocument, ConfigurationError> {
        match self {
            Self::Text { text, format } => RuleDocument::parse(text, *format, &self.origin()),
            Self::Document(document) => Ok(document.clone()),
        }
    }

    fn origin(&self) -> String {
        "<memory>".to_string()
    }
}

/// The rule set compiled into the binary.
///
/// Every detector is enabled with a representative vocabulary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinRuleSource;

impl BuiltinRuleSource {
    /// The raw TOML text of the built-in rules.
    #[must_use]
    pub const fn text() -> &'static str {
        BUILTIN_RULES
    }
}

impl RuleSource for BuiltinRuleSource {
    fn load(&self) -> Result<RuleDocument, ConfigurationError> {
        RuleDocument::parse(BUILTIN_RULES, Format::Toml, &self.origin())
    }

    fn origin(&self) -> String {
        "<builtin>".to_string()
    }
}
