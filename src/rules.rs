//! Rule configuration.
//!
//! A rule document enables or disables each detector, sets its default
//! severity, and supplies the keyword, trigger, pair and threshold tables the
//! detectors evaluate. Behaviour is entirely table driven: changing the
//! document changes what is flagged, without code changes.
//!
//! Documents are obtained from a [`RuleSource`]. [`RuleStore`] caches the
//! loaded document so that repeated loads are cheap and idempotent.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::instrument;

use crate::RiskCategory;

mod document;
pub use document::{
    DetectorConfig, GlobalSettings, RuleDefinition, RuleDocument, StructureSettings,
};

mod source;
pub use source::{BuiltinRuleSource, FileRuleSource, InMemoryRuleSource};

/// Errors raised while loading or applying a rule document.
///
/// These are fatal: the run is aborted and never retried automatically.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// The rule document does not exist.
    #[error("rules file not found: {}", path.display())]
    NotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// The rule document could not be read.
    #[error("failed to read rules file {}: {source}", path.display())]
    Read {
        /// The unreadable path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The file extension does not name a supported serialization.
    #[error(
        "unsupported rules file format: {} (expected .toml, .json, .yaml or .yml)",
        path.display()
    )]
    UnsupportedFormat {
        /// The offending path.
        path: PathBuf,
    },

    /// The document is not well-formed.
    #[error("failed to parse rules from {origin}: {message}")]
    Parse {
        /// Where the document came from.
        origin: String,
        /// The parser's message.
        message: String,
    },

    /// The document is well-formed but a field is invalid.
    #[error("invalid rules: {field}: {reason}")]
    Invalid {
        /// Dotted path to the offending field.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A detector was constructed against a category that is disabled (or
    /// absent) in the rule document.
    #[error("detector '{0}' is disabled in the rule document")]
    DetectorDisabled(RiskCategory),

    /// A detector name that is not registered.
    #[error("unknown detector '{0}'")]
    UnknownDetector(String),

    /// A detector block names a rule its detector does not implement.
    #[error("detector '{detector}' has no rule named '{rule}' (expected one of: {expected})")]
    UnknownRule {
        /// The detector whose block holds the rule.
        detector: RiskCategory,
        /// The rule name as written.
        rule: String,
        /// The rule names the detector implements, comma separated.
        expected: String,
    },

    /// A known rule lacks a field its detector reads, or sets one it ignores.
    #[error("rule '{rule}' of detector '{detector}': {reason}")]
    RuleShape {
        /// The detector whose block holds the rule.
        detector: RiskCategory,
        /// The rule name.
        rule: String,
        /// What is wrong with the rule.
        reason: String,
    },
}

/// Serialization formats accepted for rule documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// TOML (`.toml`).
    Toml,
    /// JSON (`.json`).
    Json,
    /// YAML (`.yaml`, `.yml`).
    Yaml,
}

impl Format {
    /// Infer the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Toml => f.write_str("toml"),
            Self::Json => f.write_str("json"),
            Self::Yaml => f.write_str("yaml"),
        }
    }
}

/// A source of rule documents.
///
/// Implementations may be file backed, in memory, or built in; callers must
/// not assume a particular backing store.
pub trait RuleSource {
    /// Load and validate the rule document.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if the document is absent, unreadable,
    /// malformed, or fails validation.
    fn load(&self) -> Result<RuleDocument, ConfigurationError>;

    /// A human-readable description of where the document comes from.
    fn origin(&self) -> String;
}

/// Caches the document loaded from a [`RuleSource`].
#[derive(Debug)]
pub struct RuleStore<S> {
    source: S,
    cached: Option<Arc<RuleDocument>>,
}

impl<S: RuleSource> RuleStore<S> {
    /// Wrap a source. Nothing is loaded until [`RuleStore::load`] is called.
    #[must_use]
    pub const fn new(source: S) -> Self {
        Self {
            source,
            cached: None,
        }
    }

    /// Load the document, or return the cached copy.
    ///
    /// # Errors
    ///
    /// Propagates any [`ConfigurationError`] from the source. Failed loads are
    /// not cached.
    #[instrument(level = "debug", skip(self), fields(origin = %self.source.origin()))]
    pub fn load(&mut self) -> Result<Arc<RuleDocument>, ConfigurationError> {
        if let Some(document) = &self.cached {
            return Ok(Arc::clone(document));
        }

        let document = Arc::new(self.source.load()?);
        tracing::debug!(
            detectors = document.detectors().count(),
            enabled = document.enabled_categories().count(),
            "loaded rule document"
        );
        self.cached = Some(Arc::clone(&document));
        Ok(document)
    }

    /// Drop the cached document. The next [`RuleStore::load`] reads the
    /// source again.
    pub fn reload(&mut self) {
        self.cached = None;
    }

    /// Whether a document is currently cached.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.cached.is_some()
    }

    /// The wrapped source.
    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, io::Write};

    use test_case::test_case;

    use super::*;

    struct CountingSource {
        loads: Cell<usize>,
    }

    impl RuleSource for CountingSource {
        fn load(&self) -> Result<RuleDocument, ConfigurationError> {
            self.loads.set(self.loads.get() + 1);
            BuiltinRuleSource.load()
        }

        fn origin(&self) -> String {
            "counting".to_string()
        }
    }

    #[test]
    fn store_caches_until_reload() {
        let mut store = RuleStore::new(CountingSource { loads: Cell::new(0) });
        assert!(!store.is_loaded());

        let first = store.load().unwrap();
        let second = store.load().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.source().loads.get(), 1);

        store.reload();
        assert!(!store.is_loaded());
        store.load().unwrap();
        assert_eq!(store.source().loads.get(), 2);
    }

    #[test]
    fn store_does_not_cache_failures() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("rules.toml");
        let mut store = RuleStore::new(FileRuleSource::new(&path));

        assert!(matches!(
            store.load().unwrap_err(),
            ConfigurationError::NotFound { .. }
        ));
        assert!(!store.is_loaded());

        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"[detectors.scope]\nenabled = true\n").unwrap();
        let document = store.load().unwrap();
        assert!(document.is_enabled("scope"));
    }

    #[test_case("rules.toml", Some(Format::Toml))]
    #[test_case("rules.JSON", Some(Format::Json))]
    #[test_case("rules.yml", Some(Format::Yaml))]
    #[test_case("rules.yaml", Some(Format::Yaml))]
    #[test_case("rules.ini", None)]
    #[test_case("rules", None)]
    fn format_from_extension(path: &str, expected: Option<Format>) {
        assert_eq!(Format::from_path(Path::new(path)), expected);
    }
}
