//! Risk detection for natural-language requirements.
//!
//! Requirements are read from plain-text or markdown documents, either one per
//! line or grouped into user stories and functional/non-functional blocks.
//! A set of rule-driven detectors flags ambiguity, missing detail, security
//! gaps, conflicts and more; the flagged risks are then filtered, scored and
//! ranked.

pub mod domain;
pub use domain::{
    Requirement, Risk, RiskCategory, RiskFactory, RiskIdGenerator, SeverityLevel, ValidationError,
};

pub mod rules;

pub mod structure;

pub mod input;

pub mod detectors;

pub mod analyzer;
pub use analyzer::{AnalysisResult, Analyzer};

pub mod filters;

pub mod scoring;
pub use scoring::{ScoreRecord, Scorer};
