//! Domain models for requirement risk analysis.
//!
//! This module contains the core value types: requirements, the risks flagged
//! against them, and the factory that mints risk identifiers.

/// Requirement domain model.
pub mod requirement;
pub use requirement::{Requirement, ValidationError};

/// Risk categories, severities and the risk record itself.
pub mod risk;
pub use risk::{Risk, RiskCategory, SeverityLevel};

mod risk_id;
pub use risk_id::{RiskFactory, RiskIdGenerator};
