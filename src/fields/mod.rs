//! Field catalog module
//!
//! This module decides which named fields a report collects:
//! - Built-in presets (ordered field lists)
//! - Exclusions by terminal field name
//! - User-declared custom fields with restricted extraction expressions
//! - Audit fields appended when auditing is enabled

mod catalog;
mod expr;
pub mod presets;
mod value;

pub use catalog::{
    resolve, terminal_name, CustomField, FieldCatalog, FieldCatalogBuilder, CUSTOM_FIELD_PREFIX,
};
pub use expr::{Accessor, Expr};
pub use value::{FieldMap, FieldValue};

use thiserror::Error;

/// Errors raised while building a field catalog
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("Unknown preset '{0}'")]
    InvalidPreset(String),

    #[error("Invalid field declaration '{0}', expected name=expression")]
    InvalidDeclaration(String),

    #[error("Invalid field name '{0}'")]
    InvalidFieldName(String),

    #[error("Invalid expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },
}
