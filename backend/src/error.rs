//! Error types for the product load pipeline.
//!
//! Errors are layered by scope:
//!
//! - [`MappingError`] - header row could not be mapped (file scoped)
//! - [`StoreError`] - persistence collaborator failures
//! - [`AssetError`] - asset pipeline failures
//! - [`RowError`] - anything that aborts a single row (row scoped)
//! - [`LoadWarning`] - non-fatal conditions recorded in the report
//! - [`ConfigError`] - options file problems
//! - [`LoadError`] - top-level errors that abort a whole load
//!
//! Row scoped errors are caught by the row processor and recorded in the
//! [`crate::load::LoadReport`]; only [`LoadError`] escapes a load.

use thiserror::Error;

use crate::load::LoadReport;
use crate::parser::CsvError;
use crate::schema::TargetType;

// =============================================================================
// Header Mapping Errors
// =============================================================================

/// Errors raised while binding the header row to operators.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MappingError {
    /// The file has no header cells.
    #[error("Header row is empty")]
    EmptyHeader,

    /// One or more mandatory columns are not present in the file.
    #[error("Missing mandatory column(s): {}", .0.join(", "))]
    MissingMandatoryColumn(Vec<String>),

    /// Strict mode: a header could not be resolved to any operator.
    #[error("No operator found for column {column} ('{header}')")]
    UnmappableColumn { column: usize, header: String },

    /// The configured match-by column is not bound in this file.
    #[error("Match-by column '{0}' is not a mapped column of this file")]
    MatchColumnMissing(String),
}

// =============================================================================
// Persistence Errors
// =============================================================================

/// Errors from the persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record referenced by id does not exist.
    #[error("{target} #{id} not found")]
    NotFound { target: TargetType, id: u64 },

    /// The store cannot look records up by this field.
    #[error("Cannot find {target} by '{field}'")]
    UnsupportedCondition { target: TargetType, field: String },

    /// Transaction bookkeeping failed (begin/commit/rollback out of order).
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Snapshot file could not be read or written.
    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot file is not valid JSON.
    #[error("Store JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Fatal errors abort the whole load instead of a single row.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Transaction(_) | StoreError::Io(_))
    }
}

// =============================================================================
// Asset Errors
// =============================================================================

/// Errors from the asset ingestion collaborator.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AssetError {
    /// A referenced image file does not exist.
    #[error("Image file not found: {0}")]
    MissingFile(String),

    /// The pipeline refused the attachment.
    #[error("Image rejected: {0}")]
    Rejected(String),
}

// =============================================================================
// Row Errors
// =============================================================================

/// Errors that abort processing of the current row only.
#[derive(Debug, Error)]
pub enum RowError {
    /// A bound column has no way of being applied to the product.
    #[error("Cannot process '{value}': no operator to assign to for column '{operator}'")]
    UnresolvedOperator { operator: String, value: String },

    /// A cell could not be coerced to the attribute type.
    #[error("Invalid value for '{field}' ('{value}'): {message}")]
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// None of the requested association keys were found.
    #[error("No {association} found for {field} in [{}]", keys.join(", "))]
    AssociationLookupFailed {
        association: String,
        field: String,
        keys: Vec<String>,
    },

    /// The persistence layer rejected the object.
    #[error("Save failed: {}", errors.join("; "))]
    SaveValidationFailed { errors: Vec<String> },

    /// Children cannot be created without a persisted parent.
    #[error("Cannot add {association}: save failed on parent product ({reason})")]
    ParentSaveRequiredButFailed { association: String, reason: String },

    /// Asset pipeline error.
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    /// Persistence error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl RowError {
    pub(crate) fn invalid(field: &str, value: &str, message: impl Into<String>) -> Self {
        RowError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            message: message.into(),
        }
    }
}

// =============================================================================
// Warnings (non-fatal)
// =============================================================================

/// Conditions recorded against a row without failing it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LoadWarning {
    /// Some but not all association keys were found; found ones were attached.
    #[error("{association}: not found for {field} [{}]", missing.join(", "))]
    AssociationLookupPartial {
        association: String,
        field: String,
        missing: Vec<String>,
    },

    /// Per-variant values did not line up with the product's variants.
    #[error("{supplied} {field} entries did not match {variants} variants - none set")]
    VariantFieldCountMismatch {
        field: String,
        supplied: usize,
        variants: usize,
    },

    /// Several stock values supplied for a product without variants.
    #[error("{supplied} stock values supplied but no variants exist - only the first was used")]
    StockValuesTruncated { supplied: usize },

    /// Per-variant column given for a product without variants.
    #[error("{field} ignored: product has no variants")]
    NoVariants { field: String },
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while reading load options.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the options file.
    #[error("Failed to read options: {0}")]
    Io(#[from] std::io::Error),

    /// Options file is not valid JSON for [`crate::config::LoadOptions`].
    #[error("Invalid options: {0}")]
    Json(#[from] serde_json::Error),

    /// Schema version string is not `major.minor`.
    #[error("Invalid schema version '{0}' (expected e.g. \"2.2\")")]
    InvalidSchemaVersion(String),
}

// =============================================================================
// Load Errors (top-level)
// =============================================================================

/// Errors that abort an entire load.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Input file could not be parsed.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Header row could not be mapped.
    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    /// Options could not be read.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Persistence failed outside of row processing (begin/commit).
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A fatal error interrupted processing; carries what was processed so far.
    #[error("Load aborted at row {row}: {source}")]
    Aborted {
        row: usize,
        #[source]
        source: StoreError,
        report: Box<LoadReport>,
    },
}

impl LoadError {
    /// Partial report, when the load got as far as processing rows.
    pub fn report(&self) -> Option<&LoadReport> {
        match self {
            LoadError::Aborted { report, .. } => Some(report),
            _ => None,
        }
    }
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Load error.
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for header mapping.
pub type MappingResult<T> = Result<T, MappingError>;

/// Result type for persistence operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for row processing.
pub type RowResult<T> = Result<T, RowError>;

/// Result type for whole loads.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let mapping_err = MappingError::MissingMandatoryColumn(vec!["name".into()]);
        let load_err: LoadError = mapping_err.into();
        assert!(load_err.to_string().contains("name"));

        let store_err = StoreError::Transaction("no open transaction".into());
        let row_err: RowError = store_err.into();
        assert!(row_err.to_string().contains("no open transaction"));
    }

    #[test]
    fn test_fatal_store_errors() {
        assert!(StoreError::Transaction("x".into()).is_fatal());
        assert!(!StoreError::UnsupportedCondition {
            target: TargetType::Store,
            field: "colour".into(),
        }
        .is_fatal());
    }

    #[test]
    fn test_warning_format() {
        let warning = LoadWarning::VariantFieldCountMismatch {
            field: "price".into(),
            supplied: 2,
            variants: 3,
        };
        let msg = warning.to_string();
        assert!(msg.contains("2 price entries"));
        assert!(msg.contains("3 variants"));
    }
}
