//! Error types for Folio.

use std::fmt;

use thiserror::Error;

use crate::validation::FieldError;

/// A list of field-level validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    /// Check whether a given field failed with the given code.
    pub fn has(&self, field: &str, code: &str) -> bool {
        self.0.iter().any(|e| e.field == field && e.code == code)
    }

    /// Check whether any error was reported for a field.
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Common error type for Folio.
#[derive(Error, Debug)]
pub enum FolioError {
    /// The id has no live row.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// One or more field-level rules were violated.
    #[error("validation failed: {0}")]
    ValidationFailed(ValidationErrors),

    /// Sibling or tag name collision.
    #[error("duplicate name: {0}")]
    DuplicateName(String),

    /// Delete or unprotect refused on a protected resource.
    #[error("protected resource: {0}")]
    ProtectedResourceViolation(String),

    /// The entity is in a state that does not allow the mutation.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Re-parenting would make an entity its own ancestor.
    #[error("cycle detected: {0}")]
    CycleDetected(String),

    /// Delete without force on a folder that still has children.
    #[error("folder {id} is not empty ({children} children)")]
    NonEmptyFolder { id: String, children: i64 },

    /// Underlying store failure, with the operation it happened in.
    #[error("persistence error in {context}: {message}")]
    Persistence { context: String, message: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl FolioError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        FolioError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Build a `ValidationFailed` error from a single field error.
    pub fn invalid(error: FieldError) -> Self {
        FolioError::ValidationFailed(ValidationErrors(vec![error]))
    }

    /// Build a `ValidationFailed` error if the list is non-empty.
    pub fn check(errors: Vec<FieldError>) -> Result<()> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(FolioError::ValidationFailed(ValidationErrors(errors)))
        }
    }
}

impl From<sqlx::Error> for FolioError {
    fn from(e: sqlx::Error) -> Self {
        FolioError::Persistence {
            context: "database".to_string(),
            message: e.to_string(),
        }
    }
}

/// Wrap a store error with the operation it occurred in.
///
/// ```ignore
/// sqlx::query("...").execute(pool).await.map_err(persistence("delete folder"))?;
/// ```
pub fn persistence(context: &'static str) -> impl FnOnce(sqlx::Error) -> FolioError {
    move |e| FolioError::Persistence {
        context: context.to_string(),
        message: e.to_string(),
    }
}

/// Like [`persistence`], but reports a unique-index violation as
/// `DuplicateName` carrying `name`.
pub fn persistence_or_duplicate(
    context: &'static str,
    name: impl Into<String>,
) -> impl FnOnce(sqlx::Error) -> FolioError {
    let name = name.into();
    move |e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            FolioError::DuplicateName(name)
        }
        other => persistence(context)(other),
    }
}

/// Result type alias for Folio operations.
pub type Result<T> = std::result::Result<T, FolioError>;
