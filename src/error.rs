//! Error taxonomy for the study-harness core.
//!
//! Every variant carries the offending identifier (subject name, field
//! name) so callers can report errors without reaching for internal
//! exception text. Entity-level validation failures are always surfaced
//! as [`Error::Validation`] naming the field; they never escape the
//! model boundary untranslated.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// An entity field failed its construction-time constraint.
    #[error("validation failed for field '{field}': {reason}")]
    Validation { field: String, reason: String },

    /// `create` would collide with an existing subject's folder slug.
    #[error("subject '{0}' already exists (folder slug collision)")]
    DuplicateSubject(String),

    /// The named subject is not registered in the subject index.
    #[error("subject '{0}' not found")]
    NotFound(String),

    /// An on-disk document failed parsing or re-validation. The store is
    /// never auto-repaired; the reason locates the bad field.
    #[error("stored document for subject '{subject}' is corrupt: {reason}")]
    CorruptStore { subject: String, reason: String },

    /// Writing the hierarchy document itself failed. The previous
    /// document is intact (writes are temp-then-rename).
    #[error("failed to write document for subject '{subject}'")]
    StoreWrite {
        subject: String,
        #[source]
        source: std::io::Error,
    },

    /// The hierarchy document was written but the knowledge-base re-sync
    /// failed. The document on disk is correct; the index is stale until
    /// the next successful save.
    #[error("index re-sync failed for subject '{subject}'; the saved document is valid but the index is stale")]
    IndexSync {
        subject: String,
        #[source]
        source: sqlx::Error,
    },

    /// An external collaborator (AI generation, rendering) failed.
    #[error("collaborator call failed during {operation}: {reason}")]
    Collaborator { operation: String, reason: String },

    /// An external collaborator exceeded its caller-supplied timeout.
    #[error("collaborator call '{operation}' exceeded its {seconds}s timeout")]
    CollaboratorTimeout { operation: String, seconds: u64 },
}

impl Error {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn corrupt(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::CorruptStore {
            subject: subject.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
