//! Repository layer: entity managers and their collaborators.
//!
//! # Responsibility
//! - Keep SQL details inside the core persistence boundary.
//! - Own the per-session identity cache for hydrated records.
//!
//! # Invariants
//! - Every mutating call commits before returning.
//! - Store failures propagate unchanged; nothing is retried or downgraded.

use crate::db::DbError;
use crate::model::review::{ReviewId, ReviewValidationError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod employee_lookup;
pub mod identity_cache;
pub mod review_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for entity validation and persistence operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ReviewValidationError),
    Db(DbError),
    InvalidData(String),
    /// The caller holds a conflicting borrow of the review handle.
    HandleBusy { review_id: Option<ReviewId> },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::HandleBusy {
                review_id: Some(id),
            } => write!(f, "review {id} is already borrowed by the caller"),
            Self::HandleBusy { review_id: None } => {
                write!(f, "review handle is already borrowed by the caller")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
            Self::HandleBusy { .. } => None,
        }
    }
}

impl From<ReviewValidationError> for RepoError {
    fn from(value: ReviewValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
