//! Connection bootstrap for the HR desk store.
//!
//! Review validation queries `employees` on every `employee_id` assignment,
//! and `reviews.employee_id` references `employees(id)`. Connections returned
//! here therefore guarantee both collaborator tables (`departments`,
//! `employees`) exist and foreign keys are enforced.
//!
//! # Invariants
//! - Collaborator schema version is tracked via `PRAGMA user_version`; a
//!   database written by a newer binary is refused rather than guessed at.
//! - `reviews` is not migrated here; `SqliteReviewRepository` creates and
//!   drops it.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
