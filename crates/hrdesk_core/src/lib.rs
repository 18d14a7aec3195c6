//! Core persistence layer for the HR desk domain.
//!
//! Reviews are validated on every field assignment and persisted through a
//! repository that keeps one in-memory handle per stored row.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::review::{
    Review, ReviewHandle, ReviewId, ReviewValidationError, MIN_REVIEW_YEAR,
};
pub use repo::employee_lookup::{EmployeeId, EmployeeLookup, SqliteEmployeeLookup};
pub use repo::identity_cache::IdentityCache;
pub use repo::review_repo::SqliteReviewRepository;
pub use repo::{RepoError, RepoResult};
