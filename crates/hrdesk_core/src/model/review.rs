//! Performance review domain model.
//!
//! # Responsibility
//! - Define the review record and its field rules.
//! - Re-validate every field on every assignment, not only at construction.
//!
//! # Invariants
//! - `year >= MIN_REVIEW_YEAR`; any 64-bit year at or above it is accepted.
//! - `summary` is non-empty and stored trimmed.
//! - `employee_id` referenced an existing employee when it was assigned.
//! - `id` is `None` until the repository persists the review, and is reset to
//!   `None` when the repository deletes it.

use crate::repo::employee_lookup::{EmployeeId, EmployeeLookup};
use crate::repo::RepoResult;
use serde::Serialize;
use std::cell::RefCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// Store-assigned review primary key.
pub type ReviewId = i64;

/// Shared in-memory representative of one review.
///
/// The repository hands out the same handle for the same persisted row, so
/// `Rc::ptr_eq` is the identity check.
pub type ReviewHandle = Rc<RefCell<Review>>;

/// Earliest accepted review year.
pub const MIN_REVIEW_YEAR: i64 = 2000;

/// Field-level validation failure for a review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewValidationError {
    YearTooEarly { year: i64 },
    EmptySummary,
    UnknownEmployee(EmployeeId),
}

impl Display for ReviewValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::YearTooEarly { year } => {
                write!(f, "year must be {MIN_REVIEW_YEAR} or later, got {year}")
            }
            Self::EmptySummary => write!(f, "summary must be a non-empty string"),
            Self::UnknownEmployee(id) => {
                write!(f, "employee_id {id} must refer to a valid employee")
            }
        }
    }
}

impl Error for ReviewValidationError {}

/// One performance-review record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Review {
    id: Option<ReviewId>,
    year: i64,
    summary: String,
    employee_id: EmployeeId,
}

impl Review {
    /// Builds an unsaved review.
    ///
    /// Runs the same checks as the setters; the employee check queries
    /// `employees` once.
    pub fn new(
        year: i64,
        summary: &str,
        employee_id: EmployeeId,
        employees: &impl EmployeeLookup,
    ) -> RepoResult<Self> {
        Self::build(None, year, summary, employee_id, employees)
    }

    /// Builds a review that already carries a store id.
    ///
    /// Used for hydration; does not touch the `reviews` table.
    pub fn with_id(
        id: ReviewId,
        year: i64,
        summary: &str,
        employee_id: EmployeeId,
        employees: &impl EmployeeLookup,
    ) -> RepoResult<Self> {
        Self::build(Some(id), year, summary, employee_id, employees)
    }

    fn build(
        id: Option<ReviewId>,
        year: i64,
        summary: &str,
        employee_id: EmployeeId,
        employees: &impl EmployeeLookup,
    ) -> RepoResult<Self> {
        Ok(Self {
            id,
            year: validate_year(year)?,
            summary: validate_summary(summary)?,
            employee_id: validate_employee_id(employee_id, employees)?,
        })
    }

    /// Wraps this review into a shareable handle.
    pub fn into_handle(self) -> ReviewHandle {
        Rc::new(RefCell::new(self))
    }

    pub fn id(&self) -> Option<ReviewId> {
        self.id
    }

    pub fn year(&self) -> i64 {
        self.year
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn employee_id(&self) -> EmployeeId {
        self.employee_id
    }

    /// Returns whether the review has been persisted and not deleted since.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Sets the review year. The previous value is kept on error.
    pub fn set_year(&mut self, year: i64) -> Result<(), ReviewValidationError> {
        self.year = validate_year(year)?;
        Ok(())
    }

    /// Sets the summary, trimmed. The previous value is kept on error.
    pub fn set_summary(&mut self, summary: &str) -> Result<(), ReviewValidationError> {
        self.summary = validate_summary(summary)?;
        Ok(())
    }

    /// Sets the reviewed employee after checking it exists.
    pub fn set_employee_id(
        &mut self,
        employee_id: EmployeeId,
        employees: &impl EmployeeLookup,
    ) -> RepoResult<()> {
        self.employee_id = validate_employee_id(employee_id, employees)?;
        Ok(())
    }

    /// Replaces all data fields at once; nothing changes unless all are valid.
    pub(crate) fn refresh(
        &mut self,
        year: i64,
        summary: &str,
        employee_id: EmployeeId,
        employees: &impl EmployeeLookup,
    ) -> RepoResult<()> {
        let year = validate_year(year)?;
        let summary = validate_summary(summary)?;
        let employee_id = validate_employee_id(employee_id, employees)?;
        self.year = year;
        self.summary = summary;
        self.employee_id = employee_id;
        Ok(())
    }

    pub(crate) fn assign_id(&mut self, id: ReviewId) {
        self.id = Some(id);
    }

    pub(crate) fn clear_id(&mut self) {
        self.id = None;
    }
}

impl Display for Review {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.id {
            Some(id) => write!(f, "<Review {id}: ")?,
            None => write!(f, "<Review None: ")?,
        }
        write!(
            f,
            "{}, {}, Employee: {}>",
            self.year, self.summary, self.employee_id
        )
    }
}

fn validate_year(year: i64) -> Result<i64, ReviewValidationError> {
    if year < MIN_REVIEW_YEAR {
        return Err(ReviewValidationError::YearTooEarly { year });
    }
    Ok(year)
}

fn validate_summary(summary: &str) -> Result<String, ReviewValidationError> {
    let trimmed = summary.trim();
    if trimmed.is_empty() {
        return Err(ReviewValidationError::EmptySummary);
    }
    Ok(trimmed.to_string())
}

fn validate_employee_id(
    employee_id: EmployeeId,
    employees: &impl EmployeeLookup,
) -> RepoResult<EmployeeId> {
    if !employees.exists(employee_id)? {
        return Err(ReviewValidationError::UnknownEmployee(employee_id).into());
    }
    Ok(employee_id)
}
