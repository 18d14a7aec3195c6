//! Review entity manager backed by SQLite.
//!
//! # Responsibility
//! - Own the `reviews` table schema (create/drop).
//! - Provide CRUD and lookup operations for reviews.
//! - Keep the identity cache in step with store writes and reads.
//!
//! # Invariants
//! - Repeated reads of the same row yield the same `ReviewHandle`.
//! - Reads refresh a cached handle in place, overwriting unsaved edits.
//! - `save`/`update`/`delete` on an unsaved review never reach the store
//!   except for `save`'s insert.

use crate::model::review::{Review, ReviewHandle, ReviewId};
use crate::repo::employee_lookup::{EmployeeId, EmployeeLookup, SqliteEmployeeLookup};
use crate::repo::identity_cache::IdentityCache;
use crate::repo::{RepoError, RepoResult};
use log::{debug, info, warn};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, Params, Row};
use std::cell::{Ref, RefMut};

const REVIEW_SELECT_SQL: &str = "SELECT id, year, summary, employee_id FROM reviews";

/// Raw `reviews` row, decoded but not yet validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReviewRow {
    pub(crate) id: ReviewId,
    pub(crate) year: i64,
    pub(crate) summary: String,
    pub(crate) employee_id: EmployeeId,
}

/// SQLite-backed review repository.
///
/// The identity cache lives as long as the repository, so one repository
/// instance corresponds to one storage session.
///
/// Writes are committed by SQLite autocommit. Inside a transaction the caller
/// opened with `BEGIN`, they stay pending until the caller commits.
///
/// Operations that read or refresh a handle return `RepoError::HandleBusy`
/// instead of panicking when the caller holds a conflicting borrow of it.
pub struct SqliteReviewRepository<'conn, L = SqliteEmployeeLookup<'conn>> {
    conn: &'conn Connection,
    employees: L,
    cache: IdentityCache<Review>,
}

impl<'conn> SqliteReviewRepository<'conn> {
    /// Creates a repository that validates employees against the same
    /// connection.
    pub fn new(conn: &'conn Connection) -> Self {
        Self::with_lookup(conn, SqliteEmployeeLookup::new(conn))
    }
}

impl<'conn, L: EmployeeLookup> SqliteReviewRepository<'conn, L> {
    /// Creates a repository with an injected employee lookup.
    pub fn with_lookup(conn: &'conn Connection, employees: L) -> Self {
        Self {
            conn,
            employees,
            cache: IdentityCache::new(),
        }
    }

    /// Lookup used for `employee_id` validation; pass it to
    /// `Review::set_employee_id`.
    pub fn employees(&self) -> &L {
        &self.employees
    }

    pub fn cache(&self) -> &IdentityCache<Review> {
        &self.cache
    }

    /// Creates the `reviews` table when absent.
    pub fn create_table(&self) -> RepoResult<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS reviews (
                id INTEGER PRIMARY KEY,
                year INT,
                summary TEXT,
                employee_id INTEGER,
                FOREIGN KEY (employee_id) REFERENCES employees(id)
            );",
        )?;
        info!("event=review_create_table module=repo status=ok");
        Ok(())
    }

    /// Drops the `reviews` table when present and forgets all cached reviews.
    pub fn drop_table(&mut self) -> RepoResult<()> {
        self.conn.execute_batch("DROP TABLE IF EXISTS reviews;")?;
        self.cache.clear();
        info!("event=review_drop_table module=repo status=ok");
        Ok(())
    }

    /// Builds an unsaved review validated against this repository's lookup.
    pub fn new_review(
        &self,
        year: i64,
        summary: &str,
        employee_id: EmployeeId,
    ) -> RepoResult<ReviewHandle> {
        Review::new(year, summary, employee_id, &self.employees).map(Review::into_handle)
    }

    /// Builds and saves a review in one step.
    pub fn create(
        &mut self,
        year: i64,
        summary: &str,
        employee_id: EmployeeId,
    ) -> RepoResult<ReviewHandle> {
        let review = self.new_review(year, summary, employee_id)?;
        self.save(&review)?;
        Ok(review)
    }

    /// Inserts an unsaved review, or updates a saved one.
    ///
    /// On insert the store-assigned id is written back and the handle is
    /// registered in the identity cache.
    pub fn save(&mut self, review: &ReviewHandle) -> RepoResult<()> {
        if read_handle(review)?.is_persisted() {
            return self.update(review);
        }

        let mut record = write_handle(review, None)?;
        self.conn.execute(
            "INSERT INTO reviews (year, summary, employee_id) VALUES (?1, ?2, ?3);",
            params![record.year(), record.summary(), record.employee_id()],
        )?;
        let id = self.conn.last_insert_rowid();
        record.assign_id(id);
        drop(record);

        self.cache.register(id, review);
        info!("event=review_save module=repo status=ok op=insert review_id={id}");
        Ok(())
    }

    /// Writes current field values to the row with the review's id.
    ///
    /// Silently does nothing for an unsaved review.
    pub fn update(&self, review: &ReviewHandle) -> RepoResult<()> {
        let record = read_handle(review)?;
        let Some(id) = record.id() else {
            return Ok(());
        };

        let changed = self.conn.execute(
            "UPDATE reviews SET year = ?1, summary = ?2, employee_id = ?3 WHERE id = ?4;",
            params![record.year(), record.summary(), record.employee_id(), id],
        )?;

        if changed == 0 {
            warn!("event=review_update module=repo status=missing review_id={id}");
        } else {
            info!("event=review_update module=repo status=ok review_id={id}");
        }
        Ok(())
    }

    /// Deletes the review's row, evicts it from the cache, and clears its id.
    ///
    /// Silently does nothing for an unsaved review. The record stays usable
    /// and can be saved again as a new row.
    pub fn delete(&mut self, review: &ReviewHandle) -> RepoResult<()> {
        let id = read_handle(review)?.id();
        let Some(id) = id else {
            return Ok(());
        };

        let mut record = write_handle(review, Some(id))?;
        self.conn.execute("DELETE FROM reviews WHERE id = ?1;", [id])?;
        self.cache.evict(id);
        record.clear_id();
        info!("event=review_delete module=repo status=ok review_id={id}");
        Ok(())
    }

    /// Loads one review by primary key.
    pub fn find_by_id(&mut self, id: ReviewId) -> RepoResult<Option<ReviewHandle>> {
        let row = self
            .select_rows(&format!("{REVIEW_SELECT_SQL} WHERE id = ?1;"), [id])?
            .into_iter()
            .next();
        debug!(
            "event=review_find module=repo status=ok review_id={id} found={}",
            row.is_some()
        );
        self.instance_from_db(row)
    }

    /// Loads every review, ordered by id.
    pub fn get_all(&mut self) -> RepoResult<Vec<ReviewHandle>> {
        let rows = self.select_rows(&format!("{REVIEW_SELECT_SQL} ORDER BY id;"), [])?;
        debug!("event=review_list module=repo status=ok count={}", rows.len());

        let mut reviews = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(review) = self.instance_from_db(Some(row))? {
                reviews.push(review);
            }
        }
        Ok(reviews)
    }

    /// Turns a stored row into the session's handle for that row.
    ///
    /// A cached handle is refreshed in place (all fields re-validated,
    /// including the employee check) and returned; otherwise a new handle is
    /// built and registered. `None` maps to `None`.
    pub(crate) fn instance_from_db(
        &mut self,
        row: Option<ReviewRow>,
    ) -> RepoResult<Option<ReviewHandle>> {
        let Some(row) = row else {
            return Ok(None);
        };

        if let Some(cached) = self.cache.get(row.id) {
            write_handle(&cached, Some(row.id))?.refresh(
                row.year,
                &row.summary,
                row.employee_id,
                &self.employees,
            )?;
            return Ok(Some(cached));
        }

        let review = Review::with_id(
            row.id,
            row.year,
            &row.summary,
            row.employee_id,
            &self.employees,
        )?
        .into_handle();
        self.cache.register(row.id, &review);
        Ok(Some(review))
    }

    fn select_rows(&self, sql: &str, params: impl Params) -> RepoResult<Vec<ReviewRow>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut decoded = Vec::new();
        while let Some(row) = rows.next()? {
            decoded.push(parse_review_row(row)?);
        }
        Ok(decoded)
    }
}

fn read_handle(review: &ReviewHandle) -> RepoResult<Ref<'_, Review>> {
    review
        .try_borrow()
        .map_err(|_| RepoError::HandleBusy { review_id: None })
}

fn write_handle(review: &ReviewHandle, id: Option<ReviewId>) -> RepoResult<RefMut<'_, Review>> {
    review
        .try_borrow_mut()
        .map_err(|_| RepoError::HandleBusy { review_id: id })
}

fn parse_review_row(row: &Row<'_>) -> RepoResult<ReviewRow> {
    let id: ReviewId = row.get("id")?;

    let year = match row.get_ref("year")? {
        ValueRef::Integer(value) => value,
        other => {
            return Err(RepoError::InvalidData(format!(
                "non-integer {:?} value in reviews.year (id {id})",
                other.data_type()
            )));
        }
    };

    let summary = match row.get_ref("summary")? {
        ValueRef::Text(bytes) => String::from_utf8(bytes.to_vec()).map_err(|_| {
            RepoError::InvalidData(format!("invalid utf-8 in reviews.summary (id {id})"))
        })?,
        other => {
            return Err(RepoError::InvalidData(format!(
                "non-text {:?} value in reviews.summary (id {id})",
                other.data_type()
            )));
        }
    };

    let employee_id = match row.get_ref("employee_id")? {
        ValueRef::Integer(value) => value,
        other => {
            return Err(RepoError::InvalidData(format!(
                "non-integer {:?} value in reviews.employee_id (id {id})",
                other.data_type()
            )));
        }
    };

    Ok(ReviewRow {
        id,
        year,
        summary,
        employee_id,
    })
}
