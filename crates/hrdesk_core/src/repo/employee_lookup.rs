//! Employee existence checks used by review validation.
//!
//! The employee entity's own persistence lives outside this crate; reviews
//! only need to know whether an id is currently present.

use crate::repo::RepoResult;
use rusqlite::{Connection, OptionalExtension};

/// Employee primary key.
pub type EmployeeId = i64;

/// Capability to check that an employee row exists.
pub trait EmployeeLookup {
    fn exists(&self, id: EmployeeId) -> RepoResult<bool>;
}

/// Closures stand in for the store in unit tests.
impl<F> EmployeeLookup for F
where
    F: Fn(EmployeeId) -> bool,
{
    fn exists(&self, id: EmployeeId) -> RepoResult<bool> {
        Ok(self(id))
    }
}

/// Queries `employees` on a borrowed connection.
#[derive(Clone, Copy)]
pub struct SqliteEmployeeLookup<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEmployeeLookup<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl EmployeeLookup for SqliteEmployeeLookup<'_> {
    fn exists(&self, id: EmployeeId) -> RepoResult<bool> {
        let found = self
            .conn
            .query_row("SELECT id FROM employees WHERE id = ?1;", [id], |row| {
                row.get::<_, EmployeeId>(0)
            })
            .optional()?;
        Ok(found.is_some())
    }
}
