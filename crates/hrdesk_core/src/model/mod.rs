//! Domain records for the HR core.
//!
//! # Invariants
//! - Record fields are private and mutated only through validating setters, so
//!   an in-memory record is valid for its whole lifetime.
//! - Store-assigned ids are written only by repositories.

pub mod review;
