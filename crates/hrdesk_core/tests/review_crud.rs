use hrdesk_core::{
    open_db_in_memory, RepoError, Review, ReviewValidationError, SqliteReviewRepository,
};
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::rc::Rc;

fn seeded_conn() -> Connection {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO departments (id, name, location) VALUES (1, 'Payroll', 'Building A');
         INSERT INTO employees (id, name, job_title, department_id)
            VALUES (1, 'Lee', 'Manager', 1), (2, 'Sasha', 'Accountant', 1), (3, 'Kai', 'Clerk', 1);",
    )
    .unwrap();
    conn
}

fn review_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM reviews;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn create_trims_summary_and_delete_makes_row_unreachable() {
    let conn = seeded_conn();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();

    let review = repo.create(2021, "  Solid year  ", 3).unwrap();
    let id = review.borrow().id().unwrap();
    assert_eq!(review.borrow().summary(), "Solid year");

    repo.delete(&review).unwrap();
    assert!(repo.find_by_id(id).unwrap().is_none());
    assert_eq!(review.borrow().id(), None);
    assert!(!repo.cache().contains(id));
}

#[test]
fn find_by_id_returns_same_handle_as_create() {
    let conn = seeded_conn();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();

    let created = repo.create(2022, "Good work", 1).unwrap();
    let id = created.borrow().id().unwrap();

    let found = repo.find_by_id(id).unwrap().unwrap();
    assert!(Rc::ptr_eq(&created, &found));
    let found = found.borrow();
    assert_eq!(found.year(), 2022);
    assert_eq!(found.summary(), "Good work");
    assert_eq!(found.employee_id(), 1);
}

#[test]
fn find_by_id_hydrates_rows_written_outside_the_repository() {
    let conn = seeded_conn();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();
    conn.execute(
        "INSERT INTO reviews (id, year, summary, employee_id) VALUES (40, 2019, 'Imported', 2);",
        [],
    )
    .unwrap();

    let review = repo.find_by_id(40).unwrap().unwrap();
    assert_eq!(review.borrow().id(), Some(40));
    assert_eq!(review.borrow().employee_id(), 2);
    assert!(repo.cache().contains(40));
    assert!(repo.find_by_id(41).unwrap().is_none());
}

#[test]
fn save_inserts_once_then_updates() {
    let conn = seeded_conn();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();

    let review = repo.new_review(2023, "Draft", 2).unwrap();
    assert_eq!(review.borrow().id(), None);

    repo.save(&review).unwrap();
    let id = review.borrow().id().unwrap();
    assert_eq!(review_count(&conn), 1);

    review.borrow_mut().set_summary("Final").unwrap();
    repo.save(&review).unwrap();
    assert_eq!(review_count(&conn), 1);
    assert_eq!(review.borrow().id(), Some(id));

    let stored: String = conn
        .query_row("SELECT summary FROM reviews WHERE id = ?1;", [id], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(stored, "Final");
}

#[test]
fn update_persists_mutations_and_ignores_unsaved_reviews() {
    let conn = seeded_conn();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();

    let review = repo.create(2020, "Steady", 1).unwrap();
    {
        let mut record = review.borrow_mut();
        record.set_year(2024).unwrap();
        record.set_employee_id(3, repo.employees()).unwrap();
    }
    repo.update(&review).unwrap();

    let id = review.borrow().id().unwrap();
    let (year, employee_id): (i64, i64) = conn
        .query_row(
            "SELECT year, employee_id FROM reviews WHERE id = ?1;",
            [id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!((year, employee_id), (2024, 3));

    let unsaved = repo.new_review(2024, "Never stored", 1).unwrap();
    repo.update(&unsaved).unwrap();
    repo.delete(&unsaved).unwrap();
    assert_eq!(review_count(&conn), 1);
    assert_eq!(unsaved.borrow().id(), None);
}

#[test]
fn deleted_review_can_be_saved_again_as_new_row() {
    let conn = seeded_conn();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();

    let review = repo.create(2022, "Round one", 2).unwrap();
    let first_id = review.borrow().id().unwrap();
    repo.delete(&review).unwrap();
    assert_eq!(review_count(&conn), 0);

    repo.save(&review).unwrap();
    let second_id = review.borrow().id().unwrap();
    assert_eq!(review_count(&conn), 1);
    assert!(repo.cache().contains(second_id));
    if second_id != first_id {
        assert!(!repo.cache().contains(first_id));
    }
}

#[test]
fn get_all_returns_one_distinct_handle_per_row() {
    let conn = seeded_conn();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();

    let created = [
        repo.create(2020, "One", 1).unwrap(),
        repo.create(2021, "Two", 2).unwrap(),
        repo.create(2022, "Three", 3).unwrap(),
    ];

    let all = repo.get_all().unwrap();
    assert_eq!(all.len(), created.len());
    for (loaded, original) in all.iter().zip(created.iter()) {
        assert!(Rc::ptr_eq(loaded, original));
    }

    let ids: HashSet<_> = all.iter().map(|review| review.borrow().id()).collect();
    assert_eq!(ids.len(), 3);
}

#[test]
fn lookup_overwrites_unsaved_changes_on_cached_handle() {
    let conn = seeded_conn();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();

    let review = repo.create(2021, "Stored", 1).unwrap();
    let id = review.borrow().id().unwrap();
    review.borrow_mut().set_summary("Unsaved edit").unwrap();

    repo.find_by_id(id).unwrap();
    assert_eq!(review.borrow().summary(), "Stored");
}

#[test]
fn lookup_refreshes_cached_handle_from_external_writes() {
    let conn = seeded_conn();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();

    let review = repo.create(2021, "Before", 1).unwrap();
    let id = review.borrow().id().unwrap();
    conn.execute(
        "UPDATE reviews SET summary = 'After', employee_id = 2 WHERE id = ?1;",
        [id],
    )
    .unwrap();

    let all = repo.get_all().unwrap();
    assert!(Rc::ptr_eq(&all[0], &review));
    assert_eq!(review.borrow().summary(), "After");
    assert_eq!(review.borrow().employee_id(), 2);
}

#[test]
fn validation_rejects_bad_fields_before_touching_the_store() {
    let conn = seeded_conn();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();

    let year_err = repo.create(1999, "Too early", 1).unwrap_err();
    assert!(matches!(
        year_err,
        RepoError::Validation(ReviewValidationError::YearTooEarly { year: 1999 })
    ));

    let summary_err = repo.create(2022, "   ", 1).unwrap_err();
    assert!(matches!(
        summary_err,
        RepoError::Validation(ReviewValidationError::EmptySummary)
    ));

    let employee_err = repo.create(2022, "Ghost", 77).unwrap_err();
    assert!(matches!(
        employee_err,
        RepoError::Validation(ReviewValidationError::UnknownEmployee(77))
    ));

    assert_eq!(review_count(&conn), 0);
    assert!(repo.cache().is_empty());
}

#[test]
fn setting_employee_to_existing_row_succeeds_after_it_is_added() {
    let conn = seeded_conn();
    let repo = SqliteReviewRepository::new(&conn);

    let mut review = Review::new(2022, "Pending", 1, repo.employees()).unwrap();
    assert!(review.set_employee_id(9, repo.employees()).is_err());

    conn.execute(
        "INSERT INTO employees (id, name, job_title) VALUES (9, 'Noor', 'Analyst');",
        [],
    )
    .unwrap();
    review.set_employee_id(9, repo.employees()).unwrap();
    assert_eq!(review.employee_id(), 9);
}

#[test]
fn hydration_rejects_rows_that_violate_field_rules() {
    let conn = seeded_conn();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();
    conn.execute(
        "INSERT INTO reviews (id, year, summary, employee_id) VALUES (?1, ?2, ?3, ?4);",
        params![5, 1995, "Old", 1],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO reviews (id, year, summary, employee_id) VALUES (6, 'soon', 'Text year', 1);",
        [],
    )
    .unwrap();

    assert!(matches!(
        repo.find_by_id(5).unwrap_err(),
        RepoError::Validation(ReviewValidationError::YearTooEarly { year: 1995 })
    ));
    assert!(matches!(
        repo.find_by_id(6).unwrap_err(),
        RepoError::InvalidData(_)
    ));
}

#[test]
fn table_operations_are_idempotent_and_drop_clears_cache() {
    let conn = seeded_conn();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();
    repo.create_table().unwrap();

    repo.create(2022, "Cached", 1).unwrap();
    assert_eq!(repo.cache().len(), 1);

    repo.drop_table().unwrap();
    repo.drop_table().unwrap();
    assert!(repo.cache().is_empty());

    assert!(matches!(repo.get_all().unwrap_err(), RepoError::Db(_)));
}

#[test]
fn store_errors_propagate_from_missing_table() {
    let conn = seeded_conn();
    let mut repo = SqliteReviewRepository::new(&conn);

    let err = repo.create(2022, "No table yet", 1).unwrap_err();
    assert!(matches!(err, RepoError::Db(_)));
}

#[test]
fn review_serializes_with_record_field_names() {
    let conn = seeded_conn();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();

    let review = repo.create(2022, "Good work", 2).unwrap();
    let id = review.borrow().id().unwrap();

    let json = serde_json::to_value(&*review.borrow()).unwrap();
    assert_eq!(json["id"], id);
    assert_eq!(json["year"], 2022);
    assert_eq!(json["summary"], "Good work");
    assert_eq!(json["employee_id"], 2);
}

#[test]
fn lookups_report_busy_handle_instead_of_panicking() {
    let conn = seeded_conn();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();

    let review = repo.create(2022, "Held", 1).unwrap();
    let id = review.borrow().id().unwrap();

    let reader = review.borrow();
    assert!(matches!(
        repo.find_by_id(id).unwrap_err(),
        RepoError::HandleBusy { review_id: Some(busy) } if busy == id
    ));
    assert!(matches!(
        repo.get_all().unwrap_err(),
        RepoError::HandleBusy { .. }
    ));
    assert_eq!(reader.summary(), "Held");
    drop(reader);

    let found = repo.find_by_id(id).unwrap().unwrap();
    assert!(Rc::ptr_eq(&found, &review));
}

#[test]
fn writes_report_busy_handle_before_touching_the_store() {
    let conn = seeded_conn();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();

    let unsaved = repo.new_review(2023, "Pending", 2).unwrap();
    let reader = unsaved.borrow();
    assert!(matches!(
        repo.save(&unsaved).unwrap_err(),
        RepoError::HandleBusy { review_id: None }
    ));
    drop(reader);
    assert_eq!(review_count(&conn), 0);
    assert_eq!(unsaved.borrow().id(), None);

    let saved = repo.create(2023, "Stored", 2).unwrap();
    let writer = saved.borrow_mut();
    assert!(matches!(
        repo.update(&saved).unwrap_err(),
        RepoError::HandleBusy { .. }
    ));
    assert!(matches!(
        repo.delete(&saved).unwrap_err(),
        RepoError::HandleBusy { .. }
    ));
    drop(writer);
    assert_eq!(review_count(&conn), 1);

    let busy = RepoError::HandleBusy { review_id: Some(5) };
    assert_eq!(busy.to_string(), "review 5 is already borrowed by the caller");
}

#[test]
fn get_all_on_empty_table_returns_nothing() {
    let conn = seeded_conn();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();

    assert!(repo.get_all().unwrap().is_empty());
    assert!(repo.cache().is_empty());
}

#[test]
fn delete_handles_reviews_built_outside_the_cache() {
    let conn = seeded_conn();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();
    conn.execute(
        "INSERT INTO reviews (id, year, summary, employee_id) VALUES (7, 2021, 'Loose', 1);",
        [],
    )
    .unwrap();

    let review = Review::with_id(7, 2021, "Loose", 1, repo.employees())
        .unwrap()
        .into_handle();
    assert!(!repo.cache().contains(7));

    repo.delete(&review).unwrap();
    assert_eq!(review.borrow().id(), None);
    assert_eq!(review_count(&conn), 0);
    assert!(repo.cache().is_empty());
}

#[test]
fn years_beyond_32_bits_round_trip() {
    let conn = seeded_conn();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();
    conn.execute(
        "INSERT INTO reviews (id, year, summary, employee_id) VALUES (8, 3000000000, 'Far future', 1);",
        [],
    )
    .unwrap();

    let review = repo.find_by_id(8).unwrap().unwrap();
    assert_eq!(review.borrow().year(), 3_000_000_000);

    let created = repo.create(4_000_000_000, "Further", 2).unwrap();
    let id = created.borrow().id().unwrap();
    let stored: i64 = conn
        .query_row("SELECT year FROM reviews WHERE id = ?1;", [id], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(stored, 4_000_000_000);
}

#[test]
fn writes_inside_caller_transaction_wait_for_caller_commit() {
    let conn = seeded_conn();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();

    conn.execute_batch("BEGIN;").unwrap();
    repo.create(2022, "Pending commit", 1).unwrap();
    assert!(!conn.is_autocommit());
    conn.execute_batch("ROLLBACK;").unwrap();
    assert_eq!(review_count(&conn), 0);

    repo.create(2022, "Committed", 1).unwrap();
    assert!(conn.is_autocommit());
    assert_eq!(review_count(&conn), 1);
}
