mod common;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde_json::{json, Value};
use std::cell::Cell;
use userbase_core::db::open_db_in_memory;
use userbase_core::{
    default_registry, user_descriptor, ErrorKind, Record, ResourceService, ServiceError,
    SqliteTable, StorageTable, StoreResult, User, USER_TABLE,
};
use uuid::Uuid;

type UserService<'conn> = ResourceService<SqliteTable<'conn>>;

fn user_service(conn: &Connection) -> UserService<'_> {
    let table = SqliteTable::try_new(conn, USER_TABLE).unwrap();
    ResourceService::new(table, &default_registry(), user_descriptor()).unwrap()
}

fn seed(service: &UserService<'_>) -> Record {
    service
        .create(&json!({
            "email": "test@test.com",
            "firstName": "test",
            "lastName": "test",
        }))
        .unwrap()
}

fn id_of(record: &Record) -> String {
    record["id"].as_str().unwrap().to_string()
}

fn timestamp(record: &Record, field: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(record[field].as_str().unwrap())
        .unwrap()
        .with_timezone(&Utc)
}

fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@test.com", Uuid::new_v4().simple())
}

/// Pass-through table counting storage round-trips.
struct CountingTable<S> {
    inner: S,
    calls: Cell<usize>,
}

impl<S: StorageTable> CountingTable<S> {
    fn new(inner: S) -> Self {
        Self {
            inner,
            calls: Cell::new(0),
        }
    }

    fn hit(&self) {
        self.calls.set(self.calls.get() + 1);
    }
}

impl<S: StorageTable> StorageTable for CountingTable<S> {
    fn select_all(&self) -> StoreResult<Vec<Record>> {
        self.hit();
        self.inner.select_all()
    }

    fn select_by_id(&self, id: &str) -> StoreResult<Vec<Record>> {
        self.hit();
        self.inner.select_by_id(id)
    }

    fn insert_returning(&self, values: &Record) -> StoreResult<Record> {
        self.hit();
        self.inner.insert_returning(values)
    }

    fn update_by_id_returning(&self, id: &str, values: &Record) -> StoreResult<Vec<Record>> {
        self.hit();
        self.inner.update_by_id_returning(id, values)
    }

    fn delete_by_id_returning(&self, id: &str) -> StoreResult<Vec<Record>> {
        self.hit();
        self.inner.delete_by_id_returning(id)
    }
}

#[test]
fn find_returns_every_user() {
    let conn = open_db_in_memory().unwrap();
    let service = user_service(&conn);
    let seeded = seed(&service);

    assert_eq!(service.find().unwrap(), vec![seeded]);
}

#[test]
fn get_returns_user_by_id() {
    let conn = open_db_in_memory().unwrap();
    let service = user_service(&conn);
    let seeded = seed(&service);

    assert_eq!(service.get(&id_of(&seeded)).unwrap(), seeded);
}

#[test]
fn get_with_empty_id_is_rejected_before_any_query() {
    let conn = open_db_in_memory().unwrap();
    let table = CountingTable::new(SqliteTable::try_new(&conn, USER_TABLE).unwrap());
    let service = ResourceService::new(table, &default_registry(), user_descriptor()).unwrap();

    let err = service.get("").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(err.code(), "ARG_INVALID_USER_ID");
    assert_eq!(service.storage().calls.get(), 0);
}

#[test]
fn get_unknown_id_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = user_service(&conn);
    let id = Uuid::new_v4().to_string();

    let err = service.get(&id).unwrap_err();
    assert_eq!(
        err,
        ServiceError::NotFound {
            code: "USER_NOT_FOUND".to_string(),
            id,
        }
    );
}

#[test]
fn get_storage_failure_is_internal_and_logged() {
    common::capture_logs();
    let conn = open_db_in_memory().unwrap();
    let service = user_service(&conn);
    let id = id_of(&seed(&service));
    conn.execute_batch("DROP TABLE users;").unwrap();

    let err = service.get(&id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(err.code(), "DB_ERROR_GET_USER");
    assert!(!err.to_string().contains("no such table"));

    let lines = common::error_lines_with(&["event=user_get", &id]);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("no such table"));
}

#[test]
fn create_returns_generated_fields() {
    let conn = open_db_in_memory().unwrap();
    let service = user_service(&conn);

    let created = service.create(&json!({ "email": "a@b.com" })).unwrap();

    assert!(Uuid::parse_str(&id_of(&created)).is_ok());
    assert_eq!(created["email"], json!("a@b.com"));
    assert_eq!(created["firstName"], Value::Null);
    assert_eq!(created["lastName"], Value::Null);
    assert_eq!(
        timestamp(&created, "createdAt"),
        timestamp(&created, "updatedAt")
    );

    let user = User::from_record(created).unwrap();
    assert_eq!(user.email, "a@b.com");
}

#[test]
fn create_without_email_lists_the_missing_field() {
    let conn = open_db_in_memory().unwrap();
    let service = user_service(&conn);

    let err = service.create(&json!({})).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(err.code(), "ARG_INVALID_USER_PAYLOAD");
    assert!(err.violations().iter().any(|v| v.field == "email"));
    assert!(service.find().unwrap().is_empty());
}

#[test]
fn create_with_duplicate_email_is_internal_and_logged() {
    common::capture_logs();
    let conn = open_db_in_memory().unwrap();
    let service = user_service(&conn);
    let email = unique_email("dup");
    service.create(&json!({ "email": email })).unwrap();

    let err = service.create(&json!({ "email": email })).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(err.code(), "DB_ERROR_CREATE_USER");
    assert!(err.violations().is_empty());

    let lines = common::error_lines_with(&["event=user_create", &email]);
    assert_eq!(lines.len(), 1);
    assert_eq!(service.find().unwrap().len(), 1);
}

#[test]
fn update_replaces_the_whole_record() {
    let conn = open_db_in_memory().unwrap();
    let service = user_service(&conn);
    let seeded = seed(&service);
    let id = id_of(&seeded);

    let updated = service
        .update(&id, &json!({ "email": "newEmail@email.com" }))
        .unwrap();

    assert_eq!(updated["id"], seeded["id"]);
    assert_eq!(updated["email"], json!("newEmail@email.com"));
    assert_eq!(updated["firstName"], Value::Null);
    assert_eq!(updated["lastName"], Value::Null);
    assert_eq!(updated["createdAt"], seeded["createdAt"]);
    assert!(timestamp(&updated, "updatedAt") > timestamp(&seeded, "updatedAt"));
    assert_eq!(service.get(&id).unwrap(), updated);
}

#[test]
fn update_keeps_supplied_optional_fields() {
    let conn = open_db_in_memory().unwrap();
    let service = user_service(&conn);
    let id = id_of(&seed(&service));

    let updated = service
        .update(&id, &json!({ "email": "x@y.com", "lastName": "Lee" }))
        .unwrap();

    assert_eq!(updated["firstName"], Value::Null);
    assert_eq!(updated["lastName"], json!("Lee"));
}

#[test]
fn update_rejects_invalid_payload() {
    let conn = open_db_in_memory().unwrap();
    let service = user_service(&conn);

    let err = service
        .update(&Uuid::new_v4().to_string(), &json!({ "email": "not valid" }))
        .unwrap_err();
    assert_eq!(err.code(), "ARG_INVALID_USER_PAYLOAD");
}

#[test]
fn update_unknown_id_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = user_service(&conn);

    let err = service
        .update(&Uuid::new_v4().to_string(), &json!({ "email": "test@test.com" }))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn patch_only_touches_supplied_fields() {
    let conn = open_db_in_memory().unwrap();
    let service = user_service(&conn);
    let seeded = seed(&service);

    let patched = service
        .patch(&id_of(&seeded), &json!({ "firstName": "some new name" }))
        .unwrap();

    assert_eq!(patched["id"], seeded["id"]);
    assert_eq!(patched["email"], seeded["email"]);
    assert_eq!(patched["firstName"], json!("some new name"));
    assert_eq!(patched["lastName"], seeded["lastName"]);
    assert_eq!(patched["createdAt"], seeded["createdAt"]);
    assert!(timestamp(&patched, "updatedAt") > timestamp(&seeded, "updatedAt"));
}

#[test]
fn patch_can_clear_a_nullable_field() {
    let conn = open_db_in_memory().unwrap();
    let service = user_service(&conn);
    let seeded = seed(&service);

    let patched = service
        .patch(&id_of(&seeded), &json!({ "lastName": null }))
        .unwrap();
    assert_eq!(patched["lastName"], Value::Null);
    assert_eq!(patched["firstName"], seeded["firstName"]);
}

#[test]
fn patch_unknown_id_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = user_service(&conn);

    let err = service
        .patch(&Uuid::new_v4().to_string(), &json!({ "email": "test@test.com" }))
        .unwrap_err();
    assert_eq!(err.code(), "USER_NOT_FOUND");
}

#[test]
fn failed_patch_leaves_the_row_untouched() {
    common::capture_logs();
    let conn = open_db_in_memory().unwrap();
    let service = user_service(&conn);
    let taken = unique_email("taken");
    service.create(&json!({ "email": taken })).unwrap();
    let other = service
        .create(&json!({ "email": "other@test.com", "firstName": "Bo" }))
        .unwrap();
    let id = id_of(&other);

    let err = service
        .patch(&id, &json!({ "email": taken, "firstName": "Changed" }))
        .unwrap_err();

    assert_eq!(err.code(), "DB_ERROR_PATCH_USER");
    assert_eq!(service.get(&id).unwrap(), other);
    assert_eq!(
        common::error_lines_with(&["event=user_patch", &id]).len(),
        1
    );
}

#[test]
fn updated_at_strictly_increases_across_writes() {
    let conn = open_db_in_memory().unwrap();
    let service = user_service(&conn);
    let seeded = seed(&service);
    let id = id_of(&seeded);
    let created_at = seeded["createdAt"].clone();

    let mut previous = timestamp(&seeded, "updatedAt");
    for round in 0..5 {
        let row = if round % 2 == 0 {
            service.patch(&id, &json!({ "firstName": format!("n{round}") }))
        } else {
            service.update(&id, &json!({ "email": "test@test.com" }))
        }
        .unwrap();

        let current = timestamp(&row, "updatedAt");
        assert!(current > previous, "round {round} did not advance updatedAt");
        assert_eq!(row["createdAt"], created_at);
        previous = current;
    }
}

#[test]
fn remove_returns_the_removed_row() {
    let conn = open_db_in_memory().unwrap();
    let service = user_service(&conn);
    let seeded = seed(&service);
    let id = id_of(&seeded);

    assert_eq!(service.remove(&id).unwrap(), seeded);
    assert_eq!(service.get(&id).unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(service.remove(&id).unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn remove_with_empty_id_is_invalid_argument() {
    let conn = open_db_in_memory().unwrap();
    let service = user_service(&conn);

    assert_eq!(service.remove("").unwrap_err().code(), "ARG_INVALID_USER_ID");
}

#[test]
fn storage_columns_use_snake_case() {
    let conn = open_db_in_memory().unwrap();
    let service = user_service(&conn);
    let id = id_of(
        &service
            .create(&json!({ "email": "a@b.com", "firstName": "Ann" }))
            .unwrap(),
    );

    let first_name: String = conn
        .query_row("SELECT first_name FROM users WHERE id = ?1;", [&id], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(first_name, "Ann");
}

#[test]
fn create_patch_remove_scenario() {
    let conn = open_db_in_memory().unwrap();
    let service = user_service(&conn);

    let created = service.create(&json!({ "email": "a@b.com" })).unwrap();
    let id = id_of(&created);
    assert_eq!(created["firstName"], Value::Null);
    assert_eq!(created["lastName"], Value::Null);

    let patched = service.patch(&id, &json!({ "firstName": "Ann" })).unwrap();
    assert_eq!(patched["firstName"], json!("Ann"));
    assert_eq!(patched["email"], created["email"]);
    assert_eq!(patched["createdAt"], created["createdAt"]);
    assert!(timestamp(&patched, "updatedAt") > timestamp(&created, "updatedAt"));

    let removed = service.remove(&id).unwrap();
    assert_eq!(removed, patched);
    assert_eq!(service.get(&id).unwrap_err().code(), "USER_NOT_FOUND");
}
