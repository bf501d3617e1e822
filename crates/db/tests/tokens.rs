mod support;

use support::setup_db;

#[test]
fn lookup_resolves_valid_token() {
    let test_db = setup_db();
    let db = &test_db.db;
    db.insert_token("tok-1", "user-1", Some("laptop"), None, "2024-01-01T00:00:00Z")
        .expect("insert");

    let user = db
        .lookup_token("tok-1", "2024-06-01T00:00:00Z")
        .expect("lookup");
    assert_eq!(user.as_deref(), Some("user-1"));
}

#[test]
fn lookup_rejects_unknown_token() {
    let test_db = setup_db();
    let user = test_db
        .db
        .lookup_token("missing", "2024-06-01T00:00:00Z")
        .expect("lookup");
    assert!(user.is_none());
}

#[test]
fn lookup_rejects_expired_token() {
    let test_db = setup_db();
    let db = &test_db.db;
    db.insert_token(
        "tok-1",
        "user-1",
        None,
        Some("2024-02-01T00:00:00Z"),
        "2024-01-01T00:00:00Z",
    )
    .expect("insert");

    let before = db
        .lookup_token("tok-1", "2024-01-15T00:00:00Z")
        .expect("lookup before expiry");
    assert_eq!(before.as_deref(), Some("user-1"));

    let after = db
        .lookup_token("tok-1", "2024-02-01T00:00:00Z")
        .expect("lookup at expiry");
    assert!(after.is_none());
}

#[test]
fn revoke_removes_token() {
    let test_db = setup_db();
    let db = &test_db.db;
    db.insert_token("tok-1", "user-1", None, None, "2024-01-01T00:00:00Z")
        .expect("insert");

    assert!(db.revoke_token("tok-1").expect("revoke"));
    assert!(!db.revoke_token("tok-1").expect("revoke again"));
    let user = db
        .lookup_token("tok-1", "2024-06-01T00:00:00Z")
        .expect("lookup");
    assert!(user.is_none());
}

#[test]
fn cascade_delete_removes_daily_rows() {
    let mut test_db = setup_db();
    let db = &mut test_db.db;
    let days = support::days_from(&[support::make_event(
        "2024-01-01",
        "opencode",
        "m1",
        100,
        0.01,
    )]);
    db.upsert_submission("user-1", &days, "hash-1", "2024-01-02T00:00:00Z")
        .expect("upsert");
    assert_eq!(db.load_breakdowns("user-1").expect("load").len(), 1);

    db.delete_submission("user-1").expect("delete");
    assert!(db.load_breakdowns("user-1").expect("load").is_empty());
}
