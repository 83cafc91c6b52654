mod common;

use common::{Fixture, JUSTIFICATION, MockDatabase, row};
use serde_json::json;
use warden_core::RejectionKind;
use warden_runtime::{ColumnInfo, RuntimeError};

fn user_rows(count: usize) -> Vec<warden_core::Row> {
    (0..count)
        .map(|i| {
            row(json!({
                "id": i,
                "email": format!("user{}@example.com", i),
                "password_hash": "5f4dcc3b5aa765d61d8327deb882cf99",
            }))
        })
        .collect()
}

#[tokio::test]
async fn test_delete_rejected_before_connection() {
    let fx = Fixture::new();

    let rejection = fx
        .orchestrator
        .read_query("DELETE FROM app_data.users", JUSTIFICATION)
        .await
        .unwrap()
        .unwrap_err();

    assert_eq!(rejection.kind, RejectionKind::ForbiddenStatementType);
    assert_eq!(fx.db.fetches(), 0);

    let entries = fx.audit.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "read_query");
    assert_eq!(entries[0].target, "DELETE FROM app_data.users");
}

#[tokio::test]
async fn test_stacked_statements_rejected() {
    let fx = Fixture::new();
    let rejection = fx
        .orchestrator
        .read_query("SELECT 1; DROP TABLE app_data.users", JUSTIFICATION)
        .await
        .unwrap()
        .unwrap_err();
    assert_eq!(rejection.kind, RejectionKind::BatchNotAllowed);
    assert_eq!(fx.db.fetches(), 0);
}

#[tokio::test]
async fn test_unlisted_table_rejected() {
    let fx = Fixture::new();
    let rejection = fx
        .orchestrator
        .read_query("SELECT * FROM app_data.secrets LIMIT 5", JUSTIFICATION)
        .await
        .unwrap()
        .unwrap_err();
    assert_eq!(rejection.kind, RejectionKind::TableNotAllowed);
    assert!(rejection.message.contains("app_data.secrets"));
    assert_eq!(fx.db.fetches(), 0);
}

#[tokio::test]
async fn test_restricted_columns_filtered() {
    let fx = Fixture::with_db(MockDatabase::with_rows(user_rows(3)));

    let result = fx
        .orchestrator
        .read_query("SELECT * FROM app_data.users LIMIT 3", JUSTIFICATION)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(result.rows, 3);
    assert_eq!(fx.db.fetches(), 1);
    for row in &result.data {
        assert!(!row.contains_key("password_hash"));
        assert!(row.contains_key("email"));
    }
}

#[tokio::test]
async fn test_join_merges_allowlists() {
    let rows = vec![row(json!({ "email": "a@x.io", "total": 1200, "cost": 300 }))];
    let fx = Fixture::with_db(MockDatabase::with_rows(rows));

    let result = fx
        .orchestrator
        .read_query(
            "SELECT u.email, o.total FROM app_data.users u JOIN app_data.orders o ON o.id = u.id LIMIT 10",
            JUSTIFICATION,
        )
        .await
        .unwrap()
        .unwrap();

    let keys: Vec<&str> = result.data[0].keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["email", "total"]);
}

#[tokio::test]
async fn test_aggregate_passes_without_limit() {
    let fx = Fixture::with_db(MockDatabase::with_rows(vec![row(json!({ "count": 42 }))]));

    let result = fx
        .orchestrator
        .read_query("SELECT count(*) FROM app_data.orders", JUSTIFICATION)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.data[0]["count"], 42);
}

#[tokio::test]
async fn test_overflow_is_rejected() {
    let wide: Vec<_> = (0..50)
        .map(|i| row(json!({ "id": i, "email": "x".repeat(20_000) })))
        .collect();
    let fx = Fixture::with_db(MockDatabase::with_rows(wide));

    let rejection = fx
        .orchestrator
        .read_query("SELECT id, email FROM app_data.users LIMIT 50", JUSTIFICATION)
        .await
        .unwrap()
        .unwrap_err();

    assert_eq!(rejection.kind, RejectionKind::ResultTooLarge);
    assert!(rejection.hint.contains("LIMIT"));
}

#[tokio::test]
async fn test_empty_result() {
    let fx = Fixture::new();
    let result = fx
        .orchestrator
        .read_query("SELECT id FROM app_data.users LIMIT 1", JUSTIFICATION)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.rows, 0);
    assert!(result.data.is_empty());
}

#[tokio::test]
async fn test_no_table_is_policy_missing() {
    let fx = Fixture::new();
    let rejection = fx
        .orchestrator
        .read_query("SELECT 1 LIMIT 1", JUSTIFICATION)
        .await
        .unwrap()
        .unwrap_err();
    assert_eq!(rejection.kind, RejectionKind::PolicyMissing);
    assert_eq!(fx.db.fetches(), 0);
}

#[tokio::test]
async fn test_database_failure_is_infrastructure_error() {
    let fx = Fixture::with_db(MockDatabase::failing());
    let result = fx
        .orchestrator
        .read_query("SELECT id FROM app_data.users LIMIT 1", JUSTIFICATION)
        .await;
    assert!(matches!(result, Err(RuntimeError::Database(_))));
}

#[tokio::test]
async fn test_describe_schema_intersects_live_columns() {
    let mut db = MockDatabase::default();
    db.columns.insert(
        "app_data.users".to_string(),
        vec![
            ColumnInfo {
                name: "id".to_string(),
                data_type: "integer".to_string(),
            },
            ColumnInfo {
                name: "email".to_string(),
                data_type: "text".to_string(),
            },
            ColumnInfo {
                name: "password_hash".to_string(),
                data_type: "text".to_string(),
            },
        ],
    );
    let fx = Fixture::with_db(db);

    let schema = fx.orchestrator.describe_schema().await.unwrap();

    // orders has no live columns, created_at is missing from the database.
    assert_eq!(schema.len(), 1);
    assert_eq!(schema[0].table, "app_data.users");
    let names: Vec<&str> = schema[0].columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["email", "id"]);
    assert_eq!(schema[0].columns[0].data_type, "text");
    assert_eq!(schema[0].columns[0].description, "Contact address");
}
