use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use warden_audit::{AuditLogger, MemoryStorage};
use warden_core::{AllowlistConfig, AuditConfig, McpConfig, Row, TableReference, WardenConfig};
use warden_mcp::{JsonRpcRequest, McpServer, create_router};
use warden_runtime::{ColumnInfo, Orchestrator, ReadOnlyDatabase};

const JUSTIFICATION: &str = "Checking which orders are still pending shipment";

struct StaticDatabase {
    rows: Vec<Row>,
}

#[async_trait]
impl ReadOnlyDatabase for StaticDatabase {
    async fn fetch(&self, _sql: &str) -> anyhow::Result<Vec<Row>> {
        Ok(self.rows.clone())
    }

    async fn columns(&self, table: &TableReference) -> anyhow::Result<Vec<ColumnInfo>> {
        if table.name != "orders" {
            return Ok(vec![]);
        }
        Ok(vec![
            ColumnInfo {
                name: "id".to_string(),
                data_type: "integer".to_string(),
            },
            ColumnInfo {
                name: "status".to_string(),
                data_type: "text".to_string(),
            },
        ])
    }
}

struct Harness {
    dir: TempDir,
    audit: Arc<MemoryStorage>,
    server: Arc<McpServer>,
}

fn harness() -> Harness {
    let allowlist = AllowlistConfig::builder()
        .table(
            "app_data",
            "orders",
            &[("id", "Order id"), ("status", "Fulfilment status")],
        )
        .build()
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let mut config = WardenConfig::default();
    config.artifacts.directory = dir.path().to_path_buf();

    let rows = vec![
        json!({ "id": 1, "status": "pending", "internal_note": "fraud check" }),
        json!({ "id": 2, "status": "pending", "internal_note": "vip" }),
    ]
    .into_iter()
    .map(|v| match v {
        Value::Object(map) => map,
        _ => unreachable!(),
    })
    .collect();

    let audit = Arc::new(MemoryStorage::new());
    let logger = Arc::new(AuditLogger::with_storage(
        AuditConfig::default(),
        audit.clone(),
    ));
    let orchestrator = Orchestrator::new(
        &config,
        Arc::new(allowlist),
        logger,
        Arc::new(StaticDatabase { rows }),
    );

    Harness {
        dir,
        audit,
        server: Arc::new(McpServer::new(McpConfig::default(), Arc::new(orchestrator))),
    }
}

fn request(id: i64, method: &str, params: Option<Value>) -> JsonRpcRequest {
    JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        id: Some(json!(id)),
        method: method.to_string(),
        params,
    }
}

/// Call a tool and decode the JSON payload of its text block.
async fn call_tool(server: &McpServer, name: &str, arguments: Value) -> (bool, Value) {
    let response = server
        .handle_request(request(
            1,
            "tools/call",
            Some(json!({ "name": name, "arguments": arguments })),
        ))
        .await;
    assert!(response.error.is_none(), "unexpected error: {:?}", response.error);

    let result = response.result.unwrap();
    let text = result["content"][0]["text"].as_str().unwrap().to_string();
    (
        result["isError"].as_bool().unwrap(),
        serde_json::from_str(&text).unwrap(),
    )
}

#[tokio::test]
async fn test_initialize() {
    let h = harness();
    let response = h.server.handle_request(request(1, "initialize", None)).await;
    let result = response.result.unwrap();
    assert_eq!(result["protocolVersion"], "2024-11-05");
    assert_eq!(result["serverInfo"]["name"], "warden");
    assert_eq!(response.id, Some(json!(1)));
}

#[tokio::test]
async fn test_list_tools() {
    let h = harness();
    let response = h.server.handle_request(request(2, "tools/list", None)).await;
    let tools = response.result.unwrap()["tools"].clone();
    let names: Vec<&str> = tools
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["analyze_artifact", "describe_schema", "read_query"]);
    assert_eq!(tools[0]["annotations"]["readOnlyHint"], true);
    assert!(tools[2]["inputSchema"]["required"].is_array());
}

#[tokio::test]
async fn test_read_query_filters_columns() {
    let h = harness();
    let (is_error, payload) = call_tool(
        &h.server,
        "read_query",
        json!({
            "sql_query": "SELECT * FROM app_data.orders WHERE status = 'pending' LIMIT 10",
            "justification": JUSTIFICATION
        }),
    )
    .await;

    assert!(!is_error);
    assert_eq!(payload["ok"], true);
    assert_eq!(payload["result"]["rows"], 2);
    assert_eq!(
        payload["result"]["data"][0],
        json!({ "id": 1, "status": "pending" })
    );
}

#[tokio::test]
async fn test_rejection_is_tool_error() {
    let h = harness();
    let (is_error, payload) = call_tool(
        &h.server,
        "read_query",
        json!({
            "sql_query": "DROP TABLE app_data.orders",
            "justification": JUSTIFICATION
        }),
    )
    .await;

    assert!(is_error);
    assert_eq!(payload["category"], "SQL_VALIDATION_ERROR");
    assert_eq!(payload["kind"], "ForbiddenStatementType");
    assert!(payload["hint"].is_string());
    assert_eq!(h.audit.entries().len(), 1);
}

#[tokio::test]
async fn test_invalid_arguments_not_audited() {
    let h = harness();
    let (is_error, payload) = call_tool(
        &h.server,
        "read_query",
        json!({ "sql_query": "SELECT 1", "justification": "curious" }),
    )
    .await;

    assert!(is_error);
    assert_eq!(payload["category"], "INVALID_ARGUMENTS");
    assert!(h.audit.entries().is_empty());
}

#[tokio::test]
async fn test_analyze_artifact() {
    let h = harness();
    std::fs::write(
        h.dir.path().join("export.csv"),
        "id,status,internal_note\n1,pending,a\n2,shipped,b\n3,pending,c\n",
    )
    .unwrap();

    let (is_error, payload) = call_tool(
        &h.server,
        "analyze_artifact",
        json!({
            "file_id": "export.csv",
            "sql_query": "SELECT status, count(*) AS count FROM artifact GROUP BY status ORDER BY status LIMIT 10",
            "justification": "User wants pending vs shipped counts from the export"
        }),
    )
    .await;

    assert!(!is_error, "{}", payload);
    assert_eq!(payload["analyzed"]["rows"], 2);
    assert_eq!(
        payload["analyzed"]["data"][0],
        json!({ "count": 2, "status": "pending" })
    );

    let entries = h.audit.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "analyze_artifact");
}

#[tokio::test]
async fn test_describe_schema() {
    let h = harness();
    let (is_error, payload) = call_tool(&h.server, "describe_schema", json!({})).await;
    assert!(!is_error);
    assert_eq!(payload["tables"][0]["table"], "app_data.orders");
    assert_eq!(payload["tables"][0]["columns"][1]["name"], "status");
}

#[tokio::test]
async fn test_unknown_tool() {
    let h = harness();
    let response = h
        .server
        .handle_request(request(
            3,
            "tools/call",
            Some(json!({ "name": "drop_everything", "arguments": {} })),
        ))
        .await;
    assert_eq!(response.error.unwrap().code, -32602);
}

#[tokio::test]
async fn test_unknown_method() {
    let h = harness();
    let response = h.server.handle_request(request(4, "resources/list", None)).await;
    let error = response.error.unwrap();
    assert_eq!(error.code, -32601);
    assert!(error.message.contains("resources/list"));
}

#[tokio::test]
async fn test_notification_gets_no_response() {
    let h = harness();
    let response = h
        .server
        .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
        .await;
    assert!(response.is_none());
}

#[tokio::test]
async fn test_parse_error() {
    let h = harness();
    let response = h.server.handle_line("{not json").await.unwrap();
    assert_eq!(response.error.unwrap().code, -32700);
    assert_eq!(response.id, None);
}

#[tokio::test]
async fn test_health_endpoint() {
    let h = harness();
    let response = create_router(h.server.clone())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_http_post() {
    let h = harness();
    let body = json!({ "jsonrpc": "2.0", "id": 9, "method": "ping" }).to_string();
    let response = create_router(h.server.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/mcp")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["id"], 9);
    assert_eq!(value["result"], json!({}));
}
