//! Test doubles for the upstream store and identity provider.
//!
//! A small in-process server speaking the same REST dialect the gateway
//! emits, backed by in-memory tables. Only the query surface the gateway
//! actually uses is implemented.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

pub const ADMIN_TOKEN: &str = "admin-token";
pub const VISITOR_TOKEN: &str = "visitor-token";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "correct-password";
pub const VISITOR_EMAIL: &str = "visitor@example.com";

/// Tables whose ids are autoincrement integers; everything else gets uuids.
const SERIAL_TABLES: [&str; 2] = ["messages", "comments"];

/// In-memory upstream double.
pub struct StubUpstream {
    pub admin_id: Uuid,
    pub visitor_id: Uuid,
    tables: Mutex<HashMap<String, Vec<Value>>>,
    serials: Mutex<HashMap<String, i64>>,
    /// Toggles whether the truncate/reset stored procedures exist.
    pub procedures_available: AtomicBool,
    /// Names of every attempted procedure call, in order.
    pub rpc_calls: Mutex<Vec<String>>,
}

impl StubUpstream {
    fn new() -> Self {
        let admin_id = Uuid::new_v4();
        let stub = Self {
            admin_id,
            visitor_id: Uuid::new_v4(),
            tables: Mutex::new(HashMap::new()),
            serials: Mutex::new(HashMap::new()),
            procedures_available: AtomicBool::new(true),
            rpc_calls: Mutex::new(Vec::new()),
        };
        stub.seed(
            "admins",
            json!({
                "user_id": admin_id.to_string(),
                "email": ADMIN_EMAIL,
                "username": "admin",
            }),
        );
        stub
    }

    /// Insert a row directly, assigning id and created_at like the store
    /// would. Returns the stored row.
    pub fn seed(&self, table: &str, row: Value) -> Value {
        let row = self.store_row(table, row);
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        row
    }

    /// Snapshot of a table's rows.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    fn store_row(&self, table: &str, row: Value) -> Value {
        let mut row = match row {
            Value::Object(map) => map,
            other => {
                let mut map = serde_json::Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        if !row.contains_key("id") && table != "admins" {
            if SERIAL_TABLES.contains(&table) {
                let mut serials = self.serials.lock().unwrap();
                let serial = serials.entry(table.to_string()).or_insert(0);
                *serial += 1;
                row.insert("id".to_string(), json!(*serial));
            } else {
                row.insert("id".to_string(), json!(Uuid::new_v4().to_string()));
            }
        }
        if !row.contains_key("created_at") && table != "admins" {
            row.insert("created_at".to_string(), json!(Utc::now().to_rfc3339()));
        }
        Value::Object(row)
    }
}

/// Spawn the stub on an ephemeral port.
pub async fn spawn_stub() -> (String, Arc<StubUpstream>) {
    let stub = Arc::new(StubUpstream::new());

    let router = Router::new()
        .route("/auth/v1/user", get(stub_get_user))
        .route("/auth/v1/token", post(stub_sign_in))
        .route("/rest/v1/rpc/{function}", post(stub_rpc))
        .route(
            "/rest/v1/{table}",
            get(stub_select)
                .post(stub_insert)
                .patch(stub_update)
                .delete(stub_delete),
        )
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub");
    let addr = listener.local_addr().expect("Failed to get stub addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (format!("http://{}", addr), stub)
}

async fn stub_get_user(State(stub): State<Arc<StubUpstream>>, headers: HeaderMap) -> Response {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some(ADMIN_TOKEN) => Json(json!({
            "id": stub.admin_id.to_string(),
            "email": ADMIN_EMAIL,
        }))
        .into_response(),
        Some(VISITOR_TOKEN) => Json(json!({
            "id": stub.visitor_id.to_string(),
            "email": VISITOR_EMAIL,
        }))
        .into_response(),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "msg": "invalid JWT" })),
        )
            .into_response(),
    }
}

async fn stub_sign_in(State(stub): State<Arc<StubUpstream>>, Json(body): Json<Value>) -> Response {
    let email = body.get("email").and_then(Value::as_str);
    let password = body.get("password").and_then(Value::as_str);

    if email == Some(ADMIN_EMAIL) && password == Some(ADMIN_PASSWORD) {
        Json(json!({
            "access_token": ADMIN_TOKEN,
            "refresh_token": "refresh-token",
            "user": { "id": stub.admin_id.to_string(), "email": ADMIN_EMAIL },
        }))
        .into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error_description": "Invalid login credentials" })),
        )
            .into_response()
    }
}

async fn stub_rpc(
    State(stub): State<Arc<StubUpstream>>,
    Path(function): Path<String>,
) -> Response {
    stub.rpc_calls.lock().unwrap().push(function.clone());

    if !stub.procedures_available.load(Ordering::SeqCst) {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": format!("Could not find the function {}", function) })),
        )
            .into_response();
    }

    let truncated_table = match function.as_str() {
        "truncate_messages" => Some("messages"),
        "truncate_comments" => Some("comments"),
        "reset_messages_identity" => {
            stub.serials.lock().unwrap().insert("messages".to_string(), 0);
            None
        }
        "reset_comments_identity" => {
            stub.serials.lock().unwrap().insert("comments".to_string(), 0);
            None
        }
        _ => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": format!("Could not find the function {}", function) })),
            )
                .into_response()
        }
    };

    if let Some(table) = truncated_table {
        stub.tables.lock().unwrap().remove(table);
        stub.serials.lock().unwrap().insert(table.to_string(), 0);
    }

    StatusCode::NO_CONTENT.into_response()
}

async fn stub_select(
    State(stub): State<Arc<StubUpstream>>,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Response {
    let rows = stub.rows(&table);
    let filters = filter_params(&params);

    let mut matched: Vec<Value> = rows
        .into_iter()
        .filter(|row| filters_match(row, &filters))
        .collect();

    if let Some(order) = param(&params, "order") {
        sort_rows(&mut matched, order);
    }

    let total = matched.len();
    let offset: usize = param(&params, "offset")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let limit: usize = param(&params, "limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(usize::MAX);

    let page: Vec<Value> = matched.into_iter().skip(offset).take(limit).collect();
    let page_len = page.len();
    let projected = project(page, param(&params, "select"));

    let mut response = Json(projected).into_response();
    let wants_count = headers
        .get("prefer")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("count=exact"))
        .unwrap_or(false);
    if wants_count {
        let range = if page_len == 0 {
            format!("*/{}", total)
        } else {
            format!("{}-{}/{}", offset, offset + page_len - 1, total)
        };
        response
            .headers_mut()
            .insert("content-range", HeaderValue::from_str(&range).unwrap());
    }
    response
}

async fn stub_insert(
    State(stub): State<Arc<StubUpstream>>,
    Path(table): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let row = stub.seed(&table, body);
    (StatusCode::CREATED, Json(json!([row]))).into_response()
}

async fn stub_update(
    State(stub): State<Arc<StubUpstream>>,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    Json(body): Json<Value>,
) -> Response {
    let filters = filter_params(&params);
    let mut tables = stub.tables.lock().unwrap();
    let rows = tables.entry(table).or_default();

    let mut updated = Vec::new();
    for row in rows.iter_mut() {
        if filters_match(row, &filters) {
            if let (Some(target), Some(patch)) = (row.as_object_mut(), body.as_object()) {
                for (key, value) in patch {
                    target.insert(key.clone(), value.clone());
                }
            }
            updated.push(row.clone());
        }
    }
    Json(updated).into_response()
}

async fn stub_delete(
    State(stub): State<Arc<StubUpstream>>,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let filters = filter_params(&params);
    let mut tables = stub.tables.lock().unwrap();
    let rows = tables.entry(table).or_default();

    let mut deleted = Vec::new();
    rows.retain(|row| {
        if filters_match(row, &filters) {
            deleted.push(row.clone());
            false
        } else {
            true
        }
    });
    Json(deleted).into_response()
}

fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn filter_params(params: &[(String, String)]) -> Vec<(String, String)> {
    params
        .iter()
        .filter(|(k, _)| !matches!(k.as_str(), "select" | "order" | "limit" | "offset"))
        .cloned()
        .collect()
}

fn filters_match(row: &Value, filters: &[(String, String)]) -> bool {
    filters.iter().all(|(key, expr)| filter_match(row, key, expr))
}

fn filter_match(row: &Value, key: &str, expr: &str) -> bool {
    if key == "or" {
        return or_match(row, expr);
    }
    let field = row.get(key).unwrap_or(&Value::Null);
    let Some((op, raw)) = expr.split_once('.') else {
        return true;
    };
    match op {
        "eq" => scalar_eq(field, raw),
        "neq" => !scalar_eq(field, raw),
        "gt" => match (field.as_i64(), raw.parse::<i64>()) {
            (Some(value), Ok(bound)) => value > bound,
            _ => false,
        },
        "is" => raw == "null" && field.is_null(),
        "cs" => contains_all(field, raw),
        _ => true,
    }
}

fn scalar_eq(field: &Value, raw: &str) -> bool {
    match field {
        Value::Bool(b) => raw.parse::<bool>().map(|r| *b == r).unwrap_or(false),
        Value::Number(n) => raw
            .parse::<f64>()
            .map(|r| n.as_f64() == Some(r))
            .unwrap_or(false),
        Value::String(s) => s == raw,
        _ => false,
    }
}

fn contains_all(field: &Value, raw: &str) -> bool {
    let wanted: Vec<&str> = raw
        .trim_start_matches('{')
        .trim_end_matches('}')
        .split(',')
        .filter(|part| !part.is_empty())
        .collect();
    let Some(items) = field.as_array() else {
        return false;
    };
    wanted
        .iter()
        .all(|want| items.iter().any(|item| item.as_str() == Some(*want)))
}

fn or_match(row: &Value, expr: &str) -> bool {
    let inner = expr.trim_start_matches('(').trim_end_matches(')');
    inner.split(',').any(|clause| {
        let mut parts = clause.splitn(3, '.');
        let (Some(field), Some(op), Some(pattern)) = (parts.next(), parts.next(), parts.next())
        else {
            return false;
        };
        if op != "ilike" {
            return false;
        }
        let needle = pattern.trim_matches('*').to_lowercase();
        row.get(field)
            .and_then(Value::as_str)
            .map(|value| value.to_lowercase().contains(&needle))
            .unwrap_or(false)
    })
}

fn sort_rows(rows: &mut [Value], order: &str) {
    let (column, direction) = order.split_once('.').unwrap_or((order, "asc"));
    rows.sort_by(|a, b| {
        let left = a.get(column).unwrap_or(&Value::Null);
        let right = b.get(column).unwrap_or(&Value::Null);
        let ordering = compare_values(left, right);
        if direction == "desc" {
            ordering.reverse()
        } else {
            ordering
        }
    });
}

fn compare_values(a: &Value, b: &Value) -> std::cmp::Ordering {
    use std::cmp::Ordering as O;
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .unwrap_or(0.0)
            .partial_cmp(&y.as_f64().unwrap_or(0.0))
            .unwrap_or(O::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => O::Equal,
    }
}

fn project(rows: Vec<Value>, select: Option<&str>) -> Vec<Value> {
    let Some(select) = select.filter(|s| *s != "*") else {
        return rows;
    };
    let columns: Vec<&str> = select.split(',').map(str::trim).collect();
    rows.into_iter()
        .map(|row| {
            let mut out = serde_json::Map::new();
            for column in &columns {
                if let Some(value) = row.get(*column) {
                    out.insert(column.to_string(), value.clone());
                }
            }
            Value::Object(out)
        })
        .collect()
}
