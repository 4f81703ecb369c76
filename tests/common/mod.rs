//! In-process fake of the document storage API for integration tests.
//!
//! Serves the REST surface under `/api`, keeps records in memory and logs
//! every request it sees so tests can assert on method, path, query string,
//! headers and body.

#![allow(dead_code)]

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{OriginalUri, Path, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch};
use axum::{Json, Router};
use chrono::Utc;
use docstore_orm::{Client, ClientOptions, Collection};
use regex::Regex;
use serde_json::{json, Map, Value};

pub const API_KEY: &str = "test-key";

/// A request as the fake server received it.
#[derive(Debug, Clone)]
pub struct SeenRequest {
  pub method: Method,
  pub path: String,
  pub query: Option<String>,
  pub authorization: Option<String>,
  pub content_type: Option<String>,
  pub body: Option<Value>,
}

impl SeenRequest {
  fn new(method: Method, uri: &Uri, headers: &HeaderMap, body: Option<Value>) -> Self {
    let header = |name: &str| {
      headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
    };
    Self {
      method,
      path: uri.path().to_string(),
      query: uri.query().map(str::to_string),
      authorization: header("authorization"),
      content_type: header("content-type"),
      body,
    }
  }

  /// Decoded query parameters in the order they were sent.
  pub fn params(&self) -> Vec<(String, String)> {
    let Some(query) = self.query.as_deref() else {
      return Vec::new();
    };
    query
      .split('&')
      .filter(|pair| !pair.is_empty())
      .map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        (decode(key), decode(value))
      })
      .collect()
  }

  /// Every value sent for `key`.
  pub fn param(&self, key: &str) -> Vec<String> {
    self
      .params()
      .into_iter()
      .filter(|(k, _)| k == key)
      .map(|(_, v)| v)
      .collect()
  }
}

fn decode(raw: &str) -> String {
  let spaced = raw.replace('+', " ");
  urlencoding::decode(&spaced)
    .map(|s| s.into_owned())
    .unwrap_or(spaced)
}

#[derive(Default)]
struct Inner {
  records: HashMap<String, Vec<Value>>,
  requests: Vec<SeenRequest>,
  failure: Option<(StatusCode, Value)>,
}

/// Shared state of the fake server.
#[derive(Clone, Default)]
pub struct FakeStore {
  inner: Arc<Mutex<Inner>>,
}

impl FakeStore {
  /// Every request received so far.
  pub fn requests(&self) -> Vec<SeenRequest> {
    self.inner.lock().unwrap().requests.clone()
  }

  pub fn last_request(&self) -> SeenRequest {
    self
      .requests()
      .pop()
      .expect("fake server has not received a request")
  }

  /// Answer the next request with `status` and `body` instead of handling it.
  pub fn fail_next(&self, status: StatusCode, body: Value) {
    self.inner.lock().unwrap().failure = Some((status, body));
  }

  /// Insert a stored record directly, bypassing the API.
  pub fn seed(&self, collection: &str, id: &str, data: Value) {
    let record = new_record(collection, id.to_string(), data, None);
    self
      .inner
      .lock()
      .unwrap()
      .records
      .entry(collection.to_string())
      .or_default()
      .push(record);
  }

  /// Insert a record exactly as given, so tests can serve unusual metadata.
  pub fn seed_raw(&self, collection: &str, record: Value) {
    self
      .inner
      .lock()
      .unwrap()
      .records
      .entry(collection.to_string())
      .or_default()
      .push(record);
  }

  /// Remove a stored record directly, bypassing the API.
  pub fn remove(&self, collection: &str, id: &str) {
    if let Some(records) = self.inner.lock().unwrap().records.get_mut(collection) {
      records.retain(|r| r["id"] != id);
    }
  }

  pub fn stored(&self, collection: &str, id: &str) -> Option<Value> {
    self
      .inner
      .lock()
      .unwrap()
      .records
      .get(collection)
      .and_then(|records| records.iter().find(|r| r["id"] == id).cloned())
  }

  /// Log the request and hand back the injected failure, if any.
  fn seen(&self, request: SeenRequest) -> Option<Response> {
    let mut inner = self.inner.lock().unwrap();
    inner.requests.push(request);
    inner
      .failure
      .take()
      .map(|(status, body)| (status, Json(body)).into_response())
  }
}

/// A running fake server.
pub struct TestServer {
  pub base_url: String,
  pub store: FakeStore,
}

impl TestServer {
  pub fn client(&self) -> Client {
    Client::new(ClientOptions::new(self.base_url.clone()).with_api_key(API_KEY)).unwrap()
  }

  pub fn collection(&self, name: &str) -> Collection {
    self.client().collection(name).unwrap()
  }
}

/// Start a fake server on an ephemeral port.
pub async fn spawn() -> TestServer {
  let store = FakeStore::default();

  let api = Router::new()
    .route("/{collection}", get(list).post(create))
    .route("/{collection}/{id}", get(fetch).put(replace).delete(remove))
    .route("/{collection}/{id}/patch", patch(merge))
    .with_state(store.clone());
  let app = Router::new().nest("/api", api);

  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, app).await.unwrap();
  });

  TestServer {
    base_url: format!("http://{}/api", addr),
    store,
  }
}

/// Convert a `json!` object literal into the map the client API takes.
pub fn object(value: Value) -> Map<String, Value> {
  match value {
    Value::Object(map) => map,
    other => panic!("expected a JSON object, got {}", other),
  }
}

fn new_record(collection: &str, id: String, data: Value, ttl_at: Option<Value>) -> Value {
  let now = Utc::now().to_rfc3339();
  json!({
    "id": id,
    "collection": collection,
    "data": data,
    "version": 1,
    "created_at": now,
    "updated_at": now,
    "ttl_at": ttl_at.unwrap_or(Value::Null),
  })
}

fn not_found() -> Response {
  (
    StatusCode::NOT_FOUND,
    Json(json!({"error": "Document not found"})),
  )
    .into_response()
}

fn lookup<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
  path.split('.').try_fold(data, |current, key| current.get(key))
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
  match (a, b) {
    (Some(Value::Number(a)), Some(Value::Number(b))) => a
      .as_f64()
      .partial_cmp(&b.as_f64())
      .unwrap_or(Ordering::Equal),
    (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
    _ => Ordering::Equal,
  }
}

async fn list(
  State(store): State<FakeStore>,
  Path(collection): Path<String>,
  method: Method,
  OriginalUri(uri): OriginalUri,
  headers: HeaderMap,
) -> Response {
  let seen = SeenRequest::new(method, &uri, &headers, None);
  let params = seen.params();
  if let Some(failure) = store.seen(seen) {
    return failure;
  }

  let eq = Regex::new(r"^eq\(([^,]+),(.+)\)$").unwrap();
  let mut records = store
    .inner
    .lock()
    .unwrap()
    .records
    .get(&collection)
    .cloned()
    .unwrap_or_default();

  for (key, value) in &params {
    if key != "q" {
      continue;
    }
    if let Some(caps) = eq.captures(value) {
      let path = caps[1].to_string();
      let expected: Value = serde_json::from_str(&caps[2]).unwrap_or(Value::Null);
      records.retain(|r| lookup(&r["data"], &path) == Some(&expected));
    }
  }

  for (key, value) in params.iter().rev() {
    if key != "order" {
      continue;
    }
    let (path, desc) = match value.strip_prefix('-') {
      Some(path) => (path, true),
      None => (value.as_str(), false),
    };
    records.sort_by(|a, b| {
      let ord = compare(lookup(&a["data"], path), lookup(&b["data"], path));
      if desc { ord.reverse() } else { ord }
    });
  }

  let number = |name: &str| {
    params
      .iter()
      .find(|(k, _)| k == name)
      .and_then(|(_, v)| v.parse::<usize>().ok())
  };
  let total = records.len();
  let mut body = json!({"data": {"data": []}});

  if let Some(limit) = number("limit") {
    let page = number("page").unwrap_or(1).max(1);
    records = records
      .into_iter()
      .skip((page - 1) * limit)
      .take(limit)
      .collect();
    body["data"]["pagination"] = json!({"page": page, "limit": limit, "total": total});
  }

  body["data"]["data"] = Value::Array(records);
  Json(body).into_response()
}

async fn fetch(
  State(store): State<FakeStore>,
  Path((collection, id)): Path<(String, String)>,
  method: Method,
  OriginalUri(uri): OriginalUri,
  headers: HeaderMap,
) -> Response {
  if let Some(failure) = store.seen(SeenRequest::new(method, &uri, &headers, None)) {
    return failure;
  }
  match store.stored(&collection, &id) {
    Some(record) => Json(json!({"data": record})).into_response(),
    None => not_found(),
  }
}

async fn create(
  State(store): State<FakeStore>,
  Path(collection): Path<String>,
  method: Method,
  OriginalUri(uri): OriginalUri,
  headers: HeaderMap,
  Json(body): Json<Value>,
) -> Response {
  if let Some(failure) = store.seen(SeenRequest::new(method, &uri, &headers, Some(body.clone()))) {
    return failure;
  }

  let id = uuid::Uuid::new_v4().to_string();
  let data = body.get("data").cloned().unwrap_or_else(|| json!({}));
  let record = new_record(&collection, id, data, body.get("ttl_at").cloned());

  store
    .inner
    .lock()
    .unwrap()
    .records
    .entry(collection)
    .or_default()
    .push(record.clone());

  (StatusCode::CREATED, Json(json!({"data": record}))).into_response()
}

/// Apply `change` to a stored record, bumping its version and timestamp.
fn modify(
  store: &FakeStore,
  collection: &str,
  id: &str,
  change: impl FnOnce(&mut Value),
) -> Option<Value> {
  let mut inner = store.inner.lock().unwrap();
  let record = inner
    .records
    .get_mut(collection)?
    .iter_mut()
    .find(|r| r["id"] == id)?;
  change(record);
  let version = record["version"].as_u64().unwrap_or(0) + 1;
  record["version"] = json!(version);
  record["updated_at"] = json!(Utc::now().to_rfc3339());
  Some(record.clone())
}

async fn replace(
  State(store): State<FakeStore>,
  Path((collection, id)): Path<(String, String)>,
  method: Method,
  OriginalUri(uri): OriginalUri,
  headers: HeaderMap,
  Json(body): Json<Value>,
) -> Response {
  if let Some(failure) = store.seen(SeenRequest::new(method, &uri, &headers, Some(body.clone()))) {
    return failure;
  }

  let updated = modify(&store, &collection, &id, |record| {
    record["data"] = body.get("data").cloned().unwrap_or_else(|| json!({}));
    if let Some(ttl_at) = body.get("ttl_at") {
      record["ttl_at"] = ttl_at.clone();
    }
  });

  match updated {
    Some(record) => Json(json!({"data": record})).into_response(),
    None => not_found(),
  }
}

async fn merge(
  State(store): State<FakeStore>,
  Path((collection, id)): Path<(String, String)>,
  method: Method,
  OriginalUri(uri): OriginalUri,
  headers: HeaderMap,
  Json(body): Json<Value>,
) -> Response {
  if let Some(failure) = store.seen(SeenRequest::new(method, &uri, &headers, Some(body.clone()))) {
    return failure;
  }

  let updated = modify(&store, &collection, &id, |record| {
    if let (Some(target), Some(Value::Object(changes))) =
      (record["data"].as_object_mut(), body.get("data"))
    {
      for (key, value) in changes {
        target.insert(key.clone(), value.clone());
      }
    }
  });

  match updated {
    Some(record) => Json(json!({"data": record})).into_response(),
    None => not_found(),
  }
}

async fn remove(
  State(store): State<FakeStore>,
  Path((collection, id)): Path<(String, String)>,
  method: Method,
  OriginalUri(uri): OriginalUri,
  headers: HeaderMap,
) -> Response {
  if let Some(failure) = store.seen(SeenRequest::new(method, &uri, &headers, None)) {
    return failure;
  }
  if store.stored(&collection, &id).is_none() {
    return not_found();
  }
  store.remove(&collection, &id);
  StatusCode::NO_CONTENT.into_response()
}
