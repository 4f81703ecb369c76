//! A single remote record and its instance operations.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::client::ClientContext;
use crate::collection::fetch_record;
use crate::error::{Error, Operation, Result};
use crate::protocol::{Envelope, PatchBody, Record, Version, WriteBody};

/// One record of a collection, bound to that collection's client context.
///
/// A document built locally has no id until [`save`](Document::save) creates
/// it on the server. [`destroy`](Document::destroy) deletes the remote record
/// but leaves the local fields as they were.
#[derive(Debug, Clone)]
pub struct Document {
  context: Arc<ClientContext>,
  id: Option<String>,
  collection: String,
  data: Map<String, Value>,
  version: Option<Version>,
  created_at: Option<DateTime<Utc>>,
  updated_at: Option<DateTime<Utc>>,
  ttl_at: Option<DateTime<Utc>>,
}

impl Document {
  pub(crate) fn new(context: Arc<ClientContext>, data: Map<String, Value>) -> Self {
    let collection = context.collection().to_string();
    Self {
      context,
      id: None,
      collection,
      data,
      version: None,
      created_at: None,
      updated_at: None,
      ttl_at: None,
    }
  }

  pub(crate) fn from_record(context: Arc<ClientContext>, record: Record) -> Self {
    let mut doc = Self::new(context, Map::new());
    doc.apply(record);
    doc
  }

  /// Overwrite every local field with the server's copy.
  fn apply(&mut self, record: Record) {
    self.id = record.id;
    if !record.collection.is_empty() {
      self.collection = record.collection;
    }
    self.data = record.data;
    self.version = record.version;
    self.created_at = record.created_at;
    self.updated_at = record.updated_at;
    self.ttl_at = record.ttl_at;
  }

  pub fn id(&self) -> Option<&str> {
    self.id.as_deref()
  }

  /// True once the document has a server-assigned id.
  pub fn persisted(&self) -> bool {
    self.id.as_deref().is_some_and(|id| !id.is_empty())
  }

  pub fn collection(&self) -> &str {
    &self.collection
  }

  pub fn data(&self) -> &Map<String, Value> {
    &self.data
  }

  pub fn data_mut(&mut self) -> &mut Map<String, Value> {
    &mut self.data
  }

  pub fn set_data(&mut self, data: Map<String, Value>) {
    self.data = data;
  }

  pub fn version(&self) -> Option<&Version> {
    self.version.as_ref()
  }

  pub fn created_at(&self) -> Option<DateTime<Utc>> {
    self.created_at
  }

  pub fn updated_at(&self) -> Option<DateTime<Utc>> {
    self.updated_at
  }

  pub fn ttl_at(&self) -> Option<DateTime<Utc>> {
    self.ttl_at
  }

  /// Expiry sent with the next create or update.
  pub fn set_ttl_at(&mut self, ttl_at: Option<DateTime<Utc>>) {
    self.ttl_at = ttl_at;
  }

  /// Deserialize the payload into a typed value.
  pub fn data_as<T: DeserializeOwned>(&self) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(self.data.clone()))?)
  }

  /// Snapshot of the document in its wire shape.
  pub fn to_record(&self) -> Record {
    Record {
      id: self.id.clone(),
      collection: self.collection.clone(),
      data: self.data.clone(),
      version: self.version.clone(),
      created_at: self.created_at,
      updated_at: self.updated_at,
      ttl_at: self.ttl_at,
    }
  }

  /// Read a value by dot path, e.g. `profile.address.city`. Numeric segments
  /// index into arrays. Returns `None` as soon as a segment is missing.
  pub fn get(&self, path: &str) -> Option<&Value> {
    let mut segments = path.split('.');
    let mut current = self.data.get(segments.next()?)?;
    for segment in segments {
      current = match current {
        Value::Object(map) => map.get(segment)?,
        Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
        _ => return None,
      };
    }
    Some(current)
  }

  /// Write a value by dot path, creating intermediate objects as needed.
  /// An intermediate that exists but is not an object is replaced by one.
  pub fn set(&mut self, path: &str, value: impl Into<Value>) {
    set_path(&mut self.data, path, value.into());
  }

  /// Create the document when it has no id yet, update it otherwise.
  pub async fn save(&mut self) -> Result<()> {
    if self.persisted() {
      self.put().await
    } else {
      self.post().await
    }
  }

  /// Shallow-merge `data` into the local payload, then send it as an update.
  pub async fn update(&mut self, data: Map<String, Value>) -> Result<()> {
    self.require_id("update")?;
    for (key, value) in data {
      self.data.insert(key, value);
    }
    self.put().await
  }

  /// Ask the server to merge `data` into the stored payload; the local fields
  /// are then replaced by the merged record.
  pub async fn patch(&mut self, data: Map<String, Value>) -> Result<()> {
    let id = self.require_id("patch")?;
    let request = self
      .context
      .request(Method::PATCH, &[id.as_str(), "patch"])
      .json(&PatchBody { data: &data });
    let response = self.context.send(Operation::Patch, request).await?;
    let envelope: Envelope<Record> = ClientContext::decode(Operation::Patch, response).await?;
    self.apply(envelope.data);
    Ok(())
  }

  /// Delete the remote record. Local fields are left untouched.
  pub async fn destroy(&self) -> Result<bool> {
    let id = self.require_id("destroy")?;
    let request = self.context.request(Method::DELETE, &[id.as_str()]);
    self.context.send(Operation::Delete, request).await?;
    Ok(true)
  }

  /// Refetch the record by id and overwrite the local fields. If the server no
  /// longer has it, the document is left as it was.
  pub async fn reload(&mut self) -> Result<()> {
    let id = self.require_id("reload")?;
    let record = fetch_record(&self.context, Operation::Reload, &id).await?;
    match record {
      Some(record) => self.apply(record),
      None => debug!(%id, collection = %self.collection, "reload found nothing, keeping local copy"),
    }
    Ok(())
  }

  fn require_id(&self, action: &'static str) -> Result<String> {
    match self.id.as_deref() {
      Some(id) if !id.is_empty() => Ok(id.to_string()),
      _ => Err(Error::NotPersisted(action)),
    }
  }

  async fn post(&mut self) -> Result<()> {
    let request = self.context.request(Method::POST, &[]).json(&WriteBody {
      data: &self.data,
      ttl_at: self.ttl_at,
    });
    let response = self.context.send(Operation::Create, request).await?;
    let envelope: Envelope<Record> = ClientContext::decode(Operation::Create, response).await?;
    self.apply(envelope.data);
    Ok(())
  }

  async fn put(&mut self) -> Result<()> {
    let id = self.require_id("update")?;
    let request = self.context.request(Method::PUT, &[id.as_str()]).json(&WriteBody {
      data: &self.data,
      ttl_at: self.ttl_at,
    });
    let response = self.context.send(Operation::Update, request).await?;
    let envelope: Envelope<Record> = ClientContext::decode(Operation::Update, response).await?;
    self.apply(envelope.data);
    Ok(())
  }
}

fn set_path(map: &mut Map<String, Value>, path: &str, value: Value) {
  match path.split_once('.') {
    None => {
      map.insert(path.to_string(), value);
    }
    Some((head, rest)) => {
      let child = map
        .entry(head)
        .or_insert_with(|| Value::Object(Map::new()));
      if !child.is_object() {
        *child = Value::Object(Map::new());
      }
      if let Value::Object(child) = child {
        set_path(child, rest, value);
      }
    }
  }
}
