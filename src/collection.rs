//! Collection-level operations: query, find, first, count and create.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::{Map, Value};
use tracing::debug;

use crate::client::ClientContext;
use crate::document::Document;
use crate::error::{Operation, Result};
use crate::protocol::{Envelope, Pagination, Record, RecordPage, WriteBody};
use crate::query::QueryOptions;

/// Options for [`Collection::create`].
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
  pub ttl_at: Option<DateTime<Utc>>,
}

impl CreateOptions {
  pub fn with_ttl_at(mut self, ttl_at: DateTime<Utc>) -> Self {
    self.ttl_at = Some(ttl_at);
    self
  }
}

/// One page of query results.
#[derive(Debug, Clone)]
pub struct QueryResult {
  pub documents: Vec<Document>,
  /// Present only when the server reported it.
  pub pagination: Option<Pagination>,
}

impl QueryResult {
  pub fn len(&self) -> usize {
    self.documents.len()
  }

  pub fn is_empty(&self) -> bool {
    self.documents.is_empty()
  }

  pub fn into_documents(self) -> Vec<Document> {
    self.documents
  }
}

impl IntoIterator for QueryResult {
  type Item = Document;
  type IntoIter = std::vec::IntoIter<Document>;

  fn into_iter(self) -> Self::IntoIter {
    self.documents.into_iter()
  }
}

/// Handle bound to one collection. Obtained from
/// [`Client::collection`](crate::Client::collection).
#[derive(Debug, Clone)]
pub struct Collection {
  context: Arc<ClientContext>,
}

impl Collection {
  pub(crate) fn new(context: Arc<ClientContext>) -> Self {
    Self { context }
  }

  pub fn name(&self) -> &str {
    self.context.collection()
  }

  pub fn context(&self) -> &Arc<ClientContext> {
    &self.context
  }

  /// A local, unsaved document with an empty payload.
  pub fn new_document(&self) -> Document {
    Document::new(self.context.clone(), Map::new())
  }

  /// A local, unsaved document with the given payload.
  pub fn build(&self, data: Map<String, Value>) -> Document {
    Document::new(self.context.clone(), data)
  }

  /// Wrap a record obtained elsewhere, e.g. from a cached response.
  pub fn from_record(&self, record: Record) -> Document {
    Document::from_record(self.context.clone(), record)
  }

  /// `GET /{collection}` with the options encoded in the query string.
  pub async fn query(&self, options: QueryOptions) -> Result<QueryResult> {
    let pairs = options.to_query_pairs()?;
    let mut request = self.context.request(Method::GET, &[]);
    if !pairs.is_empty() {
      request = request.query(&pairs);
    }

    let response = self.context.send(Operation::Query, request).await?;
    let envelope: Envelope<RecordPage> = ClientContext::decode(Operation::Query, response).await?;

    let documents = envelope
      .data
      .data
      .into_iter()
      .map(|record| Document::from_record(self.context.clone(), record))
      .collect();

    Ok(QueryResult {
      documents,
      pagination: envelope.data.pagination,
    })
  }

  /// Every document the server returns for an unfiltered query.
  pub async fn all(&self) -> Result<QueryResult> {
    self.query(QueryOptions::default()).await
  }

  /// Fetch by id. A 404 is `Ok(None)`; every other failure is an error.
  /// An empty id never names a record, so it is `Ok(None)` without a request.
  pub async fn find(&self, id: &str) -> Result<Option<Document>> {
    if id.is_empty() {
      debug!(collection = %self.name(), "find called with an empty id");
      return Ok(None);
    }
    let record = fetch_record(&self.context, Operation::Find, id).await?;
    Ok(record.map(|record| Document::from_record(self.context.clone(), record)))
  }

  /// First match of `options`, fetched with `limit` forced to 1.
  pub async fn first(&self, options: QueryOptions) -> Result<Option<Document>> {
    let result = self.query(options.limit(1)).await?;
    Ok(result.into_documents().into_iter().next())
  }

  /// Number of documents in a one-item page for `options`.
  ///
  /// The query is sent with `limit` forced to 1, so the result is 0 or 1. It
  /// answers "is there a match", not "how many".
  pub async fn count(&self, options: QueryOptions) -> Result<usize> {
    let result = self.query(options.limit(1)).await?;
    Ok(result.len())
  }

  /// `POST /{collection}` with `{data, ttl_at?}`.
  pub async fn create(&self, data: Map<String, Value>, options: CreateOptions) -> Result<Document> {
    let request = self.context.request(Method::POST, &[]).json(&WriteBody {
      data: &data,
      ttl_at: options.ttl_at,
    });
    let response = self.context.send(Operation::Create, request).await?;
    let envelope: Envelope<Record> = ClientContext::decode(Operation::Create, response).await?;
    Ok(Document::from_record(self.context.clone(), envelope.data))
  }
}

/// `GET /{collection}/{id}`, with 404 mapped to `None`.
pub(crate) async fn fetch_record(
  context: &ClientContext,
  op: Operation,
  id: &str,
) -> Result<Option<Record>> {
  let request = context.request(Method::GET, &[id]);
  match context.send_optional(op, request).await? {
    Some(response) => {
      let envelope: Envelope<Record> = ClientContext::decode(op, response).await?;
      Ok(Some(envelope.data))
    }
    None => Ok(None),
  }
}
