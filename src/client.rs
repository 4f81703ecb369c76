//! Client context and the HTTP request issuer bound to it.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::collection::Collection;
use crate::config::ClientOptions;
use crate::error::{Error, Operation, Result};
use crate::protocol;

/// Connection settings bound to one collection.
///
/// Immutable once built and shared between every [`Collection`] handle and
/// [`Document`](crate::Document) of that collection.
#[derive(Debug, Clone)]
pub struct ClientContext {
  base_url: String,
  collection: String,
  http: reqwest::Client,
}

impl ClientContext {
  /// Build a context from options plus the collection name to bind.
  pub fn new(options: &ClientOptions, collection: &str) -> Result<Self> {
    let api_key = options.require_api_key()?;

    let collection = collection.trim();
    if collection.is_empty() {
      return Err(Error::Config("collection name is required".to_string()));
    }

    let mut headers = HeaderMap::new();
    let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key))
      .map_err(|e| Error::Config(format!("invalid API key: {}", e)))?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let http = reqwest::Client::builder()
      .default_headers(headers)
      .build()
      .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

    Ok(Self {
      base_url: options.base_url.trim_end_matches('/').to_string(),
      collection: collection.to_string(),
      http,
    })
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  pub fn collection(&self) -> &str {
    &self.collection
  }

  /// URL of the collection, or of a path below it. Segments are percent-encoded.
  pub fn url(&self, segments: &[&str]) -> String {
    let mut url = format!("{}/{}", self.base_url, urlencoding::encode(&self.collection));
    for segment in segments {
      url.push('/');
      url.push_str(&urlencoding::encode(segment));
    }
    url
  }

  /// Start an authenticated request against a path below the collection.
  pub fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
    let url = self.url(segments);
    debug!(%method, %url, "docstore request");
    self.http.request(method, url)
  }

  /// Send a request, failing with an `op`-labelled error on transport errors
  /// and non-2xx statuses.
  pub(crate) async fn send(&self, op: Operation, request: RequestBuilder) -> Result<Response> {
    let response = request.send().await.map_err(|e| transport_error(op, e))?;
    if response.status().is_success() {
      Ok(response)
    } else {
      Err(status_error(op, response).await)
    }
  }

  /// Like [`send`](Self::send) but maps 404 to `Ok(None)`.
  pub(crate) async fn send_optional(
    &self,
    op: Operation,
    request: RequestBuilder,
  ) -> Result<Option<Response>> {
    let response = request.send().await.map_err(|e| transport_error(op, e))?;
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
      debug!(collection = %self.collection, "{} returned not found", op);
      Ok(None)
    } else if status.is_success() {
      Ok(Some(response))
    } else {
      Err(status_error(op, response).await)
    }
  }

  /// Decode a successful response body.
  pub(crate) async fn decode<T: DeserializeOwned>(op: Operation, response: Response) -> Result<T> {
    response.json::<T>().await.map_err(|e| {
      warn!(%op, error = %e, "invalid response body");
      Error::operation(op, e.to_string())
    })
  }
}

fn transport_error(op: Operation, e: reqwest::Error) -> Error {
  warn!(%op, error = %e, "docstore transport error");
  Error::operation(op, e.to_string())
}

async fn status_error(op: Operation, response: Response) -> Error {
  let status = response.status();
  let body = response.json::<Value>().await.ok();
  let message = body
    .as_ref()
    .and_then(protocol::error_message)
    .unwrap_or_else(|| format!("request failed with status code {}", status.as_u16()));
  warn!(%op, status = status.as_u16(), %message, "docstore request failed");
  Error::operation(op, message)
}

/// Entry point: holds the connection options and hands out collection handles.
///
/// # Example
/// ```no_run
/// use docstore_orm::{Client, ClientOptions};
///
/// # fn main() -> docstore_orm::Result<()> {
/// let client = Client::new(
///   ClientOptions::new("http://localhost:3000/api").with_api_key("secret"),
/// )?;
/// let users = client.collection("users")?;
/// assert_eq!(users.name(), "users");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
  options: Arc<ClientOptions>,
}

impl Client {
  /// Validate options and build a client. A missing API key is rejected here;
  /// a collection name, when given, must not be blank.
  pub fn new(options: ClientOptions) -> Result<Self> {
    options.require_api_key()?;
    if let Some(name) = options.collection.as_deref() {
      if name.trim().is_empty() {
        return Err(Error::Config("collection name must not be empty".to_string()));
      }
    }
    Ok(Self {
      options: Arc::new(options),
    })
  }

  /// Build a client from `DOCSTORE_*` environment variables.
  pub fn from_env() -> Result<Self> {
    Self::new(ClientOptions::from_env()?)
  }

  pub fn options(&self) -> &ClientOptions {
    &self.options
  }

  /// Bind a collection. Every operation on the returned handle targets
  /// `/{name}`.
  pub fn collection(&self, name: &str) -> Result<Collection> {
    let context = ClientContext::new(&self.options, name)?;
    Ok(Collection::new(Arc::new(context)))
  }

  /// Bind the collection named in the options.
  pub fn default_collection(&self) -> Result<Collection> {
    let name = self
      .options
      .collection
      .as_deref()
      .ok_or_else(|| Error::Config("collection name is required".to_string()))?;
    self.collection(name)
  }
}
