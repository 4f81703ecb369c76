//! Client configuration.

use std::env;

use crate::error::{Error, Result};

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Options for building a [`Client`](crate::Client).
#[derive(Debug, Clone)]
pub struct ClientOptions {
  pub base_url: String,
  pub api_key: Option<String>,
  /// Collection used by [`Client::default_collection`](crate::Client::default_collection).
  pub collection: Option<String>,
}

impl Default for ClientOptions {
  fn default() -> Self {
    Self {
      base_url: DEFAULT_BASE_URL.to_string(),
      api_key: None,
      collection: None,
    }
  }
}

impl ClientOptions {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self {
      base_url: base_url.into(),
      ..Default::default()
    }
  }

  pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
    self.api_key = Some(api_key.into());
    self
  }

  pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
    self.collection = Some(collection.into());
    self
  }

  /// Load options from `DOCSTORE_URL`, `DOCSTORE_API_KEY` and
  /// `DOCSTORE_COLLECTION`. Only the API key is required here; the collection
  /// is checked when a context is bound.
  pub fn from_env() -> Result<Self> {
    Self::from_vars(|key| env::var(key).ok())
  }

  /// Same as [`from_env`](Self::from_env), reading variables through `lookup`.
  pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let base_url = lookup("DOCSTORE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let api_key = lookup("DOCSTORE_API_KEY")
      .ok_or_else(|| Error::Config("DOCSTORE_API_KEY environment variable is required".to_string()))?;

    let collection = lookup("DOCSTORE_COLLECTION");

    Ok(Self {
      base_url,
      api_key: Some(api_key),
      collection,
    })
  }

  /// The API key, rejecting missing or blank values.
  pub(crate) fn require_api_key(&self) -> Result<&str> {
    match self.api_key.as_deref().map(str::trim) {
      Some(key) if !key.is_empty() => Ok(key),
      _ => Err(Error::Config("API key is required".to_string())),
    }
  }
}
