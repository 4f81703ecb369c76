//! Error types for the docstore client.

use std::fmt;

use thiserror::Error;

/// Network operation a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  Query,
  Find,
  Create,
  Update,
  Patch,
  Delete,
  Reload,
}

impl Operation {
  pub fn as_str(&self) -> &'static str {
    match self {
      Operation::Query => "Query",
      Operation::Find => "Find",
      Operation::Create => "Create",
      Operation::Update => "Update",
      Operation::Patch => "Patch",
      Operation::Delete => "Delete",
      Operation::Reload => "Reload",
    }
  }
}

impl fmt::Display for Operation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Error, Debug)]
pub enum Error {
  #[error("Configuration error: {0}")]
  Config(String),

  /// Transport or server failure. `message` is the server's own error text when
  /// it sent one, otherwise the transport error text.
  #[error("{op} failed: {message}")]
  Operation { op: Operation, message: String },

  #[error("Cannot {0} a document without an id")]
  NotPersisted(&'static str),

  #[error("Serialization error: {0}")]
  Serialization(String),
}

impl Error {
  pub(crate) fn operation(op: Operation, message: impl Into<String>) -> Self {
    Self::Operation {
      op,
      message: message.into(),
    }
  }

  /// The operation label for [`Error::Operation`] values.
  pub fn op(&self) -> Option<Operation> {
    match self {
      Error::Operation { op, .. } => Some(*op),
      _ => None,
    }
  }
}

impl From<serde_json::Error> for Error {
  fn from(e: serde_json::Error) -> Self {
    Self::Serialization(e.to_string())
  }
}

pub type Result<T> = std::result::Result<T, Error>;
