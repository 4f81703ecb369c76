//! docstore-orm
//!
//! ActiveRecord-style client for a JSON document storage HTTP API. Every
//! operation is one authenticated REST round trip; filtering and ordering are
//! expressed with a small query-string DSL that the server evaluates.
//!
//! # Example
//!
//! ```no_run
//! use docstore_orm::query::{field, QueryOptions};
//! use docstore_orm::{Client, ClientOptions, CreateOptions};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> docstore_orm::Result<()> {
//!   let client = Client::new(
//!     ClientOptions::new("http://localhost:3000/api").with_api_key("secret"),
//!   )?;
//!   let users = client.collection("users")?;
//!
//!   // Create a document
//!   let data = json!({"name": "Alice", "status": "active"});
//!   let mut alice = users
//!     .create(data.as_object().cloned().unwrap_or_default(), CreateOptions::default())
//!     .await?;
//!
//!   // Change a nested field and write it back
//!   alice.set("profile.city", "Lisbon");
//!   alice.save().await?;
//!
//!   // Query
//!   let active = users
//!     .query(QueryOptions::new().predicate(field("status").eq("active")).order("-name"))
//!     .await?;
//!   println!("{} active users", active.len());
//!
//!   alice.destroy().await?;
//!   Ok(())
//! }
//! ```

mod client;
mod collection;
mod config;
mod document;
mod error;
pub mod protocol;
pub mod query;

pub use client::{Client, ClientContext};
pub use collection::{Collection, CreateOptions, QueryResult};
pub use config::{ClientOptions, DEFAULT_BASE_URL};
pub use document::Document;
pub use error::{Error, Operation, Result};
pub use protocol::{Pagination, Record, Version};
pub use query::{field, Operator, OrderBy, Predicate, QueryOptions, SortDir};
