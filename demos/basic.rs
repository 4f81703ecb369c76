//! Basic example demonstrating the docstore client.
//!
//! Reads `DOCSTORE_URL`, `DOCSTORE_API_KEY` and `DOCSTORE_COLLECTION` from the
//! environment. Set `RUST_LOG=docstore_orm=debug` to see each request.

use docstore_orm::query::{field, QueryOptions};
use docstore_orm::{Client, CreateOptions};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> docstore_orm::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let client = Client::from_env()?;
  let users = client.default_collection()?;
  println!("Using collection: {}", users.name());

  // Create a document that expires in a day
  let data = json!({"name": "Alice", "email": "alice@example.com", "active": true});
  let mut alice = users
    .create(
      data.as_object().cloned().unwrap_or_default(),
      CreateOptions::default().with_ttl_at(chrono::Utc::now() + chrono::Duration::days(1)),
    )
    .await?;
  println!("Created {:?} (version {:?})", alice.id(), alice.version());

  // Nested update through a dot path
  alice.set("profile.city", "Lisbon");
  alice.save().await?;
  println!("Saved, city = {:?}", alice.get("profile.city"));

  // Merge on the server
  alice
    .patch(json!({"active": false}).as_object().cloned().unwrap_or_default())
    .await?;

  // Query
  let inactive = users
    .query(
      QueryOptions::new()
        .predicate(field("active").eq(false))
        .order("-name")
        .limit(10),
    )
    .await?;
  for doc in &inactive.documents {
    println!("Inactive: {:?} {}", doc.id(), serde_json::Value::Object(doc.data().clone()));
  }

  if let Some(id) = alice.id() {
    let found = users.find(id).await?;
    println!("Found again: {}", found.is_some());
  }

  alice.destroy().await?;
  println!("Deleted");

  Ok(())
}
