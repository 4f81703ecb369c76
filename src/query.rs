//! Query options for collection lookups.
//!
//! Filters are sent to the server as-is. Predicates are function-call shaped
//! strings such as `eq(status,"active")` and are never evaluated locally.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::Result;

/// Predicate operators understood by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
    Contains,
    Exists,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::In => "in",
            Operator::Nin => "nin",
            Operator::Contains => "contains",
            Operator::Exists => "exists",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

/// One `order` entry. Descending fields are sent with a leading `-`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDir,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDir::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDir::Desc,
        }
    }

    /// Parse the wire form, e.g. `-name` or `name`.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix('-') {
            Some(field) => Self::desc(field),
            None => Self::asc(raw),
        }
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            SortDir::Asc => write!(f, "{}", self.field),
            SortDir::Desc => write!(f, "-{}", self.field),
        }
    }
}

/// A single `op(field,value)` predicate.
///
/// The value is rendered as a JSON literal, so strings are quoted and
/// `in`/`nin` take a bracketed array.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub op: Operator,
    pub field: String,
    pub value: Value,
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({},{})", self.op, self.field, self.value)
    }
}

impl From<Predicate> for String {
    fn from(p: Predicate) -> String {
        p.to_string()
    }
}

/// Field expression builder for fluent predicate construction
pub struct Field {
    name: String,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn predicate(self, op: Operator, value: Value) -> Predicate {
        Predicate {
            op,
            field: self.name,
            value,
        }
    }

    pub fn eq(self, value: impl Into<Value>) -> Predicate {
        self.predicate(Operator::Eq, value.into())
    }

    pub fn ne(self, value: impl Into<Value>) -> Predicate {
        self.predicate(Operator::Ne, value.into())
    }

    pub fn gt(self, value: impl Into<Value>) -> Predicate {
        self.predicate(Operator::Gt, value.into())
    }

    pub fn gte(self, value: impl Into<Value>) -> Predicate {
        self.predicate(Operator::Gte, value.into())
    }

    pub fn lt(self, value: impl Into<Value>) -> Predicate {
        self.predicate(Operator::Lt, value.into())
    }

    pub fn lte(self, value: impl Into<Value>) -> Predicate {
        self.predicate(Operator::Lte, value.into())
    }

    pub fn is_in(self, values: Vec<Value>) -> Predicate {
        self.predicate(Operator::In, Value::Array(values))
    }

    pub fn not_in(self, values: Vec<Value>) -> Predicate {
        self.predicate(Operator::Nin, Value::Array(values))
    }

    pub fn contains(self, value: impl Into<Value>) -> Predicate {
        self.predicate(Operator::Contains, value.into())
    }

    pub fn exists(self, value: bool) -> Predicate {
        self.predicate(Operator::Exists, Value::Bool(value))
    }
}

/// Create a field expression
pub fn field(name: impl Into<String>) -> Field {
    Field::new(name)
}

/// Structured filter: operator name -> (field -> value). Sent as one JSON
/// encoded `filter` parameter.
pub type StructuredFilter = BTreeMap<String, Map<String, Value>>;

/// Options for [`Collection::query`](crate::Collection::query) and friends.
///
/// # Example
/// ```
/// use docstore_orm::query::{field, QueryOptions, SortDir};
///
/// let options = QueryOptions::new()
///     .predicate(field("status").eq("active"))
///     .order_by("name", SortDir::Desc)
///     .limit(10);
///
/// let pairs = options.to_query_pairs().unwrap();
/// assert_eq!(pairs[0], ("q", r#"eq(status,"active")"#.to_string()));
/// assert_eq!(pairs[1], ("order", "-name".to_string()));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    pub q: Vec<String>,
    pub filter: Option<StructuredFilter>,
    pub order: Vec<String>,
    pub limit: Option<u64>,
    pub page: Option<u64>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw predicate string. Multiple predicates are ANDed by the server.
    pub fn q(mut self, predicate: impl Into<String>) -> Self {
        self.q.push(predicate.into());
        self
    }

    pub fn predicate(self, predicate: Predicate) -> Self {
        self.q(predicate)
    }

    /// Add an entry to the structured filter.
    pub fn filter(mut self, op: Operator, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter
            .get_or_insert_with(BTreeMap::new)
            .entry(op.as_str().to_string())
            .or_default()
            .insert(field.into(), value.into());
        self
    }

    /// Add a raw order entry, e.g. `-created_at`.
    pub fn order(mut self, raw: impl Into<String>) -> Self {
        self.order.push(raw.into());
        self
    }

    pub fn order_by(self, field: impl Into<String>, direction: SortDir) -> Self {
        let spec = OrderBy {
            field: field.into(),
            direction,
        };
        self.order(spec.to_string())
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn page(mut self, n: u64) -> Self {
        self.page = Some(n);
        self
    }

    /// Parsed view of the `order` entries.
    pub fn order_specs(&self) -> Vec<OrderBy> {
        self.order.iter().map(|raw| OrderBy::parse(raw)).collect()
    }

    /// Query string pairs in wire order: every `q`, every `order`, then
    /// `filter`, `limit` and `page`.
    pub fn to_query_pairs(&self) -> Result<Vec<(&'static str, String)>> {
        let mut pairs = Vec::with_capacity(self.q.len() + self.order.len() + 3);

        for predicate in &self.q {
            pairs.push(("q", predicate.clone()));
        }

        for order in &self.order {
            pairs.push(("order", order.clone()));
        }

        if let Some(ref filter) = self.filter {
            pairs.push(("filter", serde_json::to_string(filter)?));
        }

        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }

        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }

        Ok(pairs)
    }
}
