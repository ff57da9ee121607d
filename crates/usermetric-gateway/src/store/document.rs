//! Property documents and query descriptions.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use usermetric_core::key::EntityKey;
use usermetric_core::model::Entity;
use usermetric_core::StoreError;

/// A stored entity: nested property map plus the set of non-indexed paths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub properties: Map<String, Value>,
    pub noindex: BTreeSet<String>,
}

impl Document {
    /// Encode an entity, carrying over its `NOINDEX` markings.
    pub fn from_entity<T: Entity>(entity: &T) -> Result<Self, StoreError> {
        let properties = match serde_json::to_value(entity) {
            Ok(Value::Object(m)) => m,
            Ok(_) => {
                return Err(StoreError::Backend(format!(
                    "{} does not encode to a property map",
                    T::KIND
                )))
            }
            Err(e) => return Err(StoreError::Backend(format!("encode {}: {e}", T::KIND))),
        };
        Ok(Self {
            properties,
            noindex: T::NOINDEX.iter().map(|p| p.to_string()).collect(),
        })
    }

    /// Value at a dotted property path such as `Header.LastChanged`.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut cur = self.properties.get(parts.next()?)?;
        for p in parts {
            cur = cur.as_object()?.get(p)?;
        }
        Some(cur)
    }

    /// Indexed value at `path`; `None` when missing or marked noindex.
    pub fn indexed(&self, path: &str) -> Option<&Value> {
        if self.noindex.contains(path) {
            return None;
        }
        self.lookup(path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub path: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { path: path.into(), op: FilterOp::Eq, value: value.into() }
    }

    pub fn ge(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { path: path.into(), op: FilterOp::Ge, value: value.into() }
    }

    /// `path >= t`, with the timestamp encoded the way entities store it.
    pub fn since(path: impl Into<String>, t: DateTime<Utc>) -> Self {
        Self::ge(path, t.to_rfc3339())
    }

    pub fn matches(&self, doc: &Document) -> bool {
        let Some(stored) = doc.indexed(&self.path) else { return false; };
        let ord = compare_values(stored, &self.value);
        match self.op {
            FilterOp::Eq => ord == Ordering::Equal,
            FilterOp::Ge => ord != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub path: String,
    pub descending: bool,
}

impl Order {
    pub fn asc(path: impl Into<String>) -> Self {
        Self { path: path.into(), descending: false }
    }

    pub fn desc(path: impl Into<String>) -> Self {
        Self { path: path.into(), descending: true }
    }
}

/// Kind-scoped query: ancestor + filters + order + limit.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub kind: String,
    pub ancestor: Option<EntityKey>,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ancestor: None,
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn ancestor(mut self, key: EntityKey) -> Self {
        self.ancestor = Some(key);
        self
    }

    pub fn filter(mut self, f: Filter) -> Self {
        self.filters.push(f);
        self
    }

    pub fn order(mut self, o: Order) -> Self {
        self.order = Some(o);
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Kind, ancestor and filter check; ordering/limit are applied by the backend.
    pub fn matches(&self, key: &EntityKey, doc: &Document) -> bool {
        if key.kind() != self.kind {
            return false;
        }
        if let Some(a) = &self.ancestor {
            if key == a || !key.has_ancestor(a) {
                return false;
            }
        }
        if let Some(o) = &self.order {
            if doc.indexed(&o.path).is_none() {
                return false;
            }
        }
        self.filters.iter().all(|f| f.matches(doc))
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over stored values. Strings that both parse as RFC 3339
/// timestamps compare as instants.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => {
            match (DateTime::parse_from_rfc3339(x), DateTime::parse_from_rfc3339(y)) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
