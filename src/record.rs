// Attribute bag keyed by the API's XML element names
use chrono::{DateTime, Local};
use indexmap::IndexMap;

use crate::schema::{ResourceKind, Schema};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    DateTime(DateTime<Local>),
    Record(Box<Record>),
    List(Vec<Record>),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Text(s.clone())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Text(n.to_string())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Text(n.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Text(b.to_string())
    }
}

impl From<DateTime<Local>> for Value {
    fn from(dt: DateTime<Local>) -> Self {
        Value::DateTime(dt)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(Box::new(record))
    }
}

impl From<Vec<Record>> for Value {
    fn from(records: Vec<Record>) -> Self {
        Value::List(records)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Values explicitly set on a resource, in insertion order. Unset fields report the
/// schema default.
#[derive(Debug, Clone)]
pub struct Record {
    schema: &'static Schema,
    values: IndexMap<String, Value>,
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.schema.kind == other.schema.kind && self.values == other.values
    }
}

impl Record {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            schema: kind.schema(),
            values: IndexMap::new(),
        }
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    pub fn kind(&self) -> ResourceKind {
        self.schema.kind
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.values.shift_remove(field)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn is_set(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    // Text of a set field, or the declared default when unset
    pub fn text(&self, field: &str) -> Option<&str> {
        match self.values.get(field) {
            Some(value) => value.as_text(),
            None => self.schema.field(field).and_then(|f| f.default),
        }
    }

    /// Like [`Record::text`] but treats an empty string as absent.
    pub fn non_empty_text(&self, field: &str) -> Option<&str> {
        self.text(field).filter(|s| !s.is_empty())
    }

    pub fn datetime(&self, field: &str) -> Option<DateTime<Local>> {
        match self.values.get(field) {
            Some(Value::DateTime(dt)) => Some(*dt),
            _ => None,
        }
    }

    pub fn record(&self, field: &str) -> Option<&Record> {
        match self.values.get(field) {
            Some(Value::Record(record)) => Some(record),
            _ => None,
        }
    }

    pub fn records(&self, field: &str) -> &[Record] {
        match self.values.get(field) {
            Some(Value::List(records)) => records,
            _ => &[],
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.non_empty_text("id")
    }
}
