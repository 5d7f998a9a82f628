use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Name of the field every record carries
pub const WALLTIME: &str = "walltime";
/// Name of the optional per-element field
pub const SOURCE: &str = "source";

/// A single extracted value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Float(f64),
    /// Clock time in seconds
    Time(f64),
    Text(String),
}

impl Value {
    /// Numeric view of the value; text has none
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) | Value::Time(f) => Some(*f),
            Value::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Time(t) => write!(f, "{}", crate::clocktime::format(*t)),
            Value::Text(s) => write!(f, "{}", s),
        }
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

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

/// One parsed observation from a matched log line.
///
/// Fields keep their insertion order; `walltime` always comes first and
/// `source` second when present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    fields: IndexMap<String, Value>,
}

impl EventRecord {
    pub fn new(walltime: f64, source: Option<&str>) -> Self {
        let mut fields = IndexMap::new();
        fields.insert(WALLTIME.to_string(), Value::Time(walltime));
        if let Some(source) = source {
            fields.insert(SOURCE.to_string(), Value::Text(source.to_string()));
        }
        EventRecord { fields }
    }

    pub(crate) fn insert(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }

    pub fn walltime(&self) -> f64 {
        self.fields
            .get(WALLTIME)
            .and_then(Value::as_f64)
            .unwrap_or(f64::NAN)
    }

    pub fn source(&self) -> Option<&str> {
        self.fields.get(SOURCE).and_then(Value::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Equality constraints applied when reading a store.
///
/// A constraint only excludes records that carry the constrained field with
/// a different value; records without the field pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    constraints: IndexMap<String, Value>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constraints.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn matches(&self, record: &EventRecord) -> bool {
        self.constraints
            .iter()
            .all(|(key, expected)| record.get(key).map_or(true, |v| v == expected))
    }
}
