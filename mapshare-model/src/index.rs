//! Index specs and the typed values extracted from JSON blobs.
//!
//! A dataset declares [`IndexSpec`]s naming a path into its things' blobs and
//! the type the value should be read as. Extraction is the only place a blob
//! is looked at as a JSON document; everything downstream sees an
//! [`ExtractedValue`]. A path that is absent, or holds something the declared
//! type cannot represent, extracts as `None`.

use mapshare_types::{DatasetId, IndexSpecId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Declared value type of an indexed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexType {
    /// Ordered numbers.
    Numeric,
    /// Free text; ordered lexically, supports substring matching.
    String,
    /// Category labels; equality and membership only.
    Lookup,
}

impl IndexType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexType::Numeric => "numeric",
            IndexType::String => "string",
            IndexType::Lookup => "lookup",
        }
    }

    /// Reads a JSON value as this type.
    pub fn coerce(&self, value: &Value) -> Option<ExtractedValue> {
        match self {
            IndexType::Numeric => match value {
                Value::Number(n) => n.as_f64().map(ExtractedValue::Numeric),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .map(ExtractedValue::Numeric),
                _ => None,
            },
            IndexType::String => scalar_text(value).map(ExtractedValue::Text),
            IndexType::Lookup => {
                scalar_text(value).map(|s| ExtractedValue::Lookup(s.trim().to_lowercase()))
            }
        }
    }

    /// Whether filtering with `op` makes sense for values of this type.
    pub fn supports(&self, op: IndexOp) -> bool {
        match self {
            IndexType::Numeric => op != IndexOp::Contains,
            IndexType::String => true,
            IndexType::Lookup => matches!(op, IndexOp::Eq | IndexOp::Ne | IndexOp::In),
        }
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "numeric" => Ok(IndexType::Numeric),
            "string" => Ok(IndexType::String),
            "lookup" => Ok(IndexType::Lookup),
            other => Err(format!("unknown index type: {other}")),
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// A value pulled out of a blob, typed by its index spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ExtractedValue {
    Numeric(f64),
    Text(String),
    Lookup(String),
}

impl ExtractedValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ExtractedValue::Numeric(n) => Some(*n),
            _ => None,
        }
    }
}

/// Comparison operators accepted by index filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    Contains,
}

impl IndexOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexOp::Eq => "eq",
            IndexOp::Ne => "ne",
            IndexOp::Lt => "lt",
            IndexOp::Lte => "lte",
            IndexOp::Gt => "gt",
            IndexOp::Gte => "gte",
            IndexOp::In => "in",
            IndexOp::Contains => "contains",
        }
    }
}

impl fmt::Display for IndexOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A per-dataset declaration of a blob field to extract and index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub id: IndexSpecId,
    pub dataset: DatasetId,
    /// Dotted path (`address.city`, `tags.0`) or JSON pointer (`/address/city`).
    pub attr_name: String,
    pub attr_type: IndexType,
}

impl IndexSpec {
    pub fn new(dataset: DatasetId, attr_name: impl Into<String>, attr_type: IndexType) -> Self {
        Self {
            id: IndexSpecId::new(),
            dataset,
            attr_name: attr_name.into(),
            attr_type,
        }
    }

    /// Shorthand for a numeric index.
    pub fn numeric(dataset: DatasetId, attr_name: impl Into<String>) -> Self {
        Self::new(dataset, attr_name, IndexType::Numeric)
    }

    /// Shorthand for a string index.
    pub fn string(dataset: DatasetId, attr_name: impl Into<String>) -> Self {
        Self::new(dataset, attr_name, IndexType::String)
    }

    /// Shorthand for a lookup (category) index.
    pub fn lookup(dataset: DatasetId, attr_name: impl Into<String>) -> Self {
        Self::new(dataset, attr_name, IndexType::Lookup)
    }

    /// Extracts this spec's value from an already parsed blob.
    pub fn extract(&self, blob: &Value) -> Option<ExtractedValue> {
        let found = blob.pointer(&field_pointer(&self.attr_name))?;
        self.attr_type.coerce(found)
    }
}

/// Converts a dotted field path into a JSON pointer. Paths that already start
/// with `/` are taken to be pointers and returned unchanged.
pub fn field_pointer(path: &str) -> String {
    if path.starts_with('/') {
        return path.to_string();
    }
    path.split('.')
        .map(|segment| segment.replace('~', "~0").replace('/', "~1"))
        .fold(String::new(), |mut pointer, segment| {
            pointer.push('/');
            pointer.push_str(&segment);
            pointer
        })
}
