//! Record flattening and the nested-collection boundary parser.
//!
//! Nested objects are flattened into [`DOT_SEP`]-joined keys. Arrays and
//! related-record collections are kept whole under their parent key.

#![allow(missing_docs)]

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::columns::DOT_SEP;
use crate::core::errors::{Result, SlaError};

/// A flattened record: dot-free keys to leaf values.
pub type FlatRecord = BTreeMap<String, Value>;

/// Per-record type metadata injected by the data source; never a field.
const ATTRIBUTES_KEY: &str = "attributes";

/// The two encodings a data source uses for a one-to-many relationship:
/// a bare list, or an object wrapping the list in `records`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RelatedRecords<T> {
    List(Vec<T>),
    Wrapped { records: Vec<T> },
}

impl<T> Default for RelatedRecords<T> {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl<T> RelatedRecords<T> {
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::List(items) | Self::Wrapped { records: items } => items,
        }
    }
}

/// Parse a relationship value into a sequence. Absent or null is empty.
pub fn parse_related<T: DeserializeOwned>(value: Option<&Value>, relation: &str) -> Result<Vec<T>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value::<RelatedRecords<T>>(value.clone())
            .map(RelatedRecords::into_vec)
            .map_err(|e| SlaError::MalformedRecord {
                details: format!("{relation}: {e}"),
            }),
    }
}

/// Like [`parse_related`], but items are decoded one at a time and items that
/// do not fit `T` are skipped. Only a malformed collection is an error.
pub fn parse_related_items<T: DeserializeOwned>(
    value: Option<&Value>,
    relation: &str,
) -> Result<Vec<T>> {
    Ok(parse_related::<Value>(value, relation)?
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

fn is_wrapped_collection(map: &serde_json::Map<String, Value>) -> bool {
    matches!(map.get("records"), Some(Value::Array(_)))
}

fn flatten_into(prefix: &str, value: &Value, out: &mut FlatRecord) {
    match value {
        Value::Object(map) if !is_wrapped_collection(map) => {
            for (key, child) in map {
                if key == ATTRIBUTES_KEY {
                    continue;
                }
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}{DOT_SEP}{key}")
                };
                flatten_into(&path, child, out);
            }
        }
        _ => {
            out.insert(prefix.to_string(), value.clone());
        }
    }
}

/// Deep-flatten one record. A record that is not a JSON object is malformed.
pub fn flatten_record(record: &Value) -> Result<FlatRecord> {
    match record {
        Value::Object(_) => {
            let mut out = FlatRecord::new();
            flatten_into("", record, &mut out);
            Ok(out)
        }
        other => Err(SlaError::MalformedRecord {
            details: format!("expected an object record, found {}", kind_name(other)),
        }),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Plain text of a leaf value. Composite values render empty.
#[must_use]
pub fn value_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}
