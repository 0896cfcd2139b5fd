//! Dashboard document access
//!
//! The charger serves `/json/dashboard.json` as a list of groups, each holding
//! an ordered list of fields. A field value is either a display string or a
//! table whose `items` carry their display string in the `c2` column:
//!
//! ```json
//! {"groups": [
//!   {"key": "system_status", "fields": [
//!     {"key": "SignaledCurrentLimit_vehicleif", "value": "16.0 A"}]},
//!   {"key": "emanager_status", "fields": [
//!     {"key": "FirstMeterTable_meter", "value": {"items": [
//!       {"key": "OcppMeterFrequency_meter", "c2": "50.01 Hz"}]}}]}
//! ]}
//! ```
//!
//! Keys are only meaningful inside the group/field being searched. Lookup is a
//! linear scan in document order and the first match wins.

use serde_json::Value;
use std::fmt;
use thiserror::Error;

const GROUPS: &str = "groups";
const FIELDS: &str = "fields";
const KEY: &str = "key";
const VALUE: &str = "value";
const ITEMS: &str = "items";
const ITEM_VALUE: &str = "c2";

/// Location of a scalar inside the dashboard tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPath {
    /// `group -> field`, scalar in the field's `value`
    Field {
        group: &'static str,
        field: &'static str,
    },
    /// `group -> field -> item`, scalar in the item's `c2` column
    SubItem {
        group: &'static str,
        field: &'static str,
        item: &'static str,
    },
}

impl FieldPath {
    pub const fn field(group: &'static str, field: &'static str) -> Self {
        FieldPath::Field { group, field }
    }

    pub const fn sub_item(group: &'static str, field: &'static str, item: &'static str) -> Self {
        FieldPath::SubItem { group, field, item }
    }

    pub const fn group(&self) -> &'static str {
        match self {
            FieldPath::Field { group, .. } | FieldPath::SubItem { group, .. } => *group,
        }
    }

    pub const fn field_key(&self) -> &'static str {
        match self {
            FieldPath::Field { field, .. } | FieldPath::SubItem { field, .. } => *field,
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPath::Field { group, field } => write!(f, "{}/{}", group, field),
            FieldPath::SubItem { group, field, item } => {
                write!(f, "{}/{}/{}", group, field, item)
            }
        }
    }
}

/// Why a scalar could not be located
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// No node along the path matched
    #[error("{path} not found in dashboard")]
    NotFound { path: FieldPath },

    /// A matching node exists but does not have the expected shape
    #[error("unexpected dashboard structure at {path}: {reason}")]
    Malformed {
        path: FieldPath,
        reason: &'static str,
    },
}

/// Locate the node holding the scalar addressed by `path`: the field's
/// `value`, or the sub-item's `c2` column. The node itself may be any JSON
/// type; only a missing node or a broken structure around it is an error.
///
/// Groups and fields without a `key` are skipped. Several groups may share a
/// key; they are searched in order until one contains the requested field.
pub fn locate<'a>(document: &'a Value, path: &FieldPath) -> Result<&'a Value, ExtractError> {
    let malformed = |reason| ExtractError::Malformed {
        path: *path,
        reason,
    };

    let groups = document
        .get(GROUPS)
        .ok_or(ExtractError::NotFound { path: *path })?
        .as_array()
        .ok_or_else(|| malformed("groups is not a list"))?;

    for group in groups.iter().filter(|g| has_key(g, path.group())) {
        let fields = group
            .get(FIELDS)
            .and_then(Value::as_array)
            .ok_or_else(|| malformed("group has no field list"))?;

        for field in fields.iter().filter(|f| has_key(f, path.field_key())) {
            match path {
                FieldPath::Field { .. } => {
                    return field
                        .get(VALUE)
                        .ok_or_else(|| malformed("field has no value"));
                }
                FieldPath::SubItem { item, .. } => {
                    let items = field
                        .get(VALUE)
                        .and_then(|v| v.get(ITEMS))
                        .and_then(Value::as_array)
                        .ok_or_else(|| malformed("field value has no item list"))?;

                    if let Some(entry) = items.iter().find(|i| has_key(i, item)) {
                        return entry
                            .get(ITEM_VALUE)
                            .ok_or_else(|| malformed("item has no value"));
                    }
                }
            }
        }
    }

    Err(ExtractError::NotFound { path: *path })
}

/// Locate the scalar string addressed by `path`; a non-string node is malformed
pub fn find<'a>(document: &'a Value, path: &FieldPath) -> Result<&'a str, ExtractError> {
    locate(document, path)?
        .as_str()
        .ok_or(ExtractError::Malformed {
            path: *path,
            reason: "value is not a string",
        })
}

fn has_key(node: &Value, key: &str) -> bool {
    node.get(KEY).and_then(Value::as_str) == Some(key)
}

/// One fetched dashboard document; lives for a single poll cycle
#[derive(Debug, Clone)]
pub struct Dashboard {
    root: Value,
}

impl Dashboard {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    /// The device flags an expired session with a falsy `logged_in` on an
    /// otherwise successful response. Absence of the flag means logged in.
    pub fn session_expired(&self) -> bool {
        matches!(
            self.root.get("logged_in"),
            Some(Value::Bool(false)) | Some(Value::Null)
        )
    }

    pub fn find(&self, path: &FieldPath) -> Result<&str, ExtractError> {
        find(&self.root, path)
    }

    pub fn locate(&self, path: &FieldPath) -> Result<&Value, ExtractError> {
        locate(&self.root, path)
    }
}
