//! Normalization of submitted annotation records.
//!
//! Clients submit loosely shaped records. Before a record is merged into an
//! annotation file (or forwarded upstream) it is brought into the canonical
//! shape: selector and label present, `label` a sequence, `tag`/`class`/`id`
//! derived from the selector where missing, and a timestamp.
//!
//! Two call sites use the normalizer with different contracts, expressed as
//! a [`NormalizePolicy`]:
//!
//! - the local append route skips invalid records and defaults `color`;
//! - the upstream append route rejects the whole batch on the first invalid
//!   record and leaves `color` alone.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored JSON record with arbitrary fields.
pub type Record = Map<String, Value>;

/// Color given to locally appended annotations that arrive without one.
pub const DEFAULT_COLOR: &str = "#F44336";

/// Tag used when the selector does not start with one.
pub const DEFAULT_TAG: &str = "div";

/// Current time in the timestamp format used by stored records.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A normalized annotation record.
///
/// Fields the normalizer does not know about are carried in `extra` and
/// written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub selector: String,
    pub label: Vec<Value>,
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub timestamp: String,
    #[serde(flatten)]
    pub extra: Record,
}

impl Annotation {
    pub fn into_record(self) -> Record {
        match serde_json::to_value(self) {
            Ok(Value::Object(record)) => record,
            // A struct always serializes to an object
            _ => Record::new(),
        }
    }
}

/// Why a submitted record could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The submitted value is not a JSON object
    NotAnObject,
    /// `selector` absent or empty
    MissingSelector,
    /// `label` absent or empty
    MissingLabel,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::NotAnObject => write!(f, "annotation is not an object"),
            Rejection::MissingSelector => write!(f, "selector is required"),
            Rejection::MissingLabel => write!(f, "label is required"),
        }
    }
}

/// Per-call-site normalization options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizePolicy {
    /// Fill in [`DEFAULT_COLOR`] when no color was submitted.
    pub default_color: bool,
}

impl NormalizePolicy {
    /// Policy of the local append route.
    pub fn local() -> Self {
        Self {
            default_color: true,
        }
    }

    /// Policy of the upstream append route.
    pub fn upstream() -> Self {
        Self {
            default_color: false,
        }
    }
}

/// Split a selector into its default tag and class.
///
/// The tag is the first dot-delimited token (or [`DEFAULT_TAG`] when the
/// selector starts with a dot); the class is every other non-empty token
/// that differs from the first one, joined by spaces.
pub fn selector_parts(selector: &str) -> (String, Option<String>) {
    let mut tokens = selector.split('.');
    let first = tokens.next().unwrap_or_default();

    let tag = if first.is_empty() {
        DEFAULT_TAG.to_string()
    } else {
        first.to_string()
    };

    let classes: Vec<&str> = tokens.filter(|t| !t.is_empty() && *t != first).collect();
    let class = if classes.is_empty() {
        None
    } else {
        Some(classes.join(" "))
    };

    (tag, class)
}

/// Turn a submitted `label` value into a label sequence.
///
/// Returns `None` for values that count as "no label": null, `false`, `0`,
/// empty strings, empty arrays and empty objects. Array items are kept as
/// submitted; any other value becomes a one-item sequence.
pub fn label_sequence(value: &Value) -> Option<Vec<Value>> {
    if is_falsy(value) {
        return None;
    }
    match value {
        Value::Array(items) => Some(items.clone()),
        other => Some(vec![other.clone()]),
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(true) => false,
    }
}

/// Take a string field out of a record, treating empty strings as absent.
fn take_text(record: &mut Record, key: &str) -> Option<String> {
    match record.remove(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Null) | None => None,
        Some(Value::String(_)) => None,
        Some(other) => Some(other.to_string()),
    }
}

/// Normalize one submitted record under `policy`.
pub fn normalize(value: Value, policy: NormalizePolicy) -> Result<Annotation, Rejection> {
    let Value::Object(mut record) = value else {
        return Err(Rejection::NotAnObject);
    };

    let selector = take_text(&mut record, "selector").ok_or(Rejection::MissingSelector)?;
    let label = record
        .get("label")
        .and_then(label_sequence)
        .ok_or(Rejection::MissingLabel)?;
    record.remove("label");
    record.remove("labels");

    let timestamp = take_text(&mut record, "timestamp").unwrap_or_else(now_timestamp);

    let submitted_color = take_text(&mut record, "color");
    let color = if policy.default_color {
        Some(submitted_color.unwrap_or_else(|| DEFAULT_COLOR.to_string()))
    } else {
        submitted_color
    };

    let (derived_tag, derived_class) = selector_parts(&selector);
    let tag = take_text(&mut record, "tag").unwrap_or(derived_tag);

    // An explicitly empty class survives when the selector yields nothing
    let submitted_class = record.remove("class");
    let class = match submitted_class {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::String(s)) => derived_class.or(Some(s)),
        Some(Value::Null) | None => derived_class,
        Some(other) => Some(other.to_string()),
    };

    let id = take_text(&mut record, "id").unwrap_or_default();

    Ok(Annotation {
        selector,
        label,
        tag,
        class,
        id,
        color,
        timestamp,
        extra: record,
    })
}
