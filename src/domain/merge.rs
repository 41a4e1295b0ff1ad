// Deep merge and keyword stripping over JSON values

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Keys that never take part in a merge and are stripped before a payload
/// leaves the process. Model instances keep their bookkeeping under these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservedKeys(BTreeSet<String>);

impl ReservedKeys {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(keys.into_iter().map(Into::into).collect())
    }

    pub fn none() -> Self {
        Self(BTreeSet::new())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    pub fn insert(&mut self, key: &str) {
        self.0.insert(key.to_string());
    }
}

impl Default for ReservedKeys {
    fn default() -> Self {
        Self::new([
            "$$array",
            "$save",
            "$destroy",
            "$pending",
            "$rollback",
            "$diff",
            "$update",
            "$commit",
            "$copy",
        ])
    }
}

/// JavaScript-style truthiness: null, false, 0 and "" are falsy
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Recursively merge `src` into `dst`.
///
/// - reserved keys are skipped
/// - nested mappings merge key-wise
/// - an existing non-empty sequence is kept; incoming sequences never concatenate
/// - anything else in `src` overwrites a truthy scalar, or fills an absent/falsy slot
pub fn extend_deep(dst: &mut Map<String, Value>, src: &Map<String, Value>, reserved: &ReservedKeys) {
    for (key, value) in src {
        if reserved.contains(key) {
            continue;
        }

        match dst.get_mut(key) {
            Some(existing) if is_truthy(existing) => match (existing, value) {
                (Value::Array(_), _) => {}
                (Value::Object(existing), Value::Object(incoming)) => {
                    extend_deep(existing, incoming, reserved)
                }
                (Value::Object(_), _) => {}
                (existing, value) => *existing = value.clone(),
            },
            _ => {
                dst.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Remove reserved keys from the top level of a payload
pub fn strip_reserved(value: &mut Value, reserved: &ReservedKeys) {
    if let Value::Object(map) = value {
        map.retain(|key, _| !reserved.contains(key));
    }
}
