//! Barrier merge: folds one superstep's deltas into a new state snapshot.
//!
//! The merge is a pure function over the previous snapshot and the
//! superstep-local bag of messages. Routing messages never reach it; only
//! deltas are folded. The single policy is *append*: when parallel
//! branches write the same key, every contribution is preserved in a list,
//! in message-arrival order. Arrival order is the completion order of the
//! parallel vertex tasks and therefore nondeterministic; merged lists are
//! equal as multisets across runs, which is the property tests assert.
//!
//! Values are classified into [`ValueFamily`] before appending.
//! `serde_json::Value::Null` has no family and is rejected; mixing
//! families under one key is rejected. Richer policies (overwrite,
//! keep-first, custom reducers) are future extensions of this seam.

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::message::Message;
use crate::state::StateSnapshot;

/// Type family of a state value, used to police append compatibility.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueFamily {
    Int,
    Float,
    Bool,
    Str,
    List,
    Map,
}

impl fmt::Display for ValueFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::Bool => write!(f, "bool"),
            Self::Str => write!(f, "string"),
            Self::List => write!(f, "list"),
            Self::Map => write!(f, "map"),
        }
    }
}

/// Classifies a JSON value into its merge family.
///
/// Returns `None` for `Value::Null`, which has no append semantics.
#[must_use]
pub fn family_of(value: &Value) -> Option<ValueFamily> {
    match value {
        Value::Null => None,
        Value::Bool(_) => Some(ValueFamily::Bool),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                Some(ValueFamily::Int)
            } else {
                Some(ValueFamily::Float)
            }
        }
        Value::String(_) => Some(ValueFamily::Str),
        Value::Array(_) => Some(ValueFamily::List),
        Value::Object(_) => Some(ValueFamily::Map),
    }
}

/// Errors raised while folding a superstep's deltas.
#[derive(Debug, Error, Diagnostic)]
pub enum MergeError {
    /// A contribution was `null`, which has no merge family.
    #[error("cannot merge key '{key}': null has no merge family")]
    #[diagnostic(
        code(loomstep::merge::unknown_type),
        help("Vertices writing '{key}' under fan-in must produce non-null values.")
    )]
    UnknownType { key: String },

    /// Contributions to one key disagreed on their type family.
    #[error("type mismatch merging key '{key}': cannot append {found} after {expected}")]
    #[diagnostic(
        code(loomstep::merge::type_mismatch),
        help("All parallel contributions to '{key}' must share one type family.")
    )]
    TypeMismatch {
        key: String,
        expected: ValueFamily,
        found: ValueFamily,
    },
}

/// Folds one superstep's message bag into a new snapshot.
///
/// - Empty bag: the previous snapshot is returned unchanged (same
///   version).
/// - One delta: its keys overwrite the snapshot's keys; absent keys are
///   preserved.
/// - Several deltas (fan-in): keys contributed once overwrite; keys
///   contributed more than once append into a list in bag order, with
///   list contributions concatenated and scalars/maps appended as single
///   elements.
pub fn merge_superstep(prev: &StateSnapshot, bag: &[Message]) -> Result<StateSnapshot, MergeError> {
    let deltas: Vec<&FxHashMap<String, Value>> =
        bag.iter().filter_map(Message::as_delta).collect();

    match deltas.len() {
        0 => Ok(prev.clone()),
        1 => {
            let mut next = prev.view();
            for (key, value) in deltas[0] {
                next.insert(key.clone(), value.clone());
            }
            Ok(prev.replace(next))
        }
        _ => {
            // Gather contributions per key in bag (arrival) order.
            let mut contributions: FxHashMap<&String, Vec<&Value>> = FxHashMap::default();
            for delta in &deltas {
                for (key, value) in *delta {
                    contributions.entry(key).or_default().push(value);
                }
            }

            let mut next = prev.view();
            for (key, values) in contributions {
                let merged = if values.len() == 1 {
                    values[0].clone()
                } else {
                    append_contributions(key, &values)?
                };
                next.insert(key.clone(), merged);
            }
            Ok(prev.replace(next))
        }
    }
}

/// Builds the appended list for a key with multiple contributions.
fn append_contributions(key: &str, values: &[&Value]) -> Result<Value, MergeError> {
    let mut out: Vec<Value> = Vec::new();
    for value in values {
        match value {
            Value::Array(items) => {
                for item in items {
                    push_element(key, &mut out, item.clone())?;
                }
            }
            other => push_element(key, &mut out, (*other).clone())?,
        }
    }
    Ok(Value::Array(out))
}

fn push_element(key: &str, out: &mut Vec<Value>, element: Value) -> Result<(), MergeError> {
    let found = family_of(&element).ok_or_else(|| MergeError::UnknownType {
        key: key.to_string(),
    })?;
    if let Some(tail) = out.last()
        && let Some(expected) = family_of(tail)
        && expected != found
    {
        return Err(MergeError::TypeMismatch {
            key: key.to_string(),
            expected,
            found,
        });
    }
    out.push(element);
    Ok(())
}
