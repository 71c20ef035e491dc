//! Canonical ordering of keys and values.
//!
//! The remote service orders children the same way regardless of which side
//! does the sorting:
//!
//! - Keys: keys that parse as 32-bit integers come first, in numeric order,
//!   followed by all other keys in lexicographic order.
//! - Values: `null < false < true < numbers < strings < objects`. Numbers
//!   compare numerically, strings lexicographically, and objects compare
//!   equal to each other.
//!
//! Ties between values are broken by key.

use std::cmp::Ordering;

use serde_json::Value;

use crate::path::Path;

/// How the children of a query result are ordered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderBy {
    Key,
    Value,
    /// Order by the value at a relative path beneath each child.
    Child(Path),
}

impl OrderBy {
    /// The selector string sent on the wire (before JSON quoting).
    pub fn selector(&self) -> String {
        match self {
            Self::Key => "$key".to_string(),
            Self::Value => "$value".to_string(),
            Self::Child(path) => path.segments().join("/"),
        }
    }

    /// Parse a wire selector back into an ordering.
    ///
    /// Returns `None` for selectors this crate does not model (`$priority`)
    /// or for invalid child paths.
    pub fn from_selector(selector: &str) -> Option<Self> {
        match selector {
            "$key" => Some(Self::Key),
            "$value" => Some(Self::Value),
            s if s.starts_with('$') => None,
            s => Path::relative(s).ok().map(Self::Child),
        }
    }

    /// The value a child is sorted by under this ordering.
    ///
    /// For [`OrderBy::Key`] this is the key itself as a JSON string.
    pub fn sort_value(&self, key: &str, value: &Value) -> Value {
        match self {
            Self::Key => Value::String(key.to_string()),
            Self::Value => value.clone(),
            Self::Child(path) => lookup(value, path).cloned().unwrap_or(Value::Null),
        }
    }

    /// Compare two `(key, value)` children under this ordering.
    pub fn compare(&self, a: (&str, &Value), b: (&str, &Value)) -> Ordering {
        match self {
            Self::Key => compare_keys(a.0, b.0),
            _ => compare_values(&self.sort_value(a.0, a.1), &self.sort_value(b.0, b.1))
                .then_with(|| compare_keys(a.0, b.0)),
        }
    }

    /// Sort `(key, value)` children in place under this ordering.
    pub fn sort(&self, entries: &mut [(String, Value)]) {
        entries.sort_by(|a, b| self.compare((&a.0, &a.1), (&b.0, &b.1)));
    }
}

/// Compare two child keys in canonical key order.
pub fn compare_keys(a: &str, b: &str) -> Ordering {
    match (int_key(a), int_key(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Compare two values in canonical value order.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(false) => 1,
        Value::Bool(true) => 2,
        Value::Number(_) => 3,
        Value::String(_) => 4,
        Value::Array(_) | Value::Object(_) => 5,
    }
}

/// A key counts as an integer only in its canonical decimal form, so `"01"`
/// and `"+1"` sort as strings.
fn int_key(key: &str) -> Option<i32> {
    let n: i32 = key.parse().ok()?;
    (n.to_string() == key).then_some(n)
}

fn lookup<'a>(value: &'a Value, path: &Path) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(value, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}
