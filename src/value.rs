//! Tri-state attribute values.
//!
//! State trees are plain `serde_json::Value` documents. A JSON `null` (or an
//! absent key) is an unset attribute, and a value not yet known at plan time is
//! carried as the string [`UNKNOWN`]. Resource models lift these into the typed
//! [`TriState`], which keeps *unknown* distinct from *null*.

use serde_json::Value;

/// Sentinel string standing in for a value that is not known until apply.
pub const UNKNOWN: &str = "74D93920-ED26-11E3-AC10-0800200C9A66";

/// The unknown sentinel as a JSON value.
pub fn unknown() -> Value {
    Value::String(UNKNOWN.to_string())
}

/// Whether `value` is the unknown sentinel.
pub fn is_unknown(value: &Value) -> bool {
    matches!(value, Value::String(s) if s == UNKNOWN)
}

/// Whether `value` is unknown at any depth.
pub fn contains_unknown(value: &Value) -> bool {
    match value {
        Value::String(s) => s == UNKNOWN,
        Value::Array(items) => items.iter().any(contains_unknown),
        Value::Object(map) => map.values().any(contains_unknown),
        _ => false,
    }
}

/// Whether `value` is known and not null.
pub fn is_set(value: Option<&Value>) -> bool {
    matches!(value, Some(v) if !v.is_null() && !is_unknown(v))
}

/// Look up a dotted attribute path such as `oidc_options.grant_types`.
///
/// Numeric segments index into arrays.
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Replace every unknown leaf in `value` with `null`.
///
/// Used when a Read seed or an import seed carries placeholders.
pub fn strip_unknown(value: &mut Value) {
    match value {
        Value::String(s) if s == UNKNOWN => *value = Value::Null,
        Value::Array(items) => items.iter_mut().for_each(strip_unknown),
        Value::Object(map) => map.values_mut().for_each(strip_unknown),
        _ => {},
    }
}

/// A typed attribute value that may be null, unknown, or known.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TriState<T> {
    /// The attribute is unset.
    #[default]
    Null,
    /// The attribute will be computed by the server.
    Unknown,
    /// The attribute has a concrete value.
    Known(T),
}

impl<T> TriState<T> {
    /// Whether the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether the value is unknown.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Whether the value is neither null nor unknown.
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    /// Borrow the known value, if any.
    pub fn known(&self) -> Option<&T> {
        match self {
            Self::Known(v) => Some(v),
            _ => None,
        }
    }

    /// Take the known value, treating null and unknown alike.
    ///
    /// This is the expand direction of the bridge: both are omitted from requests.
    pub fn into_known(self) -> Option<T> {
        match self {
            Self::Known(v) => Some(v),
            _ => None,
        }
    }

    /// Map the known value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> TriState<U> {
        match self {
            Self::Null => TriState::Null,
            Self::Unknown => TriState::Unknown,
            Self::Known(v) => TriState::Known(f(v)),
        }
    }

    /// Borrowing view.
    pub fn as_ref(&self) -> TriState<&T> {
        match self {
            Self::Null => TriState::Null,
            Self::Unknown => TriState::Unknown,
            Self::Known(v) => TriState::Known(v),
        }
    }

    /// Keep `self` unless it is unknown, in which case fall back to `other`.
    pub fn or_if_unknown(self, other: TriState<T>) -> TriState<T> {
        match self {
            Self::Unknown => other,
            v => v,
        }
    }
}

impl<T: Clone> TriState<T> {
    /// Clone out the known value.
    pub fn cloned_known(&self) -> Option<T> {
        self.known().cloned()
    }
}

impl TriState<String> {
    /// Borrow a known string.
    pub fn as_deref(&self) -> Option<&str> {
        self.known().map(String::as_str)
    }
}

impl<T> From<Option<T>> for TriState<T> {
    /// Flatten direction of the bridge: an absent DTO field becomes null.
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Known(v),
            None => Self::Null,
        }
    }
}
