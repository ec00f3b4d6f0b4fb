//! Conversion between state trees and typed models.
//!
//! Resource handlers declare their models with [`state_model!`] and their
//! closed string sets with [`api_enum!`]. The generated impls convert a
//! `serde_json::Value` state tree into a typed struct of [`TriState`] fields
//! and back, reporting failures as diagnostics bound to attribute paths.
//!
//! The "expand" direction (state to request DTO) goes through
//! [`TriState::into_known`], which drops null and unknown fields. The
//! "flatten" direction (response DTO to state) goes through
//! `TriState::from(Option<T>)`, which maps absent fields to null.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::diagnostics::Diagnostic;
use crate::value::{self, TriState};

/// Build a typed model from a state value.
pub trait FromValue: Sized {
    /// Convert `value`, using `path` to label diagnostics.
    fn from_value(value: &Value, path: &str) -> Result<Self, Diagnostic>;
}

/// Render a typed model back into a state value.
pub trait IntoValue {
    /// Convert into a state value.
    fn into_value(self) -> Value;
}

/// Convert a whole state document into a model.
pub fn from_state<T: FromValue>(state: &Value) -> Result<T, Diagnostic> {
    T::from_value(state, "")
}

#[doc(hidden)]
pub fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn conversion_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    let diag = Diagnostic::error("Value Conversion Error").with_detail(format!(
        "Expected {} but found {}. This is always a provider bug, please report it.",
        expected,
        type_name(got)
    ));
    if path.is_empty() {
        diag
    } else {
        diag.with_attribute(path)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(s) if s == value::UNKNOWN => "unknown",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl FromValue for String {
    fn from_value(value: &Value, path: &str) -> Result<Self, Diagnostic> {
        match value {
            Value::String(s) if s != value::UNKNOWN => Ok(s.clone()),
            other => Err(conversion_error(path, "string", other)),
        }
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl FromValue for bool {
    fn from_value(value: &Value, path: &str) -> Result<Self, Diagnostic> {
        value
            .as_bool()
            .ok_or_else(|| conversion_error(path, "bool", value))
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value, path: &str) -> Result<Self, Diagnostic> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .ok_or_else(|| conversion_error(path, "int64", value)),
            other => Err(conversion_error(path, "int64", other)),
        }
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::from(self)
    }
}

impl FromValue for Value {
    fn from_value(value: &Value, _path: &str) -> Result<Self, Diagnostic> {
        Ok(value.clone())
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value, path: &str) -> Result<Self, Diagnostic> {
        match value {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| T::from_value(item, &join_path(path, &i.to_string())))
                .collect(),
            other => Err(conversion_error(path, "list", other)),
        }
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::Array(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: FromValue> FromValue for BTreeMap<String, T> {
    fn from_value(value: &Value, path: &str) -> Result<Self, Diagnostic> {
        match value {
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| Ok((k.clone(), T::from_value(v, &join_path(path, k))?)))
                .collect(),
            other => Err(conversion_error(path, "map", other)),
        }
    }
}

impl<T: IntoValue> IntoValue for BTreeMap<String, T> {
    fn into_value(self) -> Value {
        Value::Object(
            self.into_iter()
                .map(|(k, v)| (k, v.into_value()))
                .collect::<Map<String, Value>>(),
        )
    }
}

impl<T: FromValue> FromValue for TriState<T> {
    fn from_value(value: &Value, path: &str) -> Result<Self, Diagnostic> {
        if value.is_null() {
            Ok(TriState::Null)
        } else if value::is_unknown(value) {
            Ok(TriState::Unknown)
        } else {
            T::from_value(value, path).map(TriState::Known)
        }
    }
}

impl<T: IntoValue> IntoValue for TriState<T> {
    fn into_value(self) -> Value {
        match self {
            TriState::Null => Value::Null,
            TriState::Unknown => value::unknown(),
            TriState::Known(v) => v.into_value(),
        }
    }
}

/// Declare a typed state model.
///
/// Each field maps to the attribute of the same name. A field may carry
/// `#[attr = "..."]` when the attribute name is a Rust keyword.
///
/// ```ignore
/// state_model! {
///     pub struct GroupModel {
///         id: TriState<String>,
///         name: TriState<String>,
///     }
/// }
/// ```
#[macro_export]
macro_rules! state_model {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[attr = $attr:literal])?
                $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        $vis struct $name {
            $(
                #[allow(missing_docs)]
                pub $field: $ty,
            )*
        }

        impl $crate::bridge::FromValue for $name {
            fn from_value(
                value: &::serde_json::Value,
                path: &str,
            ) -> ::std::result::Result<Self, $crate::diagnostics::Diagnostic> {
                let empty = ::serde_json::Map::new();
                let object = match value {
                    ::serde_json::Value::Object(map) => map,
                    ::serde_json::Value::Null => &empty,
                    _ => {
                        return Err($crate::diagnostics::Diagnostic::error("Value Conversion Error")
                            .with_detail(format!(
                                "Expected an object for {}. This is always a provider bug, please report it.",
                                stringify!($name)
                            )));
                    },
                };
                Ok(Self {
                    $(
                        $field: {
                            let attr = $crate::__attr_name!($field $(, $attr)?);
                            $crate::bridge::FromValue::from_value(
                                object.get(attr).unwrap_or(&::serde_json::Value::Null),
                                &$crate::bridge::join_path(path, attr),
                            )?
                        },
                    )*
                })
            }
        }

        impl $crate::bridge::IntoValue for $name {
            fn into_value(self) -> ::serde_json::Value {
                let mut map = ::serde_json::Map::new();
                $(
                    map.insert(
                        $crate::__attr_name!($field $(, $attr)?).to_string(),
                        $crate::bridge::IntoValue::into_value(self.$field),
                    );
                )*
                ::serde_json::Value::Object(map)
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __attr_name {
    ($field:ident, $attr:literal) => {
        $attr
    };
    ($field:ident) => {
        stringify!($field)
    };
}

/// Declare a closed set of API strings.
///
/// Values the server returns outside the set are kept verbatim in `Other`.
#[macro_export]
macro_rules! api_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $variant:ident => $wire:literal ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        $vis enum $name {
            $(
                #[allow(missing_docs)]
                $variant,
            )*
            /// A value outside the known set.
            Other(String),
        }

        impl $name {
            /// Every accepted wire value.
            pub const ALLOWED: &'static [&'static str] = &[$($wire),*];

            /// The wire representation.
            pub fn as_str(&self) -> &str {
                match self {
                    $( Self::$variant => $wire, )*
                    Self::Other(s) => s.as_str(),
                }
            }

            /// Parse a wire value, preserving unknown ones.
            pub fn from_api(s: &str) -> Self {
                match s {
                    $( $wire => Self::$variant, )*
                    other => Self::Other(other.to_string()),
                }
            }

            /// Allowed values as owned strings, for `one_of` validators.
            pub fn allowed() -> Vec<String> {
                Self::ALLOWED.iter().map(|s| s.to_string()).collect()
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = <String as ::serde::Deserialize>::deserialize(deserializer)?;
                Ok(Self::from_api(&s))
            }
        }

        impl $crate::bridge::FromValue for $name {
            fn from_value(
                value: &::serde_json::Value,
                path: &str,
            ) -> ::std::result::Result<Self, $crate::diagnostics::Diagnostic> {
                <String as $crate::bridge::FromValue>::from_value(value, path)
                    .map(|s| Self::from_api(&s))
            }
        }

        impl $crate::bridge::IntoValue for $name {
            fn into_value(self) -> ::serde_json::Value {
                ::serde_json::Value::String(self.as_str().to_string())
            }
        }
    };
}

/// Pick the single variant block that is set.
///
/// `candidates` pairs each variant's attribute name with whether it is set.
/// Zero or several set variants produce an "Invalid variant configuration"
/// error naming the candidates.
pub fn select_variant<'a>(candidates: &[(&'a str, bool)]) -> Result<&'a str, Diagnostic> {
    let set: Vec<&str> = candidates
        .iter()
        .filter(|(_, is_set)| *is_set)
        .map(|(name, _)| *name)
        .collect();
    let names = candidates
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ");

    match set.as_slice() {
        [one] => Ok(*one),
        [] => Err(Diagnostic::error("Invalid variant configuration")
            .with_detail(format!("Exactly one of {} must be set.", names))),
        many => Err(Diagnostic::error("Invalid variant configuration").with_detail(format!(
            "Only one of {} may be set, found {}.",
            names,
            many.join(", ")
        ))),
    }
}

/// Convert a set of strings from state into a sorted, de-duplicated vector.
pub fn string_set(values: TriState<Vec<String>>) -> Option<Vec<String>> {
    values.into_known().map(|mut v| {
        v.sort();
        v.dedup();
        v
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    crate::api_enum! {
        enum Colour {
            Red => "RED",
            Green => "GREEN",
        }
    }

    crate::state_model! {
        struct Inner {
            value: TriState<String>,
        }
    }

    crate::state_model! {
        struct Sample {
            id: TriState<String>,
            count: TriState<i64>,
            enabled: TriState<bool>,
            #[attr = "type"]
            kind: TriState<Colour>,
            tags: TriState<Vec<String>>,
            labels: TriState<BTreeMap<String, String>>,
            inner: TriState<Inner>,
        }
    }

    #[test]
    fn test_model_from_value_tri_state() {
        let state = json!({
            "id": value::UNKNOWN,
            "count": 3,
            "enabled": null,
            "type": "GREEN",
            "tags": ["a", "b"],
            "inner": {"value": "x"}
        });
        let model: Sample = from_state(&state).unwrap();

        assert!(model.id.is_unknown());
        assert_eq!(model.count, TriState::Known(3));
        assert!(model.enabled.is_null());
        assert_eq!(model.kind, TriState::Known(Colour::Green));
        assert_eq!(
            model.tags,
            TriState::Known(vec!["a".to_string(), "b".to_string()])
        );
        assert!(model.labels.is_null());
        assert_eq!(
            model.inner.known().and_then(|i| i.value.as_deref()),
            Some("x")
        );
    }

    #[test]
    fn test_model_into_value_keeps_unknown_and_null() {
        let model = Sample {
            id: TriState::Unknown,
            kind: TriState::Known(Colour::Other("BLUE".to_string())),
            ..Default::default()
        };
        let value = model.into_value();
        assert_eq!(value["id"], json!(value::UNKNOWN));
        assert_eq!(value["type"], json!("BLUE"));
        assert_eq!(value["count"], Value::Null);
    }

    #[test]
    fn test_conversion_error_carries_path() {
        let err = from_state::<Sample>(&json!({"inner": {"value": 5}})).unwrap_err();
        assert_eq!(err.summary, "Value Conversion Error");
        assert_eq!(err.attribute.as_deref(), Some("inner.value"));
    }

    #[test]
    fn test_api_enum_preserves_unknown_server_values() {
        assert_eq!(Colour::from_api("RED"), Colour::Red);
        assert_eq!(Colour::from_api("PURPLE").as_str(), "PURPLE");
        assert_eq!(Colour::ALLOWED, &["RED", "GREEN"]);
        let parsed: Colour = serde_json::from_value(json!("GREEN")).unwrap();
        assert_eq!(parsed, Colour::Green);
        assert_eq!(serde_json::to_value(Colour::Red).unwrap(), json!("RED"));
    }

    #[test]
    fn test_select_variant() {
        assert_eq!(
            select_variant(&[("oidc_options", true), ("saml_options", false)]).unwrap(),
            "oidc_options"
        );

        let none = select_variant(&[("oidc_options", false), ("saml_options", false)]).unwrap_err();
        assert_eq!(
            none.detail.as_deref(),
            Some("Exactly one of oidc_options, saml_options must be set.")
        );

        let both = select_variant(&[("oidc_options", true), ("saml_options", true)]).unwrap_err();
        assert!(both.detail.unwrap().contains("found oidc_options, saml_options"));
    }

    #[test]
    fn test_string_set_sorts_and_dedups() {
        let set = string_set(TriState::Known(vec![
            "b".to_string(),
            "a".to_string(),
            "b".to_string(),
        ]));
        assert_eq!(set, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(string_set(TriState::Unknown), None);
    }
}
