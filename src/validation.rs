//! Schema validation.
//!
//! Validates a configuration `serde_json::Value` against a [`Schema`]:
//! presence, types, per-attribute [`Validator`]s, and block-level
//! [`BlockValidator`]s. Unknown values are never validated, since they only
//! become concrete at apply time.
//!
//! # Example
//!
//! ```
//! use pingone_provider::schema::{Attribute, Schema, Validator};
//! use pingone_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute(
//!         "environment_id",
//!         Attribute::required_string().with_validator(Validator::ResourceId),
//!     );
//!
//! let diagnostics = validate(&schema, &json!({"name": "g1", "environment_id": "nope"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("environment_id".to_string()));
//! ```

use regex::Regex;
use serde_json::{Map, Value};

use crate::bridge::join_path;
use crate::diagnostics::Diagnostic;
use crate::schema::{Attribute, AttributeType, Block, BlockNestingMode, BlockValidator, NestedBlock, Schema, Validator};
use crate::value::{self, is_set};
use crate::verify;

/// Validate a configuration against a schema.
///
/// An empty result means the configuration is valid. Computed-only attributes
/// and unknown values are skipped; everything else is checked for presence,
/// type, set uniqueness, attribute validators, block validators, and nested
/// block item counts.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

/// [`validate`] as a `Result`.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    match validate(schema, value) {
        diagnostics if diagnostics.is_empty() => Ok(()),
        diagnostics => Err(diagnostics),
    }
}

/// Whether `value` passes [`validate`] without diagnostics.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn validate_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    if value.is_null() || value::is_unknown(value) {
        return;
    }
    let Value::Object(object) = value else {
        diagnostics.push(at(
            Diagnostic::error("Incorrect Object Value Type")
                .with_detail(format!("Expected an object, got {}.", kind_of(value))),
            path,
        ));
        return;
    };

    for (name, attribute) in &block.attributes {
        validate_attribute(attribute, object, &join_path(path, name), name, diagnostics);
    }
    for (name, nested) in &block.blocks {
        validate_nested_block(nested, object.get(name), &join_path(path, name), diagnostics);
    }
    for rule in &block.validators {
        validate_block_rule(rule, object, path, diagnostics);
    }
}

fn validate_attribute(
    attribute: &Attribute,
    siblings: &Map<String, Value>,
    path: &str,
    name: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attribute.flags.computed_only() {
        return;
    }
    let value = match siblings.get(name) {
        None | Some(Value::Null) => {
            if attribute.flags.required {
                diagnostics.push(
                    Diagnostic::error("Missing Configuration for Required Attribute")
                        .with_detail(format!("Must set a configuration value for the {} attribute.", path))
                        .with_attribute(path),
                );
            }
            return;
        },
        Some(v) if value::is_unknown(v) => return,
        Some(v) => v,
    };

    let before = diagnostics.len();
    check_type(&attribute.attr_type, value, path, diagnostics);
    if diagnostics.len() == before {
        for validator in &attribute.validators {
            apply_validator(validator, value, siblings, path, diagnostics);
        }
    }
}

fn check_type(expected: &AttributeType, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    if value::is_unknown(value) {
        return;
    }
    let matches = match expected {
        AttributeType::String => value.is_string(),
        AttributeType::Int64 => as_i64(value).is_some(),
        AttributeType::Float64 => value.is_number(),
        AttributeType::Bool => value.is_boolean(),
        AttributeType::Dynamic => true,
        AttributeType::List(element) | AttributeType::Set(element) => match value.as_array() {
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    check_type(element, item, &join_path(path, &i.to_string()), diagnostics);
                }
                if matches!(expected, AttributeType::Set(_)) {
                    check_set_unique(items, path, diagnostics);
                }
                true
            },
            None => false,
        },
        AttributeType::Map(element) => match value.as_object() {
            Some(entries) => {
                for (key, item) in entries {
                    check_type(element, item, &join_path(path, key), diagnostics);
                }
                true
            },
            None => false,
        },
    };
    if !matches {
        diagnostics.push(
            Diagnostic::error("Incorrect Attribute Value Type")
                .with_detail(format!("Attribute {} expects {}, got {}.", path, type_label(expected), kind_of(value)))
                .with_attribute(path),
        );
    }
}

fn check_set_unique(items: &[Value], path: &str, diagnostics: &mut Vec<Diagnostic>) {
    for (i, item) in items.iter().enumerate() {
        if value::contains_unknown(item) {
            continue;
        }
        if items[..i].contains(item) {
            diagnostics.push(
                Diagnostic::error("Duplicate Set Element")
                    .with_detail(format!("This attribute contains duplicate values of: {}", item))
                    .with_attribute(path),
            );
            return;
        }
    }
}

fn apply_validator(
    validator: &Validator,
    value: &Value,
    siblings: &Map<String, Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match validator {
        Validator::ConflictsWith(names) => {
            for name in names {
                if is_set(siblings.get(name)) {
                    diagnostics.push(combination_error(
                        path,
                        format!("Attribute \"{}\" cannot be specified when \"{}\" is specified", name, path),
                    ));
                }
            }
        },
        Validator::AlsoRequires(names) => {
            for name in names {
                let sibling = siblings.get(name);
                if !is_set(sibling) && !sibling.is_some_and(value::is_unknown) {
                    diagnostics.push(combination_error(
                        path,
                        format!("Attribute \"{}\" must be specified when \"{}\" is specified", name, path),
                    ));
                }
            }
        },
        Validator::ForbiddenWhen { attribute, values } => {
            if let Some(Value::String(current)) = siblings.get(attribute) {
                if values.contains(current) {
                    diagnostics.push(combination_error(
                        path,
                        format!(
                            "Attribute \"{}\" cannot be specified when \"{}\" is \"{}\"",
                            path, attribute, current
                        ),
                    ));
                }
            }
        },
        Validator::SizeAtLeast(min) => {
            let len = match value {
                Value::Array(items) => items.len(),
                Value::Object(map) => map.len(),
                _ => return,
            };
            if len < *min {
                diagnostics.push(
                    Diagnostic::error("Invalid Attribute Value")
                        .with_detail(format!(
                            "Attribute {} must contain at least {} elements, got: {}",
                            path, min, len
                        ))
                        .with_attribute(path),
                );
            }
        },
        scalar => match value {
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    apply_scalar_validator(scalar, item, &format!("{}.{}", path, i), diagnostics);
                }
            },
            Value::Object(map) => {
                for (key, item) in map {
                    apply_scalar_validator(scalar, item, &format!("{}.{}", path, key), diagnostics);
                }
            },
            v => apply_scalar_validator(scalar, v, path, diagnostics),
        },
    }
}

fn apply_scalar_validator(
    validator: &Validator,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if value.is_null() || value::is_unknown(value) {
        return;
    }

    let failure = match (validator, value) {
        (Validator::LengthAtLeast(min), Value::String(s)) => (s.chars().count() < *min).then(|| {
            (
                "Invalid Attribute Value Length",
                format!(
                    "Attribute {} string length must be at least {}, got: {}",
                    path,
                    min,
                    s.chars().count()
                ),
            )
        }),
        (Validator::LengthBetween { min, max }, Value::String(s)) => {
            let len = s.chars().count();
            (len < *min || len > *max).then(|| {
                (
                    "Invalid Attribute Value Length",
                    format!(
                        "Attribute {} string length must be between {} and {}, got: {}",
                        path, min, max, len
                    ),
                )
            })
        },
        (Validator::Regex { pattern, message }, Value::String(s)) => match Regex::new(pattern) {
            Ok(re) => (!re.is_match(s)).then(|| {
                (
                    "Invalid Attribute Value Match",
                    format!("Attribute {} {}, got: {}", path, message, s),
                )
            }),
            Err(err) => Some((
                "Invalid Validator Pattern",
                format!("Pattern for {} does not compile: {}", path, err),
            )),
        },
        (Validator::OneOf(allowed), Value::String(s)) => (!allowed.contains(s)).then(|| {
            (
                "Invalid Attribute Value Match",
                format!(
                    "Attribute {} value must be one of: [\"{}\"], got: \"{}\"",
                    path,
                    allowed.join("\" \""),
                    s
                ),
            )
        }),
        (Validator::NoneOfSubstrings(banned), Value::String(s)) => {
            let lower = s.to_lowercase();
            banned
                .iter()
                .find(|b| lower.contains(&b.to_lowercase()))
                .map(|b| {
                    (
                        "Invalid Attribute Value",
                        format!("Attribute {} must not contain \"{}\", got: {}", path, b, s),
                    )
                })
        },
        (Validator::IntAtLeast(min), v) => as_i64(v).filter(|n| n < min).map(|n| {
            (
                "Invalid Attribute Value",
                format!("Attribute {} value must be at least {}, got: {}", path, min, n),
            )
        }),
        (Validator::IntBetween { min, max }, v) => {
            as_i64(v).filter(|n| n < min || n > max).map(|n| {
                (
                    "Invalid Attribute Value",
                    format!(
                        "Attribute {} value must be between {} and {}, got: {}",
                        path, min, max, n
                    ),
                )
            })
        },
        (Validator::ResourceId, Value::String(s)) => (!verify::is_resource_id(s)).then(|| {
            (
                "Invalid Attribute Value Match",
                format!(
                    "Attribute {} Must be a valid PingOne resource ID (must match regular expression \"^{}$\"), got: {}",
                    path,
                    verify::P1_RESOURCE_ID,
                    s
                ),
            )
        }),
        (Validator::DavinciId, Value::String(s)) => (!verify::is_davinci_id(s)).then(|| {
            (
                "Invalid Attribute Value Match",
                format!(
                    "Attribute {} Must be a valid PingOne DaVinci resource ID (must match regular expression \"^{}$\"), got: {}",
                    path,
                    verify::P1_DV_RESOURCE_ID,
                    s
                ),
            )
        }),
        (Validator::Rfc3339, Value::String(s)) => chrono::DateTime::parse_from_rfc3339(s)
            .err()
            .map(|err| {
                (
                    "Invalid RFC3339 String Value",
                    format!("Attribute {} must be an RFC3339 timestamp: {}", path, err),
                )
            }),
        (Validator::Url, Value::String(s)) => {
            let valid = s
                .split_once("://")
                .is_some_and(|(scheme, rest)| matches!(scheme, "http" | "https") && !rest.is_empty());
            (!valid).then(|| {
                (
                    "Invalid Attribute Value Match",
                    format!(
                        "Attribute {} Expected value to have a url with scheme of \"http\" or \"https\", got: {}",
                        path, s
                    ),
                )
            })
        },
        _ => None,
    };

    if let Some((summary, detail)) = failure {
        diagnostics.push(
            Diagnostic::error(summary)
                .with_detail(detail)
                .with_attribute(path),
        );
    }
}

fn validate_block_rule(
    validator: &BlockValidator,
    obj: &Map<String, Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let (names, exactly) = match validator {
        BlockValidator::ExactlyOneOf(names) => (names, true),
        BlockValidator::AtMostOneOf(names) => (names, false),
    };
    let qualified: Vec<String> = names.iter().map(|n| join_path(path, n)).collect();
    let set: Vec<&String> = names.iter().filter(|n| is_set(obj.get(n.as_str()))).collect();
    let any_unknown = names
        .iter()
        .any(|n| obj.get(n.as_str()).is_some_and(value::is_unknown));

    if set.len() > 1 {
        diagnostics.push(combination_error(
            &join_path(path, set[0]),
            format!(
                "{} of these attributes were specified, but only one may be: [{}]",
                set.len(),
                qualified.join(",")
            ),
        ));
    } else if exactly && set.is_empty() && !any_unknown {
        diagnostics.push(combination_error(
            path,
            format!(
                "No attribute specified when one (and only one) of [{}] is required",
                qualified.join(",")
            ),
        ));
    }
}

fn validate_nested_block(nested: &NestedBlock, value: Option<&Value>, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    if (nested.computed && nested.min_items == 0) || value.is_some_and(value::is_unknown) {
        return;
    }
    let value = match value {
        None | Some(Value::Null) => {
            if nested.min_items > 0 {
                diagnostics.push(
                    Diagnostic::error("Missing Configuration for Required Block")
                        .with_detail(format!(
                            "Block {} must have a configuration value with at least {} element(s).",
                            path, nested.min_items
                        ))
                        .with_attribute(path),
                );
            }
            return;
        },
        Some(v) => v,
    };

    let items: Vec<(String, &Value)> = match (&nested.nesting_mode, value) {
        (BlockNestingMode::Single, v) => {
            validate_block(&nested.block, v, path, diagnostics);
            return;
        },
        (BlockNestingMode::List | BlockNestingMode::Set, Value::Array(items)) => {
            if nested.nesting_mode == BlockNestingMode::Set {
                check_set_unique(items, path, diagnostics);
            }
            items.iter().enumerate().map(|(i, item)| (i.to_string(), item)).collect()
        },
        (BlockNestingMode::Map, Value::Object(entries)) => entries.iter().map(|(k, item)| (k.clone(), item)).collect(),
        (mode, v) => {
            diagnostics.push(
                Diagnostic::error("Incorrect Block Value Type")
                    .with_detail(format!("Block {} expects {} of objects, got {}.", path, nesting_label(*mode), kind_of(v)))
                    .with_attribute(path),
            );
            return;
        },
    };

    let count = items.len() as u32;
    // max_items of 0 is unbounded
    if count < nested.min_items || (nested.max_items > 0 && count > nested.max_items) {
        diagnostics.push(
            Diagnostic::error("Invalid Block Item Count")
                .with_detail(item_count_detail(nested, path, count))
                .with_attribute(path),
        );
    }
    for (key, item) in items {
        validate_block(&nested.block, item, &join_path(path, &key), diagnostics);
    }
}

fn item_count_detail(nested: &NestedBlock, path: &str, count: u32) -> String {
    if count < nested.min_items {
        format!("Block {} must have at least {} element(s), got: {}", path, nested.min_items, count)
    } else {
        format!("Block {} must have at most {} element(s), got: {}", path, nested.max_items, count)
    }
}

fn nesting_label(mode: BlockNestingMode) -> &'static str {
    match mode {
        BlockNestingMode::Map => "a map",
        BlockNestingMode::Set => "a set",
        _ => "a list",
    }
}

fn type_label(attribute_type: &AttributeType) -> &'static str {
    match attribute_type {
        AttributeType::String => "a string",
        AttributeType::Int64 => "a whole number",
        AttributeType::Float64 => "a number",
        AttributeType::Bool => "a bool",
        AttributeType::List(_) => "a list",
        AttributeType::Set(_) => "a set",
        AttributeType::Map(_) => "a map",
        AttributeType::Dynamic => "any value",
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    let Value::Number(n) = value else {
        return None;
    };
    n.as_i64().or_else(|| {
        n.as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
            .map(|f| f as i64)
    })
}

fn combination_error(path: &str, detail: String) -> Diagnostic {
    at(Diagnostic::error("Invalid Attribute Combination").with_detail(detail), path)
}

/// Attach `path` unless it is the root.
fn at(diagnostic: Diagnostic, path: &str) -> Diagnostic {
    if path.is_empty() {
        diagnostic
    } else {
        diagnostic.with_attribute(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, AttributeFlags, Block, NestedBlock, Schema};
    use serde_json::json;

    const ENV_ID: &str = "9c052a8a-14be-44e4-8f07-2662569994ce";

    #[test]
    fn test_validate_required_string() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        let diagnostics = validate(&schema, &json!({"name": "test"}));
        assert!(diagnostics.is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("name".to_string()));

        let diagnostics = validate(&schema, &json!({"name": 123}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Incorrect Attribute Value Type");
    }

    #[test]
    fn test_unknown_values_are_not_validated() {
        let schema = Schema::v0().with_attribute(
            "environment_id",
            Attribute::required_string().with_validator(Validator::ResourceId),
        );
        let diagnostics = validate(&schema, &json!({"environment_id": value::UNKNOWN}));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_validate_computed_attribute_skipped() {
        let schema = Schema::v0().with_attribute("id", Attribute::computed_string());
        assert!(validate(&schema, &json!({"id": 123})).is_empty());
    }

    #[test]
    fn test_validate_int64() {
        let schema = Schema::v0().with_attribute("priority", Attribute::required_int64());

        assert!(validate(&schema, &json!({"priority": 42})).is_empty());
        assert!(validate(&schema, &json!({"priority": 42.0})).is_empty());
        assert_eq!(validate(&schema, &json!({"priority": 42.5})).len(), 1);
        assert_eq!(validate(&schema, &json!({"priority": "42"})).len(), 1);
    }

    #[test]
    fn test_validate_set_uniqueness() {
        let schema = Schema::v0().with_attribute(
            "redirect_uris",
            Attribute::new(
                AttributeType::set(AttributeType::String),
                AttributeFlags::optional(),
            ),
        );

        assert!(validate(&schema, &json!({"redirect_uris": ["https://a", "https://b"]})).is_empty());
        let diagnostics = validate(&schema, &json!({"redirect_uris": ["https://a", "https://a"]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Duplicate Set Element");
    }

    #[test]
    fn test_validate_one_of_applies_to_set_elements() {
        let schema = Schema::v0().with_attribute(
            "grant_types",
            Attribute::new(
                AttributeType::set(AttributeType::String),
                AttributeFlags::required(),
            )
            .with_validator(Validator::one_of(&["AUTHORIZATION_CODE", "CLIENT_CREDENTIALS"])),
        );

        assert!(validate(&schema, &json!({"grant_types": ["CLIENT_CREDENTIALS"]})).is_empty());
        let diagnostics = validate(&schema, &json!({"grant_types": ["CLIENT_CREDENTIALS", "PASSWORD"]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("grant_types.1".to_string()));
        assert!(diagnostics[0].detail.as_ref().unwrap().contains("PASSWORD"));
    }

    #[test]
    fn test_validate_length_and_int_bounds() {
        let schema = Schema::v0()
            .with_attribute(
                "name",
                Attribute::required_string().with_validator(Validator::LengthAtLeast(1)),
            )
            .with_attribute(
                "access_token_validity_seconds",
                Attribute::optional_int64().with_validator(Validator::IntBetween {
                    min: 300,
                    max: 2_592_000,
                }),
            );

        let diagnostics = validate(&schema, &json!({"name": "", "access_token_validity_seconds": 60}));
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics
            .iter()
            .any(|d| d.summary == "Invalid Attribute Value Length"));
        assert!(diagnostics
            .iter()
            .any(|d| d.detail.as_ref().unwrap().contains("between 300 and 2592000")));
    }

    #[test]
    fn test_validate_identifier_formats() {
        let schema = Schema::v0()
            .with_attribute(
                "environment_id",
                Attribute::required_string().with_validator(Validator::ResourceId),
            )
            .with_attribute(
                "flow_policy_id",
                Attribute::required_string().with_validator(Validator::DavinciId),
            );

        assert!(validate(
            &schema,
            &json!({"environment_id": ENV_ID, "flow_policy_id": "c7062a8857740ae2d6b1a9d5b1a3c2a1"})
        )
        .is_empty());

        let diagnostics = validate(
            &schema,
            &json!({"environment_id": "badformat", "flow_policy_id": ENV_ID}),
        );
        assert_eq!(diagnostics.len(), 2);
    }

    #[test]
    fn test_validate_conflicts_with() {
        let schema = Schema::v0()
            .with_attribute(
                "jwks",
                Attribute::optional_string().with_validator(Validator::conflicts_with(&["jwks_url"])),
            )
            .with_attribute("jwks_url", Attribute::optional_string());

        assert!(validate(&schema, &json!({"jwks": "{}"})).is_empty());
        let diagnostics = validate(&schema, &json!({"jwks": "{}", "jwks_url": "https://x"}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Invalid Attribute Combination");
    }

    #[test]
    fn test_validate_forbidden_when() {
        let schema = Schema::v0()
            .with_attribute("type", Attribute::optional_string())
            .with_block(
                "regex_validation",
                NestedBlock::single(Block::new().with_attribute("pattern", Attribute::required_string())),
            )
            .with_attribute(
                "unique",
                Attribute::optional_bool()
                    .with_validator(Validator::forbidden_when("type", &["JSON"])),
            );

        assert!(validate(&schema, &json!({"type": "STRING", "unique": true})).is_empty());
        let diagnostics = validate(&schema, &json!({"type": "JSON", "unique": true}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("unique".to_string()));
    }

    #[test]
    fn test_validate_exactly_one_of() {
        let schema = Schema::v0()
            .with_attribute("scope_environment_id", Attribute::optional_string())
            .with_attribute("scope_population_id", Attribute::optional_string())
            .with_validator(BlockValidator::exactly_one_of(&[
                "scope_environment_id",
                "scope_population_id",
            ]));

        assert!(validate(&schema, &json!({"scope_environment_id": ENV_ID})).is_empty());

        let none = validate(&schema, &json!({}));
        assert_eq!(none.len(), 1);
        assert!(none[0].detail.as_ref().unwrap().contains("No attribute specified"));

        let both = validate(
            &schema,
            &json!({"scope_environment_id": ENV_ID, "scope_population_id": ENV_ID}),
        );
        assert_eq!(both.len(), 1);
        assert!(both[0].detail.as_ref().unwrap().starts_with("2 of these attributes"));

        // an unknown member may still resolve to the single one set
        assert!(validate(&schema, &json!({"scope_population_id": value::UNKNOWN})).is_empty());
    }

    #[test]
    fn test_validate_exactly_one_of_blocks() {
        let schema = Schema::v0()
            .with_block("facebook", NestedBlock::single(Block::new()))
            .with_block("google", NestedBlock::single(Block::new()))
            .with_validator(BlockValidator::exactly_one_of(&["facebook", "google"]));

        assert!(validate(&schema, &json!({"google": {}})).is_empty());
        assert_eq!(validate(&schema, &json!({"google": {}, "facebook": {}})).len(), 1);
    }

    #[test]
    fn test_validate_nested_block_single() {
        let schema = Schema::v0().with_block(
            "external_link_options",
            NestedBlock::single(
                Block::new().with_attribute("home_page_url", Attribute::required_string()),
            ),
        );

        assert!(validate(&schema, &json!({"external_link_options": {"home_page_url": "https://x"}})).is_empty());
        assert!(validate(&schema, &json!({})).is_empty());

        let diagnostics = validate(&schema, &json!({"external_link_options": {}}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].attribute,
            Some("external_link_options.home_page_url".to_string())
        );
    }

    #[test]
    fn test_validate_required_single_block() {
        let schema = Schema::v0().with_block(
            "idp_verification",
            NestedBlock::single(Block::new()).required(),
        );
        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Missing Configuration for Required Block");
    }

    #[test]
    fn test_validate_nested_set_block() {
        let schema = Schema::v0().with_block(
            "enumerated_values",
            NestedBlock::set(Block::new().with_attribute("value", Attribute::required_string()))
                .with_min_items(1),
        );

        assert!(validate(&schema, &json!({"enumerated_values": [{"value": "v1"}]})).is_empty());

        let diagnostics = validate(&schema, &json!({"enumerated_values": []}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Invalid Block Item Count");
        assert!(diagnostics[0].detail.as_ref().unwrap().contains("at least 1"));

        let diagnostics = validate(
            &schema,
            &json!({"enumerated_values": [{"value": "v1"}, {"value": "v1"}]}),
        );
        assert_eq!(diagnostics.len(), 1);

        let diagnostics = validate(&schema, &json!({"enumerated_values": [{"value": 1}]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].attribute,
            Some("enumerated_values.0.value".to_string())
        );
    }

    #[test]
    fn test_validate_rfc3339_and_url() {
        let schema = Schema::v0()
            .with_attribute(
                "expires_at",
                Attribute::optional_string().with_validator(Validator::Rfc3339),
            )
            .with_attribute(
                "home_page_url",
                Attribute::optional_string().with_validator(Validator::Url),
            );

        assert!(validate(
            &schema,
            &json!({"expires_at": "2026-10-16T10:00:00Z", "home_page_url": "https://example.com"})
        )
        .is_empty());
        assert_eq!(
            validate(&schema, &json!({"expires_at": "tomorrow", "home_page_url": "ftp://x"})).len(),
            2
        );
    }

    #[test]
    fn test_validate_none_of_substrings() {
        let schema = Schema::v0().with_attribute(
            "audience",
            Attribute::optional_string()
                .with_validator(Validator::NoneOfSubstrings(vec!["pingone".to_string()])),
        );
        assert!(validate(&schema, &json!({"audience": "https://api.example.com"})).is_empty());
        assert_eq!(validate(&schema, &json!({"audience": "https://api.PingOne.com"})).len(), 1);
    }

    #[test]
    fn test_is_valid_helper() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        assert!(is_valid(&schema, &json!({"name": "test"})));
        assert!(!is_valid(&schema, &json!({})));
        assert_eq!(validate_result(&schema, &json!({})).unwrap_err().len(), 1);
    }

    #[test]
    fn test_validate_root_not_object() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        let diagnostics = validate(&schema, &json!("not an object"));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Incorrect Object Value Type");
    }
}
