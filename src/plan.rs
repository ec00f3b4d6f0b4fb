//! Plan computation.
//!
//! Planning turns a configuration and an optional prior state into the state
//! the engine should expect after apply:
//!
//! 1. configured values are taken as-is, absent ones fall back to defaults
//! 2. computed values are unknown on create; on update they keep the prior
//!    value when nothing else changes or when marked
//!    [`PlanModifier::UseStateForUnknown`]
//! 3. replace modifiers are evaluated against the prior state, recursing into
//!    nested blocks
//! 4. a replacement is planned as a fresh create, so every computed value
//!    becomes unknown again
//!
//! Resource hooks run between [`propose`] and [`finalize`] and may add replace
//! paths of their own.

use serde_json::{Map, Value};

use crate::schema::{Attribute, AttributeType, Block, BlockNestingMode, NestedBlock, PlanModifier, Schema};
use crate::types::{AttributeChange, PlanResult};
use crate::value::{self, unknown};

/// A plan under construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposedPlan {
    /// The planned state so far.
    pub planned_state: Value,
    /// Attribute paths whose change forces replacement.
    pub replace_paths: Vec<String>,
}

impl ProposedPlan {
    /// Record that a change at `path` forces replacement.
    pub fn require_replace(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !self.replace_paths.contains(&path) {
            self.replace_paths.push(path);
        }
    }
}

/// Compute the planned state and replace paths.
pub fn propose(schema: &Schema, prior: Option<&Value>, config: &Value) -> ProposedPlan {
    let mut replace_paths = Vec::new();
    let prior = prior.filter(|p| !p.is_null());
    let mut planned = plan_block(&schema.block, prior, config, "", &mut replace_paths);

    if let Some(prior) = prior {
        if !object_eq(&schema.block, prior, &planned) {
            mark_volatile_unknown(&schema.block, &mut planned, config);
        }
    }

    ProposedPlan {
        planned_state: planned,
        replace_paths,
    }
}

/// Settle replacement and compute the change list.
pub fn finalize(schema: &Schema, prior: Option<&Value>, config: &Value, proposed: ProposedPlan) -> PlanResult {
    let prior = prior.filter(|p| !p.is_null());
    let requires_replace = prior.is_some() && !proposed.replace_paths.is_empty();

    let planned_state = if requires_replace {
        let mut discard = Vec::new();
        plan_block(&schema.block, None, config, "", &mut discard)
    } else {
        proposed.planned_state
    };

    let changes = diff(&schema.block, prior, &planned_state);
    let mut result = PlanResult::with_changes(planned_state, changes, requires_replace);
    if requires_replace {
        let mut paths = proposed.replace_paths;
        paths.sort();
        result.replace_paths = paths;
    }
    result
}

/// Plan a resource without a custom hook.
pub fn plan_resource(schema: &Schema, prior: Option<&Value>, config: &Value) -> PlanResult {
    if config.is_null() {
        return plan_destroy(schema, prior);
    }
    let proposed = propose(schema, prior, config);
    finalize(schema, prior, config, proposed)
}

/// Plan the removal of a resource.
pub fn plan_destroy(schema: &Schema, prior: Option<&Value>) -> PlanResult {
    let changes = match prior {
        Some(prior) => diff_removed(&schema.block, prior),
        None => Vec::new(),
    };
    PlanResult::with_changes(Value::Null, changes, false)
}

fn plan_block(
    block: &Block,
    prior: Option<&Value>,
    config: &Value,
    path: &str,
    replace_paths: &mut Vec<String>,
) -> Value {
    let prior_obj = prior.and_then(Value::as_object);
    let config_obj = config.as_object();
    let mut planned = Map::new();

    for (name, attr) in &block.attributes {
        let attr_path = join_path(path, name);
        let configured = config_obj.and_then(|c| c.get(name)).unwrap_or(&Value::Null);
        let prior_value = prior_obj.map(|p| p.get(name).unwrap_or(&Value::Null));
        let value = plan_attribute(attr, prior_value, configured);

        if let Some(prior_value) = prior_value {
            if attribute_requires_replace(attr, prior_value, configured, &value) {
                replace_paths.push(attr_path);
            }
        }
        planned.insert(name.clone(), value);
    }

    for (name, nested) in &block.blocks {
        let block_path = join_path(path, name);
        let configured = config_obj.and_then(|c| c.get(name)).unwrap_or(&Value::Null);
        let prior_value = prior_obj.map(|p| p.get(name).unwrap_or(&Value::Null));
        let value = plan_nested(nested, prior_value, configured, &block_path, replace_paths);

        if let Some(prior_value) = prior_value {
            if nested_requires_replace(nested, prior_value, configured, &value) {
                replace_paths.push(block_path);
            }
        }
        planned.insert(name.clone(), value);
    }

    Value::Object(planned)
}

fn plan_attribute(attr: &Attribute, prior: Option<&Value>, configured: &Value) -> Value {
    if !configured.is_null() && !attr.flags.computed_only() {
        return configured.clone();
    }
    if let Some(default) = &attr.default {
        return default.clone();
    }
    if attr.flags.computed {
        return match prior {
            Some(p) if !p.is_null() => p.clone(),
            _ => unknown(),
        };
    }
    Value::Null
}

fn plan_nested(
    nested: &NestedBlock,
    prior: Option<&Value>,
    configured: &Value,
    path: &str,
    replace_paths: &mut Vec<String>,
) -> Value {
    if configured.is_null() {
        if nested.computed {
            return match prior {
                Some(p) if !p.is_null() => p.clone(),
                _ => unknown(),
            };
        }
        return Value::Null;
    }
    if value::is_unknown(configured) {
        return configured.clone();
    }

    // a prior that was null plans its children as new
    let prior = prior.filter(|p| !p.is_null());
    match nested.nesting_mode {
        BlockNestingMode::Single => plan_block(&nested.block, prior, configured, path, replace_paths),
        BlockNestingMode::List => match configured {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        let prior_item = prior.and_then(|p| p.get(i));
                        plan_block(&nested.block, prior_item, item, &join_path(path, &i.to_string()), replace_paths)
                    })
                    .collect(),
            ),
            other => other.clone(),
        },
        BlockNestingMode::Set => match configured {
            Value::Array(items) => {
                let prior_items = prior.and_then(Value::as_array);
                Value::Array(
                    items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| {
                            let prior_item = prior_items.and_then(|p| {
                                p.iter().find(|candidate| config_matches(&nested.block, candidate, item))
                            });
                            plan_block(&nested.block, prior_item, item, &join_path(path, &i.to_string()), replace_paths)
                        })
                        .collect(),
                )
            },
            other => other.clone(),
        },
        BlockNestingMode::Map => match configured {
            Value::Object(items) => Value::Object(
                items
                    .iter()
                    .map(|(key, item)| {
                        let prior_item = prior.and_then(|p| p.get(key));
                        (
                            key.clone(),
                            plan_block(&nested.block, prior_item, item, &join_path(path, key), replace_paths),
                        )
                    })
                    .collect(),
            ),
            other => other.clone(),
        },
    }
}

fn attribute_requires_replace(attr: &Attribute, prior: &Value, configured: &Value, planned: &Value) -> bool {
    attr.plan_modifiers.iter().any(|modifier| match modifier {
        PlanModifier::UseStateForUnknown => false,
        PlanModifier::RequiresReplace => {
            // a computed value the user left unset is not a user change
            if configured.is_null() && attr.flags.computed && attr.default.is_none() {
                return false;
            }
            !attr_eq(&attr.attr_type, prior, planned)
        },
        PlanModifier::RequiresReplaceIfPreviouslyNull => prior.is_null() && !planned.is_null(),
        PlanModifier::RequiresReplaceIfExistenceChanges => prior.is_null() != planned.is_null(),
    })
}

fn nested_requires_replace(nested: &NestedBlock, prior: &Value, configured: &Value, planned: &Value) -> bool {
    nested.plan_modifiers.iter().any(|modifier| match modifier {
        PlanModifier::UseStateForUnknown => false,
        PlanModifier::RequiresReplace => {
            if configured.is_null() && nested.computed {
                return false;
            }
            !nested_eq(nested, prior, planned)
        },
        PlanModifier::RequiresReplaceIfPreviouslyNull => prior.is_null() && !planned.is_null(),
        PlanModifier::RequiresReplaceIfExistenceChanges => prior.is_null() != planned.is_null(),
    })
}

/// Mark computed values without `UseStateForUnknown` unknown, since a change
/// elsewhere may alter them.
fn mark_volatile_unknown(block: &Block, planned: &mut Value, config: &Value) {
    let Some(planned_obj) = planned.as_object_mut() else {
        return;
    };
    let config_obj = config.as_object();

    for (name, attr) in &block.attributes {
        let configured = config_obj.and_then(|c| c.get(name)).is_some_and(|v| !v.is_null());
        let volatile = attr.flags.computed
            && attr.default.is_none()
            && (!configured || attr.flags.computed_only())
            && !attr.plan_modifiers.contains(&PlanModifier::UseStateForUnknown);
        if volatile {
            planned_obj.insert(name.clone(), unknown());
        }
    }

    for (name, nested) in &block.blocks {
        let configured = config_obj.and_then(|c| c.get(name)).unwrap_or(&Value::Null);
        if configured.is_null() {
            if nested.computed && !nested.plan_modifiers.contains(&PlanModifier::UseStateForUnknown) {
                planned_obj.insert(name.clone(), unknown());
            }
            continue;
        }
        if nested.nesting_mode == BlockNestingMode::Single {
            if let Some(child) = planned_obj.get_mut(name) {
                mark_volatile_unknown(&nested.block, child, configured);
            }
        }
    }
}

fn config_matches(block: &Block, prior: &Value, configured: &Value) -> bool {
    block
        .attributes
        .iter()
        .filter(|(_, attr)| !attr.flags.computed_only())
        .all(|(name, attr)| {
            let c = configured.get(name).unwrap_or(&Value::Null);
            if c.is_null() && attr.flags.computed {
                return true;
            }
            attr_eq(&attr.attr_type, prior.get(name).unwrap_or(&Value::Null), c)
        })
}

/// Compare two attribute values, ignoring order in sets.
pub fn attr_eq(attr_type: &AttributeType, a: &Value, b: &Value) -> bool {
    match (attr_type, a, b) {
        (_, Value::Null, Value::Null) => true,
        (AttributeType::Set(inner), Value::Array(x), Value::Array(y)) => {
            x.len() == y.len()
                && x.iter().all(|e| y.iter().any(|f| attr_eq(inner, e, f)))
                && y.iter().all(|f| x.iter().any(|e| attr_eq(inner, e, f)))
        },
        (AttributeType::List(inner), Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(e, f)| attr_eq(inner, e, f))
        },
        (AttributeType::Map(inner), Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, e)| y.get(k).is_some_and(|f| attr_eq(inner, e, f)))
        },
        (_, Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Compare two objects described by `block`, treating absent keys as null.
pub fn object_eq(block: &Block, a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Object(x), Value::Object(y)) => {
            block.attributes.iter().all(|(name, attr)| {
                attr_eq(
                    &attr.attr_type,
                    x.get(name).unwrap_or(&Value::Null),
                    y.get(name).unwrap_or(&Value::Null),
                )
            }) && block.blocks.iter().all(|(name, nested)| {
                nested_eq(
                    nested,
                    x.get(name).unwrap_or(&Value::Null),
                    y.get(name).unwrap_or(&Value::Null),
                )
            })
        },
        _ => a == b,
    }
}

fn nested_eq(nested: &NestedBlock, a: &Value, b: &Value) -> bool {
    match (nested.nesting_mode, a, b) {
        (_, Value::Null, Value::Null) => true,
        (BlockNestingMode::Single, _, _) => object_eq(&nested.block, a, b),
        (BlockNestingMode::List, Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(e, f)| object_eq(&nested.block, e, f))
        },
        (BlockNestingMode::Set, Value::Array(x), Value::Array(y)) => {
            x.len() == y.len()
                && x.iter().all(|e| y.iter().any(|f| object_eq(&nested.block, e, f)))
                && y.iter().all(|f| x.iter().any(|e| object_eq(&nested.block, e, f)))
        },
        (BlockNestingMode::Map, Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, e)| y.get(k).is_some_and(|f| object_eq(&nested.block, e, f)))
        },
        _ => a == b,
    }
}

fn diff(block: &Block, prior: Option<&Value>, planned: &Value) -> Vec<AttributeChange> {
    let mut changes = Vec::new();
    let before_of = |name: &str| {
        prior
            .and_then(|p| p.get(name))
            .filter(|v| !v.is_null())
            .cloned()
    };
    let after_of = |name: &str| planned.get(name).filter(|v| !v.is_null()).cloned();

    for (name, attr) in &block.attributes {
        let (before, after) = (before_of(name), after_of(name));
        let same = attr_eq(
            &attr.attr_type,
            before.as_ref().unwrap_or(&Value::Null),
            after.as_ref().unwrap_or(&Value::Null),
        );
        if !same {
            let change = AttributeChange::new(name.clone(), before, after);
            changes.push(if attr.flags.sensitive { change.redacted() } else { change });
        }
    }

    for (name, nested) in &block.blocks {
        let (before, after) = (before_of(name), after_of(name));
        let same = nested_eq(
            nested,
            before.as_ref().unwrap_or(&Value::Null),
            after.as_ref().unwrap_or(&Value::Null),
        );
        if !same {
            let change = AttributeChange::new(name.clone(), before, after);
            changes.push(if nested.block.has_sensitive() { change.redacted() } else { change });
        }
    }

    changes.sort_by(|a, b| a.path.cmp(&b.path));
    changes
}

fn diff_removed(block: &Block, prior: &Value) -> Vec<AttributeChange> {
    diff(block, Some(prior), &Value::Null)
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeFlags, Validator};
    use crate::value::UNKNOWN;
    use serde_json::json;

    fn group_schema() -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::id())
            .with_attribute("environment_id", Attribute::parent_id("env"))
            .with_attribute("name", Attribute::required_string())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute(
                "population_id",
                Attribute::optional_string()
                    .with_validator(Validator::ResourceId)
                    .with_force_new(),
            )
            .with_attribute("external_id", Attribute::optional_string())
    }

    fn schema_attribute_schema() -> Schema {
        Schema::v1()
            .with_attribute("id", Attribute::id())
            .with_attribute("name", Attribute::required_string())
            .with_attribute(
                "type",
                Attribute::optional_string()
                    .with_default(json!("STRING"))
                    .with_force_new(),
            )
            .with_attribute("required", Attribute::computed_bool())
            .with_block(
                "enumerated_values",
                NestedBlock::set(
                    Block::new()
                        .with_attribute("value", Attribute::required_string())
                        .with_attribute("archived", Attribute::optional_bool().with_default(json!(false))),
                )
                .with_plan_modifier(PlanModifier::RequiresReplaceIfPreviouslyNull),
            )
    }

    #[test]
    fn test_create_marks_computed_unknown() {
        let plan = plan_resource(
            &group_schema(),
            None,
            &json!({"environment_id": "e", "name": "g1", "description": "d"}),
        );

        assert!(!plan.requires_replace);
        assert_eq!(plan.planned_state["id"], json!(UNKNOWN));
        assert_eq!(plan.planned_state["name"], json!("g1"));
        assert!(plan.planned_state["population_id"].is_null());
        assert!(plan.changes.iter().any(|c| c.path == "name" && c.before.is_none()));
    }

    #[test]
    fn test_update_in_place_keeps_id() {
        let prior = json!({"id": "g-1", "environment_id": "e", "name": "g1", "description": "d"});
        let plan = plan_resource(
            &group_schema(),
            Some(&prior),
            &json!({"environment_id": "e", "name": "g1", "description": "d2"}),
        );

        assert!(!plan.requires_replace);
        assert_eq!(plan.planned_state["id"], json!("g-1"));
        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.changes[0].path, "description");
    }

    #[test]
    fn test_no_change_plan() {
        let prior = json!({"id": "g-1", "environment_id": "e", "name": "g1"});
        let plan = plan_resource(
            &group_schema(),
            Some(&prior),
            &json!({"environment_id": "e", "name": "g1"}),
        );
        assert!(plan.changes.is_empty());
        assert_eq!(plan.planned_state["id"], json!("g-1"));
    }

    #[test]
    fn test_force_new_replaces_and_resets_id() {
        let prior = json!({"id": "g-1", "environment_id": "e", "name": "g1"});
        let plan = plan_resource(
            &group_schema(),
            Some(&prior),
            &json!({"environment_id": "e2", "name": "g1"}),
        );

        assert!(plan.requires_replace);
        assert_eq!(plan.replace_paths, vec!["environment_id".to_string()]);
        assert_eq!(plan.planned_state["id"], json!(UNKNOWN));
    }

    #[test]
    fn test_set_of_objects_added_later_replaces() {
        let schema = schema_attribute_schema();
        let prior = json!({"id": "X", "name": "a", "type": "STRING", "required": false, "enumerated_values": null});
        let plan = plan_resource(
            &schema,
            Some(&prior),
            &json!({"name": "a", "type": "STRING", "enumerated_values": [{"value": "v1"}]}),
        );

        assert!(plan.requires_replace);
        assert_eq!(plan.replace_paths, vec!["enumerated_values".to_string()]);
        assert_eq!(plan.planned_state["enumerated_values"][0]["archived"], json!(false));
        assert_eq!(plan.planned_state["id"], json!(UNKNOWN));
    }

    #[test]
    fn test_set_reorder_is_not_a_change() {
        let schema = schema_attribute_schema();
        let prior = json!({
            "id": "X", "name": "a", "type": "STRING", "required": false,
            "enumerated_values": [{"value": "v1", "archived": false}, {"value": "v2", "archived": false}]
        });
        let plan = plan_resource(
            &schema,
            Some(&prior),
            &json!({"name": "a", "enumerated_values": [{"value": "v2"}, {"value": "v1"}]}),
        );

        assert!(!plan.requires_replace);
        assert!(plan.changes.is_empty());
        assert_eq!(plan.planned_state["required"], json!(false));
    }

    #[test]
    fn test_computed_without_state_for_unknown_goes_unknown_on_change() {
        let schema = schema_attribute_schema();
        let prior = json!({"id": "X", "name": "a", "type": "STRING", "required": false});
        let plan = plan_resource(&schema, Some(&prior), &json!({"name": "b"}));

        assert!(!plan.requires_replace);
        assert_eq!(plan.planned_state["id"], json!("X"));
        assert_eq!(plan.planned_state["required"], json!(UNKNOWN));
    }

    #[test]
    fn test_existence_change_replaces() {
        let schema = Schema::v0()
            .with_attribute("id", Attribute::id())
            .with_block(
                "oidc_options",
                NestedBlock::single(Block::new().with_attribute("type", Attribute::required_string()))
                    .with_plan_modifier(PlanModifier::RequiresReplaceIfExistenceChanges),
            )
            .with_block(
                "external_link_options",
                NestedBlock::single(Block::new().with_attribute("home_page_url", Attribute::required_string()))
                    .with_plan_modifier(PlanModifier::RequiresReplaceIfExistenceChanges),
            );
        let prior = json!({"id": "a-1", "oidc_options": {"type": "WORKER"}});

        let same_variant = plan_resource(&schema, Some(&prior), &json!({"oidc_options": {"type": "WEB_APP"}}));
        assert!(!same_variant.requires_replace);

        let switched = plan_resource(
            &schema,
            Some(&prior),
            &json!({"external_link_options": {"home_page_url": "https://x"}}),
        );
        assert!(switched.requires_replace);
        assert_eq!(switched.replace_paths.len(), 2);
    }

    #[test]
    fn test_nested_force_new() {
        let schema = Schema::v0().with_attribute("id", Attribute::id()).with_block(
            "oidc_options",
            NestedBlock::single(
                Block::new().with_attribute("type", Attribute::required_string().with_force_new()),
            ),
        );
        let prior = json!({"id": "a-1", "oidc_options": {"type": "WORKER"}});
        let plan = plan_resource(&schema, Some(&prior), &json!({"oidc_options": {"type": "WEB_APP"}}));
        assert!(plan.requires_replace);
        assert_eq!(plan.replace_paths, vec!["oidc_options.type".to_string()]);
    }

    #[test]
    fn test_hook_added_replace_path() {
        let schema = group_schema();
        let prior = json!({"id": "g-1", "environment_id": "e", "name": "g1"});
        let config = json!({"environment_id": "e", "name": "g1"});

        let mut proposed = propose(&schema, Some(&prior), &config);
        proposed.require_replace("name");
        proposed.require_replace("name");
        let plan = finalize(&schema, Some(&prior), &config, proposed);

        assert!(plan.requires_replace);
        assert_eq!(plan.replace_paths, vec!["name".to_string()]);
    }

    #[test]
    fn test_sensitive_changes_are_redacted() {
        let schema = Schema::v0().with_attribute(
            "client_secret",
            Attribute::new(AttributeType::String, AttributeFlags::optional()).sensitive(),
        );
        let plan = plan_resource(&schema, Some(&json!({"client_secret": "a"})), &json!({"client_secret": "b"}));
        let rendered = serde_json::to_string(&plan.changes).unwrap();
        assert!(!rendered.contains("\"a\""));
        assert!(!rendered.contains("\"b\""));
    }

    #[test]
    fn test_plan_destroy() {
        let prior = json!({"id": "g-1", "environment_id": "e", "name": "g1"});
        let plan = plan_resource(&group_schema(), Some(&prior), &Value::Null);
        assert!(plan.planned_state.is_null());
        assert!(plan.changes.iter().all(|c| c.after.is_none()));
        assert_eq!(plan.changes.len(), 3);
    }

    #[test]
    fn test_attr_eq_sets_and_numbers() {
        let set = AttributeType::set(AttributeType::String);
        assert!(attr_eq(&set, &json!(["a", "b"]), &json!(["b", "a"])));
        assert!(!attr_eq(&set, &json!(["a"]), &json!(["a", "b"])));

        let list = AttributeType::list(AttributeType::String);
        assert!(!attr_eq(&list, &json!(["a", "b"]), &json!(["b", "a"])));

        assert!(attr_eq(&AttributeType::Int64, &json!(3600), &json!(3600.0)));
    }
}
