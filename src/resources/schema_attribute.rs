//! `pingone_schema_attribute`, a custom attribute of the user schema.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{body, decode, env_path, finish, required, Resource};
use crate::api_enum;
use crate::bridge::string_set;
use crate::client::{ApiCall, DefaultCreateRead, InvalidValue, NotFoundWarning, RequestContext};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::import::ImportComponent;
use crate::schema::{
    Attribute, AttributeFlags, AttributeType, Block, BlockValidator, NestedBlock, PlanModifier, Schema, Validator,
};
use crate::state_model;
use crate::types::ApplyResult;
use crate::value::{self, TriState};

api_enum! {
    /// Data type of a schema attribute.
    pub enum SchemaAttributeType {
        String => "STRING",
        Json => "JSON",
        Boolean => "BOOLEAN",
        Complex => "COMPLEX",
    }
}

state_model! {
    /// One allowed value of an enumerated attribute.
    pub struct EnumeratedValueModel {
        value: TriState<String>,
        archived: TriState<bool>,
        description: TriState<String>,
    }
}

state_model! {
    /// Regular expression every value must match.
    pub struct RegexValidationModel {
        pattern: TriState<String>,
        requirements: TriState<String>,
        values_pattern_should_match: TriState<Vec<String>>,
        values_pattern_should_not_match: TriState<Vec<String>>,
    }
}

state_model! {
    /// State of a schema attribute.
    pub struct SchemaAttributeModel {
        id: TriState<String>,
        environment_id: TriState<String>,
        schema_id: TriState<String>,
        name: TriState<String>,
        display_name: TriState<String>,
        description: TriState<String>,
        enabled: TriState<bool>,
        #[attr = "type"]
        kind: TriState<SchemaAttributeType>,
        unique: TriState<bool>,
        multivalued: TriState<bool>,
        required: TriState<bool>,
        ldap_attribute: TriState<String>,
        schema_type: TriState<String>,
        enumerated_values: TriState<Vec<EnumeratedValueModel>>,
        regex_validation: TriState<RegexValidationModel>,
    }
}

/// An enumerated value on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct EnumeratedValue {
    pub value: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Regex validation on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct RegexValidation {
    pub pattern: String,
    pub requirements: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values_pattern_should_match: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values_pattern_should_not_match: Option<Vec<String>>,
}

/// A schema attribute as the API sends and receives it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct SchemaAttributeDto {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(rename = "type")]
    pub kind: SchemaAttributeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_valued: Option<bool>,
    #[serde(default, skip_serializing)]
    pub required: Option<bool>,
    #[serde(default, skip_serializing)]
    pub ldap_attribute: Option<String>,
    #[serde(default, skip_serializing)]
    pub schema_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enumerated_values: Option<Vec<EnumeratedValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex_validation: Option<RegexValidation>,
}

impl SchemaAttributeModel {
    fn attribute_type(&self) -> SchemaAttributeType {
        self.kind.cloned_known().unwrap_or(SchemaAttributeType::String)
    }

    fn expand(&self, diagnostics: &mut Diagnostics) -> Option<SchemaAttributeDto> {
        let name = required(self.name.as_deref(), "name", diagnostics)?;

        let enumerated_values = self.enumerated_values.known().map(|values| {
            values
                .iter()
                .filter_map(|v| {
                    Some(EnumeratedValue {
                        value: v.value.cloned_known()?,
                        archived: v.archived.cloned_known().unwrap_or(false),
                        description: v.description.cloned_known(),
                    })
                })
                .collect()
        });

        let regex_validation = match self.regex_validation.known() {
            Some(regex) => Some(RegexValidation {
                pattern: required(regex.pattern.as_deref(), "regex_validation.pattern", diagnostics)?,
                requirements: required(regex.requirements.as_deref(), "regex_validation.requirements", diagnostics)?,
                values_pattern_should_match: string_set(regex.values_pattern_should_match.clone()),
                values_pattern_should_not_match: string_set(regex.values_pattern_should_not_match.clone()),
            }),
            None => None,
        };

        Some(SchemaAttributeDto {
            id: None,
            name,
            display_name: self.display_name.cloned_known(),
            description: self.description.cloned_known(),
            enabled: self.enabled.cloned_known(),
            kind: self.attribute_type(),
            unique: self.unique.cloned_known(),
            multi_valued: self.multivalued.cloned_known(),
            required: None,
            ldap_attribute: None,
            schema_type: None,
            enumerated_values,
            regex_validation,
        })
    }

    fn flatten(environment_id: &str, schema_id: &str, attribute: SchemaAttributeDto) -> Self {
        Self {
            id: attribute.id.into(),
            environment_id: TriState::Known(environment_id.to_string()),
            schema_id: TriState::Known(schema_id.to_string()),
            name: TriState::Known(attribute.name),
            display_name: attribute.display_name.into(),
            description: attribute.description.into(),
            enabled: TriState::Known(attribute.enabled.unwrap_or(true)),
            kind: TriState::Known(attribute.kind),
            unique: TriState::Known(attribute.unique.unwrap_or(false)),
            multivalued: TriState::Known(attribute.multi_valued.unwrap_or(false)),
            required: TriState::Known(attribute.required.unwrap_or(false)),
            ldap_attribute: attribute.ldap_attribute.into(),
            schema_type: attribute.schema_type.into(),
            enumerated_values: attribute
                .enumerated_values
                .filter(|v| !v.is_empty())
                .map(|values| {
                    values
                        .into_iter()
                        .map(|v| EnumeratedValueModel {
                            value: TriState::Known(v.value),
                            archived: TriState::Known(v.archived),
                            description: v.description.into(),
                        })
                        .collect()
                })
                .into(),
            regex_validation: attribute
                .regex_validation
                .map(|r| RegexValidationModel {
                    pattern: TriState::Known(r.pattern),
                    requirements: TriState::Known(r.requirements),
                    values_pattern_should_match: string_set(r.values_pattern_should_match.into()).into(),
                    values_pattern_should_not_match: string_set(r.values_pattern_should_not_match.into()).into(),
                })
                .into(),
        }
    }
}

fn attributes_path(environment_id: &str, schema_id: &str) -> String {
    env_path(environment_id, &format!("schemas/{}/attributes", schema_id))
}

/// Handler for `pingone_schema_attribute`.
pub struct SchemaAttributeResource;

#[async_trait]
impl Resource for SchemaAttributeResource {
    fn type_name(&self) -> &'static str {
        "pingone_schema_attribute"
    }

    fn schema(&self) -> Schema {
        let enumerated_value = Block::new()
            .with_attribute(
                "value",
                Attribute::required_string()
                    .with_description("The allowed value.")
                    .with_validator(Validator::LengthAtLeast(1)),
            )
            .with_attribute(
                "archived",
                Attribute::optional_bool()
                    .with_description("Archived values cannot be assigned to users but remain on existing ones.")
                    .with_default(json!(false)),
            )
            .with_attribute("description", Attribute::optional_string());

        let regex_validation = Block::new()
            .with_attribute(
                "pattern",
                Attribute::required_string().with_description("The regular expression values must match."),
            )
            .with_attribute(
                "requirements",
                Attribute::required_string().with_description("A hint shown to users when a value does not match."),
            )
            .with_attribute(
                "values_pattern_should_match",
                Attribute::new(AttributeType::set(AttributeType::String), AttributeFlags::optional())
                    .with_description("Example values that the pattern accepts."),
            )
            .with_attribute(
                "values_pattern_should_not_match",
                Attribute::new(AttributeType::set(AttributeType::String), AttributeFlags::optional())
                    .with_description("Example values that the pattern rejects."),
            );

        Schema::v1()
            .with_description("Resource to create and manage custom attributes of the PingOne user schema.")
            .with_attribute("id", Attribute::id())
            .with_attribute(
                "environment_id",
                Attribute::parent_id("The ID of the environment to create the schema attribute in."),
            )
            .with_attribute(
                "schema_id",
                Attribute::parent_id("The ID of the schema to apply the schema attribute to."),
            )
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("The system name of the schema attribute.")
                    .with_validator(Validator::LengthAtLeast(1)),
            )
            .with_attribute("display_name", Attribute::optional_string())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute(
                "enabled",
                Attribute::optional_bool()
                    .with_description("Whether the attribute is enabled.")
                    .with_default(json!(true)),
            )
            .with_attribute(
                "type",
                Attribute::optional_string()
                    .with_description("The type of the attribute. BOOLEAN and COMPLEX attributes cannot be created.")
                    .with_default(json!("STRING"))
                    .with_validator(Validator::OneOf(SchemaAttributeType::allowed()))
                    .with_force_new(),
            )
            .with_attribute(
                "unique",
                Attribute::optional_bool()
                    .with_description("Whether values must be unique within the environment. Only STRING attributes can be unique.")
                    .with_default(json!(false))
                    .with_force_new(),
            )
            .with_attribute(
                "multivalued",
                Attribute::optional_bool()
                    .with_description("Whether the attribute holds several values.")
                    .with_default(json!(false))
                    .with_force_new(),
            )
            .with_attribute("required", Attribute::computed_bool())
            .with_attribute(
                "ldap_attribute",
                Attribute::computed_string().with_plan_modifier(PlanModifier::UseStateForUnknown),
            )
            .with_attribute(
                "schema_type",
                Attribute::computed_string()
                    .with_description("CORE, STANDARD or CUSTOM. New attributes are CUSTOM.")
                    .with_plan_modifier(PlanModifier::UseStateForUnknown),
            )
            .with_block(
                "enumerated_values",
                NestedBlock::set(enumerated_value)
                    .with_min_items(1)
                    .with_plan_modifier(PlanModifier::RequiresReplaceIfPreviouslyNull),
            )
            .with_block(
                "regex_validation",
                NestedBlock::single(regex_validation).with_plan_modifier(PlanModifier::RequiresReplaceIfPreviouslyNull),
            )
            .with_validator(BlockValidator::at_most_one_of(&["enumerated_values", "regex_validation"]))
    }

    fn import_components(&self) -> Vec<ImportComponent> {
        vec![
            ImportComponent::resource_id("environment_id"),
            ImportComponent::resource_id("schema_id"),
            ImportComponent::resource_id("attribute_id").primary(),
        ]
    }

    fn validate(&self, config: &Value) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        let kind = config.get("type").filter(|v| !v.is_null());
        if kind.is_some_and(value::is_unknown) {
            return diagnostics;
        }
        let kind = kind.and_then(Value::as_str).unwrap_or("STRING");

        if config.get("unique") == Some(&Value::Bool(true)) && kind != "STRING" {
            diagnostics.push(
                Diagnostic::error("Invalid attribute value")
                    .with_detail(format!(
                        "Cannot set attribute unique parameter when the attribute type is not STRING.  Attribute type found: {}",
                        kind
                    ))
                    .with_attribute("unique"),
            );
        }

        if kind != "STRING" {
            for block in ["enumerated_values", "regex_validation"] {
                if value::is_set(config.get(block)) {
                    diagnostics.push(
                        Diagnostic::error("Invalid attribute combination")
                            .with_detail(format!("{} can only be set when the attribute type is STRING.", block))
                            .with_attribute(block),
                    );
                }
            }
        }
        diagnostics
    }

    fn upgrade_state(&self, version: u64, state: Value) -> Result<Value, Diagnostic> {
        // version 0 has the same shape
        match version {
            0 | 1 => Ok(state),
            other => Err(Diagnostic::error("Unable to upgrade resource state")
                .with_detail(format!("pingone_schema_attribute has no upgrade from schema version {}.", other))),
        }
    }

    async fn create(&self, ctx: &RequestContext, plan: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<SchemaAttributeModel>(plan, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let (Some(environment_id), Some(schema_id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(model.schema_id.as_deref(), "schema_id", &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };

        let kind = model.attribute_type();
        if matches!(kind, SchemaAttributeType::Boolean | SchemaAttributeType::Complex) {
            diagnostics.push(
                Diagnostic::error("Invalid attribute type")
                    .with_detail(format!(
                        "Cannot create attributes of type BOOLEAN or COMPLEX.  Custom attributes must be either STRING or JSON.  Attribute type found: {}",
                        kind
                    ))
                    .with_attribute("type"),
            );
            return ApplyResult::new(None, diagnostics);
        }

        let Some(request) = model.expand(&mut diagnostics).and_then(|a| body(&a, &mut diagnostics)) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (created, call_diagnostics) = ApiCall::post("CreateAttribute", attributes_path(&environment_id, &schema_id))
            .with_body(request)
            .with_classifier(&InvalidValue)
            .with_retryable(&DefaultCreateRead)
            .send::<SchemaAttributeDto>(&ctx)
            .await;
        diagnostics.append(call_diagnostics);

        finish(
            created.map(|a| SchemaAttributeModel::flatten(&environment_id, &schema_id, a)),
            diagnostics,
        )
    }

    async fn read(&self, ctx: &RequestContext, state: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<SchemaAttributeModel>(state, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let (Some(environment_id), Some(schema_id), Some(id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(model.schema_id.as_deref(), "schema_id", &mut diagnostics),
            required(model.id.as_deref(), "id", &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (attribute, call_diagnostics) = ApiCall::get(
            "ReadOneAttribute",
            format!("{}/{}", attributes_path(&environment_id, &schema_id), id),
        )
        .with_classifier(&NotFoundWarning)
        .with_retryable(&DefaultCreateRead)
        .send::<SchemaAttributeDto>(&ctx)
        .await;
        diagnostics.append(call_diagnostics);

        finish(
            attribute.map(|a| SchemaAttributeModel::flatten(&environment_id, &schema_id, a)),
            diagnostics,
        )
    }

    async fn update(&self, ctx: &RequestContext, plan: &Value, prior: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let (Some(model), Some(prior)) = (
            decode::<SchemaAttributeModel>(plan, &mut diagnostics),
            decode::<SchemaAttributeModel>(prior, &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };
        let (Some(environment_id), Some(schema_id), Some(id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(model.schema_id.as_deref(), "schema_id", &mut diagnostics),
            required(prior.id.as_deref(), "id", &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };
        let Some(request) = model.expand(&mut diagnostics).and_then(|a| body(&a, &mut diagnostics)) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (updated, call_diagnostics) = ApiCall::patch(
            "UpdateAttributePatch",
            format!("{}/{}", attributes_path(&environment_id, &schema_id), id),
        )
        .with_body(request)
        .with_classifier(&InvalidValue)
        .send::<SchemaAttributeDto>(&ctx)
        .await;
        diagnostics.append(call_diagnostics);

        finish(
            updated.map(|a| SchemaAttributeModel::flatten(&environment_id, &schema_id, a)),
            diagnostics,
        )
    }

    async fn delete(&self, ctx: &RequestContext, state: &Value) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<SchemaAttributeModel>(state, &mut diagnostics) else {
            return diagnostics;
        };
        let (Some(environment_id), Some(schema_id), Some(id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(model.schema_id.as_deref(), "schema_id", &mut diagnostics),
            required(model.id.as_deref(), "id", &mut diagnostics),
        ) else {
            return diagnostics;
        };

        let ctx = ctx.for_environment(&environment_id);
        let (_, call_diagnostics) = ApiCall::delete(
            "DeleteAttribute",
            format!("{}/{}", attributes_path(&environment_id, &schema_id), id),
        )
        .with_classifier(&NotFoundWarning)
        .send::<Value>(&ctx)
        .await;
        diagnostics.append(call_diagnostics);
        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::plan_resource;
    use crate::validation::validate;

    const ENV: &str = "9c052a8a-14be-44e4-8f07-2662569994ce";
    const SCHEMA: &str = "5e4d3c2b-1a09-4f8e-9d7c-6b5a49382716";

    fn base() -> Value {
        json!({"environment_id": ENV, "schema_id": SCHEMA, "name": "favouriteColour"})
    }

    fn with(mut value: Value, key: &str, v: Value) -> Value {
        value[key] = v;
        value
    }

    #[test]
    fn test_unique_requires_string() {
        let config = with(with(base(), "type", json!("JSON")), "unique", json!(true));
        let diagnostics = SchemaAttributeResource.validate(&config);
        assert_eq!(diagnostics.len(), 1);
        let detail = diagnostics.errors().next().unwrap().detail.clone().unwrap();
        assert!(detail.starts_with("Cannot set attribute unique parameter when the attribute type is not STRING."));

        let ok = with(base(), "unique", json!(true));
        assert!(SchemaAttributeResource.validate(&ok).is_empty());
    }

    #[test]
    fn test_enumerated_values_only_on_strings() {
        let config = with(with(base(), "type", json!("JSON")), "enumerated_values", json!([{"value": "red"}]));
        let diagnostics = SchemaAttributeResource.validate(&config);
        assert_eq!(
            diagnostics.errors().next().unwrap().attribute.as_deref(),
            Some("enumerated_values")
        );
    }

    #[test]
    fn test_enumerated_values_and_regex_are_exclusive() {
        let config = with(
            with(base(), "enumerated_values", json!([{"value": "red"}])),
            "regex_validation",
            json!({"pattern": "^[a-z]+$", "requirements": "lowercase"}),
        );
        assert!(!validate(&SchemaAttributeResource.schema(), &config).is_empty());
    }

    #[test]
    fn test_gaining_enumerated_values_replaces() {
        let schema = SchemaAttributeResource.schema();
        let prior = json!({
            "id": "attr-1",
            "environment_id": ENV,
            "schema_id": SCHEMA,
            "name": "favouriteColour",
            "display_name": null,
            "description": null,
            "enabled": true,
            "type": "STRING",
            "unique": false,
            "multivalued": false,
            "required": false,
            "ldap_attribute": "favouriteColour",
            "schema_type": "CUSTOM",
            "enumerated_values": null,
            "regex_validation": null
        });
        let config = with(base(), "enumerated_values", json!([{"value": "red"}, {"value": "blue"}]));

        let result = plan_resource(&schema, Some(&prior), &config);
        assert!(result.requires_replace);
        assert_eq!(result.replace_paths, vec!["enumerated_values".to_string()]);
        assert!(value::is_unknown(&result.planned_state["id"]));
    }

    #[test]
    fn test_flatten_round_trips_enumerated_values() {
        let dto: SchemaAttributeDto = serde_json::from_value(json!({
            "id": "attr-1",
            "name": "favouriteColour",
            "type": "STRING",
            "enabled": true,
            "schemaType": "CUSTOM",
            "enumeratedValues": [{"value": "red", "archived": false}]
        }))
        .unwrap();
        let model = SchemaAttributeModel::flatten(ENV, SCHEMA, dto);
        let mut diagnostics = Diagnostics::new();
        let request = serde_json::to_value(model.expand(&mut diagnostics).unwrap()).unwrap();
        assert_eq!(request["enumeratedValues"], json!([{"value": "red", "archived": false}]));
        assert!(request.get("schemaType").is_none());
        assert_eq!(request["multiValued"], json!(false));
    }

    #[test]
    fn test_v0_state_is_kept() {
        let state = base();
        assert_eq!(SchemaAttributeResource.upgrade_state(0, state.clone()).unwrap(), state);
        assert!(SchemaAttributeResource.upgrade_state(2, state).is_err());
    }
}
