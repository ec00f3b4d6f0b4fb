//! `pingone_resource`, a custom OAuth resource server.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{body, decode, env_path, finish, required, Resource};
use crate::client::{ApiCall, DefaultCreateRead, InvalidValue, NotFoundWarning, RequestContext};
use crate::diagnostics::Diagnostics;
use crate::import::ImportComponent;
use crate::schema::{Attribute, PlanModifier, Schema, Validator};
use crate::state_model;
use crate::types::ApplyResult;
use crate::value::TriState;

const CUSTOM: &str = "CUSTOM";

state_model! {
    /// State of a custom resource.
    pub struct ResourceModel {
        id: TriState<String>,
        environment_id: TriState<String>,
        name: TriState<String>,
        description: TriState<String>,
        #[attr = "type"]
        kind: TriState<String>,
        audience: TriState<String>,
        access_token_validity_seconds: TriState<i64>,
    }
}

/// A resource as the API sends and receives it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct ResourceDto {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_validity_seconds: Option<i64>,
}

impl ResourceModel {
    fn expand(&self, diagnostics: &mut Diagnostics) -> Option<ResourceDto> {
        Some(ResourceDto {
            id: None,
            name: required(self.name.as_deref(), "name", diagnostics)?,
            description: self.description.cloned_known(),
            kind: CUSTOM.to_string(),
            audience: self.audience.cloned_known(),
            access_token_validity_seconds: self.access_token_validity_seconds.cloned_known(),
        })
    }

    fn flatten(environment_id: &str, resource: ResourceDto) -> Self {
        Self {
            id: resource.id.into(),
            environment_id: TriState::Known(environment_id.to_string()),
            name: TriState::Known(resource.name),
            description: resource.description.into(),
            kind: TriState::Known(resource.kind),
            audience: resource.audience.into(),
            access_token_validity_seconds: resource.access_token_validity_seconds.into(),
        }
    }
}

/// Handler for `pingone_resource`.
pub struct ResourceResource;

#[async_trait]
impl Resource for ResourceResource {
    fn type_name(&self) -> &'static str {
        "pingone_resource"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Resource to create and manage custom resources in a PingOne environment.")
            .with_attribute("id", Attribute::id())
            .with_attribute(
                "environment_id",
                Attribute::parent_id("The ID of the environment to create the resource in."),
            )
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("The name of the resource.")
                    .with_validator(Validator::LengthAtLeast(1)),
            )
            .with_attribute("description", Attribute::optional_string())
            .with_attribute(
                "type",
                Attribute::computed_string()
                    .with_description("The type of resource. Only `CUSTOM` resources can be managed.")
                    .with_plan_modifier(PlanModifier::UseStateForUnknown),
            )
            .with_attribute(
                "audience",
                Attribute::optional_computed_string()
                    .with_description("The audience claim of access tokens issued for this resource. Defaults to the resource name.")
                    .with_validator(Validator::LengthBetween { min: 1, max: 256 })
                    .with_validator(Validator::NoneOfSubstrings(vec![
                        "pingone".to_string(),
                        "pingidentity".to_string(),
                    ])),
            )
            .with_attribute(
                "access_token_validity_seconds",
                Attribute::optional_int64()
                    .with_description("How long an access token issued for this resource is valid.")
                    .with_default(json!(3600))
                    .with_validator(Validator::IntBetween { min: 300, max: 2_592_000 }),
            )
    }

    fn import_components(&self) -> Vec<ImportComponent> {
        vec![
            ImportComponent::resource_id("environment_id"),
            ImportComponent::resource_id("resource_id").primary(),
        ]
    }

    async fn create(&self, ctx: &RequestContext, plan: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<ResourceModel>(plan, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let Some(environment_id) = required(model.environment_id.as_deref(), "environment_id", &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let Some(request) = model.expand(&mut diagnostics).and_then(|r| body(&r, &mut diagnostics)) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (created, call_diagnostics) = ApiCall::post("CreateResource", env_path(&environment_id, "resources"))
            .with_body(request)
            .with_classifier(&InvalidValue)
            .with_retryable(&DefaultCreateRead)
            .send::<ResourceDto>(&ctx)
            .await;
        diagnostics.append(call_diagnostics);

        finish(created.map(|r| ResourceModel::flatten(&environment_id, r)), diagnostics)
    }

    async fn read(&self, ctx: &RequestContext, state: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<ResourceModel>(state, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let (Some(environment_id), Some(id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(model.id.as_deref(), "id", &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (resource, call_diagnostics) =
            ApiCall::get("ReadOneResource", env_path(&environment_id, &format!("resources/{}", id)))
                .with_classifier(&NotFoundWarning)
                .with_retryable(&DefaultCreateRead)
                .send::<ResourceDto>(&ctx)
                .await;
        diagnostics.append(call_diagnostics);

        if let Some(resource) = &resource {
            if resource.kind != CUSTOM {
                diagnostics.add_error(
                    "Unsupported resource type",
                    format!(
                        "The resource {} is of type {}. Only {} resources can be managed.",
                        id, resource.kind, CUSTOM
                    ),
                );
                return ApplyResult::new(None, diagnostics);
            }
        }

        finish(resource.map(|r| ResourceModel::flatten(&environment_id, r)), diagnostics)
    }

    async fn update(&self, ctx: &RequestContext, plan: &Value, prior: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let (Some(model), Some(prior)) = (
            decode::<ResourceModel>(plan, &mut diagnostics),
            decode::<ResourceModel>(prior, &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };
        let (Some(environment_id), Some(id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(prior.id.as_deref(), "id", &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };
        let Some(request) = model.expand(&mut diagnostics).and_then(|r| body(&r, &mut diagnostics)) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (updated, call_diagnostics) =
            ApiCall::put("UpdateResource", env_path(&environment_id, &format!("resources/{}", id)))
                .with_body(request)
                .with_classifier(&InvalidValue)
                .send::<ResourceDto>(&ctx)
                .await;
        diagnostics.append(call_diagnostics);

        finish(updated.map(|r| ResourceModel::flatten(&environment_id, r)), diagnostics)
    }

    async fn delete(&self, ctx: &RequestContext, state: &Value) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<ResourceModel>(state, &mut diagnostics) else {
            return diagnostics;
        };
        let (Some(environment_id), Some(id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(model.id.as_deref(), "id", &mut diagnostics),
        ) else {
            return diagnostics;
        };

        let ctx = ctx.for_environment(&environment_id);
        let (_, call_diagnostics) =
            ApiCall::delete("DeleteResource", env_path(&environment_id, &format!("resources/{}", id)))
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
    use crate::validation::validate;

    const ENV: &str = "9c052a8a-14be-44e4-8f07-2662569994ce";

    #[test]
    fn test_create_body_is_always_custom() {
        let model = ResourceModel {
            name: TriState::Known("api".to_string()),
            kind: TriState::Unknown,
            audience: TriState::Unknown,
            access_token_validity_seconds: TriState::Known(3600),
            ..Default::default()
        };
        let mut diagnostics = Diagnostics::new();
        let request = serde_json::to_value(model.expand(&mut diagnostics).unwrap()).unwrap();
        assert_eq!(
            request,
            json!({"name": "api", "type": "CUSTOM", "accessTokenValiditySeconds": 3600})
        );
    }

    #[test]
    fn test_audience_rejects_reserved_names() {
        let schema = ResourceResource.schema();
        let diagnostics = validate(
            &schema,
            &json!({"environment_id": ENV, "name": "api", "audience": "https://api.PingOne.com"}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("audience"));

        let ok = json!({"environment_id": ENV, "name": "api", "audience": "https://api.example.com"});
        assert!(validate(&schema, &ok).is_empty());
    }

    #[test]
    fn test_validity_range() {
        let schema = ResourceResource.schema();
        let low = json!({"environment_id": ENV, "name": "api", "access_token_validity_seconds": 299});
        assert_eq!(validate(&schema, &low).len(), 1);
        let high = json!({"environment_id": ENV, "name": "api", "access_token_validity_seconds": 2_592_000});
        assert!(validate(&schema, &high).is_empty());
    }
}
