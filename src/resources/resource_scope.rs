//! `pingone_resource_scope`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{body, decode, env_path, finish, required, Resource};
use crate::bridge::string_set;
use crate::client::{ApiCall, DefaultCreateRead, InvalidValue, NotFoundWarning, RequestContext};
use crate::diagnostics::Diagnostics;
use crate::import::ImportComponent;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema, Validator};
use crate::state_model;
use crate::types::ApplyResult;
use crate::value::TriState;

state_model! {
    /// State of a scope on a custom resource.
    pub struct ResourceScopeModel {
        id: TriState<String>,
        environment_id: TriState<String>,
        resource_id: TriState<String>,
        name: TriState<String>,
        description: TriState<String>,
        schema_attributes: TriState<Vec<String>>,
    }
}

/// A resource scope as the API sends and receives it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct ResourceScope {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_attributes: Option<Vec<String>>,
}

impl ResourceScopeModel {
    fn expand(&self, diagnostics: &mut Diagnostics) -> Option<ResourceScope> {
        Some(ResourceScope {
            id: None,
            name: required(self.name.as_deref(), "name", diagnostics)?,
            description: self.description.cloned_known(),
            schema_attributes: string_set(self.schema_attributes.clone()),
        })
    }

    fn flatten(environment_id: &str, resource_id: &str, scope: ResourceScope) -> Self {
        Self {
            id: scope.id.into(),
            environment_id: TriState::Known(environment_id.to_string()),
            resource_id: TriState::Known(resource_id.to_string()),
            name: TriState::Known(scope.name),
            description: scope.description.into(),
            schema_attributes: string_set(scope.schema_attributes.into()).into(),
        }
    }
}

fn scopes_path(environment_id: &str, resource_id: &str) -> String {
    env_path(environment_id, &format!("resources/{}/scopes", resource_id))
}

/// Handler for `pingone_resource_scope`.
pub struct ResourceScopeResource;

#[async_trait]
impl Resource for ResourceScopeResource {
    fn type_name(&self) -> &'static str {
        "pingone_resource_scope"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Resource to create and manage OAuth scopes of a custom resource.")
            .with_attribute("id", Attribute::id())
            .with_attribute(
                "environment_id",
                Attribute::parent_id("The ID of the environment that contains the resource."),
            )
            .with_attribute(
                "resource_id",
                Attribute::parent_id("The ID of the custom resource to create the scope for."),
            )
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("The name of the scope.")
                    .with_validator(Validator::LengthAtLeast(1))
                    .with_force_new(),
            )
            .with_attribute("description", Attribute::optional_string())
            .with_attribute(
                "schema_attributes",
                Attribute::new(AttributeType::set(AttributeType::String), AttributeFlags::optional_computed())
                    .with_description("User schema attributes that can be read or updated with this scope."),
            )
    }

    fn import_components(&self) -> Vec<ImportComponent> {
        vec![
            ImportComponent::resource_id("environment_id"),
            ImportComponent::resource_id("resource_id"),
            ImportComponent::resource_id("resource_scope_id").primary(),
        ]
    }

    async fn create(&self, ctx: &RequestContext, plan: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<ResourceScopeModel>(plan, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let (Some(environment_id), Some(resource_id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(model.resource_id.as_deref(), "resource_id", &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };
        let Some(request) = model.expand(&mut diagnostics).and_then(|s| body(&s, &mut diagnostics)) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (created, call_diagnostics) = ApiCall::post("CreateResourceScope", scopes_path(&environment_id, &resource_id))
            .with_body(request)
            .with_classifier(&InvalidValue)
            .with_retryable(&DefaultCreateRead)
            .send::<ResourceScope>(&ctx)
            .await;
        diagnostics.append(call_diagnostics);

        finish(
            created.map(|s| ResourceScopeModel::flatten(&environment_id, &resource_id, s)),
            diagnostics,
        )
    }

    async fn read(&self, ctx: &RequestContext, state: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<ResourceScopeModel>(state, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let (Some(environment_id), Some(resource_id), Some(id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(model.resource_id.as_deref(), "resource_id", &mut diagnostics),
            required(model.id.as_deref(), "id", &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (scope, call_diagnostics) = ApiCall::get(
            "ReadOneResourceScope",
            format!("{}/{}", scopes_path(&environment_id, &resource_id), id),
        )
        .with_classifier(&NotFoundWarning)
        .with_retryable(&DefaultCreateRead)
        .send::<ResourceScope>(&ctx)
        .await;
        diagnostics.append(call_diagnostics);

        finish(
            scope.map(|s| ResourceScopeModel::flatten(&environment_id, &resource_id, s)),
            diagnostics,
        )
    }

    async fn update(&self, ctx: &RequestContext, plan: &Value, prior: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let (Some(model), Some(prior)) = (
            decode::<ResourceScopeModel>(plan, &mut diagnostics),
            decode::<ResourceScopeModel>(prior, &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };
        let (Some(environment_id), Some(resource_id), Some(id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(model.resource_id.as_deref(), "resource_id", &mut diagnostics),
            required(prior.id.as_deref(), "id", &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };
        let Some(request) = model.expand(&mut diagnostics).and_then(|s| body(&s, &mut diagnostics)) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (updated, call_diagnostics) = ApiCall::put(
            "UpdateResourceScope",
            format!("{}/{}", scopes_path(&environment_id, &resource_id), id),
        )
        .with_body(request)
        .with_classifier(&InvalidValue)
        .send::<ResourceScope>(&ctx)
        .await;
        diagnostics.append(call_diagnostics);

        finish(
            updated.map(|s| ResourceScopeModel::flatten(&environment_id, &resource_id, s)),
            diagnostics,
        )
    }

    async fn delete(&self, ctx: &RequestContext, state: &Value) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<ResourceScopeModel>(state, &mut diagnostics) else {
            return diagnostics;
        };
        let (Some(environment_id), Some(resource_id), Some(id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(model.resource_id.as_deref(), "resource_id", &mut diagnostics),
            required(model.id.as_deref(), "id", &mut diagnostics),
        ) else {
            return diagnostics;
        };

        let ctx = ctx.for_environment(&environment_id);
        let (_, call_diagnostics) = ApiCall::delete(
            "DeleteResourceScope",
            format!("{}/{}", scopes_path(&environment_id, &resource_id), id),
        )
        .with_classifier(&NotFoundWarning)
        .send::<Value>(&ctx)
        .await;
        diagnostics.append(call_diagnostics);
        diagnostics
    }
}
