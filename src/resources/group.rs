//! `pingone_group`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{body, decode, env_path, finish, required, ObjectRef, Resource};
use crate::client::{ApiCall, DefaultCreateRead, InvalidValue, NotFoundWarning, RequestContext};
use crate::diagnostics::Diagnostics;
use crate::import::ImportComponent;
use crate::schema::{Attribute, Schema, Validator};
use crate::state_model;
use crate::types::ApplyResult;
use crate::value::TriState;

state_model! {
    /// State of a group.
    pub struct GroupModel {
        id: TriState<String>,
        environment_id: TriState<String>,
        name: TriState<String>,
        description: TriState<String>,
        population_id: TriState<String>,
        user_filter: TriState<String>,
        external_id: TriState<String>,
    }
}

/// A group as the API sends and receives it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Group {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population: Option<ObjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl GroupModel {
    fn expand(&self, diagnostics: &mut Diagnostics) -> Option<Group> {
        Some(Group {
            id: None,
            name: required(self.name.as_deref(), "name", diagnostics)?,
            description: self.description.cloned_known(),
            population: self.population_id.cloned_known().map(ObjectRef::new),
            user_filter: self.user_filter.cloned_known(),
            external_id: self.external_id.cloned_known(),
        })
    }

    pub(crate) fn flatten(environment_id: &str, group: Group) -> Self {
        Self {
            id: group.id.into(),
            environment_id: TriState::Known(environment_id.to_string()),
            name: TriState::Known(group.name),
            description: group.description.into(),
            population_id: group.population.map(|p| p.id).into(),
            user_filter: group.user_filter.into(),
            external_id: group.external_id.into(),
        }
    }
}

/// Handler for `pingone_group`.
pub struct GroupResource;

#[async_trait]
impl Resource for GroupResource {
    fn type_name(&self) -> &'static str {
        "pingone_group"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Resource to create and manage PingOne groups.")
            .with_attribute("id", Attribute::id())
            .with_attribute(
                "environment_id",
                Attribute::parent_id("The ID of the environment to create the group in."),
            )
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("The name of the group.")
                    .with_validator(Validator::LengthAtLeast(1)),
            )
            .with_attribute("description", Attribute::optional_string())
            .with_attribute(
                "population_id",
                Attribute::optional_string()
                    .with_description("The ID of the population the group is scoped to. Changing it re-creates the group.")
                    .with_validator(Validator::ResourceId)
                    .with_force_new(),
            )
            .with_attribute(
                "user_filter",
                Attribute::optional_string()
                    .with_description("A SCIM filter that dynamically assigns users to the group."),
            )
            .with_attribute("external_id", Attribute::optional_string())
    }

    fn import_components(&self) -> Vec<ImportComponent> {
        vec![
            ImportComponent::resource_id("environment_id"),
            ImportComponent::resource_id("group_id").primary(),
        ]
    }

    async fn create(&self, ctx: &RequestContext, plan: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<GroupModel>(plan, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let Some(environment_id) = required(model.environment_id.as_deref(), "environment_id", &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let Some(request) = model.expand(&mut diagnostics).and_then(|g| body(&g, &mut diagnostics)) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (created, call_diagnostics) = ApiCall::post("CreateGroup", env_path(&environment_id, "groups"))
            .with_body(request)
            .with_classifier(&InvalidValue)
            .with_retryable(&DefaultCreateRead)
            .send::<Group>(&ctx)
            .await;
        diagnostics.append(call_diagnostics);

        finish(created.map(|g| GroupModel::flatten(&environment_id, g)), diagnostics)
    }

    async fn read(&self, ctx: &RequestContext, state: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<GroupModel>(state, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let (Some(environment_id), Some(id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(model.id.as_deref(), "id", &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (group, call_diagnostics) =
            ApiCall::get("ReadOneGroup", env_path(&environment_id, &format!("groups/{}", id)))
                .with_classifier(&NotFoundWarning)
                .with_retryable(&DefaultCreateRead)
                .send::<Group>(&ctx)
                .await;
        diagnostics.append(call_diagnostics);

        finish(group.map(|g| GroupModel::flatten(&environment_id, g)), diagnostics)
    }

    async fn update(&self, ctx: &RequestContext, plan: &Value, prior: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let (Some(model), Some(prior)) = (
            decode::<GroupModel>(plan, &mut diagnostics),
            decode::<GroupModel>(prior, &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };
        let (Some(environment_id), Some(id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(prior.id.as_deref(), "id", &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };
        let Some(request) = model.expand(&mut diagnostics).and_then(|g| body(&g, &mut diagnostics)) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (updated, call_diagnostics) =
            ApiCall::put("UpdateGroup", env_path(&environment_id, &format!("groups/{}", id)))
                .with_body(request)
                .with_classifier(&InvalidValue)
                .send::<Group>(&ctx)
                .await;
        diagnostics.append(call_diagnostics);

        finish(updated.map(|g| GroupModel::flatten(&environment_id, g)), diagnostics)
    }

    async fn delete(&self, ctx: &RequestContext, state: &Value) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<GroupModel>(state, &mut diagnostics) else {
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
            ApiCall::delete("DeleteGroup", env_path(&environment_id, &format!("groups/{}", id)))
                .with_classifier(&NotFoundWarning)
                .send::<Value>(&ctx)
                .await;
        diagnostics.append(call_diagnostics);
        diagnostics
    }
}
