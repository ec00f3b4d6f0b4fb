//! `pingone_population`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info};

use super::{body, decode, env_path, filter_eq, finish, required, ObjectRef, Resource};
use crate::client::{
    ApiCall, ApiFailure, DefaultCreateRead, ErrorClassifier, InvalidValue, NotFoundWarning, RequestContext,
};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::import::ImportComponent;
use crate::schema::{Attribute, Schema, Validator};
use crate::state_model;
use crate::types::ApplyResult;
use crate::value::TriState;

state_model! {
    /// State of a population.
    pub struct PopulationModel {
        id: TriState<String>,
        environment_id: TriState<String>,
        name: TriState<String>,
        description: TriState<String>,
        password_policy_id: TriState<String>,
    }
}

/// A population as the API sends and receives it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Population {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_policy: Option<ObjectRef>,
    #[serde(default, skip_serializing)]
    pub user_count: Option<i64>,
}

impl PopulationModel {
    fn expand(&self, diagnostics: &mut Diagnostics) -> Option<Population> {
        Some(Population {
            name: required(self.name.as_deref(), "name", diagnostics)?,
            description: self.description.cloned_known(),
            password_policy: self.password_policy_id.cloned_known().map(ObjectRef::new),
            ..Default::default()
        })
    }

    pub(crate) fn flatten(environment_id: &str, population: Population) -> Self {
        Self {
            id: population.id.into(),
            environment_id: TriState::Known(environment_id.to_string()),
            name: TriState::Known(population.name),
            description: population.description.into(),
            password_policy_id: population.password_policy.map(|p| p.id).into(),
        }
    }
}

const LAST_POPULATION: &str = "must contain at least one population";

/// Deleting the last population of an environment is not an error.
struct PopulationDelete;

impl ErrorClassifier for PopulationDelete {
    fn classify(&self, operation: &str, failure: &ApiFailure) -> Option<Diagnostics> {
        if failure.message().contains(LAST_POPULATION) {
            let diagnostic = Diagnostic::warning("Constraint violation").with_detail(format!(
                "A constraint violation error was encountered: {}\n\nThe population has been removed from state but still exists in the environment.",
                failure.message()
            ));
            return Some(Diagnostics::from(diagnostic));
        }
        NotFoundWarning.classify(operation, failure)
    }
}

#[derive(Debug, Deserialize)]
struct Environment {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Default, Deserialize)]
struct UserPage {
    #[serde(default, rename = "_embedded")]
    embedded: UserPageItems,
}

#[derive(Debug, Default, Deserialize)]
struct UserPageItems {
    #[serde(default)]
    users: Vec<ObjectRef>,
}

/// Remove every user of a sandbox population so the population can go.
async fn force_delete_users(ctx: &RequestContext, environment_id: &str, population_id: &str) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();

    let (environment, call_diagnostics) = ApiCall::get("ReadOneEnvironment", format!("/environments/{}", environment_id))
        .with_retryable(&DefaultCreateRead)
        .send::<Environment>(ctx)
        .await;
    diagnostics.append(call_diagnostics);
    let Some(environment) = environment else {
        return diagnostics;
    };

    if environment.kind != "SANDBOX" {
        diagnostics.add_warning(
            "Data protection notice",
            format!(
                "For data protection reasons, the provider configuration `global_options.population.contains_users_force_delete` has no effect on environments of type {}.  Users in this population will not be force-deleted.",
                environment.kind
            ),
        );
        return diagnostics;
    }

    let path = env_path(environment_id, &filter_eq("users", "population.id", population_id));
    let mut attempted = HashSet::new();
    loop {
        let (page, call_diagnostics) = ApiCall::get("ReadAllUsers", path.clone()).send::<UserPage>(ctx).await;
        diagnostics.append(call_diagnostics);
        let Some(page) = page else {
            return diagnostics;
        };
        let pending: Vec<String> = page
            .embedded
            .users
            .into_iter()
            .map(|user| user.id)
            .filter(|id| !attempted.contains(id))
            .collect();
        // an empty page, or one listing only users already deleted
        if pending.is_empty() {
            return diagnostics;
        }

        debug!(count = pending.len(), population_id, "Force-deleting population users");
        for id in pending {
            let (_, call_diagnostics) = ApiCall::delete("DeleteUser", env_path(environment_id, &format!("users/{}", id)))
                .with_classifier(&NotFoundWarning)
                .send::<Value>(ctx)
                .await;
            diagnostics.append(call_diagnostics);
            if diagnostics.has_error() {
                return diagnostics;
            }
            attempted.insert(id);
        }
    }
}

/// Handler for `pingone_population`.
pub struct PopulationResource;

#[async_trait]
impl Resource for PopulationResource {
    fn type_name(&self) -> &'static str {
        "pingone_population"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Resource to create and manage a PingOne population in an environment.")
            .with_attribute("id", Attribute::id())
            .with_attribute(
                "environment_id",
                Attribute::parent_id("The ID of the environment to create the population in."),
            )
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("The name of the population.")
                    .with_validator(Validator::LengthAtLeast(1)),
            )
            .with_attribute("description", Attribute::optional_string())
            .with_attribute(
                "password_policy_id",
                Attribute::optional_string()
                    .with_description("The ID of a password policy to assign to the population.")
                    .with_validator(Validator::ResourceId),
            )
    }

    fn import_components(&self) -> Vec<ImportComponent> {
        vec![
            ImportComponent::resource_id("environment_id"),
            ImportComponent::resource_id("population_id").primary(),
        ]
    }

    async fn create(&self, ctx: &RequestContext, plan: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<PopulationModel>(plan, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let Some(environment_id) = required(model.environment_id.as_deref(), "environment_id", &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let Some(request) = model.expand(&mut diagnostics).and_then(|p| body(&p, &mut diagnostics)) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (created, call_diagnostics) = ApiCall::post("CreatePopulation", env_path(&environment_id, "populations"))
            .with_body(request)
            .with_classifier(&InvalidValue)
            .with_retryable(&DefaultCreateRead)
            .send::<Population>(&ctx)
            .await;
        diagnostics.append(call_diagnostics);

        finish(created.map(|p| PopulationModel::flatten(&environment_id, p)), diagnostics)
    }

    async fn read(&self, ctx: &RequestContext, state: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<PopulationModel>(state, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let (Some(environment_id), Some(id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(model.id.as_deref(), "id", &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (population, call_diagnostics) =
            ApiCall::get("ReadOnePopulation", env_path(&environment_id, &format!("populations/{}", id)))
                .with_classifier(&NotFoundWarning)
                .with_retryable(&DefaultCreateRead)
                .send::<Population>(&ctx)
                .await;
        diagnostics.append(call_diagnostics);

        finish(population.map(|p| PopulationModel::flatten(&environment_id, p)), diagnostics)
    }

    async fn update(&self, ctx: &RequestContext, plan: &Value, prior: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let (Some(model), Some(prior)) = (
            decode::<PopulationModel>(plan, &mut diagnostics),
            decode::<PopulationModel>(prior, &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };
        let (Some(environment_id), Some(id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(prior.id.as_deref(), "id", &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };
        let Some(request) = model.expand(&mut diagnostics).and_then(|p| body(&p, &mut diagnostics)) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (updated, call_diagnostics) =
            ApiCall::put("UpdatePopulation", env_path(&environment_id, &format!("populations/{}", id)))
                .with_body(request)
                .with_classifier(&InvalidValue)
                .send::<Population>(&ctx)
                .await;
        diagnostics.append(call_diagnostics);

        finish(updated.map(|p| PopulationModel::flatten(&environment_id, p)), diagnostics)
    }

    async fn delete(&self, ctx: &RequestContext, state: &Value) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<PopulationModel>(state, &mut diagnostics) else {
            return diagnostics;
        };
        let (Some(environment_id), Some(id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(model.id.as_deref(), "id", &mut diagnostics),
        ) else {
            return diagnostics;
        };

        let ctx = ctx.for_environment(&environment_id);
        if ctx.global_options().population.contains_users_force_delete {
            info!(population_id = %id, "Force delete of population users is enabled");
            diagnostics.append(force_delete_users(&ctx, &environment_id, &id).await);
            if diagnostics.has_error() {
                return diagnostics;
            }
        }

        let (_, call_diagnostics) =
            ApiCall::delete("DeletePopulation", env_path(&environment_id, &format!("populations/{}", id)))
                .with_classifier(&PopulationDelete)
                .send::<Value>(&ctx)
                .await;
        diagnostics.append(call_diagnostics);
        diagnostics
    }
}
