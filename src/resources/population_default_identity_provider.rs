//! `pingone_population_default_identity_provider`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{body, decode, env_path, finish, required, Resource};
use crate::client::{ApiCall, DefaultCreateRead, NotFoundWarning, RequestContext};
use crate::diagnostics::Diagnostics;
use crate::import::ImportComponent;
use crate::schema::{Attribute, Schema, Validator};
use crate::state_model;
use crate::types::ApplyResult;
use crate::value::TriState;

state_model! {
    /// State of a population's default identity provider.
    pub struct PopulationDefaultIdentityProviderModel {
        id: TriState<String>,
        environment_id: TriState<String>,
        population_id: TriState<String>,
        identity_provider_id: TriState<String>,
        #[attr = "type"]
        kind: TriState<String>,
    }
}

/// The `defaultIdentityProvider` object of a population.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct DefaultIdentityProvider {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, rename = "type", skip_serializing)]
    pub kind: Option<String>,
}

impl PopulationDefaultIdentityProviderModel {
    fn flatten(environment_id: &str, population_id: &str, idp: DefaultIdentityProvider) -> Self {
        Self {
            id: TriState::Known(population_id.to_string()),
            environment_id: TriState::Known(environment_id.to_string()),
            population_id: TriState::Known(population_id.to_string()),
            identity_provider_id: idp.id.into(),
            kind: idp.kind.into(),
        }
    }
}

/// Handler for `pingone_population_default_identity_provider`.
pub struct PopulationDefaultIdentityProviderResource;

impl PopulationDefaultIdentityProviderResource {
    async fn put(&self, ctx: &RequestContext, plan: &Value, operation: &str) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<PopulationDefaultIdentityProviderModel>(plan, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let (Some(environment_id), Some(population_id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(model.population_id.as_deref(), "population_id", &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };
        let request = DefaultIdentityProvider {
            id: model.identity_provider_id.cloned_known(),
            kind: None,
        };
        let Some(request) = body(&request, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (updated, call_diagnostics) = ApiCall::put(operation, default_idp_path(&environment_id, &population_id))
            .with_body(request)
            .with_retryable(&DefaultCreateRead)
            .send::<DefaultIdentityProvider>(&ctx)
            .await;
        diagnostics.append(call_diagnostics);

        finish(
            updated.map(|idp| PopulationDefaultIdentityProviderModel::flatten(&environment_id, &population_id, idp)),
            diagnostics,
        )
    }
}

fn default_idp_path(environment_id: &str, population_id: &str) -> String {
    env_path(environment_id, &format!("populations/{}/defaultIdentityProvider", population_id))
}

#[async_trait]
impl Resource for PopulationDefaultIdentityProviderResource {
    fn type_name(&self) -> &'static str {
        "pingone_population_default_identity_provider"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Resource to manage the default identity provider of a PingOne population.")
            .with_attribute("id", Attribute::id())
            .with_attribute(
                "environment_id",
                Attribute::parent_id("The ID of the environment that contains the population."),
            )
            .with_attribute(
                "population_id",
                Attribute::parent_id("The ID of the population to set the default identity provider for."),
            )
            .with_attribute(
                "identity_provider_id",
                Attribute::optional_string()
                    .with_description("The ID of the identity provider. When unset, the PingOne directory is used.")
                    .with_validator(Validator::ResourceId),
            )
            .with_attribute(
                "type",
                Attribute::computed_string().with_description("The type of the default identity provider."),
            )
    }

    fn import_components(&self) -> Vec<ImportComponent> {
        vec![
            ImportComponent::resource_id("environment_id"),
            ImportComponent::resource_id("population_id").primary(),
        ]
    }

    async fn create(&self, ctx: &RequestContext, plan: &Value) -> ApplyResult {
        self.put(ctx, plan, "UpdatePopulationDefaultIdentityProvider").await
    }

    async fn read(&self, ctx: &RequestContext, state: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<PopulationDefaultIdentityProviderModel>(state, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let (Some(environment_id), Some(population_id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(model.population_id.as_deref(), "population_id", &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (idp, call_diagnostics) = ApiCall::get(
            "ReadPopulationDefaultIdentityProvider",
            default_idp_path(&environment_id, &population_id),
        )
        .with_classifier(&NotFoundWarning)
        .with_retryable(&DefaultCreateRead)
        .send::<DefaultIdentityProvider>(&ctx)
        .await;
        diagnostics.append(call_diagnostics);

        finish(
            idp.map(|idp| PopulationDefaultIdentityProviderModel::flatten(&environment_id, &population_id, idp)),
            diagnostics,
        )
    }

    async fn update(&self, ctx: &RequestContext, plan: &Value, _prior: &Value) -> ApplyResult {
        self.put(ctx, plan, "UpdatePopulationDefaultIdentityProvider").await
    }

    async fn delete(&self, ctx: &RequestContext, state: &Value) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<PopulationDefaultIdentityProviderModel>(state, &mut diagnostics) else {
            return diagnostics;
        };
        let (Some(environment_id), Some(population_id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(model.population_id.as_deref(), "population_id", &mut diagnostics),
        ) else {
            return diagnostics;
        };

        // an empty body resets the population to the PingOne directory
        let ctx = ctx.for_environment(&environment_id);
        let (_, call_diagnostics) = ApiCall::put(
            "UpdatePopulationDefaultIdentityProvider",
            default_idp_path(&environment_id, &population_id),
        )
        .with_body(Value::Object(serde_json::Map::new()))
        .with_classifier(&NotFoundWarning)
        .send::<Value>(&ctx)
        .await;
        diagnostics.append(call_diagnostics);
        diagnostics
    }
}
