//! `pingone_population` lookup.

use async_trait::async_trait;
use serde_json::Value;

use super::{find_in_collection, lookup_id, not_found_by_name, with_lookup_id, DataSource};
use crate::bridge::IntoValue;
use crate::client::{ApiCall, DefaultCreateRead, RequestContext};
use crate::diagnostics::Diagnostics;
use crate::resources::population::{Population, PopulationModel};
use crate::resources::{decode, env_path, filter_eq, required};
use crate::schema::{Attribute, BlockValidator, Schema, Validator};
use crate::state_model;
use crate::types::ApplyResult;
use crate::value::TriState;

state_model! {
    /// The lookup keys of a population query.
    pub struct PopulationLookup {
        environment_id: TriState<String>,
        population_id: TriState<String>,
        name: TriState<String>,
    }
}

/// Reads a population by id or name.
pub struct PopulationDataSource;

#[async_trait]
impl DataSource for PopulationDataSource {
    fn type_name(&self) -> &'static str {
        "pingone_population"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Data source to retrieve a PingOne population by its ID or name.")
            .with_attribute("id", Attribute::id())
            .with_attribute(
                "environment_id",
                Attribute::required_string()
                    .with_description("The ID of the environment that contains the population.")
                    .with_validator(Validator::ResourceId),
            )
            .with_attribute("population_id", lookup_id("The ID of the population."))
            .with_attribute(
                "name",
                Attribute::optional_computed_string().with_description("The name of the population."),
            )
            .with_attribute("description", Attribute::computed_string())
            .with_attribute("password_policy_id", Attribute::computed_string())
            .with_validator(BlockValidator::exactly_one_of(&["population_id", "name"]))
    }

    async fn read(&self, ctx: &RequestContext, config: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let Some(lookup) = decode::<PopulationLookup>(config, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let Some(environment_id) = required(lookup.environment_id.as_deref(), "environment_id", &mut diagnostics)
        else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let population = match (lookup.population_id.as_deref(), lookup.name.as_deref()) {
            (Some(id), _) => {
                let (population, call_diagnostics) =
                    ApiCall::get("ReadOnePopulation", env_path(&environment_id, &format!("populations/{}", id)))
                        .with_retryable(&DefaultCreateRead)
                        .send::<Population>(&ctx)
                        .await;
                diagnostics.append(call_diagnostics);
                population
            },
            (None, Some(name)) => {
                let path = env_path(&environment_id, &filter_eq("populations", "name", name));
                let (population, call_diagnostics) =
                    find_in_collection::<Population, _>(&ctx, "ReadAllPopulations", path, "populations", |p| {
                        p.name == name
                    })
                    .await;
                diagnostics.append(call_diagnostics);
                if population.is_none() && !diagnostics.has_error() {
                    let scope = format!("environment {}", environment_id);
                    diagnostics.push(not_found_by_name("population", name, &scope));
                }
                population
            },
            (None, None) => {
                diagnostics.add_error(
                    "Missing parameter",
                    "Cannot find the requested population. population_id or name must be set.",
                );
                None
            },
        };

        let state = population
            .map(|p| with_lookup_id(PopulationModel::flatten(&environment_id, p).into_value(), "population_id"));
        ApplyResult::new(state, diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_carries_lookup_id_and_policy() {
        let population: Population = serde_json::from_value(json!({
            "id": "p1",
            "name": "Sample Users",
            "passwordPolicy": {"id": "pp1"},
            "userCount": 12
        }))
        .unwrap();
        let state = with_lookup_id(PopulationModel::flatten("env", population).into_value(), "population_id");
        assert_eq!(state["population_id"], "p1");
        assert_eq!(state["password_policy_id"], "pp1");
        assert_eq!(state["environment_id"], "env");
    }
}
