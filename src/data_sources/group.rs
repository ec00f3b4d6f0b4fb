//! `pingone_group` lookup.

use async_trait::async_trait;
use serde_json::Value;

use super::{find_in_collection, lookup_id, not_found_by_name, with_lookup_id, DataSource};
use crate::bridge::IntoValue;
use crate::client::{ApiCall, DefaultCreateRead, RequestContext};
use crate::diagnostics::Diagnostics;
use crate::resources::group::{Group, GroupModel};
use crate::resources::{decode, env_path, filter_eq, required};
use crate::schema::{Attribute, BlockValidator, Schema, Validator};
use crate::state_model;
use crate::types::ApplyResult;
use crate::value::TriState;

state_model! {
    /// The lookup keys of a group query.
    pub struct GroupLookup {
        environment_id: TriState<String>,
        group_id: TriState<String>,
        name: TriState<String>,
    }
}

/// Reads a group by id or name.
pub struct GroupDataSource;

#[async_trait]
impl DataSource for GroupDataSource {
    fn type_name(&self) -> &'static str {
        "pingone_group"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Data source to retrieve a PingOne group by its ID or name.")
            .with_attribute("id", Attribute::id())
            .with_attribute(
                "environment_id",
                Attribute::required_string()
                    .with_description("The ID of the environment that contains the group.")
                    .with_validator(Validator::ResourceId),
            )
            .with_attribute("group_id", lookup_id("The ID of the group."))
            .with_attribute(
                "name",
                Attribute::optional_computed_string().with_description("The name of the group."),
            )
            .with_attribute("description", Attribute::computed_string())
            .with_attribute("population_id", Attribute::computed_string())
            .with_attribute("user_filter", Attribute::computed_string())
            .with_attribute("external_id", Attribute::computed_string())
            .with_validator(BlockValidator::exactly_one_of(&["group_id", "name"]))
    }

    async fn read(&self, ctx: &RequestContext, config: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let Some(lookup) = decode::<GroupLookup>(config, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let Some(environment_id) = required(lookup.environment_id.as_deref(), "environment_id", &mut diagnostics)
        else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let group = match (lookup.group_id.as_deref(), lookup.name.as_deref()) {
            (Some(id), _) => {
                let (group, call_diagnostics) =
                    ApiCall::get("ReadOneGroup", env_path(&environment_id, &format!("groups/{}", id)))
                        .with_retryable(&DefaultCreateRead)
                        .send::<Group>(&ctx)
                        .await;
                diagnostics.append(call_diagnostics);
                group
            },
            (None, Some(name)) => {
                let path = env_path(&environment_id, &filter_eq("groups", "name", name));
                let (group, call_diagnostics) =
                    find_in_collection::<Group, _>(&ctx, "ReadAllGroups", path, "groups", |g| g.name == name).await;
                diagnostics.append(call_diagnostics);
                if group.is_none() && !diagnostics.has_error() {
                    diagnostics.push(not_found_by_name("group", name, &format!("environment {}", environment_id)));
                }
                group
            },
            (None, None) => {
                diagnostics.add_error(
                    "Missing parameter",
                    "Cannot find the requested group. group_id or name must be set.",
                );
                None
            },
        };

        let state = group.map(|g| with_lookup_id(GroupModel::flatten(&environment_id, g).into_value(), "group_id"));
        ApplyResult::new(state, diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;
    use serde_json::json;

    #[test]
    fn test_id_and_name_are_exclusive() {
        let schema = GroupDataSource.schema();
        let config = json!({
            "environment_id": "9c052a8a-14be-44e4-8f07-2662569994ce",
            "group_id": "1d4f8dc0-4c38-4d7a-a3e5-8d35ef8f4c01",
            "name": "admins"
        });
        let diagnostics = validate(&schema, &config);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Invalid Attribute Combination");

        let neither = json!({"environment_id": "9c052a8a-14be-44e4-8f07-2662569994ce"});
        assert_eq!(validate(&schema, &neither).len(), 1);
    }
}
