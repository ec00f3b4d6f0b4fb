//! `pingone_role` lookup.
//!
//! Roles are tenant-wide, so the lookup takes no environment.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{find_in_collection, lookup_id, not_found_by_name, with_lookup_id, DataSource};
use crate::bridge::{string_set, IntoValue};
use crate::client::{ApiCall, DefaultCreateRead, RequestContext};
use crate::diagnostics::Diagnostics;
use crate::resources::application_role_assignment::ScopeType;
use crate::resources::decode;
use crate::schema::{Attribute, AttributeFlags, AttributeType, BlockValidator, Schema};
use crate::state_model;
use crate::types::ApplyResult;
use crate::value::TriState;

state_model! {
    /// State of a role lookup.
    pub struct RoleModel {
        id: TriState<String>,
        role_id: TriState<String>,
        name: TriState<String>,
        description: TriState<String>,
        applicable_to: TriState<Vec<String>>,
    }
}

/// A built-in role as the API sends it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct RoleDto {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub applicable_to: Vec<ScopeType>,
}

impl RoleModel {
    fn flatten(role: RoleDto) -> Self {
        let applicable_to = role.applicable_to.iter().map(|s| s.as_str().to_string()).collect();
        Self {
            id: TriState::Known(role.id),
            role_id: TriState::Null,
            name: TriState::Known(role.name),
            description: role.description.into(),
            applicable_to: string_set(TriState::Known(applicable_to)).into(),
        }
    }
}

/// Reads a built-in role by id or name.
pub struct RoleDataSource;

#[async_trait]
impl DataSource for RoleDataSource {
    fn type_name(&self) -> &'static str {
        "pingone_role"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Data source to retrieve a PingOne admin role by its ID or name.")
            .with_attribute("id", Attribute::id())
            .with_attribute("role_id", lookup_id("The ID of the role."))
            .with_attribute(
                "name",
                Attribute::optional_computed_string()
                    .with_description("The name of the role, such as `Environment Admin`."),
            )
            .with_attribute("description", Attribute::computed_string())
            .with_attribute(
                "applicable_to",
                Attribute::new(AttributeType::set(AttributeType::String), AttributeFlags::computed())
                    .with_description("The scope types the role can be assigned with."),
            )
            .with_validator(BlockValidator::exactly_one_of(&["role_id", "name"]))
    }

    async fn read(&self, ctx: &RequestContext, config: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let Some(lookup) = decode::<RoleModel>(config, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };

        let role = match (lookup.role_id.as_deref(), lookup.name.as_deref()) {
            (Some(id), _) => {
                let (role, call_diagnostics) = ApiCall::get("ReadOneRole", format!("/roles/{}", id))
                    .with_retryable(&DefaultCreateRead)
                    .send::<RoleDto>(ctx)
                    .await;
                diagnostics.append(call_diagnostics);
                role
            },
            (None, Some(name)) => {
                let (role, call_diagnostics) =
                    find_in_collection::<RoleDto, _>(ctx, "ReadAllRoles", "/roles".to_string(), "roles", |r| {
                        r.name == name
                    })
                    .await;
                diagnostics.append(call_diagnostics);
                if role.is_none() && !diagnostics.has_error() {
                    diagnostics.push(not_found_by_name("role", name, "the tenant"));
                }
                role
            },
            (None, None) => {
                diagnostics.add_error(
                    "Missing parameter",
                    "Cannot find the requested role. role_id or name must be set.",
                );
                None
            },
        };

        let state = role.map(|r| with_lookup_id(RoleModel::flatten(r).into_value(), "role_id"));
        ApplyResult::new(state, diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_sorts_applicable_to() {
        let role: RoleDto = serde_json::from_value(json!({
            "id": "r1",
            "name": "Identity Data Admin",
            "applicableTo": ["POPULATION", "ENVIRONMENT"]
        }))
        .unwrap();
        let state = with_lookup_id(RoleModel::flatten(role).into_value(), "role_id");
        assert_eq!(state["role_id"], "r1");
        assert_eq!(state["applicable_to"], json!(["ENVIRONMENT", "POPULATION"]));
        assert!(state["description"].is_null());
    }
}
