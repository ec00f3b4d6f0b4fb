//! `pingone_application_role_assignment`.
//!
//! Assigns an admin role to a worker application, scoped to one organization,
//! environment, population or application. The role is read first so that a
//! role that cannot take the requested scope fails before anything is created.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{body, decode, env_path, finish, required, ObjectRef, Resource};
use crate::api_enum;
use crate::bridge::select_variant;
use crate::client::{
    ApiCall, ApiFailure, DefaultCreateRead, ErrorClassifier, NotFoundWarning, RequestContext, RoleAssignment,
};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::import::ImportComponent;
use crate::schema::{Attribute, BlockValidator, Schema, Validator};
use crate::state_model;
use crate::types::ApplyResult;
use crate::value::TriState;

/// Summary of the error raised for a role that cannot take the scope.
pub const INCOMPATIBLE_ROLE_SCOPE: &str = "Incompatible role and scope combination";

const SCOPE_ATTRIBUTES: [&str; 4] = [
    "scope_organization_id",
    "scope_environment_id",
    "scope_population_id",
    "scope_application_id",
];

api_enum! {
    /// What a role assignment is limited to.
    pub enum ScopeType {
        Organization => "ORGANIZATION",
        Environment => "ENVIRONMENT",
        Population => "POPULATION",
        Application => "APPLICATION",
    }
}

impl ScopeType {
    fn attribute(&self) -> Option<&'static str> {
        match self {
            Self::Organization => Some("scope_organization_id"),
            Self::Environment => Some("scope_environment_id"),
            Self::Population => Some("scope_population_id"),
            Self::Application => Some("scope_application_id"),
            Self::Other(_) => None,
        }
    }

    fn from_attribute(attribute: &str) -> Self {
        match attribute {
            "scope_organization_id" => Self::Organization,
            "scope_environment_id" => Self::Environment,
            "scope_population_id" => Self::Population,
            _ => Self::Application,
        }
    }
}

state_model! {
    /// State of an application role assignment.
    pub struct ApplicationRoleAssignmentModel {
        id: TriState<String>,
        environment_id: TriState<String>,
        application_id: TriState<String>,
        role_id: TriState<String>,
        scope_organization_id: TriState<String>,
        scope_environment_id: TriState<String>,
        scope_population_id: TriState<String>,
        scope_application_id: TriState<String>,
        read_only: TriState<bool>,
    }
}

/// Scope of a role assignment on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Scope {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ScopeType,
}

/// A role assignment as the API sends and receives it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct RoleAssignmentDto {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    pub role: ObjectRef,
    pub scope: Scope,
    #[serde(default, skip_serializing)]
    pub read_only: Option<bool>,
}

/// The parts of a role needed to check scope compatibility.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Role {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub applicable_to: Vec<ScopeType>,
}

impl ApplicationRoleAssignmentModel {
    fn scope_value(&self, attribute: &str) -> &TriState<String> {
        match attribute {
            "scope_organization_id" => &self.scope_organization_id,
            "scope_environment_id" => &self.scope_environment_id,
            "scope_population_id" => &self.scope_population_id,
            _ => &self.scope_application_id,
        }
    }

    fn expand(&self, diagnostics: &mut Diagnostics) -> Option<RoleAssignmentDto> {
        let role_id = required(self.role_id.as_deref(), "role_id", diagnostics)?;
        let candidates: Vec<(&str, bool)> = SCOPE_ATTRIBUTES
            .iter()
            .map(|a| (*a, self.scope_value(a).is_known()))
            .collect();
        let attribute = match select_variant(&candidates) {
            Ok(attribute) => attribute,
            Err(diagnostic) => {
                diagnostics.push(diagnostic);
                return None;
            },
        };
        let scope_id = required(self.scope_value(attribute).as_deref(), attribute, diagnostics)?;
        Some(RoleAssignmentDto {
            id: None,
            role: ObjectRef::new(role_id),
            scope: Scope {
                id: scope_id,
                kind: ScopeType::from_attribute(attribute),
            },
            read_only: None,
        })
    }

    fn flatten(environment_id: &str, application_id: &str, assignment: RoleAssignmentDto) -> Self {
        let mut model = Self {
            id: assignment.id.into(),
            environment_id: TriState::Known(environment_id.to_string()),
            application_id: TriState::Known(application_id.to_string()),
            role_id: TriState::Known(assignment.role.id),
            read_only: assignment.read_only.into(),
            ..Default::default()
        };
        let scope_id = TriState::Known(assignment.scope.id);
        match assignment.scope.kind.attribute() {
            Some("scope_organization_id") => model.scope_organization_id = scope_id,
            Some("scope_environment_id") => model.scope_environment_id = scope_id,
            Some("scope_population_id") => model.scope_population_id = scope_id,
            Some(_) => model.scope_application_id = scope_id,
            None => {},
        }
        model
    }
}

/// Maps a 400 aimed at `scope` to the role/scope constraint error.
struct CreateRoleAssignment;

impl ErrorClassifier for CreateRoleAssignment {
    fn classify(&self, _operation: &str, failure: &ApiFailure) -> Option<Diagnostics> {
        if failure.status != Some(400) || failure.first_detail_target() != Some("scope") {
            return None;
        }
        let message = failure
            .error
            .as_ref()
            .and_then(|e| e.first_detail())
            .and_then(|d| d.message.clone())
            .unwrap_or_default();
        Some(Diagnostics::from(Diagnostic::error(INCOMPATIBLE_ROLE_SCOPE).with_detail(message)))
    }
}

fn incompatible(role_id: &str, role: &Role, scope: &ScopeType) -> Option<Diagnostic> {
    if role.applicable_to.contains(scope) {
        return None;
    }
    let allowed = role
        .applicable_to
        .iter()
        .map(ScopeType::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    Some(Diagnostic::error(INCOMPATIBLE_ROLE_SCOPE).with_detail(format!(
        "The role {} cannot be assigned with scope {}. Applicable scopes: {}.",
        role.name.as_deref().unwrap_or(role_id),
        scope,
        allowed
    )))
}

fn assignments_path(environment_id: &str, application_id: &str) -> String {
    env_path(environment_id, &format!("applications/{}/roleAssignments", application_id))
}

/// Handler for `pingone_application_role_assignment`.
pub struct ApplicationRoleAssignmentResource;

#[async_trait]
impl Resource for ApplicationRoleAssignmentResource {
    fn type_name(&self) -> &'static str {
        "pingone_application_role_assignment"
    }

    fn schema(&self) -> Schema {
        let mut schema = Schema::v0()
            .with_description("Resource to create and manage PingOne admin role assignments to applications.")
            .with_attribute("id", Attribute::id())
            .with_attribute(
                "environment_id",
                Attribute::parent_id("The ID of the environment that contains the application."),
            )
            .with_attribute(
                "application_id",
                Attribute::parent_id("The ID of an application to assign an admin role to."),
            )
            .with_attribute(
                "role_id",
                Attribute::parent_id("The ID of an admin role to assign to the application."),
            )
            .with_attribute(
                "read_only",
                Attribute::computed_bool()
                    .with_description("Whether the admin role assignment is read only or can be changed."),
            )
            .with_validator(BlockValidator::exactly_one_of(&SCOPE_ATTRIBUTES));

        for attribute in SCOPE_ATTRIBUTES {
            let kind = ScopeType::from_attribute(attribute).as_str().to_lowercase();
            schema = schema.with_attribute(
                attribute,
                Attribute::optional_string()
                    .with_description(format!("Limit the scope of the admin role assignment to the specified {} ID.", kind))
                    .with_validator(Validator::ResourceId)
                    .with_force_new(),
            );
        }
        schema
    }

    fn import_components(&self) -> Vec<ImportComponent> {
        vec![
            ImportComponent::resource_id("environment_id"),
            ImportComponent::resource_id("application_id"),
            ImportComponent::resource_id("role_assignment_id").primary(),
        ]
    }

    async fn create(&self, ctx: &RequestContext, plan: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<ApplicationRoleAssignmentModel>(plan, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let (Some(environment_id), Some(application_id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(model.application_id.as_deref(), "application_id", &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };
        let Some(assignment) = model.expand(&mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (role, call_diagnostics) = ApiCall::get("ReadOneRole", format!("/roles/{}", assignment.role.id))
            .with_retryable(&DefaultCreateRead)
            .send::<Role>(&ctx)
            .await;
        diagnostics.append(call_diagnostics);
        let Some(role) = role else {
            return ApplyResult::new(None, diagnostics);
        };
        if let Some(diagnostic) = incompatible(&assignment.role.id, &role, &assignment.scope.kind) {
            diagnostics.push(diagnostic);
            return ApplyResult::new(None, diagnostics);
        }

        let Some(request) = body(&assignment, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let (created, call_diagnostics) =
            ApiCall::post("CreateApplicationRoleAssignment", assignments_path(&environment_id, &application_id))
                .with_body(request)
                .with_classifier(&CreateRoleAssignment)
                .with_retryable(&RoleAssignment)
                .send::<RoleAssignmentDto>(&ctx)
                .await;
        diagnostics.append(call_diagnostics);

        finish(
            created.map(|a| ApplicationRoleAssignmentModel::flatten(&environment_id, &application_id, a)),
            diagnostics,
        )
    }

    async fn read(&self, ctx: &RequestContext, state: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<ApplicationRoleAssignmentModel>(state, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let (Some(environment_id), Some(application_id), Some(id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(model.application_id.as_deref(), "application_id", &mut diagnostics),
            required(model.id.as_deref(), "id", &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (assignment, call_diagnostics) = ApiCall::get(
            "ReadOneApplicationRoleAssignment",
            format!("{}/{}", assignments_path(&environment_id, &application_id), id),
        )
        .with_classifier(&NotFoundWarning)
        .with_retryable(&DefaultCreateRead)
        .send::<RoleAssignmentDto>(&ctx)
        .await;
        diagnostics.append(call_diagnostics);

        finish(
            assignment.map(|a| ApplicationRoleAssignmentModel::flatten(&environment_id, &application_id, a)),
            diagnostics,
        )
    }

    async fn update(&self, ctx: &RequestContext, _plan: &Value, prior: &Value) -> ApplyResult {
        // every configurable attribute forces replacement
        self.read(ctx, prior).await
    }

    async fn delete(&self, ctx: &RequestContext, state: &Value) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<ApplicationRoleAssignmentModel>(state, &mut diagnostics) else {
            return diagnostics;
        };
        let (Some(environment_id), Some(application_id), Some(id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(model.application_id.as_deref(), "application_id", &mut diagnostics),
            required(model.id.as_deref(), "id", &mut diagnostics),
        ) else {
            return diagnostics;
        };

        if model.read_only.known() == Some(&true) {
            diagnostics.push(
                Diagnostic::error("Cannot delete a read-only role assignment")
                    .with_detail(format!("The role assignment {} is read only and cannot be removed.", id)),
            );
            return diagnostics;
        }

        let ctx = ctx.for_environment(&environment_id);
        let (_, call_diagnostics) = ApiCall::delete(
            "DeleteApplicationRoleAssignment",
            format!("{}/{}", assignments_path(&environment_id, &application_id), id),
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
    use crate::bridge::from_state;
    use crate::client::ApiError;
    use crate::validation::validate;
    use serde_json::json;

    const ENV: &str = "9c052a8a-14be-44e4-8f07-2662569994ce";
    const APP: &str = "3b8e6a52-2b6d-4c85-9d7f-7d9d0c6b1a2e";
    const ROLE: &str = "0a3d2b4c-5e6f-4a7b-8c9d-0e1f2a3b4c5d";
    const ORG: &str = "7f6e5d4c-3b2a-4190-8f7e-6d5c4b3a2910";

    #[test]
    fn test_expand_picks_the_set_scope() {
        let model: ApplicationRoleAssignmentModel = from_state(&json!({
            "environment_id": ENV,
            "application_id": APP,
            "role_id": ROLE,
            "scope_organization_id": ORG
        }))
        .unwrap();
        let mut diagnostics = Diagnostics::new();
        let dto = model.expand(&mut diagnostics).unwrap();
        assert_eq!(
            serde_json::to_value(dto).unwrap(),
            json!({"role": {"id": ROLE}, "scope": {"id": ORG, "type": "ORGANIZATION"}})
        );
    }

    #[test]
    fn test_expand_rejects_two_scopes() {
        let model: ApplicationRoleAssignmentModel = from_state(&json!({
            "role_id": ROLE,
            "scope_organization_id": ORG,
            "scope_environment_id": ENV
        }))
        .unwrap();
        let mut diagnostics = Diagnostics::new();
        assert!(model.expand(&mut diagnostics).is_none());
        assert_eq!(diagnostics.errors().next().unwrap().summary, "Invalid variant configuration");
    }

    #[test]
    fn test_flatten_places_scope() {
        let dto: RoleAssignmentDto = serde_json::from_value(json!({
            "id": "ra1",
            "role": {"id": ROLE},
            "scope": {"id": ENV, "type": "ENVIRONMENT"},
            "readOnly": true
        }))
        .unwrap();
        let model = ApplicationRoleAssignmentModel::flatten(ENV, APP, dto);
        assert_eq!(model.scope_environment_id.as_deref(), Some(ENV));
        assert!(model.scope_organization_id.is_null());
        assert_eq!(model.read_only, TriState::Known(true));
    }

    #[test]
    fn test_incompatible_role() {
        let role = Role {
            name: Some("Identity Data Admin".to_string()),
            applicable_to: vec![ScopeType::Environment, ScopeType::Population],
        };
        let diagnostic = incompatible(ROLE, &role, &ScopeType::Organization).unwrap();
        assert_eq!(diagnostic.summary, INCOMPATIBLE_ROLE_SCOPE);
        assert!(diagnostic.detail.unwrap().contains("Identity Data Admin"));
        assert!(incompatible(ROLE, &role, &ScopeType::Population).is_none());
    }

    #[test]
    fn test_scope_target_classified() {
        let body = json!({
            "id": "e1",
            "code": "INVALID_DATA",
            "message": "The request could not be completed.",
            "details": [{"code": "INVALID_VALUE", "target": "scope", "message": "Invalid scope"}]
        })
        .to_string();
        let failure = ApiFailure::http(400, body.clone(), ApiError::parse(&body), None);
        let diagnostics = CreateRoleAssignment.classify("CreateApplicationRoleAssignment", &failure).unwrap();
        assert_eq!(diagnostics.errors().next().unwrap().summary, INCOMPATIBLE_ROLE_SCOPE);
    }

    #[test]
    fn test_exactly_one_scope_validated() {
        let schema = ApplicationRoleAssignmentResource.schema();
        let config = json!({"environment_id": ENV, "application_id": APP, "role_id": ROLE});
        assert!(!validate(&schema, &config).is_empty());

        let config = json!({"environment_id": ENV, "application_id": APP, "role_id": ROLE, "scope_population_id": ORG});
        assert!(validate(&schema, &config).is_empty());
    }
}
