//! `pingone_application_flow_policy_assignment`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{body, decode, env_path, finish, required, ObjectRef, Resource};
use crate::client::{ApiCall, DefaultCreateRead, NotFoundWarning, RequestContext};
use crate::diagnostics::Diagnostics;
use crate::import::ImportComponent;
use crate::schema::{Attribute, Schema, Validator};
use crate::state_model;
use crate::types::ApplyResult;
use crate::value::TriState;

state_model! {
    /// State of a DaVinci flow policy assignment.
    pub struct FlowPolicyAssignmentModel {
        id: TriState<String>,
        environment_id: TriState<String>,
        application_id: TriState<String>,
        flow_policy_id: TriState<String>,
        priority: TriState<i64>,
    }
}

/// A flow policy assignment as the API sends and receives it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct FlowPolicyAssignment {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    pub flow_policy: ObjectRef,
    pub priority: i64,
}

impl FlowPolicyAssignmentModel {
    fn expand(&self, diagnostics: &mut Diagnostics) -> Option<FlowPolicyAssignment> {
        let flow_policy_id = required(self.flow_policy_id.as_deref(), "flow_policy_id", diagnostics)?;
        let Some(priority) = self.priority.cloned_known() else {
            diagnostics.add_attribute_error("priority", "Missing required value", "The attribute priority must be known before apply.");
            return None;
        };
        Some(FlowPolicyAssignment {
            id: None,
            flow_policy: ObjectRef::new(flow_policy_id),
            priority,
        })
    }

    fn flatten(environment_id: &str, application_id: &str, assignment: FlowPolicyAssignment) -> Self {
        Self {
            id: assignment.id.into(),
            environment_id: TriState::Known(environment_id.to_string()),
            application_id: TriState::Known(application_id.to_string()),
            flow_policy_id: TriState::Known(assignment.flow_policy.id),
            priority: TriState::Known(assignment.priority),
        }
    }
}

fn assignments_path(environment_id: &str, application_id: &str) -> String {
    env_path(environment_id, &format!("applications/{}/flowPolicyAssignments", application_id))
}

/// Handler for `pingone_application_flow_policy_assignment`.
pub struct ApplicationFlowPolicyAssignmentResource;

#[async_trait]
impl Resource for ApplicationFlowPolicyAssignmentResource {
    fn type_name(&self) -> &'static str {
        "pingone_application_flow_policy_assignment"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Resource to create and manage a DaVinci flow policy assignment for applications.")
            .with_attribute("id", Attribute::id())
            .with_attribute(
                "environment_id",
                Attribute::parent_id("The ID of the environment that contains the application."),
            )
            .with_attribute(
                "application_id",
                Attribute::parent_id("The ID of the application to assign the flow policy to."),
            )
            .with_attribute(
                "flow_policy_id",
                Attribute::required_string()
                    .with_description("The ID of the DaVinci flow policy to assign.")
                    .with_validator(Validator::DavinciId),
            )
            .with_attribute(
                "priority",
                Attribute::required_int64()
                    .with_description("The order in which the policy is evaluated relative to other policies. Lower is evaluated first.")
                    .with_validator(Validator::IntAtLeast(1)),
            )
    }

    fn import_components(&self) -> Vec<ImportComponent> {
        vec![
            ImportComponent::resource_id("environment_id"),
            ImportComponent::resource_id("application_id"),
            ImportComponent::resource_id("flow_policy_assignment_id").primary(),
        ]
    }

    async fn create(&self, ctx: &RequestContext, plan: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<FlowPolicyAssignmentModel>(plan, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let (Some(environment_id), Some(application_id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(model.application_id.as_deref(), "application_id", &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };
        let Some(request) = model.expand(&mut diagnostics).and_then(|a| body(&a, &mut diagnostics)) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (created, call_diagnostics) =
            ApiCall::post("CreateFlowPolicyAssignment", assignments_path(&environment_id, &application_id))
                .with_body(request)
                .with_retryable(&DefaultCreateRead)
                .send::<FlowPolicyAssignment>(&ctx)
                .await;
        diagnostics.append(call_diagnostics);

        finish(
            created.map(|a| FlowPolicyAssignmentModel::flatten(&environment_id, &application_id, a)),
            diagnostics,
        )
    }

    async fn read(&self, ctx: &RequestContext, state: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<FlowPolicyAssignmentModel>(state, &mut diagnostics) else {
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
            "ReadOneFlowPolicyAssignment",
            format!("{}/{}", assignments_path(&environment_id, &application_id), id),
        )
        .with_classifier(&NotFoundWarning)
        .with_retryable(&DefaultCreateRead)
        .send::<FlowPolicyAssignment>(&ctx)
        .await;
        diagnostics.append(call_diagnostics);

        finish(
            assignment.map(|a| FlowPolicyAssignmentModel::flatten(&environment_id, &application_id, a)),
            diagnostics,
        )
    }

    async fn update(&self, ctx: &RequestContext, plan: &Value, prior: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let (Some(model), Some(prior)) = (
            decode::<FlowPolicyAssignmentModel>(plan, &mut diagnostics),
            decode::<FlowPolicyAssignmentModel>(prior, &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };
        let (Some(environment_id), Some(application_id), Some(id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(model.application_id.as_deref(), "application_id", &mut diagnostics),
            required(prior.id.as_deref(), "id", &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };
        let Some(request) = model.expand(&mut diagnostics).and_then(|a| body(&a, &mut diagnostics)) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (updated, call_diagnostics) = ApiCall::put(
            "UpdateFlowPolicyAssignment",
            format!("{}/{}", assignments_path(&environment_id, &application_id), id),
        )
        .with_body(request)
        .send::<FlowPolicyAssignment>(&ctx)
        .await;
        diagnostics.append(call_diagnostics);

        finish(
            updated.map(|a| FlowPolicyAssignmentModel::flatten(&environment_id, &application_id, a)),
            diagnostics,
        )
    }

    async fn delete(&self, ctx: &RequestContext, state: &Value) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<FlowPolicyAssignmentModel>(state, &mut diagnostics) else {
            return diagnostics;
        };
        let (Some(environment_id), Some(application_id), Some(id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(model.application_id.as_deref(), "application_id", &mut diagnostics),
            required(model.id.as_deref(), "id", &mut diagnostics),
        ) else {
            return diagnostics;
        };

        let ctx = ctx.for_environment(&environment_id);
        let (_, call_diagnostics) = ApiCall::delete(
            "DeleteFlowPolicyAssignment",
            format!("{}/{}", assignments_path(&environment_id, &application_id), id),
        )
        .with_classifier(&NotFoundWarning)
        .send::<Value>(&ctx)
        .await;
        diagnostics.append(call_diagnostics);
        diagnostics
    }
}
