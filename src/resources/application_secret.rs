//! `pingone_application_secret`.
//!
//! The secret belongs to its application: creating this object regenerates
//! it, and deleting it only forgets it. `regenerate_trigger_values` lets a
//! configuration rotate the secret by changing one of its values.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::debug;

use super::{body, decode, env_path, finish, required, Resource};
use crate::client::{ApiCall, DefaultCreateRead, NotFoundWarning, RequestContext, Retryable};
use crate::diagnostics::Diagnostics;
use crate::import::ImportComponent;
use crate::plan::ProposedPlan;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Block, NestedBlock, PlanModifier, Schema, Validator};
use crate::state_model;
use crate::types::ApplyResult;
use crate::value::{self, TriState};

const TRIGGER_VALUES: &str = "regenerate_trigger_values";

state_model! {
    /// The previous secret while it is still valid.
    pub struct PreviousSecretModel {
        secret: TriState<String>,
        expires_at: TriState<String>,
        last_used: TriState<String>,
    }
}

state_model! {
    /// State of an application secret.
    pub struct ApplicationSecretModel {
        id: TriState<String>,
        environment_id: TriState<String>,
        application_id: TriState<String>,
        secret: TriState<String>,
        previous: TriState<PreviousSecretModel>,
        regenerate_trigger_values: TriState<BTreeMap<String, String>>,
    }
}

/// The previous secret on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct PreviousSecret {
    #[serde(default, skip_serializing)]
    pub secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(default, skip_serializing)]
    pub last_used: Option<String>,
}

/// An application secret as the API sends and receives it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct ApplicationSecret {
    #[serde(default, skip_serializing)]
    pub secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<PreviousSecret>,
}

impl ApplicationSecretModel {
    fn configured_expiry(&self) -> Option<String> {
        self.previous.known().and_then(|p| p.expires_at.cloned_known())
    }

    fn expand(&self) -> ApplicationSecret {
        ApplicationSecret {
            secret: None,
            previous: self.configured_expiry().map(|expires_at| PreviousSecret {
                expires_at: Some(expires_at),
                ..Default::default()
            }),
        }
    }

    /// Overlay a server response; trigger values stay as configured.
    fn flatten(mut self, environment_id: &str, application_id: &str, secret: ApplicationSecret) -> Self {
        self.id = TriState::Known(application_id.to_string());
        self.environment_id = TriState::Known(environment_id.to_string());
        self.application_id = TriState::Known(application_id.to_string());
        self.secret = secret.secret.into();
        self.previous = secret
            .previous
            .map(|p| PreviousSecretModel {
                secret: p.secret.into(),
                expires_at: p.expires_at.into(),
                last_used: p.last_used.into(),
            })
            .into();
        if self.regenerate_trigger_values.is_unknown() {
            self.regenerate_trigger_values = TriState::Null;
        }
        self
    }
}

/// Whether a trigger value already in state changed or became unknown.
///
/// Added and removed keys do not count.
pub fn trigger_values_changed(prior: &Value, planned: &Value) -> bool {
    let (Some(prior), Some(planned)) = (prior.as_object(), planned.as_object()) else {
        return false;
    };
    planned.iter().any(|(key, planned_value)| match prior.get(key) {
        Some(prior_value) => value::is_unknown(planned_value) || prior_value != planned_value,
        None => false,
    })
}

fn secret_path(environment_id: &str, application_id: &str) -> String {
    env_path(environment_id, &format!("applications/{}/secret", application_id))
}

/// Handler for `pingone_application_secret`.
pub struct ApplicationSecretResource;

impl ApplicationSecretResource {
    async fn regenerate(
        &self,
        ctx: &RequestContext,
        environment_id: &str,
        application_id: &str,
        model: &ApplicationSecretModel,
        retryable: Option<&dyn Retryable>,
    ) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        let Some(request) = body(&model.expand(), &mut diagnostics) else {
            return diagnostics;
        };
        debug!(application_id, "Regenerating application secret");
        let mut call =
            ApiCall::post("UpdateApplicationSecret", secret_path(environment_id, application_id)).with_body(request);
        if let Some(retryable) = retryable {
            call = call.with_retryable(retryable);
        }
        let (_, call_diagnostics) = call.send::<Value>(ctx).await;
        diagnostics.append(call_diagnostics);
        diagnostics
    }

    async fn fetch(
        &self,
        ctx: &RequestContext,
        model: ApplicationSecretModel,
        mut diagnostics: Diagnostics,
        retryable: Option<&dyn Retryable>,
    ) -> ApplyResult {
        let (Some(environment_id), Some(application_id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(model.application_id.as_deref(), "application_id", &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let mut call = ApiCall::get("ReadApplicationSecret", secret_path(&environment_id, &application_id))
            .with_classifier(&NotFoundWarning);
        if let Some(retryable) = retryable {
            call = call.with_retryable(retryable);
        }
        let (secret, call_diagnostics) = call.send::<ApplicationSecret>(&ctx).await;
        diagnostics.append(call_diagnostics);

        finish(
            secret.map(|s| model.flatten(&environment_id, &application_id, s)),
            diagnostics,
        )
    }
}

#[async_trait]
impl Resource for ApplicationSecretResource {
    fn type_name(&self) -> &'static str {
        "pingone_application_secret"
    }

    fn schema(&self) -> Schema {
        let previous = Block::new()
            .with_description("The previous secret, when it expires, and when it was last used.")
            .with_attribute(
                "secret",
                Attribute::computed_string()
                    .with_description("The previous application secret, returned while it has not expired.")
                    .sensitive(),
            )
            .with_attribute(
                "expires_at",
                Attribute::optional_computed_string()
                    .with_description("When the previous secret stops being accepted.")
                    .with_validator(Validator::Rfc3339),
            )
            .with_attribute(
                "last_used",
                Attribute::computed_string().with_description("When the previous secret was last used."),
            );

        Schema::v0()
            .with_description("Resource to generate and read an application secret for a PingOne application.")
            .with_attribute(
                "id",
                Attribute::id().with_description("The ID of the application that owns the secret."),
            )
            .with_attribute(
                "environment_id",
                Attribute::parent_id("The ID of the environment to generate an application secret in."),
            )
            .with_attribute(
                "application_id",
                Attribute::parent_id("The ID of the application to generate the application secret for."),
            )
            .with_attribute(
                "secret",
                Attribute::computed_string()
                    .with_description("The application secret used to authenticate to the authorization server.")
                    .with_plan_modifier(PlanModifier::UseStateForUnknown)
                    .sensitive(),
            )
            .with_attribute(
                TRIGGER_VALUES,
                Attribute::new(AttributeType::map(AttributeType::String), AttributeFlags::optional()).with_description(
                    "Values that, if any existing value changes, force regeneration of the secret. Adding or removing keys does not.",
                ),
            )
            .with_block(
                "previous",
                NestedBlock::single(previous)
                    .computed()
                    .with_plan_modifier(PlanModifier::UseStateForUnknown),
            )
    }

    fn import_components(&self) -> Vec<ImportComponent> {
        vec![
            ImportComponent::resource_id("environment_id"),
            ImportComponent::resource_id("application_id").primary(),
        ]
    }

    fn modify_plan(&self, prior: Option<&Value>, _config: &Value, plan: &mut ProposedPlan, _diagnostics: &mut Diagnostics) {
        let Some(prior) = prior.filter(|p| !p.is_null()) else {
            return;
        };
        let prior_values = prior.get(TRIGGER_VALUES).unwrap_or(&Value::Null);
        let planned_values = plan.planned_state.get(TRIGGER_VALUES).unwrap_or(&Value::Null);
        if trigger_values_changed(prior_values, planned_values) {
            plan.require_replace(TRIGGER_VALUES);
        }
    }

    async fn create(&self, ctx: &RequestContext, plan: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<ApplicationSecretModel>(plan, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let (Some(environment_id), Some(application_id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(model.application_id.as_deref(), "application_id", &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };

        let scoped = ctx.for_environment(&environment_id);
        diagnostics.append(
            self.regenerate(&scoped, &environment_id, &application_id, &model, Some(&DefaultCreateRead))
                .await,
        );
        if diagnostics.has_error() {
            return ApplyResult::new(None, diagnostics);
        }
        self.fetch(ctx, model, diagnostics, Some(&DefaultCreateRead)).await
    }

    async fn read(&self, ctx: &RequestContext, state: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let Some(mut model) = decode::<ApplicationSecretModel>(state, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        // an import seed carries the application id as `id`
        if model.application_id.is_null() {
            model.application_id = model.id.clone();
        }
        self.fetch(ctx, model, diagnostics, Some(&DefaultCreateRead)).await
    }

    async fn update(&self, ctx: &RequestContext, plan: &Value, prior: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let (Some(model), Some(prior)) = (
            decode::<ApplicationSecretModel>(plan, &mut diagnostics),
            decode::<ApplicationSecretModel>(prior, &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };

        if model.configured_expiry().is_some() && model.configured_expiry() != prior.configured_expiry() {
            let (Some(environment_id), Some(application_id)) = (
                required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
                required(model.application_id.as_deref(), "application_id", &mut diagnostics),
            ) else {
                return ApplyResult::new(None, diagnostics);
            };
            let scoped = ctx.for_environment(&environment_id);
            diagnostics.append(self.regenerate(&scoped, &environment_id, &application_id, &model, None).await);
            if diagnostics.has_error() {
                return ApplyResult::new(None, diagnostics);
            }
        }
        self.fetch(ctx, model, diagnostics, None).await
    }

    async fn delete(&self, _ctx: &RequestContext, _state: &Value) -> Diagnostics {
        // the secret lives as long as its application
        Diagnostics::new()
    }
}
