//! `pingone_user`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{body, decode, env_path, finish, required, ObjectRef, Resource};
use crate::client::{ApiCall, DefaultCreateRead, NotFoundWarning, RequestContext, Retryable};
use crate::diagnostics::Diagnostics;
use crate::import::ImportComponent;
use crate::schema::{Attribute, Schema, Validator};
use crate::state_model;
use crate::types::ApplyResult;
use crate::value::TriState;

const ENABLED: &str = "ENABLED";
const DISABLED: &str = "DISABLED";

state_model! {
    /// State of a user.
    pub struct UserModel {
        id: TriState<String>,
        environment_id: TriState<String>,
        username: TriState<String>,
        email: TriState<String>,
        population_id: TriState<String>,
        status: TriState<String>,
    }
}

/// A user as the API sends and receives it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct User {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population: Option<ObjectRef>,
    #[serde(default, skip_serializing)]
    pub enabled: Option<bool>,
}

impl UserModel {
    fn expand(&self, diagnostics: &mut Diagnostics) -> Option<User> {
        let username = required(self.username.as_deref(), "username", diagnostics);
        let email = required(self.email.as_deref(), "email", diagnostics);
        let population = required(self.population_id.as_deref(), "population_id", diagnostics);
        Some(User {
            username: username?,
            email: email?,
            population: Some(ObjectRef::new(population?)),
            ..Default::default()
        })
    }

    fn enabled(&self) -> bool {
        self.status.as_deref() != Some(DISABLED)
    }

    fn flatten(environment_id: &str, user: User) -> Self {
        let status = if user.enabled.unwrap_or(true) { ENABLED } else { DISABLED };
        Self {
            id: user.id.into(),
            environment_id: TriState::Known(environment_id.to_string()),
            username: TriState::Known(user.username),
            email: TriState::Known(user.email),
            population_id: user.population.map(|p| p.id).into(),
            status: TriState::Known(status.to_string()),
        }
    }
}

fn seed(environment_id: &str, id: &str) -> Value {
    json!({"environment_id": environment_id, "id": id})
}

/// Handler for `pingone_user`.
pub struct UserResource;

impl UserResource {
    async fn set_enabled(&self, ctx: &RequestContext, environment_id: &str, id: &str, enabled: bool) -> Diagnostics {
        let (_, diagnostics) =
            ApiCall::put("UpdateUserEnabled", env_path(environment_id, &format!("users/{}/enabled", id)))
                .with_body(json!({"enabled": enabled}))
                .send::<Value>(ctx)
                .await;
        diagnostics
    }

    async fn fetch(
        &self,
        ctx: &RequestContext,
        environment_id: &str,
        id: &str,
        retryable: Option<&dyn Retryable>,
    ) -> ApplyResult {
        let mut call = ApiCall::get("ReadUser", env_path(environment_id, &format!("users/{}", id)))
            .with_classifier(&NotFoundWarning);
        if let Some(retryable) = retryable {
            call = call.with_retryable(retryable);
        }
        let (user, diagnostics) = call.send::<User>(ctx).await;
        finish(user.map(|u| UserModel::flatten(environment_id, u)), diagnostics)
    }
}

#[async_trait]
impl Resource for UserResource {
    fn type_name(&self) -> &'static str {
        "pingone_user"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Resource to create and manage PingOne users.")
            .with_attribute("id", Attribute::id())
            .with_attribute(
                "environment_id",
                Attribute::parent_id("The ID of the environment to create the user in."),
            )
            .with_attribute(
                "username",
                Attribute::required_string()
                    .with_description("The username of the user.")
                    .with_validator(Validator::LengthBetween { min: 1, max: 128 }),
            )
            .with_attribute(
                "email",
                Attribute::required_string()
                    .with_description("The email address of the user.")
                    .with_validator(Validator::LengthAtLeast(1)),
            )
            .with_attribute(
                "population_id",
                Attribute::required_string()
                    .with_description("The population ID to add the user to.")
                    .with_validator(Validator::ResourceId),
            )
            .with_attribute(
                "status",
                Attribute::optional_string()
                    .with_description("The enabled status of the user.")
                    .with_default(json!(ENABLED))
                    .with_validator(Validator::one_of(&[ENABLED, DISABLED])),
            )
    }

    fn import_components(&self) -> Vec<ImportComponent> {
        vec![
            ImportComponent::resource_id("environment_id"),
            ImportComponent::resource_id("user_id").primary(),
        ]
    }

    async fn create(&self, ctx: &RequestContext, plan: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<UserModel>(plan, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let Some(environment_id) = required(model.environment_id.as_deref(), "environment_id", &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let Some(request) = model.expand(&mut diagnostics).and_then(|u| body(&u, &mut diagnostics)) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (created, call_diagnostics) = ApiCall::post("CreateUser", env_path(&environment_id, "users"))
            .with_body(request)
            .with_retryable(&DefaultCreateRead)
            .send::<User>(&ctx)
            .await;
        diagnostics.append(call_diagnostics);
        let Some((id, created)) = created.and_then(|u| Some((u.id.clone()?, u))) else {
            return ApplyResult::new(None, diagnostics);
        };

        diagnostics.append(self.set_enabled(&ctx, &environment_id, &id, model.enabled()).await);
        if diagnostics.has_error() {
            // the user exists, so hand back what the server created
            return finish(Some(UserModel::flatten(&environment_id, created)), diagnostics);
        }

        let mut result = self.read(&ctx, &seed(&environment_id, &id)).await;
        diagnostics.append(result.diagnostics);
        result.diagnostics = diagnostics;
        result
    }

    async fn read(&self, ctx: &RequestContext, state: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<UserModel>(state, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let (Some(environment_id), Some(id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(model.id.as_deref(), "id", &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let mut result = self.fetch(&ctx, &environment_id, &id, Some(&DefaultCreateRead)).await;
        diagnostics.append(result.diagnostics);
        result.diagnostics = diagnostics;
        result
    }

    async fn update(&self, ctx: &RequestContext, plan: &Value, prior: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let (Some(model), Some(prior)) = (
            decode::<UserModel>(plan, &mut diagnostics),
            decode::<UserModel>(prior, &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };
        let (Some(environment_id), Some(id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(prior.id.as_deref(), "id", &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };
        let Some(request) = model.expand(&mut diagnostics).and_then(|u| body(&u, &mut diagnostics)) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (_, call_diagnostics) = ApiCall::put("UpdateUserPut", env_path(&environment_id, &format!("users/{}", id)))
            .with_body(request)
            .send::<Value>(&ctx)
            .await;
        diagnostics.append(call_diagnostics);
        if diagnostics.has_error() {
            return ApplyResult::new(None, diagnostics);
        }

        // written on every update, not only when the planned status changed
        diagnostics.append(self.set_enabled(&ctx, &environment_id, &id, model.enabled()).await);
        if diagnostics.has_error() {
            return ApplyResult::new(None, diagnostics);
        }

        let mut result = self.fetch(&ctx, &environment_id, &id, None).await;
        diagnostics.append(result.diagnostics);
        result.diagnostics = diagnostics;
        result
    }

    async fn delete(&self, ctx: &RequestContext, state: &Value) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<UserModel>(state, &mut diagnostics) else {
            return diagnostics;
        };
        let (Some(environment_id), Some(id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(model.id.as_deref(), "id", &mut diagnostics),
        ) else {
            return diagnostics;
        };

        let ctx = ctx.for_environment(&environment_id);
        let (_, call_diagnostics) = ApiCall::delete("DeleteUser", env_path(&environment_id, &format!("users/{}", id)))
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
    use crate::bridge::IntoValue;

    #[test]
    fn test_status_maps_to_enabled_flag() {
        let user: User = serde_json::from_value(json!({
            "id": "u1",
            "username": "jdoe",
            "email": "jdoe@example.com",
            "population": {"id": "p1"},
            "enabled": false
        }))
        .unwrap();
        let model = UserModel::flatten("env", user);
        assert_eq!(model.status.as_deref(), Some(DISABLED));
        assert!(!model.enabled());

        let state = model.into_value();
        assert_eq!(state["population_id"], json!("p1"));
    }

    #[test]
    fn test_expand_reports_every_missing_field() {
        let model = UserModel {
            username: TriState::Known("jdoe".to_string()),
            ..Default::default()
        };
        let mut diagnostics = Diagnostics::new();
        assert!(model.expand(&mut diagnostics).is_none());
        assert_eq!(diagnostics.errors().count(), 2);
    }

    #[test]
    fn test_request_body_excludes_enabled() {
        let model = UserModel {
            username: TriState::Known("jdoe".to_string()),
            email: TriState::Known("jdoe@example.com".to_string()),
            population_id: TriState::Known("p1".to_string()),
            status: TriState::Known(DISABLED.to_string()),
            ..Default::default()
        };
        let mut diagnostics = Diagnostics::new();
        let request = serde_json::to_value(model.expand(&mut diagnostics).unwrap()).unwrap();
        assert_eq!(
            request,
            json!({"username": "jdoe", "email": "jdoe@example.com", "population": {"id": "p1"}})
        );
    }
}
