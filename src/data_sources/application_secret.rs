//! `pingone_application_secret` lookup.

use async_trait::async_trait;
use serde_json::Value;

use super::DataSource;
use crate::client::{ApiCall, DefaultCreateRead, RequestContext};
use crate::diagnostics::Diagnostics;
use crate::resources::application_secret::{ApplicationSecret, PreviousSecretModel};
use crate::resources::{decode, env_path, finish, required};
use crate::schema::{Attribute, Block, NestedBlock, Schema, Validator};
use crate::state_model;
use crate::types::ApplyResult;
use crate::value::TriState;

state_model! {
    /// State of an application secret lookup.
    pub struct ApplicationSecretLookupModel {
        id: TriState<String>,
        environment_id: TriState<String>,
        application_id: TriState<String>,
        secret: TriState<String>,
        previous: TriState<PreviousSecretModel>,
    }
}

impl ApplicationSecretLookupModel {
    fn flatten(environment_id: String, application_id: String, secret: ApplicationSecret) -> Self {
        Self {
            id: TriState::Known(application_id.clone()),
            environment_id: TriState::Known(environment_id),
            application_id: TriState::Known(application_id),
            secret: secret.secret.into(),
            previous: secret
                .previous
                .map(|p| PreviousSecretModel {
                    secret: p.secret.into(),
                    expires_at: p.expires_at.into(),
                    last_used: p.last_used.into(),
                })
                .into(),
        }
    }
}

/// Reads the current secret of an application.
pub struct ApplicationSecretDataSource;

#[async_trait]
impl DataSource for ApplicationSecretDataSource {
    fn type_name(&self) -> &'static str {
        "pingone_application_secret"
    }

    fn schema(&self) -> Schema {
        let uuid = |description: &str| {
            Attribute::required_string()
                .with_description(description)
                .with_validator(Validator::ResourceId)
        };
        Schema::v0()
            .with_description("Data source to read the secret of a PingOne application.")
            .with_attribute("id", Attribute::id())
            .with_attribute(
                "environment_id",
                uuid("The ID of the environment that contains the application."),
            )
            .with_attribute("application_id", uuid("The ID of the application."))
            .with_attribute(
                "secret",
                Attribute::computed_string()
                    .with_description("The application secret.")
                    .sensitive(),
            )
            .with_block(
                "previous",
                NestedBlock::single(
                    Block::new()
                        .with_attribute("secret", Attribute::computed_string().sensitive())
                        .with_attribute("expires_at", Attribute::computed_string())
                        .with_attribute("last_used", Attribute::computed_string()),
                )
                .computed(),
            )
    }

    async fn read(&self, ctx: &RequestContext, config: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let Some(lookup) = decode::<ApplicationSecretLookupModel>(config, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let (Some(environment_id), Some(application_id)) = (
            required(lookup.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(lookup.application_id.as_deref(), "application_id", &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let path = env_path(&environment_id, &format!("applications/{}/secret", application_id));
        let (secret, call_diagnostics) = ApiCall::get("ReadApplicationSecret", path)
            .with_retryable(&DefaultCreateRead)
            .send::<ApplicationSecret>(&ctx)
            .await;
        diagnostics.append(call_diagnostics);

        finish(
            secret.map(|s| ApplicationSecretLookupModel::flatten(environment_id, application_id, s)),
            diagnostics,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::IntoValue;
    use serde_json::json;

    #[test]
    fn test_flatten_previous_secret() {
        let secret: ApplicationSecret = serde_json::from_value(json!({
            "secret": "s3cr3t",
            "previous": {"secret": "old", "expiresAt": "2026-01-01T00:00:00Z"}
        }))
        .unwrap();
        let state = ApplicationSecretLookupModel::flatten("env".into(), "app".into(), secret).into_value();
        assert_eq!(state["id"], "app");
        assert_eq!(state["secret"], "s3cr3t");
        assert_eq!(state["previous"]["secret"], "old");
        assert!(state["previous"]["last_used"].is_null());
    }

    #[test]
    fn test_secret_is_sensitive() {
        let schema = ApplicationSecretDataSource.schema();
        assert!(schema.block.attributes["secret"].flags.sensitive);
    }
}
