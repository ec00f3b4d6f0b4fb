//! `pingone_application` lookup.

use async_trait::async_trait;
use serde_json::Value;

use super::{find_in_collection, lookup_id, not_found_by_name, with_lookup_id, DataSource};
use crate::bridge::IntoValue;
use crate::client::{ApiCall, DefaultCreateRead, RequestContext};
use crate::diagnostics::Diagnostics;
use crate::resources::application::{
    external_link_options_block, oidc_options_block, saml_options_block, ApplicationDto, ApplicationModel,
};
use crate::resources::{decode, env_path, icon_block, required};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Block, BlockValidator, NestedBlock, Schema, Validator};
use crate::state_model;
use crate::types::ApplyResult;
use crate::value::TriState;

state_model! {
    /// The lookup keys of an application query.
    pub struct ApplicationLookup {
        environment_id: TriState<String>,
        application_id: TriState<String>,
        name: TriState<String>,
    }
}

fn computed_set() -> Attribute {
    Attribute::new(AttributeType::set(AttributeType::String), AttributeFlags::computed())
}

/// Reads an application by id or name.
///
/// The output carries the same option blocks as the managed resource. The
/// client secret is not part of it; use `pingone_application_secret`.
pub struct ApplicationDataSource;

#[async_trait]
impl DataSource for ApplicationDataSource {
    fn type_name(&self) -> &'static str {
        "pingone_application"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Data source to retrieve a PingOne application by its ID or name.")
            .with_attribute("id", Attribute::id())
            .with_attribute(
                "environment_id",
                Attribute::required_string()
                    .with_description("The ID of the environment that contains the application.")
                    .with_validator(Validator::ResourceId),
            )
            .with_attribute("application_id", lookup_id("The ID of the application."))
            .with_attribute(
                "name",
                Attribute::optional_computed_string().with_description("The name of the application."),
            )
            .with_attribute("description", Attribute::computed_string())
            .with_attribute("enabled", Attribute::computed_bool())
            .with_attribute("tags", computed_set())
            .with_attribute("login_page_url", Attribute::computed_string())
            .with_attribute("hidden_from_app_portal", Attribute::computed_bool())
            .with_attribute("access_control_role_type", Attribute::computed_string())
            .with_block("icon", icon_block().computed())
            .with_block(
                "access_control_group_options",
                NestedBlock::single(
                    Block::new()
                        .with_attribute("type", Attribute::computed_string())
                        .with_attribute("groups", computed_set()),
                )
                .computed(),
            )
            .with_block("oidc_options", NestedBlock::single(oidc_options_block()).computed())
            .with_block("saml_options", NestedBlock::single(saml_options_block()).computed())
            .with_block(
                "external_link_options",
                NestedBlock::single(external_link_options_block()).computed(),
            )
            .with_validator(BlockValidator::exactly_one_of(&["application_id", "name"]))
    }

    async fn read(&self, ctx: &RequestContext, config: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let Some(lookup) = decode::<ApplicationLookup>(config, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let Some(environment_id) = required(lookup.environment_id.as_deref(), "environment_id", &mut diagnostics)
        else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let application = match (lookup.application_id.as_deref(), lookup.name.as_deref()) {
            (Some(id), _) => {
                let (application, call_diagnostics) =
                    ApiCall::get("ReadOneApplication", env_path(&environment_id, &format!("applications/{}", id)))
                        .with_retryable(&DefaultCreateRead)
                        .send::<ApplicationDto>(&ctx)
                        .await;
                diagnostics.append(call_diagnostics);
                application
            },
            (None, Some(name)) => {
                let path = env_path(&environment_id, "applications");
                let (application, call_diagnostics) =
                    find_in_collection::<ApplicationDto, _>(&ctx, "ReadAllApplications", path, "applications", |a| {
                        a.name == name
                    })
                    .await;
                diagnostics.append(call_diagnostics);
                if application.is_none() && !diagnostics.has_error() {
                    let scope = format!("environment {}", environment_id);
                    diagnostics.push(not_found_by_name("application", name, &scope));
                }
                application
            },
            (None, None) => {
                diagnostics.add_error(
                    "Missing parameter",
                    "Cannot find the requested application. application_id or name must be set.",
                );
                None
            },
        };

        let state = application
            .map(|a| with_lookup_id(ApplicationModel::flatten(&environment_id, a).into_value(), "application_id"));
        ApplyResult::new(state, diagnostics)
    }
}
