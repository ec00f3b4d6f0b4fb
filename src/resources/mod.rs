//! Managed object handlers.
//!
//! Each handler implements [`Resource`]: a versioned schema, optional dynamic
//! validation and plan hooks, and the CRUD calls against the management API.
//! Handlers never fail outright; every step appends to [`Diagnostics`] and
//! the handler returns early once an error is recorded.

pub mod application;
pub mod application_flow_policy_assignment;
pub mod application_role_assignment;
pub mod application_secret;
pub mod group;
pub mod identity_provider;
pub mod password_policy;
pub mod population;
pub mod population_default_identity_provider;
pub mod resource;
pub mod resource_scope;
pub mod schema_attribute;
pub mod user;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::bridge::{FromValue, IntoValue};
use crate::client::RequestContext;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::import::{parse_import_id, ImportComponent};
use crate::plan::ProposedPlan;
use crate::schema::{Attribute, Block, NestedBlock, Schema, Validator};
use crate::types::ApplyResult;
use crate::value::TriState;

/// A managed object type.
#[async_trait]
pub trait Resource: Send + Sync {
    /// The resource type name, such as `pingone_group`.
    fn type_name(&self) -> &'static str;

    /// The current schema.
    fn schema(&self) -> Schema;

    /// Components of the import identifier, in order.
    fn import_components(&self) -> Vec<ImportComponent>;

    /// Checks that need more than one attribute or a computed rule.
    fn validate(&self, config: &Value) -> Diagnostics {
        let _ = config;
        Diagnostics::new()
    }

    /// Adjust a proposed plan, typically by adding replace paths.
    fn modify_plan(&self, prior: Option<&Value>, config: &Value, plan: &mut ProposedPlan, diagnostics: &mut Diagnostics) {
        let _ = (prior, config, plan, diagnostics);
    }

    /// Migrate a state written by schema `version`.
    fn upgrade_state(&self, version: u64, state: Value) -> Result<Value, Diagnostic> {
        let current = self.schema().version;
        if version == current {
            return Ok(state);
        }
        Err(Diagnostic::error("Unable to upgrade resource state").with_detail(format!(
            "{} has no upgrade from schema version {} to {}.",
            self.type_name(),
            version,
            current
        )))
    }

    /// Create the object described by `plan`.
    async fn create(&self, ctx: &RequestContext, plan: &Value) -> ApplyResult;

    /// Refresh `state`; a `None` state without errors means the object is gone.
    async fn read(&self, ctx: &RequestContext, state: &Value) -> ApplyResult;

    /// Bring the object from `prior` to `plan`.
    async fn update(&self, ctx: &RequestContext, plan: &Value, prior: &Value) -> ApplyResult;

    /// Delete the object.
    async fn delete(&self, ctx: &RequestContext, state: &Value) -> Diagnostics;

    /// Import by composite identifier, then read.
    async fn import(&self, ctx: &RequestContext, id: &str) -> ApplyResult {
        match parse_import_id(id, &self.import_components()) {
            Ok(seed) => self.read(ctx, &Value::Object(seed)).await,
            Err(diagnostic) => ApplyResult::new(None, Diagnostics::from(diagnostic)),
        }
    }
}

/// Every managed object type.
pub fn all() -> Vec<Arc<dyn Resource>> {
    vec![
        Arc::new(application::ApplicationResource),
        Arc::new(application_flow_policy_assignment::ApplicationFlowPolicyAssignmentResource),
        Arc::new(application_role_assignment::ApplicationRoleAssignmentResource),
        Arc::new(application_secret::ApplicationSecretResource),
        Arc::new(group::GroupResource),
        Arc::new(identity_provider::IdentityProviderResource),
        Arc::new(password_policy::PasswordPolicyResource),
        Arc::new(population::PopulationResource),
        Arc::new(population_default_identity_provider::PopulationDefaultIdentityProviderResource),
        Arc::new(resource::ResourceResource),
        Arc::new(resource_scope::ResourceScopeResource),
        Arc::new(schema_attribute::SchemaAttributeResource),
        Arc::new(user::UserResource),
    ]
}

/// A `{"id": ...}` reference to another object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Referenced id.
    pub id: String,
}

impl ObjectRef {
    /// A reference to `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

crate::state_model! {
    /// An uploaded image.
    pub struct IconModel {
        id: TriState<String>,
        href: TriState<String>,
    }
}

/// An icon on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Icon {
    /// Image id.
    pub id: String,
    /// Image URL.
    pub href: String,
}

pub(crate) fn expand_icon(icon: &TriState<IconModel>) -> Option<Icon> {
    let icon = icon.known()?;
    Some(Icon {
        id: icon.id.cloned_known()?,
        href: icon.href.cloned_known()?,
    })
}

pub(crate) fn flatten_icon(icon: Option<Icon>) -> TriState<IconModel> {
    icon.map(|i| IconModel {
        id: TriState::Known(i.id),
        href: TriState::Known(i.href),
    })
    .into()
}

/// Schema of an `icon {id, href}` block.
pub(crate) fn icon_block() -> NestedBlock {
    NestedBlock::single(
        Block::new()
            .with_attribute("id", Attribute::required_string().with_validator(Validator::ResourceId))
            .with_attribute("href", Attribute::required_string().with_validator(Validator::Url)),
    )
}

/// Decode a plan or state into `T`, recording conversion failures.
pub(crate) fn decode<T: FromValue>(value: &Value, diagnostics: &mut Diagnostics) -> Option<T> {
    match T::from_value(value, "") {
        Ok(model) => Some(model),
        Err(diagnostic) => {
            diagnostics.push(diagnostic);
            None
        },
    }
}

/// Serialize a request body.
pub(crate) fn body<T: Serialize>(dto: &T, diagnostics: &mut Diagnostics) -> Option<Value> {
    match serde_json::to_value(dto) {
        Ok(value) => Some(value),
        Err(e) => {
            diagnostics.add_error("Unable to build request", e.to_string());
            None
        },
    }
}

/// Wrap a flattened model and the accumulated diagnostics.
pub(crate) fn finish<T: IntoValue>(model: Option<T>, diagnostics: Diagnostics) -> ApplyResult {
    ApplyResult::new(model.map(IntoValue::into_value), diagnostics)
}

/// A required string from a plan, or a data-shape error naming `attribute`.
pub(crate) fn required(value: Option<&str>, attribute: &str, diagnostics: &mut Diagnostics) -> Option<String> {
    match value {
        Some(v) => Some(v.to_string()),
        None => {
            diagnostics.push(
                Diagnostic::error("Missing required value")
                    .with_detail(format!("The attribute {} must be known before apply.", attribute))
                    .with_attribute(attribute),
            );
            None
        },
    }
}

/// Replace a single-element list at `key` with its element, or null when empty.
///
/// Older schema versions stored single nested blocks as lists.
pub(crate) fn unwrap_single(state: &mut Map<String, Value>, key: &str) {
    if let Some(Value::Array(items)) = state.get_mut(key) {
        let first = if items.is_empty() { Value::Null } else { items.swap_remove(0) };
        state.insert(key.to_string(), first);
    }
}

/// Path below an environment.
pub(crate) fn env_path(environment_id: &str, rest: &str) -> String {
    format!("/environments/{}/{}", environment_id, rest)
}

/// `collection?filter=<attribute> eq "<value>"`, with the value quoted and the
/// whole filter form-encoded.
pub(crate) fn filter_eq(collection: &str, attribute: &str, value: &str) -> String {
    let quoted = value.replace('\\', "\\\\").replace('"', "\\\"");
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("filter", &format!("{} eq \"{}\"", attribute, quoted))
        .finish();
    format!("{}?{}", collection, query)
}
