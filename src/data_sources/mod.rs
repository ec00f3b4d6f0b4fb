//! Read-only lookups.
//!
//! A data source reads one object by id or by name and returns its attributes
//! as state. Lookups by name walk the HAL collection (`_embedded.<key>`),
//! following `_links.next` until a match is found.

pub mod application;
pub mod application_secret;
pub mod group;
pub mod population;
pub mod role;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::error;

use crate::client::{ApiCall, DefaultCreateRead, RequestContext};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::schema::{Attribute, Validator};
use crate::types::ApplyResult;

/// A read-only object type.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// The data source type name, such as `pingone_group`.
    fn type_name(&self) -> &'static str;

    /// The schema; lookup keys are optional, outputs computed.
    fn schema(&self) -> crate::schema::Schema;

    /// Checks beyond the schema.
    fn validate(&self, config: &Value) -> Diagnostics {
        let _ = config;
        Diagnostics::new()
    }

    /// Look up the object described by `config`.
    async fn read(&self, ctx: &RequestContext, config: &Value) -> ApplyResult;
}

/// Every data source type.
pub fn all() -> Vec<Arc<dyn DataSource>> {
    vec![
        Arc::new(application::ApplicationDataSource),
        Arc::new(application_secret::ApplicationSecretDataSource),
        Arc::new(group::GroupDataSource),
        Arc::new(population::PopulationDataSource),
        Arc::new(role::RoleDataSource),
    ]
}

#[derive(Debug, Default, Deserialize)]
struct Href {
    href: String,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    #[serde(default)]
    next: Option<Href>,
}

/// One page of a HAL collection.
#[derive(Debug, Default, Deserialize)]
struct Page {
    #[serde(default, rename = "_embedded")]
    embedded: Map<String, Value>,
    #[serde(default, rename = "_links")]
    links: Links,
}

/// Walk the collection at `path` and return the first `T` under
/// `_embedded.<key>` accepted by `matches`.
///
/// A missing match is `(None, no errors)`; callers decide how to report it.
pub(crate) async fn find_in_collection<T, F>(
    ctx: &RequestContext,
    operation: &str,
    path: String,
    key: &str,
    matches: F,
) -> (Option<T>, Diagnostics)
where
    T: DeserializeOwned,
    F: Fn(&T) -> bool,
{
    let mut diagnostics = Diagnostics::new();
    let mut next = Some(path);

    while let Some(path) = next.take() {
        let (page, call_diagnostics) = ApiCall::get(operation, path)
            .with_retryable(&DefaultCreateRead)
            .send::<Page>(ctx)
            .await;
        diagnostics.append(call_diagnostics);
        let Some(mut page) = page else {
            return (None, diagnostics);
        };

        if let Some(Value::Array(items)) = page.embedded.remove(key) {
            for item in items {
                match serde_json::from_value::<T>(item) {
                    Ok(found) if matches(&found) => return (Some(found), diagnostics),
                    Ok(_) => {},
                    Err(e) => {
                        error!(operation, error = %e, "Unable to parse collection item");
                        diagnostics.add_error("Unable to parse response", e.to_string());
                        return (None, diagnostics);
                    },
                }
            }
        }

        next = page
            .links
            .next
            .and_then(|link| relative_to(ctx.client().api_base(), &link.href));
    }

    (None, diagnostics)
}

/// A `_links` href as a path below the API base, if it points there.
fn relative_to(api_base: &str, href: &str) -> Option<String> {
    href.strip_prefix(api_base)
        .filter(|rest| rest.starts_with('/'))
        .map(str::to_string)
}

/// The error for a name lookup that matched nothing.
pub(crate) fn not_found_by_name(object: &str, name: &str, scope: &str) -> Diagnostic {
    Diagnostic::error(format!("Cannot find {} from name", object))
        .with_detail(format!("The {} {} cannot be found in {}.", object, name, scope))
        .with_attribute("name")
}

/// An optional lookup id that is also computed from the result.
pub(crate) fn lookup_id(description: &str) -> Attribute {
    Attribute::optional_computed_string()
        .with_description(description)
        .with_validator(Validator::ResourceId)
}

/// Copy the object's `id` into the data source's own lookup key.
pub(crate) fn with_lookup_id(mut state: Value, key: &str) -> Value {
    if let Value::Object(map) = &mut state {
        let id = map.get("id").cloned().unwrap_or(Value::Null);
        map.insert(key.to_string(), id);
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_registry_names_are_unique() {
        let names: Vec<&str> = all().iter().map(|d| d.type_name()).collect();
        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(names.len(), unique.len());
    }

    #[test]
    fn test_relative_to() {
        let base = "https://api.pingone.eu/v1";
        assert_eq!(
            relative_to(base, "https://api.pingone.eu/v1/environments/e/groups?cursor=2"),
            Some("/environments/e/groups?cursor=2".to_string())
        );
        assert_eq!(relative_to(base, "https://elsewhere.example/v1/groups"), None);
    }

    #[test]
    fn test_with_lookup_id() {
        let state = with_lookup_id(json!({"id": "g1", "name": "admins"}), "group_id");
        assert_eq!(state["group_id"], "g1");
    }

    #[test]
    fn test_not_found_by_name() {
        let diagnostic = not_found_by_name("group", "admins", "environment e1");
        assert_eq!(diagnostic.summary, "Cannot find group from name");
        assert_eq!(diagnostic.attribute.as_deref(), Some("name"));
    }
}
