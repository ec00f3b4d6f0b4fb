//! Composite import identifiers.
//!
//! Managed objects that live under a parent are imported with a slash-joined
//! identifier such as `<environment_id>/<group_id>`. Each handler declares its
//! components with [`ImportComponent`]; [`parse_import_id`] checks the shape
//! and produces the seed state the first read starts from.

use regex::Regex;
use serde_json::{Map, Value};

use crate::diagnostics::Diagnostic;
use crate::verify::{P1_DV_RESOURCE_ID, P1_RESOURCE_ID};

/// Summary of the diagnostic raised for a malformed import identifier.
pub const UNEXPECTED_IMPORT_IDENTIFIER: &str = "Unexpected Import Identifier";

/// One slash-separated part of an import identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportComponent {
    /// State attribute the part is written to.
    pub label: String,
    /// Unanchored pattern the part must match.
    pub regexp: String,
    /// Whether the part is the object's own identifier.
    pub primary_id: bool,
}

impl ImportComponent {
    /// A component matching a PingOne resource identifier.
    pub fn resource_id(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            regexp: P1_RESOURCE_ID.to_string(),
            primary_id: false,
        }
    }

    /// A component matching a DaVinci resource identifier.
    pub fn davinci_id(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            regexp: P1_DV_RESOURCE_ID.to_string(),
            primary_id: false,
        }
    }

    /// A component matching any non-empty value without a slash.
    pub fn any(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            regexp: "[^/]+".to_string(),
            primary_id: false,
        }
    }

    /// Mark this component as the object's own identifier.
    pub fn primary(mut self) -> Self {
        self.primary_id = true;
        self
    }
}

/// Split `id` into its labelled components.
///
/// The primary component is also written under `id`.
pub fn parse_import_id(id: &str, components: &[ImportComponent]) -> Result<Map<String, Value>, Diagnostic> {
    let pattern = components
        .iter()
        .map(|c| format!("({})", c.regexp))
        .collect::<Vec<_>>()
        .join(r"\/");

    let matches = Regex::new(&format!("^{}$", pattern))
        .map(|re| re.is_match(id))
        .unwrap_or(false);

    let parts: Vec<&str> = id.split('/').collect();
    if !matches || parts.len() != components.len() {
        return Err(invalid_import_id(id, components));
    }

    let mut seed = Map::new();
    for (component, part) in components.iter().zip(parts) {
        seed.insert(component.label.clone(), Value::String(part.to_string()));
        if component.primary_id {
            seed.insert("id".to_string(), Value::String(part.to_string()));
        }
    }
    Ok(seed)
}

/// Join component values from `state` back into an import identifier.
pub fn format_import_id(state: &Value, components: &[ImportComponent]) -> Option<String> {
    components
        .iter()
        .map(|c| state.get(&c.label).and_then(Value::as_str).map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .map(|parts| parts.join("/"))
}

/// The expected identifier template, such as `environment_id/group_id`.
pub fn import_template(components: &[ImportComponent]) -> String {
    components
        .iter()
        .map(|c| c.label.as_str())
        .collect::<Vec<_>>()
        .join("/")
}

fn invalid_import_id(id: &str, components: &[ImportComponent]) -> Diagnostic {
    Diagnostic::error(UNEXPECTED_IMPORT_IDENTIFIER).with_detail(format!(
        "Invalid import ID specified (\"{}\"). The ID should be in the format \"{}\".",
        id,
        import_template(components)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ENV: &str = "9c052a8a-14be-44e4-8f07-2662569994ce";
    const GROUP: &str = "2c5a4b1e-7f38-4a0b-9f41-0c2b9d7e61aa";

    fn group_components() -> Vec<ImportComponent> {
        vec![
            ImportComponent::resource_id("environment_id"),
            ImportComponent::resource_id("group_id").primary(),
        ]
    }

    #[test]
    fn test_parse_valid_id() {
        let seed = parse_import_id(&format!("{}/{}", ENV, GROUP), &group_components()).unwrap();
        assert_eq!(seed["environment_id"], json!(ENV));
        assert_eq!(seed["group_id"], json!(GROUP));
        assert_eq!(seed["id"], json!(GROUP));
    }

    #[test]
    fn test_parse_wrong_part_count() {
        let err = parse_import_id(ENV, &group_components()).unwrap_err();
        assert_eq!(err.summary, UNEXPECTED_IMPORT_IDENTIFIER);

        let too_many = format!("{}/{}/{}", ENV, GROUP, GROUP);
        assert!(parse_import_id(&too_many, &group_components()).is_err());
    }

    #[test]
    fn test_parse_bad_component() {
        let err = parse_import_id("abc/def", &group_components()).unwrap_err();
        assert_eq!(err.summary, "Unexpected Import Identifier");
        assert_eq!(
            err.detail.as_deref(),
            Some(
                "Invalid import ID specified (\"abc/def\"). The ID should be in the format \"environment_id/group_id\"."
            )
        );
    }

    #[test]
    fn test_empty_part_is_rejected() {
        let components = vec![ImportComponent::resource_id("environment_id"), ImportComponent::any("name").primary()];
        assert!(parse_import_id(&format!("{}/", ENV), &components).is_err());
        assert!(parse_import_id(&format!("{}/my-attr", ENV), &components).is_ok());
    }

    #[test]
    fn test_davinci_component() {
        let components = vec![
            ImportComponent::resource_id("environment_id"),
            ImportComponent::davinci_id("flow_id").primary(),
        ];
        let id = format!("{}/c7062a8857740ae2d6b1a9d5b1a3c2a1", ENV);
        assert!(parse_import_id(&id, &components).is_ok());
        assert!(parse_import_id(&format!("{}/{}", ENV, GROUP), &components).is_err());
    }

    #[test]
    fn test_format_round_trip() {
        let id = format!("{}/{}", ENV, GROUP);
        let seed = Value::Object(parse_import_id(&id, &group_components()).unwrap());
        assert_eq!(format_import_id(&seed, &group_components()), Some(id));

        assert_eq!(format_import_id(&json!({"environment_id": ENV}), &group_components()), None);
    }
}
