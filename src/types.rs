//! Result types exchanged with the IaC engine.

use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;

/// Placeholder shown in place of sensitive values in change lists.
pub const SENSITIVE_PLACEHOLDER: &str = "(sensitive value)";

/// One attribute whose planned value differs from the prior state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// Dotted path, e.g. `oidc_options.redirect_uris`.
    pub path: String,
    /// The value before the change (None if creating).
    pub before: Option<serde_json::Value>,
    /// The value after the change (None if deleting).
    pub after: Option<serde_json::Value>,
}

impl AttributeChange {
    /// A change from `before` to `after` at `path`.
    pub fn new(
        path: impl Into<String>,
        before: Option<serde_json::Value>,
        after: Option<serde_json::Value>,
    ) -> Self {
        Self {
            path: path.into(),
            before,
            after,
        }
    }

    /// Attribute absent before.
    pub fn added(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(path, None, Some(value))
    }

    /// Attribute cleared by the plan.
    pub fn removed(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(path, Some(value), None)
    }

    /// Attribute set on both sides with different values.
    pub fn modified(
        path: impl Into<String>,
        before: serde_json::Value,
        after: serde_json::Value,
    ) -> Self {
        Self::new(path, Some(before), Some(after))
    }

    /// Replace both sides with [`SENSITIVE_PLACEHOLDER`].
    pub fn redacted(mut self) -> Self {
        let placeholder = || serde_json::Value::String(SENSITIVE_PLACEHOLDER.to_string());
        self.before = self.before.map(|_| placeholder());
        self.after = self.after.map(|_| placeholder());
        self
    }
}

/// Planned state plus what changed and whether the object must be re-created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// State the engine should pass to create or update.
    pub planned_state: serde_json::Value,
    /// Attribute level differences, in schema order.
    pub changes: Vec<AttributeChange>,
    /// The object is destroyed and created again.
    pub requires_replace: bool,
    /// Attribute paths whose change forces the replacement.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replace_paths: Vec<String>,
    /// Diagnostics raised while planning.
    #[serde(default, skip_serializing_if = "Diagnostics::is_empty")]
    pub diagnostics: Diagnostics,
}

impl PlanResult {
    /// Prior state carried forward unchanged.
    pub fn no_change(state: serde_json::Value) -> Self {
        Self {
            planned_state: state,
            changes: Vec::new(),
            requires_replace: false,
            replace_paths: Vec::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// A plan with the given differences.
    pub fn with_changes(
        planned_state: serde_json::Value,
        changes: Vec<AttributeChange>,
        requires_replace: bool,
    ) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace,
            replace_paths: Vec::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// A plan that could not be computed.
    pub fn failed(diagnostics: Diagnostics) -> Self {
        Self {
            planned_state: serde_json::Value::Null,
            changes: Vec::new(),
            requires_replace: false,
            replace_paths: Vec::new(),
            diagnostics,
        }
    }
}

/// The outcome of a create, read, update, or data source read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplyResult {
    /// The new state; `None` means no object is tracked (failed create or drift).
    pub state: Option<serde_json::Value>,
    /// Diagnostics raised by the operation.
    #[serde(default)]
    pub diagnostics: Diagnostics,
}

impl ApplyResult {
    /// A result carrying a state and diagnostics.
    pub fn new(state: Option<serde_json::Value>, diagnostics: Diagnostics) -> Self {
        Self { state, diagnostics }
    }

    /// Whether the object was found to be gone.
    pub fn is_gone(&self) -> bool {
        self.state.is_none() && !self.diagnostics.has_error()
    }
}

/// An imported resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// The resource type.
    pub resource_type: String,
    /// The imported state.
    pub state: serde_json::Value,
}

impl ImportedResource {
    /// Wrap a state read back from the API.
    pub fn new(resource_type: impl Into<String>, state: serde_json::Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

/// The outcome of an import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    /// Imported objects, empty on failure.
    pub resources: Vec<ImportedResource>,
    /// Diagnostics raised by the import.
    #[serde(default)]
    pub diagnostics: Diagnostics,
}

/// Provider metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// Managed object type names.
    pub resources: Vec<String>,
    /// Data source type names.
    pub data_sources: Vec<String>,
}
