//! Test harness for the provider.
//!
//! [`ProviderTester`] drives a [`ProviderService`] the way an engine would
//! and turns error diagnostics into `Err`, so a test can use `?` for the
//! happy path and inspect [`TestError::Diagnostics`] for the failures.
//!
//! # Example
//!
//! ```ignore
//! use pingone_provider::testing::{mock_config, ProviderTester};
//! use serde_json::json;
//! use wiremock::MockServer;
//!
//! #[tokio::test]
//! async fn test_create_group() {
//!     let server = MockServer::start().await;
//!     // mount mocks...
//!     let tester = ProviderTester::for_mock_server();
//!     tester.configure(mock_config(&server.uri())).await.unwrap();
//!
//!     let state = tester
//!         .lifecycle_create("pingone_group", json!({"environment_id": ENV, "name": "admins"}))
//!         .await
//!         .unwrap();
//!     assert_eq!(state["name"], "admins");
//! }
//! ```

use serde_json::{json, Value};

use crate::client::RetryPolicy;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::ProviderError;
use crate::provider::{PingOneProvider, ProviderService};
use crate::types::{ApplyResult, ImportResult, PlanResult};

/// A provider configuration pointing at a mock API on `uri`.
///
/// Uses a static access token, so no token endpoint needs mocking.
pub fn mock_config(uri: &str) -> Value {
    json!({
        "access_token": "test-token",
        "api_hostname": uri,
    })
}

/// Drives a provider through engine-style calls.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl ProviderTester<PingOneProvider> {
    /// A tester over [`PingOneProvider`] with short retry delays.
    pub fn for_mock_server() -> Self {
        Self::new(PingOneProvider::new().with_retry_policy(RetryPolicy::for_testing()))
    }
}

impl<P: ProviderService> ProviderTester<P> {
    /// Wrap a provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Configure the provider; error diagnostics fail the call.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Validate a managed object configuration.
    pub async fn validate_resource_config(&self, resource_type: &str, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_resource_config(resource_type, config).await?;
        check_diagnostics(diagnostics)
    }

    // Managed objects

    /// Plan a creation from `config`.
    pub async fn plan_create(&self, resource_type: &str, config: Value) -> Result<PlanResult, TestError> {
        self.plan(resource_type, None, config).await
    }

    /// Plan a change of an existing object.
    pub async fn plan_update(&self, resource_type: &str, prior_state: Value, config: Value) -> Result<PlanResult, TestError> {
        self.plan(resource_type, Some(prior_state), config).await
    }

    /// Plan with an explicit prior state; error diagnostics become `Err`.
    pub async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        config: Value,
    ) -> Result<PlanResult, TestError> {
        let mut plan = self.provider.plan(resource_type, prior_state, config).await?;
        check_diagnostics(std::mem::take(&mut plan.diagnostics))?;
        Ok(plan)
    }

    /// Create and return the new state.
    pub async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, TestError> {
        let result = self.provider.create(resource_type, planned_state).await?;
        require_state(result)
    }

    /// Read and return the raw result, so a test can tell "gone" from "present".
    pub async fn read(&self, resource_type: &str, current_state: Value) -> Result<ApplyResult, TestError> {
        let result = self.provider.read(resource_type, current_state).await?;
        check_diagnostics(result.diagnostics.clone())?;
        Ok(result)
    }

    /// Update and return the new state.
    pub async fn update(&self, resource_type: &str, prior_state: Value, planned_state: Value) -> Result<Value, TestError> {
        let result = self.provider.update(resource_type, prior_state, planned_state).await?;
        require_state(result)
    }

    /// Delete an object.
    pub async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.delete(resource_type, current_state).await?;
        check_diagnostics(diagnostics)
    }

    /// Import by composite identifier, returning the raw result.
    pub async fn import_resource(&self, resource_type: &str, id: &str) -> Result<ImportResult, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Read a data source and return its state.
    pub async fn read_data_source(&self, data_source_type: &str, config: Value) -> Result<Value, TestError> {
        let result = self.provider.read_data_source(data_source_type, config).await?;
        require_state(result)
    }

    // Full lifecycle

    /// Plan, then create.
    pub async fn lifecycle_create(&self, resource_type: &str, config: Value) -> Result<Value, TestError> {
        let plan = self.plan_create(resource_type, config).await?;
        self.create(resource_type, plan.planned_state).await
    }

    /// Plan against `prior_state`, then update.
    pub async fn lifecycle_update(&self, resource_type: &str, prior_state: Value, config: Value) -> Result<Value, TestError> {
        let plan = self.plan_update(resource_type, prior_state.clone(), config).await?;
        if plan.requires_replace {
            return Err(TestError::Diagnostics(vec![Diagnostic::error("Plan requires replacement")
                .with_detail(format!("Replace paths: {:?}", plan.replace_paths))]));
        }
        self.update(resource_type, prior_state, plan.planned_state).await
    }
}

/// Failure of a tester call.
#[derive(Debug)]
pub enum TestError {
    /// The operation returned error diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation succeeded without producing state.
    NoState,
    /// The provider could not service the call.
    Provider(ProviderError),
}

impl TestError {
    /// The error diagnostics, empty for other failures.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::Diagnostics(diags) => diags,
            _ => &[],
        }
    }
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            },
            TestError::NoState => write!(f, "Operation returned no state"),
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Diagnostics) -> Result<(), TestError> {
    let errors: Vec<Diagnostic> = diagnostics.into_vec().into_iter().filter(Diagnostic::is_error).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

fn require_state(result: ApplyResult) -> Result<Value, TestError> {
    check_diagnostics(result.diagnostics)?;
    result.state.ok_or(TestError::NoState)
}

// Assertions

/// Assert that a plan requires replacement because of exactly `paths`.
///
/// # Panics
///
/// Panics if the plan does not replace, or replaces for other paths.
pub fn assert_plan_replaces(plan: &PlanResult, paths: &[&str]) {
    assert!(
        plan.requires_replace,
        "Expected plan to require replacement, but it does not"
    );
    assert_eq!(plan.replace_paths, paths, "Unexpected replace paths");
}

/// Assert that a plan does not require replacement.
///
/// # Panics
///
/// Panics when the plan re-creates the object.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        !plan.requires_replace,
        "Expected plan to update in place, but it requires replacement of {:?}",
        plan.replace_paths
    );
}

/// Assert that `path` appears in the plan's change list.
///
/// # Panics
///
/// Panics listing the changed paths when `path` is not among them.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    let has_change = plan.changes.iter().any(|c| c.path == path);
    assert!(
        has_change,
        "Expected plan to change attribute '{}', but it was not changed. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a read found the object gone.
///
/// # Panics
///
/// Panics if the result carries state or errors.
pub fn assert_gone(result: &ApplyResult) {
    assert!(
        result.is_gone(),
        "Expected the object to be gone, got state {:?} and {} diagnostic(s)",
        result.state,
        result.diagnostics.len()
    );
}

/// Assert that diagnostics contain an error whose summary contains `summary`.
///
/// # Panics
///
/// Panics if no error diagnostic matches.
pub fn assert_error_contains<'a>(diagnostics: impl IntoIterator<Item = &'a Diagnostic>, summary: &str) {
    let errors: Vec<&Diagnostic> = diagnostics.into_iter().filter(|d| d.is_error()).collect();
    assert!(
        errors.iter().any(|d| d.summary.contains(summary)),
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        summary,
        errors.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttributeChange;

    #[test]
    fn test_mock_config_is_valid() {
        let config = mock_config("http://127.0.0.1:1234");
        let parsed = crate::client::ProviderConfig::from_value(&config).unwrap();
        assert_eq!(parsed.api_base_url(), "http://127.0.0.1:1234/v1");
    }

    #[tokio::test]
    async fn test_tester_configure() {
        let tester = ProviderTester::for_mock_server();
        tester.configure(mock_config("http://127.0.0.1:1234")).await.unwrap();
        assert!(tester.provider().is_configured().await);
    }

    #[tokio::test]
    async fn test_plan_errors_become_test_errors() {
        let tester = ProviderTester::for_mock_server();
        let err = tester
            .plan_create("pingone_group", json!({"environment_id": "nope", "name": "admins"}))
            .await
            .unwrap_err();
        assert_error_contains(err.diagnostics(), "Invalid");
    }

    #[test]
    fn test_assert_plan_replaces() {
        let plan = PlanResult {
            requires_replace: true,
            replace_paths: vec!["name".to_string()],
            changes: vec![AttributeChange::modified("name", json!("a"), json!("b"))],
            ..PlanResult::no_change(json!({}))
        };
        assert_plan_replaces(&plan, &["name"]);
        assert_plan_changes_attribute(&plan, "name");
    }

    #[test]
    fn test_assert_gone() {
        assert_gone(&ApplyResult::new(None, Diagnostics::new()));
    }

    #[test]
    #[should_panic(expected = "Expected an error containing")]
    fn test_assert_error_contains_fails() {
        let diagnostics = vec![Diagnostic::warning("Resource not found")];
        assert_error_contains(&diagnostics, "Resource not found");
    }

    #[test]
    fn test_test_error_display() {
        let err = TestError::Diagnostics(vec![Diagnostic::error("Boom")
            .with_detail("it broke")
            .with_attribute("name")]);
        let text = err.to_string();
        assert!(text.contains("Boom: it broke (at name)"));
    }
}
