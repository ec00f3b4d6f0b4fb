//! The engine-facing provider surface.
//!
//! [`ProviderService`] is the trait an engine drives; [`PingOneProvider`] is
//! its implementation over the registered resources and data sources.
//! Domain failures come back as diagnostics inside the results. A
//! [`ProviderError`] means the call itself could not be serviced: an unknown
//! type name, or a lifecycle call before `configure`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::client::{PingOneClient, ProviderConfig, RequestContext, RetryPolicy};
use crate::data_sources::{self, DataSource};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::ProviderError;
use crate::plan;
use crate::resources::{self, Resource};
use crate::schema::ProviderSchema;
use crate::types::{ApplyResult, ImportResult, ImportedResource, PlanResult, ProviderMetadata};
use crate::validation::validate;

/// Operations an engine calls on a provider.
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// The provider, resource and data source schemas.
    fn schema(&self) -> ProviderSchema;

    /// Resource and data source names. By default, derived from the schema.
    fn metadata(&self) -> ProviderMetadata {
        let schema = self.schema();
        let mut resources: Vec<String> = schema.resources.keys().cloned().collect();
        let mut data_sources: Vec<String> = schema.data_sources.keys().cloned().collect();
        resources.sort();
        data_sources.sort();
        ProviderMetadata {
            resources,
            data_sources,
        }
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate the provider configuration before configuring.
    async fn validate_provider_config(&self, config: Value) -> Result<Diagnostics, ProviderError>;

    /// Build the API client from the configuration.
    async fn configure(&self, config: Value) -> Result<Diagnostics, ProviderError>;

    /// Stop the provider gracefully.
    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource configuration.
    async fn validate_resource_config(&self, resource_type: &str, config: Value) -> Result<Diagnostics, ProviderError>;

    /// Migrate state written by an older schema version.
    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: u64,
        state: Value,
    ) -> Result<ApplyResult, ProviderError>;

    /// Compute the planned state. A null `config` plans a destroy.
    async fn plan(&self, resource_type: &str, prior_state: Option<Value>, config: Value)
        -> Result<PlanResult, ProviderError>;

    /// Create a new object.
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<ApplyResult, ProviderError>;

    /// Refresh an object; a `None` state means it is gone.
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<ApplyResult, ProviderError>;

    /// Update an existing object.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<ApplyResult, ProviderError>;

    /// Delete an object.
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<Diagnostics, ProviderError>;

    /// Import an existing object by composite identifier.
    async fn import_resource(&self, resource_type: &str, id: &str) -> Result<ImportResult, ProviderError>;

    // =========================================================================
    // Data Source Operations
    // =========================================================================

    /// Validate a data source configuration.
    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Diagnostics, ProviderError>;

    /// Read a data source.
    async fn read_data_source(&self, data_source_type: &str, config: Value) -> Result<ApplyResult, ProviderError>;
}

/// The PingOne provider.
pub struct PingOneProvider {
    resources: HashMap<&'static str, Arc<dyn Resource>>,
    data_sources: HashMap<&'static str, Arc<dyn DataSource>>,
    client: RwLock<Option<Arc<PingOneClient>>>,
    retry_policy: Option<RetryPolicy>,
    operation_timeout: Duration,
}

impl Default for PingOneProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl PingOneProvider {
    /// A provider with every resource and data source registered.
    pub fn new() -> Self {
        Self {
            resources: resources::all().into_iter().map(|r| (r.type_name(), r)).collect(),
            data_sources: data_sources::all().into_iter().map(|d| (d.type_name(), d)).collect(),
            client: RwLock::new(None),
            retry_policy: None,
            operation_timeout: RequestContext::DEFAULT_TIMEOUT,
        }
    }

    /// Use `policy` instead of the one derived from the configuration.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Deadline given to each lifecycle operation.
    #[must_use]
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Whether `configure` has succeeded.
    pub async fn is_configured(&self) -> bool {
        self.client.read().await.is_some()
    }

    fn resource(&self, resource_type: &str) -> Result<&Arc<dyn Resource>, ProviderError> {
        self.resources
            .get(resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    fn data_source(&self, data_source_type: &str) -> Result<&Arc<dyn DataSource>, ProviderError> {
        self.data_sources
            .get(data_source_type)
            .ok_or_else(|| ProviderError::UnknownDataSource(data_source_type.to_string()))
    }

    /// A fresh context for one operation.
    async fn context(&self) -> Result<RequestContext, ProviderError> {
        let client = self.client.read().await.clone().ok_or_else(ProviderError::not_configured)?;
        Ok(RequestContext::with_timeout(client, self.operation_timeout))
    }

    fn resource_diagnostics(resource: &dyn Resource, config: &Value) -> Diagnostics {
        let mut diagnostics = Diagnostics::from(validate(&resource.schema(), config));
        if !diagnostics.has_error() {
            diagnostics.append(resource.validate(config));
        }
        diagnostics
    }
}

fn log_diagnostics(operation: &str, diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.errors() {
        error!(
            operation,
            summary = %diagnostic.summary,
            attribute = diagnostic.attribute.as_deref().unwrap_or(""),
            "Operation returned an error"
        );
    }
    for diagnostic in diagnostics.warnings() {
        warn!(operation, summary = %diagnostic.summary, "Operation returned a warning");
    }
}

#[async_trait::async_trait]
impl ProviderService for PingOneProvider {
    fn schema(&self) -> ProviderSchema {
        let mut schema = ProviderSchema::new().with_provider_config(ProviderConfig::schema());
        for (name, resource) in &self.resources {
            schema = schema.with_resource(*name, resource.schema());
        }
        for (name, data_source) in &self.data_sources {
            schema = schema.with_data_source(*name, data_source.schema());
        }
        schema
    }

    #[instrument(skip(self, config), name = "provider.validate_provider_config")]
    async fn validate_provider_config(&self, config: Value) -> Result<Diagnostics, ProviderError> {
        let mut diagnostics = Diagnostics::from(validate(&ProviderConfig::schema(), &config));
        if let Err(e) = ProviderConfig::from_value(&config) {
            diagnostics.push(Diagnostic::from(e));
        }
        Ok(diagnostics)
    }

    #[instrument(skip(self, config), name = "provider.configure")]
    async fn configure(&self, config: Value) -> Result<Diagnostics, ProviderError> {
        debug!("Configure called");
        let mut diagnostics = self.validate_provider_config(config.clone()).await?;
        if diagnostics.has_error() {
            log_diagnostics("configure", &diagnostics);
            return Ok(diagnostics);
        }

        let (config, env_diagnostics) = ProviderConfig::from_value(&config)?.with_env_defaults()?;
        diagnostics.append(env_diagnostics);

        let client = match PingOneClient::new(&config) {
            Ok(client) => client,
            Err(e) => {
                error!(error = %e, "Configure failed");
                diagnostics.push(Diagnostic::from(e));
                return Ok(diagnostics);
            },
        };
        let client = match &self.retry_policy {
            Some(policy) => client.with_retry_policy(policy.clone()),
            None => client,
        };

        info!(
            api_base = client.api_base(),
            region = ?config.region(),
            "Configure completed successfully"
        );
        *self.client.write().await = Some(Arc::new(client));
        Ok(diagnostics)
    }

    #[instrument(skip(self, config), fields(resource_type = %resource_type), name = "provider.validate_resource_config")]
    async fn validate_resource_config(&self, resource_type: &str, config: Value) -> Result<Diagnostics, ProviderError> {
        let resource = self.resource(resource_type)?;
        Ok(Self::resource_diagnostics(resource.as_ref(), &config))
    }

    #[instrument(skip(self, state), fields(resource_type = %resource_type), name = "provider.upgrade_resource_state")]
    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: u64,
        state: Value,
    ) -> Result<ApplyResult, ProviderError> {
        let resource = self.resource(resource_type)?;
        let target = resource.schema().version;
        if version != target {
            debug!(from = version, to = target, "Upgrading resource state");
        }
        Ok(match resource.upgrade_state(version, state) {
            Ok(upgraded) => ApplyResult::new(Some(upgraded), Diagnostics::new()),
            Err(diagnostic) => ApplyResult::new(None, Diagnostics::from(diagnostic)),
        })
    }

    #[instrument(skip(self, prior_state, config), fields(resource_type = %resource_type), name = "provider.plan")]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let resource = self.resource(resource_type)?;
        let schema = resource.schema();
        let prior = prior_state.as_ref().filter(|p| !p.is_null());

        if config.is_null() {
            return Ok(plan::plan_destroy(&schema, prior));
        }

        let mut diagnostics = Self::resource_diagnostics(resource.as_ref(), &config);
        if diagnostics.has_error() {
            log_diagnostics("plan", &diagnostics);
            return Ok(PlanResult::failed(diagnostics));
        }

        let mut proposed = plan::propose(&schema, prior, &config);
        resource.modify_plan(prior, &config, &mut proposed, &mut diagnostics);
        if diagnostics.has_error() {
            log_diagnostics("plan", &diagnostics);
            return Ok(PlanResult::failed(diagnostics));
        }

        let mut result = plan::finalize(&schema, prior, &config, proposed);
        if result.requires_replace {
            debug!(paths = ?result.replace_paths, "Plan requires replacement");
        }
        diagnostics.append(std::mem::take(&mut result.diagnostics));
        result.diagnostics = diagnostics;
        Ok(result)
    }

    #[instrument(skip(self, planned_state), fields(resource_type = %resource_type), name = "provider.create")]
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<ApplyResult, ProviderError> {
        let resource = self.resource(resource_type)?;
        let ctx = self.context().await?;
        let result = resource.create(&ctx, &planned_state).await;
        log_diagnostics("create", &result.diagnostics);
        Ok(result)
    }

    #[instrument(skip(self, current_state), fields(resource_type = %resource_type), name = "provider.read")]
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<ApplyResult, ProviderError> {
        let resource = self.resource(resource_type)?;
        let ctx = self.context().await?;
        let result = resource.read(&ctx, &current_state).await;
        if result.is_gone() {
            info!("Object no longer exists, removing from state");
        }
        log_diagnostics("read", &result.diagnostics);
        Ok(result)
    }

    #[instrument(skip(self, prior_state, planned_state), fields(resource_type = %resource_type), name = "provider.update")]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<ApplyResult, ProviderError> {
        let resource = self.resource(resource_type)?;
        let ctx = self.context().await?;
        let result = resource.update(&ctx, &planned_state, &prior_state).await;
        log_diagnostics("update", &result.diagnostics);
        Ok(result)
    }

    #[instrument(skip(self, current_state), fields(resource_type = %resource_type), name = "provider.delete")]
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<Diagnostics, ProviderError> {
        let resource = self.resource(resource_type)?;
        let ctx = self.context().await?;
        let diagnostics = resource.delete(&ctx, &current_state).await;
        log_diagnostics("delete", &diagnostics);
        Ok(diagnostics)
    }

    #[instrument(skip(self), fields(resource_type = %resource_type), name = "provider.import_resource")]
    async fn import_resource(&self, resource_type: &str, id: &str) -> Result<ImportResult, ProviderError> {
        let resource = self.resource(resource_type)?;
        let ctx = self.context().await?;
        let ApplyResult { state, mut diagnostics } = resource.import(&ctx, id).await;

        let resources = match state {
            Some(state) if !diagnostics.has_error() => vec![ImportedResource::new(resource_type, state)],
            _ => Vec::new(),
        };
        if resources.is_empty() && !diagnostics.has_error() {
            diagnostics.add_error(
                "Cannot import non-existent remote object",
                format!("No {} exists with the import identifier {}.", resource_type, id),
            );
        }
        log_diagnostics("import", &diagnostics);
        Ok(ImportResult {
            resources,
            diagnostics,
        })
    }

    #[instrument(skip(self, config), fields(data_source_type = %data_source_type), name = "provider.validate_data_source_config")]
    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Diagnostics, ProviderError> {
        let data_source = self.data_source(data_source_type)?;
        let mut diagnostics = Diagnostics::from(validate(&data_source.schema(), &config));
        if !diagnostics.has_error() {
            diagnostics.append(data_source.validate(&config));
        }
        Ok(diagnostics)
    }

    #[instrument(skip(self, config), fields(data_source_type = %data_source_type), name = "provider.read_data_source")]
    async fn read_data_source(&self, data_source_type: &str, config: Value) -> Result<ApplyResult, ProviderError> {
        let diagnostics = self.validate_data_source_config(data_source_type, config.clone()).await?;
        if diagnostics.has_error() {
            return Ok(ApplyResult::new(None, diagnostics));
        }
        let data_source = self.data_source(data_source_type)?;
        let ctx = self.context().await?;
        let result = data_source.read(&ctx, &config).await;
        log_diagnostics("read_data_source", &result.diagnostics);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schema_registers_everything() {
        let provider = PingOneProvider::new();
        let metadata = provider.metadata();
        assert!(metadata.resources.contains(&"pingone_group".to_string()));
        assert!(metadata.data_sources.contains(&"pingone_role".to_string()));
        assert_eq!(metadata.resources.len(), resources::all().len());
    }

    #[tokio::test]
    async fn test_lifecycle_before_configure() {
        let provider = PingOneProvider::new();
        let err = provider.read("pingone_group", json!({})).await.unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
        assert_eq!(err.message(), "provider not configured");
    }

    #[tokio::test]
    async fn test_unknown_types() {
        let provider = PingOneProvider::new();
        let err = provider.plan("pingone_nope", None, json!({})).await.unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
        let err = provider.read_data_source("pingone_nope", json!({})).await.unwrap_err();
        assert!(matches!(err, ProviderError::UnknownDataSource(_)));
    }

    #[tokio::test]
    async fn test_configure_with_token() {
        let provider = PingOneProvider::new();
        let diagnostics = provider
            .configure(json!({"access_token": "token", "region": "EU"}))
            .await
            .unwrap();
        assert!(!diagnostics.has_error(), "{:?}", diagnostics);
        assert!(provider.is_configured().await);
    }

    #[tokio::test]
    async fn test_plan_destroy_on_null_config() {
        let provider = PingOneProvider::new();
        let prior = json!({"id": "g1", "environment_id": "e1", "name": "admins"});
        let result = provider.plan("pingone_group", Some(prior), Value::Null).await.unwrap();
        assert!(result.planned_state.is_null());
        assert!(!result.diagnostics.has_error());
    }

    #[test]
    fn test_stop_is_a_no_op() {
        let provider = PingOneProvider::new();
        tokio_test::block_on(provider.stop()).unwrap();
        assert!(!tokio_test::block_on(provider.is_configured()));
    }

    #[tokio::test]
    async fn test_plan_reports_validation_errors() {
        let provider = PingOneProvider::new();
        let result = provider
            .plan("pingone_group", None, json!({"environment_id": "not-a-uuid", "name": "admins"}))
            .await
            .unwrap();
        assert!(result.diagnostics.has_error());
    }
}
