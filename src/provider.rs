//! The Snowflake provider: routes lifecycle calls to resource adapters.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn};

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::executor::Executor;
use crate::plan::plan_resource;
use crate::resources::{Resource, ResourceData, ResourceRegistry};
use crate::schema::{Diagnostic, ProviderSchema};
use crate::service::ProviderService;
use crate::types::{ImportedResource, PlanResult};
use crate::validation::validate;

/// Manages Snowflake objects through an injected [`Executor`].
pub struct SnowflakeProvider {
    registry: ResourceRegistry,
    config: RwLock<Option<ProviderConfig>>,
}

impl SnowflakeProvider {
    /// A provider serving every Snowflake resource kind over `db`.
    pub fn new(db: Arc<dyn Executor>) -> Self {
        Self::with_registry(ResourceRegistry::snowflake(db))
    }

    /// A provider serving a custom set of resource kinds.
    pub fn with_registry(registry: ResourceRegistry) -> Self {
        Self {
            registry,
            config: RwLock::new(None),
        }
    }

    /// The registered resource kinds.
    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// The configuration accepted by the last successful `configure`.
    pub async fn config(&self) -> Option<ProviderConfig> {
        self.config.read().await.clone()
    }

    fn resource(&self, resource_type: &str) -> Result<&Arc<dyn Resource>, ProviderError> {
        self.registry.get(resource_type)
    }
}

fn failed(resource_type: &str, operation: &str, err: ProviderError) -> ProviderError {
    error!(resource_type, operation, error = %err, "operation failed");
    err
}

#[async_trait::async_trait]
impl ProviderService for SnowflakeProvider {
    fn schema(&self) -> ProviderSchema {
        self.registry.schemas().fold(
            ProviderSchema::new().with_provider_config(ProviderConfig::schema()),
            |schema, (name, resource)| schema.with_resource(name, resource),
        )
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let mut diagnostics = validate(&ProviderConfig::schema(), &config);
        if diagnostics.iter().any(Diagnostic::is_error) {
            return Ok(diagnostics);
        }
        diagnostics.extend(ProviderConfig::from_value(config)?.validate());
        Ok(diagnostics)
    }

    #[instrument(skip_all)]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let parsed = ProviderConfig::from_value(config)?;
        let diagnostics = parsed.validate();
        if diagnostics.iter().any(Diagnostic::is_error) {
            return Ok(diagnostics);
        }

        info!(host = %parsed.host(), user = %parsed.username, "provider configured");
        *self.config.write().await = Some(parsed);
        Ok(diagnostics)
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        info!("provider stopping");
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let schema = self.registry.schema(resource_type)?;
        Ok(validate(&schema, &config))
    }

    #[instrument(skip(self, prior_state, proposed_state, _config))]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let schema = self.registry.schema(resource_type)?;

        let errors: Vec<String> = validate(&schema, &proposed_state)
            .into_iter()
            .filter(Diagnostic::is_error)
            .map(|d| match d.detail {
                Some(detail) => format!("{}: {}", d.summary, detail),
                None => d.summary,
            })
            .collect();
        if !errors.is_empty() {
            return Err(ProviderError::Validation(errors.join("; ")));
        }

        let plan = plan_resource(&schema, prior_state.as_ref(), &proposed_state)?;
        if plan.requires_replace {
            info!(changes = plan.changes.len(), "plan requires replacement");
        }
        Ok(plan)
    }

    #[instrument(skip(self, planned_state))]
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let mut data = ResourceData::new(planned_state)?;
        resource
            .create(&mut data)
            .await
            .map_err(|e| failed(resource_type, "create", e))?;
        Ok(data.into_state())
    }

    #[instrument(skip(self, current_state))]
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let mut data = ResourceData::new(current_state)?;
        if data.id().is_empty() {
            return Err(ProviderError::InvalidRequest(
                "cannot read a resource without an ID".to_string(),
            ));
        }

        if !resource.exists(&data).await? {
            warn!(id = %data.id(), "resource no longer exists, removing from state");
            return Ok(Value::Null);
        }
        match resource.read(&mut data).await {
            Ok(()) => Ok(data.into_state()),
            Err(e) if e.is_not_found() => {
                warn!(id = %data.id(), "resource disappeared during read, removing from state");
                Ok(Value::Null)
            }
            Err(e) => Err(failed(resource_type, "read", e)),
        }
    }

    #[instrument(skip(self, prior_state, planned_state))]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let mut data = ResourceData::for_update(prior_state, planned_state)?;
        resource
            .update(&mut data)
            .await
            .map_err(|e| failed(resource_type, "update", e))?;
        Ok(data.into_state())
    }

    #[instrument(skip(self, current_state))]
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let resource = self.resource(resource_type)?;
        let mut data = ResourceData::new(current_state)?;
        resource
            .delete(&mut data)
            .await
            .map_err(|e| failed(resource_type, "delete", e))
    }

    #[instrument(skip(self))]
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let mut data = resource.import(id)?;
        resource
            .read(&mut data)
            .await
            .map_err(|e| failed(resource_type, "import", e))?;
        info!(id = %data.id(), "imported resource");
        Ok(vec![ImportedResource::new(resource_type, data.into_state())])
    }
}
