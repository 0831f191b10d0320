//! The random provider.
//!
//! [`RandomProvider`] implements [`ProviderService`] by validating and
//! planning against each resource's schema and dispatching everything else
//! to the resource's [`ResourceHandler`](crate::resources::ResourceHandler).
//! Random values only ever live in state, so reads are pass-through and
//! deletes only drop the state.

use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::error::ProviderError;
use crate::plan;
use crate::resources::ResourceKind;
use crate::schema::{has_errors, Diagnostic, ProviderSchema, Schema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};
use crate::validation;

/// A provider generating random values.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomProvider;

impl RandomProvider {
    /// Create the provider.
    pub fn new() -> Self {
        Self
    }

    /// Schema checks followed by the resource's own cross-attribute checks.
    fn validate(&self, kind: ResourceKind, config: &Value) -> Vec<Diagnostic> {
        let handler = kind.handler();
        let mut diagnostics = validation::validate(&handler.schema(), config);
        if !has_errors(&diagnostics) {
            diagnostics.extend(handler.validate(config));
        }
        diagnostics
    }
}

#[async_trait::async_trait]
impl ProviderService for RandomProvider {
    fn schema(&self) -> ProviderSchema {
        ResourceKind::ALL.iter().fold(
            ProviderSchema::new().with_provider_config(
                Schema::v0().with_description("The random provider takes no configuration."),
            ),
            |schema, kind| schema.with_resource(kind.type_name(), kind.handler().schema()),
        )
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = config;
        debug!("Random provider configured");
        Ok(Vec::new())
    }

    #[instrument(skip(self, config))]
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let kind: ResourceKind = resource_type.parse()?;
        Ok(self.validate(kind, &config))
    }

    #[instrument(skip(self, state))]
    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        let kind: ResourceKind = resource_type.parse()?;
        let handler = kind.handler();
        let current = handler.schema().version;
        let upgraded = handler.upgrade_state(version, state)?;
        if version != current {
            info!(from_version = version, to_version = current, "Upgraded resource state");
        }
        Ok(upgraded)
    }

    #[instrument(skip(self, prior_state, proposed_state, config))]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let kind: ResourceKind = resource_type.parse()?;
        let handler = kind.handler();
        let schema = handler.schema();

        if proposed_state.is_null() {
            return Ok(match prior_state.as_ref().filter(|p| !p.is_null()) {
                Some(prior) => plan::destroy(&schema, prior),
                None => PlanResult::no_change(Value::Null),
            });
        }

        let config = if config.is_null() { proposed_state } else { config };
        let diagnostics = self.validate(kind, &config);
        if has_errors(&diagnostics) {
            return Err(ProviderError::InvalidConfig(diagnostics));
        }

        let mut planned = plan::propose(&schema, &config);
        let diagnostics = handler.modify_plan(&config, &mut planned);
        if has_errors(&diagnostics) {
            return Err(ProviderError::InvalidConfig(diagnostics));
        }

        let result = plan::resolve(&schema, prior_state.as_ref(), planned);
        debug!(
            changes = result.changes.len(),
            requires_replace = result.requires_replace,
            "Planned resource"
        );
        Ok(result)
    }

    #[instrument(skip(self, planned_state))]
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let kind: ResourceKind = resource_type.parse()?;
        kind.handler().create(planned_state)
    }

    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        let kind: ResourceKind = resource_type.parse()?;
        kind.handler().read(current_state)
    }

    #[instrument(skip(self, prior_state, planned_state))]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let kind: ResourceKind = resource_type.parse()?;
        kind.handler().update(prior_state, planned_state)
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let _ = current_state;
        let kind: ResourceKind = resource_type.parse()?;
        debug!(resource_type = %kind, "Removing resource from state");
        Ok(())
    }

    #[instrument(skip(self, id))]
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let kind: ResourceKind = resource_type.parse()?;
        let state = kind.handler().import(id)?;
        Ok(vec![ImportedResource::new(kind.type_name(), state)])
    }
}
