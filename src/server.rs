//! Serving a provider over gRPC.
//!
//! This module provides the [`ProviderService`] trait, the adapter that
//! exposes it as the generated gRPC service, and the `serve*` functions that
//! bind a listener, print the handshake line and run the server.
//!
//! # Signal Handling
//!
//! The server handles SIGTERM and SIGINT (CTRL+C on Windows). When a signal
//! arrives the server:
//! 1. Stops accepting new connections
//! 2. Waits for in-flight requests to complete, up to the shutdown timeout
//! 3. Calls the provider's `stop()` method
//! 4. Returns

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tonic::transport::Server;
use tracing::{debug, error, info, instrument, warn};

use crate::error::ProviderError;
use crate::generated;
use crate::schema::{has_errors, Diagnostic, DiagnosticSeverity, ProviderSchema, Schema};
use crate::types::{
    ImportedResource, PlanResult, ProviderMetadata, HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};

/// Environment variable holding a fixed listen address.
pub const ADDR_ENV: &str = "HEMMER_PROVIDER_ADDR";

/// Environment variable holding the shutdown timeout in seconds.
pub const SHUTDOWN_TIMEOUT_ENV: &str = "HEMMER_PROVIDER_SHUTDOWN_TIMEOUT";

/// The operations a provider implements, in terms of JSON values.
///
/// The gRPC adapter decodes requests, calls these methods and encodes the
/// results. Errors are reported back to the host as diagnostics.
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Return the provider's schema including all resources.
    fn schema(&self) -> ProviderSchema;

    /// Return provider metadata. By default, this is derived from the schema.
    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            resources: self.schema().resources.keys().cloned().collect(),
            capabilities: Default::default(),
        }
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate the provider configuration before configuring.
    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = config;
        Ok(vec![])
    }

    /// Configure the provider. Returns diagnostics (errors and warnings).
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Stop the provider gracefully.
    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource's configuration before planning.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = (resource_type, config);
        Ok(vec![])
    }

    /// Upgrade resource state written by an older schema version.
    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        let _ = (resource_type, version);
        Ok(state)
    }

    /// Plan changes for a resource. A null proposed state plans destruction.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError>;

    /// Create a new resource.
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError>;

    /// Read the current state of a resource.
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError>;

    /// Update an existing resource in place.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete a resource.
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError>;

    /// Import an existing value into management.
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let _ = id;
        Err(ProviderError::ImportUnsupported(resource_type.to_string()))
    }
}

/// Wrapper that implements the generated gRPC trait.
struct ProviderGrpcService<P: ProviderService> {
    provider: Arc<P>,
}

fn diagnostics_to_proto(diagnostics: Vec<Diagnostic>) -> Vec<generated::Diagnostic> {
    diagnostics
        .into_iter()
        .map(|d| generated::Diagnostic {
            severity: match d.severity {
                DiagnosticSeverity::Error => generated::diagnostic::Severity::Error as i32,
                DiagnosticSeverity::Warning => generated::diagnostic::Severity::Warning as i32,
            },
            summary: d.summary,
            detail: d.detail.unwrap_or_default(),
            attribute: d.attribute.unwrap_or_default(),
        })
        .collect()
}

fn error_to_diagnostics(err: ProviderError) -> Vec<generated::Diagnostic> {
    diagnostics_to_proto(err.into_diagnostics())
}

fn schema_to_proto(schema: &Schema) -> generated::Schema {
    generated::Schema {
        version: schema.version,
        description: schema.description.clone().unwrap_or_default(),
        attributes: schema
            .attributes
            .iter()
            .map(|(name, attr)| generated::Attribute {
                name: name.clone(),
                r#type: serde_json::to_vec(&attr.attr_type).unwrap_or_default(),
                required: attr.flags.required,
                optional: attr.flags.optional,
                computed: attr.flags.computed,
                sensitive: attr.flags.sensitive,
                description: attr.description.clone().unwrap_or_default(),
                force_new: attr.force_new(),
                default_value: attr
                    .default
                    .as_ref()
                    .map(|v| serde_json::to_vec(v).unwrap_or_default())
                    .unwrap_or_default(),
                deprecation_message: attr.deprecation_message.clone().unwrap_or_default(),
            })
            .collect(),
    }
}

fn decode(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap_or(Value::Null)
}

/// Decode a state payload the provider acts on; empty bytes are null.
fn decode_payload(field: &str, bytes: &[u8]) -> Result<Value, ProviderError> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes)
        .map_err(|e| ProviderError::Validation(format!("{} is not valid JSON: {}", field, e)))
}

fn encode(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_default()
}

impl<P: ProviderService> ProviderGrpcService<P> {
    async fn plan_request(&self, req: &generated::PlanRequest) -> Result<PlanResult, ProviderError> {
        let prior_state = match decode_payload("prior_state", &req.prior_state)? {
            Value::Null => None,
            state => Some(state),
        };
        debug!(resource_type = %req.resource_type, is_create = prior_state.is_none(), "Plan called");
        let proposed_state = decode_payload("proposed_state", &req.proposed_state)?;
        let config = decode_payload("config", &req.config)?;
        self.provider
            .plan(&req.resource_type, prior_state, proposed_state, config)
            .await
    }
}

#[tonic::async_trait]
impl<P: ProviderService> generated::provider_server::Provider for ProviderGrpcService<P> {
    #[instrument(skip(self, _request), name = "grpc.get_metadata")]
    async fn get_metadata(
        &self,
        _request: tonic::Request<generated::GetMetadataRequest>,
    ) -> Result<tonic::Response<generated::GetMetadataResponse>, tonic::Status> {
        let metadata = self.provider.metadata();
        debug!(resources = metadata.resources.len(), "GetMetadata completed");
        Ok(tonic::Response::new(generated::GetMetadataResponse {
            server_capabilities: Some(generated::ServerCapabilities {
                plan_destroy: metadata.capabilities.plan_destroy,
            }),
            resources: metadata.resources,
            diagnostics: vec![],
        }))
    }

    #[instrument(skip(self, _request), name = "grpc.get_schema")]
    async fn get_schema(
        &self,
        _request: tonic::Request<generated::GetSchemaRequest>,
    ) -> Result<tonic::Response<generated::GetSchemaResponse>, tonic::Status> {
        let schema = self.provider.schema();
        debug!(resources = schema.resources.len(), "GetSchema completed");
        Ok(tonic::Response::new(generated::GetSchemaResponse {
            provider: Some(schema_to_proto(&schema.provider)),
            resources: schema
                .resources
                .iter()
                .map(|(k, v)| (k.clone(), schema_to_proto(v)))
                .collect(),
            diagnostics: vec![],
        }))
    }

    #[instrument(skip(self, request), name = "grpc.validate_provider_config")]
    async fn validate_provider_config(
        &self,
        request: tonic::Request<generated::ValidateProviderConfigRequest>,
    ) -> Result<tonic::Response<generated::ValidateProviderConfigResponse>, tonic::Status> {
        let config = decode(&request.into_inner().config);
        let diagnostics = match self.provider.validate_provider_config(config).await {
            Ok(diagnostics) => {
                if has_errors(&diagnostics) {
                    warn!(diagnostics = diagnostics.len(), "ValidateProviderConfig completed with errors");
                }
                diagnostics_to_proto(diagnostics)
            },
            Err(e) => {
                error!(error = %e, "ValidateProviderConfig failed");
                error_to_diagnostics(e)
            },
        };
        Ok(tonic::Response::new(generated::ValidateProviderConfigResponse { diagnostics }))
    }

    #[instrument(skip(self, request), name = "grpc.configure")]
    async fn configure(
        &self,
        request: tonic::Request<generated::ConfigureRequest>,
    ) -> Result<tonic::Response<generated::ConfigureResponse>, tonic::Status> {
        let config = decode(&request.into_inner().config);
        let diagnostics = match self.provider.configure(config).await {
            Ok(diagnostics) => {
                if has_errors(&diagnostics) {
                    warn!(diagnostics = diagnostics.len(), "Configure completed with errors");
                } else {
                    info!("Provider configured");
                }
                diagnostics_to_proto(diagnostics)
            },
            Err(e) => {
                error!(error = %e, "Configure failed");
                error_to_diagnostics(e)
            },
        };
        Ok(tonic::Response::new(generated::ConfigureResponse { diagnostics }))
    }

    #[instrument(skip(self, _request), name = "grpc.stop")]
    async fn stop(
        &self,
        _request: tonic::Request<generated::StopRequest>,
    ) -> Result<tonic::Response<generated::StopResponse>, tonic::Status> {
        info!("Stop called");
        let error = match self.provider.stop().await {
            Ok(()) => String::new(),
            Err(e) => {
                error!(error = %e, "Stop failed");
                e.to_string()
            },
        };
        Ok(tonic::Response::new(generated::StopResponse { error }))
    }

    #[instrument(skip(self, request), name = "grpc.validate_resource_config")]
    async fn validate_resource_config(
        &self,
        request: tonic::Request<generated::ValidateResourceConfigRequest>,
    ) -> Result<tonic::Response<generated::ValidateResourceConfigResponse>, tonic::Status> {
        let req = request.into_inner();
        let config = decode(&req.config);
        let diagnostics = match self
            .provider
            .validate_resource_config(&req.resource_type, config)
            .await
        {
            Ok(diagnostics) => {
                if has_errors(&diagnostics) {
                    warn!(resource_type = %req.resource_type, diagnostics = diagnostics.len(), "ValidateResourceConfig completed with errors");
                } else {
                    debug!(resource_type = %req.resource_type, "ValidateResourceConfig completed");
                }
                diagnostics_to_proto(diagnostics)
            },
            Err(e) => {
                error!(resource_type = %req.resource_type, error = %e, "ValidateResourceConfig failed");
                error_to_diagnostics(e)
            },
        };
        Ok(tonic::Response::new(generated::ValidateResourceConfigResponse { diagnostics }))
    }

    #[instrument(skip(self, request), name = "grpc.upgrade_resource_state")]
    async fn upgrade_resource_state(
        &self,
        request: tonic::Request<generated::UpgradeResourceStateRequest>,
    ) -> Result<tonic::Response<generated::UpgradeResourceStateResponse>, tonic::Status> {
        let req = request.into_inner();
        let state = decode(&req.raw_state);
        let response = match self
            .provider
            .upgrade_resource_state(&req.resource_type, req.version, state)
            .await
        {
            Ok(upgraded) => generated::UpgradeResourceStateResponse {
                upgraded_state: encode(&upgraded),
                diagnostics: vec![],
            },
            Err(e) => {
                error!(resource_type = %req.resource_type, version = req.version, error = %e, "UpgradeResourceState failed");
                generated::UpgradeResourceStateResponse {
                    upgraded_state: vec![],
                    diagnostics: error_to_diagnostics(e),
                }
            },
        };
        Ok(tonic::Response::new(response))
    }

    #[instrument(skip(self, request), name = "grpc.plan")]
    async fn plan(
        &self,
        request: tonic::Request<generated::PlanRequest>,
    ) -> Result<tonic::Response<generated::PlanResponse>, tonic::Status> {
        let req = request.into_inner();
        let response = match self.plan_request(&req).await {
            Ok(result) => {
                info!(
                    resource_type = %req.resource_type,
                    changes = result.changes.len(),
                    requires_replace = result.requires_replace,
                    "Plan completed"
                );
                generated::PlanResponse {
                    planned_state: encode(&result.planned_state),
                    changes: result.changes.into_iter().map(Into::into).collect(),
                    requires_replace: result.requires_replace,
                    diagnostics: vec![],
                }
            },
            Err(e) => {
                warn!(resource_type = %req.resource_type, error = %e, "Plan failed");
                generated::PlanResponse {
                    planned_state: vec![],
                    changes: vec![],
                    requires_replace: false,
                    diagnostics: error_to_diagnostics(e),
                }
            },
        };
        Ok(tonic::Response::new(response))
    }

    #[instrument(skip(self, request), name = "grpc.create")]
    async fn create(
        &self,
        request: tonic::Request<generated::CreateRequest>,
    ) -> Result<tonic::Response<generated::CreateResponse>, tonic::Status> {
        let req = request.into_inner();
        let result = match decode_payload("planned_state", &req.planned_state) {
            Ok(planned_state) => self.provider.create(&req.resource_type, planned_state).await,
            Err(e) => Err(e),
        };
        let response = match result {
            Ok(state) => {
                info!(resource_type = %req.resource_type, "Create completed");
                generated::CreateResponse {
                    state: encode(&state),
                    diagnostics: vec![],
                }
            },
            Err(e) => {
                error!(resource_type = %req.resource_type, error = %e, "Create failed");
                generated::CreateResponse {
                    state: vec![],
                    diagnostics: error_to_diagnostics(e),
                }
            },
        };
        Ok(tonic::Response::new(response))
    }

    #[instrument(skip(self, request), name = "grpc.read")]
    async fn read(
        &self,
        request: tonic::Request<generated::ReadRequest>,
    ) -> Result<tonic::Response<generated::ReadResponse>, tonic::Status> {
        let req = request.into_inner();
        let response = match self
            .provider
            .read(&req.resource_type, decode(&req.current_state))
            .await
        {
            Ok(state) => generated::ReadResponse {
                state: encode(&state),
                diagnostics: vec![],
            },
            Err(e) => {
                error!(resource_type = %req.resource_type, error = %e, "Read failed");
                generated::ReadResponse {
                    state: vec![],
                    diagnostics: error_to_diagnostics(e),
                }
            },
        };
        Ok(tonic::Response::new(response))
    }

    #[instrument(skip(self, request), name = "grpc.update")]
    async fn update(
        &self,
        request: tonic::Request<generated::UpdateRequest>,
    ) -> Result<tonic::Response<generated::UpdateResponse>, tonic::Status> {
        let req = request.into_inner();
        let states = decode_payload("prior_state", &req.prior_state).and_then(|prior| {
            Ok((prior, decode_payload("planned_state", &req.planned_state)?))
        });
        let result = match states {
            Ok((prior_state, planned_state)) => {
                self.provider
                    .update(&req.resource_type, prior_state, planned_state)
                    .await
            },
            Err(e) => Err(e),
        };
        let response = match result {
            Ok(state) => {
                info!(resource_type = %req.resource_type, "Update completed");
                generated::UpdateResponse {
                    state: encode(&state),
                    diagnostics: vec![],
                }
            },
            Err(e) => {
                error!(resource_type = %req.resource_type, error = %e, "Update failed");
                generated::UpdateResponse {
                    state: vec![],
                    diagnostics: error_to_diagnostics(e),
                }
            },
        };
        Ok(tonic::Response::new(response))
    }

    #[instrument(skip(self, request), name = "grpc.delete")]
    async fn delete(
        &self,
        request: tonic::Request<generated::DeleteRequest>,
    ) -> Result<tonic::Response<generated::DeleteResponse>, tonic::Status> {
        let req = request.into_inner();
        let diagnostics = match self
            .provider
            .delete(&req.resource_type, decode(&req.current_state))
            .await
        {
            Ok(()) => {
                info!(resource_type = %req.resource_type, "Delete completed");
                vec![]
            },
            Err(e) => {
                error!(resource_type = %req.resource_type, error = %e, "Delete failed");
                error_to_diagnostics(e)
            },
        };
        Ok(tonic::Response::new(generated::DeleteResponse { diagnostics }))
    }

    // The import ID of a password is the password, so it is never logged.
    #[instrument(skip(self, request), name = "grpc.import_resource_state")]
    async fn import_resource_state(
        &self,
        request: tonic::Request<generated::ImportResourceStateRequest>,
    ) -> Result<tonic::Response<generated::ImportResourceStateResponse>, tonic::Status> {
        let req = request.into_inner();
        let response = match self
            .provider
            .import_resource(&req.resource_type, &req.id)
            .await
        {
            Ok(imported) => {
                info!(resource_type = %req.resource_type, imported = imported.len(), "ImportResourceState completed");
                generated::ImportResourceStateResponse {
                    imported: imported
                        .into_iter()
                        .map(|r| generated::ImportedResource {
                            resource_type: r.resource_type,
                            state: encode(&r.state),
                        })
                        .collect(),
                    diagnostics: vec![],
                }
            },
            Err(e) => {
                error!(resource_type = %req.resource_type, error = %e, "ImportResourceState failed");
                generated::ImportResourceStateResponse {
                    imported: vec![],
                    diagnostics: error_to_diagnostics(e),
                }
            },
        };
        Ok(tonic::Response::new(response))
    }
}

/// Options for configuring the provider server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeOptions {
    /// How long in-flight requests may run after a shutdown signal.
    /// Default: 30 seconds.
    pub shutdown_timeout: Duration,
    /// Fixed listen address. When unset an ephemeral localhost port is used.
    pub address: Option<SocketAddr>,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(30),
            address: None,
        }
    }
}

impl ServeOptions {
    /// Create new serve options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shutdown timeout.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Listen on a fixed address.
    pub fn with_address(mut self, address: SocketAddr) -> Self {
        self.address = Some(address);
        self
    }

    /// Read options from `HEMMER_PROVIDER_ADDR` and
    /// `HEMMER_PROVIDER_SHUTDOWN_TIMEOUT`.
    pub fn from_env() -> Result<Self, ProviderError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ProviderError> {
        let mut options = Self::default();
        if let Some(addr) = lookup(ADDR_ENV).filter(|v| !v.trim().is_empty()) {
            let addr = addr.trim().parse().map_err(|e| {
                ProviderError::Configuration(format!("{} must be a socket address, got {:?}: {}", ADDR_ENV, addr, e))
            })?;
            options = options.with_address(addr);
        }
        if let Some(secs) = lookup(SHUTDOWN_TIMEOUT_ENV).filter(|v| !v.trim().is_empty()) {
            let secs: u64 = secs.trim().parse().map_err(|e| {
                ProviderError::Configuration(format!(
                    "{} must be a whole number of seconds, got {:?}: {}",
                    SHUTDOWN_TIMEOUT_ENV, secs, e
                ))
            })?;
            options = options.with_shutdown_timeout(Duration::from_secs(secs));
        }
        Ok(options)
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT, CTRL+C on Windows).
///
/// If the handlers cannot be installed the server runs until killed.
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                (Err(e), _) | (_, Err(e)) => {
                    warn!(error = %e, "Failed to install signal handlers");
                    return std::future::pending().await;
                },
            };

        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
            _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown"),
        }
    }

    #[cfg(windows)]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install CTRL+C handler");
            return std::future::pending().await;
        }
        info!("Received CTRL+C, initiating graceful shutdown");
    }

    #[cfg(not(any(unix, windows)))]
    {
        std::future::pending::<()>().await;
    }
}

/// Serve a provider as a gRPC server on an ephemeral localhost port.
///
/// Prints the handshake `HEMMER_PROVIDER|<version>|<address>` to stdout and
/// runs until SIGTERM/SIGINT. For custom configuration, use
/// [`serve_with_options`].
pub async fn serve<P: ProviderService>(provider: P) -> Result<(), ProviderError> {
    serve_with_options(provider, ServeOptions::default()).await
}

/// Serve a provider with custom options.
pub async fn serve_with_options<P: ProviderService>(
    provider: P,
    options: ServeOptions,
) -> Result<(), ProviderError> {
    let addr = options
        .address
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 0)));
    let listener = bind(addr).await?;
    serve_on_listener(provider, listener, options, wait_for_shutdown_signal()).await
}

/// Serve a provider on a specific address.
pub async fn serve_on<P: ProviderService>(provider: P, addr: SocketAddr) -> Result<(), ProviderError> {
    serve_with_options(provider, ServeOptions::default().with_address(addr)).await
}

async fn bind(addr: SocketAddr) -> Result<TcpListener, ProviderError> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| ProviderError::Configuration(format!("Failed to bind {}: {}", addr, e)))
}

/// Serve on an already-bound listener until `shutdown` resolves.
pub(crate) async fn serve_on_listener<P: ProviderService>(
    provider: P,
    listener: TcpListener,
    options: ServeOptions,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<(), ProviderError> {
    let addr = listener
        .local_addr()
        .map_err(|e| ProviderError::Configuration(format!("Failed to read listen address: {}", e)))?;

    // Handshake
    println!("{}|{}|{}", HANDSHAKE_PREFIX, PROTOCOL_VERSION, addr);
    info!(address = %addr, "Provider server starting");

    let provider = Arc::new(provider);
    let grpc_service = ProviderGrpcService {
        provider: Arc::clone(&provider),
    };

    let (signalled_tx, signalled_rx) = oneshot::channel::<()>();
    let server_future = Server::builder()
        .add_service(generated::provider_server::ProviderServer::new(grpc_service))
        .serve_with_incoming_shutdown(
            tokio_stream::wrappers::TcpListenerStream::new(listener),
            async move {
                shutdown.await;
                let _ = signalled_tx.send(());
            },
        );

    // The timeout only starts once shutdown has been requested
    let drain_deadline = async move {
        match signalled_rx.await {
            Ok(()) => tokio::time::sleep(options.shutdown_timeout).await,
            Err(_) => std::future::pending().await,
        }
    };

    tokio::select! {
        result = server_future => match result {
            Ok(()) => info!("Server shutdown complete"),
            Err(e) => {
                error!(error = %e, "Server error");
                return Err(e.into());
            },
        },
        _ = drain_deadline => {
            warn!(timeout = ?options.shutdown_timeout, "Shutdown timeout exceeded, forcing shutdown");
        },
    }

    debug!("Calling provider stop()");
    if let Err(e) = provider.stop().await {
        warn!(error = %e, "Provider stop() returned error");
    }

    info!("Provider shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generated::provider_server::Provider;
    use crate::provider::RandomProvider;
    use serde_json::json;

    fn service() -> ProviderGrpcService<RandomProvider> {
        ProviderGrpcService {
            provider: Arc::new(RandomProvider::new()),
        }
    }

    #[test]
    fn test_serve_options() {
        let options = ServeOptions::new().with_shutdown_timeout(Duration::from_secs(5));
        assert_eq!(options.shutdown_timeout, Duration::from_secs(5));
        assert!(options.address.is_none());
        assert_eq!(ServeOptions::default().shutdown_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_serve_options_from_lookup() {
        let options = ServeOptions::from_lookup(|key| match key {
            ADDR_ENV => Some("127.0.0.1:7000".to_string()),
            SHUTDOWN_TIMEOUT_ENV => Some("3".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(options.address, Some("127.0.0.1:7000".parse().unwrap()));
        assert_eq!(options.shutdown_timeout, Duration::from_secs(3));

        let options = ServeOptions::from_lookup(|_| None).unwrap();
        assert_eq!(options, ServeOptions::default());
    }

    #[test]
    fn test_serve_options_malformed_env() {
        let err = ServeOptions::from_lookup(|key| (key == ADDR_ENV).then(|| "localhost".to_string()))
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));

        let err = ServeOptions::from_lookup(|key| {
            (key == SHUTDOWN_TIMEOUT_ENV).then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn test_diagnostics_to_proto() {
        let proto = diagnostics_to_proto(vec![
            Diagnostic::error("Bad").with_attribute("length"),
            Diagnostic::warning("Deprecated").with_detail("Use numeric"),
        ]);
        assert_eq!(proto[0].severity, generated::diagnostic::Severity::Error as i32);
        assert_eq!(proto[0].attribute, "length");
        assert_eq!(proto[1].severity, generated::diagnostic::Severity::Warning as i32);
        assert_eq!(proto[1].detail, "Use numeric");
    }

    #[test]
    fn test_schema_to_proto() {
        let schema = RandomProvider::new().schema();
        let proto = schema_to_proto(&schema.resources["random_string"]);
        assert_eq!(proto.version, 2);

        let length = proto.attributes.iter().find(|a| a.name == "length").unwrap();
        assert!(length.required);
        assert!(length.force_new);
        assert_eq!(serde_json::from_slice::<Value>(&length.r#type).unwrap(), json!("int64"));

        let number = proto.attributes.iter().find(|a| a.name == "number").unwrap();
        assert!(!number.deprecation_message.is_empty());
        assert_eq!(serde_json::from_slice::<Value>(&number.default_value).unwrap(), json!(true));

        let result = proto.attributes.iter().find(|a| a.name == "result").unwrap();
        assert!(result.computed);
        assert!(!result.force_new);
    }

    #[tokio::test]
    async fn test_grpc_metadata() {
        let response = service()
            .get_metadata(tonic::Request::new(generated::GetMetadataRequest {}))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.resources.len(), 10);
        assert!(response.resources.contains(&"random_uuid7".to_string()));
    }

    #[tokio::test]
    async fn test_grpc_plan_reports_diagnostics() {
        let config = encode(&json!({"length": 0}));
        let response = service()
            .plan(tonic::Request::new(generated::PlanRequest {
                resource_type: "random_password".to_string(),
                prior_state: vec![],
                proposed_state: config.clone(),
                config,
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(response.planned_state.is_empty());
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].attribute, "length");
    }

    #[tokio::test]
    async fn test_grpc_create() {
        let response = service()
            .create(tonic::Request::new(generated::CreateRequest {
                resource_type: "random_integer".to_string(),
                planned_state: encode(&json!({"min": 5, "max": 5, "seed": null, "keepers": null})),
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(response.diagnostics.is_empty());
        let state = decode(&response.state);
        assert_eq!(state["result"], 5);
        assert_eq!(state["id"], "5");
    }

    #[tokio::test]
    async fn test_grpc_plan_rejects_malformed_payload() {
        let prior = encode(&json!({"keepers": null, "result": 5, "id": "5", "min": 5, "max": 5}));
        let response = service()
            .plan(tonic::Request::new(generated::PlanRequest {
                resource_type: "random_integer".to_string(),
                prior_state: prior,
                proposed_state: b"{not json".to_vec(),
                config: vec![],
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(response.changes.is_empty());
        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].summary.contains("proposed_state"));
    }

    #[tokio::test]
    async fn test_grpc_create_rejects_malformed_payload() {
        let response = service()
            .create(tonic::Request::new(generated::CreateRequest {
                resource_type: "random_integer".to_string(),
                planned_state: b"[1,".to_vec(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(response.state.is_empty());
        assert!(response.diagnostics[0].summary.contains("planned_state"));
    }

    #[tokio::test]
    async fn test_grpc_unknown_resource() {
        let response = service()
            .read(tonic::Request::new(generated::ReadRequest {
                resource_type: "random_unicorn".to_string(),
                current_state: encode(&json!({})),
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].summary.contains("random_unicorn"));
    }

    #[tokio::test]
    async fn test_serve_until_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let options = ServeOptions::new().with_shutdown_timeout(Duration::from_secs(1));
        let (tx, rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve_on_listener(RandomProvider::new(), listener, options, async {
            let _ = rx.await;
        }));
        tx.send(()).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
        assert!(result.is_ok());
    }
}
