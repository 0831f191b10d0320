//! Error types for the random provider.

use thiserror::Error;

use crate::schema::Diagnostic;

/// Detail attached to every generation failure.
pub const RETRY_DETAIL: &str = "Retry the operation. If the error still occurs or happens regularly, \
please report it to the provider developers with hardware and operating system information.";

/// Errors that can occur while serving or running the provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// A single validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration failed validation; carries the structured diagnostics.
    #[error("Invalid configuration: {}", summarize(.0))]
    InvalidConfig(Vec<Diagnostic>),

    /// A serve or provider configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// Random value generation failed (entropy source error).
    #[error("Generation error: {resource}: {message}")]
    Generation {
        /// The resource type whose value could not be generated.
        resource: String,
        /// The underlying failure.
        message: String,
    },

    /// Hashing the generated password failed.
    #[error("Hash error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    /// The import ID could not be parsed into state.
    #[error("Import error: {0}")]
    Import(String),

    /// The resource type does not support import.
    #[error("Import not supported for resource type: {0}")]
    ImportUnsupported(String),

    /// A prior state could not be upgraded to the current schema version.
    #[error("State upgrade error: {0}")]
    StateUpgrade(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A gRPC transport error occurred.
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
}

fn summarize(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| match &d.attribute {
            Some(attr) => format!("{} ({})", d.summary, attr),
            None => d.summary.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

impl ProviderError {
    /// Build a generation error for the given resource type.
    pub fn generation(resource: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Generation {
            resource: resource.into(),
            message: message.to_string(),
        }
    }

    /// Get the error message as a string.
    pub fn message(&self) -> String {
        match self {
            Self::Validation(msg)
            | Self::Configuration(msg)
            | Self::UnknownResource(msg)
            | Self::Import(msg)
            | Self::ImportUnsupported(msg)
            | Self::StateUpgrade(msg) => msg.clone(),
            Self::InvalidConfig(diagnostics) => summarize(diagnostics),
            Self::Generation { message, .. } => message.clone(),
            Self::Hash(err) => err.to_string(),
            Self::Serialization(err) => err.to_string(),
            Self::Transport(err) => err.to_string(),
        }
    }

    /// Convert the error into the diagnostics reported back to the host.
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        match self {
            Self::InvalidConfig(diagnostics) => diagnostics,
            err @ Self::Generation { .. } => {
                vec![Diagnostic::error(err.to_string()).with_detail(RETRY_DETAIL)]
            },
            err => vec![Diagnostic::error(err.to_string())],
        }
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Validation(msg) => tonic::Status::invalid_argument(msg),
            err @ ProviderError::InvalidConfig(_) => tonic::Status::invalid_argument(err.to_string()),
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::UnknownResource(msg) => tonic::Status::not_found(msg),
            err @ ProviderError::Generation { .. } => tonic::Status::unavailable(err.to_string()),
            ProviderError::Hash(err) => tonic::Status::internal(format!("Hash error: {}", err)),
            ProviderError::Import(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::ImportUnsupported(msg) => tonic::Status::unimplemented(msg),
            ProviderError::StateUpgrade(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::Serialization(err) => {
                tonic::Status::invalid_argument(format!("Serialization error: {}", err))
            },
            ProviderError::Transport(err) => {
                tonic::Status::unavailable(format!("Transport error: {}", err))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProviderError::Validation("length must be positive".to_string());
        assert_eq!(format!("{}", err), "Validation error: length must be positive");

        let err = ProviderError::UnknownResource("random_unicorn".to_string());
        assert_eq!(format!("{}", err), "Unknown resource type: random_unicorn");

        let err = ProviderError::generation("random_string", "entropy source closed");
        assert_eq!(
            format!("{}", err),
            "Generation error: random_string: entropy source closed"
        );
    }

    #[test]
    fn test_invalid_config_display_lists_diagnostics() {
        let err = ProviderError::InvalidConfig(vec![
            Diagnostic::error("Value too small").with_attribute("length"),
            Diagnostic::error("Conflicting values"),
        ]);
        assert_eq!(
            format!("{}", err),
            "Invalid configuration: Value too small (length); Conflicting values"
        );
    }

    #[test]
    fn test_error_to_status() {
        let status: tonic::Status = ProviderError::Validation("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        let status: tonic::Status = ProviderError::Configuration("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);

        let status: tonic::Status = ProviderError::UnknownResource("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::NotFound);

        let status: tonic::Status = ProviderError::generation("random_bytes", "boom").into();
        assert_eq!(status.code(), tonic::Code::Unavailable);

        let status: tonic::Status =
            ProviderError::ImportUnsupported("random_pet".to_string()).into();
        assert_eq!(status.code(), tonic::Code::Unimplemented);

        let status: tonic::Status = ProviderError::StateUpgrade("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);
    }

    #[test]
    fn test_generation_error_carries_retry_detail() {
        let diagnostics = ProviderError::generation("random_password", "no entropy").into_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].detail.as_deref(), Some(RETRY_DETAIL));
    }

    #[test]
    fn test_invalid_config_keeps_attribute_paths() {
        let diagnostics = ProviderError::InvalidConfig(vec![
            Diagnostic::error("Value too small").with_attribute("length"),
        ])
        .into_diagnostics();
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("length"));
    }

    #[test]
    fn test_message_method() {
        let err = ProviderError::Import("bad id".to_string());
        assert_eq!(err.message(), "bad id");

        let err = ProviderError::generation("random_uuid", "closed");
        assert_eq!(err.message(), "closed");
    }
}
