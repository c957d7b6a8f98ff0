use miette::Diagnostic;
use thiserror::Error;

/// Core error type for SimpleApp record handling
#[derive(Error, Debug, Diagnostic)]
pub enum SimpleAppError {
    /// Validation failed
    #[error("Validation failed for {resource_type}: {details}")]
    #[diagnostic(code(simpleapp::validation_failed), help("{help_text}"))]
    ValidationFailed {
        #[allow(unused)]
        resource_type: String,
        #[allow(unused)]
        details: String,
        #[allow(unused)]
        help_text: String,
    },

    /// Serialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(
        code(simpleapp::serialization_error),
        help("Ensure the manifest is valid JSON or YAML and matches the SimpleApp schema")
    )]
    SerializationError {
        #[allow(unused)]
        message: String,
        #[source]
        #[allow(unused)]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Result type alias for SimpleApp core operations
pub type Result<T> = std::result::Result<T, SimpleAppError>;

impl SimpleAppError {
    /// Create a ValidationFailed error
    pub fn validation_failed(
        resource_type: impl Into<String>,
        details: impl Into<String>,
        help_text: impl Into<String>,
    ) -> Self {
        Self::ValidationFailed {
            resource_type: resource_type.into(),
            details: details.into(),
            help_text: help_text.into(),
        }
    }

    /// Create a SerializationError
    pub fn serialization_error(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::SerializationError {
            message: message.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = SimpleAppError::validation_failed(
            "SimpleApp",
            "containerPort 0 is out of range",
            "Use a port between 1 and 65535",
        );
        assert!(matches!(err, SimpleAppError::ValidationFailed { .. }));
        assert!(err.to_string().contains("containerPort 0"));

        let err = SimpleAppError::serialization_error("bad manifest", None);
        assert!(matches!(err, SimpleAppError::SerializationError { .. }));
    }
}
