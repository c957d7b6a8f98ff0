use miette::Diagnostic;
use thiserror::Error;

/// Controller error type for reconciliation and apply operations
#[derive(Error, Debug, Diagnostic)]
pub enum ControllerError {
    /// Owner reference could not be attached to a child
    #[error("Failed to bind owner {owner} to child: {message}")]
    #[diagnostic(
        code(simpleapp::controller::owner_binding_failed),
        help("Register the owner type in the Scheme before starting the controller, and make sure the record was read back from the API server so it carries a uid")
    )]
    OwnerBindingFailed {
        #[allow(unused)]
        owner: String,
        #[allow(unused)]
        message: String,
    },

    /// The apply engine failed for one child
    #[error("Failed to apply {kind} '{name}': {source}")]
    #[diagnostic(
        code(simpleapp::controller::apply_failed),
        help("Children after this one were skipped for this pass. The scheduler will retry the whole pass")
    )]
    ApplyFailed {
        #[allow(unused)]
        kind: String,
        #[allow(unused)]
        name: String,
        #[source]
        #[diagnostic_source]
        source: Box<dyn Diagnostic + Send + Sync>,
    },

    /// HTTP request to the API server failed
    #[error("{method} {url} failed: {message}")]
    #[diagnostic(
        code(simpleapp::controller::api_request_failed),
        help("Verify the API server is reachable and the controller has RBAC access to this resource")
    )]
    ApiRequestFailed {
        #[allow(unused)]
        method: String,
        #[allow(unused)]
        url: String,
        #[allow(unused)]
        message: String,
    },

    /// Object already exists
    #[error("Object already exists: {resource_key}")]
    #[diagnostic(
        code(simpleapp::controller::already_exists),
        help("Another writer created this object first. The next pass will update it in place")
    )]
    AlreadyExists {
        #[allow(unused)]
        resource_key: String,
    },

    /// Object vanished between read and write
    #[error("Object not found: {resource_key}")]
    #[diagnostic(
        code(simpleapp::controller::not_found),
        help("The object was deleted concurrently. The next pass will recreate it if still desired")
    )]
    NotFound {
        #[allow(unused)]
        resource_key: String,
    },

    /// Stale resourceVersion on replace
    #[error("Conflict updating {resource_key}: expected resourceVersion {expected}, found {actual}")]
    #[diagnostic(
        code(simpleapp::controller::conflict),
        help("The object was modified concurrently. The next pass re-reads it and retries")
    )]
    Conflict {
        #[allow(unused)]
        resource_key: String,
        #[allow(unused)]
        expected: String,
        #[allow(unused)]
        actual: String,
    },

    /// Serialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(
        code(simpleapp::controller::serialization_error),
        help("The object returned by the API server does not match the expected schema")
    )]
    SerializationError {
        #[allow(unused)]
        message: String,
        #[source]
        #[allow(unused)]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal error
    #[error("Internal controller error: {message}")]
    #[diagnostic(
        code(simpleapp::controller::internal_error),
        help("This is likely a bug in simpleapp-controller. Please report it with the full error details")
    )]
    InternalError {
        #[allow(unused)]
        message: String,
    },
}

/// Result type alias for controller operations
pub type Result<T> = std::result::Result<T, ControllerError>;

impl ControllerError {
    pub fn owner_binding_failed(owner: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OwnerBindingFailed {
            owner: owner.into(),
            message: message.into(),
        }
    }

    pub fn apply_failed(
        kind: impl Into<String>,
        name: impl Into<String>,
        source: ControllerError,
    ) -> Self {
        Self::ApplyFailed {
            kind: kind.into(),
            name: name.into(),
            source: Box::new(source),
        }
    }

    pub fn api_request_failed(
        method: impl Into<String>,
        url: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ApiRequestFailed {
            method: method.into(),
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn already_exists(resource_key: impl Into<String>) -> Self {
        Self::AlreadyExists {
            resource_key: resource_key.into(),
        }
    }

    pub fn not_found(resource_key: impl Into<String>) -> Self {
        Self::NotFound {
            resource_key: resource_key.into(),
        }
    }

    pub fn conflict(
        resource_key: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            resource_key: resource_key.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn serialization_error(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::SerializationError {
            message: message.into(),
            source,
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}
