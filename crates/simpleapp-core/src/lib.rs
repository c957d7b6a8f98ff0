//! SimpleApp Core - Record and identity types for the SimpleApp controller
//!
//! This crate provides:
//! - The `SimpleApp` desired-state record and its defaults
//! - Error types with miette diagnostics
//! - Type-safe group/version/kind and object identity keys
//! - Serialization helpers

// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

pub mod error;
pub mod resources;
pub mod simpleapp;
pub mod types;

// Re-export commonly used types
pub use error::{Result, SimpleAppError};
pub use resources::{is_valid_name, Resource, ResourceError};
pub use simpleapp::{
    PullPolicy, SimpleApp, SimpleAppSpec, SimpleAppStatus, API_GROUP, API_VERSION, KIND,
    LAST_APPLIED_ANNOTATION, NAME_LABEL, TYPE_LABEL,
};
pub use types::{GroupVersionKind, ResourceKey};

// Re-export k8s-openapi types for convenience
pub use k8s_openapi;
pub use k8s_openapi::api::apps::v1::Deployment;
pub use k8s_openapi::api::core::v1::Service;
pub use k8s_openapi::api::networking::v1::Ingress;
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};

use std::path::Path;

/// Serialize a resource to YAML
pub fn to_yaml<T: serde::Serialize>(resource: &T) -> Result<String> {
    serde_yaml::to_string(resource).map_err(|e| {
        SimpleAppError::serialization_error(
            format!("Failed to serialize to YAML: {}", e),
            Some(Box::new(e)),
        )
    })
}

/// Deserialize a resource from YAML
pub fn from_yaml<T: for<'de> serde::Deserialize<'de>>(data: &str) -> Result<T> {
    serde_yaml::from_str(data).map_err(|e| {
        SimpleAppError::serialization_error(
            format!("Failed to deserialize from YAML: {}", e),
            Some(Box::new(e)),
        )
    })
}

/// Read a YAML manifest from disk
pub fn read_yaml_file<T: for<'de> serde::Deserialize<'de>>(path: &Path) -> Result<T> {
    let data = std::fs::read_to_string(path).map_err(|e| {
        SimpleAppError::serialization_error(
            format!("Failed to read manifest {}: {}", path.display(), e),
            Some(Box::new(e)),
        )
    })?;
    from_yaml(&data)
}
