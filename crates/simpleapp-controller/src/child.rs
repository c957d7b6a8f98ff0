use crate::error::{ControllerError, Result};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use simpleapp_core::{GroupVersionKind, Resource, ResourceKey};
use std::fmt;
use std::time::Duration;

/// The three kinds of object a SimpleApp owns, in apply order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildKind {
    Workload,
    NetworkService,
    Route,
}

impl ChildKind {
    /// Fixed apply order for one reconciliation pass
    pub const ORDER: [ChildKind; 3] = [
        ChildKind::Workload,
        ChildKind::NetworkService,
        ChildKind::Route,
    ];

    /// Kubernetes type backing this kind
    pub fn gvk(&self) -> GroupVersionKind {
        match self {
            ChildKind::Workload => GroupVersionKind::deployment(),
            ChildKind::NetworkService => GroupVersionKind::service(),
            ChildKind::Route => GroupVersionKind::ingress(),
        }
    }
}

impl fmt::Display for ChildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChildKind::Workload => "Deployment",
            ChildKind::NetworkService => "Service",
            ChildKind::Route => "Ingress",
        };
        write!(f, "{}", s)
    }
}

/// Whether a child should exist after the pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesiredState {
    Present,
    Absent,
}

impl DesiredState {
    /// Map an `*Enabled` flag to a presence decision
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            DesiredState::Present
        } else {
            DesiredState::Absent
        }
    }
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DesiredState::Present => write!(f, "present"),
            DesiredState::Absent => write!(f, "absent"),
        }
    }
}

/// Request from the apply engine to run the pass again later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Requeue {
    /// Delay before the next pass; `None` lets the scheduler decide
    pub after: Option<Duration>,
}

impl Requeue {
    pub fn after(delay: Duration) -> Self {
        Self { after: Some(delay) }
    }
}

/// A generated child object
#[derive(Debug, Clone, PartialEq)]
pub enum ChildResource {
    Workload(Deployment),
    NetworkService(Service),
    Route(Ingress),
}

impl ChildResource {
    pub fn kind(&self) -> ChildKind {
        match self {
            ChildResource::Workload(_) => ChildKind::Workload,
            ChildResource::NetworkService(_) => ChildKind::NetworkService,
            ChildResource::Route(_) => ChildKind::Route,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            ChildResource::Workload(d) => d.metadata(),
            ChildResource::NetworkService(s) => s.metadata(),
            ChildResource::Route(i) => i.metadata(),
        }
    }

    pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match self {
            ChildResource::Workload(d) => d.metadata_mut(),
            ChildResource::NetworkService(s) => s.metadata_mut(),
            ChildResource::Route(i) => i.metadata_mut(),
        }
    }

    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    pub fn namespace(&self) -> &str {
        self.metadata().namespace.as_deref().unwrap_or_default()
    }

    /// Identity used to look the object up in the cluster
    pub fn key(&self) -> Result<ResourceKey> {
        let result = match self {
            ChildResource::Workload(d) => d.resource_key(),
            ChildResource::NetworkService(s) => s.resource_key(),
            ChildResource::Route(i) => i.resource_key(),
        };
        result.map_err(|e| ControllerError::internal_error(format!("{} child: {}", self.kind(), e)))
    }

    /// Serialize to the JSON object sent to the API server
    pub fn to_value(&self) -> Result<serde_json::Value> {
        let result = match self {
            ChildResource::Workload(d) => serde_json::to_value(d),
            ChildResource::NetworkService(s) => serde_json::to_value(s),
            ChildResource::Route(i) => serde_json::to_value(i),
        };
        result.map_err(|e| {
            ControllerError::serialization_error(
                format!("Failed to serialize {} '{}': {}", self.kind(), self.name(), e),
                Some(Box::new(e)),
            )
        })
    }
}
