//! SimpleApp Controller - Converges Deployment, Service and Ingress children
//! toward the state declared by each SimpleApp record.

// Allow unused assignments for diagnostic fields - they're used by the thiserror/miette macros
#![allow(unused_assignments)]

pub mod activation;
pub mod annotator;
pub mod api_client;
pub mod apply;
pub mod child;
pub mod controller;
pub mod desired;
pub mod driver;
pub mod error;
pub mod mock;
pub mod owner;
pub mod reconciler;
pub mod traits;

// Re-export primary types
pub use activation::Activation;
pub use annotator::LastAppliedAnnotator;
pub use api_client::ApiClient;
pub use apply::{ApplyEngine, ApplyEngineConfig};
pub use child::{ChildKind, ChildResource, DesiredState, Requeue};
pub use controller::{ControllerConfig, CycleReport, SimpleAppController};
pub use desired::{generate, DesiredChildren, DesiredStateGenerator};
pub use driver::converge;
pub use error::{ControllerError, Result};
pub use mock::{MockCluster, MockStats};
pub use owner::{bind, Scheme};
pub use reconciler::{ReconcileAction, SimpleAppReconciler};
pub use traits::{ObjectStore, ResourceReconciler, SimpleAppSource};
