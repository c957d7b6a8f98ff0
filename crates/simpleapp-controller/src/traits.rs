use crate::child::{ChildResource, DesiredState, Requeue};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use simpleapp_core::{ResourceKey, SimpleApp};

/// Source of SimpleApp records
///
/// Implemented by `ApiClient` against a live API server and by `MockCluster`
/// for tests.
#[async_trait]
pub trait SimpleAppSource: Send + Sync {
    /// Fetch one record; `Ok(None)` when it does not exist
    async fn get_simple_app(&self, key: &ResourceKey) -> Result<Option<SimpleApp>>;

    /// List records, optionally restricted to one namespace
    async fn list_simple_apps(&self, namespace: Option<&str>) -> Result<Vec<SimpleApp>>;
}

/// Engine that drives one child object to the requested presence
///
/// Calling it repeatedly with the same child must converge to, and then stay
/// at, that state. `Ok(Some(_))` asks for the pass to be re-run later.
#[async_trait]
pub trait ResourceReconciler: Send + Sync {
    async fn reconcile_resource(
        &self,
        child: &ChildResource,
        state: DesiredState,
    ) -> Result<Option<Requeue>>;
}

/// Raw object CRUD used by `ApplyEngine`
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read an object; `Ok(None)` when it does not exist
    async fn get_object(&self, key: &ResourceKey) -> Result<Option<Value>>;

    /// Create an object, failing with `AlreadyExists` if present
    async fn create_object(&self, key: &ResourceKey, object: &Value) -> Result<Value>;

    /// Replace an existing object
    async fn replace_object(&self, key: &ResourceKey, object: &Value) -> Result<Value>;

    /// Delete an object
    async fn delete_object(&self, key: &ResourceKey) -> Result<()>;
}
