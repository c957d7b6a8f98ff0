use crate::error::{ControllerError, Result};
use crate::traits::{ObjectStore, SimpleAppSource};
use async_trait::async_trait;
use serde_json::Value;
use simpleapp_core::{Resource, ResourceKey, SimpleApp};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Write counters, used to assert that a converged pass changes nothing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockStats {
    pub creates: usize,
    pub replaces: usize,
    pub deletes: usize,
}

#[derive(Debug, Default)]
struct MockState {
    apps: BTreeMap<ResourceKey, SimpleApp>,
    objects: BTreeMap<ResourceKey, Value>,
    next_version: u64,
    stats: MockStats,
}

impl MockState {
    fn bump_version(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }
}

/// In-memory stand-in for the API server
///
/// Holds SimpleApp records and child objects, assigns uids and
/// resourceVersions the way the API server does, rejects stale replaces, and
/// cascades record deletion to owned children the way the garbage collector
/// does.
#[derive(Debug, Clone, Default)]
pub struct MockCluster {
    state: Arc<RwLock<MockState>>,
}

impl MockCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record, assigning a uid if it has none. Returns the stored copy.
    pub async fn insert_simple_app(&self, mut app: SimpleApp) -> SimpleApp {
        let mut state = self.state.write().await;
        if app.metadata.uid.is_none() {
            app.metadata.uid = Some(Uuid::new_v4().to_string());
        }
        app.metadata.resource_version = Some(state.bump_version());
        let key = ResourceKey::simple_app(app.namespace(), app.name());
        debug!("Mock: record stored: {}", key);
        state.apps.insert(key, app.clone());
        app
    }

    /// Mutate a stored record in place. Returns false if it does not exist.
    pub async fn update_simple_app<F>(&self, key: &ResourceKey, f: F) -> bool
    where
        F: FnOnce(&mut SimpleApp),
    {
        let mut state = self.state.write().await;
        let version = state.bump_version();
        match state.apps.get_mut(key) {
            Some(app) => {
                f(app);
                app.metadata.resource_version = Some(version);
                true
            }
            None => false,
        }
    }

    /// Delete a record and every child whose owner references point at it
    pub async fn delete_simple_app(&self, key: &ResourceKey) -> Option<SimpleApp> {
        let mut state = self.state.write().await;
        let app = state.apps.remove(key)?;

        if let Some(uid) = app.uid() {
            let owned: Vec<ResourceKey> = state
                .objects
                .iter()
                .filter(|(_, obj)| is_owned_by(obj, uid))
                .map(|(k, _)| k.clone())
                .collect();
            for child in owned {
                debug!("Mock: garbage collecting {}", child);
                state.objects.remove(&child);
            }
        }

        Some(app)
    }

    /// Snapshot of one stored child object
    pub async fn object(&self, key: &ResourceKey) -> Option<Value> {
        self.state.read().await.objects.get(key).cloned()
    }

    /// Overwrite an object as an external writer would, bumping its version
    pub async fn put_object(&self, key: &ResourceKey, mut object: Value) {
        let mut state = self.state.write().await;
        let version = state.bump_version();
        set_metadata(&mut object, "resourceVersion", Value::String(version));
        state.objects.insert(key.clone(), object);
    }

    /// Keys of all stored child objects
    pub async fn object_keys(&self) -> Vec<ResourceKey> {
        self.state.read().await.objects.keys().cloned().collect()
    }

    pub async fn stats(&self) -> MockStats {
        self.state.read().await.stats
    }
}

fn is_owned_by(object: &Value, uid: &str) -> bool {
    object
        .pointer("/metadata/ownerReferences")
        .and_then(Value::as_array)
        .is_some_and(|refs| refs.iter().any(|r| r["uid"] == uid))
}

fn set_metadata(object: &mut Value, field: &str, value: Value) {
    if let Some(metadata) = object.get_mut("metadata").and_then(Value::as_object_mut) {
        metadata.insert(field.to_string(), value);
    }
}

#[async_trait]
impl SimpleAppSource for MockCluster {
    async fn get_simple_app(&self, key: &ResourceKey) -> Result<Option<SimpleApp>> {
        Ok(self.state.read().await.apps.get(key).cloned())
    }

    async fn list_simple_apps(&self, namespace: Option<&str>) -> Result<Vec<SimpleApp>> {
        let state = self.state.read().await;
        Ok(state
            .apps
            .iter()
            .filter(|(k, _)| namespace.map_or(true, |ns| k.namespace == ns))
            .map(|(_, app)| app.clone())
            .collect())
    }
}

#[async_trait]
impl ObjectStore for MockCluster {
    async fn get_object(&self, key: &ResourceKey) -> Result<Option<Value>> {
        Ok(self.object(key).await)
    }

    async fn create_object(&self, key: &ResourceKey, object: &Value) -> Result<Value> {
        let mut state = self.state.write().await;
        if state.objects.contains_key(key) {
            return Err(ControllerError::already_exists(key.to_string()));
        }

        let mut stored = object.clone();
        let version = state.bump_version();
        set_metadata(&mut stored, "uid", Value::String(Uuid::new_v4().to_string()));
        set_metadata(&mut stored, "resourceVersion", Value::String(version));

        state.objects.insert(key.clone(), stored.clone());
        state.stats.creates += 1;
        debug!("Mock: object created: {}", key);
        Ok(stored)
    }

    async fn replace_object(&self, key: &ResourceKey, object: &Value) -> Result<Value> {
        let mut state = self.state.write().await;
        let current = state
            .objects
            .get(key)
            .ok_or_else(|| ControllerError::not_found(key.to_string()))?;

        let current_version = current
            .pointer("/metadata/resourceVersion")
            .cloned()
            .unwrap_or(Value::Null);
        if let Some(expected) = object.pointer("/metadata/resourceVersion") {
            if *expected != current_version {
                return Err(ControllerError::conflict(
                    key.to_string(),
                    expected.to_string(),
                    current_version.to_string(),
                ));
            }
        }
        let uid = current.pointer("/metadata/uid").cloned();

        let mut stored = object.clone();
        if let Some(uid) = uid {
            set_metadata(&mut stored, "uid", uid);
        }
        let version = state.bump_version();
        set_metadata(&mut stored, "resourceVersion", Value::String(version));

        state.objects.insert(key.clone(), stored.clone());
        state.stats.replaces += 1;
        debug!("Mock: object replaced: {}", key);
        Ok(stored)
    }

    async fn delete_object(&self, key: &ResourceKey) -> Result<()> {
        let mut state = self.state.write().await;
        if state.objects.remove(key).is_none() {
            return Err(ControllerError::not_found(key.to_string()));
        }
        state.stats.deletes += 1;
        debug!("Mock: object deleted: {}", key);
        Ok(())
    }
}
