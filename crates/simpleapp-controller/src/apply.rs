use crate::annotator::LastAppliedAnnotator;
use crate::child::{ChildResource, DesiredState, Requeue};
use crate::error::Result;
use crate::traits::{ObjectStore, ResourceReconciler};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Configuration for the apply engine
#[derive(Debug, Clone, Default)]
pub struct ApplyEngineConfig {
    /// Ask for a requeue after creating an object so the next pass re-verifies it
    pub requeue_after_create: Option<Duration>,
}

/// Generic read-compare-write engine that makes one object present or absent.
///
/// Present objects are created when missing and replaced wholesale when the
/// last-applied annotation or the live object disagrees with the desired one.
/// There is no field-level merge; the desired object wins.
pub struct ApplyEngine {
    store: Arc<dyn ObjectStore>,
    annotator: LastAppliedAnnotator,
    config: ApplyEngineConfig,
}

impl ApplyEngine {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        annotator: LastAppliedAnnotator,
        config: ApplyEngineConfig,
    ) -> Self {
        Self {
            store,
            annotator,
            config,
        }
    }

    pub fn annotator(&self) -> &LastAppliedAnnotator {
        &self.annotator
    }

    async fn ensure_present(&self, child: &ChildResource) -> Result<Option<Requeue>> {
        let key = child.key()?;
        let desired = child.to_value()?;

        match self.store.get_object(&key).await? {
            None => {
                let mut object = desired;
                self.annotator.set_last_applied(&mut object)?;
                self.store.create_object(&key, &object).await?;
                info!("Created {}", key);
                Ok(self.config.requeue_after_create.map(Requeue::after))
            }
            Some(live) => {
                if self.annotator.is_unchanged(&desired, &live) {
                    debug!("{} is up to date", key);
                    return Ok(None);
                }

                let drift = self.annotator.drift(&desired, &live);
                let mut object = desired;
                self.annotator.set_last_applied(&mut object)?;
                carry_resource_version(&live, &mut object);
                self.store.replace_object(&key, &object).await?;
                info!("Updated {} ({} changed fields)", key, drift.0.len());
                Ok(None)
            }
        }
    }

    async fn ensure_absent(&self, child: &ChildResource) -> Result<Option<Requeue>> {
        let key = child.key()?;

        if self.store.get_object(&key).await?.is_none() {
            debug!("{} already absent", key);
            return Ok(None);
        }

        self.store.delete_object(&key).await?;
        info!("Deleted {}", key);
        Ok(None)
    }
}

/// Copy `metadata.resourceVersion` from the live object so the replace is
/// rejected if someone else wrote in between
fn carry_resource_version(live: &Value, object: &mut Value) {
    let version = live.pointer("/metadata/resourceVersion").cloned();
    if let (Some(version), Some(metadata)) = (
        version,
        object.get_mut("metadata").and_then(Value::as_object_mut),
    ) {
        metadata.insert("resourceVersion".to_string(), version);
    }
}

#[async_trait]
impl ResourceReconciler for ApplyEngine {
    async fn reconcile_resource(
        &self,
        child: &ChildResource,
        state: DesiredState,
    ) -> Result<Option<Requeue>> {
        match state {
            DesiredState::Present => self.ensure_present(child).await,
            DesiredState::Absent => self.ensure_absent(child).await,
        }
    }
}
