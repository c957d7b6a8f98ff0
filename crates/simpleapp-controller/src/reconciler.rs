use crate::activation::Activation;
use crate::child::{ChildResource, DesiredState};
use crate::desired::DesiredStateGenerator;
use crate::driver::converge;
use crate::error::Result;
use crate::owner::{bind, Scheme};
use crate::traits::{ResourceReconciler, SimpleAppSource};
use simpleapp_core::{ResourceKey, SimpleApp};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Children match the record; nothing left to do
    Done,
    /// Run the pass again; `after` is a hint, the scheduler picks the timing
    Requeue { after: Option<Duration> },
}

/// Reconciles one SimpleApp identity per call
pub struct SimpleAppReconciler {
    source: Arc<dyn SimpleAppSource>,
    applier: Arc<dyn ResourceReconciler>,
    scheme: Arc<Scheme>,
    generator: DesiredStateGenerator,
}

impl SimpleAppReconciler {
    pub fn new(
        source: Arc<dyn SimpleAppSource>,
        applier: Arc<dyn ResourceReconciler>,
        scheme: Arc<Scheme>,
        generator: DesiredStateGenerator,
    ) -> Self {
        Self {
            source,
            applier,
            scheme,
            generator,
        }
    }

    /// Fetch the record and converge its children.
    ///
    /// A record that no longer exists finishes the pass: its children are
    /// left to the cluster's garbage collector via their owner references.
    pub async fn reconcile(&self, key: &ResourceKey) -> Result<ReconcileAction> {
        debug!("Reconciling SimpleApp {}/{}", key.namespace, key.name);

        let app = match self.source.get_simple_app(key).await? {
            Some(app) => app,
            None => {
                debug!(
                    "SimpleApp {}/{} not found, nothing to do",
                    key.namespace, key.name
                );
                return Ok(ReconcileAction::Done);
            }
        };

        let plan = self.plan(&app)?;

        match converge(self.applier.as_ref(), &plan).await? {
            Some(requeue) => Ok(ReconcileAction::Requeue {
                after: requeue.after,
            }),
            None => {
                info!("SimpleApp {}/{} reconciled", key.namespace, key.name);
                Ok(ReconcileAction::Done)
            }
        }
    }

    /// Generate, bind and decide presence for every child of `app`, in apply order
    pub fn plan(&self, app: &SimpleApp) -> Result<Vec<(ChildResource, DesiredState)>> {
        let activation = Activation::for_app(app);

        self.generator
            .generate(app)
            .into_ordered()
            .into_iter()
            .map(|child| {
                let state = activation.for_kind(child.kind());
                bind(child, app, &self.scheme).map(|bound| (bound, state))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::{ApplyEngine, ApplyEngineConfig};
    use crate::child::ChildKind;
    use crate::driver::tests::RecordingReconciler;
    use crate::error::ControllerError;
    use crate::mock::MockCluster;
    use simpleapp_core::SimpleAppSpec;

    fn scenario_spec() -> SimpleAppSpec {
        SimpleAppSpec {
            image: "nginx:latest".to_string(),
            container_port: 8080,
            replicas: Some(3),
            service_enabled: true,
            service_port: 80,
            ingress_enabled: true,
            hostname: "app.example.com".to_string(),
            ingress_paths: vec!["/".to_string()],
            ..Default::default()
        }
    }

    async fn cluster_with(spec: SimpleAppSpec) -> (Arc<MockCluster>, ResourceKey) {
        let cluster = Arc::new(MockCluster::new());
        let app = cluster
            .insert_simple_app(SimpleApp::new("default", "app", spec))
            .await;
        let key = ResourceKey::simple_app(app.namespace(), app.name());
        (cluster, key)
    }

    fn reconciler(
        cluster: Arc<MockCluster>,
        applier: Arc<dyn ResourceReconciler>,
    ) -> SimpleAppReconciler {
        SimpleAppReconciler::new(
            cluster,
            applier,
            Arc::new(Scheme::with_simple_app()),
            DesiredStateGenerator::default(),
        )
    }

    fn engine(cluster: Arc<MockCluster>) -> Arc<ApplyEngine> {
        Arc::new(ApplyEngine::new(
            cluster,
            Default::default(),
            ApplyEngineConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_not_found_is_done_without_apply_calls() {
        let cluster = Arc::new(MockCluster::new());
        let applier = Arc::new(RecordingReconciler::default());
        let r = reconciler(cluster, applier.clone());

        let action = r
            .reconcile(&ResourceKey::simple_app("default", "missing"))
            .await
            .unwrap();

        assert_eq!(action, ReconcileAction::Done);
        assert!(applier.calls().is_empty());
    }

    #[tokio::test]
    async fn test_scenario_creates_all_children() {
        let (cluster, key) = cluster_with(scenario_spec()).await;
        let r = reconciler(cluster.clone(), engine(cluster.clone()));

        assert_eq!(r.reconcile(&key).await.unwrap(), ReconcileAction::Done);

        let deployment = cluster
            .object(&ResourceKey::new(ChildKind::Workload.gvk(), "default", "app"))
            .await
            .unwrap();
        assert_eq!(deployment["spec"]["replicas"], 3);
        assert_eq!(
            deployment["spec"]["template"]["spec"]["containers"][0]["ports"][0]["containerPort"],
            8080
        );

        let service = cluster
            .object(&ResourceKey::new(ChildKind::NetworkService.gvk(), "default", "app"))
            .await
            .unwrap();
        assert_eq!(service["spec"]["ports"][0]["port"], 80);
        assert_eq!(service["spec"]["ports"][0]["targetPort"], 8080);

        let ingress = cluster
            .object(&ResourceKey::new(ChildKind::Route.gvk(), "default", "app"))
            .await
            .unwrap();
        let rule = &ingress["spec"]["rules"][0];
        assert_eq!(rule["host"], "app.example.com");
        assert_eq!(rule["http"]["paths"][0]["path"], "/");
        assert_eq!(rule["http"]["paths"][0]["backend"]["service"]["name"], "app");
        assert_eq!(
            rule["http"]["paths"][0]["backend"]["service"]["port"]["number"],
            8080
        );
    }

    #[tokio::test]
    async fn test_second_pass_is_a_no_op() {
        let (cluster, key) = cluster_with(scenario_spec()).await;
        let r = reconciler(cluster.clone(), engine(cluster.clone()));

        r.reconcile(&key).await.unwrap();
        let after_first = cluster.stats().await;
        assert_eq!(after_first.creates, 3);

        r.reconcile(&key).await.unwrap();
        assert_eq!(cluster.stats().await, after_first);
    }

    #[tokio::test]
    async fn test_service_disabled_route_still_applied() {
        // Dangling route is current behaviour: no cross-validation between the flags
        let mut spec = scenario_spec();
        spec.service_enabled = false;
        let (cluster, key) = cluster_with(spec).await;
        let applier = Arc::new(RecordingReconciler::default());
        let r = reconciler(cluster, applier.clone());

        r.reconcile(&key).await.unwrap();

        assert_eq!(
            applier.calls(),
            vec![
                (ChildKind::Workload, DesiredState::Present),
                (ChildKind::NetworkService, DesiredState::Absent),
                (ChildKind::Route, DesiredState::Present),
            ]
        );
    }

    #[tokio::test]
    async fn test_disabling_service_deletes_it() {
        let (cluster, key) = cluster_with(scenario_spec()).await;
        let r = reconciler(cluster.clone(), engine(cluster.clone()));
        r.reconcile(&key).await.unwrap();

        let service_key = ResourceKey::new(ChildKind::NetworkService.gvk(), "default", "app");
        assert!(cluster.object(&service_key).await.is_some());

        cluster
            .update_simple_app(&key, |app| app.spec.service_enabled = false)
            .await;
        r.reconcile(&key).await.unwrap();

        assert!(cluster.object(&service_key).await.is_none());
        assert_eq!(cluster.stats().await.deletes, 1);
    }

    #[tokio::test]
    async fn test_apply_failure_skips_later_children() {
        let (cluster, key) = cluster_with(scenario_spec()).await;
        let applier = Arc::new(RecordingReconciler {
            fail_on: Some(ChildKind::Workload),
            ..Default::default()
        });
        let r = reconciler(cluster, applier.clone());

        let err = r.reconcile(&key).await.unwrap_err();
        assert!(matches!(err, ControllerError::ApplyFailed { .. }));
        assert_eq!(applier.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_requeue_surfaces_as_action() {
        let (cluster, key) = cluster_with(scenario_spec()).await;
        let applier = Arc::new(RecordingReconciler {
            requeue_on: Some(ChildKind::Workload),
            ..Default::default()
        });
        let r = reconciler(cluster, applier.clone());

        let action = r.reconcile(&key).await.unwrap();
        assert_eq!(
            action,
            ReconcileAction::Requeue {
                after: Some(Duration::from_secs(3))
            }
        );
        assert_eq!(applier.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_unregistered_owner_type_aborts_pass() {
        let (cluster, key) = cluster_with(scenario_spec()).await;
        let applier = Arc::new(RecordingReconciler::default());
        let r = SimpleAppReconciler::new(
            cluster,
            applier.clone(),
            Arc::new(Scheme::new()),
            DesiredStateGenerator::default(),
        );

        let err = r.reconcile(&key).await.unwrap_err();
        assert!(matches!(err, ControllerError::OwnerBindingFailed { .. }));
        assert!(applier.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_paths_route_still_applied() {
        let mut spec = scenario_spec();
        spec.ingress_paths.clear();
        let (cluster, key) = cluster_with(spec).await;
        let r = reconciler(cluster.clone(), engine(cluster.clone()));

        r.reconcile(&key).await.unwrap();

        let ingress = cluster
            .object(&ResourceKey::new(ChildKind::Route.gvk(), "default", "app"))
            .await
            .unwrap();
        assert_eq!(ingress["spec"]["rules"][0]["http"]["paths"], serde_json::json!([]));
    }
}
