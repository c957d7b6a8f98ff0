use crate::error::Result;
use crate::reconciler::{ReconcileAction, SimpleAppReconciler};
use crate::traits::SimpleAppSource;
use simpleapp_core::{ResourceKey, SimpleApp};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Configuration for the SimpleApp controller
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Interval between full reconcile cycles
    pub reconcile_interval: Duration,
    /// Only reconcile records in this namespace (all namespaces when `None`)
    pub namespace: Option<String>,
    /// Ingress annotations stamped on every route before per-record overrides
    pub default_ingress_annotations: BTreeMap<String, String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            reconcile_interval: Duration::from_secs(5),
            namespace: None,
            default_ingress_annotations: BTreeMap::new(),
        }
    }
}

/// Summary of one reconcile cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub done: usize,
    pub requeued: usize,
    pub failed: usize,
    /// Shortest requeue delay asked for during the cycle
    pub next_requeue: Option<Duration>,
}

/// Controller that periodically lists SimpleApps and reconciles each one
pub struct SimpleAppController {
    source: Arc<dyn SimpleAppSource>,
    reconciler: SimpleAppReconciler,
    config: ControllerConfig,
}

impl SimpleAppController {
    pub fn new(
        source: Arc<dyn SimpleAppSource>,
        reconciler: SimpleAppReconciler,
        config: ControllerConfig,
    ) -> Self {
        Self {
            source,
            reconciler,
            config,
        }
    }

    /// Run the controller until `token` is cancelled.
    ///
    /// Passes are cheap to restart, so a failed pass is only logged; the
    /// record is picked up again on the next cycle. A requeue shortens the
    /// wait before the next cycle.
    pub async fn run(&self, token: CancellationToken) -> Result<()> {
        info!(
            namespace = self.config.namespace.as_deref().unwrap_or("<all>"),
            interval_secs = self.config.reconcile_interval.as_secs(),
            "Starting SimpleApp controller"
        );

        loop {
            let wait = match self.reconcile_all().await {
                Ok(report) => report
                    .next_requeue
                    .map_or(self.config.reconcile_interval, |d| {
                        d.min(self.config.reconcile_interval)
                    }),
                Err(e) => {
                    error!("SimpleApp controller cycle failed: {}", e);
                    self.config.reconcile_interval
                }
            };

            tokio::select! {
                _ = token.cancelled() => {
                    info!("SimpleApp controller shutting down");
                    return Ok(());
                }
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// Reconcile every SimpleApp in scope once
    pub async fn reconcile_all(&self) -> Result<CycleReport> {
        debug!("Running SimpleApp reconcile cycle");

        let apps = self
            .source
            .list_simple_apps(self.config.namespace.as_deref())
            .await?;

        let mut report = CycleReport::default();
        for app in apps {
            let key = record_key(&app);
            match self.reconciler.reconcile(&key).await {
                Ok(ReconcileAction::Done) => report.done += 1,
                Ok(ReconcileAction::Requeue { after }) => {
                    debug!("SimpleApp {}/{} requeued", key.namespace, key.name);
                    report.requeued += 1;
                    // No hint means "soon": use the regular interval
                    let delay = after.unwrap_or(self.config.reconcile_interval);
                    report.next_requeue = Some(
                        report
                            .next_requeue
                            .map_or(delay, |current| current.min(delay)),
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        "Failed to reconcile SimpleApp {}/{}: {}",
                        key.namespace, key.name, e
                    );
                }
            }
        }

        if report.failed > 0 {
            error!(
                failed = report.failed,
                done = report.done,
                "SimpleApp reconcile cycle finished with failures"
            );
        }

        Ok(report)
    }
}

fn record_key(app: &SimpleApp) -> ResourceKey {
    ResourceKey::simple_app(app.namespace(), app.name())
}
