use crate::child::{ChildResource, DesiredState, Requeue};
use crate::error::{ControllerError, Result};
use crate::traits::ResourceReconciler;
use tracing::{debug, info};

/// Apply each child in order, stopping at the first error or requeue.
///
/// Later children are not touched once an earlier one fails or asks to be
/// requeued; the next pass regenerates everything and picks up from scratch.
pub async fn converge(
    applier: &dyn ResourceReconciler,
    children: &[(ChildResource, DesiredState)],
) -> Result<Option<Requeue>> {
    for (child, state) in children {
        let kind = child.kind();
        debug!(
            kind = %kind,
            namespace = child.namespace(),
            name = child.name(),
            state = %state,
            "Reconciling child"
        );

        match applier.reconcile_resource(child, *state).await {
            Ok(None) => {}
            Ok(Some(requeue)) => {
                info!(
                    "Requeue requested while reconciling {} {}/{}, deferring remaining children",
                    kind,
                    child.namespace(),
                    child.name()
                );
                return Ok(Some(requeue));
            }
            Err(e) => {
                return Err(ControllerError::apply_failed(kind.to_string(), child.name(), e));
            }
        }
    }

    Ok(None)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::child::ChildKind;
    use crate::desired::generate;
    use async_trait::async_trait;
    use miette::Diagnostic;
    use simpleapp_core::{SimpleApp, SimpleAppSpec};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records every call and can be told to fail or requeue on one kind
    #[derive(Default)]
    pub(crate) struct RecordingReconciler {
        pub calls: Mutex<Vec<(ChildKind, DesiredState)>>,
        pub fail_on: Option<ChildKind>,
        pub requeue_on: Option<ChildKind>,
    }

    impl RecordingReconciler {
        pub fn calls(&self) -> Vec<(ChildKind, DesiredState)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ResourceReconciler for RecordingReconciler {
        async fn reconcile_resource(
            &self,
            child: &ChildResource,
            state: DesiredState,
        ) -> Result<Option<Requeue>> {
            self.calls.lock().unwrap().push((child.kind(), state));
            if self.fail_on == Some(child.kind()) {
                return Err(ControllerError::internal_error("injected failure"));
            }
            if self.requeue_on == Some(child.kind()) {
                return Ok(Some(Requeue::after(Duration::from_secs(3))));
            }
            Ok(None)
        }
    }

    fn children() -> Vec<(ChildResource, DesiredState)> {
        let app = SimpleApp::new("default", "app", SimpleAppSpec::default());
        generate(&app)
            .into_ordered()
            .into_iter()
            .map(|c| (c, DesiredState::Present))
            .collect()
    }

    #[tokio::test]
    async fn test_converge_applies_in_order() {
        let applier = RecordingReconciler::default();
        let result = converge(&applier, &children()).await.unwrap();

        assert!(result.is_none());
        let kinds: Vec<_> = applier.calls().into_iter().map(|(k, _)| k).collect();
        assert_eq!(kinds, ChildKind::ORDER.to_vec());
    }

    #[tokio::test]
    async fn test_converge_stops_at_first_error() {
        let applier = RecordingReconciler {
            fail_on: Some(ChildKind::Workload),
            ..Default::default()
        };
        let err = converge(&applier, &children()).await.unwrap_err();

        assert!(matches!(err, ControllerError::ApplyFailed { .. }));
        assert!(err.to_string().contains("Deployment 'app'"));
        assert_eq!(
            err.diagnostic_source().and_then(|d| d.code()).map(|c| c.to_string()),
            Some("simpleapp::controller::internal_error".to_string())
        );
        assert_eq!(applier.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_converge_defers_after_requeue() {
        let applier = RecordingReconciler {
            requeue_on: Some(ChildKind::NetworkService),
            ..Default::default()
        };
        let result = converge(&applier, &children()).await.unwrap();

        assert_eq!(result, Some(Requeue::after(Duration::from_secs(3))));
        let kinds: Vec<_> = applier.calls().into_iter().map(|(k, _)| k).collect();
        assert_eq!(kinds, vec![ChildKind::Workload, ChildKind::NetworkService]);
    }
}
