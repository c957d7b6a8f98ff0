use crate::child::{ChildKind, DesiredState};
use simpleapp_core::SimpleApp;

/// Presence decision for each child kind of one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activation {
    pub workload: DesiredState,
    pub service: DesiredState,
    pub route: DesiredState,
}

impl Activation {
    /// Decide presence from the record's flags.
    ///
    /// The workload has no toggle. Service and route are independent: a route
    /// stays present even when its backing service is disabled.
    pub fn for_app(app: &SimpleApp) -> Self {
        Self {
            workload: DesiredState::Present,
            service: DesiredState::from_enabled(app.spec.service_enabled),
            route: DesiredState::from_enabled(app.spec.ingress_enabled),
        }
    }

    pub fn for_kind(&self, kind: ChildKind) -> DesiredState {
        match kind {
            ChildKind::Workload => self.workload,
            ChildKind::NetworkService => self.service,
            ChildKind::Route => self.route,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simpleapp_core::SimpleAppSpec;

    fn app(service_enabled: bool, ingress_enabled: bool) -> SimpleApp {
        SimpleApp::new(
            "default",
            "app",
            SimpleAppSpec {
                service_enabled,
                ingress_enabled,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_workload_always_present() {
        for (svc, ing) in [(true, true), (true, false), (false, true), (false, false)] {
            assert_eq!(Activation::for_app(&app(svc, ing)).workload, DesiredState::Present);
        }
    }

    #[test]
    fn test_service_follows_flag() {
        for ing in [true, false] {
            assert_eq!(Activation::for_app(&app(false, ing)).service, DesiredState::Absent);
            assert_eq!(Activation::for_app(&app(true, ing)).service, DesiredState::Present);
        }
    }

    #[test]
    fn test_route_present_without_service() {
        // No cross-validation: the route may point at a service that is absent
        let activation = Activation::for_app(&app(false, true));
        assert_eq!(activation.service, DesiredState::Absent);
        assert_eq!(activation.route, DesiredState::Present);
    }

    #[test]
    fn test_for_kind() {
        let activation = Activation::for_app(&app(true, false));
        assert_eq!(activation.for_kind(ChildKind::Workload), DesiredState::Present);
        assert_eq!(activation.for_kind(ChildKind::NetworkService), DesiredState::Present);
        assert_eq!(activation.for_kind(ChildKind::Route), DesiredState::Absent);
    }
}
