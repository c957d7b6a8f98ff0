use crate::child::ChildResource;
use crate::error::{ControllerError, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use simpleapp_core::{GroupVersionKind, Resource};
use std::collections::BTreeSet;

/// Set of owner types the controller is allowed to stamp onto children
#[derive(Debug, Clone, Default)]
pub struct Scheme {
    kinds: BTreeSet<GroupVersionKind>,
}

impl Scheme {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scheme with the SimpleApp type registered
    pub fn with_simple_app() -> Self {
        let mut scheme = Self::new();
        scheme.register(GroupVersionKind::simple_app());
        scheme
    }

    pub fn register(&mut self, gvk: GroupVersionKind) {
        self.kinds.insert(gvk);
    }

    pub fn is_registered(&self, gvk: &GroupVersionKind) -> bool {
        self.kinds.contains(gvk)
    }

    /// Build a controller owner reference pointing at `owner`
    pub fn controller_owner_ref<R: Resource>(&self, owner: &R) -> Result<OwnerReference> {
        let gvk = owner.gvk();
        let name = owner.metadata().name.clone().unwrap_or_default();

        if !self.is_registered(&gvk) {
            return Err(ControllerError::owner_binding_failed(
                format!("{}/{}", gvk, name),
                format!("type {} is not registered in the scheme", gvk),
            ));
        }
        if name.is_empty() {
            return Err(ControllerError::owner_binding_failed(
                gvk.to_string(),
                "owner has no metadata.name",
            ));
        }
        let uid = owner.uid().ok_or_else(|| {
            ControllerError::owner_binding_failed(
                format!("{}/{}", gvk, name),
                "owner has no metadata.uid",
            )
        })?;

        Ok(OwnerReference {
            api_version: gvk.api_version(),
            kind: gvk.kind,
            name,
            uid: uid.to_string(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        })
    }
}

/// Stamp `owner` as the controlling owner of `child`.
///
/// A child already controlled by a different owner is rejected; a reference to
/// the same owner is replaced.
pub fn bind<R: Resource>(mut child: ChildResource, owner: &R, scheme: &Scheme) -> Result<ChildResource> {
    let owner_ref = scheme.controller_owner_ref(owner)?;

    let refs = child
        .metadata_mut()
        .owner_references
        .get_or_insert_with(Vec::new);

    if let Some(other) = refs
        .iter()
        .find(|r| r.controller == Some(true) && r.uid != owner_ref.uid)
    {
        return Err(ControllerError::owner_binding_failed(
            format!("{}/{}", owner_ref.kind, owner_ref.name),
            format!(
                "child is already controlled by {} '{}'",
                other.kind, other.name
            ),
        ));
    }

    refs.retain(|r| r.uid != owner_ref.uid);
    refs.push(owner_ref);

    Ok(child)
}
