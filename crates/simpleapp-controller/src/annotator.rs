use crate::error::{ControllerError, Result};
use serde_json::{Map, Value};
use simpleapp_core::LAST_APPLIED_ANNOTATION;

/// Records the last object the controller applied in an annotation on the
/// object itself, so later passes can tell whether anything changed.
///
/// The annotation key is fixed when the annotator is constructed and handed to
/// the apply engine; nothing is configured process-wide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastAppliedAnnotator {
    key: String,
}

impl Default for LastAppliedAnnotator {
    fn default() -> Self {
        Self::new(LAST_APPLIED_ANNOTATION)
    }
}

impl LastAppliedAnnotator {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Store `object` (minus this annotation) under the annotation key
    pub fn set_last_applied(&self, object: &mut Value) -> Result<()> {
        let original = self.without_annotation(object);
        let encoded = serde_json::to_string(&original).map_err(|e| {
            ControllerError::serialization_error(
                format!("Failed to encode last-applied object: {}", e),
                Some(Box::new(e)),
            )
        })?;

        let metadata = object
            .as_object_mut()
            .ok_or_else(|| ControllerError::internal_error("object is not a JSON map"))?
            .entry("metadata")
            .or_insert_with(|| Value::Object(Map::new()));
        let annotations = metadata
            .as_object_mut()
            .ok_or_else(|| ControllerError::internal_error("metadata is not a JSON map"))?
            .entry("annotations")
            .or_insert_with(|| Value::Object(Map::new()));
        annotations
            .as_object_mut()
            .ok_or_else(|| ControllerError::internal_error("annotations is not a JSON map"))?
            .insert(self.key.clone(), Value::String(encoded));

        Ok(())
    }

    /// Decode the last applied object stored on a live object, if any
    pub fn last_applied(&self, live: &Value) -> Option<Value> {
        live.pointer("/metadata/annotations")
            .and_then(|a| a.get(&self.key))
            .and_then(Value::as_str)
            .and_then(|s| serde_json::from_str(s).ok())
    }

    /// JSON patch operations needed to turn the last applied object into
    /// `desired`. Without a stored annotation every field counts as changed.
    pub fn drift(&self, desired: &Value, live: &Value) -> json_patch::Patch {
        let original = self.last_applied(live).unwrap_or(Value::Null);
        json_patch::diff(&original, &self.without_annotation(desired))
    }

    /// True when `desired` matches what was last applied and the live object
    /// still carries every desired field.
    pub fn is_unchanged(&self, desired: &Value, live: &Value) -> bool {
        self.drift(desired, live).0.is_empty() && is_subset(desired, live)
    }

    fn without_annotation(&self, object: &Value) -> Value {
        let mut copy = object.clone();
        if let Some(annotations) = copy
            .pointer_mut("/metadata/annotations")
            .and_then(Value::as_object_mut)
        {
            annotations.remove(&self.key);
            if annotations.is_empty() {
                if let Some(metadata) = copy.get_mut("metadata").and_then(Value::as_object_mut) {
                    metadata.remove("annotations");
                }
            }
        }
        copy
    }
}

/// Every field in `desired` is present with the same value in `live`.
///
/// Objects may carry extra keys in `live` (server defaults, status);
/// arrays must match element-wise with equal length.
pub fn is_subset(desired: &Value, live: &Value) -> bool {
    match (desired, live) {
        (Value::Object(d), Value::Object(l)) => d
            .iter()
            .all(|(k, v)| l.get(k).is_some_and(|lv| is_subset(v, lv))),
        (Value::Array(d), Value::Array(l)) => {
            d.len() == l.len() && d.iter().zip(l).all(|(dv, lv)| is_subset(dv, lv))
        }
        (d, l) => d == l,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_and_read_last_applied() {
        let annotator = LastAppliedAnnotator::new("example.io/last-applied");
        let desired = json!({"metadata": {"name": "app"}, "spec": {"replicas": 2}});
        let mut object = desired.clone();

        annotator.set_last_applied(&mut object).unwrap();

        assert!(object["metadata"]["annotations"]["example.io/last-applied"].is_string());
        assert_eq!(annotator.last_applied(&object), Some(desired));
    }

    #[test]
    fn test_unchanged_after_apply() {
        let annotator = LastAppliedAnnotator::default();
        let desired = json!({"metadata": {"name": "app", "annotations": {"a": "b"}}, "spec": {"replicas": 2}});
        let mut live = desired.clone();
        annotator.set_last_applied(&mut live).unwrap();
        // Fields added by the API server do not count as drift
        live["metadata"]["uid"] = json!("1234");
        live["status"] = json!({"readyReplicas": 2});

        assert!(annotator.is_unchanged(&desired, &live));
    }

    #[test]
    fn test_spec_change_is_drift() {
        let annotator = LastAppliedAnnotator::default();
        let mut live = json!({"metadata": {"name": "app"}, "spec": {"replicas": 2}});
        annotator.set_last_applied(&mut live).unwrap();

        let desired = json!({"metadata": {"name": "app"}, "spec": {"replicas": 3}});
        assert!(!annotator.is_unchanged(&desired, &live));
        assert_eq!(annotator.drift(&desired, &live).0.len(), 1);
    }

    #[test]
    fn test_external_edit_is_drift() {
        let annotator = LastAppliedAnnotator::default();
        let desired = json!({"metadata": {"name": "app"}, "spec": {"replicas": 2}});
        let mut live = desired.clone();
        annotator.set_last_applied(&mut live).unwrap();
        live["spec"]["replicas"] = json!(10);

        assert!(!annotator.is_unchanged(&desired, &live));
    }

    #[test]
    fn test_missing_annotation_is_drift() {
        let annotator = LastAppliedAnnotator::default();
        let desired = json!({"metadata": {"name": "app"}});
        assert!(!annotator.is_unchanged(&desired, &desired.clone()));
    }

    #[test]
    fn test_is_subset_arrays_match_by_position() {
        assert!(is_subset(&json!([{"a": 1}]), &json!([{"a": 1, "b": 2}])));
        assert!(!is_subset(&json!(["/api", "/"]), &json!(["/", "/api"])));
        assert!(!is_subset(&json!([1]), &json!([1, 2])));
    }
}
