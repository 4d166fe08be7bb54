use k8s_openapi::api::apps::v1::Deployment;

pub static TRACK_LABEL: &str = "track";
pub static CANARY_TRACK: &str = "canary";

pub fn canary_name(name: &str, suffix: &str) -> String {
    format!("{}-{}", name, suffix)
}

pub fn is_canary(name: &str, suffix: &str) -> bool {
    name.ends_with(suffix)
}

/// Turns an already rewritten deployment into the canary object to create.
///
/// The result is renamed, its pod template is labelled `track=canary`, and every
/// server-assigned identity field is cleared so creating it can never be taken
/// as an update of the original. Containers are left as they are.
pub fn build_canary(mut deployment: Deployment, suffix: &str) -> Deployment {
    let metadata = &mut deployment.metadata;
    metadata.name = Some(canary_name(
        metadata.name.as_deref().unwrap_or_default(),
        suffix,
    ));
    metadata.resource_version = None;
    metadata.uid = None;
    metadata.creation_timestamp = None;
    metadata.generation = None;
    metadata.managed_fields = None;
    metadata.self_link = None;
    deployment.status = None;

    if let Some(spec) = deployment.spec.as_mut() {
        spec.template
            .metadata
            .get_or_insert_with(Default::default)
            .labels
            .get_or_insert_with(Default::default)
            .insert(TRACK_LABEL.to_string(), CANARY_TRACK.to_string());
    }

    deployment
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn deployment(value: serde_json::Value) -> Deployment {
        serde_json::from_value(value).expect("Invalid test deployment")
    }

    #[test]
    fn test_is_canary() {
        assert!(is_canary("api-grisou", "grisou"));
        assert!(!is_canary("api", "grisou"));
        assert!(!is_canary("grisou-api", "grisou"));
    }

    #[test]
    fn test_build_canary_renames_labels_and_clears_identity() {
        let original = deployment(json!({
            "metadata": {
                "name": "api",
                "namespace": "shop",
                "resourceVersion": "4711",
                "uid": "0b7f1b4e-6a1c-4f2e-9a43-5f1f1c1d2e3f",
                "generation": 3,
                "labels": {"app": "api"}
            },
            "spec": {
                "selector": {"matchLabels": {"app": "api"}},
                "template": {
                    "metadata": {"labels": {"app": "api", "track": "stable"}},
                    "spec": {"containers": [{"name": "app", "image": "acme/app:1.1"}]}
                }
            },
            "status": {"replicas": 2}
        }));

        let canary = build_canary(original, "grisou");

        assert_eq!(canary.metadata.name.as_deref(), Some("api-grisou"));
        assert_eq!(canary.metadata.namespace.as_deref(), Some("shop"));
        assert!(canary.metadata.resource_version.is_none());
        assert!(canary.metadata.uid.is_none());
        assert!(canary.metadata.generation.is_none());
        assert!(canary.status.is_none());

        let spec = canary.spec.unwrap();
        let labels = spec.template.metadata.unwrap().labels.unwrap();
        assert_eq!(labels.get("track").map(String::as_str), Some("canary"));
        assert_eq!(labels.get("app").map(String::as_str), Some("api"));

        let containers = spec.template.spec.unwrap().containers;
        assert_eq!(containers[0].image.as_deref(), Some("acme/app:1.1"));
    }

    #[test]
    fn test_build_canary_adds_labels_to_bare_template() {
        let original = deployment(json!({
            "metadata": {"name": "worker"},
            "spec": {
                "selector": {},
                "template": {"spec": {"containers": [{"name": "w", "image": "acme/w:2"}]}}
            }
        }));

        let canary = build_canary(original, "grisou");

        let labels = canary.spec.unwrap().template.metadata.unwrap().labels.unwrap();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels.get("track").map(String::as_str), Some("canary"));
    }
}
