use crate::config::Registry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryClass {
    Supported,
    Unsupported(String),
}

/// Decides which repositories the tag resolver may be asked about.
/// Repositories hosted on an unsupported registry are never rewritten.
#[derive(Debug, Clone)]
pub struct RegistryPolicy {
    unsupported_hosts: Vec<String>,
}

impl RegistryPolicy {
    pub fn new(unsupported_hosts: Vec<String>) -> Self {
        RegistryPolicy { unsupported_hosts }
    }

    pub fn from_config(registry: &Registry) -> Self {
        Self::new(registry.unsupported_hosts.clone())
    }

    pub fn classify(&self, repository: &str) -> RegistryClass {
        match self
            .unsupported_hosts
            .iter()
            .find(|host| repository.starts_with(host.as_str()))
        {
            Some(host) => RegistryClass::Unsupported(host.clone()),
            None => RegistryClass::Supported,
        }
    }
}

impl Default for RegistryPolicy {
    fn default() -> Self {
        Self::from_config(&Registry::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_rejects_gcr_and_quay() {
        let policy = RegistryPolicy::default();
        assert_eq!(
            policy.classify("gcr.io/x"),
            RegistryClass::Unsupported("gcr.io".to_string())
        );
        assert_eq!(
            policy.classify("quay.io/prometheus/node-exporter"),
            RegistryClass::Unsupported("quay.io".to_string())
        );
    }

    #[test]
    fn test_default_policy_accepts_docker_hub_repositories() {
        let policy = RegistryPolicy::default();
        assert_eq!(policy.classify("acme/app"), RegistryClass::Supported);
        assert_eq!(policy.classify("nginx"), RegistryClass::Supported);
        assert_eq!(policy.classify("docker.io/library/redis"), RegistryClass::Supported);
    }

    #[test]
    fn test_custom_hosts() {
        let policy = RegistryPolicy::new(vec!["ghcr.io".to_string()]);
        assert_eq!(
            policy.classify("ghcr.io/acme/app"),
            RegistryClass::Unsupported("ghcr.io".to_string())
        );
        assert_eq!(policy.classify("gcr.io/x"), RegistryClass::Supported);
    }
}
