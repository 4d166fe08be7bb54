use crate::secret_string::SecretString;
use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::path::PathBuf;
use std::{env, fs, path::Path};
use tracing::info;

pub const DEFAULT_CANARY_SUFFIX: &str = "grisou";
pub const DEFAULT_DOCKER_HUB_URL: &str = "https://hub.docker.com";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub webserver: Webserver,
    /// Namespace to scan, defaults to the namespace of the kube client
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub canary: Canary,
    #[serde(default)]
    pub registry: Registry,
    #[serde(default)]
    pub tls: Tls,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Webserver {
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Canary {
    pub suffix: String,
    pub label_selector: Option<String>,
    pub ignored_deployments: Vec<String>,
    pub max_concurrent_deployments: usize,
}

impl Default for Canary {
    fn default() -> Self {
        Canary {
            suffix: DEFAULT_CANARY_SUFFIX.to_string(),
            label_selector: None,
            ignored_deployments: Vec::new(),
            max_concurrent_deployments: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Registry {
    pub url: String,
    pub token: Option<SecretString>,
    pub page_size: u32,
    pub unsupported_hosts: Vec<String>,
    pub excluded_tags: Vec<String>,
}

impl Default for Registry {
    fn default() -> Self {
        Registry {
            url: DEFAULT_DOCKER_HUB_URL.to_string(),
            token: None,
            page_size: 25,
            unsupported_hosts: vec!["gcr.io".to_string(), "quay.io".to_string()],
            excluded_tags: vec!["latest".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tls {
    pub ca_certificate_paths: Vec<PathBuf>,
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    info!("Loading config from file {}", path.as_ref().display());
    let yaml_str = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

    let expanded = expand_env_vars(&yaml_str)?;

    let config: Config = serde_yaml_ng::from_str(&expanded)
        .context("Failed to parse YAML config after environment variable expansion")?;

    if config.canary.suffix.is_empty() {
        anyhow::bail!("canary.suffix must not be empty");
    }
    if config.canary.max_concurrent_deployments == 0 {
        anyhow::bail!("canary.maxConcurrentDeployments must be at least 1");
    }

    Ok(config)
}

/// Replaces `${VAR}` placeholders with environment variables values.
/// Returns an error naming every missing variable.
fn expand_env_vars(input: &str) -> Result<String> {
    let re =
        Regex::new(r"\$\{([^}]+)}").context("Invalid regex pattern for env var substitution")?;

    let mut missing = Vec::new();
    let result = re.replace_all(input, |caps: &regex::Captures| {
        let var_name = &caps[1];
        env::var(var_name).unwrap_or_else(|_| {
            missing.push(var_name.to_string());
            String::new()
        })
    });

    if !missing.is_empty() {
        anyhow::bail!("Missing environment variable(s): {}", missing.join(", "));
    }

    Ok(result.into_owned())
}
