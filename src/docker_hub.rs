use crate::config::Config;
use crate::secret_string::SecretString;
use anyhow::{Context, Result};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Certificate, Client};
use serde::Deserialize;
use std::fs;
use std::future::Future;
use tracing::{debug, info};

static DOCKER_HUB_HOSTS: [&str; 3] = ["docker.io/", "index.docker.io/", "registry-1.docker.io/"];

/// Source of "latest published tag" information for a repository.
pub trait TagResolver: Send + Sync + 'static {
    fn latest_tag(&self, repository: &str) -> impl Future<Output = Result<String>> + Send;
}

pub fn create_client(config: &Config) -> Result<Client> {
    info!("Initializing Docker Hub HTTP client");
    // System certificates are loaded automatically with rustls-tls-native-roots
    let mut client_builder = Client::builder();

    for file_path in &config.tls.ca_certificate_paths {
        let file_content = fs::read(file_path)
            .with_context(|| format!("Failed to read file {}", file_path.display()))?;
        let cert = Certificate::from_pem(&file_content).context("Failed to parse certificate")?;
        client_builder = client_builder.add_root_certificate(cert);
    }

    client_builder.build().context("Failed to build HTTP client")
}

#[derive(Debug, Deserialize)]
struct TagPage {
    results: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

#[derive(Debug, Clone)]
pub struct DockerHubClient {
    http_client: Client,
    base_url: String,
    token: Option<SecretString>,
    page_size: u32,
    excluded_tags: Vec<String>,
}

impl DockerHubClient {
    pub fn new(http_client: Client, config: &Config) -> Self {
        let registry = &config.registry;
        DockerHubClient {
            http_client,
            base_url: registry.url.trim_end_matches('/').to_string(),
            token: registry.token.clone().filter(|t| !t.is_empty()),
            page_size: registry.page_size,
            excluded_tags: registry.excluded_tags.clone(),
        }
    }

    fn tags_url(&self, repository: &str) -> String {
        format!(
            "{}/v2/repositories/{}/tags?page_size={}&ordering=last_updated",
            self.base_url,
            hub_repository_path(repository),
            self.page_size
        )
    }
}

impl TagResolver for DockerHubClient {
    async fn latest_tag(&self, repository: &str) -> Result<String> {
        let url = self.tags_url(repository);
        debug!("Fetching tags for {} from URL {}", repository, url);

        let mut request = self.http_client.get(&url).header(ACCEPT, "application/json");
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token.expose_secret()));
        }

        let response = request
            .send()
            .await
            .context("Failed to send request to fetch repository tags")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Docker Hub returned error status {} while fetching tags for {}",
                response.status(),
                repository
            );
        }

        let page: TagPage = response
            .json()
            .await
            .with_context(|| format!("Failed to decode tag list for {}", repository))?;

        newest_eligible_tag(page, &self.excluded_tags)
            .with_context(|| format!("Docker Hub lists no eligible tag for {}", repository))
    }
}

/// Maps an image repository onto its Docker Hub `namespace/name` path.
fn hub_repository_path(repository: &str) -> String {
    let repository = DOCKER_HUB_HOSTS
        .iter()
        .find_map(|host| repository.strip_prefix(*host))
        .unwrap_or(repository);

    if repository.contains('/') {
        repository.to_string()
    } else {
        format!("library/{}", repository)
    }
}

// Results arrive newest first because of `ordering=last_updated`.
fn newest_eligible_tag(page: TagPage, excluded_tags: &[String]) -> Option<String> {
    page.results
        .into_iter()
        .map(|entry| entry.name)
        .find(|name| !excluded_tags.iter().any(|excluded| excluded == name))
}
