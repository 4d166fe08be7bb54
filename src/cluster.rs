use anyhow::Context;
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::{ListParams, PostParams};
use kube::{Api, Client};
use std::future::Future;
use tracing::{debug, info};

static GRISOU_FIELD_MANAGER: &str = "grisou";

/// Read and create access to the Deployments grisou watches.
pub trait DeploymentStore: Send + Sync + 'static {
    fn list_deployments(&self) -> impl Future<Output = anyhow::Result<Vec<Deployment>>> + Send;

    /// Must create a new object; never updates an existing one.
    fn create_deployment(
        &self,
        deployment: &Deployment,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}

pub async fn create_client() -> anyhow::Result<Client> {
    info!("Initializing K8s client");
    let client = Client::try_default().await?;
    let api_server_info = client.apiserver_version().await?;
    info!(
        "Connected to namespace {}, Kubernetes API server with version {}.{}",
        client.default_namespace(),
        api_server_info.major,
        api_server_info.minor
    );
    Ok(client)
}

pub struct KubeDeploymentStore {
    api: Api<Deployment>,
    label_selector: Option<String>,
}

impl KubeDeploymentStore {
    pub fn new(client: Client, namespace: Option<&str>, label_selector: Option<String>) -> Self {
        let api = match namespace {
            Some(namespace) => Api::namespaced(client, namespace),
            None => Api::default_namespaced(client),
        };
        KubeDeploymentStore {
            api,
            label_selector,
        }
    }
}

impl DeploymentStore for KubeDeploymentStore {
    async fn list_deployments(&self) -> anyhow::Result<Vec<Deployment>> {
        let mut lp = ListParams::default();
        if let Some(selector) = &self.label_selector {
            // server-side filtering
            lp = lp.labels(selector);
        }
        let deployment_list = self.api.list(&lp).await?;
        debug!("Listed {} deployments", deployment_list.items.len());
        Ok(deployment_list.items)
    }

    async fn create_deployment(&self, deployment: &Deployment) -> anyhow::Result<()> {
        let pp = PostParams {
            field_manager: Some(GRISOU_FIELD_MANAGER.to_string()),
            ..PostParams::default()
        };
        self.api.create(&pp, deployment).await.with_context(|| {
            format!(
                "Failed to create deployment {}",
                deployment.metadata.name.as_deref().unwrap_or("<unnamed>")
            )
        })?;
        Ok(())
    }
}
