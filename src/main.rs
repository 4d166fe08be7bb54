use crate::cluster::KubeDeploymentStore;
use crate::controller::CanaryController;
use crate::docker_hub::DockerHubClient;
use crate::state::{ControllerContext, ScanHealth};
use std::env;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod canary;
mod cluster;
mod config;
mod controller;
mod docker_hub;
mod image_reference;
mod registry_policy;
mod secret_string;
mod state;
mod webserver;

#[cfg(target_env = "musl")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    info!("Starting grisou {}", env!("CARGO_PKG_VERSION"));

    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
    let config = config::load_config(&config_path)?;

    let kube_client = cluster::create_client().await?;
    let store = KubeDeploymentStore::new(
        kube_client,
        config.namespace.as_deref(),
        config.canary.label_selector.clone(),
    );
    let http_client = docker_hub::create_client(&config)?;
    let resolver = DockerHubClient::new(http_client, &config);

    let ctx = ControllerContext {
        controller: Arc::new(CanaryController::new(store, resolver, &config)?),
        health: Arc::new(ScanHealth::default()),
    };
    let health = ctx.health.clone();

    let cron_schedule = env::var("CRON_SCHEDULE").unwrap_or_else(|_| "0 */5 * * * *".to_string());
    info!("Executing job scheduler at cron schedule {}", cron_schedule);
    let mut scheduler = JobScheduler::new().await?;

    let job = Job::new_async(cron_schedule, move |_uuid, _l| {
        let ctx = ctx.clone();
        Box::pin(async move {
            info!("Scanning deployments for outdated images");
            match ctx.controller.check().await {
                Ok(report) => {
                    for failure in &report.failures {
                        warn!(
                            "Canary for deployment {} was not created: {:?}",
                            failure.deployment, failure.error
                        );
                    }
                    ctx.health.record(true);
                }
                Err(e) => {
                    error!("Error running canary scan: {:?}", e);
                    ctx.health.record(false);
                }
            }
        })
    })?;
    scheduler.add(job).await?;
    scheduler.start().await?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {:?}", e);
                return;
            }
            info!("Shutdown signal received");
            shutdown.cancel();
        }
    });

    let app = webserver::create_app(health);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.webserver.port));
    info!("Starting webserver on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    scheduler.shutdown().await?;
    info!("grisou stopped");

    Ok(())
}
