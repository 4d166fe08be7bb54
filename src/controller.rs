use crate::canary::{build_canary, is_canary};
use crate::cluster::DeploymentStore;
use crate::config::Config;
use crate::docker_hub::TagResolver;
use crate::image_reference::ImageReference;
use crate::registry_policy::{RegistryClass, RegistryPolicy};
use anyhow::Context;
use futures::{StreamExt, stream};
use globset::{Glob, GlobSet, GlobSetBuilder};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Container;
use tracing::{debug, error, info, warn};

/// Outcome of the decision engine for a single deployment.
#[derive(Debug)]
pub struct Evaluation {
    /// Copy of the input with outdated containers pointing at their latest tag
    pub deployment: Deployment,
    pub needs_canary: bool,
}

#[derive(Debug)]
pub struct PublishFailure {
    pub deployment: String,
    pub error: anyhow::Error,
}

#[derive(Debug, Default)]
pub struct ScanReport {
    pub scanned: usize,
    pub canaries_created: Vec<String>,
    pub skipped_canaries: Vec<String>,
    pub ignored: Vec<String>,
    pub up_to_date: Vec<String>,
    pub failures: Vec<PublishFailure>,
}

enum Outcome {
    SkippedCanary(String),
    Ignored(String),
    UpToDate(String),
    Created(String),
    Failed(PublishFailure),
}

impl ScanReport {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::SkippedCanary(name) => self.skipped_canaries.push(name),
            Outcome::Ignored(name) => self.ignored.push(name),
            Outcome::UpToDate(name) => self.up_to_date.push(name),
            Outcome::Created(name) => self.canaries_created.push(name),
            Outcome::Failed(failure) => self.failures.push(failure),
        }
    }
}

pub struct CanaryController<S, R> {
    store: S,
    resolver: R,
    policy: RegistryPolicy,
    suffix: String,
    ignored_deployments: GlobSet,
    max_concurrent_deployments: usize,
}

impl<S: DeploymentStore, R: TagResolver> CanaryController<S, R> {
    pub fn new(store: S, resolver: R, config: &Config) -> anyhow::Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.canary.ignored_deployments {
            builder.add(
                Glob::new(pattern)
                    .with_context(|| format!("Invalid ignored deployment pattern {}", pattern))?,
            );
        }

        Ok(CanaryController {
            store,
            resolver,
            policy: RegistryPolicy::from_config(&config.registry),
            suffix: config.canary.suffix.clone(),
            ignored_deployments: builder
                .build()
                .context("Failed to build ignored deployment patterns")?,
            max_concurrent_deployments: config.canary.max_concurrent_deployments.max(1),
        })
    }

    /// Runs one scan pass over every deployment in the store.
    ///
    /// Only a failure to list deployments aborts the scan. Failing to create a
    /// canary is recorded in the returned report and the scan moves on.
    pub async fn check(&self) -> anyhow::Result<ScanReport> {
        let deployments = self
            .store
            .list_deployments()
            .await
            .context("Couldn't retrieve Kubernetes deployments")?;

        let mut report = ScanReport {
            scanned: deployments.len(),
            ..ScanReport::default()
        };

        let outcomes: Vec<Outcome> = stream::iter(deployments)
            .map(|deployment| self.process(deployment))
            .buffer_unordered(self.max_concurrent_deployments)
            .collect()
            .await;

        for outcome in outcomes {
            report.record(outcome);
        }

        info!(
            "Scanned {} deployments: {} canaries created, {} up to date, {} canaries and {} ignored skipped, {} publish failures",
            report.scanned,
            report.canaries_created.len(),
            report.up_to_date.len(),
            report.skipped_canaries.len(),
            report.ignored.len(),
            report.failures.len()
        );

        Ok(report)
    }

    async fn process(&self, deployment: Deployment) -> Outcome {
        let name = deployment.metadata.name.clone().unwrap_or_default();
        debug!("Checking deployment {}", name);

        if is_canary(&name, &self.suffix) {
            debug!("Skipping deployment {}, it is a canary", name);
            return Outcome::SkippedCanary(name);
        }
        if self.ignored_deployments.is_match(&name) {
            debug!("Skipping deployment {}, it matches an ignored pattern", name);
            return Outcome::Ignored(name);
        }

        let evaluation = self.evaluate(&deployment).await;
        if !evaluation.needs_canary {
            debug!("Skipping deployment {}, all images are up to date", name);
            return Outcome::UpToDate(name);
        }

        let canary = build_canary(evaluation.deployment, &self.suffix);
        let canary_name = canary.metadata.name.clone().unwrap_or_default();
        info!("Creating canary deployment {} for {}", canary_name, name);

        match self.store.create_deployment(&canary).await {
            Ok(()) => {
                info!("Successfully created canary deployment {}", canary_name);
                Outcome::Created(canary_name)
            }
            Err(e) => {
                error!("Failed to create canary for deployment {}: {:?}", name, e);
                Outcome::Failed(PublishFailure {
                    deployment: name,
                    error: e,
                })
            }
        }
    }

    /// Decides whether `deployment` needs a canary.
    ///
    /// Works on a copy: the returned deployment has every outdated container on
    /// a supported registry rewritten to its latest tag, all other containers
    /// are untouched.
    pub async fn evaluate(&self, deployment: &Deployment) -> Evaluation {
        let mut candidate = deployment.clone();
        let name = deployment.metadata.name.as_deref().unwrap_or_default();

        if is_canary(name, &self.suffix) {
            return Evaluation {
                deployment: candidate,
                needs_canary: false,
            };
        }

        let mut needs_canary = false;
        let containers = candidate
            .spec
            .as_mut()
            .and_then(|spec| spec.template.spec.as_mut())
            .map(|pod_spec| pod_spec.containers.iter_mut());

        for container in containers.into_iter().flatten() {
            if let Some(latest) = self.updated_image(name, container).await {
                container.image = Some(latest.to_string());
                needs_canary = true;
            }
        }

        Evaluation {
            deployment: candidate,
            needs_canary,
        }
    }

    async fn updated_image(
        &self,
        deployment: &str,
        container: &Container,
    ) -> Option<ImageReference> {
        let image = container.image.as_deref().unwrap_or_default();
        let reference = match ImageReference::parse(image) {
            Ok(reference) => reference,
            Err(e) => {
                warn!(
                    "Skipping container {} in deployment {}, cannot parse image '{}': {}",
                    container.name, deployment, image, e
                );
                return None;
            }
        };

        if let RegistryClass::Unsupported(host) = self.policy.classify(&reference.repository) {
            warn!(
                "{} uses {} repository, which is not supported",
                reference.repository, host
            );
            return None;
        }

        let latest = match self.resolver.latest_tag(&reference.repository).await {
            Ok(latest) => latest,
            Err(e) => {
                warn!(
                    "Couldn't get latest tag for {}, leaving container {} unchanged: {:?}",
                    reference.repository, container.name, e
                );
                return None;
            }
        };

        if latest == reference.tag {
            debug!(
                "Image {} is already using the latest version",
                reference.repository
            );
            return None;
        }

        info!(
            "Container {} in deployment {} can be updated from {} to {}",
            container.name, deployment, reference, latest
        );
        Some(reference.with_tag(&latest))
    }
}
