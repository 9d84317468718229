// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The rollout sequencer: render, apply in dependency order, wait with
//! bounded polling, trigger the post-apply job, summarize.

pub mod summary;

pub use summary::{RunSummary, Stage, StageOutcome, StageReport};

use std::fs;
use std::time::Duration;

use chrono::Utc;
use kube::{Client, ResourceExt};
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::RolloutConfig;
use crate::constants::{labels, operator, poll as poll_defaults, stack};
use crate::error::{MusterError, Result};
use crate::kubernetes::status::{
    create_job_from_cronjob, deployment_available, featurestore_phase, find_trigger_cronjob,
    job_complete, pods_running,
};
use crate::kubernetes::{apply_all, ensure_namespace_exists, namespace_exists};
use crate::poll::{wait_for, PollOutcome, ReadinessCheck};
use crate::render::{render_templates, RenderedSet};

/// Sequencer progression. Optional stages advance the state even when
/// skipped; `Summarized` is always reached unless a fatal error aborts the
/// run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    Init,
    PrereqsChecked,
    Rendered,
    NamespaceReady,
    OperatorReady,
    DatastoresReady,
    FeatureStoreReady,
    PostApplyTriggered,
    Summarized,
}

pub struct RolloutSequencer {
    client: Client,
    config: RolloutConfig,
    state: SequencerState,
    summary: RunSummary,
}

impl RolloutSequencer {
    pub fn new(client: Client, config: RolloutConfig) -> Self {
        Self {
            client,
            config,
            state: SequencerState::Init,
            summary: RunSummary::new(),
        }
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// Execute the full stage sequence. Fatal errors (unreachable cluster,
    /// unusable templates, missing namespace without create permission)
    /// abort with `Err`; everything else is recorded in the summary.
    pub async fn run(&mut self) -> Result<RunSummary> {
        self.check_prereqs().await?;
        let manifests = self.render()?;
        self.namespace_stage().await?;
        self.operator_stage().await?;
        self.datastores_stage(&manifests).await?;
        let feast_failed = self.feature_store_stage(&manifests).await?;

        if feast_failed {
            self.summary.record(
                Stage::PostApply,
                StageOutcome::Skipped,
                Some("skipped after feature-store failure".to_string()),
            );
            self.state = SequencerState::PostApplyTriggered;
        } else {
            self.post_apply_stage().await?;
        }

        self.state = SequencerState::Summarized;
        self.summary.log();
        Ok(self.summary.clone())
    }

    /// A cheap API-server round trip; an unreachable cluster is a
    /// fundamental environment problem, not a transient readiness gap.
    async fn check_prereqs(&mut self) -> Result<()> {
        let version = self
            .client
            .apiserver_version()
            .await
            .map_err(MusterError::from_kube)?;
        info!("Connected to Kubernetes {}.{}", version.major, version.minor);
        self.state = SequencerState::PrereqsChecked;
        Ok(())
    }

    fn render(&mut self) -> Result<RenderedSet> {
        let manifests = render_templates(
            &self.config.template_dir,
            &self.config.staging_dir,
            &self.config.namespace,
        )?;
        info!(
            "Rendered {} manifests for namespace {} into {}",
            manifests.len(),
            self.config.namespace,
            self.config.staging_dir.display()
        );
        self.state = SequencerState::Rendered;
        Ok(manifests)
    }

    async fn namespace_stage(&mut self) -> Result<()> {
        let namespace = &self.config.namespace;

        if self.config.create_namespace {
            ensure_namespace_exists(&self.client, namespace).await?;
            self.summary
                .record(Stage::Namespace, StageOutcome::Applied, None);
        } else if namespace_exists(&self.client, namespace).await? {
            self.summary.record(
                Stage::Namespace,
                StageOutcome::Applied,
                Some("pre-existing".to_string()),
            );
        } else {
            return Err(MusterError::NamespaceError(format!(
                "namespace {} does not exist and --create-namespace was not given",
                namespace
            )));
        }

        self.state = SequencerState::NamespaceReady;
        Ok(())
    }

    async fn operator_stage(&mut self) -> Result<()> {
        if !self.config.install_operator {
            self.summary
                .record(Stage::Operator, StageOutcome::Skipped, None);
            self.state = SequencerState::OperatorReady;
            return Ok(());
        }

        let yaml = self.locate_operator_manifest().await?;
        let count = apply_all(&self.client, &yaml).await?;
        info!("Applied {} operator manifest documents", count);

        let check = ReadinessCheck::from_timeout(
            format!("operator deployment {}", operator::DEPLOYMENT),
            Duration::from_secs(poll_defaults::DATASTORE_INTERVAL_SECS),
            self.config.wait_timeout,
        );
        let client = self.client.clone();
        let outcome = wait_for(&check, || {
            let client = client.clone();
            async move {
                deployment_available(&client, operator::NAMESPACE, operator::DEPLOYMENT).await
            }
        })
        .await?;

        match outcome {
            PollOutcome::Ready { .. } => {
                self.summary
                    .record(Stage::Operator, StageOutcome::Ready, None);
            }
            _ => {
                warn!(
                    "Operator deployment not available in time; it may still converge. \
                     Inspect with: kubectl get deploy -n {} {}",
                    operator::NAMESPACE,
                    operator::DEPLOYMENT
                );
                self.summary
                    .record(Stage::Operator, StageOutcome::TimedOut, None);
            }
        }

        self.state = SequencerState::OperatorReady;
        Ok(())
    }

    /// Read the installation manifest, invoking the external build step as a
    /// fallback when the artifact is missing. A missing artifact with no
    /// working fallback is fatal.
    async fn locate_operator_manifest(&self) -> Result<String> {
        let path = &self.config.operator_manifest;

        if !path.exists() {
            let Some(command) = &self.config.operator_build_command else {
                return Err(MusterError::InstallerError(format!(
                    "installation manifest {} not found and no build command configured",
                    path.display()
                )));
            };

            info!(
                "Installation manifest {} not found, running `{}`",
                path.display(),
                command
            );
            let status = Command::new("sh")
                .arg("-c")
                .arg(command)
                .status()
                .await
                .map_err(|e| {
                    MusterError::InstallerError(format!("failed to run `{}`: {}", command, e))
                })?;
            if !status.success() {
                return Err(MusterError::InstallerError(format!(
                    "`{}` exited with {}",
                    command, status
                )));
            }
        }

        fs::read_to_string(path).map_err(|e| {
            MusterError::InstallerError(format!(
                "cannot read installation manifest {}: {}",
                path.display(),
                e
            ))
        })
    }

    async fn datastores_stage(&mut self, manifests: &RenderedSet) -> Result<()> {
        if self.config.skip_datastores {
            self.summary
                .record(Stage::Datastores, StageOutcome::Skipped, None);
            self.state = SequencerState::DatastoresReady;
            return Ok(());
        }

        // Apply both datastores back-to-back, then wait on each in sequence
        for name in [stack::POSTGRES, stack::REDIS] {
            let manifest = manifests.get(name).ok_or_else(|| {
                MusterError::RenderError(format!("{}.yaml template missing", name))
            })?;
            apply_all(&self.client, &manifest.content).await?;
        }

        let mut timed_out = Vec::new();
        for name in [stack::POSTGRES, stack::REDIS] {
            let selector = format!("{}={}", labels::APP, name);
            let check = ReadinessCheck::from_timeout(
                format!("{} pods", name),
                Duration::from_secs(poll_defaults::DATASTORE_INTERVAL_SECS),
                self.config.wait_timeout,
            );
            let client = self.client.clone();
            let namespace = self.config.namespace.clone();
            let outcome = wait_for(&check, || {
                let client = client.clone();
                let namespace = namespace.clone();
                let selector = selector.clone();
                async move { pods_running(&client, &namespace, &selector).await }
            })
            .await?;

            if !outcome.is_ready() {
                warn!(
                    "{} pods not running in time. Inspect with: kubectl get pods -n {} -l {}",
                    name, self.config.namespace, selector
                );
                timed_out.push(name);
            }
        }

        if timed_out.is_empty() {
            self.summary
                .record(Stage::Datastores, StageOutcome::Ready, None);
        } else {
            self.summary.record(
                Stage::Datastores,
                StageOutcome::TimedOut,
                Some(format!("not running: {}", timed_out.join(", "))),
            );
        }

        self.state = SequencerState::DatastoresReady;
        Ok(())
    }

    /// Apply the FeatureStore CR and poll its phase. Returns `true` when the
    /// operator reported phase `Failed`, which is irrecoverable for this run.
    async fn feature_store_stage(&mut self, manifests: &RenderedSet) -> Result<bool> {
        if self.config.skip_feast {
            self.summary
                .record(Stage::FeatureStore, StageOutcome::Skipped, None);
            self.state = SequencerState::FeatureStoreReady;
            return Ok(false);
        }

        let manifest = manifests
            .get("feast")
            .ok_or_else(|| MusterError::RenderError("feast.yaml template missing".to_string()))?;
        apply_all(&self.client, &manifest.content).await?;

        let check = ReadinessCheck::from_timeout(
            format!("FeatureStore {}", stack::FEATURE_STORE),
            Duration::from_secs(poll_defaults::FEATURE_STORE_INTERVAL_SECS),
            self.config.wait_timeout,
        );
        let client = self.client.clone();
        let namespace = self.config.namespace.clone();
        let outcome = wait_for(&check, || {
            let client = client.clone();
            let namespace = namespace.clone();
            async move { featurestore_phase(&client, &namespace, stack::FEATURE_STORE).await }
        })
        .await?;

        self.state = SequencerState::FeatureStoreReady;

        match outcome {
            PollOutcome::Ready { .. } => {
                info!("FeatureStore {} is ready", stack::FEATURE_STORE);
                self.summary
                    .record(Stage::FeatureStore, StageOutcome::Ready, None);
                Ok(false)
            }
            PollOutcome::TimedOut { last_status } => {
                // Later stages proceed best-effort against a store that may
                // still converge; this is deliberate, not an abort.
                warn!(
                    "FeatureStore {} not ready in time (last status {:?}); continuing. \
                     Inspect with: kubectl describe featurestore {} -n {}",
                    stack::FEATURE_STORE,
                    last_status,
                    stack::FEATURE_STORE,
                    self.config.namespace
                );
                self.summary
                    .record(Stage::FeatureStore, StageOutcome::TimedOut, last_status);
                Ok(false)
            }
            PollOutcome::Failed { status, .. } => {
                warn!(
                    "FeatureStore {} reported phase {}. Inspect with: kubectl describe featurestore {} -n {}",
                    stack::FEATURE_STORE, status, stack::FEATURE_STORE, self.config.namespace
                );
                self.summary
                    .record(Stage::FeatureStore, StageOutcome::Failed, Some(status));
                Ok(true)
            }
        }
    }

    async fn post_apply_stage(&mut self) -> Result<()> {
        if self.config.skip_post_apply {
            self.summary
                .record(Stage::PostApply, StageOutcome::Skipped, None);
            self.state = SequencerState::PostApplyTriggered;
            return Ok(());
        }

        let namespace = self.config.namespace.clone();
        let cronjob =
            find_trigger_cronjob(&self.client, &namespace, stack::FEATURE_STORE).await?;

        let Some(cronjob) = cronjob else {
            warn!(
                "No scheduled materialization job found for {} in {}. Once the operator creates one, \
                 trigger it manually with: kubectl create job --from=cronjob/<name> <name>-manual -n {}",
                stack::FEATURE_STORE, namespace, namespace
            );
            self.summary.record(
                Stage::PostApply,
                StageOutcome::Skipped,
                Some("no scheduled trigger found".to_string()),
            );
            self.state = SequencerState::PostApplyTriggered;
            return Ok(());
        };

        let cronjob_name = cronjob.name_any();
        let job_name = format!(
            "{}-manual-{}",
            cronjob_name,
            Utc::now().format("%Y%m%d%H%M%S")
        );
        create_job_from_cronjob(&self.client, &namespace, &cronjob, &job_name).await?;

        let check = ReadinessCheck::from_timeout(
            format!("job {}", job_name),
            Duration::from_secs(poll_defaults::FEATURE_STORE_INTERVAL_SECS),
            self.config.apply_timeout,
        );
        let client = self.client.clone();
        let outcome = wait_for(&check, || {
            let client = client.clone();
            let namespace = namespace.clone();
            let job_name = job_name.clone();
            async move { job_complete(&client, &namespace, &job_name).await }
        })
        .await?;

        match outcome {
            PollOutcome::Ready { .. } => {
                info!("Job {} completed", job_name);
                self.summary
                    .record(Stage::PostApply, StageOutcome::Ready, Some(job_name));
            }
            PollOutcome::TimedOut { .. } => {
                warn!(
                    "Job {} did not complete in time. Inspect with: kubectl logs job/{} -n {}",
                    job_name, job_name, self.config.namespace
                );
                self.summary
                    .record(Stage::PostApply, StageOutcome::TimedOut, Some(job_name));
            }
            PollOutcome::Failed { status, .. } => {
                warn!(
                    "Job {} failed ({}). Inspect with: kubectl logs job/{} -n {}",
                    job_name, status, job_name, self.config.namespace
                );
                self.summary
                    .record(Stage::PostApply, StageOutcome::Failed, Some(status));
            }
        }

        self.state = SequencerState::PostApplyTriggered;
        Ok(())
    }
}
