// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The teardown sequencer: rollout in reverse, tolerating absent resources.

use std::fs;
use std::time::Duration;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Secret, Service};
use kube::api::DeleteParams;
use kube::{Api, Client};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::TeardownConfig;
use crate::constants::{labels, poll as poll_defaults, stack};
use crate::error::{MusterError, Result};
use crate::kubernetes::status::pods_absent;
use crate::kubernetes::{delete_all, delete_namespace};
use crate::poll::{wait_for, ReadinessCheck};
use crate::render::remove_staging;
use crate::rollout::{RunSummary, Stage, StageOutcome};
use crate::types::FeatureStore;

/// Delete by name, treating an already-absent resource as a success.
async fn delete_ignore_absent<K>(api: &Api<K>, name: &str) -> Result<bool>
where
    K: Clone + DeserializeOwned + std::fmt::Debug,
{
    match api.delete(name, &DeleteParams::default()).await {
        Ok(_) => Ok(true),
        Err(kube::Error::Api(e)) if e.code == 404 => {
            debug!("{} already absent", name);
            Ok(false)
        }
        Err(e) => Err(MusterError::from_kube(e)),
    }
}

pub struct TeardownSequencer {
    client: Client,
    config: TeardownConfig,
    summary: RunSummary,
}

impl TeardownSequencer {
    pub fn new(client: Client, config: TeardownConfig) -> Self {
        Self {
            client,
            config,
            summary: RunSummary::new(),
        }
    }

    /// Remove the stack in reverse dependency order. Only an unreachable
    /// cluster aborts; missing resources never do.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let version = self
            .client
            .apiserver_version()
            .await
            .map_err(MusterError::from_kube)?;
        info!("Connected to Kubernetes {}.{}", version.major, version.minor);

        self.feature_store_stage().await?;
        self.datastores_stage().await?;
        self.operator_stage().await?;
        self.namespace_stage().await?;

        remove_staging(&self.config.staging_dir)?;
        debug!("Removed staging directory {}", self.config.staging_dir.display());

        self.summary.log();
        Ok(self.summary.clone())
    }

    /// Delete the FeatureStore CR and its secret, then wait (bounded, soft)
    /// for the operator to wind down the managed pods.
    async fn feature_store_stage(&mut self) -> Result<()> {
        let namespace = &self.config.namespace;

        let stores: Api<FeatureStore> = Api::namespaced(self.client.clone(), namespace);
        delete_ignore_absent(&stores, stack::FEATURE_STORE).await?;

        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        delete_ignore_absent(&secrets, stack::FEAST_SECRET).await?;

        let selector = format!("{}={}", labels::FEAST_NAME, stack::FEATURE_STORE);
        let check = ReadinessCheck::new(
            "managed pods gone",
            Duration::from_secs(poll_defaults::DATASTORE_INTERVAL_SECS),
            self.config.pod_wait_attempts,
        );
        let client = self.client.clone();
        let namespace = namespace.clone();
        let outcome = wait_for(&check, || {
            let client = client.clone();
            let namespace = namespace.clone();
            let selector = selector.clone();
            async move { pods_absent(&client, &namespace, &selector).await }
        })
        .await?;

        if outcome.is_ready() {
            self.summary
                .record(Stage::FeatureStore, StageOutcome::Applied, None);
        } else {
            warn!(
                "Managed pods still present after {} attempts; the operator may still be \
                 winding down. Inspect with: kubectl get pods -n {} -l {}",
                check.max_attempts, self.config.namespace, selector
            );
            self.summary.record(
                Stage::FeatureStore,
                StageOutcome::TimedOut,
                Some("managed pods still present".to_string()),
            );
        }

        Ok(())
    }

    async fn datastores_stage(&mut self) -> Result<()> {
        let namespace = &self.config.namespace;
        let deployments: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        let services: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);

        for name in [stack::POSTGRES, stack::REDIS] {
            delete_ignore_absent(&deployments, name).await?;
            delete_ignore_absent(&services, name).await?;
        }
        delete_ignore_absent(&secrets, stack::POSTGRES_SECRET).await?;

        self.summary
            .record(Stage::Datastores, StageOutcome::Applied, None);
        Ok(())
    }

    /// Uninstall the operator by deleting everything its installation
    /// manifest names. A missing artifact file is degraded, not fatal.
    async fn operator_stage(&mut self) -> Result<()> {
        if !self.config.uninstall_operator {
            self.summary
                .record(Stage::Operator, StageOutcome::Skipped, None);
            return Ok(());
        }

        let path = &self.config.operator_manifest;
        let yaml = match fs::read_to_string(path) {
            Ok(yaml) => yaml,
            Err(e) => {
                warn!(
                    "Cannot read installation manifest {} ({}); skipping operator uninstall. \
                     Remove it manually with: kubectl delete -f {}",
                    path.display(),
                    e,
                    path.display()
                );
                self.summary.record(
                    Stage::Operator,
                    StageOutcome::Skipped,
                    Some("installation manifest missing".to_string()),
                );
                return Ok(());
            }
        };

        let deleted = delete_all(&self.client, &yaml).await?;
        info!("Deleted {} operator resources", deleted);
        self.summary
            .record(Stage::Operator, StageOutcome::Applied, None);
        Ok(())
    }

    async fn namespace_stage(&mut self) -> Result<()> {
        if !self.config.delete_namespace {
            self.summary
                .record(Stage::Namespace, StageOutcome::Skipped, None);
            return Ok(());
        }

        delete_namespace(&self.client, &self.config.namespace).await?;
        self.summary
            .record(Stage::Namespace, StageOutcome::Applied, None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{pod_list_json, version_json, MockService};

    fn test_config(staging_dir: &std::path::Path) -> TeardownConfig {
        let mut config = TeardownConfig::new("feast");
        config.staging_dir = staging_dir.to_path_buf();
        config
    }

    fn base_mock() -> MockService {
        MockService::new()
            .on_get("/version", 200, &version_json())
            .on_get("/api/v1/namespaces/feast/pods", 200, &pod_list_json(&[]))
    }

    #[tokio::test]
    async fn test_teardown_tolerates_fully_absent_stack() {
        let staging = tempfile::tempdir().unwrap();
        let mock = base_mock();
        let mut sequencer = TeardownSequencer::new(mock.into_client(), test_config(staging.path()));

        // Every delete answers 404 from the mock's default response
        let summary = sequencer.run().await.unwrap();

        assert_eq!(
            summary.outcome_of(Stage::FeatureStore),
            Some(StageOutcome::Applied)
        );
        assert_eq!(
            summary.outcome_of(Stage::Datastores),
            Some(StageOutcome::Applied)
        );
        assert_eq!(summary.outcome_of(Stage::Operator), Some(StageOutcome::Skipped));
        assert_eq!(summary.outcome_of(Stage::Namespace), Some(StageOutcome::Skipped));
        assert!(!summary.has_failure());
    }

    #[tokio::test]
    async fn test_teardown_deletes_every_stack_resource() {
        let staging = tempfile::tempdir().unwrap();
        let mock = base_mock();
        let mut sequencer =
            TeardownSequencer::new(mock.clone().into_client(), test_config(staging.path()));
        sequencer.run().await.unwrap();

        let deletes: Vec<String> = mock
            .requests()
            .into_iter()
            .filter(|(method, _)| method == "DELETE")
            .map(|(_, path)| path)
            .collect();

        for expected in [
            "/apis/feast.dev/v1alpha1/namespaces/feast/featurestores/feast-store",
            "/api/v1/namespaces/feast/secrets/feast-data-stores",
            "/apis/apps/v1/namespaces/feast/deployments/postgres",
            "/apis/apps/v1/namespaces/feast/deployments/redis",
            "/api/v1/namespaces/feast/services/postgres",
            "/api/v1/namespaces/feast/services/redis",
            "/api/v1/namespaces/feast/secrets/postgres-secret",
        ] {
            assert!(
                deletes.iter().any(|path| path == expected),
                "missing delete for {}",
                expected
            );
        }
    }

    #[tokio::test]
    async fn test_delete_namespace_flag() {
        let staging = tempfile::tempdir().unwrap();
        let mut config = test_config(staging.path());
        config.delete_namespace = true;

        let mock = base_mock();
        let mut sequencer = TeardownSequencer::new(mock.clone().into_client(), config);
        let summary = sequencer.run().await.unwrap();

        assert_eq!(
            summary.outcome_of(Stage::Namespace),
            Some(StageOutcome::Applied)
        );
        assert!(mock
            .requests()
            .iter()
            .any(|(method, path)| method == "DELETE" && path == "/api/v1/namespaces/feast"));
    }

    #[tokio::test]
    async fn test_missing_operator_manifest_is_degraded() {
        let staging = tempfile::tempdir().unwrap();
        let mut config = test_config(staging.path());
        config.uninstall_operator = true;
        config.operator_manifest = staging.path().join("does-not-exist.yaml");

        let mock = base_mock();
        let mut sequencer = TeardownSequencer::new(mock.into_client(), config);
        let summary = sequencer.run().await.unwrap();

        assert_eq!(summary.outcome_of(Stage::Operator), Some(StageOutcome::Skipped));
        assert!(!summary.has_failure());
    }

    #[tokio::test]
    async fn test_teardown_removes_staging_dir() {
        let staging_parent = tempfile::tempdir().unwrap();
        let staging_dir = staging_parent.path().join("staged");
        std::fs::create_dir_all(&staging_dir).unwrap();
        std::fs::write(staging_dir.join("feast.yaml"), "rendered").unwrap();

        let mock = base_mock();
        let mut sequencer = TeardownSequencer::new(mock.into_client(), test_config(&staging_dir));
        sequencer.run().await.unwrap();

        assert!(!staging_dir.exists());
    }
}
