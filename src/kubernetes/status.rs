// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Status probes for the readiness poller.
//!
//! Each probe evaluates one resource's live status into a [`Probe`]: the
//! pure predicate logic is split out so it can be tested on constructed
//! objects without an API server.

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::Pod;
use kube::api::{ListParams, ObjectMeta, PostParams};
use kube::{Api, Client};
use tracing::info;

use crate::error::{MusterError, Result};
use crate::poll::Probe;
use crate::types::FeatureStore;

/// Evaluate a FeatureStore CR into a probe: phase `Ready` succeeds, phase
/// `Failed` is the distinguished failure, anything else keeps polling.
pub fn featurestore_probe(store: &FeatureStore) -> Probe {
    if store.is_ready() {
        Probe::Ready
    } else if store.is_failed() {
        Probe::Failed("Failed".to_string())
    } else {
        Probe::Pending(store.phase().map(|p| p.to_string()))
    }
}

/// Count pods in phase `Running`.
pub fn count_running(pods: &[Pod]) -> usize {
    pods.iter()
        .filter(|pod| {
            pod.status
                .as_ref()
                .and_then(|s| s.phase.as_deref())
                .is_some_and(|phase| phase == "Running")
        })
        .count()
}

/// Evaluate a Job's conditions: `Complete=True` succeeds, `Failed=True` is
/// the distinguished failure.
pub fn job_probe(job: &Job) -> Probe {
    let conditions = job
        .status
        .as_ref()
        .and_then(|s| s.conditions.as_deref())
        .unwrap_or_default();

    if conditions
        .iter()
        .any(|c| c.type_ == "Complete" && c.status == "True")
    {
        Probe::Ready
    } else if let Some(failed) = conditions
        .iter()
        .find(|c| c.type_ == "Failed" && c.status == "True")
    {
        Probe::Failed(failed.reason.clone().unwrap_or_else(|| "Failed".to_string()))
    } else {
        let active = job.status.as_ref().and_then(|s| s.active).unwrap_or(0);
        Probe::Pending(Some(format!("{} active pods", active)))
    }
}

/// Evaluate a Deployment's `Available` condition.
pub fn deployment_probe(deployment: &Deployment) -> Probe {
    let available = deployment
        .status
        .as_ref()
        .and_then(|s| s.conditions.as_deref())
        .unwrap_or_default()
        .iter()
        .any(|c| c.type_ == "Available" && c.status == "True");

    if available {
        Probe::Ready
    } else {
        Probe::Pending(Some("not yet available".to_string()))
    }
}

/// Probe the FeatureStore CR's reported phase. A CR the operator has not
/// created status for yet (or that does not exist yet) keeps polling.
pub async fn featurestore_phase(client: &Client, namespace: &str, name: &str) -> Result<Probe> {
    let stores: Api<FeatureStore> = Api::namespaced(client.clone(), namespace);

    match stores.get(name).await {
        Ok(store) => Ok(featurestore_probe(&store)),
        Err(kube::Error::Api(e)) if e.code == 404 => {
            Ok(Probe::Pending(Some("resource absent".to_string())))
        }
        Err(e) => Err(MusterError::from_kube(e)),
    }
}

/// Probe for at least one pod matching `selector` in phase `Running`.
pub async fn pods_running(client: &Client, namespace: &str, selector: &str) -> Result<Probe> {
    let pods: Api<Pod> = Api::namespaced(client.clone(), namespace);
    let list = pods
        .list(&ListParams::default().labels(selector))
        .await
        .map_err(MusterError::from_kube)?;

    let running = count_running(&list.items);
    if running > 0 {
        Ok(Probe::Ready)
    } else {
        Ok(Probe::Pending(Some(format!(
            "{} pods, none running",
            list.items.len()
        ))))
    }
}

/// Probe for zero pods matching `selector`. Has no failure predicate, so a
/// wait built on it can only succeed or time out.
pub async fn pods_absent(client: &Client, namespace: &str, selector: &str) -> Result<Probe> {
    let pods: Api<Pod> = Api::namespaced(client.clone(), namespace);
    let list = pods
        .list(&ListParams::default().labels(selector))
        .await
        .map_err(MusterError::from_kube)?;

    if list.items.is_empty() {
        Ok(Probe::Ready)
    } else {
        Ok(Probe::Pending(Some(format!(
            "{} pods still present",
            list.items.len()
        ))))
    }
}

/// Probe a Job's completion conditions.
pub async fn job_complete(client: &Client, namespace: &str, name: &str) -> Result<Probe> {
    let jobs: Api<Job> = Api::namespaced(client.clone(), namespace);

    match jobs.get(name).await {
        Ok(job) => Ok(job_probe(&job)),
        Err(kube::Error::Api(e)) if e.code == 404 => {
            Ok(Probe::Pending(Some("job absent".to_string())))
        }
        Err(e) => Err(MusterError::from_kube(e)),
    }
}

/// Probe a Deployment's `Available` condition.
pub async fn deployment_available(client: &Client, namespace: &str, name: &str) -> Result<Probe> {
    let deployments: Api<Deployment> = Api::namespaced(client.clone(), namespace);

    match deployments.get(name).await {
        Ok(deployment) => Ok(deployment_probe(&deployment)),
        Err(kube::Error::Api(e)) if e.code == 404 => {
            Ok(Probe::Pending(Some("deployment absent".to_string())))
        }
        Err(e) => Err(MusterError::from_kube(e)),
    }
}

/// Find the scheduled materialization CronJob the operator created for a
/// FeatureStore instance. Returns `None` when no trigger exists.
pub async fn find_trigger_cronjob(
    client: &Client,
    namespace: &str,
    instance: &str,
) -> Result<Option<CronJob>> {
    let cronjobs: Api<CronJob> = Api::namespaced(client.clone(), namespace);
    let selector = format!("{}={}", crate::constants::labels::FEAST_NAME, instance);
    let list = cronjobs
        .list(&ListParams::default().labels(&selector))
        .await
        .map_err(MusterError::from_kube)?;

    Ok(list.items.into_iter().next())
}

/// Instantiate a one-off Job from a CronJob's job template.
pub async fn create_job_from_cronjob(
    client: &Client,
    namespace: &str,
    cronjob: &CronJob,
    job_name: &str,
) -> Result<()> {
    let template = cronjob
        .spec
        .as_ref()
        .map(|s| s.job_template.clone())
        .ok_or_else(|| MusterError::ManifestError("CronJob has no spec".to_string()))?;

    let job = Job {
        metadata: ObjectMeta {
            name: Some(job_name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: template.metadata.as_ref().and_then(|m| m.labels.clone()),
            ..Default::default()
        },
        spec: template.spec,
        ..Default::default()
    };

    let jobs: Api<Job> = Api::namespaced(client.clone(), namespace);
    jobs.create(&PostParams::default(), &job)
        .await
        .map_err(MusterError::from_kube)?;

    info!("Created one-off job {}/{}", namespace, job_name);
    Ok(())
}
