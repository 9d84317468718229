// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Namespace management utilities

use crate::error::{MusterError, Result};
use k8s_openapi::api::core::v1::Namespace;
use kube::{
    api::{DeleteParams, ObjectMeta, PostParams},
    Api, Client,
};
use tracing::{debug, info, instrument};

/// Check whether a namespace exists in the cluster
pub async fn namespace_exists(client: &Client, namespace: &str) -> Result<bool> {
    let namespaces: Api<Namespace> = Api::all(client.clone());

    match namespaces.get(namespace).await {
        Ok(_) => Ok(true),
        Err(kube::Error::Api(err)) if err.code == 404 => Ok(false),
        Err(e) => Err(MusterError::from_kube(e)),
    }
}

/// Ensure a namespace exists in the cluster, create if it doesn't
#[instrument(skip(client))]
pub async fn ensure_namespace_exists(client: &Client, namespace: &str) -> Result<()> {
    let namespaces: Api<Namespace> = Api::all(client.clone());

    match namespaces.get(namespace).await {
        Ok(_) => {
            debug!("Namespace {} already exists", namespace);
            Ok(())
        }
        Err(kube::Error::Api(err)) if err.code == 404 => {
            info!("Creating namespace {}", namespace);
            let ns = Namespace {
                metadata: ObjectMeta {
                    name: Some(namespace.to_string()),
                    ..Default::default()
                },
                ..Default::default()
            };
            namespaces
                .create(&PostParams::default(), &ns)
                .await
                .map_err(MusterError::from_kube)?;
            info!("Namespace {} created successfully", namespace);
            Ok(())
        }
        Err(e) => Err(MusterError::NamespaceError(format!(
            "Failed to check/create namespace {}: {}",
            namespace, e
        ))),
    }
}

/// Delete a namespace. Already-absent is a success, not an error.
#[instrument(skip(client))]
pub async fn delete_namespace(client: &Client, namespace: &str) -> Result<bool> {
    let namespaces: Api<Namespace> = Api::all(client.clone());

    match namespaces.delete(namespace, &DeleteParams::default()).await {
        Ok(_) => {
            info!("Namespace {} deletion requested", namespace);
            Ok(true)
        }
        Err(kube::Error::Api(err)) if err.code == 404 => {
            debug!("Namespace {} already absent", namespace);
            Ok(false)
        }
        Err(e) => Err(MusterError::from_kube(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{namespace_json, MockService};

    #[tokio::test]
    async fn test_namespace_exists() {
        let mock = MockService::new().on_get("/api/v1/namespaces/feast", 200, &namespace_json("feast"));
        let client = mock.into_client();

        assert!(namespace_exists(&client, "feast").await.unwrap());
    }

    #[tokio::test]
    async fn test_namespace_absent() {
        let client = MockService::new().into_client();
        assert!(!namespace_exists(&client, "feast").await.unwrap());
    }

    #[tokio::test]
    async fn test_ensure_creates_missing_namespace() {
        let mock = MockService::new().on_post("/api/v1/namespaces", 201, &namespace_json("feast"));
        let client = mock.clone().into_client();

        ensure_namespace_exists(&client, "feast").await.unwrap();

        let posts: Vec<_> = mock
            .requests()
            .into_iter()
            .filter(|(method, _)| method == "POST")
            .collect();
        assert_eq!(posts.len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_skips_existing_namespace() {
        let mock =
            MockService::new().on_get("/api/v1/namespaces/feast", 200, &namespace_json("feast"));
        let client = mock.clone().into_client();

        ensure_namespace_exists(&client, "feast").await.unwrap();

        assert!(mock.requests().iter().all(|(method, _)| method == "GET"));
    }

    #[tokio::test]
    async fn test_delete_absent_namespace_is_success() {
        let client = MockService::new().into_client();
        let deleted = delete_namespace(&client, "feast").await.unwrap();
        assert!(!deleted);
    }
}
