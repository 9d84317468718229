// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Idempotent manifest application and deletion via the dynamic API.
//!
//! Apply is server-side apply under a fixed field manager, so re-applying an
//! already-applied manifest updates in place. Delete tolerates absent
//! resources.

use kube::api::{Api, DeleteParams, DynamicObject, Patch, PatchParams};
use kube::discovery::ApiResource;
use kube::Client;
use tracing::{debug, info};

use crate::constants::FIELD_MANAGER;
use crate::error::{MusterError, Result};

/// A parsed manifest document ready for the dynamic API.
pub struct ParsedManifest {
    pub value: serde_json::Value,
    pub name: String,
    pub namespace: Option<String>,
    pub api_resource: ApiResource,
}

/// Split a multi-document YAML string into individual documents.
pub fn split_documents(yaml: &str) -> Vec<&str> {
    yaml.split("\n---")
        .map(str::trim)
        .filter(|doc| !doc.is_empty() && doc.contains("apiVersion"))
        .collect()
}

/// Parse apiVersion into (group, version); core resources have no group.
pub fn parse_api_version(api_version: &str) -> (String, String) {
    match api_version.split_once('/') {
        Some((group, version)) => (group.to_string(), version.to_string()),
        None => (String::new(), api_version.to_string()),
    }
}

/// Derive the plural resource name the API path uses for a kind.
pub fn pluralize_kind(kind: &str) -> String {
    let lower = kind.to_lowercase();
    if let Some(stem) = lower.strip_suffix('y') {
        format!("{}ies", stem)
    } else if lower.ends_with('s')
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
    {
        format!("{}es", lower)
    } else {
        format!("{}s", lower)
    }
}

/// Parse a single YAML document into the pieces the dynamic API needs.
pub fn parse_document(doc: &str) -> Result<ParsedManifest> {
    let value: serde_json::Value = serde_yaml::from_str(doc)
        .map_err(|e| MusterError::ManifestError(format!("invalid YAML: {}", e)))?;

    let api_version = value
        .get("apiVersion")
        .and_then(|v| v.as_str())
        .ok_or_else(|| MusterError::ManifestError("missing apiVersion".to_string()))?
        .to_string();
    let kind = value
        .get("kind")
        .and_then(|v| v.as_str())
        .ok_or_else(|| MusterError::ManifestError("missing kind".to_string()))?
        .to_string();
    let name = value
        .pointer("/metadata/name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| MusterError::ManifestError("missing metadata.name".to_string()))?
        .to_string();
    let namespace = value
        .pointer("/metadata/namespace")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let (group, version) = parse_api_version(&api_version);
    let api_resource = ApiResource {
        group,
        version,
        kind: kind.clone(),
        plural: pluralize_kind(&kind),
        api_version,
    };

    Ok(ParsedManifest {
        value,
        name,
        namespace,
        api_resource,
    })
}

fn dynamic_api(client: &Client, manifest: &ParsedManifest) -> Api<DynamicObject> {
    match &manifest.namespace {
        Some(ns) => Api::namespaced_with(client.clone(), ns, &manifest.api_resource),
        None => Api::all_with(client.clone(), &manifest.api_resource),
    }
}

/// Apply one manifest document with server-side apply.
pub async fn apply_document(client: &Client, doc: &str) -> Result<()> {
    let manifest = parse_document(doc)?;
    let api = dynamic_api(client, &manifest);
    let pp = PatchParams::apply(FIELD_MANAGER).force();

    api.patch(&manifest.name, &pp, &Patch::Apply(&manifest.value))
        .await
        .map_err(MusterError::from_kube)?;

    debug!(
        "Applied {}/{} in {}",
        manifest.api_resource.kind,
        manifest.name,
        manifest.namespace.as_deref().unwrap_or("<cluster>")
    );
    Ok(())
}

/// Apply every document of a multi-document manifest, in file order.
pub async fn apply_all(client: &Client, yaml: &str) -> Result<usize> {
    let docs = split_documents(yaml);
    for doc in &docs {
        apply_document(client, doc).await?;
    }
    Ok(docs.len())
}

/// Delete the resource a manifest document names. Returns `false` (not an
/// error) when the resource is already absent.
pub async fn delete_document(client: &Client, doc: &str) -> Result<bool> {
    let manifest = parse_document(doc)?;
    let api = dynamic_api(client, &manifest);

    match api.delete(&manifest.name, &DeleteParams::default()).await {
        Ok(_) => {
            info!(
                "Deleted {}/{} in {}",
                manifest.api_resource.kind,
                manifest.name,
                manifest.namespace.as_deref().unwrap_or("<cluster>")
            );
            Ok(true)
        }
        Err(kube::Error::Api(e)) if e.code == 404 => {
            debug!(
                "{}/{} already absent",
                manifest.api_resource.kind, manifest.name
            );
            Ok(false)
        }
        Err(e) => Err(MusterError::from_kube(e)),
    }
}

/// Delete every resource of a multi-document manifest, in reverse file order
/// so dependents go before their dependencies. Returns how many existed.
pub async fn delete_all(client: &Client, yaml: &str) -> Result<usize> {
    let mut deleted = 0;
    for doc in split_documents(yaml).into_iter().rev() {
        if delete_document(client, doc).await? {
            deleted += 1;
        }
    }
    Ok(deleted)
}
