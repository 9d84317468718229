// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use kube::CustomResource;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[kube(group = "feast.dev", version = "v1alpha1", kind = "FeatureStore")]
#[kube(namespaced)]
#[kube(status = "FeatureStoreStatus")]
#[serde(rename_all = "camelCase")]
pub struct FeatureStoreSpec {
    pub feast_project: String,
    /// Offline/online/registry service configuration, passed through to the
    /// operator verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<serde_json::Value>,
}

impl FeatureStore {
    /// The deployment phase reported by the operator, if any
    pub fn phase(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.phase.as_deref())
    }

    /// Check if the operator has finished reconciling this store
    pub fn is_ready(&self) -> bool {
        self.phase() == Some("Ready")
    }

    /// Check if the operator has given up on this store
    pub fn is_failed(&self) -> bool {
        self.phase() == Some("Failed")
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeatureStoreStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_spec: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::api::ObjectMeta;

    fn make_store(phase: Option<&str>) -> FeatureStore {
        FeatureStore {
            metadata: ObjectMeta {
                name: Some("feast-store".to_string()),
                namespace: Some("feast".to_string()),
                ..Default::default()
            },
            spec: FeatureStoreSpec {
                feast_project: "credit_scoring".to_string(),
                services: None,
            },
            status: phase.map(|p| FeatureStoreStatus {
                phase: Some(p.to_string()),
                applied_spec: None,
                conditions: None,
            }),
        }
    }

    #[test]
    fn test_is_ready_with_ready_phase() {
        assert!(make_store(Some("Ready")).is_ready());
    }

    #[test]
    fn test_is_ready_with_pending_phase() {
        let store = make_store(Some("Pending"));
        assert!(!store.is_ready());
        assert!(!store.is_failed());
    }

    #[test]
    fn test_is_failed_with_failed_phase() {
        let store = make_store(Some("Failed"));
        assert!(store.is_failed());
        assert!(!store.is_ready());
    }

    #[test]
    fn test_no_status_is_neither() {
        let store = make_store(None);
        assert_eq!(store.phase(), None);
        assert!(!store.is_ready());
        assert!(!store.is_failed());
    }
}
