// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// The field manager name used for server-side apply
pub const FIELD_MANAGER: &str = "muster";

/// Placeholder token substituted with the target namespace during rendering
pub const NAMESPACE_PLACEHOLDER: &str = "${NAMESPACE}";

/// Labels used to select stack resources
pub mod labels {
    /// Label the Feast Operator puts on every resource it manages for a CR
    pub const FEAST_NAME: &str = "feast.dev/name";
    /// Datastore pod selector label
    pub const APP: &str = "app";
}

/// Fixed resource names inside the target namespace (must match `manifests/`)
pub mod stack {
    /// Name of the FeatureStore custom resource
    pub const FEATURE_STORE: &str = "feast-store";
    /// Secret holding datastore connection settings, referenced by the CR
    pub const FEAST_SECRET: &str = "feast-data-stores";
    /// PostgreSQL registry deployment/service name and app label value
    pub const POSTGRES: &str = "postgres";
    /// PostgreSQL credentials secret
    pub const POSTGRES_SECRET: &str = "postgres-secret";
    /// Redis online-store deployment/service name and app label value
    pub const REDIS: &str = "redis";
}

/// Feast Operator installation details
pub mod operator {
    /// Namespace the operator installation manifest creates
    pub const NAMESPACE: &str = "feast-operator-system";
    /// Controller-manager deployment to wait on after install
    pub const DEPLOYMENT: &str = "feast-operator-controller-manager";
    /// Default location of the pre-built installation manifest
    pub const MANIFEST_PATH: &str = "dist/install.yaml";
    /// Fallback command that produces the installation manifest
    pub const BUILD_COMMAND: &str = "make build-installer";
}

/// Polling configuration
pub mod poll {
    /// Interval for datastore and pod-existence checks, in seconds
    pub const DATASTORE_INTERVAL_SECS: u64 = 5;
    /// Interval for FeatureStore CR and Job status checks, in seconds
    pub const FEATURE_STORE_INTERVAL_SECS: u64 = 10;
    /// Default total readiness wait per stage, in seconds
    pub const WAIT_TIMEOUT_SECS: u64 = 300;
    /// Default post-apply job completion wait, in seconds
    pub const APPLY_TIMEOUT_SECS: u64 = 600;
    /// Attempts to wait for managed pods to disappear during teardown
    pub const TEARDOWN_POD_ATTEMPTS: u32 = 24;
}

/// Default directories relative to the working directory
pub mod paths {
    /// Manifest templates shipped with the tool
    pub const TEMPLATE_DIR: &str = "manifests";
    /// Staging location for rendered manifests
    pub const STAGING_DIR: &str = ".muster-staging";
}
