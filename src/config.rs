// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{operator, paths, poll};

/// Rollout configuration, built once from the CLI and passed to the
/// sequencer at construction.
#[derive(Debug, Clone)]
pub struct RolloutConfig {
    /// Target namespace for the stack
    pub namespace: String,
    /// Create the namespace if it does not exist
    pub create_namespace: bool,
    /// Install the Feast Operator before the stack
    pub install_operator: bool,
    /// Skip the PostgreSQL/Redis stage
    pub skip_datastores: bool,
    /// Skip the FeatureStore CR stage
    pub skip_feast: bool,
    /// Skip the post-apply materialization job
    pub skip_post_apply: bool,
    /// Total readiness wait per stage
    pub wait_timeout: Duration,
    /// Post-apply job completion wait
    pub apply_timeout: Duration,
    /// Directory holding manifest templates
    pub template_dir: PathBuf,
    /// Staging directory for rendered manifests
    pub staging_dir: PathBuf,
    /// Pre-built operator installation manifest
    pub operator_manifest: PathBuf,
    /// Fallback command producing the installation manifest, if any
    pub operator_build_command: Option<String>,
}

impl RolloutConfig {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            create_namespace: false,
            install_operator: false,
            skip_datastores: false,
            skip_feast: false,
            skip_post_apply: false,
            wait_timeout: Duration::from_secs(poll::WAIT_TIMEOUT_SECS),
            apply_timeout: Duration::from_secs(poll::APPLY_TIMEOUT_SECS),
            template_dir: PathBuf::from(paths::TEMPLATE_DIR),
            staging_dir: PathBuf::from(paths::STAGING_DIR),
            operator_manifest: PathBuf::from(operator::MANIFEST_PATH),
            operator_build_command: Some(operator::BUILD_COMMAND.to_string()),
        }
    }
}

/// Teardown configuration, the inverse subset of [`RolloutConfig`].
#[derive(Debug, Clone)]
pub struct TeardownConfig {
    /// Namespace the stack was deployed into
    pub namespace: String,
    /// Also delete the operator installation
    pub uninstall_operator: bool,
    /// Also delete the namespace itself
    pub delete_namespace: bool,
    /// Bound on waiting for managed pods to disappear
    pub pod_wait_attempts: u32,
    /// Staging directory to remove
    pub staging_dir: PathBuf,
    /// Operator installation manifest to delete from
    pub operator_manifest: PathBuf,
}

impl TeardownConfig {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            uninstall_operator: false,
            delete_namespace: false,
            pod_wait_attempts: poll::TEARDOWN_POD_ATTEMPTS,
            staging_dir: PathBuf::from(paths::STAGING_DIR),
            operator_manifest: PathBuf::from(operator::MANIFEST_PATH),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rollout_defaults() {
        let config = RolloutConfig::new("feast");
        assert_eq!(config.namespace, "feast");
        assert!(!config.create_namespace);
        assert!(!config.skip_datastores);
        assert_eq!(config.wait_timeout, Duration::from_secs(300));
        assert_eq!(config.apply_timeout, Duration::from_secs(600));
        assert_eq!(config.template_dir, PathBuf::from("manifests"));
    }

    #[test]
    fn test_teardown_defaults() {
        let config = TeardownConfig::new("feast");
        assert!(!config.uninstall_operator);
        assert!(!config.delete_namespace);
        assert_eq!(config.pod_wait_attempts, 24);
    }
}
