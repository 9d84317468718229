// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MusterError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Cluster unreachable: {0}")]
    Connectivity(String),

    #[error("Manifest rendering failed: {0}")]
    RenderError(String),

    #[error("Invalid manifest: {0}")]
    ManifestError(String),

    #[error("Namespace error: {0}")]
    NamespaceError(String),

    #[error("Operator installer error: {0}")]
    InstallerError(String),
}

impl MusterError {
    /// Classify a kube error: transport-level failures mean the cluster API
    /// is unreachable and abort the run instead of being retried.
    pub fn from_kube(err: kube::Error) -> Self {
        match err {
            kube::Error::HyperError(_) | kube::Error::Service(_) => {
                MusterError::Connectivity(err.to_string())
            }
            other => MusterError::KubeError(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, MusterError>;
