// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for manifest application, namespace management, and
//! status probing.

pub mod apply;
pub mod namespaces;
pub mod status;

pub use apply::{apply_all, delete_all};
pub use namespaces::{delete_namespace, ensure_namespace_exists, namespace_exists};
