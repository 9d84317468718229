// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Custom resource types for the Feast Operator API.

pub mod featurestore;

pub use featurestore::FeatureStore;
