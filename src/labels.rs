// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Label and annotation constants stamped onto managed resources.
//!
//! Every resource created by `apply` carries the standard Kubernetes app
//! labels so a later run (or an interrupted one) can find and delete
//! everything it owns with a single selector.

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for the name of a higher-level application this one is part of
pub const K8S_PART_OF: &str = "app.kubernetes.io/part-of";

/// Standard label for the current version of the application
pub const K8S_VERSION: &str = "app.kubernetes.io/version";

// ============================================================================
// Label Values
// ============================================================================

/// Value for both `app.kubernetes.io/part-of` and `app.kubernetes.io/managed-by`
pub const APP_NAME: &str = "ingress-controller-conformance";

/// Value for `app.kubernetes.io/version`
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Ingress Annotations
// ============================================================================

/// Annotation selecting which controller should satisfy an Ingress
pub const INGRESS_CLASS_ANNOTATION: &str = "kubernetes.io/ingress.class";

/// Annotation marking an `IngressClass` as the cluster default
pub const DEFAULT_CLASS_ANNOTATION: &str = "ingressclass.kubernetes.io/is-default-class";

/// Selector matching every resource managed by this harness.
#[must_use]
pub fn managed_selector() -> String {
    format!("{K8S_MANAGED_BY}={APP_NAME}")
}
