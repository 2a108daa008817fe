// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # Ingress controller conformance test harness
//!
//! This library drives conformance verification of Kubernetes Ingress
//! controllers: it applies a fixed set of fixture resources (Ingresses,
//! Services, Deployments, Secrets) to a cluster, sends HTTP/HTTPS requests
//! against the resulting load-balancer endpoints, and asserts that the
//! controller under test routes traffic and preserves request/response
//! metadata according to the Ingress specification.
//!
//! ## Modules
//!
//! - [`checks`] - The hierarchical check tree and the conformance suite
//! - [`capture`] - HTTP round-trip capture against the echo-server backend
//! - [`assertions`] - Accumulating assertion sets with error/warning tiers
//! - [`scenario`] - Per-scenario state and step-style verification helpers
//! - [`apply`] - Fixture manifest application and labeling
//! - [`k8s`] - Kubernetes client bootstrap and Ingress status lookup
//! - [`apiversion`] - Ingress API version gating
//! - [`labels`] - Managed-resource label/annotation contract
//! - [`errors`] - Error taxonomy
//!
//! ## Example
//!
//! ```rust,no_run
//! use ingress_conformance::checks::{self, Config, RunContext};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let suite = checks::all_checks()?;
//! let ctx = RunContext::new(Config::default());
//! let outcome = suite.verify(None, &ctx).await;
//! println!("{} passed, {} failed", outcome.passed, outcome.failed);
//! # Ok(())
//! # }
//! ```
//!
//! The check tree is walked depth-first on a single task; a failing check
//! prunes its children, and per-check errors are counted without aborting
//! the remaining suite. The process exit code is the machine-readable
//! success signal for CI integration.

pub mod apiversion;
pub mod apply;
pub mod assertions;
pub mod capture;
pub mod checks;
pub mod errors;
pub mod k8s;
pub mod labels;
pub mod scenario;

#[cfg(test)]
mod apiversion_tests;
#[cfg(test)]
mod apply_tests;
#[cfg(test)]
mod capture_tests;
