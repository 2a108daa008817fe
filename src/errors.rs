// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the conformance harness.
//!
//! The taxonomy distinguishes three kinds of failure:
//! - construction errors (a broken suite definition or unusable
//!   environment) that abort the process,
//! - per-check errors (network failures, undecodable responses, Ingresses
//!   without a resolvable address) that are counted and reported without
//!   aborting the remaining suite,
//! - assertion failures, which are accumulated by
//!   [`crate::assertions::Assertions`] and never surface as `Err` values.

use thiserror::Error;

/// Errors raised while assembling or running the conformance suite.
#[derive(Error, Debug)]
pub enum SuiteError {
    /// A check was registered as a child of itself.
    ///
    /// Suite assembly rejects this instead of panicking so that broken
    /// definitions are testable without crashing the process.
    #[error("check '{name}' cannot be registered as a child of itself")]
    SelfParent {
        /// Name shared by the parent and the offending child
        name: String,
    },

    /// A check name was registered twice within the same subtree.
    ///
    /// Check names are the unit of `--check` filtering, so duplicates would
    /// make filtered runs ambiguous.
    #[error("check '{child}' is already registered under '{parent}'")]
    DuplicateCheck {
        /// Name of the subtree root the child was added to
        parent: String,
        /// The duplicated check name
        child: String,
    },

    /// An `--api-version` value that is not a supported Ingress API version.
    #[error("unknown Ingress APIVersion '{given}'")]
    UnknownApiVersion {
        /// The unrecognized flag value
        given: String,
    },

    /// The target Ingress has no load-balancer status at all.
    #[error(
        "ingresses/status '{name}' has no load balancer interface; use '--use-insecure-host' \
         and '--use-secure-host' if this is a limitation from the infrastructure"
    )]
    NoLoadBalancer {
        /// Name of the Ingress resource
        name: String,
    },

    /// The load-balancer status entry exists but carries neither hostname nor IP.
    #[error("ingresses/status/loadBalancer '{name}' has no hostname or IP")]
    EmptyLoadBalancer {
        /// Name of the Ingress resource
        name: String,
    },

    /// No fixture manifests are shipped for the requested API version.
    #[error("no fixture manifests found for apiVersion '{api_version}'")]
    NoFixtures {
        /// The requested API version
        api_version: String,
    },

    /// A fixture manifest failed to parse into a typed Kubernetes object.
    #[error("failed to parse fixture manifest '{name}': {source}")]
    Manifest {
        /// Fixture file name
        name: String,
        /// Underlying YAML error
        #[source]
        source: serde_yaml::Error,
    },

    /// A fixture manifest contains a kind the harness does not manage.
    #[error("unsupported kind '{kind}' in fixture manifest '{name}'")]
    UnsupportedKind {
        /// Fixture file name
        name: String,
        /// The unmanaged object kind
        kind: String,
    },

    /// A scenario step ran before the ingress endpoint was resolved.
    #[error("undefined ingress host location; resolve an Ingress before sending requests")]
    UndefinedEndpoint,

    /// A scenario assertion step ran before any round trip was captured.
    #[error("no round trip has been captured; send a request first")]
    NoCapture,

    /// A scenario assertion step failed.
    #[error("{message}")]
    StepFailed {
        /// Human-readable description of the mismatch
        message: String,
    },

    /// HTTP capture failed.
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// Self-signed certificate generation for the TLS fixture failed.
    #[error("failed to generate TLS fixture certificate: {0}")]
    Certificate(#[from] rcgen::Error),

    /// Serializing a manifest into an apply payload failed.
    #[error("failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Kubernetes API call failed.
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// The kubeconfig could not be loaded.
    #[error("failed to load kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),
}

/// Errors raised by a single HTTP capture round trip.
///
/// Capture performs exactly one request; none of these conditions are
/// retried, so flakiness in the controller under test stays visible.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The request location is not a valid URL.
    #[error("invalid request location '{location}': {source}")]
    InvalidLocation {
        /// The offending location string
        location: String,
        /// Underlying parse error
        #[source]
        source: url::ParseError,
    },

    /// The ingress authority did not resolve to any socket address.
    #[error("could not resolve an address for '{authority}'")]
    Unresolvable {
        /// The `host:port` authority that failed to resolve
        authority: String,
    },

    /// The underlying HTTP request failed (connect, timeout, TLS).
    #[error(transparent)]
    Request(#[from] reqwest::Error),

    /// The response body was not the echo server's JSON reflection.
    ///
    /// Raised when the backend is not the echo fixture or returned an error
    /// page; the raw body is embedded for diagnosis.
    #[error("unexpected response (statuscode: {status}, length: {length}): {body}")]
    UnexpectedResponse {
        /// HTTP status code of the response
        status: u16,
        /// Byte length of the undecodable body
        length: usize,
        /// The raw body, lossily decoded
        body: String,
    },
}
