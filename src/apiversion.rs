// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ingress API versions a check can be gated on.
//!
//! Checks declare the API versions they are valid for; `verify` only
//! executes checks compatible with the `--api-version` under test. An empty
//! declaration means the check applies to every version.

use crate::errors::SuiteError;
use std::fmt;
use std::str::FromStr;

/// A Kubernetes API version that serves the `Ingress` kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiVersion {
    /// `networking.k8s.io/v1` (GA, Kubernetes 1.19+)
    NetworkingV1,
    /// `networking.k8s.io/v1beta1` (deprecated)
    NetworkingV1beta1,
    /// `extensions/v1beta1` (legacy)
    ExtensionsV1beta1,
}

/// All supported Ingress API versions, newest first. Used for flag help text.
pub const ALL: [ApiVersion; 3] = [
    ApiVersion::NetworkingV1,
    ApiVersion::NetworkingV1beta1,
    ApiVersion::ExtensionsV1beta1,
];

impl ApiVersion {
    /// The `group/version` string as served by the API server.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ApiVersion::NetworkingV1 => "networking.k8s.io/v1",
            ApiVersion::NetworkingV1beta1 => "networking.k8s.io/v1beta1",
            ApiVersion::ExtensionsV1beta1 => "extensions/v1beta1",
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiVersion {
    type Err = SuiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL.iter()
            .copied()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| SuiteError::UnknownApiVersion { given: s.to_string() })
    }
}
