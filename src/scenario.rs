// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-scenario state and step-style verification helpers.
//!
//! A [`Scenario`] holds the mutable state of one test scenario: the
//! namespace it runs in, the resolved ingress endpoint, and the most recent
//! captured round trip. Step methods are thin adapters over the capture
//! layer (resolve an Ingress, send one request, assert on what came back)
//! and return `Err` on the first mismatch, the way step definitions report.
//!
//! State is reset between scenarios with [`Scenario::reset`]; execution is
//! single-threaded, so no locking is involved.

use crate::capture::{capture_round_trip_with_method, CapturedRequest, CapturedResponse};
use crate::checks::RunContext;
use crate::errors::{CaptureError, SuiteError};
use crate::k8s::DEFAULT_NAMESPACE;
use reqwest::Method;
use url::Url;

/// One captured request/response pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedRoundTrip {
    /// The request as the downstream echo server received it
    pub request: CapturedRequest,
    /// The response metadata as the client observed it
    pub response: CapturedResponse,
}

/// Mutable state for one test scenario.
#[derive(Debug)]
pub struct Scenario {
    namespace: String,
    ingress_endpoint: Option<String>,
    capture: Option<CapturedRoundTrip>,
}

impl Scenario {
    /// A fresh scenario in the `default` namespace.
    #[must_use]
    pub fn new() -> Self {
        Self::in_namespace(DEFAULT_NAMESPACE)
    }

    /// A fresh scenario in a specific namespace.
    #[must_use]
    pub fn in_namespace(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            ingress_endpoint: None,
            capture: None,
        }
    }

    /// Namespace this scenario operates in.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Clear endpoint and capture state between scenarios.
    pub fn reset(&mut self) {
        self.ingress_endpoint = None;
        self.capture = None;
    }

    /// The most recent round trip, if one was captured.
    #[must_use]
    pub fn capture(&self) -> Option<&CapturedRoundTrip> {
        self.capture.as_ref()
    }

    /// Step: resolve the named Ingress and remember its endpoint.
    ///
    /// Fixtures are applied out of band (`apply`); this only resolves the
    /// address, honoring the configured insecure-host override.
    pub async fn i_have_an_ingress(
        &mut self,
        ctx: &RunContext,
        name: &str,
        namespace: &str,
    ) -> Result<(), SuiteError> {
        let endpoint = ctx.insecure_endpoint(namespace, name).await?;
        self.ingress_endpoint = Some(endpoint);
        Ok(())
    }

    /// Step: send one request and capture the round trip.
    ///
    /// The URL's own host is recorded and sent as the Host override while
    /// the connection goes to the resolved ingress endpoint: requesting
    /// `http://foo.bar.com/baz` exercises the `foo.bar.com` rules without
    /// DNS control over that domain.
    pub async fn i_send_a_request(
        &mut self,
        method: Method,
        request_url: &str,
    ) -> Result<(), SuiteError> {
        let endpoint = self
            .ingress_endpoint
            .as_deref()
            .ok_or(SuiteError::UndefinedEndpoint)?;

        let url = Url::parse(request_url).map_err(|source| CaptureError::InvalidLocation {
            location: request_url.to_string(),
            source,
        })?;
        let request_host = url.host_str().unwrap_or_default().to_string();

        let mut location = format!("{}://{}{}", url.scheme(), endpoint, url.path());
        if let Some(query) = url.query() {
            location.push('?');
            location.push_str(query);
        }

        match capture_round_trip_with_method(method, &location, &request_host).await {
            Ok((request, response)) => {
                self.capture = Some(CapturedRoundTrip { request, response });
                Ok(())
            }
            Err(err) => {
                // A failed send leaves no stale capture behind.
                self.capture = None;
                Err(err.into())
            }
        }
    }

    /// Step: the response status code must match.
    pub fn response_status_code_must_be(&self, expected: u16) -> Result<(), SuiteError> {
        let captured = self.captured()?;
        expect(
            captured.response.status_code == expected,
            format!(
                "expected the status code to be {expected} but was {actual}",
                actual = captured.response.status_code
            ),
        )
    }

    /// Step: the response must have been served by the named service.
    pub fn response_must_be_served_by(&self, expected: &str) -> Result<(), SuiteError> {
        let captured = self.captured()?;
        expect(
            captured.request.downstream_service_id == expected,
            format!(
                "expected the responding service would be '{expected}' but was '{actual}'",
                actual = captured.request.downstream_service_id
            ),
        )
    }

    /// Step: the response protocol must match.
    pub fn response_proto_must_be(&self, expected: &str) -> Result<(), SuiteError> {
        let captured = self.captured()?;
        expect(
            captured.response.proto == expected,
            format!(
                "expected the response protocol to be '{expected}' but was '{actual}'",
                actual = captured.response.proto
            ),
        )
    }

    /// Step: the forwarded request method must match.
    pub fn request_method_must_be(&self, expected: &str) -> Result<(), SuiteError> {
        let captured = self.captured()?;
        expect(
            captured.request.method == expected,
            format!(
                "expected the request method to be '{expected}' but was '{actual}'",
                actual = captured.request.method
            ),
        )
    }

    /// Step: the forwarded request protocol must match.
    pub fn request_proto_must_be(&self, expected: &str) -> Result<(), SuiteError> {
        let captured = self.captured()?;
        expect(
            captured.request.proto == expected,
            format!(
                "expected the request protocol to be '{expected}' but was '{actual}'",
                actual = captured.request.proto
            ),
        )
    }

    /// Step: the forwarded request host must match.
    pub fn request_host_must_be(&self, expected: &str) -> Result<(), SuiteError> {
        let captured = self.captured()?;
        expect(
            captured.request.host == expected,
            format!(
                "expected the request host to be '{expected}' but was '{actual}'",
                actual = captured.request.host
            ),
        )
    }

    /// Step: the forwarded request path must match verbatim.
    pub fn request_path_must_be(&self, expected: &str) -> Result<(), SuiteError> {
        let captured = self.captured()?;
        expect(
            captured.request.path == expected,
            format!(
                "expected the request path to be '{expected}' but was '{actual}'",
                actual = captured.request.path
            ),
        )
    }

    /// Step: the response headers must contain `key`; `"*"` accepts any value.
    pub fn response_headers_must_contain(&self, key: &str, value: &str) -> Result<(), SuiteError> {
        let captured = self.captured()?;
        header_must_contain("response", &captured.response.headers, key, value)
    }

    /// Step: the forwarded request headers must contain `key`; `"*"` accepts
    /// any value.
    pub fn request_headers_must_contain(&self, key: &str, value: &str) -> Result<(), SuiteError> {
        let captured = self.captured()?;
        header_must_contain("request", &captured.request.headers, key, value)
    }

    fn captured(&self) -> Result<&CapturedRoundTrip, SuiteError> {
        self.capture.as_ref().ok_or(SuiteError::NoCapture)
    }
}

fn header_must_contain(
    side: &str,
    headers: &crate::assertions::Headers,
    key: &str,
    value: &str,
) -> Result<(), SuiteError> {
    let Some(values) = headers.get(key) else {
        return Err(SuiteError::StepFailed {
            message: format!("expected the {side} headers to contain '{key}'"),
        });
    };
    if value != "*" && !values.iter().any(|v| v == value) {
        return Err(SuiteError::StepFailed {
            message: format!(
                "expected the {side} header '{key}' to contain '{value}' but contained '{values:?}'"
            ),
        });
    }
    Ok(())
}

fn expect(condition: bool, message: String) -> Result<(), SuiteError> {
    if condition {
        Ok(())
    } else {
        Err(SuiteError::StepFailed { message })
    }
}
