// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! TLS conformance: the controller must terminate TLS with the certificate
//! that covers the requested hostname.
//!
//! The capture layer skips chain trust (the fixture secret is self-signed)
//! but fails the round trip when the presented leaf does not cover the SNI
//! hostname, so reaching the assertions at all already proves the
//! certificate/hostname pairing.

use crate::assertions::Assertions;
use crate::capture::{CapturedRequest, CapturedResponse};
use crate::checks::{Check, RequestDescriptor};

/// Hostname covered by the generated fixture certificate.
pub const TLS_HOST: &str = "tls.foo.com";

/// Build the TLS host-rules check.
#[must_use]
pub fn checks() -> Check {
    Check::request(
        "tls-host-rules",
        RequestDescriptor::new("tls-host-rules", assert_tls_host)
            .hostname(TLS_HOST)
            .secure(),
    )
    .describe("Ingress with TLS configuration should terminate TLS for the configured host with its certificate")
}

fn assert_tls_host(request: &CapturedRequest, response: &CapturedResponse) -> Assertions {
    let mut a = Assertions::new();
    a.errors.equals(
        &request.downstream_service_id,
        "tls-host-rules",
        "expected the downstream service would be '{}' but was '{}'",
    );
    a.errors.equals(
        &request.host,
        TLS_HOST,
        "expected the request host would be '{}' but was '{}'",
    );
    let verified = response.tls_hostname.clone().unwrap_or_default();
    a.errors.equals(
        &verified,
        TLS_HOST,
        "expected the verified TLS hostname to be '{}' but was '{}'",
    );
    a.errors.equals(
        &response.status_code,
        &200,
        "expected the status code to be {} but was {}",
    );
    a
}
