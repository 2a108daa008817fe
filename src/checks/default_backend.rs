// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Default-backend conformance: an Ingress with a single default backend
//! routes traffic there and preserves request/response metadata.

use crate::assertions::Assertions;
use crate::capture::{CapturedRequest, CapturedResponse};
use crate::checks::{Check, RequestDescriptor};

/// Build the default-backend check.
#[must_use]
pub fn checks() -> Check {
    Check::request(
        "default-backend",
        RequestDescriptor::new("default-backend", assert_default_backend),
    )
    .describe("Ingress with a single default backend should send traffic to the correct backend service")
}

fn assert_default_backend(request: &CapturedRequest, response: &CapturedResponse) -> Assertions {
    let mut a = Assertions::new();

    // The request as the downstream service received it.
    a.errors.equals(
        &request.downstream_service_id,
        "default-backend",
        "expected the downstream service would be '{}' but was '{}'",
    );
    a.errors.equals(
        &request.method,
        "GET",
        "expected the originating request method would be '{}' but was '{}'",
    );
    a.errors.equals(
        &request.proto,
        "HTTP/1.1",
        "expected the originating request protocol would be '{}' but was '{}'",
    );
    a.errors
        .contains_headers(&request.headers, &["user-agent", "host"]);

    // The downstream service response.
    a.errors.equals(
        &response.status_code,
        &200,
        "expected the status code to be {} but was {}",
    );
    a.errors.equals(
        &response.proto,
        "HTTP/1.1",
        "expected the response protocol would be '{}' but was '{}'",
    );
    a.errors
        .contains_headers(&response.headers, &["content-length", "content-type", "date"]);
    // Which extra headers a controller adds varies between conforming
    // implementations; the exact set is informative only.
    a.warnings.contains_exact_headers(
        &response.headers,
        &["content-length", "content-type", "date", "server"],
    );

    a
}
