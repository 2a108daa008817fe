// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Single-service conformance: an Ingress with no rules sends all traffic
//! to its backend.

use crate::assertions::Assertions;
use crate::capture::{CapturedRequest, CapturedResponse};
use crate::checks::{Check, RequestDescriptor};

/// Build the single-service check.
#[must_use]
pub fn checks() -> Check {
    Check::request(
        "single-service",
        RequestDescriptor::new("single-service", assert_single_service),
    )
    .describe("Ingress with no rules should send traffic to the correct backend service")
}

fn assert_single_service(request: &CapturedRequest, response: &CapturedResponse) -> Assertions {
    let mut a = Assertions::new();
    a.errors.equals(
        &request.downstream_service_id,
        "single-service",
        "expected the downstream service would be '{}' but was '{}'",
    );
    a.errors.equals(
        &response.status_code,
        &200,
        "expected the status code to be {} but was {}",
    );
    a
}
