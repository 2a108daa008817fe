// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Host-rules conformance: exact and wildcard host matching.
//!
//! The fixture Ingress carries an exact rule for `foo.bar.com`, a wildcard
//! rule for `*.foo.com`, and falls back to the default-backend service. A
//! wildcard label matches exactly one DNS label: `wildcard.foo.com` matches
//! `*.foo.com`, while `aaa.bbb.foo.com` and the bare `foo.com` do not.

use crate::assertions::Assertions;
use crate::capture::{CapturedRequest, CapturedResponse};
use crate::checks::{ingress_address_check, Check, RequestDescriptor};
use crate::errors::SuiteError;
use crate::k8s::DEFAULT_NAMESPACE;

/// Build the host-rules subtree: an address gate with one child per host
/// pattern under test.
pub fn checks() -> Result<Check, SuiteError> {
    let mut root = ingress_address_check("host-rules", DEFAULT_NAMESPACE, "host-rules");

    root.add_check(
        Check::request(
            "host-rules-exact-match",
            RequestDescriptor::new("host-rules", served_by("host-rules-exact", "foo.bar.com"))
                .hostname("foo.bar.com"),
        )
        .describe("Ingress with exact host rule should send traffic to the correct backend service"),
    )?;

    root.add_check(
        Check::request(
            "host-rules-wildcard",
            RequestDescriptor::new("host-rules", served_by("host-rules-wildcard", "wildcard.foo.com"))
                .hostname("wildcard.foo.com"),
        )
        .describe("Ingress with wildcard host rule should match single-label wildcard requests"),
    )?;

    root.add_check(
        Check::request(
            "host-rules-wildcard-multilevel",
            RequestDescriptor::new("host-rules", served_by("default-backend", "aaa.bbb.foo.com"))
                .hostname("aaa.bbb.foo.com"),
        )
        .describe(
            "Ingress with wildcard host rule should not match multi-label requests & fall back to the default backend",
        ),
    )?;

    root.add_check(
        Check::request(
            "host-rules-toplevel-domain",
            RequestDescriptor::new("host-rules", served_by("default-backend", "foo.com"))
                .hostname("foo.com"),
        )
        .describe(
            "Ingress with wildcard host rule should not match the bare domain & fall back to the default backend",
        ),
    )?;

    Ok(root)
}

/// Assert the request landed on `service` with the intended Host intact.
fn served_by(service: &'static str, host: &'static str) -> impl Fn(&CapturedRequest, &CapturedResponse) -> Assertions + Send + Sync {
    move |request, response| {
        let mut a = Assertions::new();
        a.errors.equals(
            &request.downstream_service_id,
            service,
            "expected the downstream service would be '{}' but was '{}'",
        );
        a.errors.equals(
            &request.host,
            host,
            "expected the request host would be '{}' but was '{}'",
        );
        a.errors.equals(
            &response.status_code,
            &200,
            "expected the status code to be {} but was {}",
        );
        a
    }
}
