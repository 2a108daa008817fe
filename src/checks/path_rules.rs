// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Path-rules conformance: prefix path matching.
//!
//! The fixture Ingress routes by prefix under the `path-rules` host: `/foo`
//! (no trailing slash), `/aaa/bbb/` (trailing slash), and a catch-all `/`.
//! A prefix rule matches the rule path itself and its path-segment-bounded
//! descendants; it never matches partial segments (`/fo`) or string
//! prefixes across a segment boundary (`/aaa/bbbccc`). The original request
//! path must reach the backend verbatim.

use crate::assertions::Assertions;
use crate::capture::{CapturedRequest, CapturedResponse};
use crate::checks::{ingress_address_check, Check, RequestDescriptor};
use crate::errors::SuiteError;
use crate::k8s::DEFAULT_NAMESPACE;

const HOST: &str = "path-rules";

/// Build the path-rules subtree: an address gate with one child per request
/// path under test.
pub fn checks() -> Result<Check, SuiteError> {
    let mut root = ingress_address_check("path-rules", DEFAULT_NAMESPACE, "path-rules");

    let cases: [(&str, &str, &str, &str); 9] = [
        (
            "path-rules-prefix-all-paths",
            "/",
            "path-rules-catchall",
            "Ingress with prefix path rule '/' should match all paths",
        ),
        (
            "path-rules-prefix-foo",
            "/foo",
            "path-rules-foo",
            "Ingress with prefix path rule without a trailing slash should send traffic to the correct backend service, and preserve the original request path (/foo matches /foo)",
        ),
        (
            "path-rules-prefix-foo-slash",
            "/foo/",
            "path-rules-foo",
            "Ingress with prefix path rule without a trailing slash should send traffic to the correct backend service, and preserve the original request path (/foo matches /foo/)",
        ),
        (
            "path-rules-prefix-fo",
            "/fo",
            "path-rules-catchall",
            "Ingress with prefix path rule without a trailing slash should not match partial paths (/foo does not match /fo)",
        ),
        (
            "path-rules-prefix-aaa-bbb",
            "/aaa/bbb",
            "path-rules-aaa-bbb",
            "Ingress with prefix path rule with a trailing slash should send traffic to the correct backend service, and preserve the original request path (/aaa/bbb/ matches /aaa/bbb)",
        ),
        (
            "path-rules-prefix-aaa-bbb-slash",
            "/aaa/bbb/",
            "path-rules-aaa-bbb",
            "Ingress with prefix path rule with a trailing slash should send traffic to the correct backend service, and preserve the original request path (/aaa/bbb/ matches /aaa/bbb/)",
        ),
        (
            "path-rules-prefix-aaa-bbb-ccc",
            "/aaa/bbb/ccc",
            "path-rules-aaa-bbb",
            "Ingress with prefix path rule with a trailing slash should match subpaths, send traffic to the correct backend service, and preserve the original request path (/aaa/bbb/ matches /aaa/bbb/ccc)",
        ),
        (
            "path-rules-prefix-aaa-bb",
            "/aaa/bb",
            "path-rules-catchall",
            "Ingress with prefix path rule with a trailing slash should not match partial paths (/aaa/bbb/ does not match /aaa/bb)",
        ),
        (
            "path-rules-prefix-aaa-bbbccc",
            "/aaa/bbbccc",
            "path-rules-catchall",
            "Ingress with prefix path rule with a trailing slash should not match string prefixes (/aaa/bbb/ does not match /aaa/bbbccc)",
        ),
    ];

    for (name, path, service, description) in cases {
        root.add_check(
            Check::request(
                name,
                RequestDescriptor::new("path-rules", routed_to(service, path))
                    .path(path)
                    .hostname(HOST),
            )
            .describe(description),
        )?;
    }

    Ok(root)
}

/// Assert the request landed on `service` with the path preserved verbatim.
fn routed_to(
    service: &'static str,
    path: &'static str,
) -> impl Fn(&CapturedRequest, &CapturedResponse) -> Assertions + Send + Sync {
    move |request, response| {
        let mut a = Assertions::new();
        a.errors.equals(
            &request.downstream_service_id,
            service,
            "expected the downstream service would be '{}' but was '{}'",
        );
        a.errors.equals(
            &request.path,
            path,
            "expected the request path would be '{}' but was '{}'",
        );
        a.errors.equals(
            &response.status_code,
            &200,
            "expected the status code to be {} but was {}",
        );
        a
    }
}
