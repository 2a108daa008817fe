// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! End-to-end verification-engine tests against a local echo backend.
//!
//! A wiremock server that routes like a conforming Ingress controller
//! stands in for the cluster; the `--use-insecure-host` override points the
//! request checks at it, so the whole chain (descriptor resolution, HTTP
//! capture, assertion evaluation, tree aggregation) runs for real without
//! Kubernetes.

mod common;

use common::start_echo_server;
use ingress_conformance::assertions::Assertions;
use ingress_conformance::capture::{CapturedRequest, CapturedResponse};
use ingress_conformance::checks::{Check, Config, Outcome, RequestDescriptor, RunContext};

fn echo_config(host: String) -> Config {
    Config {
        use_insecure_host: Some(host),
        ..Default::default()
    }
}

/// Assert the round trip landed on `service` with the path preserved.
fn expect_routing(
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

#[tokio::test]
async fn test_path_rules_resolve_through_the_engine() {
    let server = start_echo_server().await;
    let ctx = RunContext::new(echo_config(server.address().to_string()));

    let mut root = Check::group("all");
    let cases: [(&str, &str, &str); 4] = [
        ("prefix-foo", "/foo", "path-rules-foo"),
        ("prefix-foo-subpath", "/foo/bar", "path-rules-foo"),
        ("prefix-aaa-bbb-subpath", "/aaa/bbb/ccc", "path-rules-aaa-bbb"),
        // Prefix matching is segment-bounded, not string-prefix.
        ("prefix-string-prefix", "/aaa/bbbccc", "path-rules-catchall"),
    ];
    for (name, path, service) in cases {
        root.add_check(Check::request(
            name,
            RequestDescriptor::new("path-rules", expect_routing(service, path)).path(path),
        ))
        .unwrap();
    }

    let outcome = root.verify(None, &ctx).await;
    assert_eq!(outcome, Outcome { passed: 4, failed: 0 });
}

#[tokio::test]
async fn test_host_rules_resolve_through_the_engine() {
    let server = start_echo_server().await;
    let ctx = RunContext::new(echo_config(server.address().to_string()));

    let mut root = Check::group("all");
    let cases: [(&str, &str, &str); 3] = [
        ("exact-host", "foo.bar.com", "host-rules-exact"),
        ("wildcard-host", "wildcard.foo.com", "host-rules-wildcard"),
        // Two labels under the wildcard fall back to the default backend.
        ("multilevel-host", "aaa.bbb.foo.com", "default-backend"),
    ];
    for (name, host, service) in cases {
        let check = move |request: &CapturedRequest, response: &CapturedResponse| {
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
        };
        root.add_check(Check::request(
            name,
            RequestDescriptor::new("host-rules", check).hostname(host),
        ))
        .unwrap();
    }

    let outcome = root.verify(None, &ctx).await;
    assert_eq!(outcome, Outcome { passed: 3, failed: 0 });
}

#[tokio::test]
async fn test_failed_assertions_fail_the_check_and_prune_children() {
    let server = start_echo_server().await;
    let ctx = RunContext::new(echo_config(server.address().to_string()));

    let mut parent = Check::request(
        "wrong-expectation",
        RequestDescriptor::new("path-rules", expect_routing("not-the-backend", "/")),
    );
    parent
        .add_check(Check::request(
            "never-reached",
            RequestDescriptor::new("path-rules", expect_routing("path-rules-catchall", "/")),
        ))
        .unwrap();

    let mut root = Check::group("all");
    root.add_check(parent).unwrap();
    root.add_check(Check::request(
        "sibling-still-runs",
        RequestDescriptor::new("path-rules", expect_routing("path-rules-catchall", "/")),
    ))
    .unwrap();

    let outcome = root.verify(None, &ctx).await;
    // One failure for the parent, its child pruned, the sibling unaffected.
    assert_eq!(outcome, Outcome { passed: 1, failed: 1 });
}

#[tokio::test]
async fn test_capture_errors_count_as_failures_without_aborting() {
    let server = start_echo_server().await;
    let mut config = echo_config(server.address().to_string());
    // Point the first check at a closed port so its capture errors.
    config.use_insecure_host = Some("127.0.0.1:1".to_string());
    let broken_ctx = RunContext::new(config);

    let root = Check::request(
        "unreachable-backend",
        RequestDescriptor::new("path-rules", expect_routing("path-rules-catchall", "/")),
    );
    let outcome = root.verify(None, &broken_ctx).await;
    assert_eq!(outcome, Outcome { passed: 0, failed: 1 });
}

#[tokio::test]
async fn test_check_filter_runs_a_single_subtree() {
    let server = start_echo_server().await;
    let ctx = RunContext::new(echo_config(server.address().to_string()));

    let mut root = Check::group("all");
    root.add_check(Check::request(
        "target",
        RequestDescriptor::new("path-rules", expect_routing("path-rules-catchall", "/")),
    ))
    .unwrap();
    root.add_check(Check::request(
        "other",
        RequestDescriptor::new("path-rules", expect_routing("not-checked-here", "/")),
    ))
    .unwrap();

    let outcome = root.verify(Some("target"), &ctx).await;
    assert_eq!(outcome, Outcome { passed: 1, failed: 0 });

    let outcome = root.verify(Some("does-not-exist"), &ctx).await;
    assert_eq!(outcome, Outcome { passed: 0, failed: 0 });
}

#[tokio::test]
async fn test_request_descriptor_host_override_reaches_the_wire() {
    let server = start_echo_server().await;
    let ctx = RunContext::new(echo_config(server.address().to_string()));

    let check = |request: &CapturedRequest, _response: &CapturedResponse| {
        let mut a = Assertions::new();
        a.errors.equals(
            &request.host,
            "wildcard.foo.com",
            "expected the request host would be '{}' but was '{}'",
        );
        a
    };
    let root = Check::request(
        "override",
        RequestDescriptor::new("host-rules", check).hostname("wildcard.foo.com"),
    );

    let outcome = root.verify(None, &ctx).await;
    assert_eq!(outcome, Outcome { passed: 1, failed: 0 });
}
