// Common test utilities for integration tests

#![allow(dead_code)]

use ingress_conformance::capture::{collect_headers, CapturedRequest};
use kube::client::Client;
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, Respond, ResponseTemplate};

/// Get a Kubernetes client or skip the test if not in a cluster
pub async fn get_kube_client_or_skip() -> Option<Client> {
    match Client::try_default().await {
        Ok(client) => Some(client),
        Err(e) => {
            eprintln!("Skipping integration test: not running in Kubernetes cluster: {e}");
            None
        }
    }
}

/// An echo backend that routes the way a conforming Ingress controller
/// would route the fixture rules, so request checks can be exercised
/// end-to-end without a cluster.
pub struct RoutingEchoResponder;

/// Which downstream service a conforming controller would pick for a
/// request, following the host-rules and path-rules fixtures.
pub fn route(host: &str, path: &str) -> &'static str {
    if host == "foo.bar.com" {
        return "host-rules-exact";
    }
    if let Some(rest) = host.strip_suffix(".foo.com") {
        // A wildcard matches exactly one label.
        if !rest.is_empty() && !rest.contains('.') {
            return "host-rules-wildcard";
        }
        return "default-backend";
    }
    if host == "foo.com" {
        return "default-backend";
    }

    if path == "/foo" || path.starts_with("/foo/") {
        return "path-rules-foo";
    }
    if path == "/aaa/bbb" || path.starts_with("/aaa/bbb/") {
        return "path-rules-aaa-bbb";
    }
    "path-rules-catchall"
}

impl Respond for RoutingEchoResponder {
    fn respond(&self, request: &wiremock::Request) -> ResponseTemplate {
        let headers = collect_headers(&request.headers);
        let host = headers
            .get("host")
            .and_then(|values| values.first())
            .cloned()
            .unwrap_or_default();
        // Strip a port so routing sees the bare hostname.
        let bare_host = host.split(':').next().unwrap_or_default().to_string();
        let path = request.url.path().to_string();

        let reflection = CapturedRequest {
            downstream_service_id: route(&bare_host, &path).to_string(),
            path,
            host: bare_host,
            method: request.method.to_string(),
            proto: "HTTP/1.1".to_string(),
            headers,
            namespace: "default".to_string(),
            ingress: "conformance".to_string(),
            service: "echo".to_string(),
        };
        ResponseTemplate::new(200).set_body_json(&reflection)
    }
}

/// Start a routing echo backend on a random local port.
pub async fn start_echo_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(RoutingEchoResponder)
        .mount(&server)
        .await;
    server
}
