// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for HTTP round-trip capture.
//!
//! A wiremock responder stands in for the echo server so captures run
//! against a real HTTP listener; the TLS hostname verifier is exercised
//! directly with generated self-signed certificates, no network involved.

#[cfg(test)]
mod tests {
    use crate::capture::{
        capture_round_trip, collect_headers, proto_string, CapturedRequest, HostnameOnlyVerifier,
    };
    use crate::errors::CaptureError;
    use rustls::client::danger::ServerCertVerifier;
    use rustls::pki_types::{ServerName, UnixTime};
    use wiremock::matchers::any;
    use wiremock::{Mock, MockServer, Respond, ResponseTemplate};

    /// Reflects requests the way the echo-server fixture does.
    struct EchoResponder;

    impl Respond for EchoResponder {
        fn respond(&self, request: &wiremock::Request) -> ResponseTemplate {
            let headers = collect_headers(&request.headers);
            let host = headers
                .get("host")
                .and_then(|values| values.first())
                .cloned()
                .unwrap_or_default();

            let reflection = CapturedRequest {
                downstream_service_id: "echo-backend".to_string(),
                path: request.url.path().to_string(),
                host,
                method: request.method.to_string(),
                proto: "HTTP/1.1".to_string(),
                headers,
                namespace: "default".to_string(),
                ingress: "echo".to_string(),
                service: "echo".to_string(),
            };
            ResponseTemplate::new(200).set_body_json(&reflection)
        }
    }

    async fn echo_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(EchoResponder)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_capture_decodes_echo_reflection() {
        let server = echo_server().await;

        let (request, response) = capture_round_trip(&server.uri(), "").await.unwrap();

        assert_eq!(request.downstream_service_id, "echo-backend");
        assert_eq!(request.method, "GET");
        assert_eq!(request.path, "/");
        assert_eq!(response.status_code, 200);
        assert_eq!(response.proto, "HTTP/1.1");
        assert!(response.tls_hostname.is_none());
        assert!(response.headers.contains_key("content-type"));
    }

    #[tokio::test]
    async fn test_capture_preserves_request_path() {
        let server = echo_server().await;
        let location = format!("{}/aaa/bbb/ccc", server.uri());

        let (request, _response) = capture_round_trip(&location, "").await.unwrap();
        assert_eq!(request.path, "/aaa/bbb/ccc");
    }

    #[tokio::test]
    async fn test_capture_host_override_replaces_host_header() {
        let server = echo_server().await;

        let (request, _response) = capture_round_trip(&server.uri(), "foo.bar.com")
            .await
            .unwrap();
        assert_eq!(request.host, "foo.bar.com");
    }

    #[tokio::test]
    async fn test_capture_rejects_non_json_response() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(503).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = capture_round_trip(&server.uri(), "").await.unwrap_err();
        match err {
            CaptureError::UnexpectedResponse { status, length, body } => {
                assert_eq!(status, 503);
                assert_eq!(length, "bad gateway".len());
                assert!(body.contains("bad gateway"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_capture_observes_redirects_instead_of_following() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(
                ResponseTemplate::new(301).insert_header("location", "http://elsewhere.invalid/"),
            )
            .mount(&server)
            .await;

        let err = capture_round_trip(&server.uri(), "").await.unwrap_err();
        match err {
            CaptureError::UnexpectedResponse { status, .. } => assert_eq!(status, 301),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_capture_rejects_invalid_location() {
        let err = capture_round_trip("not a url", "").await.unwrap_err();
        assert!(matches!(err, CaptureError::InvalidLocation { .. }));
    }

    #[test]
    fn test_verifier_rejects_wrong_hostname() {
        let certified =
            rcgen::generate_simple_self_signed(vec!["foo.example.com".to_string()]).unwrap();
        let server_name = ServerName::try_from("bar.example.com").unwrap();

        let err = HostnameOnlyVerifier
            .verify_server_cert(certified.cert.der(), &[], &server_name, &[], UnixTime::now())
            .unwrap_err();
        assert!(format!("{err:?}").contains("NotValidForName"));
    }

    #[test]
    fn test_verifier_accepts_matching_hostname() {
        let certified =
            rcgen::generate_simple_self_signed(vec!["foo.example.com".to_string()]).unwrap();
        let server_name = ServerName::try_from("foo.example.com").unwrap();

        HostnameOnlyVerifier
            .verify_server_cert(certified.cert.der(), &[], &server_name, &[], UnixTime::now())
            .unwrap();
    }

    #[test]
    fn test_proto_string_spellings() {
        assert_eq!(proto_string(http::Version::HTTP_11), "HTTP/1.1");
        assert_eq!(proto_string(http::Version::HTTP_2), "HTTP/2.0");
    }

    #[test]
    fn test_captured_request_wire_contract() {
        // The echo server emits `testId`; everything else is lowercase.
        let body = r#"{
            "testId": "path-rules-foo",
            "path": "/foo",
            "host": "path-rules",
            "method": "GET",
            "proto": "HTTP/1.1",
            "headers": {"user-agent": ["test"]},
            "namespace": "default",
            "ingress": "path-rules",
            "service": "path-rules-foo"
        }"#;

        let request: CapturedRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.downstream_service_id, "path-rules-foo");
        assert_eq!(request.path, "/foo");
        assert_eq!(request.headers["user-agent"], vec!["test"]);
    }

    #[test]
    fn test_captured_request_tolerates_partial_bodies() {
        let request: CapturedRequest = serde_json::from_str(r#"{"testId": "x"}"#).unwrap();
        assert_eq!(request.downstream_service_id, "x");
        assert!(request.path.is_empty());
    }
}
