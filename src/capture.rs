// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP round-trip capture against the echo-server backend.
//!
//! A capture performs exactly one HTTP(S) request and normalizes both sides
//! into comparison-friendly structures: the JSON body the echo server
//! reflects back becomes a [`CapturedRequest`] (what the Ingress controller
//! actually forwarded), and the response metadata becomes a
//! [`CapturedResponse`].
//!
//! Secure captures skip certificate-chain trust (the fixtures are
//! self-signed) but still require the presented leaf certificate to cover
//! the requested hostname. That split is the property under test: "does the
//! controller terminate TLS with the right certificate for this host",
//! independent of "is the CA trusted".

use crate::assertions::Headers;
use crate::errors::CaptureError;
use reqwest::{header, redirect, Method};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Per-request timeout. A conformance probe that hangs is a failure, not a
/// condition to wait out.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// The request as received by the downstream echo server.
///
/// This is the echo server's wire contract: the JSON body it reflects for
/// every request. `testId` carries the `TEST_ID` environment variable of the
/// downstream service, which is how checks identify the backend that
/// actually answered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapturedRequest {
    /// Identity tag of the downstream service that answered
    #[serde(rename = "testId")]
    pub downstream_service_id: String,
    /// Request path as seen by the backend, preserved verbatim
    pub path: String,
    /// Host the backend observed
    pub host: String,
    /// HTTP method
    pub method: String,
    /// Protocol string, e.g. `HTTP/1.1`
    pub proto: String,
    /// Request headers, lowercase keys
    pub headers: Headers,
    /// Namespace the echo server runs in
    pub namespace: String,
    /// Ingress the echo server was applied for
    pub ingress: String,
    /// Service fronting the echo server
    pub service: String,
}

/// Metadata of the HTTP response returned through the Ingress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedResponse {
    /// HTTP status code
    pub status_code: u16,
    /// Content length, when the response declared one
    pub content_length: Option<u64>,
    /// Protocol string, e.g. `HTTP/1.1`
    pub proto: String,
    /// Response headers, lowercase keys
    pub headers: Headers,
    /// Hostname the presented TLS certificate was verified against;
    /// `None` for cleartext captures
    pub tls_hostname: Option<String>,
}

/// Perform one GET round trip and capture both sides.
///
/// `host_override` replaces the request's Host header (and, for secure
/// locations, the SNI value and certificate hostname check) while the
/// connection still targets `location`'s authority. An empty override
/// leaves the location untouched. This is what allows exercising host-based
/// routing rules without DNS control over the test domains.
pub async fn capture_round_trip(
    location: &str,
    host_override: &str,
) -> Result<(CapturedRequest, CapturedResponse), CaptureError> {
    capture_round_trip_with_method(Method::GET, location, host_override).await
}

/// Perform one round trip with an explicit method.
///
/// Redirects are never followed (they must be observed, not resolved),
/// response compression is disabled so content lengths stay deterministic,
/// and no retries are attempted.
pub async fn capture_round_trip_with_method(
    method: Method,
    location: &str,
    host_override: &str,
) -> Result<(CapturedRequest, CapturedResponse), CaptureError> {
    let url = Url::parse(location).map_err(|source| CaptureError::InvalidLocation {
        location: location.to_string(),
        source,
    })?;
    let secure = url.scheme() == "https";

    let mut builder = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .redirect(redirect::Policy::none());

    let mut request_url = url.clone();
    let mut tls_hostname = None;

    if secure {
        builder = builder.use_preconfigured_tls(hostname_only_tls_config());
        tls_hostname = url.host_str().map(str::to_string);

        if !host_override.is_empty() {
            // Keep dialing the resolved ingress address, but put the
            // override on the URL so SNI, Host, and the certificate
            // hostname check all see the intended name.
            let addr = resolve_authority(&url).await?;
            builder = builder.resolve(host_override, addr);
            request_url
                .set_host(Some(host_override))
                .map_err(|source| CaptureError::InvalidLocation {
                    location: location.to_string(),
                    source,
                })?;
            tls_hostname = Some(host_override.to_string());
        }
    }

    let client = builder.build()?;
    let mut request = client.request(method, request_url);
    if !secure && !host_override.is_empty() {
        request = request.header(header::HOST, host_override);
    }

    debug!(%location, host_override, "capturing round trip");
    let response = request.send().await?;

    let status = response.status().as_u16();
    let proto = proto_string(response.version());
    let content_length = response.content_length();
    let headers = collect_headers(response.headers());
    let body = response.bytes().await?;

    let captured: CapturedRequest =
        serde_json::from_slice(&body).map_err(|_| CaptureError::UnexpectedResponse {
            status,
            length: body.len(),
            body: String::from_utf8_lossy(&body).into_owned(),
        })?;

    let response = CapturedResponse {
        status_code: status,
        content_length,
        proto,
        headers,
        tls_hostname,
    };

    Ok((captured, response))
}

/// Render an HTTP version the way servers spell it, e.g. `HTTP/1.1`.
#[must_use]
pub fn proto_string(version: http::Version) -> String {
    format!("{version:?}")
}

/// Collect a header map into the comparison shape, lowercase keys.
#[must_use]
pub fn collect_headers(map: &http::HeaderMap) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in map {
        headers
            .entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    headers
}

/// Resolve a URL's authority to one socket address for pinned dialing.
async fn resolve_authority(url: &Url) -> Result<SocketAddr, CaptureError> {
    let authority = format!(
        "{host}:{port}",
        host = url.host_str().unwrap_or_default(),
        port = url.port_or_known_default().unwrap_or(443),
    );
    tokio::net::lookup_host(&authority)
        .await
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or(CaptureError::Unresolvable { authority })
}

/// TLS client configuration that skips chain trust but verifies hostnames.
pub(crate) fn hostname_only_tls_config() -> rustls::ClientConfig {
    rustls::ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(HostnameOnlyVerifier))
        .with_no_client_auth()
}

/// Certificate verifier for self-signed test fixtures.
///
/// Chain trust and signatures are not evaluated; the presented leaf must
/// still cover the requested server name.
#[derive(Debug)]
pub(crate) struct HostnameOnlyVerifier;

impl ServerCertVerifier for HostnameOnlyVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let cert = rustls::server::ParsedCertificate::try_from(end_entity)?;
        rustls::client::verify_server_name(&cert, server_name)?;
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
