// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes plumbing: client bootstrap, Ingress status lookup, and
//! managed test-namespace lifecycle.
//!
//! The harness consumes a deliberately small slice of the API surface:
//! "what address did the load balancer give this Ingress", cluster
//! identification for the `context` command, and namespace hygiene for
//! scenario runs.

use crate::errors::SuiteError;
use crate::labels::{managed_selector, APP_NAME, APP_VERSION, K8S_MANAGED_BY, K8S_PART_OF, K8S_VERSION};
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::{Client, Discovery};
use rand::Rng;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Namespace the fixture manifests are applied into.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Build a client from the ambient kubeconfig/in-cluster environment.
///
/// Inability to load a client configuration indicates an unusable
/// environment; callers treat this as fatal.
pub async fn client() -> Result<Client, SuiteError> {
    debug!("initializing Kubernetes client");
    Ok(Client::try_default().await?)
}

/// Name of the kubeconfig context the client will use.
pub fn current_context() -> Result<Option<String>, SuiteError> {
    let kubeconfig = kube::config::Kubeconfig::read()?;
    Ok(kubeconfig.current_context)
}

/// Version string reported by the API server.
pub async fn server_version(client: &Client) -> Result<String, SuiteError> {
    let info = client.apiserver_version().await?;
    Ok(info.git_version)
}

/// API versions on this cluster that serve the `Ingress` kind.
pub async fn ingress_api_versions(client: &Client) -> Result<Vec<String>, SuiteError> {
    let discovery = Discovery::new(client.clone()).run().await?;

    let mut versions = Vec::new();
    for group in discovery.groups() {
        for (resource, _caps) in group.recommended_resources() {
            if resource.kind == "Ingress" {
                versions.push(resource.api_version.clone());
            }
        }
    }
    Ok(versions)
}

/// Resolve the load-balancer address of an Ingress from its status.
///
/// Prefers the hostname over the IP, matching what public clouds populate.
/// An Ingress without any load-balancer interface is reported with a hint
/// toward the `--use-insecure-host`/`--use-secure-host` overrides, since
/// some test infrastructures never provision a public address.
pub async fn ingress_host(
    client: &Client,
    namespace: &str,
    name: &str,
) -> Result<String, SuiteError> {
    let api: Api<Ingress> = Api::namespaced(client.clone(), namespace);
    let ingress = api.get(name).await?;

    let entries = ingress
        .status
        .and_then(|status| status.load_balancer)
        .and_then(|lb| lb.ingress)
        .unwrap_or_default();

    let Some(entry) = entries.first() else {
        return Err(SuiteError::NoLoadBalancer { name: name.to_string() });
    };

    let host = entry
        .hostname
        .clone()
        .filter(|h| !h.is_empty())
        .or_else(|| entry.ip.clone().filter(|ip| !ip.is_empty()));

    host.ok_or_else(|| SuiteError::EmptyLoadBalancer { name: name.to_string() })
}

/// Create a namespace for one scenario run, labeled for later cleanup.
///
/// Returns the generated name (`<prefix>-<random suffix>`).
pub async fn create_test_namespace(client: &Client, prefix: &str) -> Result<String, SuiteError> {
    let mut rng = rand::thread_rng();
    let suffix: u32 = rng.gen_range(100_000..1_000_000);
    let name = format!("{prefix}-{suffix}");

    let mut labels = BTreeMap::new();
    labels.insert(K8S_PART_OF.to_string(), APP_NAME.to_string());
    labels.insert(K8S_MANAGED_BY.to_string(), APP_NAME.to_string());
    labels.insert(K8S_VERSION.to_string(), APP_VERSION.to_string());

    let namespace = Namespace {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            labels: Some(labels),
            ..Default::default()
        },
        ..Default::default()
    };

    let api: Api<Namespace> = Api::all(client.clone());
    api.create(&PostParams::default(), &namespace).await?;
    info!(namespace = %name, "created test namespace");
    Ok(name)
}

/// Delete one namespace, ignoring "not found".
pub async fn delete_namespace(client: &Client, name: &str) -> Result<(), SuiteError> {
    let api: Api<Namespace> = Api::all(client.clone());
    match api.delete(name, &DeleteParams::default()).await {
        Ok(_) => {
            info!(namespace = %name, "deleted test namespace");
            Ok(())
        }
        Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Best-effort deletion of every namespace this harness created.
///
/// Used by the interrupt handler and at the end of scenario runs; failures
/// are logged per namespace and do not stop the sweep. Returns how many
/// deletions were requested.
pub async fn delete_managed_namespaces(client: &Client) -> Result<usize, SuiteError> {
    let api: Api<Namespace> = Api::all(client.clone());
    let params = ListParams::default().labels(&managed_selector());
    let namespaces = api.list(&params).await?;

    let mut deleted = 0;
    for namespace in namespaces {
        let Some(name) = namespace.metadata.name else {
            continue;
        };
        match api.delete(&name, &DeleteParams::default()).await {
            Ok(_) => deleted += 1,
            Err(err) => warn!(namespace = %name, "failed to delete namespace: {err}"),
        }
    }
    Ok(deleted)
}
