// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Fixture application: render, label, and apply the conformance resources.
//!
//! Fixture manifests are embedded in the binary per Ingress API version.
//! Applying first deletes everything a previous run left behind (found via
//! the managed-by label), then server-side-applies each object with the
//! harness's field manager. Every created resource is stamped with the
//! `app.kubernetes.io/part-of`, `managed-by`, and `version` labels;
//! Ingresses additionally get their `kubernetes.io/ingress.class`
//! annotation overridden when requested. The TLS fixture secret is
//! generated fresh on every apply with a self-signed certificate.

use crate::apiversion::ApiVersion;
use crate::checks::tls_host_rules::TLS_HOST;
use crate::errors::SuiteError;
use crate::k8s::DEFAULT_NAMESPACE;
use crate::labels::{
    managed_selector, APP_NAME, APP_VERSION, DEFAULT_CLASS_ANNOTATION, INGRESS_CLASS_ANNOTATION,
    K8S_MANAGED_BY, K8S_PART_OF, K8S_VERSION,
};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Secret, Service};
use k8s_openapi::api::networking::v1::{Ingress, IngressClass, IngressClassSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams};
use kube::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Field manager for server-side apply.
pub const FIELD_MANAGER: &str = APP_NAME;

/// Name of the generated TLS fixture secret, referenced by the TLS Ingress.
pub const TLS_SECRET_NAME: &str = "tls-host-rules-cert";

/// Parameters of one `apply` invocation.
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    /// API version whose fixture set is applied
    pub api_version: ApiVersion,
    /// Override the `kubernetes.io/ingress.class` annotation on Ingresses
    pub ingress_class: Option<String>,
    /// Inject a default `IngressClass` with this `spec.controller` value
    pub ingress_controller: Option<String>,
}

const NETWORKING_V1_FIXTURES: &[(&str, &str)] = &[
    (
        "single-service.yaml",
        include_str!("../fixtures/networking-v1/single-service.yaml"),
    ),
    (
        "default-backend.yaml",
        include_str!("../fixtures/networking-v1/default-backend.yaml"),
    ),
    (
        "host-rules.yaml",
        include_str!("../fixtures/networking-v1/host-rules.yaml"),
    ),
    (
        "path-rules.yaml",
        include_str!("../fixtures/networking-v1/path-rules.yaml"),
    ),
    (
        "load-balancing.yaml",
        include_str!("../fixtures/networking-v1/load-balancing.yaml"),
    ),
    (
        "tls-host-rules.yaml",
        include_str!("../fixtures/networking-v1/tls-host-rules.yaml"),
    ),
];

/// Embedded fixture manifests for an API version.
///
/// Only `networking.k8s.io/v1` ships typed fixtures; the deprecated beta
/// versions are still accepted as flag values for check gating but have no
/// manifests.
pub fn manifests(
    api_version: ApiVersion,
) -> Result<&'static [(&'static str, &'static str)], SuiteError> {
    match api_version {
        ApiVersion::NetworkingV1 => Ok(NETWORKING_V1_FIXTURES),
        other => Err(SuiteError::NoFixtures {
            api_version: other.to_string(),
        }),
    }
}

/// A typed object decoded from a fixture manifest.
#[derive(Debug)]
pub(crate) enum FixtureObject {
    Deployment(Deployment),
    Service(Service),
    Ingress(Ingress),
    Secret(Secret),
}

/// Decode one fixture file (possibly multi-document) into typed objects.
pub(crate) fn parse_manifest(name: &str, yaml: &str) -> Result<Vec<FixtureObject>, SuiteError> {
    let manifest_error = |source| SuiteError::Manifest {
        name: name.to_string(),
        source,
    };

    let mut objects = Vec::new();
    for document in serde_yaml::Deserializer::from_str(yaml) {
        let value = serde_yaml::Value::deserialize(document).map_err(manifest_error)?;
        if value.is_null() {
            continue;
        }

        let kind = value
            .get("kind")
            .and_then(serde_yaml::Value::as_str)
            .unwrap_or_default()
            .to_string();

        let object = match kind.as_str() {
            "Deployment" => {
                FixtureObject::Deployment(serde_yaml::from_value(value).map_err(manifest_error)?)
            }
            "Service" => {
                FixtureObject::Service(serde_yaml::from_value(value).map_err(manifest_error)?)
            }
            "Ingress" => {
                FixtureObject::Ingress(serde_yaml::from_value(value).map_err(manifest_error)?)
            }
            "Secret" => {
                FixtureObject::Secret(serde_yaml::from_value(value).map_err(manifest_error)?)
            }
            _ => {
                return Err(SuiteError::UnsupportedKind {
                    name: name.to_string(),
                    kind,
                })
            }
        };
        objects.push(object);
    }

    Ok(objects)
}

/// Stamp the managed-resource labels onto an object.
pub(crate) fn stamp_labels(meta: &mut ObjectMeta) {
    let labels = meta.labels.get_or_insert_with(BTreeMap::new);
    labels.insert(K8S_PART_OF.to_string(), APP_NAME.to_string());
    labels.insert(K8S_MANAGED_BY.to_string(), APP_NAME.to_string());
    labels.insert(K8S_VERSION.to_string(), APP_VERSION.to_string());
}

/// Override the ingress-class annotation where the fixture defines it.
///
/// Fixtures that opt into class selection carry the annotation with a
/// placeholder value; fixtures without the key are left untouched.
pub(crate) fn set_ingress_class(meta: &mut ObjectMeta, class: &str) {
    if let Some(annotations) = meta.annotations.as_mut() {
        if annotations
            .get(INGRESS_CLASS_ANNOTATION)
            .is_some_and(|value| !value.is_empty())
        {
            annotations.insert(INGRESS_CLASS_ANNOTATION.to_string(), class.to_string());
        }
    }
}

/// Generate the self-signed TLS fixture secret for `host`.
pub(crate) fn tls_secret(host: &str) -> Result<Secret, SuiteError> {
    let certified = rcgen::generate_simple_self_signed(vec![host.to_string()])?;

    let mut string_data = BTreeMap::new();
    string_data.insert("tls.crt".to_string(), certified.cert.pem());
    string_data.insert("tls.key".to_string(), certified.key_pair.serialize_pem());

    let mut secret = Secret {
        metadata: ObjectMeta {
            name: Some(TLS_SECRET_NAME.to_string()),
            namespace: Some(DEFAULT_NAMESPACE.to_string()),
            ..Default::default()
        },
        type_: Some("kubernetes.io/tls".to_string()),
        string_data: Some(string_data),
        ..Default::default()
    };
    stamp_labels(&mut secret.metadata);
    Ok(secret)
}

/// The injected default `IngressClass` for `--ingress-controller`.
fn conformance_ingress_class(controller: &str) -> IngressClass {
    let mut annotations = BTreeMap::new();
    annotations.insert(DEFAULT_CLASS_ANNOTATION.to_string(), "true".to_string());

    let mut class = IngressClass {
        metadata: ObjectMeta {
            name: Some("conformance".to_string()),
            annotations: Some(annotations),
            ..Default::default()
        },
        spec: Some(IngressClassSpec {
            controller: Some(controller.to_string()),
            parameters: None,
        }),
    };
    stamp_labels(&mut class.metadata);
    class
}

/// Apply the fixture set for the requested API version.
pub async fn run(client: &Client, options: &ApplyOptions) -> Result<(), SuiteError> {
    let files = manifests(options.api_version)?;

    info!("cleaning managed resources from previous run...");
    cleanup(client).await?;

    if let Some(controller) = &options.ingress_controller {
        let class = conformance_ingress_class(controller);
        let api: Api<IngressClass> = Api::all(client.clone());
        apply_object(&api, "networking.k8s.io/v1", "IngressClass", &class).await?;
    }

    let secret = tls_secret(TLS_HOST)?;
    let api: Api<Secret> = Api::namespaced(client.clone(), DEFAULT_NAMESPACE);
    apply_object(&api, "v1", "Secret", &secret).await?;

    for (name, yaml) in files {
        info!("applying fixture manifests from {name}");
        for object in parse_manifest(name, yaml)? {
            match object {
                FixtureObject::Deployment(mut deployment) => {
                    stamp_labels(&mut deployment.metadata);
                    let api = namespaced_api::<Deployment>(client, &deployment.metadata);
                    apply_object(&api, "apps/v1", "Deployment", &deployment).await?;
                }
                FixtureObject::Service(mut service) => {
                    stamp_labels(&mut service.metadata);
                    let api = namespaced_api::<Service>(client, &service.metadata);
                    apply_object(&api, "v1", "Service", &service).await?;
                }
                FixtureObject::Ingress(mut ingress) => {
                    stamp_labels(&mut ingress.metadata);
                    if let Some(class) = &options.ingress_class {
                        set_ingress_class(&mut ingress.metadata, class);
                    }
                    let api = namespaced_api::<Ingress>(client, &ingress.metadata);
                    apply_object(&api, "networking.k8s.io/v1", "Ingress", &ingress).await?;
                }
                FixtureObject::Secret(mut secret) => {
                    stamp_labels(&mut secret.metadata);
                    let api = namespaced_api::<Secret>(client, &secret.metadata);
                    apply_object(&api, "v1", "Secret", &secret).await?;
                }
            }
        }
    }

    Ok(())
}

fn namespaced_api<K>(client: &Client, meta: &ObjectMeta) -> Api<K>
where
    K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
    <K as kube::Resource>::DynamicType: Default,
{
    let namespace = meta.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE);
    Api::namespaced(client.clone(), namespace)
}

/// Server-side-apply one object under the harness field manager.
async fn apply_object<K>(
    api: &Api<K>,
    api_version: &str,
    kind: &str,
    object: &K,
) -> Result<(), SuiteError>
where
    K: kube::Resource + serde::Serialize + serde::de::DeserializeOwned + Clone + std::fmt::Debug,
{
    let name = object.meta().name.clone().unwrap_or_default();
    if name.is_empty() {
        warn!("skipping unnamed {kind} object");
        return Ok(());
    }

    let mut payload = serde_json::to_value(object)?;
    payload["apiVersion"] = json!(api_version);
    payload["kind"] = json!(kind);

    api.patch(
        &name,
        &PatchParams::apply(FIELD_MANAGER).force(),
        &Patch::Apply(&payload),
    )
    .await?;
    info!("applied {kind} '{name}'");
    Ok(())
}

/// Delete everything a previous run labeled as managed.
async fn cleanup(client: &Client) -> Result<(), SuiteError> {
    let params = ListParams::default().labels(&managed_selector());
    let delete = DeleteParams::default();

    Api::<Deployment>::namespaced(client.clone(), DEFAULT_NAMESPACE)
        .delete_collection(&delete, &params)
        .await?;
    Api::<Service>::namespaced(client.clone(), DEFAULT_NAMESPACE)
        .delete_collection(&delete, &params)
        .await?;
    Api::<Ingress>::namespaced(client.clone(), DEFAULT_NAMESPACE)
        .delete_collection(&delete, &params)
        .await?;
    Api::<Secret>::namespaced(client.clone(), DEFAULT_NAMESPACE)
        .delete_collection(&delete, &params)
        .await?;

    // Not every cluster serves IngressClass; tolerate failure.
    if let Err(err) = Api::<IngressClass>::all(client.clone())
        .delete_collection(&delete, &params)
        .await
    {
        warn!("failed to delete managed ingressclasses: {err}");
    }

    Ok(())
}
