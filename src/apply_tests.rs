// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for fixture parsing, label stamping, and annotation handling.

#[cfg(test)]
mod tests {
    use crate::apiversion::ApiVersion;
    use crate::apply::{
        manifests, parse_manifest, set_ingress_class, stamp_labels, tls_secret, FixtureObject,
        TLS_SECRET_NAME,
    };
    use crate::errors::SuiteError;
    use crate::labels::{
        APP_NAME, INGRESS_CLASS_ANNOTATION, K8S_MANAGED_BY, K8S_PART_OF, K8S_VERSION,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    #[test]
    fn test_manifests_exist_for_networking_v1() {
        let files = manifests(ApiVersion::NetworkingV1).unwrap();
        assert_eq!(files.len(), 6);
    }

    #[test]
    fn test_manifests_missing_for_beta_versions() {
        let err = manifests(ApiVersion::NetworkingV1beta1).unwrap_err();
        assert!(matches!(err, SuiteError::NoFixtures { .. }));
        let err = manifests(ApiVersion::ExtensionsV1beta1).unwrap_err();
        assert!(
            matches!(err, SuiteError::NoFixtures { api_version } if api_version == "extensions/v1beta1")
        );
    }

    #[test]
    fn test_every_fixture_parses_into_typed_objects() {
        for (name, yaml) in manifests(ApiVersion::NetworkingV1).unwrap() {
            let objects = parse_manifest(name, yaml).unwrap();
            assert!(!objects.is_empty(), "{name} produced no objects");
        }
    }

    #[test]
    fn test_single_service_fixture_contents() {
        let files = manifests(ApiVersion::NetworkingV1).unwrap();
        let (name, yaml) = files
            .iter()
            .find(|(name, _)| *name == "single-service.yaml")
            .unwrap();

        let objects = parse_manifest(name, yaml).unwrap();
        assert_eq!(objects.len(), 3);
        assert!(matches!(objects[0], FixtureObject::Deployment(_)));
        assert!(matches!(objects[1], FixtureObject::Service(_)));
        assert!(matches!(objects[2], FixtureObject::Ingress(_)));
    }

    #[test]
    fn test_fixture_ingresses_opt_into_class_selection() {
        // Every fixture Ingress must carry the annotation key so that
        // --ingress-class can override it.
        for (name, yaml) in manifests(ApiVersion::NetworkingV1).unwrap() {
            for object in parse_manifest(name, yaml).unwrap() {
                if let FixtureObject::Ingress(ingress) = object {
                    let annotations = ingress.metadata.annotations.unwrap_or_default();
                    assert!(
                        annotations.contains_key(INGRESS_CLASS_ANNOTATION),
                        "{name}: Ingress without ingress.class annotation"
                    );
                }
            }
        }
    }

    #[test]
    fn test_parse_manifest_rejects_unknown_kind() {
        let yaml = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: nope\n";
        let err = parse_manifest("bad.yaml", yaml).unwrap_err();
        assert!(matches!(err, SuiteError::UnsupportedKind { kind, .. } if kind == "ConfigMap"));
    }

    #[test]
    fn test_stamp_labels_adds_managed_labels() {
        let mut meta = ObjectMeta::default();
        stamp_labels(&mut meta);

        let labels = meta.labels.unwrap();
        assert_eq!(labels.get(K8S_PART_OF).unwrap(), APP_NAME);
        assert_eq!(labels.get(K8S_MANAGED_BY).unwrap(), APP_NAME);
        assert!(labels.contains_key(K8S_VERSION));
    }

    #[test]
    fn test_stamp_labels_preserves_existing_labels() {
        let mut existing = BTreeMap::new();
        existing.insert("app.kubernetes.io/name".to_string(), "echo".to_string());
        let mut meta = ObjectMeta {
            labels: Some(existing),
            ..Default::default()
        };

        stamp_labels(&mut meta);
        let labels = meta.labels.unwrap();
        assert_eq!(labels.get("app.kubernetes.io/name").unwrap(), "echo");
        assert_eq!(labels.get(K8S_MANAGED_BY).unwrap(), APP_NAME);
    }

    #[test]
    fn test_set_ingress_class_overrides_existing_annotation() {
        let mut annotations = BTreeMap::new();
        annotations.insert(INGRESS_CLASS_ANNOTATION.to_string(), "conformance".to_string());
        let mut meta = ObjectMeta {
            annotations: Some(annotations),
            ..Default::default()
        };

        set_ingress_class(&mut meta, "nginx");
        assert_eq!(
            meta.annotations.unwrap().get(INGRESS_CLASS_ANNOTATION).unwrap(),
            "nginx"
        );
    }

    #[test]
    fn test_set_ingress_class_leaves_unannotated_objects_alone() {
        let mut meta = ObjectMeta::default();
        set_ingress_class(&mut meta, "nginx");
        assert!(meta.annotations.is_none());
    }

    #[test]
    fn test_tls_secret_carries_certificate_material() {
        let secret = tls_secret("tls.foo.com").unwrap();

        assert_eq!(secret.metadata.name.as_deref(), Some(TLS_SECRET_NAME));
        assert_eq!(secret.type_.as_deref(), Some("kubernetes.io/tls"));

        let data = secret.string_data.unwrap();
        assert!(data.get("tls.crt").unwrap().contains("BEGIN CERTIFICATE"));
        assert!(data.get("tls.key").unwrap().contains("PRIVATE KEY"));

        let labels = secret.metadata.labels.unwrap();
        assert_eq!(labels.get(K8S_MANAGED_BY).unwrap(), APP_NAME);
    }
}
