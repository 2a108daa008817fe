// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for Ingress API version parsing and display.

#[cfg(test)]
mod tests {
    use crate::apiversion::{ApiVersion, ALL};
    use crate::errors::SuiteError;

    #[test]
    fn test_display_round_trips_through_from_str() {
        for version in ALL {
            let parsed: ApiVersion = version.to_string().parse().unwrap();
            assert_eq!(parsed, version);
        }
    }

    #[test]
    fn test_networking_v1_spelling() {
        assert_eq!(ApiVersion::NetworkingV1.as_str(), "networking.k8s.io/v1");
        assert_eq!(
            ApiVersion::NetworkingV1beta1.as_str(),
            "networking.k8s.io/v1beta1"
        );
        assert_eq!(ApiVersion::ExtensionsV1beta1.as_str(), "extensions/v1beta1");
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let err = "networking.k8s.io/v2".parse::<ApiVersion>().unwrap_err();
        match err {
            SuiteError::UnknownApiVersion { given } => {
                assert_eq!(given, "networking.k8s.io/v2");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_all_lists_newest_first() {
        assert_eq!(ALL[0], ApiVersion::NetworkingV1);
        assert_eq!(ALL.len(), 3);
    }
}
