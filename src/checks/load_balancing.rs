// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Load-balancing conformance: traffic for one backend service spreads
//! across its pods.
//!
//! The fixture deployment leaves `TEST_ID` unset, so each echo pod reports
//! its own pod name as the downstream identity. Sampling the endpoint
//! repeatedly must observe more than one identity.

use crate::capture::capture_round_trip;
use crate::checks::{Check, RunContext, RunFuture};
use crate::k8s::DEFAULT_NAMESPACE;
use std::collections::BTreeSet;
use tracing::error;

/// How many round trips to sample. Enough that a controller balancing over
/// two or three replicas is overwhelmingly likely to show all of them.
const SAMPLES: usize = 10;

/// Build the load-balancing check.
#[must_use]
pub fn checks() -> Check {
    Check::custom("load-balancing", run).describe(
        "Ingress backed by a multi-replica service should spread traffic across its pods",
    )
}

fn run(ctx: RunContext) -> RunFuture {
    Box::pin(async move {
        let endpoint = ctx
            .insecure_endpoint(DEFAULT_NAMESPACE, "load-balancing")
            .await?;
        let location = format!("http://{endpoint}/");

        let mut backends = BTreeSet::new();
        for _ in 0..SAMPLES {
            let (request, response) = capture_round_trip(&location, "").await?;
            if response.status_code != 200 {
                error!(
                    "expected the status code to be 200 but was {}",
                    response.status_code
                );
                return Ok(false);
            }
            backends.insert(request.downstream_service_id);
        }

        if backends.len() > 1 {
            Ok(true)
        } else {
            error!("expected traffic to reach more than one pod, but {SAMPLES} requests all reached {backends:?}");
            Ok(false)
        }
    })
}
