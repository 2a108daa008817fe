// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The conformance check tree.
//!
//! A [`Check`] is a named node in a hierarchy. What a node does is a tagged
//! variant: a pure grouping node, a custom run function, or a declarative
//! [`RequestDescriptor`] executed through the capture layer. The suite is
//! assembled by an explicit builder ([`all_checks`]); registration problems
//! (a check registered under its own name, duplicate names) surface as
//! construction errors rather than panics so suite assembly stays testable.
//!
//! Execution ([`Check::verify`]) is a single-pass, depth-first, pre-order
//! walk: a node runs before its children, a failing node prunes its subtree
//! (children assume the parent's precondition holds), and per-check errors
//! are logged and counted without aborting the walk. All run state (the
//! lazily-built Kubernetes client, the configured host overrides, resolved
//! ingress addresses) travels in an explicit [`RunContext`] instead of
//! package-level globals.

use crate::apiversion::ApiVersion;
use crate::assertions::Assertions;
use crate::capture::{capture_round_trip, CapturedRequest, CapturedResponse};
use crate::errors::SuiteError;
use crate::k8s::{self, DEFAULT_NAMESPACE};
use futures::future::BoxFuture;
use kube::Client;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::AddAssign;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{error, info, warn};

pub mod default_backend;
pub mod host_rules;
pub mod load_balancing;
pub mod path_rules;
pub mod single_service;
pub mod tls_host_rules;

/// Run parameters for one `verify` invocation.
#[derive(Debug, Clone)]
pub struct Config {
    /// Ingress API version under test; checks incompatible with it are skipped
    pub ingress_api_version: ApiVersion,
    /// Cleartext host override, bypassing live Ingress-status lookup
    pub use_insecure_host: Option<String>,
    /// TLS host override, bypassing live Ingress-status lookup
    pub use_secure_host: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ingress_api_version: ApiVersion::NetworkingV1,
            use_insecure_host: None,
            use_secure_host: None,
        }
    }
}

/// Aggregate pass/fail counts of a verification walk.
///
/// Failure counting is per check, not per assertion: a check with five
/// mismatched assertions still counts as one failure.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Checks that ran and passed
    pub passed: usize,
    /// Checks that ran and failed or errored
    pub failed: usize,
}

impl Outcome {
    /// Total checks that ran.
    #[must_use]
    pub fn total(self) -> usize {
        self.passed + self.failed
    }

    /// True when nothing failed.
    #[must_use]
    pub fn success(self) -> bool {
        self.failed == 0
    }
}

impl AddAssign for Outcome {
    fn add_assign(&mut self, other: Self) {
        self.passed += other.passed;
        self.failed += other.failed;
    }
}

/// Assertion function of a request-based check.
pub type CheckFn = Box<dyn Fn(&CapturedRequest, &CapturedResponse) -> Assertions + Send + Sync>;

/// Future returned by a custom run function.
pub type RunFuture = BoxFuture<'static, Result<bool, SuiteError>>;

/// Custom run function for advanced checks.
///
/// Receives its own (cheap) clone of the run context.
pub type RunFn = Box<dyn Fn(RunContext) -> RunFuture + Send + Sync>;

/// Declarative description of one HTTP-based check.
///
/// Resolved at run time into a concrete URL: an explicit host override from
/// [`Config`] wins, otherwise the target Ingress's load-balancer address is
/// looked up live.
pub struct RequestDescriptor {
    /// Namespace of the target Ingress; `None` means `default`
    pub ingress_namespace: Option<String>,
    /// Name of the target Ingress
    pub ingress_name: String,
    /// Request path
    pub path: String,
    /// Host header (and SNI, for secure requests) override
    pub hostname: Option<String>,
    /// Cleartext instead of TLS
    pub insecure: bool,
    /// Maps the captured round trip to an assertion outcome
    pub check: CheckFn,
}

impl RequestDescriptor {
    /// A cleartext GET against `/` of the named Ingress.
    pub fn new(
        ingress_name: &str,
        check: impl Fn(&CapturedRequest, &CapturedResponse) -> Assertions + Send + Sync + 'static,
    ) -> Self {
        Self {
            ingress_namespace: None,
            ingress_name: ingress_name.to_string(),
            path: "/".to_string(),
            hostname: None,
            insecure: true,
            check: Box::new(check),
        }
    }

    /// Target a namespace other than `default`.
    #[must_use]
    pub fn namespace(mut self, namespace: &str) -> Self {
        self.ingress_namespace = Some(namespace.to_string());
        self
    }

    /// Request a path other than `/`.
    #[must_use]
    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    /// Override the Host header for host-based routing tests.
    #[must_use]
    pub fn hostname(mut self, hostname: &str) -> Self {
        self.hostname = Some(hostname.to_string());
        self
    }

    /// Switch to TLS.
    #[must_use]
    pub fn secure(mut self) -> Self {
        self.insecure = false;
        self
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("ingress_namespace", &self.ingress_namespace)
            .field("ingress_name", &self.ingress_name)
            .field("path", &self.path)
            .field("hostname", &self.hostname)
            .field("insecure", &self.insecure)
            .finish_non_exhaustive()
    }
}

/// What a check node does when reached.
pub enum CheckRun {
    /// Pure grouping/filtering node; nothing to execute
    Group,
    /// Custom run function for advanced cases
    Custom(RunFn),
    /// HTTP request + assertions, executed through the capture layer
    Request(RequestDescriptor),
}

impl fmt::Debug for CheckRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckRun::Group => f.write_str("Group"),
            CheckRun::Custom(_) => f.write_str("Custom(..)"),
            CheckRun::Request(descriptor) => f.debug_tuple("Request").field(descriptor).finish(),
        }
    }
}

/// A named node in the conformance check hierarchy.
#[derive(Debug)]
pub struct Check {
    name: String,
    description: Option<String>,
    api_versions: Vec<ApiVersion>,
    run: CheckRun,
    children: Vec<Check>,
}

impl Check {
    /// A grouping node with no run behavior of its own.
    #[must_use]
    pub fn group(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            api_versions: Vec::new(),
            run: CheckRun::Group,
            children: Vec::new(),
        }
    }

    /// A check executing a declarative HTTP request.
    #[must_use]
    pub fn request(name: &str, descriptor: RequestDescriptor) -> Self {
        Self {
            run: CheckRun::Request(descriptor),
            ..Self::group(name)
        }
    }

    /// A check executing a custom run function.
    pub fn custom<F>(name: &str, run: F) -> Self
    where
        F: Fn(RunContext) -> RunFuture + Send + Sync + 'static,
    {
        Self {
            run: CheckRun::Custom(Box::new(run)),
            ..Self::group(name)
        }
    }

    /// Attach the human-readable description shown by `list`.
    ///
    /// Checks without a description are structural placeholders and are
    /// invisible to the listing.
    #[must_use]
    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Restrict the check to specific Ingress API versions.
    ///
    /// Checks without a restriction apply to every version.
    #[must_use]
    pub fn api_versions(mut self, versions: &[ApiVersion]) -> Self {
        self.api_versions = versions.to_vec();
        self
    }

    /// Unique name of this check, the unit of `--check` filtering.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a child check.
    ///
    /// Rejects a child carrying this node's own name, and any name that
    /// already exists in this subtree; duplicate names would make filtered
    /// runs ambiguous. Callers treat this as a broken suite definition.
    pub fn add_check(&mut self, child: Check) -> Result<(), SuiteError> {
        if child.name == self.name {
            return Err(SuiteError::SelfParent { name: child.name });
        }

        let mut names = Vec::new();
        child.collect_names(&mut names);
        for name in names {
            if self.contains(name) {
                return Err(SuiteError::DuplicateCheck {
                    parent: self.name.clone(),
                    child: name.to_string(),
                });
            }
        }

        self.children.push(child);
        Ok(())
    }

    /// Depth-first description lines for the `list` command.
    ///
    /// One entry per described check: name, API-version gate, description.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        let mut lines = Vec::new();
        self.list_into(&mut lines);
        lines
    }

    fn list_into(&self, lines: &mut Vec<String>) {
        if let Some(description) = &self.description {
            let versions: Vec<&str> = self.api_versions.iter().map(|v| v.as_str()).collect();
            lines.push(format!("- {} {versions:?}\n\t{description}", self.name));
        }
        for child in &self.children {
            child.list_into(lines);
        }
    }

    /// Walk the tree and execute matching checks.
    ///
    /// With a filter, only the named subtree runs (found anywhere in the
    /// tree); without one, everything runs. A check incompatible with the
    /// configured API version skips its own run but not its children. A
    /// check that fails or errors prunes its children.
    pub fn verify<'a>(&'a self, filter: Option<&'a str>, ctx: &'a RunContext) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            let mut outcome = Outcome::default();

            if let Some(name) = filter {
                if name != self.name {
                    for child in &self.children {
                        outcome += child.verify(filter, ctx).await;
                    }
                    return outcome;
                }
            }

            let mut run_children = true;
            if self.applies_to(ctx.config().ingress_api_version) {
                if let Some(result) = self.execute(ctx).await {
                    match result {
                        Ok(true) => outcome.passed += 1,
                        Ok(false) => {
                            outcome.failed += 1;
                            run_children = false;
                            error!("check failed: {}", self.name);
                        }
                        Err(err) => {
                            outcome.failed += 1;
                            run_children = false;
                            error!("check '{}' errored: {err}", self.name);
                        }
                    }
                }
            }

            if run_children {
                for child in &self.children {
                    outcome += child.verify(None, ctx).await;
                }
            }

            outcome
        })
    }

    /// Run this node's own behavior, if it has one.
    async fn execute(&self, ctx: &RunContext) -> Option<Result<bool, SuiteError>> {
        match &self.run {
            CheckRun::Group => None,
            CheckRun::Custom(run) => {
                info!("running '{}' verifications...", self.name);
                Some(run(ctx.clone()).await)
            }
            CheckRun::Request(descriptor) => {
                info!("running '{}' verifications...", self.name);
                Some(run_request(&self.name, descriptor, ctx).await)
            }
        }
    }

    fn applies_to(&self, version: ApiVersion) -> bool {
        self.api_versions.is_empty() || self.api_versions.contains(&version)
    }

    fn contains(&self, name: &str) -> bool {
        self.name == name || self.children.iter().any(|child| child.contains(name))
    }

    fn collect_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        names.push(&self.name);
        for child in &self.children {
            child.collect_names(names);
        }
    }
}

/// Execute a request-based check: resolve the target, capture one round
/// trip, evaluate the assertions.
async fn run_request(
    name: &str,
    descriptor: &RequestDescriptor,
    ctx: &RunContext,
) -> Result<bool, SuiteError> {
    let location = ctx.location_for(descriptor).await?;
    let host_override = descriptor.hostname.as_deref().unwrap_or("");

    let (request, response) = capture_round_trip(&location, host_override).await?;
    let assertions = (descriptor.check)(&request, &response);

    if !assertions.passed() {
        error!("'{name}' assertions failed:\n{assertions}");
    } else if !assertions.warnings.is_empty() {
        warn!("'{name}' passed with warnings:\n{assertions}");
    }

    Ok(assertions.passed())
}

/// A gate check that succeeds iff the target Ingress has a resolvable
/// load-balancer address.
///
/// Used as the parent of request-check subtrees: when the address is
/// missing, every child would fail for the same reason, so the gate prunes
/// them and reports the root cause once.
#[must_use]
pub fn ingress_address_check(name: &str, namespace: &str, ingress: &str) -> Check {
    let namespace = namespace.to_string();
    let ingress = ingress.to_string();
    Check::custom(name, move |ctx| {
        let namespace = namespace.clone();
        let ingress = ingress.clone();
        Box::pin(async move {
            ctx.ingress_host(&namespace, &ingress).await?;
            Ok(true)
        })
    })
}

/// Explicit run state threaded through a verification walk.
///
/// Holds the configuration, the lazily-initialized shared Kubernetes
/// client, and a cache of resolved ingress addresses. Clones share the
/// same underlying state. Execution is single-threaded by design (checks
/// share the cache and the cluster sequentially), so the cache lock is
/// never contended.
#[derive(Clone)]
pub struct RunContext {
    inner: Arc<RunState>,
}

struct RunState {
    config: Config,
    client: OnceCell<Client>,
    host_cache: Mutex<BTreeMap<String, String>>,
}

impl RunContext {
    /// Build a context for one verification run.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(RunState {
                config,
                client: OnceCell::new(),
                host_cache: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    /// The run configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// The shared Kubernetes client, built on first use.
    pub async fn client(&self) -> Result<&Client, SuiteError> {
        self.inner.client.get_or_try_init(k8s::client).await
    }

    /// Load-balancer address of an Ingress, cached per `namespace/name`.
    pub async fn ingress_host(&self, namespace: &str, name: &str) -> Result<String, SuiteError> {
        let key = format!("{namespace}/{name}");

        let mut cache = self.inner.host_cache.lock().await;
        if let Some(host) = cache.get(&key) {
            return Ok(host.clone());
        }

        let client = self.client().await?;
        let host = k8s::ingress_host(client, namespace, name).await?;
        cache.insert(key, host.clone());
        Ok(host)
    }

    /// Cleartext endpoint for a target Ingress: the configured override if
    /// any, otherwise the live load-balancer address.
    pub async fn insecure_endpoint(&self, namespace: &str, name: &str) -> Result<String, SuiteError> {
        match &self.inner.config.use_insecure_host {
            Some(host) => Ok(host.clone()),
            None => self.ingress_host(namespace, name).await,
        }
    }

    /// Resolve a request descriptor into a concrete URL.
    async fn location_for(&self, descriptor: &RequestDescriptor) -> Result<String, SuiteError> {
        let (scheme, override_host) = if descriptor.insecure {
            ("http", &self.inner.config.use_insecure_host)
        } else {
            ("https", &self.inner.config.use_secure_host)
        };

        let host = match override_host {
            Some(host) => host.clone(),
            None => {
                let namespace = descriptor
                    .ingress_namespace
                    .as_deref()
                    .unwrap_or(DEFAULT_NAMESPACE);
                self.ingress_host(namespace, &descriptor.ingress_name).await?
            }
        };

        Ok(format!("{scheme}://{host}{path}", path = descriptor.path))
    }
}

/// Assemble the full conformance suite.
pub fn all_checks() -> Result<Check, SuiteError> {
    let mut root = Check::group("all");
    root.add_check(single_service::checks())?;
    root.add_check(default_backend::checks())?;
    root.add_check(host_rules::checks()?)?;
    root.add_check(path_rules::checks()?)?;
    root.add_check(load_balancing::checks())?;
    root.add_check(tls_host_rules::checks())?;
    Ok(root)
}
