// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use clap::{Parser, Subcommand};
use ingress_conformance::apiversion::{ApiVersion, ALL};
use ingress_conformance::apply::{self, ApplyOptions};
use ingress_conformance::checks::{self, Config, RunContext};
use ingress_conformance::k8s;
use std::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Parser)]
#[command(
    name = "ingress-controller-conformance",
    version,
    about = "Kubernetes Ingress controller conformance test harness"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply Ingress conformance fixtures to the current cluster
    ///
    /// Resources created by this command are labeled
    /// app.kubernetes.io/part-of, app.kubernetes.io/managed-by and
    /// app.kubernetes.io/version so a later run can clean them up.
    Apply {
        /// apiVersion of the fixture set to apply
        #[arg(long = "api-version", help = api_version_help())]
        api_version: ApiVersion,

        /// Ingress class to set on Ingress resources
        #[arg(long = "ingress-class")]
        ingress_class: Option<String>,

        /// Inject a default IngressClass resource with this spec.controller value
        #[arg(long = "ingress-controller")]
        ingress_controller: Option<String>,
    },

    /// Print the current Kubernetes context, server version, and supported Ingress APIVersions
    Context,

    /// List all conformance checks
    List,

    /// Run Ingress conformance verifications
    Verify {
        /// Run only checks compatible with this apiVersion
        #[arg(long = "api-version", help = api_version_help())]
        api_version: ApiVersion,

        /// Run only the named check (and its children)
        #[arg(long = "check")]
        check: Option<String>,

        /// Cleartext host to use instead of resolving Ingress status
        #[arg(long = "use-insecure-host")]
        use_insecure_host: Option<String>,

        /// TLS host to use instead of resolving Ingress status
        #[arg(long = "use-secure-host")]
        use_secure_host: Option<String>,
    },
}

fn api_version_help() -> String {
    let versions: Vec<&str> = ALL.iter().map(|v| v.as_str()).collect();
    format!("Ingress apiVersion, one of {versions:?}")
}

fn main() -> Result<()> {
    // Initialize logging with the env-driven format switch.
    //
    // Respects RUST_LOG for filtering (defaults to INFO) and
    // RUST_LOG_FORMAT=json for structured output.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("conformance")
        .enable_all()
        .build()?;

    let code = runtime.block_on(run(cli))?;
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Apply {
            api_version,
            ingress_class,
            ingress_controller,
        } => {
            let client = k8s::client().await?;
            apply::run(
                &client,
                &ApplyOptions {
                    api_version,
                    ingress_class,
                    ingress_controller,
                },
            )
            .await?;
            Ok(0)
        }

        Commands::Context => {
            run_context().await?;
            Ok(0)
        }

        Commands::List => {
            let suite = checks::all_checks()?;
            for line in suite.list() {
                println!("{line}");
            }
            Ok(0)
        }

        Commands::Verify {
            api_version,
            check,
            use_insecure_host,
            use_secure_host,
        } => {
            run_verify(api_version, check, use_insecure_host, use_secure_host).await
        }
    }
}

async fn run_context() -> Result<()> {
    let client = k8s::client().await?;

    if let Some(context) = k8s::current_context()? {
        println!("Using active Kubernetes context '{context}'");
    }

    let version = k8s::server_version(&client).await?;
    println!("The target Kubernetes cluster is running version {version}");

    for api_version in k8s::ingress_api_versions(&client).await? {
        println!("  Supports Ingress kind APIVersion: '{api_version}'");
    }

    Ok(())
}

async fn run_verify(
    api_version: ApiVersion,
    check: Option<String>,
    use_insecure_host: Option<String>,
    use_secure_host: Option<String>,
) -> Result<i32> {
    let config = Config {
        ingress_api_version: api_version,
        use_insecure_host,
        use_secure_host,
    };
    let ctx = RunContext::new(config);
    let suite = checks::all_checks()?;

    // Best-effort cleanup of managed namespaces when interrupted; the only
    // concurrent task in the process.
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted; cleaning up managed namespaces");
            if let Ok(client) = k8s::client().await {
                match k8s::delete_managed_namespaces(&client).await {
                    Ok(count) => debug!("requested deletion of {count} namespaces"),
                    Err(err) => error!("namespace cleanup failed: {err}"),
                }
            }
            std::process::exit(130);
        }
    });

    let started = Instant::now();
    let outcome = suite.verify(check.as_deref(), &ctx).await;
    info!(
        "{} checks passed, {} failed (elapsed: {:.2?})",
        outcome.passed,
        outcome.failed,
        started.elapsed()
    );

    Ok(if outcome.success() { 0 } else { 1 })
}
