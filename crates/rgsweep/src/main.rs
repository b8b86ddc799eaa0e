//! rgsweep - Resource group cleanup agent
//!
//! This is the main entry point. It wires together:
//! - Configuration loading (file, environment, arguments)
//! - Credential selection
//! - Resource Manager client
//! - Cleanup orchestrator

use anyhow::{Context, Result, bail};
use clap::Parser;
use rgsweep_azure::{ArmClient, select_credential};
use rgsweep_config::{CleanupConfig, ConfigOverrides, load_config, load_optional_config};
use rgsweep_core::CleanupOrchestrator;
use rgsweep_util::default_config_path;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// rgsweep - Delete resource groups that outlived their TTL
#[derive(Parser, Debug)]
#[command(name = "rgsweep")]
#[command(about = "Delete Azure resource groups that outlived their TTL", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/rgsweep/config.toml)
    #[arg(short, long, env = "RGSWEEP_CONFIG")]
    config: Option<PathBuf>,

    /// Directory (tenant) id
    #[arg(long, env = "RGSWEEP_TENANT_ID")]
    tenant_id: Option<String>,

    /// Subscription to clean up
    #[arg(long, env = "RGSWEEP_SUBSCRIPTION_ID")]
    subscription_id: Option<String>,

    /// Application (client) id of the service principal
    #[arg(long, env = "RGSWEEP_CLIENT_ID")]
    client_id: Option<String>,

    /// Base64-encoded PEM bundle with certificate and private key
    #[arg(long, env = "RGSWEEP_CLIENT_CERTIFICATE", hide_env_values = true)]
    client_certificate: Option<String>,

    /// AzurePublic, AzureUsGovernment or AzureChina
    #[arg(long, env = "RGSWEEP_CLOUD_INSTANCE")]
    cloud_instance: Option<String>,

    /// Credential mode: certificate or ambient
    #[arg(long, env = "RGSWEEP_CREDENTIAL")]
    credential: Option<String>,

    /// Minimum age in hours before a group may be deleted
    #[arg(long, env = "RGSWEEP_TTL_HOURS")]
    ttl_hours: Option<u32>,

    /// Additional reserved group name (repeatable)
    #[arg(long = "reserved-group", env = "RGSWEEP_RESERVED_GROUPS", value_delimiter = ',')]
    reserved_groups: Vec<String>,

    /// Log decisions without deleting or tagging anything
    #[arg(long, env = "RGSWEEP_DRY_RUN")]
    dry_run: bool,

    /// Per-group processing deadline in seconds (0 disables)
    #[arg(long, env = "RGSWEEP_GROUP_TIMEOUT_SECONDS")]
    group_timeout_seconds: Option<u64>,

    /// Hosting environment; "Development" selects the ambient credential
    #[arg(long, env = "RGSWEEP_ENVIRONMENT")]
    environment: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "RGSWEEP_JSON_LOGS")]
    json_logs: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            cloud_instance: self.cloud_instance.clone(),
            tenant_id: self.tenant_id.clone(),
            subscription_id: self.subscription_id.clone(),
            client_id: self.client_id.clone(),
            client_certificate: self.client_certificate.clone(),
            credential: self.credential.clone(),
            ttl_hours: self.ttl_hours,
            reserved_groups: self.reserved_groups.clone(),
            dry_run: self.dry_run,
            group_timeout_seconds: self.group_timeout_seconds,
            development: self
                .environment
                .as_deref()
                .is_some_and(|env| env.eq_ignore_ascii_case("development")),
        }
    }
}

fn load(args: &Args) -> Result<CleanupConfig> {
    let overrides = args.overrides();

    // An explicit path must exist; the default one is optional
    match &args.config {
        Some(path) => load_config(path, &overrides)
            .with_context(|| format!("Failed to load config from {:?}", path)),
        None => {
            let path = default_config_path();
            load_optional_config(&path, &overrides)
                .with_context(|| format!("Failed to load config from {:?}", path))
        }
    }
}

fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    if args.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    info!(version = env!("CARGO_PKG_VERSION"), "rgsweep starting");

    let config = load(&args)?;
    for (option, value) in config.masked_summary() {
        info!(option, value = %value, "Effective option");
    }
    if rgsweep_util::is_mock_time_active() {
        warn!(now = %rgsweep_util::now(), "Mock time is active");
    }

    let credential = select_credential(&config).context("Failed to initialise credential")?;
    let client = ArmClient::connect(&config, credential)
        .await
        .context("Failed to connect to Resource Manager")?;

    let orchestrator = CleanupOrchestrator::new(Arc::new(client), &config);

    let summary = tokio::select! {
        result = orchestrator.run() => result.context("Cleanup run aborted")?,
        _ = tokio::signal::ctrl_c() => {
            warn!(run_id = %orchestrator.run_id(), "Interrupted, in-flight deletions continue server-side");
            bail!("Interrupted");
        }
    };

    if summary.failed() > 0 {
        warn!(
            failed = summary.failed(),
            "Some resource groups could not be processed"
        );
    }

    info!("rgsweep finished");
    Ok(())
}
