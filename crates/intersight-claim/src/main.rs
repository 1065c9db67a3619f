//! Claim UCS-managed devices into the management service.
//!
//! Reads a claim configuration file, extracts a claim credential from each
//! device's connector, registers the claims, and provisions the resource
//! group, organization, and role bindings for the claimed devices.

use anyhow::{bail, Context, Result};
use clap::Parser;
use intersight_cloud::CloudClientBuilder;
use intersight_connector::claim::{fetch_claim_credential, ClaimOutcome};
use intersight_connector::client::ConnectorClientBuilder;
use intersight_connector::session::XmlApiSession;
use intersight_core::client::ClientConfig;
use intersight_core::config::ClaimConfig;
use intersight_core::types::Moid;
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "intersight-claim")]
#[command(about = "Claim UCS-managed devices into Intersight", long_about = None)]
#[command(version)]
struct Cli {
    /// Claim configuration file (.json, .yml, or .yaml)
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) -> Result<()> {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;
    run(&cli.config).await
}

async fn run(config_path: &Path) -> Result<()> {
    info!(path = %config_path.display(), "reading claim configuration");
    let config = ClaimConfig::from_path(config_path)?;

    let secret_key = std::fs::read_to_string(&config.intersight_authentication.secret_key_filename)
        .with_context(|| {
            format!(
                "Failed to read secret key {}",
                config
                    .intersight_authentication
                    .secret_key_filename
                    .display()
            )
        })?;

    let cloud = CloudClientBuilder::new(config.intersight_base_url.clone())
        .with_api_key(
            config.intersight_authentication.api_key_id.clone(),
            SecretString::from(secret_key),
        )
        .build()?;

    // devices carry self-signed certificates
    let device_http = ClientConfig::new().with_tls_verify(false);
    let session_client = XmlApiSession::new(&device_http)?;

    let mut registrations: Vec<Moid> = Vec::new();
    let mut failures: Vec<String> = Vec::new();

    for device in &config.devices {
        info!(hostname = %device.hostname, "claiming device");

        let claimed = claim_one(&session_client, &device_http, &cloud, device).await;
        match claimed {
            Ok(Some(moid)) => {
                info!(hostname = %device.hostname, %moid, "device claimed");
                registrations.push(moid);
            }
            Ok(None) => {
                info!(hostname = %device.hostname, "device already claimed, skipping");
            }
            Err(err) => {
                error!(hostname = %device.hostname, error = %err, "device claim failed");
                failures.push(device.hostname.clone());
            }
        }
    }

    if registrations.is_empty() {
        warn!("no new device registrations; skipping provisioning");
    } else {
        provision(&cloud, &config, &registrations).await?;
    }

    info!(
        claimed = registrations.len(),
        failed = failures.len(),
        "claim run finished"
    );
    if !failures.is_empty() {
        bail!("failed to claim: {}", failures.join(", "));
    }
    Ok(())
}

async fn claim_one(
    session_client: &XmlApiSession,
    device_http: &ClientConfig,
    cloud: &intersight_cloud::CloudClient,
    device: &intersight_core::config::DeviceDescriptor,
) -> Result<Option<Moid>> {
    let connector = ConnectorClientBuilder::for_device(&device.hostname)
        .with_http_config(device_http.clone())
        .build()?;

    let outcome = fetch_claim_credential(session_client, &connector, device).await?;
    let credential = match outcome {
        ClaimOutcome::AlreadyClaimed => return Ok(None),
        ClaimOutcome::Claimable(credential) => credential,
    };

    let claimed = cloud.claim_device(&credential).await?;
    Ok(Some(claimed.device.moid))
}

async fn provision(
    cloud: &intersight_cloud::CloudClient,
    config: &ClaimConfig,
    registrations: &[Moid],
) -> Result<()> {
    let resource_group = cloud
        .create_resource_group(&config.resource_group_name(), registrations)
        .await?;
    let organization = cloud
        .create_organization(&config.partner_id, resource_group)
        .await?;
    let permission = cloud.create_permission(&config.partner_id).await?;

    if config.intersight_roles.is_empty() {
        warn!("no roles configured; skipping role binding");
        return Ok(());
    }

    let roles = cloud.find_roles(&config.intersight_roles).await?;
    if roles.len() < config.intersight_roles.len() {
        warn!(
            requested = config.intersight_roles.len(),
            found = roles.len(),
            "some configured roles were not found"
        );
    }
    if roles.is_empty() {
        warn!("none of the configured roles exist; skipping role binding");
        return Ok(());
    }

    cloud.bind_roles(permission, organization, &roles).await?;
    Ok(())
}
