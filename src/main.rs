use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config_push::backup::BackupStore;
use config_push::config::Config;
use config_push::deployer::ConfigDeployer;
use config_push::models::{self, Device};
use config_push::strategy::{build_command_script, derive_elements, DeploymentStrategy, StrategyKind};
use config_push::transport::SshConnector;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the environment may already be set
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "config_push=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let cfg = Config::load()?;
    tracing::info!("Starting ConfigPush");
    tracing::info!("Inventory: {}", cfg.inventory_path);
    tracing::info!("Configs Dir: {}", cfg.configs_dir);
    tracing::info!("Backup Dir: {}", cfg.backup_dir);

    let model = models::load_model(&cfg.inventory_path)?;
    tracing::info!(
        "Loaded {} devices (inventory version {})",
        model.devices.len(),
        model.metadata.version
    );

    let store = BackupStore::new(&cfg.backup_dir);
    let connector = Arc::new(SshConnector::new(cfg.ssh_port));

    if let Some(device_id) = &cfg.rollback_device {
        let device = model
            .device(device_id)
            .with_context(|| format!("Device not found in inventory: {}", device_id))?;
        let kind = choose_strategy(&cfg, device)?;
        let strategy = kind.build(connector, cfg.deploy_settings());
        return rollback(&cfg, &store, strategy.as_ref(), device).await;
    }

    let devices = model.select_devices(&cfg.devices)?;
    let Some(lead) = devices.first() else {
        tracing::warn!("No devices selected, nothing to do");
        return Ok(());
    };
    let kind = choose_strategy(&cfg, lead)?;
    tracing::info!("Using {} strategy for {} device(s)", kind, devices.len());

    let configs = models::load_configs(&cfg.configs_dir, &devices).await?;

    if cfg.dry_run {
        print_plan(kind, &devices, &configs);
        return Ok(());
    }

    let deployer = ConfigDeployer::new(kind.build(connector, cfg.deploy_settings()));
    let results = deployer.deploy_to_multiple_devices(&devices, &configs).await;

    let hostnames: HashMap<&str, &str> = devices
        .iter()
        .map(|d| (d.id.as_str(), d.hostname.as_str()))
        .collect();

    for result in &results {
        match &result.error {
            None => tracing::info!("{}: success ({:?})", result.device_id, result.duration),
            Some(e) => tracing::error!("{}: failed ({:?}): {}", result.device_id, result.duration, e),
        }

        if let Some(backup) = &result.backup {
            let hostname = hostnames.get(result.device_id.as_str()).copied().unwrap_or(result.device_id.as_str());
            match store.save(hostname, backup).await {
                Ok(path) if !result.success => tracing::error!(
                    "{} needs manual recovery; pre-change config saved to {}",
                    result.device_id,
                    path.display()
                ),
                Ok(_) => {}
                Err(e) => tracing::warn!("Failed to persist backup for {}: {:#}", result.device_id, e),
            }
        }
    }

    let attempted = devices.iter().filter(|d| configs.contains_key(&d.id)).count();
    let failed = results.iter().filter(|r| !r.success).count();
    if failed > 0 || results.len() < attempted {
        anyhow::bail!(
            "Deployment halted: {} of {} device(s) deployed, {} failed",
            results.len() - failed,
            attempted,
            failed
        );
    }

    tracing::info!("Deployed configuration to {} device(s)", results.len());
    Ok(())
}

fn choose_strategy(cfg: &Config, device: &Device) -> anyhow::Result<StrategyKind> {
    match cfg.strategy {
        Some(kind) => Ok(kind),
        None => StrategyKind::for_vendor(&device.vendor)
            .with_context(|| format!("No deployment strategy for vendor '{}' ({})", device.vendor, device.id)),
    }
}

async fn rollback(
    cfg: &Config,
    store: &BackupStore,
    strategy: &dyn DeploymentStrategy,
    device: &Device,
) -> anyhow::Result<()> {
    let path = match &cfg.rollback_file {
        Some(file) => PathBuf::from(file),
        None => store
            .latest(&device.hostname)
            .await?
            .with_context(|| format!("No backup found for {} in {}", device.hostname, store.backup_dir().display()))?,
    };

    let backup = store.load(&path).await?;
    tracing::info!(
        "Rolling back {} using {} (taken {})",
        device.id,
        path.display(),
        backup.timestamp.to_rfc3339()
    );

    strategy
        .rollback(device, &backup)
        .await
        .with_context(|| format!("Rollback of {} failed", device.id))?;

    tracing::info!("Rollback of {} complete", device.id);
    Ok(())
}

fn print_plan(kind: StrategyKind, devices: &[Device], configs: &HashMap<String, String>) {
    tracing::info!("Dry run: no device will be contacted");

    for device in devices {
        let Some(config) = configs.get(&device.id) else {
            tracing::info!("{}: no configuration, would be skipped", device.id);
            continue;
        };

        match kind {
            StrategyKind::FullReplace => {
                tracing::info!(
                    "{} ({}): would replace running config with {} lines",
                    device.id,
                    device.management_ip,
                    config.lines().count()
                );
            }
            StrategyKind::PerElement => {
                let elements = derive_elements(device);
                tracing::info!(
                    "{} ({}): would apply {} elements",
                    device.id,
                    device.management_ip,
                    elements.len()
                );
                for line in build_command_script(&elements) {
                    tracing::info!("  {}", line);
                }
            }
        }
    }
}
