use std::sync::Arc;

use arc_swap::ArcSwap;
use clap::Parser;
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use wmgate_common::{
    AppConfig, ConfigPatch, ConfigStore, FileConfigStore, LogLevel, SharedConfig,
};
use wmgate_core::{AppFactory, GatewayContext, RuntimeController, RuntimeState};
use wmgate_provider_core::ProviderStatus;
use wmgate_provider_impl::{NoBrowserCookies, build_registry};
use wmgate_router::gateway_router;

mod cli;

use crate::cli::{Cli, Command};

const CRATES: [&str; 6] = [
    "wmgate",
    "wmgate_common",
    "wmgate_core",
    "wmgate_provider_core",
    "wmgate_provider_impl",
    "wmgate_router",
];

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("wmgate failed: {err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let patch = cli.patch();
    let store = FileConfigStore::new(&cli.config).with_patch(patch.clone());
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(store).await,
        Command::Status => status(store).await,
        Command::InitConfig { force } => {
            init_tracing(LogLevel::Info);
            init_config(&store, &patch, force)
        }
    }
}

fn init_tracing(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = level.as_str();
        let directives: Vec<String> = CRATES
            .iter()
            .map(|krate| format!("{krate}={level}"))
            .collect();
        EnvFilter::new(directives.join(","))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Wires store, providers, context and router into one controller.
fn compose(store: FileConfigStore) -> anyhow::Result<RuntimeController> {
    let config = store.load()?;
    init_tracing(config.log_level);
    let location = store.location();
    info!(
        config = %location,
        host = %config.host,
        port = config.port,
        active_provider = %config.active_provider,
        default_model = %config.default_model,
        "config loaded"
    );

    let shared: SharedConfig = Arc::new(ArcSwap::from_pointee(config.clone()));
    let registry = build_registry(shared.clone(), &location, Arc::new(NoBrowserCookies));
    let context = Arc::new(GatewayContext::new(Arc::new(registry), &config));
    let app: AppFactory = Arc::new(gateway_router);
    Ok(RuntimeController::new(Arc::new(store), shared, context, app))
}

async fn serve(store: FileConfigStore) -> anyhow::Result<()> {
    let mut controller = compose(store)?;
    controller.bootstrap().await;
    let mode = controller.start_default_mode().await?;
    if let Some(addr) = controller.local_addr() {
        info!(%addr, %mode, "gateway ready");
    }

    let outcome = control_loop(&mut controller).await;
    controller.shutdown().await?;
    info!("gateway stopped");
    outcome
}

/// Ctrl-C stops the gateway; SIGHUP reloads the configuration file.
#[cfg(unix)]
async fn control_loop(controller: &mut RuntimeController) -> anyhow::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup())?;
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("shutdown requested");
                return Ok(());
            }
            _ = hangup.recv() => {
                info!("reload requested");
                if let Err(err) = controller.reload_configuration().await {
                    error!(error = %err, "configuration reload failed");
                    if controller.local_addr().is_none() {
                        return Err(err.into());
                    }
                }
            }
        }
    }
}

#[cfg(not(unix))]
async fn control_loop(_controller: &mut RuntimeController) -> anyhow::Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    Ok(())
}

#[derive(Debug, Serialize)]
struct StatusReport {
    config: String,
    state: RuntimeState,
    providers: Vec<ProviderStatus>,
}

async fn status(store: FileConfigStore) -> anyhow::Result<()> {
    let config = store.location();
    let mut controller = compose(store)?;
    let providers = controller.bootstrap().await;
    let report = StatusReport {
        config,
        state: controller.state(),
        providers,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn init_config(store: &FileConfigStore, patch: &ConfigPatch, force: bool) -> anyhow::Result<()> {
    if store.exists() && !force {
        anyhow::bail!(
            "{} already exists; pass --force to overwrite it",
            store.location()
        );
    }
    let mut config = AppConfig::default();
    patch.apply(&mut config);
    store.write(&config)?;
    info!(config = %store.location(), "default configuration written");
    println!("{}", store.location());
    Ok(())
}
