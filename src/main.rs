//! VoltSwap station service entry point.
//!
//! Reads configuration from a TOML file (~/.config/voltswap/config.toml),
//! runs migrations, wires the services and keeps the reservation expiry
//! sweep running until SIGTERM/SIGINT.

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm_migration::MigratorTrait;
use tracing::{error, info};

use voltswap::application::ports::{SubscriptionDirectory, VehicleDirectory};
use voltswap::application::services::{
    start_reservation_expiry_task, BatteryRegistry, ReputationTracker, ReservationEngine,
    ReservationPolicy, SwapPolicy, SwapWorkflow,
};
use voltswap::domain::RepositoryProvider;
use voltswap::infrastructure::database::migrator::Migrator;
use voltswap::infrastructure::{StaticSubscriptionDirectory, StaticVehicleDirectory};
use voltswap::{
    default_config_path, init_database, listen_for_shutdown_signals, AppConfig, DatabaseConfig,
    SeaOrmRepositoryProvider, ShutdownSignal,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Load configuration ─────────────────────────────────────
    let config_path = std::env::var("VOLTSWAP_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| default_config_path());
    let app_cfg = match AppConfig::load(&config_path) {
        Ok(cfg) => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.logging.level)),
                )
                .init();
            info!("Configuration loaded from {}", config_path.display());
            cfg
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
                .init();
            error!("Failed to load config: {}. Using defaults.", e);
            AppConfig::default()
        }
    };

    info!("Starting VoltSwap station service...");

    // ── Prometheus metrics recorder (must be installed before any metrics calls) ──
    let _prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    info!("📊 Prometheus metrics recorder installed");

    // ── Database ───────────────────────────────────────────────
    let db_config = DatabaseConfig {
        url: app_cfg.database.connection_url.clone(),
    };
    info!("Database: {}", db_config.url);

    let db = match init_database(&db_config).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return Err(e.into());
        }
    };

    info!("Running database migrations...");
    if let Err(e) = Migrator::up(&db, None).await {
        error!("Failed to run migrations: {}", e);
        return Err(e.into());
    }
    info!("Migrations completed");

    // ── Repositories & services ────────────────────────────────
    let repos: Arc<dyn RepositoryProvider> = Arc::new(SeaOrmRepositoryProvider::new(db));

    // Subscription and vehicle lookups come from the account system;
    // until that integration lands the static directories serve dev
    // deployments seeded out of band.
    let subscriptions: Arc<dyn SubscriptionDirectory> = Arc::new(StaticSubscriptionDirectory::new());
    let vehicles: Arc<dyn VehicleDirectory> = Arc::new(StaticVehicleDirectory::new());

    let registry = Arc::new(BatteryRegistry::new(repos.clone()));
    let reputation = Arc::new(ReputationTracker::new(repos.clone()));

    let reservation_policy = ReservationPolicy {
        ttl_minutes: app_cfg.reservation.ttl_minutes,
        min_charge_percent: app_cfg.reservation.min_charge_percent,
    };
    let engine = Arc::new(ReservationEngine::new(
        repos.clone(),
        registry.clone(),
        reputation.clone(),
        subscriptions.clone(),
        vehicles.clone(),
        reservation_policy,
    ));

    let swap_policy = SwapPolicy {
        swap_count_threshold: app_cfg.swap.swap_count_threshold,
        price_per_kwh: Decimal::from_str(&app_cfg.swap.price_per_kwh).unwrap_or_else(|_| {
            error!(
                "Invalid price_per_kwh '{}', using default",
                app_cfg.swap.price_per_kwh
            );
            SwapPolicy::default().price_per_kwh
        }),
    };
    let _swaps = Arc::new(SwapWorkflow::new(repos.clone(), vehicles.clone(), swap_policy));

    // ── Background tasks & shutdown ────────────────────────────
    let shutdown = ShutdownSignal::new();
    start_reservation_expiry_task(
        engine.clone(),
        shutdown.clone(),
        app_cfg.reservation.sweep_interval_secs,
    );

    tokio::spawn(listen_for_shutdown_signals(shutdown.clone()));

    info!("VoltSwap station service is running. Press Ctrl+C to stop.");
    shutdown.notified().wait().await;
    info!("Shutdown complete");
    Ok(())
}
