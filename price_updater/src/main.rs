//! Price Updater - Pokemon card catalog pricing
//!
//! Refreshes catalog market values from the Pokemon TCG API, either once,
//! on a schedule, or whenever the HTTP trigger is called.

use clap::Parser;
use price_updater::config::{default_db_path, schedule_period, DEFAULT_BATCH_SIZE};
use price_updater::pokemontcg::DEFAULT_BASE_URL;
use price_updater::{
    Backend, CatalogStore, PokemonTcgClient, PriceUpdater, SqliteStore, SupabaseSettings,
    SupabaseStore, UpdaterConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

/// Pokemon card price updater - refreshes market values from the Pokemon TCG API
#[derive(Parser, Debug)]
#[command(name = "price_updater")]
#[command(version, about, long_about = None)]
struct Args {
    /// Where the card catalog lives
    #[arg(long, env = "PRICE_UPDATER_BACKEND", value_enum, default_value_t = Backend::Supabase)]
    backend: Backend,

    /// Supabase project URL
    #[arg(long, env = "SUPABASE_URL")]
    supabase_url: Option<String>,

    /// Supabase service role key
    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY", hide_env_values = true)]
    service_role_key: Option<String>,

    /// Path to the SQLite database file (sqlite backend)
    #[arg(short, long, env = "PRICE_UPDATER_DATABASE", default_value_t = default_db_path())]
    database: String,

    /// Pokemon TCG API base URL
    #[arg(long, env = "POKEMON_TCG_API_URL", default_value = DEFAULT_BASE_URL)]
    pricing_base_url: String,

    /// Pokemon TCG API key (optional, raises rate limits)
    #[arg(long, env = "POKEMON_TCG_API_KEY", hide_env_values = true)]
    pricing_api_key: Option<String>,

    /// Cards processed concurrently per batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Pause between batches in milliseconds
    #[arg(long, default_value_t = 500)]
    batch_delay_ms: u64,

    /// Run once and exit
    #[arg(long, default_value_t = false)]
    once: bool,

    /// Hours between scheduled runs (0 disables the schedule, at most one year)
    #[arg(long, default_value_t = 24, value_parser = clap::value_parser!(u64).range(0..=8760))]
    interval_hours: u64,

    /// Serve the HTTP trigger on the specified port (default: disabled)
    #[arg(long)]
    web_port: Option<u16>,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    log::info!("Starting price_updater...");

    let store = match open_store(&args) {
        Ok(store) => store,
        Err(e) => {
            log::error!("Failed to open catalog store: {}", e);
            std::process::exit(1);
        }
    };

    let config = match UpdaterConfig::new(
        args.batch_size,
        Duration::from_millis(args.batch_delay_ms),
    ) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    let source = Arc::new(PokemonTcgClient::new(
        args.pricing_base_url.as_str(),
        args.pricing_api_key.clone(),
    ));
    let updater = Arc::new(PriceUpdater::new(store, source, config));

    if args.once {
        if !run_update(&updater).await {
            std::process::exit(1);
        }
        return;
    }

    let web = args.web_port.map(|port| {
        let web_updater = Arc::clone(&updater);
        tokio::spawn(async move {
            if let Err(e) = price_updater::web::serve(web_updater, port).await {
                log::error!("Web server error: {}", e);
            }
        })
    });

    match (args.interval_hours, web) {
        (0, Some(server)) => {
            log::info!("Schedule disabled, serving trigger only");
            tokio::select! {
                result = server => {
                    if let Err(e) = result {
                        log::error!("Web server task failed: {}", e);
                    }
                }
                _ = tokio::signal::ctrl_c() => log::info!("Shutting down"),
            }
        }
        (0, None) => {
            log::error!("Nothing to do: schedule disabled and no --web-port given");
            std::process::exit(2);
        }
        (hours, _) => {
            log::info!("Running in daemon mode, updating every {} hour(s)", hours);
            run_daemon(&updater, hours).await;
        }
    }
}

/// Select the catalog backend once, up front
fn open_store(args: &Args) -> price_updater::Result<Arc<dyn CatalogStore>> {
    match args.backend {
        Backend::Supabase => {
            let settings = SupabaseSettings::resolve(
                args.supabase_url.clone(),
                args.service_role_key.clone(),
            )?;
            log::info!("Using Supabase catalog at {}", settings.url);
            Ok(Arc::new(SupabaseStore::new(
                &settings.url,
                settings.service_key,
            )))
        }
        Backend::Sqlite => {
            let db_path = PathBuf::from(&args.database);
            log::info!("Database path: {}", db_path.display());

            // Ensure parent directory exists
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        price_updater::UpdaterError::Config(format!(
                            "cannot create {}: {}",
                            parent.display(),
                            e
                        ))
                    })?;
                    log::info!("Created directory: {}", parent.display());
                }
            }

            Ok(Arc::new(SqliteStore::open(&db_path)?))
        }
    }
}

/// Run the updater on a fixed interval, starting immediately
async fn run_daemon(updater: &Arc<PriceUpdater>, interval_hours: u64) {
    let mut ticker = interval(schedule_period(interval_hours));

    loop {
        // first tick completes immediately
        tokio::select! {
            _ = ticker.tick() => {
                log::info!("Scheduled update triggered");
                run_update(updater).await;
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Shutting down");
                return;
            }
        }
    }
}

/// Run a single update, returning whether the run could start
async fn run_update(updater: &PriceUpdater) -> bool {
    match updater.run().await {
        Ok(report) => {
            log::info!("{} ({})", report.message(), report.status);
            true
        }
        Err(e) => {
            log::error!("Price update failed: {}", e);
            false
        }
    }
}
