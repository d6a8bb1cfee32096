use day_trader::api::run_server;
use day_trader::config::AppConfig;
use day_trader::data::JsonFileStore;
use day_trader::market::MarketState;
use day_trader::notifier::TracingNotifier;
use day_trader::session::Session;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();

    // Setup Logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Day Trader...");

    // Load Configuration
    let config = AppConfig::load()?;
    info!("Loaded Configuration: {:?}", config);

    let store = JsonFileStore::open(&config.storage.path);
    info!("💾 [STORE] Save data at {}", store.path().display());

    let api = config.api.clone();
    let session = Session::new(config, Arc::new(store), Arc::new(TracingNotifier))?;
    session.start()?;

    if api.enabled {
        info!("Initializing API Server...");
        tokio::select! {
            result = run_server(session.clone(), &api.bind) => result?,
            _ = tokio::signal::ctrl_c() => info!("Shutting down"),
        }
        return Ok(());
    }

    // Without the API the days play out on their own
    info!("API disabled, running trading days back to back");
    tokio::select! {
        _ = async {
            loop {
                if session.market().state() == MarketState::Idle {
                    if let Err(e) = session.begin_day() {
                        error!("Could not open the market: {}", e);
                        break;
                    }
                }
                session.wait_for_close().await;
                if let Err(e) = session.next_day() {
                    error!("Could not start the next day: {}", e);
                    break;
                }
            }
        } => {}
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    Ok(())
}
