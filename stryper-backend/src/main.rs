use dotenv::dotenv;
use std::sync::Arc;

mod catalog;
mod channels;
mod config;
mod discord_hooks;
mod enactment;
mod scheduler;
mod validators;

use catalog::CatalogStore;
use config::Config;
use validators::YoutubeChannelClassifier;

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let store = Arc::new(CatalogStore::new(config.data_file.clone()));
    log::info!("Opening catalog at {}", store.path().display());
    let catalog_existed = match store.ensure_exists() {
        Ok(existed) => existed,
        Err(e) => {
            log::error!("Failed to open catalog: {}", e);
            std::process::exit(1);
        }
    };

    let classifier = Arc::new(YoutubeChannelClassifier::new(config.ritual_channel_url.clone()));

    if let Err(e) =
        channels::discord::start_discord_listener(config, store, classifier, catalog_existed).await
    {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
