mod dispatcher;
mod problem;
mod router;
mod state;
mod telemetry;

use std::net::SocketAddr;

use status_sync_client::StatusClient;
use status_sync_util::{load_env_file, AppConfig};
use tracing::info;

use crate::dispatcher::{spawn_status_worker, ChannelFetchPort};
use crate::state::StatusStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    let metrics = telemetry::init_metrics()?;

    let http = reqwest::Client::builder()
        .timeout(config.fetch_timeout)
        .build()?;
    let client = StatusClient::new(
        config.status_api_base_url.clone(),
        config.status_api_token.clone(),
        http,
    );

    let store = StatusStore::new();
    metrics::gauge!("status_store_size").set(store.len() as f64);
    let (port, receiver) = ChannelFetchPort::channel();
    spawn_status_worker(client, store.clone(), receiver);

    let state = router::AppState::new(metrics, port, store, config.status_feature_enabled);

    let addr: SocketAddr = config.bind_addr;
    info!(
        stage = "app",
        %addr,
        env = %config.environment.as_str(),
        upstream = %config.status_api_base_url,
        status_feature_enabled = config.status_feature_enabled,
        "starting HTTP server"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router::app_router(state))
        .await
        .map_err(|err| err.into())
}
