use linha_eta::estimation::EtaPipeline;
use linha_eta::estimation::route::OsrmClient;
use linha_eta::state::AppState;
use linha_eta::storage::{MemoryStore, TelemetryStore};
use linha_eta::{api, config};
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};

fn init_tracing() {
    let subscriber = tracing_subscriber::fmt().with_target(false).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    tracing::info!(
        config_path = config::DEFAULT_CONFIG_PATH,
        "linha-eta starting"
    );
    let config = config::load_default()?;

    let routing_params = config.routing_params();
    let routing_api = Arc::new(OsrmClient::new(&routing_params)?);
    let store: Arc<dyn TelemetryStore> = Arc::new(MemoryStore::new());
    let pipeline = Arc::new(EtaPipeline::from_config(&config, routing_api, store)?);
    tracing::info!(
        destinations = pipeline.destinations().len(),
        routing_url = %routing_params.server_url,
        "Estimation pipeline ready"
    );

    let state = Arc::new(RwLock::new(AppState::new()));
    let app = api::router(api::ApiContext { pipeline, state });

    let port = config.server_port();
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use linha_eta::config;

    #[test]
    fn default_config_is_valid_toml() -> Result<(), Box<dyn std::error::Error>> {
        let _config = config::load_default()?;
        Ok(())
    }
}
