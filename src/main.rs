use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use citymap::config::Config;
use citymap::server::{self, AppState};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    let config = Config::load()?;
    let thread_count = config.thread_count.unwrap_or_else(num_cpus::get);

    info!("starting server with {} threads", thread_count);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(thread_count)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: Config) -> anyhow::Result<()> {
    let state = Arc::new(AppState::from_config(&config).await?);
    if state.catalog.is_empty() {
        warn!("catalog is empty; configure seed_csv to import cities");
    }

    let app = server::router(state);

    info!("listening on {}", config.listen_addr);
    let listener = TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
