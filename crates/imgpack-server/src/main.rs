use std::sync::Arc;

use clap::Parser;
use imgpack_core::app::{BundlePipeline, GCLoop};
use imgpack_core::impls::{LocalArtifactStore, ReqwestFetcher};
use imgpack_core::ports::{ArtifactStore, Clock, SystemClock};
use imgpack_server::config::Args;
use imgpack_server::error::ServerError;
use imgpack_server::{AppState, logging, router};
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    logging::init(args.log_profile());

    if let Err(e) = run(args).await {
        error!(error = %e, "imgpack stopped");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), ServerError> {
    let settings = args.settings();
    let public_base = args.public_base()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // (A) store: ステージングの掃除もここで済ませる
    let store: Arc<dyn ArtifactStore> = Arc::new(LocalArtifactStore::open(
        &args.storage_dir,
        settings.ttl,
        Arc::clone(&clock),
    )?);

    // (B) fetch → ZIP → 永続化のパイプライン
    let fetcher = ReqwestFetcher::new(settings.fetch_timeout)
        .map_err(|e| ServerError::Client(e.to_string()))?;
    let pipeline = BundlePipeline::new(
        Arc::new(fetcher),
        Arc::clone(&store),
        clock,
        &settings,
        public_base.clone(),
    );

    // (C) GC は起動直後に 1 回、その後は sweep_interval ごと
    let gc = GCLoop::new(Arc::clone(&store), settings.ttl, settings.sweep_interval).spawn();

    let app = router(AppState {
        pipeline: Arc::new(pipeline),
        store,
    });

    let listener = TcpListener::bind(args.bind).await?;
    info!(
        addr = %listener.local_addr()?,
        storage = %args.storage_dir.display(),
        public_url = %public_base,
        ttl = ?settings.ttl,
        sweep_interval = ?settings.sweep_interval,
        "imgpack listening"
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // (D) HTTP が止まってから GC を止める
    gc.shutdown_and_join().await;
    info!("imgpack shut down");
    served.map_err(ServerError::from)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
