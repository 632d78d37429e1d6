use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_grpc::DfsServer;
use api_shared::constants::{DEFAULT_SERVER_ADDR, DEFAULT_SERVER_MOUNT_DIR};
use dfs_core::{CoreConfig, Storage};

/// Main entry point for the DFS file server
///
/// Serves the `dfs.v1.DfsService` gRPC API over the configured mount directory until Ctrl-C,
/// then stops accepting calls and lets in-flight ones finish.
///
/// # Environment Variables
/// - `DFS_ADDR`: gRPC server address (default: "0.0.0.0:50051")
/// - `DFS_MOUNT_PATH`: Directory holding the stored files (default: "mnt/server")
/// - `RUST_LOG`: tracing filter (default adds `dfs=info` and `api_grpc=info`)
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration, binding or serving fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dfs=info".parse()?)
                .add_directive("api_grpc=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr: SocketAddr = std::env::var("DFS_ADDR")
        .unwrap_or_else(|_| DEFAULT_SERVER_ADDR.into())
        .parse()?;
    let mount_path =
        std::env::var("DFS_MOUNT_PATH").unwrap_or_else(|_| DEFAULT_SERVER_MOUNT_DIR.into());

    let config = CoreConfig::new(&mount_path)?;
    let storage = Storage::new(config);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("++ Starting DFS gRPC on {}", listener.local_addr()?);
    tracing::info!("++ Serving files from {}", storage.config().mount_root().display());

    api_grpc::serve(listener, DfsServer::new(storage), shutdown_signal()).await?;

    tracing::info!("DFS server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown requested, draining in-flight calls"),
        Err(e) => {
            // Without a signal handler the server runs until killed.
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
