//! Runs the dev server until interrupted.
//!
//! Usage: `devserver [www] [-p <port>] [-e <etc>]`

use devserver::{DevServerConfig, Server, ServerResult};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> ServerResult<()> {
    let config = DevServerConfig::load()?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!(
        working_dir = %config.working_dir.display(),
        port = config.addr.port(),
        "starting dev server"
    );
    let mut server = Server::start(config).await?;
    println!(">> Dev Server listening on port {}", server.addr().port());

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    server.shutdown()
}
