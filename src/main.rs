use clap::Parser;

use filehttpd::config::{Args, Config};
use filehttpd::resource::{Dispatcher, LockRegistry};
use filehttpd::server::{self, Shutdown, control};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    // Prints usage and exits on bad arguments, before anything starts.
    let args = Args::parse();
    let cfg = Config::load(&args)?;

    let shutdown = Shutdown::new();

    // One registry for the whole process.
    let dispatcher =
        Dispatcher::new(&cfg.document_root, LockRegistry::new()).with_error_pages(&cfg.error_pages);

    control::spawn_stdin_watcher(shutdown.clone())?;

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            signal.trigger();
        }
    });

    server::listener::run(&cfg, dispatcher, shutdown).await?;

    tracing::info!("Server stopped");
    Ok(())
}
