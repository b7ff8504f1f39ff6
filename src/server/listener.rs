use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::http::connection::Connection;
use crate::resource::Dispatcher;
use crate::server::Shutdown;

/// Pause after a failed accept; errors like EMFILE persist until a
/// descriptor frees up.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Binds the configured address and serves until `shutdown` fires.
pub async fn run(cfg: &Config, dispatcher: Dispatcher, shutdown: Shutdown) -> anyhow::Result<()> {
    let addr = cfg.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Port unavailable: {addr}"))?;

    info!(
        address = %addr,
        workers = cfg.workers,
        root = %cfg.document_root.display(),
        "Server has started"
    );

    serve(listener, dispatcher, cfg.workers, cfg.shutdown_grace, shutdown).await
}

/// Accept loop over an already bound listener.
///
/// At most `workers` connections run at once: a pool permit is taken before
/// each accept and held by the connection task. On shutdown the listener is
/// closed, running connections get `grace` to finish and are then aborted.
pub async fn serve(
    listener: TcpListener,
    dispatcher: Dispatcher,
    workers: usize,
    grace: Duration,
    shutdown: Shutdown,
) -> anyhow::Result<()> {
    let pool = Arc::new(Semaphore::new(workers));
    let mut tasks = JoinSet::new();

    loop {
        let permit = tokio::select! {
            _ = shutdown.wait() => break,
            permit = Arc::clone(&pool).acquire_owned() => permit?,
        };

        let accepted = tokio::select! {
            _ = shutdown.wait() => break,
            accepted = listener.accept() => accepted,
        };

        let (socket, peer) = match accepted {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "Failed to accept connection");
                drop(permit);
                if back_off(&shutdown).await {
                    break;
                }
                continue;
            }
        };

        debug!("Accepted connection from {}", peer);

        let dispatcher = dispatcher.clone();
        tasks.spawn(async move {
            let _permit = permit;
            let conn = Connection::new(socket, dispatcher);
            if let Err(e) = conn.run().await {
                error!("Connection error from {}: {}", peer, e);
            }
        });

        // Reap finished connections so the set does not grow.
        while tasks.try_join_next().is_some() {}
    }

    drop(listener);
    info!("Listener closed");

    drain(tasks, grace).await;
    Ok(())
}

/// Waits out `ACCEPT_BACKOFF`. Returns `true` if shutdown fired meanwhile.
async fn back_off(shutdown: &Shutdown) -> bool {
    tokio::select! {
        _ = shutdown.wait() => true,
        _ = tokio::time::sleep(ACCEPT_BACKOFF) => false,
    }
}

async fn drain(mut tasks: JoinSet<()>, grace: Duration) {
    if tasks.is_empty() {
        return;
    }

    info!(in_flight = tasks.len(), "Waiting for the connections to finish");

    let drained = tokio::time::timeout(grace, async {
        while tasks.join_next().await.is_some() {}
    })
    .await;

    if drained.is_err() {
        warn!(remaining = tasks.len(), "Grace period elapsed, aborting connections");
        tasks.shutdown().await;
    }
}
