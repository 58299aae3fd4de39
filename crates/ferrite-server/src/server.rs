//! TCP acceptor and server lifecycle.
//!
//! The acceptor hands each connection a shared [`ServerContext`] and spawns
//! a handler task. Shutdown is a watch channel: flipping it stops the accept
//! loop and the sweeper; in-flight connections finish their current exchange
//! and terminate on their next read (bounded by the idle timeout).

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ferrite_core::{BufferPool, Keyspace};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::connection;
use crate::stats::ServerStats;
use crate::sweeper;

/// Shared state handed to every connection task.
#[derive(Debug)]
pub struct ServerContext {
    pub keyspace: Arc<Keyspace>,
    pub stats: Arc<ServerStats>,
    pub pool: Arc<BufferPool>,
    pub idle_timeout: Duration,
}

/// A bound listener plus the state it will serve.
pub struct Server {
    listener: TcpListener,
    ctx: Arc<ServerContext>,
    max_clients: usize,
}

impl Server {
    /// Binds the listener. A bind failure here is fatal to startup.
    pub async fn bind(config: &Config) -> std::io::Result<Server> {
        let listener = TcpListener::bind(config.listen_addr()).await?;
        let ctx = Arc::new(ServerContext {
            keyspace: Arc::new(Keyspace::new()),
            stats: Arc::new(ServerStats::new()),
            pool: Arc::new(BufferPool::new()),
            idle_timeout: config.idle_timeout(),
        });
        Ok(Server {
            listener,
            ctx,
            max_clients: config.max_clients,
        })
    }

    /// The bound address; useful when the configured port was 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn context(&self) -> Arc<ServerContext> {
        Arc::clone(&self.ctx)
    }

    /// Runs the accept loop until `shutdown` flips.
    ///
    /// Connections beyond `max_clients` are accepted and immediately
    /// dropped; refusing at the listener would leave them queueing in the
    /// kernel backlog instead.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> std::io::Result<()> {
        let addr = self.local_addr()?;
        info!("listening on {addr}");

        let sweeper = tokio::spawn(sweeper::run(
            Arc::clone(&self.ctx.keyspace),
            shutdown.clone(),
        ));

        let active = Arc::new(AtomicUsize::new(0));

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            warn!("accept error: {e}");
                            continue;
                        }
                    };

                    self.ctx.stats.record_connection();

                    if active.load(Ordering::Acquire) >= self.max_clients {
                        warn!("refusing {peer}: max-clients reached");
                        drop(stream);
                        continue;
                    }

                    let _ = stream.set_nodelay(true);
                    active.fetch_add(1, Ordering::AcqRel);

                    let ctx = Arc::clone(&self.ctx);
                    let active = Arc::clone(&active);
                    tokio::spawn(async move {
                        if let Err(e) = connection::handle(stream, ctx).await {
                            error!("connection error from {peer}: {e}");
                        }
                        active.fetch_sub(1, Ordering::AcqRel);
                    });
                }
                _ = shutdown.changed() => break,
            }
        }

        // the sweeper watches the same shutdown channel
        let _ = sweeper.await;

        let snap = self.ctx.stats.snapshot();
        info!(
            total_ops = snap.total_ops,
            connections = snap.connections,
            bytes_read = snap.bytes_read,
            bytes_written = snap.bytes_written,
            hit_rate = snap.hit_rate(),
            "server stopped"
        );
        Ok(())
    }
}
