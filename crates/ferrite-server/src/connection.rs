//! Per-connection handler.
//!
//! Reads framed messages from a TCP stream, dispatches them against the
//! shared keyspace, and writes responses back. A connection carries no state
//! between messages. The loop exits silently on EOF or idle timeout, closes
//! the connection on framing errors, and answers payload errors in-band.

use std::sync::Arc;

use bytes::BytesMut;
use ferrite_core::time::now_secs;
use ferrite_protocol::{parse_frame, Request, Response};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::dispatch::dispatch;
use crate::server::ServerContext;

/// Initial read buffer capacity; covers typical commands without
/// over-allocating for small workloads.
const BUF_CAPACITY: usize = 4096;

/// Drives a single client connection to completion.
///
/// The receive buffer accumulates until at least one complete frame is
/// available; all complete frames are then dispatched and their responses
/// batched into a single write.
pub async fn handle(
    mut stream: TcpStream,
    ctx: Arc<ServerContext>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut buf = BytesMut::with_capacity(BUF_CAPACITY);

    loop {
        // read some data; 0 means clean disconnect, and a silent peer is
        // reclaimed after the configured idle timeout
        match tokio::time::timeout(ctx.idle_timeout, stream.read_buf(&mut buf)).await {
            Ok(Ok(0)) => return Ok(()),
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Ok(()),
        }

        // drain every complete frame the buffer holds, batching responses
        let frozen = buf.split().freeze();
        let mut offset = 0;
        let mut out = ctx.pool.get(BUF_CAPACITY);
        let mut framing_error = false;

        loop {
            let window = frozen.slice(offset..);
            match parse_frame(&window) {
                Ok(Some((frame, consumed))) => {
                    offset += consumed;
                    ctx.stats.add_bytes_read(consumed as u64);

                    let now = now_secs();
                    let response = match Request::decode(frame.command, &frame.payload) {
                        Ok(req) => dispatch(req, &ctx.keyspace, &ctx.stats, now),
                        Err(e) => Response::error(e.to_string()),
                    };
                    response.encode(&mut out);
                }
                Ok(None) => break,
                Err(e) => {
                    debug!("closing connection on framing error: {e}");
                    framing_error = true;
                    break;
                }
            }
        }

        // whatever didn't form a complete frame stays for the next read
        if !framing_error && offset < frozen.len() {
            buf.extend_from_slice(&frozen[offset..]);
        }

        if !out.is_empty() {
            ctx.stats.add_bytes_written(out.len() as u64);
            stream.write_all(&out).await?;
        }
        ctx.pool.put(out);

        if framing_error {
            return Ok(());
        }
    }
}
