//! SBS-1 stream mode.

use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::Interval;

use crate::error::SourceError;
use crate::relay::{pause, reload_interval, Relay};

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const CONNECT_RETRY: Duration = Duration::from_secs(10);
/// Wait after the decoder drops the connection.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

const READ_CHUNK: usize = 4096;
/// Bytes held without a newline before the partial line is discarded.
const MAX_PENDING: usize = 64 * 1024;

/// Splits a byte stream into newline-terminated lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bytes` and return every line completed by them, trimmed,
    /// with empty lines removed. Invalid UTF-8 is replaced.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&raw);
            let line = text.trim();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }

        if self.pending.len() > MAX_PENDING {
            tracing::warn!(bytes = self.pending.len(), "discarding unterminated input");
            self.pending.clear();
        }
        lines
    }
}

pub async fn run(relay: &Relay, mut shutdown: watch::Receiver<bool>) {
    let mut reload = reload_interval();

    loop {
        if *shutdown.borrow() {
            return;
        }
        let addr = relay.store.snapshot().decoder.stream_addr();

        let connected = tokio::select! {
            r = connect(&addr) => r,
            _ = shutdown.changed() => return,
        };
        let mut stream = match connected {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(addr = %addr, error = %e, "decoder stream unavailable, retrying");
                if pause(relay, CONNECT_RETRY, &mut reload, &mut shutdown).await {
                    return;
                }
                continue;
            }
        };

        tracing::info!(addr = %addr, "connected to decoder stream");
        relay.stats.source_connected.store(true, Ordering::Relaxed);
        relay.connect_endpoints().await;

        let ended = relay_lines(relay, &mut stream, &mut reload, &mut shutdown).await;
        relay.stats.source_connected.store(false, Ordering::Relaxed);
        drop(stream);
        match ended {
            Ok(()) => return,
            Err(e) => tracing::warn!(addr = %addr, error = %e, "decoder stream lost"),
        }

        if pause(relay, RECONNECT_DELAY, &mut reload, &mut shutdown).await {
            return;
        }
    }
}

async fn connect(addr: &str) -> Result<TcpStream, SourceError> {
    match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(source)) => Err(SourceError::Connect {
            addr: addr.to_string(),
            source,
        }),
        Err(_) => Err(SourceError::ConnectTimeout {
            addr: addr.to_string(),
            secs: CONNECT_TIMEOUT.as_secs(),
        }),
    }
}

/// Read and relay lines until the stream ends. `Ok` means shutdown.
async fn relay_lines(
    relay: &Relay,
    stream: &mut TcpStream,
    reload: &mut Interval,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(), SourceError> {
    let mut buffer = LineBuffer::new();
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        tokio::select! {
            read = stream.read(&mut chunk) => {
                let n = read.map_err(SourceError::Read)?;
                if n == 0 {
                    return Err(SourceError::Closed);
                }
                for line in buffer.push(&chunk[..n]) {
                    relay.relay_line(&line);
                }
            }
            _ = reload.tick() => relay.reload().await,
            _ = shutdown.changed() => return Ok(()),
        }
    }
}
