//! Per-endpoint connection slot.
//!
//! Each configured endpoint owns one [`ConnectionSlot`], shared (`Arc`)
//! between config snapshots, the forward path, and detached reconnect tasks.
//! A connected slot holds the sending half of a bounded queue; a writer task
//! owns the `TcpStream` and drains the queue in order. Queuing never waits:
//! when the writer falls behind, the message is dropped for that endpoint
//! alone. Dials take the slot's dial lock with `try_lock`, so a slot that is
//! already dialing is skipped, never waited on.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::config::model::EndpointSettings;
use crate::error::{ConnectError, SendError};

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const SEND_TIMEOUT: Duration = Duration::from_secs(5);
/// Messages held for one endpoint while its writer is busy.
pub const QUEUE_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected,
    AlreadyConnected,
    /// Another task is dialing this slot.
    Busy,
    /// The endpoint was removed from the config.
    Retired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Queued,
    NotConnected,
    /// The writer is behind; the message was dropped for this endpoint.
    QueueFull,
}

#[derive(Debug)]
struct Writer {
    id: u64,
    queue: mpsc::Sender<Bytes>,
    task: JoinHandle<()>,
}

#[derive(Debug, Default)]
pub struct ConnectionSlot {
    dial: tokio::sync::Mutex<()>,
    writer: Mutex<Option<Writer>>,
    connected: AtomicBool,
    retired: AtomicBool,
    dials: AtomicU64,
}

impl ConnectionSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    /// Number of successful connects over the slot's lifetime.
    #[must_use]
    pub fn dials(&self) -> u64 {
        self.dials.load(Ordering::Relaxed)
    }

    /// Dial `host:port` if the slot is empty and not already dialing.
    /// `on_failure` runs once if a later write on this connection fails,
    /// after the slot has been cleared.
    pub async fn connect<F>(
        self: &Arc<Self>,
        host: &str,
        port: u16,
        on_failure: F,
    ) -> Result<ConnectOutcome, ConnectError>
    where
        F: FnOnce(SendError) + Send + 'static,
    {
        let Ok(_dialing) = self.dial.try_lock() else {
            return Ok(ConnectOutcome::Busy);
        };
        if self.is_retired() {
            return Ok(ConnectOutcome::Retired);
        }
        if self.lock_writer().is_some() {
            return Ok(ConnectOutcome::AlreadyConnected);
        }

        let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect((host, port)))
            .await
            .map_err(|_| ConnectError::Timeout(CONNECT_TIMEOUT.as_secs()))??;
        // Lines are small and latency matters more than packet count
        let _ = stream.set_nodelay(true);

        Ok(self.attach(stream, on_failure))
    }

    /// Install a writer for `stream`. A slot retired while the dial was in
    /// flight drops the stream instead.
    fn attach<F>(self: &Arc<Self>, stream: TcpStream, on_failure: F) -> ConnectOutcome
    where
        F: FnOnce(SendError) + Send + 'static,
    {
        let mut writer = self.lock_writer();
        if self.is_retired() {
            return ConnectOutcome::Retired;
        }

        let id = self.dials.fetch_add(1, Ordering::Relaxed) + 1;
        let (queue, rx) = mpsc::channel(QUEUE_DEPTH);
        let task = tokio::spawn(write_loop(Arc::clone(self), id, stream, rx, on_failure));
        *writer = Some(Writer { id, queue, task });
        self.connected.store(true, Ordering::Release);
        ConnectOutcome::Connected
    }

    /// Queue one message for the writer.
    pub fn send(&self, message: Bytes) -> SendOutcome {
        let guard = self.lock_writer();
        let Some(writer) = guard.as_ref() else {
            return SendOutcome::NotConnected;
        };
        match writer.queue.try_send(message) {
            Ok(()) => SendOutcome::Queued,
            Err(TrySendError::Full(_)) => SendOutcome::QueueFull,
            Err(TrySendError::Closed(_)) => SendOutcome::NotConnected,
        }
    }

    /// Mark the slot as removed. The writer flushes what is already queued
    /// and then closes the stream. Returns `true` when a live connection
    /// was detached here.
    pub fn retire(&self) -> bool {
        self.detach().is_some()
    }

    /// Retire and wait for the writer to finish so the stream is closed on
    /// return. A writer stuck on a stalled peer is aborted after
    /// [`SEND_TIMEOUT`].
    pub async fn close(&self) {
        let Some(Writer { queue, mut task, .. }) = self.detach() else {
            return;
        };
        drop(queue);
        if tokio::time::timeout(SEND_TIMEOUT, &mut task).await.is_err() {
            task.abort();
        }
    }

    fn detach(&self) -> Option<Writer> {
        self.retired.store(true, Ordering::Release);
        let writer = self.lock_writer().take();
        self.connected.store(false, Ordering::Release);
        writer
    }

    /// Drop writer `id` after a failed write. Returns `false` when it was
    /// already detached.
    fn clear(&self, id: u64) -> bool {
        let mut writer = self.lock_writer();
        if writer.as_ref().map(|w| w.id) != Some(id) {
            return false;
        }
        writer.take();
        self.connected.store(false, Ordering::Release);
        true
    }

    fn lock_writer(&self) -> MutexGuard<'_, Option<Writer>> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn write_loop<F>(
    slot: Arc<ConnectionSlot>,
    id: u64,
    mut stream: TcpStream,
    mut queue: mpsc::Receiver<Bytes>,
    on_failure: F,
) where
    F: FnOnce(SendError) + Send + 'static,
{
    let error = loop {
        let Some(message) = queue.recv().await else {
            return;
        };
        match tokio::time::timeout(SEND_TIMEOUT, stream.write_all(&message)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => break SendError::Io(e),
            Err(_) => break SendError::Timeout,
        }
    };

    drop(stream);
    if slot.clear(id) {
        on_failure(error);
    }
}

/// A configured endpoint: its settings plus the shared connection slot.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub settings: EndpointSettings,
    pub slot: Arc<ConnectionSlot>,
}

impl Endpoint {
    #[must_use]
    pub fn new(settings: EndpointSettings) -> Self {
        Self {
            settings,
            slot: Arc::new(ConnectionSlot::new()),
        }
    }

    #[must_use]
    pub fn key(&self) -> String {
        self.settings.key()
    }

    #[must_use]
    pub fn display_name(&self) -> String {
        if self.settings.name.is_empty() {
            self.key()
        } else {
            format!("{} ({})", self.settings.name, self.key())
        }
    }

    pub async fn connect<F>(&self, on_failure: F) -> Result<ConnectOutcome, ConnectError>
    where
        F: FnOnce(SendError) + Send + 'static,
    {
        self.slot
            .connect(&self.settings.host, self.settings.port, on_failure)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    async fn bound() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    fn ignore(_: SendError) {}

    #[tokio::test]
    async fn connect_then_send_delivers() {
        let (listener, port) = bound().await;
        let slot = Arc::new(ConnectionSlot::new());

        assert_eq!(
            slot.connect("127.0.0.1", port, ignore).await.unwrap(),
            ConnectOutcome::Connected
        );
        assert_eq!(
            slot.connect("127.0.0.1", port, ignore).await.unwrap(),
            ConnectOutcome::AlreadyConnected
        );
        let (mut peer, _) = listener.accept().await.unwrap();

        assert_eq!(
            slot.send(Bytes::from_static(b"MSG,1\n")),
            SendOutcome::Queued
        );
        assert_eq!(
            slot.send(Bytes::from_static(b"MSG,2\n")),
            SendOutcome::Queued
        );
        let mut buf = [0u8; 12];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"MSG,1\nMSG,2\n");
        assert_eq!(slot.dials(), 1);
    }

    #[tokio::test]
    async fn empty_slot_is_not_connected() {
        let slot = ConnectionSlot::new();
        assert_eq!(
            slot.send(Bytes::from_static(b"x\n")),
            SendOutcome::NotConnected
        );
        assert!(!slot.is_connected());
    }

    #[tokio::test]
    async fn refused_connect_is_an_error() {
        let (listener, port) = bound().await;
        drop(listener);

        let slot = Arc::new(ConnectionSlot::new());
        assert!(slot.connect("127.0.0.1", port, ignore).await.is_err());
        assert!(!slot.is_connected());
    }

    #[tokio::test]
    async fn retire_closes_the_stream() {
        let (listener, port) = bound().await;
        let slot = Arc::new(ConnectionSlot::new());
        slot.connect("127.0.0.1", port, ignore).await.unwrap();
        let (mut peer, _) = listener.accept().await.unwrap();

        assert!(slot.retire());
        assert!(!slot.retire());
        assert!(!slot.is_connected());

        let mut buf = [0u8; 1];
        assert_eq!(peer.read(&mut buf).await.unwrap(), 0);
        assert_eq!(
            slot.connect("127.0.0.1", port, ignore).await.unwrap(),
            ConnectOutcome::Retired
        );
    }

    #[tokio::test]
    async fn dial_finishing_after_retire_drops_its_stream() {
        let (listener, port) = bound().await;
        let slot = Arc::new(ConnectionSlot::new());

        let dialing = slot.dial.lock().await;
        assert_eq!(
            slot.connect("127.0.0.1", port, ignore).await.unwrap(),
            ConnectOutcome::Busy
        );
        let stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        assert!(!slot.retire());
        assert_eq!(slot.attach(stream, ignore), ConnectOutcome::Retired);
        drop(dialing);

        let (mut peer, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(peer.read(&mut buf).await.unwrap(), 0);
        assert!(!slot.is_connected());
        assert_eq!(slot.dials(), 0);
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_waiting() {
        let (listener, port) = bound().await;
        let slot = Arc::new(ConnectionSlot::new());
        slot.connect("127.0.0.1", port, ignore).await.unwrap();
        let (_peer, _) = listener.accept().await.unwrap();

        // The writer cannot run until this task yields
        for _ in 0..QUEUE_DEPTH {
            assert_eq!(slot.send(Bytes::from_static(b"MSG\n")), SendOutcome::Queued);
        }
        assert_eq!(
            slot.send(Bytes::from_static(b"MSG\n")),
            SendOutcome::QueueFull
        );
    }

    #[tokio::test]
    async fn failed_write_clears_the_slot_and_reports_once() {
        let (listener, port) = bound().await;
        let slot = Arc::new(ConnectionSlot::new());
        let (tx, mut failures) = mpsc::unbounded_channel();
        slot.connect("127.0.0.1", port, move |e| {
            let _ = tx.send(e);
        })
        .await
        .unwrap();
        drop(listener.accept().await.unwrap());

        let failure = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                slot.send(Bytes::from(vec![b'x'; 64 * 1024]));
                if let Ok(error) = failures.try_recv() {
                    return error;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        assert!(matches!(failure, SendError::Io(_)));
        assert!(!slot.is_connected());
        assert_eq!(
            slot.send(Bytes::from_static(b"x\n")),
            SendOutcome::NotConnected
        );
        assert!(failures.recv().await.is_none());
    }
}
