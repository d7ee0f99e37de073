//! TCP transport: framed message streams, per-connection tasks, and the
//! accept loop that ties them to the event router.
//!
//! Each frame is a 4-byte big-endian length followed by a bincode payload.
//! Reads and writes for one connection live on separate tasks so a slow
//! reader never blocks outbound snapshots.

use crate::connection::ConnectionManager;
use crate::handlers::EventRouter;
use crate::registry::RoomRegistry;
use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::protocol::{decode_payload, encode_frame, ClientMessage, MAX_FRAME_SIZE};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock};

/// Reads one length-prefixed frame. `Ok(None)` means the peer closed the
/// stream cleanly between frames.
pub async fn read_message<R, T>(reader: &mut R) -> io::Result<Option<T>>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut prefix = [0u8; 4];
    match reader.read_exact(&mut prefix).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let len = u32::from_be_bytes(prefix) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {} bytes exceeds limit", len),
        ));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    decode_payload(&payload)
        .map(Some)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Serializes and writes one frame.
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let frame =
        encode_frame(message).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writer.write_all(&frame).await?;
    writer.flush().await
}

/// Accepts connections and wires each one to the shared room registry.
pub struct Server {
    listener: TcpListener,
    registry: Arc<RoomRegistry>,
    connections: Arc<RwLock<ConnectionManager>>,
    router: Arc<EventRouter>,
    sweep_interval: Duration,
    max_idle: Duration,
}

impl Server {
    pub async fn new(
        addr: &str,
        sweep_interval: Duration,
        max_idle: Duration,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let registry = Arc::new(RoomRegistry::new());
        let connections = Arc::new(RwLock::new(ConnectionManager::new()));
        let router = Arc::new(EventRouter::new(
            Arc::clone(&registry),
            Arc::clone(&connections),
        ));

        Ok(Server {
            listener,
            registry,
            connections,
            router,
            sweep_interval,
            max_idle,
        })
    }

    /// The bound address, useful when binding to port 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Spawns the task that periodically drops rooms with no recent activity.
    fn spawn_sweeper(&self) {
        let registry = Arc::clone(&self.registry);
        let sweep_interval = self.sweep_interval;
        let max_idle = self.max_idle;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweep_interval);
            interval.tick().await;

            loop {
                interval.tick().await;
                let swept = registry.sweep_inactive(max_idle).await;
                if !swept.is_empty() {
                    info!("Swept {} idle rooms: {:?}", swept.len(), swept);
                }
            }
        });
    }

    /// Accept loop. Runs until the listener fails; callers typically race
    /// this against a shutdown signal.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_sweeper();
        info!("Server started successfully");

        loop {
            let (stream, addr) = self.listener.accept().await?;
            debug!("Accepted connection from {}", addr);

            let router = Arc::clone(&self.router);
            let connections = Arc::clone(&self.connections);
            tokio::spawn(async move {
                handle_connection(stream, addr, router, connections).await;
            });
        }
    }
}

/// Owns one client for its whole lifetime: registers it, pumps frames both
/// ways, and cleans up room membership when the stream ends.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    router: Arc<EventRouter>,
    connections: Arc<RwLock<ConnectionManager>>,
) {
    let (mut reader, mut writer) = stream.into_split();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let conn_id = connections.write().await.register(tx);
    info!("Client {} connected from {}", conn_id, addr);

    let writer_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = write_message(&mut writer, &message).await {
                debug!("Write to client failed: {}", e);
                break;
            }
        }
    });

    loop {
        match read_message::<_, ClientMessage>(&mut reader).await {
            Ok(Some(message)) => router.handle_message(&conn_id, message).await,
            Ok(None) => {
                info!("Client {} disconnected", conn_id);
                break;
            }
            Err(e) => {
                // A stream we cannot frame or decode is unrecoverable
                warn!("Dropping client {}: {}", conn_id, e);
                break;
            }
        }
    }

    router.handle_disconnect(&conn_id).await;
    if !connections.write().await.unregister(&conn_id) {
        error!("Client {} was not registered at teardown", conn_id);
    }
    writer_task.abort();
}
