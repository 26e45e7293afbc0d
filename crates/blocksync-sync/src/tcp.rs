//! TCP transport: length-prefixed CBOR frames.
//!
//! Each frame is a 4-byte big-endian length followed by that many bytes of
//! CBOR. A connection carries any number of request/response pairs, strictly
//! alternating. Frames larger than [`limits::MAX_FRAME_SIZE`] are refused.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};
use crate::messages::{limits, Request, Response};
use crate::service::SyncService;
use crate::transport::Transport;

/// Encode and write one frame.
pub async fn write_frame<W, T>(writer: &mut W, message: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut buf = Vec::new();
    ciborium::into_writer(message, &mut buf).map_err(|e| SyncError::Codec(e.to_string()))?;
    if buf.len() > limits::MAX_FRAME_SIZE {
        return Err(SyncError::FrameTooLarge {
            size: buf.len(),
            max: limits::MAX_FRAME_SIZE,
        });
    }

    writer
        .write_u32(buf.len() as u32)
        .await
        .map_err(SyncError::transport)?;
    writer.write_all(&buf).await.map_err(SyncError::transport)?;
    writer.flush().await.map_err(SyncError::transport)?;
    Ok(())
}

/// Read and decode one frame.
///
/// Returns `None` if the peer closed the connection cleanly before a new
/// frame started.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(SyncError::transport(e)),
    };
    if len > limits::MAX_FRAME_SIZE {
        return Err(SyncError::FrameTooLarge {
            size: len,
            max: limits::MAX_FRAME_SIZE,
        });
    }

    let mut buf = vec![0u8; len];
    reader
        .read_exact(&mut buf)
        .await
        .map_err(SyncError::transport)?;
    let message = ciborium::from_reader(&buf[..]).map_err(|e| SyncError::Codec(e.to_string()))?;
    Ok(Some(message))
}

/// Accept connections on `listener` until `shutdown` resolves.
///
/// Each connection is served on its own task; the service's stores provide
/// all cross-connection synchronization.
pub async fn serve<F>(listener: TcpListener, service: Arc<SyncService>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "serving blocksync");
    }

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutting down");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, peer) = accepted.map_err(SyncError::transport)?;
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    debug!(%peer, "connection opened");
                    match handle_connection(stream, service).await {
                        Ok(()) => debug!(%peer, "connection closed"),
                        Err(e) => warn!(%peer, error = %e, "connection closed with error"),
                    }
                });
            }
        }
    }
}

async fn handle_connection(mut stream: TcpStream, service: Arc<SyncService>) -> Result<()> {
    while let Some(request) = read_frame::<_, Request>(&mut stream).await? {
        let response = service.handle(request).await;
        write_frame(&mut stream, &response).await?;
    }
    Ok(())
}

/// Client side of the TCP transport.
///
/// Holds one connection, opened lazily and re-opened on the next call after
/// any failure.
pub struct TcpTransport {
    addr: String,
    conn: Mutex<Option<TcpStream>>,
}

impl TcpTransport {
    /// Create a transport for `addr` without connecting yet.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            conn: Mutex::new(None),
        }
    }

    /// Create a transport and open its connection now.
    pub async fn connect(addr: impl Into<String>) -> Result<Self> {
        let transport = Self::new(addr);
        let stream = transport.open().await?;
        *transport.conn.lock().await = Some(stream);
        Ok(transport)
    }

    /// The configured server address.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn open(&self) -> Result<TcpStream> {
        let stream = TcpStream::connect(&self.addr).await.map_err(|e| {
            SyncError::TransportError(format!("connect to {}: {}", self.addr, e))
        })?;
        stream.set_nodelay(true).map_err(SyncError::transport)?;
        Ok(stream)
    }

    async fn exchange(stream: &mut TcpStream, request: &Request) -> Result<Response> {
        write_frame(stream, request).await?;
        read_frame(stream)
            .await?
            .ok_or_else(|| SyncError::TransportError("connection closed by server".into()))
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn call(&self, request: Request) -> Result<Response> {
        let mut conn = self.conn.lock().await;
        let mut stream = match conn.take() {
            Some(stream) => stream,
            None => self.open().await?,
        };

        let result = Self::exchange(&mut stream, &request).await;
        // A failed stream may be mid-frame, so only a clean one goes back.
        if result.is_ok() {
            *conn = Some(stream);
        }
        result
    }
}

/// Bind `addr` and return the listener with its resolved local address.
pub async fn bind(addr: &str) -> Result<(TcpListener, SocketAddr)> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| SyncError::TransportError(format!("bind {}: {}", addr, e)))?;
    let local = listener.local_addr().map_err(SyncError::transport)?;
    Ok((listener, local))
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocksync_core::{Block, BlockHash, FileMetaData};
    use blocksync_store::{MemoryStore, UpdateOutcome};
    use tokio::sync::oneshot;

    async fn start_server() -> (SocketAddr, oneshot::Sender<()>) {
        let service = Arc::new(SyncService::with_store(Arc::new(MemoryStore::new())));
        let (listener, addr) = bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(serve(listener, service, async {
            let _ = rx.await;
        }));
        (addr, tx)
    }

    #[tokio::test]
    async fn test_frame_roundtrip_over_duplex() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        let request = Request::UpdateFile(FileMetaData::tombstone("a.txt", 3));

        write_frame(&mut a, &request).await.unwrap();
        let decoded: Option<Request> = read_frame(&mut b).await.unwrap();
        assert_eq!(decoded, Some(request));
    }

    #[tokio::test]
    async fn test_clean_close_reads_none() {
        let (a, mut b) = tokio::io::duplex(64);
        drop(a);
        let decoded: Option<Request> = read_frame(&mut b).await.unwrap();
        assert!(decoded.is_none());
    }

    #[tokio::test]
    async fn test_oversized_frame_header_rejected() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_u32((limits::MAX_FRAME_SIZE + 1) as u32).await.unwrap();
        let result: Result<Option<Request>> = read_frame(&mut b).await;
        assert!(matches!(result, Err(SyncError::FrameTooLarge { .. })));
    }

    #[tokio::test]
    async fn test_tcp_request_response() {
        let (addr, _shutdown) = start_server().await;
        let transport = TcpTransport::connect(addr.to_string()).await.unwrap();

        let stored = transport
            .call(Request::PutBlock(Block::new(b"abcd".to_vec())))
            .await
            .unwrap();
        assert_eq!(stored, Response::Stored(BlockHash::digest(b"abcd")));

        let updated = transport
            .call(Request::UpdateFile(FileMetaData::live(
                "a.txt",
                1,
                vec![BlockHash::digest(b"abcd")],
            )))
            .await
            .unwrap();
        assert_eq!(updated, Response::Updated(UpdateOutcome::accepted(1)));
    }

    #[tokio::test]
    async fn test_lazy_connect() {
        let (addr, _shutdown) = start_server().await;
        let transport = TcpTransport::new(addr.to_string());

        let response = transport.call(Request::GetFileInfoMap).await.unwrap();
        assert!(matches!(response, Response::FileInfoMap(map) if map.is_empty()));
    }

    #[tokio::test]
    async fn test_connect_refused_is_transport_error() {
        // Bind then drop to get a port with nothing listening.
        let (listener, addr) = bind("127.0.0.1:0").await.unwrap();
        drop(listener);

        let transport = TcpTransport::new(addr.to_string());
        let result = transport.call(Request::GetFileInfoMap).await;
        assert!(matches!(result, Err(SyncError::TransportError(_))));
    }
}
