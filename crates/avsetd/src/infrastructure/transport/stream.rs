//! [`AvTransport`] over a Tokio byte stream.
//!
//! The controller channel is a plain ordered byte stream: frames are written
//! whole and read back in header-sized and body-sized pieces by the engine.
//! Each `read` keeps pulling bytes until the buffer is full, the peer closes
//! the stream, or the timeout fires.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::application::transaction::{AvTransport, TransportError};

pub struct StreamTransport<S> {
    stream: S,
}

impl<S> StreamTransport<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl StreamTransport<TcpStream> {
    /// Connects to a controller listening on `endpoint` (`host:port`).
    pub async fn connect(endpoint: &str) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(endpoint).await?;
        stream.set_nodelay(true)?;
        debug!("connected to AV controller at {endpoint}");
        Ok(Self::new(stream))
    }
}

#[async_trait]
impl<S> AvTransport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn write(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        Ok(bytes.len())
    }

    async fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError> {
        let stream = &mut self.stream;
        let fill = async {
            let mut filled = 0;
            while filled < buf.len() {
                let n = stream.read(&mut buf[filled..]).await?;
                if n == 0 {
                    break;
                }
                filled += n;
            }
            Ok::<usize, std::io::Error>(filled)
        };

        let filled = match tokio::time::timeout(timeout, fill).await {
            Ok(result) => result?,
            Err(_) => return Err(TransportError::Timeout(timeout)),
        };
        if filled == 0 && !buf.is_empty() {
            return Err(TransportError::Closed);
        }
        Ok(filled)
    }
}
