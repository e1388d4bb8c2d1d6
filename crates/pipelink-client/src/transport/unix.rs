//! Unix domain socket transport.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tracing::{debug, trace};

use pipelink_core::error::{PipeLinkError, Result};
use pipelink_core::protocol::{decode_frame, encode_frame, Frame, HEADER_SIZE, MAX_FRAME_SIZE};

use super::endpoints::EndpointResolver;
use super::{PipeTransport, ReadOutcome};

pub struct UnixPipeTransport {
    resolver: EndpointResolver,
    read_timeout: Duration,
    stream: Option<UnixStream>,
    endpoint: Option<PathBuf>,
    buf: BytesMut,
}

impl UnixPipeTransport {
    pub fn new(resolver: EndpointResolver, read_timeout: Duration) -> Self {
        Self {
            resolver,
            read_timeout,
            stream: None,
            endpoint: None,
            buf: BytesMut::with_capacity(HEADER_SIZE + MAX_FRAME_SIZE),
        }
    }

    /// Endpoint of the live connection, if any.
    pub fn endpoint(&self) -> Option<&PathBuf> {
        self.endpoint.as_ref()
    }
}

#[async_trait]
impl PipeTransport for UnixPipeTransport {
    async fn connect(&mut self, slot: u8) -> bool {
        self.close().await;

        for path in self.resolver.candidates(slot) {
            match UnixStream::connect(&path).await {
                Ok(stream) => {
                    debug!(slot, path = %path.display(), "pipe connected");
                    self.stream = Some(stream);
                    self.endpoint = Some(path);
                    return true;
                }
                Err(e) => trace!(slot, path = %path.display(), error = %e, "pipe connect failed"),
            }
        }
        false
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
            debug!(path = ?self.endpoint, "pipe closed");
        }
        self.endpoint = None;
        self.buf.clear();
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn read_frame(&mut self) -> Result<ReadOutcome> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(PipeLinkError::NotConnected);
        };

        loop {
            if let Some(frame) = decode_frame(&mut self.buf)? {
                return Ok(ReadOutcome::Frame(frame));
            }

            match tokio::time::timeout(self.read_timeout, stream.readable()).await {
                Err(_) => return Ok(ReadOutcome::WouldBlock),
                Ok(ready) => ready?,
            }

            match stream.try_read_buf(&mut self.buf) {
                Ok(0) => return Err(PipeLinkError::ConnectionClosed),
                Ok(n) => trace!(n, "pipe read"),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(PipeLinkError::NotConnected);
        };
        let bytes = encode_frame(frame)?;
        stream.write_all(&bytes).await?;
        Ok(())
    }
}
