//! Trait abstraction for the outbound byte stream to enable testing

use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Trait for an established outbound connection
#[async_trait]
pub trait Transport: Send {
    /// Write all data to the connection
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush buffered output
    async fn flush(&mut self) -> io::Result<()>;

    /// Close the write half
    async fn shutdown(&mut self) -> io::Result<()>;
}

/// Trait for opening new connections
#[async_trait]
pub trait Connector: Send + Sync {
    type Transport: Transport;

    /// Open a connection to `addr`
    async fn connect(&self, addr: SocketAddr) -> io::Result<Self::Transport>;
}

/// Wrapper around tokio::net::TcpStream that implements Transport
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.stream.flush().await
    }

    async fn shutdown(&mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }
}

/// Opens plain TCP connections with Nagle disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    type Transport = TcpTransport;

    async fn connect(&self, addr: SocketAddr) -> io::Result<TcpTransport> {
        let stream = TcpStream::connect(addr).await?;
        // Frames are 4 bytes; send each one immediately
        stream.set_nodelay(true)?;
        Ok(TcpTransport::new(stream))
    }
}
