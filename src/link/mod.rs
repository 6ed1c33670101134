//! # Command Link Module
//!
//! Owns the single outbound connection to the robot.
//!
//! This module handles:
//! - Opening the TCP connection with a bounded connect timeout
//! - Sending encoded wire frames
//! - Closing the socket and dropping to `Disconnected` on any send failure
//!
//! The link never retries internally: a failed `send` reports the error and
//! the control loop drives the reconnect policy. There is no outbound queue.

pub mod resolver;
pub mod transport;

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::error::{Result, TeleopError};
use crate::protocol::frame::WireFrame;
use transport::{Connector, TcpConnector, Transport};

/// Default time allowed for one connect attempt
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// Counters kept by the link
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Frames written successfully
    pub frames_sent: u64,
    /// Successful connects, including the first
    pub connects: u64,
    /// Connections lost on send
    pub failures: u64,
}

/// Outbound command connection
pub struct CommandLink<C: Connector = TcpConnector> {
    connector: C,
    transport: Option<C::Transport>,
    state: ConnectionState,
    target: Option<SocketAddr>,
    connect_timeout: Duration,
    stats: LinkStats,
}

impl<C: Connector> fmt::Debug for CommandLink<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandLink")
            .field("state", &self.state)
            .field("target", &self.target)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl CommandLink<TcpConnector> {
    /// Create a TCP link
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::time::Duration;
    /// use mecanum_teleop::link::CommandLink;
    /// use mecanum_teleop::protocol::frame::WireFrame;
    ///
    /// #[tokio::main(flavor = "current_thread")]
    /// async fn main() -> anyhow::Result<()> {
    ///     let mut link = CommandLink::tcp(Duration::from_secs(1));
    ///     link.connect("192.168.1.42".parse()?, 9999).await?;
    ///     link.send(&WireFrame::STOP).await?;
    ///     Ok(())
    /// }
    /// ```
    pub fn tcp(connect_timeout: Duration) -> Self {
        Self::new(TcpConnector, connect_timeout)
    }
}

impl<C: Connector> CommandLink<C> {
    pub fn new(connector: C, connect_timeout: Duration) -> Self {
        Self {
            connector,
            transport: None,
            state: ConnectionState::Disconnected,
            target: None,
            connect_timeout,
            stats: LinkStats::default(),
        }
    }

    /// Open a connection to `address:port`
    ///
    /// Any existing connection is closed first. The target is recorded even
    /// when the attempt fails.
    ///
    /// # Errors
    ///
    /// Returns a transport error (`ConnectionRefused`, `ConnectTimeout`, ...)
    /// and leaves the link `Disconnected`.
    pub async fn connect(&mut self, address: IpAddr, port: u16) -> Result<()> {
        let target = SocketAddr::new(address, port);
        self.close().await;
        self.target = Some(target);
        self.state = ConnectionState::Connecting;
        debug!("Connecting to {}", target);

        let attempt = tokio::time::timeout(self.connect_timeout, self.connector.connect(target));
        match attempt.await {
            Ok(Ok(transport)) => {
                self.transport = Some(transport);
                self.state = ConnectionState::Connected;
                self.stats.connects += 1;
                info!("Link connected to {}", target);
                Ok(())
            }
            Ok(Err(e)) => {
                self.state = ConnectionState::Disconnected;
                Err(TeleopError::from_transport(e, &format!("connect {}", target)))
            }
            Err(_) => {
                self.state = ConnectionState::Disconnected;
                Err(TeleopError::ConnectTimeout(format!(
                    "connect {}: no response within {:?}",
                    target, self.connect_timeout
                )))
            }
        }
    }

    /// Transmit one frame
    ///
    /// # Errors
    ///
    /// * `NotConnected` - no connection is open; nothing is written
    /// * transport variants - the write failed; the socket has been closed
    ///   and the link is `Disconnected`
    pub async fn send(&mut self, frame: &WireFrame) -> Result<()> {
        let transport = self.transport.as_mut().ok_or(TeleopError::NotConnected)?;

        let result = match transport.write_all(frame.as_bytes()).await {
            Ok(()) => transport.flush().await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                self.stats.frames_sent += 1;
                trace!("Sent frame {:?}", frame.as_bytes());
                Ok(())
            }
            Err(e) => {
                let err = TeleopError::from_transport(e, "send");
                warn!("Link lost: {}", err);
                self.stats.failures += 1;
                self.close().await;
                Err(err)
            }
        }
    }

    /// Close the connection if one is open
    pub async fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.shutdown().await {
                debug!("Ignoring shutdown error: {}", e);
            }
        }
        self.state = ConnectionState::Disconnected;
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Address of the last connect attempt
    pub fn target(&self) -> Option<SocketAddr> {
        self.target
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }
}
