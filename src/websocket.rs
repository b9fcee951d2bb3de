//! WebSocket upgrade capability.
//!
//! The core never performs the handshake itself. A route registered with
//! [`Router::websocket`] is flagged, and at dispatch time the configured
//! [`Upgrader`] is asked to upgrade the connection. Upgrade failure is logged
//! and the context's connection slot is left empty; the handler still runs
//! and must check [`Ctx::websocket`] before using the connection.
//!
//! [`Router::websocket`]: crate::router::Router::websocket
//! [`Ctx::websocket`]: crate::context::Ctx::websocket

use crate::context::Ctx;
use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Transport-level upgrade failure. Never fatal for dispatch.
#[derive(Debug, Error)]
pub enum UpgradeError {
    #[error("missing handshake header: {0}")]
    MissingHeader(&'static str),
    #[error("transport does not support connection upgrades")]
    Unsupported,
    #[error("handshake failed: {0}")]
    Handshake(String),
}

/// Performs the protocol upgrade for WebSocket routes.
pub trait Upgrader: Send + Sync {
    fn upgrade(&self, ctx: &Ctx) -> Result<WsConnection, UpgradeError>;
}

/// Bidirectional message transport behind an upgraded connection.
pub trait WsTransport: Send + Sync {
    fn read(&self) -> io::Result<Vec<u8>>;
    fn write(&self, msg: &[u8]) -> io::Result<()>;
}

/// Handle to an upgraded connection. Clones share the transport.
#[derive(Clone)]
pub struct WsConnection {
    transport: Arc<dyn WsTransport>,
}

impl WsConnection {
    #[must_use]
    pub fn new(transport: Arc<dyn WsTransport>) -> Self {
        Self { transport }
    }

    /// Read the next message.
    pub fn read(&self) -> io::Result<Vec<u8>> {
        self.transport.read()
    }

    /// Write a text message.
    pub fn write(&self, msg: &str) -> io::Result<()> {
        self.transport.write(msg.as_bytes())
    }

    /// Write a binary message.
    pub fn write_bytes(&self, msg: &[u8]) -> io::Result<()> {
        self.transport.write(msg)
    }
}
