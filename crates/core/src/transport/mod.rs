//! UDP transport to the console.
//!
//! One outbound socket sends commands to the console's command port, one
//! inbound socket on a dedicated local port receives whatever the console
//! streams back. There is no retry in here; callers decide what a failed send
//! means for them.

pub mod codec;

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rosc::{OscMessage, OscType};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

use crate::error::TransportError;

/// Receive buffer size; the console never sends anything near this.
const RECV_BUFFER_SIZE: usize = 8192;

/// Pause after a socket-level receive error before trying again.
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// A decoded message together with the address it came from.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub message: OscMessage,
    pub sender: SocketAddr,
}

pub type MessageHandler = Arc<dyn Fn(InboundMessage) + Send + Sync>;

/// Anything outbound console messages can be written to.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, message: OscMessage) -> Result<(), TransportError>;
}

/// Wildcard address on `port` in the same family as `target`.
fn wildcard_for(target: SocketAddr, port: u16) -> SocketAddr {
    let ip = match target {
        SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    };
    SocketAddr::new(ip, port)
}

struct Sockets {
    outbound: Arc<UdpSocket>,
    inbound: Arc<UdpSocket>,
    local_port: u16,
}

/// OSC-over-UDP link to a single console.
pub struct OscTransport {
    target: SocketAddr,
    sockets: Mutex<Option<Sockets>>,
    receive_task: Mutex<Option<JoinHandle<()>>>,
}

impl OscTransport {
    pub fn new(target: SocketAddr) -> Self {
        Self {
            target,
            sockets: Mutex::new(None),
            receive_task: Mutex::new(None),
        }
    }

    pub fn is_open(&self) -> bool {
        self.sockets.lock().is_some()
    }

    /// Port the inbound socket is actually bound to.
    pub fn local_port(&self) -> Option<u16> {
        self.sockets.lock().as_ref().map(|s| s.local_port)
    }

    /// Bind both sockets. `listen_port` 0 picks an ephemeral port.
    ///
    /// Sockets are bound in the target's address family, so an IPv6 console
    /// gets IPv6 sockets.
    ///
    /// Returns the bound listen port. Fails with `BindFailed` if another
    /// process holds the port; the transport then stays closed.
    pub async fn open(&self, listen_port: u16) -> Result<u16, TransportError> {
        if self.is_open() {
            return Err(TransportError::AlreadyOpen);
        }

        let inbound = UdpSocket::bind(wildcard_for(self.target, listen_port))
            .await
            .map_err(|source| TransportError::BindFailed {
                port: listen_port,
                source,
            })?;
        let local_port = inbound
            .local_addr()
            .map_err(|source| TransportError::BindFailed {
                port: listen_port,
                source,
            })?
            .port();
        let outbound = UdpSocket::bind(wildcard_for(self.target, 0))
            .await
            .map_err(|source| TransportError::BindFailed { port: 0, source })?;

        let mut sockets = self.sockets.lock();
        if sockets.is_some() {
            return Err(TransportError::AlreadyOpen);
        }
        *sockets = Some(Sockets {
            outbound: Arc::new(outbound),
            inbound: Arc::new(inbound),
            local_port,
        });

        log::info!(
            "Mixer transport open: listening on {}, sending to {}",
            local_port,
            self.target
        );
        Ok(local_port)
    }

    /// Start delivering inbound messages to `handler`.
    ///
    /// Replaces any previously installed handler.
    pub fn on_message<F>(&self, handler: F) -> Result<(), TransportError>
    where
        F: Fn(InboundMessage) + Send + Sync + 'static,
    {
        let inbound = self
            .sockets
            .lock()
            .as_ref()
            .map(|s| Arc::clone(&s.inbound))
            .ok_or(TransportError::NotConnected)?;

        let handler: MessageHandler = Arc::new(handler);
        let task = tokio::spawn(receive_loop(inbound, handler));
        if let Some(previous) = self.receive_task.lock().replace(task) {
            previous.abort();
        }
        Ok(())
    }

    pub async fn send_message(&self, message: OscMessage) -> Result<(), TransportError> {
        let outbound = self
            .sockets
            .lock()
            .as_ref()
            .map(|s| Arc::clone(&s.outbound))
            .ok_or(TransportError::NotConnected)?;

        let bytes = codec::encode_message(&message)?;
        log::debug!("-> {} {:?}", message.addr, message.args);
        outbound.send_to(&bytes, self.target).await?;
        Ok(())
    }

    pub async fn send(&self, address: &str, args: Vec<OscType>) -> Result<(), TransportError> {
        self.send_message(codec::message(address, args)).await
    }

    /// Stop receiving and release both sockets.
    ///
    /// Waits for the receive task to finish so the listen port is free again
    /// once this returns. Closing a closed transport does nothing.
    pub async fn close(&self) {
        let task = self.receive_task.lock().take();
        if let Some(task) = task {
            task.abort();
            let _ = task.await;
        }
        if self.sockets.lock().take().is_some() {
            log::info!("Mixer transport to {} closed", self.target);
        }
    }
}

#[async_trait]
impl MessageSink for OscTransport {
    async fn send(&self, message: OscMessage) -> Result<(), TransportError> {
        self.send_message(message).await
    }
}

impl Drop for OscTransport {
    fn drop(&mut self) {
        if let Some(task) = self.receive_task.get_mut().take() {
            task.abort();
        }
    }
}

async fn receive_loop(socket: Arc<UdpSocket>, handler: MessageHandler) {
    let mut buf = vec![0u8; RECV_BUFFER_SIZE];
    loop {
        match socket.recv_from(&mut buf).await {
            Ok((size, sender)) => match codec::decode_datagram(&buf[..size]) {
                Ok(messages) => {
                    for message in messages {
                        log::debug!("<- {} {:?} from {}", message.addr, message.args, sender);
                        handler(InboundMessage { message, sender });
                    }
                }
                Err(e) => log::warn!("Dropping undecodable datagram from {}: {:?}", sender, e),
            },
            Err(e) => {
                log::warn!("Mixer receive failed: {}", e);
                tokio::time::sleep(RECV_ERROR_BACKOFF).await;
            }
        }
    }
}
