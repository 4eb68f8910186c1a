//! Fake console for loopback tests.

#![allow(dead_code)]

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use cuebridge_core::transport::codec;
use cuebridge_core::{HardwareVariant, LinkTiming, MixerSettings};
use rosc::{OscMessage, OscType};
use tokio::net::UdpSocket;
use tokio::time::timeout;

pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);
pub const PACING: Duration = Duration::from_millis(5);

pub fn timing() -> LinkTiming {
    LinkTiming {
        pacing: PACING,
        ..LinkTiming::default()
    }
}

/// A UDP socket standing in for the mixer's command port.
pub struct FakeConsole {
    socket: UdpSocket,
}

impl FakeConsole {
    pub async fn bind() -> Self {
        let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        Self { socket }
    }

    pub fn port(&self) -> u16 {
        self.socket.local_addr().unwrap().port()
    }

    /// Enabled settings pointing at this console, listening on `listen_port`.
    pub fn settings(&self, variant: HardwareVariant, listen_port: u16) -> MixerSettings {
        MixerSettings {
            mixer_integration_enabled: true,
            mixer_type: variant,
            target_ip_address: Some("127.0.0.1".to_string()),
            target_port: self.port(),
            listen_port: Some(listen_port),
        }
    }

    pub async fn recv(&self) -> OscMessage {
        let mut buf = [0u8; 2048];
        let (size, _) = timeout(RECV_TIMEOUT, self.socket.recv_from(&mut buf))
            .await
            .expect("console received nothing")
            .unwrap();
        codec::decode_datagram(&buf[..size]).unwrap().remove(0)
    }

    pub async fn recv_n(&self, n: usize) -> Vec<OscMessage> {
        let mut messages = Vec::with_capacity(n);
        for _ in 0..n {
            messages.push(self.recv().await);
        }
        messages
    }

    /// Whether anything arrives within `window`.
    pub async fn is_quiet_for(&self, window: Duration) -> bool {
        let mut buf = [0u8; 2048];
        timeout(window, self.socket.recv_from(&mut buf)).await.is_err()
    }

    /// Push a message to the bridge's listen port, the way the mixer streams state.
    pub async fn push(&self, listen_port: u16, address: &str, args: Vec<OscType>) {
        let bytes = codec::encode_message(&codec::message(address, args)).unwrap();
        self.socket
            .send_to(&bytes, SocketAddr::from((Ipv4Addr::LOCALHOST, listen_port)))
            .await
            .unwrap();
    }
}

/// A port that was free a moment ago.
pub fn free_port() -> u16 {
    let socket = std::net::UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).unwrap();
    socket.local_addr().unwrap().port()
}
