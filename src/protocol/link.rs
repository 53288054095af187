//! Datagram link to the HMI controller.
//!
//! The link is deliberately dumb: it moves raw datagrams and reports read
//! timeouts as `Ok(None)`. Trigger validation lives in [`check_trigger`] so
//! that the same policy applies to every transport.

use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::time::Duration;

use super::codec::{decode, ControlPacket, ParseError};

const MAX_DATAGRAM: usize = 1024;

/// One datagram received from the network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inbound {
    pub from: SocketAddr,
    pub bytes: Vec<u8>,
}

/// Transport carrying triggers in and commands out.
pub trait HmiLink {
    /// Wait for one datagram for at most the link's poll interval.
    ///
    /// Returns `Ok(None)` on timeout so callers can check for shutdown.
    fn poll(&mut self) -> Result<Option<Inbound>>;

    /// Send a packet to the HMI.
    fn send(&mut self, packet: &ControlPacket) -> Result<()>;
}

/// Verdict on a single inbound datagram.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TriggerCheck {
    Trigger,
    /// Sent by someone other than the HMI. Dropped silently.
    WrongPeer(IpAddr),
    Malformed(ParseError),
    /// Well-formed packet whose payload is not the trigger tuple.
    NotTrigger(ControlPacket),
}

/// Apply the trigger policy: right peer IP, well-formed packet, exact
/// trigger payload. The peer port is not compared.
pub fn check_trigger(inbound: &Inbound, hmi_ip: IpAddr) -> TriggerCheck {
    if inbound.from.ip() != hmi_ip {
        return TriggerCheck::WrongPeer(inbound.from.ip());
    }
    match decode(&inbound.bytes) {
        Ok(packet) if packet.is_trigger() => TriggerCheck::Trigger,
        Ok(packet) => TriggerCheck::NotTrigger(packet),
        Err(err) => TriggerCheck::Malformed(err),
    }
}

/// Configuration for a UDP link.
#[derive(Clone, Debug)]
pub struct UdpLinkConfig {
    /// Local bind address (e.g., "0.0.0.0:5001").
    pub listen_addr: SocketAddr,
    /// Where commands are sent; its IP is also the only accepted trigger source.
    pub hmi_addr: SocketAddr,
    /// Upper bound on a single blocking read.
    pub poll_timeout: Duration,
}

/// UDP implementation of [`HmiLink`].
pub struct UdpHmiLink {
    socket: UdpSocket,
    hmi_addr: SocketAddr,
    datagrams_in: u64,
    packets_out: u64,
}

impl UdpHmiLink {
    pub fn bind(config: &UdpLinkConfig) -> Result<Self> {
        let socket = UdpSocket::bind(config.listen_addr)
            .with_context(|| format!("bind udp socket on {}", config.listen_addr))?;
        socket
            .set_read_timeout(Some(config.poll_timeout))
            .context("set udp read timeout")?;
        log::info!(
            "hmi link listening on {} (hmi {})",
            socket.local_addr().unwrap_or(config.listen_addr),
            config.hmi_addr
        );
        Ok(Self {
            socket,
            hmi_addr: config.hmi_addr,
            datagrams_in: 0,
            packets_out: 0,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// (datagrams received, packets sent)
    pub fn counters(&self) -> (u64, u64) {
        (self.datagrams_in, self.packets_out)
    }
}

impl HmiLink for UdpHmiLink {
    fn poll(&mut self) -> Result<Option<Inbound>> {
        let mut buf = [0u8; MAX_DATAGRAM];
        match self.socket.recv_from(&mut buf) {
            Ok((len, from)) => {
                self.datagrams_in += 1;
                Ok(Some(Inbound {
                    from,
                    bytes: buf[..len].to_vec(),
                }))
            }
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                Ok(None)
            }
            Err(err) => Err(anyhow::Error::new(err).context("recv udp datagram")),
        }
    }

    fn send(&mut self, packet: &ControlPacket) -> Result<()> {
        let bytes = packet.encode();
        let sent = self
            .socket
            .send_to(&bytes, self.hmi_addr)
            .with_context(|| format!("send command to {}", self.hmi_addr))?;
        if sent != bytes.len() {
            anyhow::bail!("short udp send: {} of {} bytes", sent, bytes.len());
        }
        self.packets_out += 1;
        Ok(())
    }
}
