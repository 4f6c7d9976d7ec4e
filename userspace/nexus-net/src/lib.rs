// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Userspace UDP facade v2 (descriptor-addressed datagram sockets)
//! OWNERS: @runtime
//! STATUS: Experimental
//! API_STABILITY: Unstable
//! TEST_COVERAGE: 9 unit tests, 2 integration tests (`tests/loopback.rs`)
//!
//! PUBLIC API:
//!   - NetError: cross-backend error model
//!   - NetIpAddrV4/NetSocketAddrV4: address types (IPv4-only)
//!   - Descriptor: integer handle naming an open endpoint
//!   - Buffer bounds: RECV_BUFFER_BYTES, MAX_UDP_PAYLOAD_BYTES
//!   - UdpBackend: socket/bind/connect/send/send_to/recv_from/close over descriptors
//!   - Real sockets: sys::SysNet
//!   - Fake backend (host tests): fake::FakeNet
//!
//! TEST_SCENARIOS (implemented):
//!   - udp_payload_is_bounded()
//!   - socket_addr_constructor_is_stable()
//!   - std_conversion_keeps_octets_and_port()
//!   - fake_udp_delivers_datagrams_deterministically()
//!   - fake_recv_on_empty_queue_would_block()
//!   - fake_connected_send_reaches_peer()
//!   - fake_unknown_descriptor_is_rejected()
//!   - fake_close_releases_binding()
//!   - fake_zero_length_datagram_is_delivered()

#![forbid(unsafe_code)]

use std::net::{Ipv4Addr, SocketAddrV4};

pub mod fake;
pub mod sys;

/// Receive buffer size used for a single datagram read.
pub const RECV_BUFFER_BYTES: usize = 65_536;

/// Largest payload an IPv4 UDP datagram can carry (65535 - 20 IP - 8 UDP).
pub const MAX_UDP_PAYLOAD_BYTES: usize = 65_507;

/// Integer handle naming an open UDP endpoint.
///
/// On the system backend this is the raw file descriptor; on the fake backend it is a
/// table index. Negative values never name a socket.
pub type Descriptor = i32;

/// IPv4 address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NetIpAddrV4(pub [u8; 4]);

/// Socket address (IPv4).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NetSocketAddrV4 {
    pub ip: NetIpAddrV4,
    pub port: u16,
}

impl NetSocketAddrV4 {
    pub fn new(ip: [u8; 4], port: u16) -> Self {
        Self { ip: NetIpAddrV4(ip), port }
    }

    pub fn is_unspecified(&self) -> bool {
        self.ip.0 == [0, 0, 0, 0]
    }
}

impl From<SocketAddrV4> for NetSocketAddrV4 {
    fn from(addr: SocketAddrV4) -> Self {
        Self::new(addr.ip().octets(), addr.port())
    }
}

impl From<NetSocketAddrV4> for SocketAddrV4 {
    fn from(addr: NetSocketAddrV4) -> Self {
        SocketAddrV4::new(Ipv4Addr::from(addr.ip.0), addr.port)
    }
}

/// UDP facade error model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetError {
    /// Feature is not available in this build/backend.
    #[error("unsupported")]
    Unsupported,
    /// Operation would block; only the fake backend reports this for reads.
    #[error("would block")]
    WouldBlock,
    /// Input was invalid (address/length/state).
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Descriptor does not name an open socket in this backend.
    #[error("bad descriptor {0}")]
    BadDescriptor(Descriptor),
    /// Bind failed due to address/port in use.
    #[error("address in use")]
    AddrInUse,
    /// `send` on a socket with no connected peer.
    #[error("not connected")]
    NotConnected,
    /// Failure reported by the operating system.
    #[error("os error {code:?}: {message}")]
    Os { code: Option<i32>, message: String },
    /// Unexpected internal failure; must not be used to hide normal flow control.
    #[error("internal error: {0}")]
    Internal(&'static str),
}

impl From<std::io::Error> for NetError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::WouldBlock => NetError::WouldBlock,
            std::io::ErrorKind::AddrInUse => NetError::AddrInUse,
            std::io::ErrorKind::NotConnected => NetError::NotConnected,
            _ => NetError::Os { code: err.raw_os_error(), message: err.to_string() },
        }
    }
}

pub fn validate_udp_payload_len(len: usize) -> Result<(), NetError> {
    if len > MAX_UDP_PAYLOAD_BYTES {
        return Err(NetError::InvalidInput("udp payload too large"));
    }
    Ok(())
}

/// Descriptor-addressed UDP sockets. Backends own every socket they hand out until
/// `close` is called or the backend is dropped.
pub trait UdpBackend {
    /// Allocates an unbound IPv4 datagram socket.
    fn socket(&mut self) -> Result<Descriptor, NetError>;
    fn bind(&mut self, fd: Descriptor, local: NetSocketAddrV4) -> Result<(), NetError>;
    fn connect(&mut self, fd: Descriptor, remote: NetSocketAddrV4) -> Result<(), NetError>;
    fn local_addr(&self, fd: Descriptor) -> Result<NetSocketAddrV4, NetError>;
    /// Sends to the connected peer.
    fn send(&mut self, fd: Descriptor, buf: &[u8]) -> Result<usize, NetError>;
    fn send_to(
        &mut self,
        fd: Descriptor,
        buf: &[u8],
        remote: NetSocketAddrV4,
    ) -> Result<usize, NetError>;
    /// Reads one datagram. Blocks on the system backend.
    fn recv_from(
        &mut self,
        fd: Descriptor,
        buf: &mut [u8],
    ) -> Result<(usize, NetSocketAddrV4), NetError>;
    fn close(&mut self, fd: Descriptor) -> Result<(), NetError>;
}
