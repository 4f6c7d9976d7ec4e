// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Operating-system UDP backend (blocking sockets)
//! OWNERS: @runtime
//! STATUS: Experimental
//! API_STABILITY: Unstable
//! TEST_COVERAGE: Integration tests in `tests/loopback.rs`
//!
//! Sockets are created unbound through `socket2` and then handed to `std::net::UdpSocket`
//! for transfer. The backend owns every socket in a descriptor table; dropping the backend
//! closes them all.

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::net::{SocketAddr, SocketAddrV4, UdpSocket};

use log::debug;
use socket2::{Domain, Protocol, SockAddr, SockRef, Socket, Type};

use crate::{validate_udp_payload_len, Descriptor, NetError, NetSocketAddrV4, UdpBackend};

/// Real sockets keyed by descriptor.
#[derive(Default)]
pub struct SysNet {
    sockets: HashMap<Descriptor, UdpSocket>,
    #[cfg_attr(unix, allow(dead_code))]
    next_fd: Descriptor,
}

impl SysNet {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, fd: Descriptor) -> Result<&UdpSocket, NetError> {
        self.sockets.get(&fd).ok_or(NetError::BadDescriptor(fd))
    }

    #[cfg(unix)]
    fn descriptor_of(&mut self, sock: &UdpSocket) -> Descriptor {
        use std::os::fd::AsRawFd;
        sock.as_raw_fd()
    }

    #[cfg(not(unix))]
    fn descriptor_of(&mut self, _sock: &UdpSocket) -> Descriptor {
        self.next_fd += 1;
        self.next_fd
    }
}

fn v4(addr: SocketAddr) -> Result<NetSocketAddrV4, NetError> {
    match addr {
        SocketAddr::V4(a) => Ok(a.into()),
        SocketAddr::V6(_) => Err(NetError::Unsupported),
    }
}

impl UdpBackend for SysNet {
    fn socket(&mut self) -> Result<Descriptor, NetError> {
        let sock = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        let sock: UdpSocket = sock.into();
        let fd = self.descriptor_of(&sock);
        debug!("nexus-net: socket fd={fd}");
        self.sockets.insert(fd, sock);
        Ok(fd)
    }

    fn bind(&mut self, fd: Descriptor, local: NetSocketAddrV4) -> Result<(), NetError> {
        let sock = self.get(fd)?;
        SockRef::from(sock).bind(&SockAddr::from(SocketAddrV4::from(local)))?;
        debug!("nexus-net: bind fd={fd} local={local:?}");
        Ok(())
    }

    fn connect(&mut self, fd: Descriptor, remote: NetSocketAddrV4) -> Result<(), NetError> {
        self.get(fd)?.connect(SocketAddrV4::from(remote))?;
        debug!("nexus-net: connect fd={fd} remote={remote:?}");
        Ok(())
    }

    fn local_addr(&self, fd: Descriptor) -> Result<NetSocketAddrV4, NetError> {
        v4(self.get(fd)?.local_addr()?)
    }

    fn send(&mut self, fd: Descriptor, buf: &[u8]) -> Result<usize, NetError> {
        validate_udp_payload_len(buf.len())?;
        Ok(self.get(fd)?.send(buf)?)
    }

    fn send_to(
        &mut self,
        fd: Descriptor,
        buf: &[u8],
        remote: NetSocketAddrV4,
    ) -> Result<usize, NetError> {
        validate_udp_payload_len(buf.len())?;
        Ok(self.get(fd)?.send_to(buf, SocketAddrV4::from(remote))?)
    }

    fn recv_from(
        &mut self,
        fd: Descriptor,
        buf: &mut [u8],
    ) -> Result<(usize, NetSocketAddrV4), NetError> {
        let (n, from) = self.get(fd)?.recv_from(buf)?;
        Ok((n, v4(from)?))
    }

    fn close(&mut self, fd: Descriptor) -> Result<(), NetError> {
        self.sockets.remove(&fd).ok_or(NetError::BadDescriptor(fd))?;
        debug!("nexus-net: close fd={fd}");
        Ok(())
    }
}
