// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Deterministic in-memory UDP backend for host tests
//! OWNERS: @runtime
//! STATUS: Experimental
//! API_STABILITY: Unstable
//! TEST_COVERAGE: Covered by unit tests in `src/lib.rs`
//!
//! TEST_SCENARIOS (implemented, in `src/lib.rs`):
//!   - fake_udp_delivers_datagrams_deterministically()
//!   - fake_recv_on_empty_queue_would_block()
//!   - fake_connected_send_reaches_peer()
//!   - fake_close_releases_binding()

#![forbid(unsafe_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::{
    validate_udp_payload_len, Descriptor, NetError, NetIpAddrV4, NetSocketAddrV4, UdpBackend,
};

type UdpDatagram = (Vec<u8>, NetSocketAddrV4);

const FIRST_DESCRIPTOR: Descriptor = 3;
const FIRST_EPHEMERAL_PORT: u16 = 10_000;

#[derive(Default)]
struct FakeSocket {
    local: Option<NetSocketAddrV4>,
    peer: Option<NetSocketAddrV4>,
    rx: VecDeque<UdpDatagram>,
}

#[derive(Default)]
struct State {
    sockets: HashMap<Descriptor, FakeSocket>,
    // Bound local address -> owning descriptor.
    bindings: HashMap<NetSocketAddrV4, Descriptor>,
    next_fd: Descriptor,
    next_port: u16,
}

impl State {
    fn alloc_ephemeral(&mut self) -> u16 {
        if self.next_port < FIRST_EPHEMERAL_PORT {
            self.next_port = FIRST_EPHEMERAL_PORT;
        }
        let p = self.next_port;
        self.next_port = self.next_port.wrapping_add(1);
        p
    }

    fn socket_mut(&mut self, fd: Descriptor) -> Result<&mut FakeSocket, NetError> {
        self.sockets.get_mut(&fd).ok_or(NetError::BadDescriptor(fd))
    }

    fn bind(&mut self, fd: Descriptor, mut local: NetSocketAddrV4) -> Result<(), NetError> {
        if self.socket_mut(fd)?.local.is_some() {
            return Err(NetError::InvalidInput("socket already bound"));
        }
        if local.port == 0 {
            local.port = self.alloc_ephemeral();
        }
        if self.bindings.contains_key(&local) {
            return Err(NetError::AddrInUse);
        }
        self.bindings.insert(local, fd);
        self.socket_mut(fd)?.local = Some(local);
        Ok(())
    }

    // Unbound sockets pick up a loopback ephemeral address on first use, like the kernel
    // assigns one on first send.
    fn ensure_bound(&mut self, fd: Descriptor) -> Result<NetSocketAddrV4, NetError> {
        if let Some(local) = self.socket_mut(fd)?.local {
            return Ok(local);
        }
        let local = NetSocketAddrV4 { ip: NetIpAddrV4([127, 0, 0, 1]), port: 0 };
        self.bind(fd, local)?;
        self.socket_mut(fd)?.local.ok_or(NetError::Internal("bind left socket unbound"))
    }

    fn resolve(&self, remote: NetSocketAddrV4) -> Option<Descriptor> {
        self.bindings.get(&remote).copied().or_else(|| {
            let wildcard = NetSocketAddrV4::new([0, 0, 0, 0], remote.port);
            self.bindings.get(&wildcard).copied()
        })
    }

    fn deliver(
        &mut self,
        fd: Descriptor,
        buf: &[u8],
        remote: NetSocketAddrV4,
    ) -> Result<usize, NetError> {
        validate_udp_payload_len(buf.len())?;
        let mut from = self.ensure_bound(fd)?;
        if from.is_unspecified() {
            from.ip = NetIpAddrV4([127, 0, 0, 1]);
        }
        let dst = self.resolve(remote).ok_or(NetError::InvalidInput("udp destination not bound"))?;
        self.socket_mut(dst)?.rx.push_back((buf.to_vec(), from));
        Ok(buf.len())
    }
}

/// Deterministic, bounded in-memory UDP backend.
///
/// Clones share one network, so two hosts can talk through the same `FakeNet`.
/// Scope: host-first tests and contract validation. This is not a performance model.
#[derive(Clone, Default)]
pub struct FakeNet {
    state: Arc<Mutex<State>>,
}

impl FakeNet {
    pub fn new() -> Self {
        let state = State {
            next_fd: FIRST_DESCRIPTOR,
            next_port: FIRST_EPHEMERAL_PORT,
            ..State::default()
        };
        Self { state: Arc::new(Mutex::new(state)) }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>, NetError> {
        self.state.lock().map_err(|_| NetError::Internal("poisoned mutex"))
    }

    /// Number of datagrams waiting on `fd`.
    pub fn pending(&self, fd: Descriptor) -> Result<usize, NetError> {
        let mut s = self.lock()?;
        Ok(s.socket_mut(fd)?.rx.len())
    }
}

impl UdpBackend for FakeNet {
    fn socket(&mut self) -> Result<Descriptor, NetError> {
        let mut s = self.lock()?;
        let fd = s.next_fd;
        s.next_fd = s.next_fd.checked_add(1).ok_or(NetError::Internal("descriptor space"))?;
        s.sockets.insert(fd, FakeSocket::default());
        Ok(fd)
    }

    fn bind(&mut self, fd: Descriptor, local: NetSocketAddrV4) -> Result<(), NetError> {
        self.lock()?.bind(fd, local)
    }

    fn connect(&mut self, fd: Descriptor, remote: NetSocketAddrV4) -> Result<(), NetError> {
        let mut s = self.lock()?;
        s.ensure_bound(fd)?;
        s.socket_mut(fd)?.peer = Some(remote);
        Ok(())
    }

    fn local_addr(&self, fd: Descriptor) -> Result<NetSocketAddrV4, NetError> {
        let s = self.lock()?;
        let sock = s.sockets.get(&fd).ok_or(NetError::BadDescriptor(fd))?;
        Ok(sock.local.unwrap_or(NetSocketAddrV4::new([0, 0, 0, 0], 0)))
    }

    fn send(&mut self, fd: Descriptor, buf: &[u8]) -> Result<usize, NetError> {
        let mut s = self.lock()?;
        let peer = s.socket_mut(fd)?.peer.ok_or(NetError::NotConnected)?;
        s.deliver(fd, buf, peer)
    }

    fn send_to(
        &mut self,
        fd: Descriptor,
        buf: &[u8],
        remote: NetSocketAddrV4,
    ) -> Result<usize, NetError> {
        self.lock()?.deliver(fd, buf, remote)
    }

    fn recv_from(
        &mut self,
        fd: Descriptor,
        buf: &mut [u8],
    ) -> Result<(usize, NetSocketAddrV4), NetError> {
        let mut s = self.lock()?;
        let sock = s.socket_mut(fd)?;
        match sock.rx.pop_front() {
            Some((payload, from)) => {
                // Datagram semantics: excess bytes are discarded.
                let n = payload.len().min(buf.len());
                buf[..n].copy_from_slice(&payload[..n]);
                Ok((n, from))
            }
            None => Err(NetError::WouldBlock),
        }
    }

    fn close(&mut self, fd: Descriptor) -> Result<(), NetError> {
        let mut s = self.lock()?;
        let sock = s.sockets.remove(&fd).ok_or(NetError::BadDescriptor(fd))?;
        if let Some(local) = sock.local {
            s.bindings.remove(&local);
        }
        Ok(())
    }
}

/// Convenience address helper for tests.
pub fn loopback(port: u16) -> NetSocketAddrV4 {
    NetSocketAddrV4 { ip: NetIpAddrV4([127, 0, 0, 1]), port }
}
