// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Socket lifecycle commands: create, bind, connect, close, local address.

use log::{debug, warn};
use nexus_net::{Descriptor, NetError, NetSocketAddrV4, UdpBackend};

use crate::addr::{self, RawSockAddr};
use crate::args::{extract_sock_args, SockArgs};
use crate::error::{CommandError, Result};
use crate::host::Host;

type Attach = fn(
    &mut Box<dyn UdpBackend>,
    Descriptor,
    NetSocketAddrV4,
) -> core::result::Result<(), NetError>;

/// `/udp/sock/create` (`-- fd`). Pushes `-1` when the system refuses a socket.
pub fn create(host: &mut Host) -> Result<()> {
    match host.net.socket() {
        Ok(fd) => {
            debug!("udp: created fd={fd}");
            host.stack.push_int32(fd);
            Ok(())
        }
        Err(source) => {
            warn!("udp: socket failed: {source}");
            host.stack.push_int32(-1);
            Err(CommandError::System { op: "socket", fd: -1, source })
        }
    }
}

/// `/udp/sock/bind` (`address port -- fd`).
pub fn bind(host: &mut Host) -> Result<()> {
    open_with(host, "bind", |net, fd, local| net.bind(fd, local))
}

/// `/udp/sock/connect` (`address port -- fd`).
pub fn connect(host: &mut Host) -> Result<()> {
    open_with(host, "connect", |net, fd, remote| net.connect(fd, remote))
}

// The descriptor replaces the address whether or not `attach` succeeds.
fn open_with(host: &mut Host, op: &'static str, attach: Attach) -> Result<()> {
    let SockArgs { address, port } = extract_sock_args(&mut host.stack)?;
    let target = addr::parse(&address, port).to_net();
    let outcome = match host.net.socket() {
        Ok(fd) => attach(&mut host.net, fd, target)
            .map(|()| fd)
            .map_err(|source| CommandError::System { op, fd, source }),
        Err(source) => Err(CommandError::System { op: "socket", fd: -1, source }),
    };
    host.stack.drop_top()?;
    match outcome {
        Ok(fd) => {
            debug!("udp: {op} fd={fd} {address}:{port}");
            host.stack.push_int32(fd);
            Ok(())
        }
        Err(err) => {
            warn!("udp: {op} {address}:{port}: {err}");
            let fd = match &err {
                CommandError::System { fd, .. } => *fd,
                _ => -1,
            };
            host.stack.push_int32(fd);
            Err(err)
        }
    }
}

/// `/udp/sock/close` (`fd --`).
pub fn close(host: &mut Host) -> Result<()> {
    let fd = host.stack.pop_int32()?;
    host.net.close(fd).map_err(|source| CommandError::System { op: "close", fd, source })?;
    debug!("udp: closed fd={fd}");
    Ok(())
}

/// `/udp/sock/addr` (`fd -- address port`). The descriptor is put back on failure.
pub fn local_addr(host: &mut Host) -> Result<()> {
    let fd = host.stack.pop_int32()?;
    match host.net.local_addr(fd) {
        Ok(local) => {
            let text = addr::format(RawSockAddr::from_net(local));
            host.stack.push_string(text.as_str());
            host.stack.push_int32(i32::from(local.port));
            Ok(())
        }
        Err(source) => {
            host.stack.push_int32(fd);
            Err(CommandError::System { op: "getsockname", fd, source })
        }
    }
}
