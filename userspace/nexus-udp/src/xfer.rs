// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Datagram transfer commands.
//!
//! Sends take the top element's raw frame bytes as the payload, with no type check; the
//! frame length is checked against the stack buffer first. Receives lift the datagram
//! onto the stack as a native element followed by the sender message.

use log::{debug, warn};
use nexus_argstack::Arg;
use nexus_net::Descriptor;

use crate::addr::{self, AddrText, RawSockAddr};
use crate::error::{ArgError, CommandError, Result};
use crate::host::Host;

/// Receive addresses descriptors through 16 bits; wider values are rejected.
pub fn narrow_descriptor(raw: i32) -> Result<Descriptor> {
    u16::try_from(raw).map(Descriptor::from).map_err(|_| CommandError::DescriptorRange(raw))
}

/// `/udp/recv` (`fd -- datagram sender`). Blocks until one datagram arrives.
pub fn recv(host: &mut Host) -> Result<()> {
    let raw = host.stack.pop_int32()?;
    let fd = match narrow_descriptor(raw) {
        Ok(fd) => fd,
        Err(err) => {
            host.stack.push_int32(raw);
            return Err(err);
        }
    };
    let mut buf = vec![0u8; host.config.recv_buffer_bytes];
    let (n, sender) = host.net.recv_from(fd, &mut buf).map_err(|source| {
        warn!("udp: recv fd={fd}: {source}");
        CommandError::System { op: "recv", fd, source }
    })?;
    host.stack.push_blob(&buf[..n]);
    host.stack.blob_to_elem()?;
    let text = addr::format(RawSockAddr::from_net(sender));
    debug!("udp: recv fd={fd} {n} bytes from {text}:{}", sender.port);
    host.stack.push_message(&host.config.sender_addr_path, vec![Arg::Str(text.as_str().into())]);
    Ok(())
}

/// `/udp/send` (`payload fd --`) on a connected socket.
pub fn send(host: &mut Host) -> Result<()> {
    let fd = host.stack.pop_int32()?;
    let Host { stack, net, .. } = host;
    let sent = match stack.top_view() {
        Ok(view) => net.send(fd, view.payload),
        Err(err) => {
            stack.push_int32(fd);
            return Err(err.into());
        }
    };
    stack.drop_top()?;
    match sent {
        Ok(n) => {
            debug!("udp: send fd={fd} {n} bytes");
            Ok(())
        }
        Err(source) => {
            warn!("udp: send fd={fd}: {source}");
            Err(CommandError::System { op: "send", fd, source })
        }
    }
}

/// `/udp/sendto` (`payload address port fd --`). The address is truncated to 15 bytes
/// before it is parsed.
pub fn send_to(host: &mut Host) -> Result<()> {
    let Host { stack, net, .. } = host;
    let fd = stack.pop_int32()?;
    let raw_port = match stack.pop_int32() {
        Ok(p) => p,
        Err(err) => {
            stack.push_int32(fd);
            return Err(err.into());
        }
    };
    let Ok(port) = u16::try_from(raw_port) else {
        stack.push_int32(raw_port);
        stack.push_int32(fd);
        return Err(ArgError::Range(raw_port).into());
    };
    let popped = match stack.pop_string() {
        Ok(s) => s,
        Err(err) => {
            stack.push_int32(raw_port);
            stack.push_int32(fd);
            return Err(err.into());
        }
    };
    let address = AddrText::truncating(&popped);
    let dest = addr::parse(address.as_str(), port).to_net();
    let sent = match stack.top_view() {
        Ok(view) => net.send_to(fd, view.payload, dest),
        Err(err) => {
            stack.push_string(&popped);
            stack.push_int32(raw_port);
            stack.push_int32(fd);
            return Err(err.into());
        }
    };
    stack.drop_top()?;
    match sent {
        Ok(n) => {
            debug!("udp: sendto fd={fd} {n} bytes to {address}:{port}");
            Ok(())
        }
        Err(source) => {
            warn!("udp: sendto fd={fd} {address}:{port}: {source}");
            Err(CommandError::System { op: "sendto", fd, source })
        }
    }
}
