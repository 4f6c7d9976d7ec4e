// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Address codec: dotted-quad text + port <-> binary IPv4 socket address.
//!
//! The binary form keeps address and port in network byte order, the way the socket layer
//! stores them.

use core::fmt;
use std::net::Ipv4Addr;

use log::warn;
use nexus_net::NetSocketAddrV4;

/// Capacity of an address text buffer: `"255.255.255.255"` plus terminator.
pub const ADDR_TEXT_CAP: usize = 16;

/// Binary IPv4 socket address, both fields in network byte order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RawSockAddr {
    pub addr: u32,
    pub port: u16,
}

impl RawSockAddr {
    pub fn to_net(self) -> NetSocketAddrV4 {
        NetSocketAddrV4::new(u32::from_be(self.addr).to_be_bytes(), u16::from_be(self.port))
    }

    pub fn from_net(addr: NetSocketAddrV4) -> Self {
        Self { addr: u32::from_be_bytes(addr.ip.0).to_be(), port: addr.port.to_be() }
    }
}

/// Builds the binary address for `text:port`.
///
/// Text that is not a dotted quad yields `0.0.0.0`; no other validation is done.
pub fn parse(text: &str, port: u16) -> RawSockAddr {
    let ip = match text.parse::<Ipv4Addr>() {
        Ok(ip) => ip,
        Err(_) => {
            warn!("udp: malformed address {text:?}, using 0.0.0.0");
            Ipv4Addr::UNSPECIFIED
        }
    };
    RawSockAddr { addr: u32::from(ip).to_be(), port: port.to_be() }
}

/// Renders the address part of `raw` as dotted-quad text.
pub fn format(raw: RawSockAddr) -> AddrText {
    let host = u32::from_be(raw.addr);
    let octets = [(host >> 24) as u8, (host >> 16) as u8, (host >> 8) as u8, host as u8];
    let mut text = AddrText::empty();
    text.len = write_ip(&octets, &mut text.buf);
    text
}

/// Address text in a fixed 16-byte buffer.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AddrText {
    buf: [u8; ADDR_TEXT_CAP],
    len: usize,
}

impl AddrText {
    fn empty() -> Self {
        Self { buf: [0; ADDR_TEXT_CAP], len: 0 }
    }

    /// Copies at most 15 bytes of `s`, cut back to a char boundary; the rest is dropped.
    pub fn truncating(s: &str) -> Self {
        let mut end = s.len().min(ADDR_TEXT_CAP - 1);
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        let mut text = Self::empty();
        text.buf[..end].copy_from_slice(&s.as_bytes()[..end]);
        text.len = end;
        text
    }

    pub fn as_str(&self) -> &str {
        // Only ever filled from a `str` prefix ending on a char boundary, or from ASCII digits.
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or_default()
    }
}

impl fmt::Display for AddrText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for AddrText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AddrText({:?})", self.as_str())
    }
}

fn write_ip(ip: &[u8; 4], out: &mut [u8]) -> usize {
    let mut pos = 0;
    for (i, octet) in ip.iter().enumerate() {
        if i > 0 {
            out[pos] = b'.';
            pos += 1;
        }
        pos += write_u8(*octet, &mut out[pos..]);
    }
    pos
}

// Decimal, no leading zeros; returns bytes written.
fn write_u8(val: u8, out: &mut [u8]) -> usize {
    if val >= 100 {
        out[0] = b'0' + (val / 100);
        out[1] = b'0' + ((val / 10) % 10);
        out[2] = b'0' + (val % 10);
        3
    } else if val >= 10 {
        out[0] = b'0' + (val / 10);
        out[1] = b'0' + (val % 10);
        2
    } else {
        out[0] = b'0' + val;
        1
    }
}
