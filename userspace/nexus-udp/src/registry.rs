// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Command table: namespaced names bound to native functions or quoted programs.

use core::fmt;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::UdpConfig;
use crate::error::Result;
use crate::host::Host;
use crate::program::{compose_recv_then, ProgramError, QuotedProgram};
use crate::{sock, xfer};

pub const CMD_SOCK_CREATE: &str = "/udp/sock/create";
pub const CMD_SOCK_BIND: &str = "/udp/sock/bind";
pub const CMD_SOCK_CONNECT: &str = "/udp/sock/connect";
pub const CMD_SOCK_CLOSE: &str = "/udp/sock/close";
pub const CMD_SOCK_ADDR: &str = "/udp/sock/addr";
pub const CMD_RECV: &str = "/udp/recv";
pub const CMD_SEND: &str = "/udp/send";
pub const CMD_SENDTO: &str = "/udp/sendto";
pub const CMD_RECV_THEN: &str = "/udp/recv/then";

/// Native command body.
pub type NativeFn = Arc<dyn Fn(&mut Host) -> Result<()> + Send + Sync>;

#[derive(Clone)]
pub enum Binding {
    Native(NativeFn),
    Program(QuotedProgram),
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Native(_) => f.write_str("Native(..)"),
            Binding::Program(p) => f.debug_tuple("Program").field(&p.to_string()).finish(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Registry {
    commands: BTreeMap<String, Binding>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table holding every UDP command.
    pub fn with_udp_commands(config: &UdpConfig) -> core::result::Result<Self, ProgramError> {
        let mut reg = Self::new();
        reg.register_native(CMD_SOCK_CREATE, sock::create);
        reg.register_native(CMD_SOCK_BIND, sock::bind);
        reg.register_native(CMD_SOCK_CONNECT, sock::connect);
        reg.register_native(CMD_SOCK_CLOSE, sock::close);
        reg.register_native(CMD_SOCK_ADDR, sock::local_addr);
        reg.register_native(CMD_RECV, xfer::recv);
        reg.register_native(CMD_SEND, xfer::send);
        reg.register_native(CMD_SENDTO, xfer::send_to);
        reg.register_program(CMD_RECV_THEN, compose_recv_then(config)?);
        Ok(reg)
    }

    /// Binds `name` to a native function, replacing any previous binding.
    pub fn register_native<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&mut Host) -> Result<()> + Send + Sync + 'static,
    {
        self.commands.insert(name.to_string(), Binding::Native(Arc::new(f)));
    }

    pub fn register_program(&mut self, name: &str, program: QuotedProgram) {
        self.commands.insert(name.to_string(), Binding::Program(program));
    }

    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.commands.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.commands.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn udp_table_binds_every_command() {
        let reg = Registry::with_udp_commands(&UdpConfig::default()).expect("registry");
        assert_eq!(reg.names().count(), 9);
        assert!(matches!(reg.lookup(CMD_RECV), Some(Binding::Native(_))));
        assert!(matches!(reg.lookup(CMD_RECV_THEN), Some(Binding::Program(_))));
        assert!(reg.lookup("/udp/nope").is_none());
    }
}
