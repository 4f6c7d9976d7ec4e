// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Dispatch loop: runs commands and quoted programs against one argument stack.
//!
//! Variables live in a scope chain. The outermost scope is permanent; `ScopeEnter` and
//! `ScopeExit` add and remove private scopes above it. Lookups search innermost first.

use std::collections::HashMap;

use log::debug;
use nexus_argstack::{ArgStack, Element};
use nexus_net::UdpBackend;

use crate::config::UdpConfig;
use crate::error::{CommandError, Result};
use crate::program::{Instr, ProgramError, QuotedProgram};
use crate::registry::{Binding, Registry};

pub struct Host {
    pub(crate) stack: ArgStack,
    pub(crate) net: Box<dyn UdpBackend>,
    pub(crate) config: UdpConfig,
    scopes: Vec<HashMap<String, Vec<u8>>>,
    depth: usize,
}

impl Host {
    pub fn new(net: impl UdpBackend + 'static, config: UdpConfig) -> Self {
        Self {
            stack: ArgStack::new(),
            net: Box::new(net),
            config,
            scopes: vec![HashMap::new()],
            depth: 0,
        }
    }

    pub fn stack(&self) -> &ArgStack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut ArgStack {
        &mut self.stack
    }

    pub fn config(&self) -> &UdpConfig {
        &self.config
    }

    pub fn net_mut(&mut self) -> &mut dyn UdpBackend {
        self.net.as_mut()
    }

    /// Number of open scopes, the permanent one included.
    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    /// Raw frame bound under `name`, innermost scope first.
    pub fn lookup_var(&self, name: &str) -> Option<&[u8]> {
        self.scopes.iter().rev().find_map(|s| s.get(name)).map(Vec::as_slice)
    }

    /// Decoded element bound under `name`.
    pub fn var_element(&self, name: &str) -> Option<Element> {
        Element::decode(self.lookup_var(name)?).ok()
    }

    /// Binds raw frame bytes under `name` in the innermost scope.
    pub fn bind_var(&mut self, name: &str, frame: Vec<u8>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), frame);
        }
    }

    /// Invokes the command bound to `name`.
    pub fn call(&mut self, registry: &Registry, name: &str) -> Result<()> {
        let binding = registry
            .lookup(name)
            .cloned()
            .ok_or_else(|| CommandError::UnknownCommand(name.to_string()))?;
        if self.depth >= self.config.max_call_depth {
            return Err(CommandError::DepthExceeded(self.config.max_call_depth));
        }
        self.depth += 1;
        debug!("udp: call {name} (depth {}, stack {})", self.depth, self.stack.len());
        let result = match &binding {
            Binding::Native(f) => f(self),
            Binding::Program(p) => self.run_program(registry, p),
        };
        self.depth -= 1;
        result
    }

    /// Runs `program` instruction by instruction. On error, scopes the program opened are
    /// closed before returning; the stack is left as the failing instruction left it.
    pub fn run_program(&mut self, registry: &Registry, program: &QuotedProgram) -> Result<()> {
        let base = self.scopes.len();
        for instr in program.body() {
            if let Err(err) = self.step(registry, instr) {
                self.scopes.truncate(base);
                return Err(err);
            }
        }
        Ok(())
    }

    fn step(&mut self, registry: &Registry, instr: &Instr) -> Result<()> {
        match instr {
            Instr::ScopeEnter => self.scopes.push(HashMap::new()),
            Instr::ScopeExit => {
                if self.scopes.len() <= 1 {
                    return Err(ProgramError::ScopeUnderflow.into());
                }
                self.scopes.pop();
            }
            Instr::CallNative(name) => match registry.lookup(name) {
                Some(Binding::Native(f)) => f(self)?,
                _ => return Err(CommandError::UnknownCommand(name.clone())),
            },
            Instr::Swap => self.stack.swap()?,
            Instr::Assign(name) => {
                let frame = self.stack.pop_frame()?;
                self.bind_var(name, frame);
            }
            Instr::Exec => {
                let target = self.stack.pop_string().map_err(|_| ProgramError::ExecTarget)?;
                self.call(registry, &target)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_net::fake::FakeNet;

    fn host() -> Host {
        Host::new(FakeNet::new(), UdpConfig::default())
    }

    #[test]
    fn unknown_command_is_reported() {
        let mut h = host();
        let err = h.call(&Registry::new(), "/nope").expect_err("unknown");
        assert_eq!(err, CommandError::UnknownCommand("/nope".into()));
    }

    #[test]
    fn assign_binds_in_innermost_scope_only() {
        let mut reg = Registry::new();
        reg.register_native("/probe", |h: &mut Host| {
            assert!(h.var_element("/x").is_some());
            Ok(())
        });
        let prog = QuotedProgram::new(
            5,
            vec![
                Instr::ScopeEnter,
                Instr::Assign("/x".into()),
                Instr::CallNative("/probe".into()),
                Instr::ScopeExit,
                Instr::Swap,
            ],
        )
        .expect("program");
        let mut h = host();
        h.stack_mut().push_int32(1);
        h.stack_mut().push_int32(2);
        h.stack_mut().push_int32(3);
        h.run_program(&reg, &prog).expect("run");
        assert!(h.lookup_var("/x").is_none());
        assert_eq!(h.stack_mut().pop_int32(), Ok(1));
        assert_eq!(h.stack_mut().pop_int32(), Ok(2));
        assert!(h.stack().is_empty());
    }

    #[test]
    fn failing_program_unwinds_scopes() {
        let prog = QuotedProgram::new(3, vec![Instr::ScopeEnter, Instr::Swap, Instr::ScopeExit])
            .expect("program");
        let mut h = host();
        assert!(h.run_program(&Registry::new(), &prog).is_err());
        assert_eq!(h.scope_depth(), 1);
    }

    #[test]
    fn self_recursive_command_hits_depth_limit() {
        let mut reg = Registry::new();
        let prog = QuotedProgram::new(1, vec![Instr::Exec]).expect("program");
        reg.register_program("/loop", prog);
        let config = UdpConfig { max_call_depth: 4, ..UdpConfig::default() };
        let mut h = Host::new(FakeNet::new(), config);
        for _ in 0..8 {
            h.stack_mut().push_string("/loop");
        }
        assert_eq!(h.call(&reg, "/loop"), Err(CommandError::DepthExceeded(4)));
    }
}
