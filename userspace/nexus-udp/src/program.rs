// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Quoted programs: instruction sequences stored as immutable data and run by
//! [`crate::host::Host::run_program`].

use core::fmt;
use std::sync::Arc;

use crate::config::UdpConfig;
use crate::registry::CMD_RECV;

/// Instructions of the host dispatch loop that quoted programs may use.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instr {
    /// Invokes a registered native command.
    CallNative(String),
    /// Opens a private variable scope.
    ScopeEnter,
    ScopeExit,
    /// Exchanges the two top stack elements.
    Swap,
    /// Pops the top element and binds it under the name in the innermost scope.
    Assign(String),
    /// Pops a command name (string) and invokes it.
    Exec,
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::CallNative(name) => write!(f, "call:{name}"),
            Instr::ScopeEnter => f.write_str("{"),
            Instr::ScopeExit => f.write_str("}"),
            Instr::Swap => f.write_str("swap"),
            Instr::Assign(name) => write!(f, "assign:{name}"),
            Instr::Exec => f.write_str("exec"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgramError {
    #[error("scope enter/exit markers are unbalanced")]
    Unbalanced,
    #[error("program declares {declared} instructions, has {actual}")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("scope exit without matching enter")]
    ScopeUnderflow,
    #[error("exec target is not a command name")]
    ExecTarget,
}

/// A validated, immutable instruction sequence. Clones share the body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuotedProgram {
    declared_len: usize,
    body: Arc<[Instr]>,
}

impl QuotedProgram {
    /// Checks the body against its declared length and for balanced scope markers.
    pub fn new(declared_len: usize, body: Vec<Instr>) -> Result<Self, ProgramError> {
        if body.len() != declared_len {
            return Err(ProgramError::LengthMismatch { declared: declared_len, actual: body.len() });
        }
        let mut open = 0usize;
        for instr in &body {
            match instr {
                Instr::ScopeEnter => open += 1,
                Instr::ScopeExit => open = open.checked_sub(1).ok_or(ProgramError::Unbalanced)?,
                _ => {}
            }
        }
        if open != 0 {
            return Err(ProgramError::Unbalanced);
        }
        Ok(Self { declared_len, body: body.into() })
    }

    pub fn declared_len(&self) -> usize {
        self.declared_len
    }

    pub fn body(&self) -> &[Instr] {
        &self.body
    }
}

impl fmt::Display for QuotedProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, instr) in self.body.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{instr}")?;
        }
        Ok(())
    }
}

pub const RECV_THEN_LEN: usize = 6;

/// Body of `/udp/recv/then`. Expects `... callback fd`; receives one datagram, binds its
/// sender in a private scope and runs `callback` with the datagram on top.
pub fn compose_recv_then(config: &UdpConfig) -> Result<QuotedProgram, ProgramError> {
    QuotedProgram::new(
        RECV_THEN_LEN,
        vec![
            Instr::ScopeEnter,
            Instr::CallNative(CMD_RECV.to_string()),
            Instr::Assign(config.sender_addr_path.clone()),
            Instr::Swap,
            Instr::Exec,
            Instr::ScopeExit,
        ],
    )
}
