// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Failure taxonomy of the socket commands.

use nexus_argstack::StackError;
use nexus_net::{Descriptor, NetError};

use crate::program::ProgramError;

/// Argument extraction failures. All are detected before any system call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgError {
    /// Fewer than two elements on the stack.
    #[error("need 2 stack elements, have {0}")]
    Shape(usize),
    #[error("wrong argument type: {0}")]
    Type(&'static str),
    /// Port outside 0..=65535; the rejected value is back on top of the stack.
    #[error("port {0} outside 0..=65535")]
    Range(i32),
    /// Address slot present but empty.
    #[error("address argument missing")]
    MissingAddress,
}

/// Errors returned by a command invocation. None of them is fatal to the host.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Arg(#[from] ArgError),
    #[error(transparent)]
    Stack(#[from] StackError),
    /// Descriptor does not survive the narrowing to 16 bits used by receive.
    #[error("descriptor {0} does not fit in 16 bits")]
    DescriptorRange(i32),
    /// The system call failed. The raw value the command pushed (if any) is still on the
    /// stack; this carries the reason.
    #[error("{op} failed on fd {fd}: {source}")]
    System { op: &'static str, fd: Descriptor, source: NetError },
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error(transparent)]
    Program(#[from] ProgramError),
    #[error("call depth limit {0} exceeded")]
    DepthExceeded(usize),
}

/// Result alias for command invocations.
pub type Result<T> = core::result::Result<T, CommandError>;
