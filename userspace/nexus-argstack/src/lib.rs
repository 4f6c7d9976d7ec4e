// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Host argument stack model (typed message elements in one byte buffer)
//! OWNERS: @runtime
//! STATUS: Experimental
//! API_STABILITY: Unstable
//! TEST_COVERAGE: 2 unit tests, 19 integration tests (`tests/stack_ops.rs`, `tests/codec.rs`)
//!
//! PUBLIC API:
//!   - ArgStack: stack of size-prefixed frames with typed push/pop/peek
//!   - ElemView: bounds-checked raw view of one frame
//!   - Element/Message/Arg/TypeTag: decoded element model and its codec
//!   - StackError: typed failures of stack operations
//!
//! This is the minimum of the host's stack that socket commands need: typed argument
//! access, raw frame access for zero-copy sends, and blob/element conversion.

#![forbid(unsafe_code)]
#![deny(clippy::all)]

pub mod codec;
pub mod stack;

pub use codec::{Arg, CodecError, Element, Message, TypeTag};
pub use stack::{ArgStack, ElemType, ElemView, SIZE_HEADER};

/// Result alias for stack operations.
pub type Result<T> = core::result::Result<T, StackError>;

/// Errors produced by stack operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StackError {
    #[error("stack is empty")]
    Empty,
    #[error("stack underflow: need {needed} elements, have {available}")]
    Underflow { needed: usize, available: usize },
    #[error("top element is not a message")]
    NotMessage,
    #[error("top message has no arguments")]
    NoArgs,
    #[error("expected argument type {expected}, found {found:?}")]
    ArgType { expected: TypeTag, found: Option<TypeTag> },
    /// A frame header declares more bytes than remain in the buffer.
    #[error("frame at {offset} declares {declared} bytes, {available} available")]
    Overrun { offset: usize, declared: usize, available: usize },
    #[error(transparent)]
    Codec(#[from] CodecError),
}
