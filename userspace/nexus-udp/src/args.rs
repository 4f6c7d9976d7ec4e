// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Argument extraction for address-taking commands (`address port` on top of the stack).

use nexus_argstack::{ArgStack, ElemType, TypeTag};

use crate::error::ArgError;

/// Address and port read from the stack. The address element stays on the stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SockArgs {
    pub address: String,
    pub port: u16,
}

fn top_is(stack: &ArgStack, tag: TypeTag) -> bool {
    stack.peek_type() == Some(ElemType::Message) && stack.peek_message_arg_type() == Some(tag)
}

/// Pops the port and peeks the address below it.
///
/// On failure the stack is restored: a popped port is pushed back (for an out-of-range
/// port, the rejected value) so the caller can see what failed.
pub fn extract_sock_args(stack: &mut ArgStack) -> Result<SockArgs, ArgError> {
    let n = stack.len();
    if n < 2 {
        return Err(ArgError::Shape(n));
    }
    if !top_is(stack, TypeTag::Int32) {
        return Err(ArgError::Type("port must be an int32 message"));
    }
    let raw = stack.pop_int32().map_err(|_| ArgError::Type("port must be an int32 message"))?;
    let port = match u16::try_from(raw) {
        Ok(p) => p,
        Err(_) => {
            stack.push_int32(raw);
            return Err(ArgError::Range(raw));
        }
    };
    if stack.len() == n {
        // The port shared its message with other arguments; that message is consumed.
        if stack.drop_top().is_err() {
            stack.push_int32(raw);
            return Err(ArgError::Type("port must be an int32 message"));
        }
    }
    if !top_is(stack, TypeTag::Str) {
        stack.push_int32(raw);
        return Err(ArgError::Type("address must be a string message"));
    }
    match stack.peek_string() {
        Some(address) if !address.is_empty() => Ok(SockArgs { address, port }),
        _ => {
            stack.push_int32(raw);
            Err(ArgError::MissingAddress)
        }
    }
}
