// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: UDP command extension for the stack-based message host
//! OWNERS: @runtime
//! STATUS: Experimental
//! API_STABILITY: Unstable
//! TEST_COVERAGE: 23 unit tests, 28 integration tests (`tests/args.rs`,
//!   `tests/commands_fake.rs`, `tests/recv_then.rs`, `tests/loopback.rs`)
//!
//! PUBLIC API:
//!   - Registry::with_udp_commands(): command table for the `/udp/...` namespace
//!   - Host: argument stack, scope chain and dispatch loop
//!   - extract_sock_args(): `address port` extraction with stack restoration
//!   - addr::parse()/addr::format(): dotted-quad text <-> network-order address
//!   - compose_recv_then(): receive-and-dispatch quoted program
//!   - UdpConfig: TOML-backed settings
//!
//! COMMANDS:
//!   - /udp/sock/create   ( -- fd )
//!   - /udp/sock/bind     ( address port -- fd )
//!   - /udp/sock/connect  ( address port -- fd )
//!   - /udp/sock/close    ( fd -- )
//!   - /udp/sock/addr     ( fd -- address port )
//!   - /udp/recv          ( fd -- datagram sender )
//!   - /udp/send          ( payload fd -- )
//!   - /udp/sendto        ( payload address port fd -- )
//!   - /udp/recv/then     ( callback fd -- ... )

#![forbid(unsafe_code)]
#![deny(clippy::all)]

pub mod addr;
pub mod args;
pub mod cli;
pub mod config;
pub mod error;
pub mod host;
pub mod program;
pub mod registry;
pub mod sock;
pub mod xfer;

pub use args::{extract_sock_args, SockArgs};
pub use config::{ConfigError, UdpConfig};
pub use error::{ArgError, CommandError, Result};
pub use host::Host;
pub use program::{compose_recv_then, Instr, ProgramError, QuotedProgram};
pub use registry::{Binding, NativeFn, Registry};
