// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Command-line front end: evaluates a whitespace-separated script against a fresh host.
//!
//! Tokens are evaluated left to right. Integers are pushed as int32 values, registered
//! command names are invoked, a leading `'` pushes the rest of the token as a string
//! (so command names can be passed as callbacks), and anything else is pushed as a string.

use log::error;
use nexus_net::sys::SysNet;

use crate::config::UdpConfig;
use crate::host::Host;
use crate::registry::Registry;

/// Returns the CLI usage string.
pub fn help() -> &'static str {
    "nexus-udp evaluates a UDP command script. Usage: nexus-udp [--help] [--list] TOKEN...\n\
     e.g. nexus-udp 127.0.0.1 9000 /udp/sock/bind"
}

/// Evaluates `tokens` on `host` and renders the final stack. Evaluation stops at the
/// first failing command; the error is appended to the output.
pub fn evaluate(host: &mut Host, registry: &Registry, tokens: &[&str]) -> String {
    let mut failure = None;
    for token in tokens {
        if let Some(text) = token.strip_prefix('\'') {
            host.stack_mut().push_string(text);
        } else if let Ok(v) = token.parse::<i32>() {
            host.stack_mut().push_int32(v);
        } else if registry.contains(token) {
            if let Err(err) = host.call(registry, token) {
                failure = Some(format!("error: {token}: {err}"));
                break;
            }
        } else {
            host.stack_mut().push_string(token);
        }
    }
    let mut out = host.stack().to_string();
    if let Some(line) = failure {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&line);
    }
    out
}

/// Executes the CLI using provided arguments against real sockets.
pub fn execute(args: &[&str]) -> String {
    if args.iter().any(|arg| *arg == "--help") {
        return help().to_string();
    }
    let config = match UdpConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("nexus-udp: {err}");
            return format!("error: {err}");
        }
    };
    let registry = match Registry::with_udp_commands(&config) {
        Ok(registry) => registry,
        Err(err) => return format!("error: {err}"),
    };
    if args.iter().any(|arg| *arg == "--list") {
        return registry.names().collect::<Vec<_>>().join("\n");
    }
    let mut host = Host::new(SysNet::new(), config);
    evaluate(&mut host, &registry, args)
}

/// Parses `std::env::args` and prints the execution result.
pub fn run() {
    let owned: Vec<String> = std::env::args().skip(1).collect();
    let refs: Vec<&str> = owned.iter().map(|s| s.as_str()).collect();
    println!("{}", execute(&refs));
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_net::fake::FakeNet;

    fn fake_host() -> (Host, Registry) {
        let config = UdpConfig::default();
        let registry = Registry::with_udp_commands(&config).expect("registry");
        (Host::new(FakeNet::new(), config), registry)
    }

    #[test]
    fn help_contains_name() {
        assert!(help().contains("nexus-udp"));
        assert_eq!(execute(&["--help"]), help());
    }

    #[test]
    fn list_names_every_command() {
        let out = execute(&["--list"]);
        assert!(out.lines().any(|l| l == "/udp/recv/then"));
        assert_eq!(out.lines().count(), 9);
    }

    #[test]
    fn literals_are_pushed_and_quoted_names_stay_strings() {
        let (mut host, reg) = fake_host();
        let out = evaluate(&mut host, &reg, &["7", "hello", "'/udp/recv"]);
        assert_eq!(out, " 7\n \"hello\"\n \"/udp/recv\"");
    }

    #[test]
    fn failing_command_is_reported_inline() {
        let (mut host, reg) = fake_host();
        let out = evaluate(&mut host, &reg, &["9000", "/udp/sock/bind", "1"]);
        assert_eq!(out, " 9000\nerror: /udp/sock/bind: need 2 stack elements, have 1");
    }

    #[test]
    fn bind_on_fake_backend_pushes_descriptor() {
        let (mut host, reg) = fake_host();
        let out = evaluate(&mut host, &reg, &["127.0.0.1", "9000", "/udp/sock/bind"]);
        assert_eq!(out, " 3");
    }
}
