// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! `/udp/recv/then`: receive one datagram and hand it to a callback command.

use std::sync::{Arc, Mutex};

use nexus_argstack::{Arg, Element, Message};
use nexus_net::fake::{loopback, FakeNet};
use nexus_net::{NetError, UdpBackend};
use nexus_udp::registry::CMD_RECV_THEN;
use nexus_udp::{CommandError, Host, Registry, UdpConfig};

type Seen = Arc<Mutex<Vec<(Vec<u8>, Option<Element>)>>>;

const CALLBACK: &str = "/app/on_datagram";

fn rig(config: UdpConfig) -> (Host, Registry, FakeNet, Seen) {
    let mut reg = Registry::with_udp_commands(&config).expect("registry");
    let seen: Seen = Arc::default();
    let log = Arc::clone(&seen);
    let path = config.sender_addr_path.clone();
    reg.register_native(CALLBACK, move |h: &mut Host| {
        let datagram = h.stack_mut().pop_frame()?;
        let sender = h.var_element(&path);
        log.lock().expect("lock").push((datagram, sender));
        Ok(())
    });
    let net = FakeNet::new();
    (Host::new(net.clone(), config), reg, net, seen)
}

fn value(s: &str) -> Vec<u8> {
    Message::value(Arg::Str(s.into())).encode()
}

fn sender(path: &str) -> Option<Element> {
    Some(Element::Message(Message::new(path, vec![Arg::Str("127.0.0.1".into())])))
}

#[test]
fn callback_runs_once_per_datagram() {
    let (mut host, reg, mut net, seen) = rig(UdpConfig::default());
    let rx = net.socket().expect("rx");
    net.bind(rx, loopback(9000)).expect("bind");
    let tx = net.socket().expect("tx");
    net.send_to(tx, &value("one"), loopback(9000)).expect("send one");
    net.send_to(tx, &value("two"), loopback(9000)).expect("send two");

    for expected in ["one", "two"] {
        host.stack_mut().push_string(CALLBACK);
        host.stack_mut().push_int32(rx);
        host.call(&reg, CMD_RECV_THEN).expect("recv/then");
        assert!(host.stack().is_empty());
        assert_eq!(host.scope_depth(), 1);
        assert!(host.lookup_var("/udp/sender/addr").is_none());
        let seen = seen.lock().expect("lock");
        let (datagram, from) = seen.last().expect("callback ran");
        assert_eq!(datagram, &value(expected));
        assert_eq!(from, &sender("/udp/sender/addr"));
    }
    assert_eq!(seen.lock().expect("lock").len(), 2);
}

#[test]
fn sender_binding_follows_configured_path() {
    let config = UdpConfig { sender_addr_path: "/net/peer".into(), ..UdpConfig::default() };
    let (mut host, reg, mut net, seen) = rig(config);
    let rx = net.socket().expect("rx");
    net.bind(rx, loopback(9100)).expect("bind");
    let tx = net.socket().expect("tx");
    net.send_to(tx, b"raw", loopback(9100)).expect("send");

    host.stack_mut().push_string(CALLBACK);
    host.stack_mut().push_int32(rx);
    host.call(&reg, CMD_RECV_THEN).expect("recv/then");
    let seen = seen.lock().expect("lock");
    assert_eq!(seen.as_slice(), &[(b"raw".to_vec(), sender("/net/peer"))]);
}

#[test]
fn failed_receive_skips_callback_and_closes_scope() {
    let (mut host, reg, mut net, seen) = rig(UdpConfig::default());
    let rx = net.socket().expect("rx");
    host.stack_mut().push_string(CALLBACK);
    host.stack_mut().push_int32(rx);
    let err = host.call(&reg, CMD_RECV_THEN).expect_err("empty queue");
    assert_eq!(err, CommandError::System { op: "recv", fd: rx, source: NetError::WouldBlock });
    assert_eq!(host.scope_depth(), 1);
    assert!(seen.lock().expect("lock").is_empty());
    assert_eq!(host.stack_mut().pop_string().as_deref(), Ok(CALLBACK));
}

#[test]
fn unknown_callback_is_reported() {
    let (mut host, reg, mut net, _seen) = rig(UdpConfig::default());
    let rx = net.socket().expect("rx");
    net.bind(rx, loopback(9200)).expect("bind");
    let tx = net.socket().expect("tx");
    net.send_to(tx, b"x", loopback(9200)).expect("send");

    host.stack_mut().push_string("/app/missing");
    host.stack_mut().push_int32(rx);
    let err = host.call(&reg, CMD_RECV_THEN).expect_err("unknown");
    assert_eq!(err, CommandError::UnknownCommand("/app/missing".into()));
    assert_eq!(host.scope_depth(), 1);
    assert_eq!(host.stack().len(), 1);
}
