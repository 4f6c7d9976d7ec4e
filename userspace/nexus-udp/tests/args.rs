// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

use nexus_argstack::{Arg, ArgStack};
use nexus_udp::{extract_sock_args, ArgError, SockArgs};

fn stack_with(address: &str, port: i32) -> ArgStack {
    let mut s = ArgStack::new();
    s.push_string(address);
    s.push_int32(port);
    s
}

#[test]
fn extracts_port_and_leaves_address() {
    let mut s = stack_with("127.0.0.1", 9000);
    let got = extract_sock_args(&mut s).expect("extract");
    assert_eq!(got, SockArgs { address: "127.0.0.1".into(), port: 9000 });
    assert_eq!(s.len(), 1);
    assert_eq!(s.peek_string().as_deref(), Some("127.0.0.1"));
}

#[test]
fn out_of_range_port_is_pushed_back() {
    let mut s = stack_with("hello", 70_000);
    assert_eq!(extract_sock_args(&mut s), Err(ArgError::Range(70_000)));
    assert_eq!(s.len(), 2);
    assert_eq!(s.pop_int32(), Ok(70_000));
    assert_eq!(s.pop_string().as_deref(), Ok("hello"));
}

#[test]
fn negative_port_is_out_of_range() {
    let mut s = stack_with("hello", -1);
    assert_eq!(extract_sock_args(&mut s), Err(ArgError::Range(-1)));
}

#[test]
fn single_element_is_shape_error() {
    let mut s = ArgStack::new();
    s.push_int32(9000);
    let before = s.clone();
    assert_eq!(extract_sock_args(&mut s), Err(ArgError::Shape(1)));
    assert_eq!(s, before);
}

#[test]
fn non_integer_port_is_type_error() {
    let mut s = ArgStack::new();
    s.push_string("127.0.0.1");
    s.push_string("9000");
    let before = s.clone();
    assert!(matches!(extract_sock_args(&mut s), Err(ArgError::Type(_))));
    assert_eq!(s, before);
}

#[test]
fn non_string_address_restores_port() {
    let mut s = ArgStack::new();
    s.push_int32(1);
    s.push_int32(9000);
    assert!(matches!(extract_sock_args(&mut s), Err(ArgError::Type(_))));
    assert_eq!(s.len(), 2);
    assert_eq!(s.pop_int32(), Ok(9000));
}

#[test]
fn empty_address_is_missing() {
    let mut s = stack_with("", 53);
    assert_eq!(extract_sock_args(&mut s), Err(ArgError::MissingAddress));
    assert_eq!(s.pop_int32(), Ok(53));
}

#[test]
fn multi_argument_port_message_is_consumed() {
    let mut s = ArgStack::new();
    s.push_string("10.0.0.2");
    s.push_message("/opts", vec![Arg::Str("ttl".into()), Arg::Int32(5353)]);
    let got = extract_sock_args(&mut s).expect("extract");
    assert_eq!(got.port, 5353);
    assert_eq!(s.len(), 1);
    assert_eq!(s.peek_string().as_deref(), Some("10.0.0.2"));
}
