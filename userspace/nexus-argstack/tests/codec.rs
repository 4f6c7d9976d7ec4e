// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Host tests for the element codec (layout, rejection, panic-freedom)
//! OWNERS: @runtime
//! STATUS: Experimental
//! API_STABILITY: Unstable
//! TEST_COVERAGE: 10 tests

use nexus_argstack::codec::{pad4, BUNDLE_ID, MAX_BUNDLE_DEPTH, TIMETAG_IMMEDIATE};
use nexus_argstack::{Arg, ArgStack, CodecError, ElemType, Element, Message};
use proptest::prelude::*;

#[test]
fn message_layout_is_four_byte_aligned() {
    let bytes = Message::new("/a", vec![Arg::Int32(1)]).encode();
    assert_eq!(bytes, b"/a\0\0,i\0\0\0\0\0\x01".to_vec());
}

#[test]
fn anonymous_string_value_has_empty_padded_address() {
    let bytes = Message::value(Arg::Str("hi".into())).encode();
    assert_eq!(bytes, b"\0\0\0\0,s\0\0hi\0\0".to_vec());
}

#[test]
fn blob_is_size_prefixed_and_padded() {
    let bytes = Message::value(Arg::Blob(vec![1, 2, 3, 4, 5])).encode();
    assert_eq!(bytes.len(), 4 + 4 + 4 + 8);
    assert_eq!(&bytes[8..12], &5u32.to_be_bytes());
    assert_eq!(&bytes[12..17], &[1, 2, 3, 4, 5]);
    assert_eq!(&bytes[17..], &[0, 0, 0]);
    assert_eq!(pad4(5), 8);
    assert_eq!(pad4(8), 8);
}

#[test]
fn bundle_decodes_nested_messages() {
    let inner = Element::Message(Message::new("/x", vec![Arg::Float(1.5), Arg::Str("s".into())]));
    let bundle = Element::Bundle { timetag: TIMETAG_IMMEDIATE, elems: vec![inner.clone()] };
    let decoded = Element::decode(&bundle.encode()).expect("decode");
    assert_eq!(decoded, bundle);
    assert_eq!(decoded.to_string(), "[/x 1.5 \"s\"]");
}

#[test]
fn decode_rejects_unknown_type_tag() {
    assert_eq!(Element::decode(b"/a\0\0,q\0\0"), Err(CodecError::UnknownTypeTag(b'q')));
}

#[test]
fn decode_rejects_truncated_and_unterminated_input() {
    assert_eq!(Element::decode(b"/a\0\0,i\0\0\0\0"), Err(CodecError::Truncated));
    assert_eq!(Element::decode(b"/abc"), Err(CodecError::Unterminated));
    assert_eq!(Element::decode(b"/ab\0"), Err(CodecError::MissingTypeTags));
}

#[test]
fn decode_rejects_trailing_bytes() {
    let mut bytes = Message::new("/a", vec![]).encode();
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    assert_eq!(Element::decode(&bytes), Err(CodecError::TrailingBytes(4)));
}

// `levels` bundles, each holding the next, around one empty message.
fn nested_bundles(levels: usize) -> Vec<u8> {
    let mut bytes = Message::new("/a", vec![]).encode();
    for _ in 0..levels {
        let mut outer = BUNDLE_ID.to_vec();
        outer.extend_from_slice(&TIMETAG_IMMEDIATE.to_be_bytes());
        outer.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        outer.extend_from_slice(&bytes);
        bytes = outer;
    }
    bytes
}

#[test]
fn bundle_nesting_is_bounded() {
    assert!(Element::decode(&nested_bundles(MAX_BUNDLE_DEPTH)).is_ok());
    assert_eq!(
        Element::decode(&nested_bundles(MAX_BUNDLE_DEPTH + 1)),
        Err(CodecError::TooDeep)
    );
}

#[test]
fn deeply_nested_datagram_stays_opaque_on_stack() {
    let bytes = nested_bundles(3_270);
    assert!(bytes.len() <= 65_536);
    let mut s = ArgStack::new();
    s.push_blob(&bytes);
    s.blob_to_elem().expect("blob to elem");
    assert_eq!(s.peek_type(), Some(ElemType::Opaque));
    assert_eq!(s.top(), Err(CodecError::TooDeep.into()));
    assert_eq!(s.to_string(), format!("<opaque:{}>", bytes.len()));
}

proptest! {
    #[test]
    fn decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = Element::decode(&bytes);
    }
}
