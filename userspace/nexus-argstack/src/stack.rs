// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

//! CONTEXT: Argument stack backed by one contiguous buffer of size-prefixed frames
//!
//! OWNERS: @runtime
//!
//! STATUS: Experimental
//!
//! API_STABILITY: Unstable
//!
//! TEST_COVERAGE: Tests in `userspace/nexus-argstack/tests/stack_ops.rs`

use core::fmt;

use crate::codec::{Arg, Element, Message, TypeTag};
use crate::StackError;

/// Bytes of the big-endian size header in front of every frame.
pub const SIZE_HEADER: usize = 4;

/// Coarse element kind, as reported by [`ArgStack::peek_type`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElemType {
    Message,
    Bundle,
    /// Frame bytes that do not decode as a message or bundle.
    Opaque,
}

/// Bounds-checked view of one raw frame inside the stack buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ElemView<'a> {
    /// Offset of the size header within the stack buffer.
    pub offset: usize,
    /// Length read from the size header; always equals `payload.len()`.
    pub declared_len: usize,
    pub payload: &'a [u8],
}

/// The shared argument stack.
///
/// Layout: `[size:u32be][bytes]` repeated, top of stack last. `offsets` caches the start of
/// each frame so the top is found without a walk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArgStack {
    buf: Vec<u8>,
    offsets: Vec<usize>,
}

impl ArgStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopts raw storage without validating it. Frame boundaries are walked from the
    /// start; a final frame whose header runs past the end is kept so that reads of it
    /// fail with [`StackError::Overrun`].
    pub fn from_raw(buf: Vec<u8>) -> Self {
        let mut offsets = Vec::new();
        let mut pos = 0usize;
        while pos < buf.len() {
            offsets.push(pos);
            if buf.len() - pos < SIZE_HEADER {
                break;
            }
            let size =
                u32::from_be_bytes([buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]]) as usize;
            pos = pos.saturating_add(SIZE_HEADER).saturating_add(size);
        }
        Self { buf, offsets }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    fn view_at(&self, offset: usize) -> Result<ElemView<'_>, StackError> {
        let available = self.buf.len().saturating_sub(offset);
        if available < SIZE_HEADER {
            return Err(StackError::Overrun { offset, declared: SIZE_HEADER, available });
        }
        let h = &self.buf[offset..offset + SIZE_HEADER];
        let declared = u32::from_be_bytes([h[0], h[1], h[2], h[3]]) as usize;
        let start = offset + SIZE_HEADER;
        if declared > self.buf.len() - start {
            return Err(StackError::Overrun {
                offset,
                declared,
                available: self.buf.len() - start,
            });
        }
        Ok(ElemView { offset, declared_len: declared, payload: &self.buf[start..start + declared] })
    }

    /// Raw view of the top frame; the length comes from the frame's own header and is
    /// checked against the end of the buffer.
    pub fn top_view(&self) -> Result<ElemView<'_>, StackError> {
        let offset = *self.offsets.last().ok_or(StackError::Empty)?;
        self.view_at(offset)
    }

    /// Raw views of every frame, bottom first.
    pub fn frames(&self) -> impl Iterator<Item = Result<ElemView<'_>, StackError>> + '_ {
        self.offsets.iter().map(move |&o| self.view_at(o))
    }

    pub fn top(&self) -> Result<Element, StackError> {
        Ok(Element::decode(self.top_view()?.payload)?)
    }

    fn top_message(&self) -> Result<Message, StackError> {
        match self.top()? {
            Element::Message(m) => Ok(m),
            Element::Bundle { .. } => Err(StackError::NotMessage),
        }
    }

    pub fn peek_type(&self) -> Option<ElemType> {
        let view = self.top_view().ok()?;
        Some(match Element::decode(view.payload) {
            Ok(Element::Message(_)) => ElemType::Message,
            Ok(Element::Bundle { .. }) => ElemType::Bundle,
            Err(_) => ElemType::Opaque,
        })
    }

    /// Type of the last argument of the top message.
    pub fn peek_message_arg_type(&self) -> Option<TypeTag> {
        self.top_message().ok()?.last_tag()
    }

    /// Last string argument of the top message, without consuming it.
    pub fn peek_string(&self) -> Option<String> {
        match self.top_message().ok()?.args.pop()? {
            Arg::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn push_frame(&mut self, bytes: &[u8]) {
        self.offsets.push(self.buf.len());
        self.buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        self.buf.extend_from_slice(bytes);
    }

    pub fn pop_frame(&mut self) -> Result<Vec<u8>, StackError> {
        let view = self.top_view()?;
        let (offset, bytes) = (view.offset, view.payload.to_vec());
        self.buf.truncate(offset);
        self.offsets.pop();
        Ok(bytes)
    }

    pub fn push_element(&mut self, elem: &Element) {
        self.push_frame(&elem.encode());
    }

    pub fn push_message(&mut self, address: &str, args: Vec<Arg>) {
        self.push_frame(&Message::new(address, args).encode());
    }

    pub fn push_int32(&mut self, v: i32) {
        self.push_frame(&Message::value(Arg::Int32(v)).encode());
    }

    pub fn push_string(&mut self, s: &str) {
        self.push_frame(&Message::value(Arg::Str(s.to_owned())).encode());
    }

    pub fn push_blob(&mut self, bytes: &[u8]) {
        self.push_frame(&Message::value(Arg::Blob(bytes.to_vec())).encode());
    }

    /// Removes the last argument of the top message. A message left without arguments is
    /// removed from the stack.
    pub fn pop_arg(&mut self) -> Result<Arg, StackError> {
        let mut msg = self.top_message()?;
        let arg = msg.args.pop().ok_or(StackError::NoArgs)?;
        self.pop_frame()?;
        if !msg.args.is_empty() {
            self.push_frame(&msg.encode());
        }
        Ok(arg)
    }

    fn expect_tag(&self, expected: TypeTag) -> Result<(), StackError> {
        let msg = self.top_message()?;
        match msg.last_tag() {
            Some(t) if t == expected => Ok(()),
            found => Err(StackError::ArgType { expected, found }),
        }
    }

    pub fn pop_int32(&mut self) -> Result<i32, StackError> {
        self.expect_tag(TypeTag::Int32)?;
        match self.pop_arg()? {
            Arg::Int32(v) => Ok(v),
            _ => Err(StackError::ArgType { expected: TypeTag::Int32, found: None }),
        }
    }

    pub fn pop_string(&mut self) -> Result<String, StackError> {
        self.expect_tag(TypeTag::Str)?;
        match self.pop_arg()? {
            Arg::Str(s) => Ok(s),
            _ => Err(StackError::ArgType { expected: TypeTag::Str, found: None }),
        }
    }

    pub fn pop_blob(&mut self) -> Result<Vec<u8>, StackError> {
        self.expect_tag(TypeTag::Blob)?;
        match self.pop_arg()? {
            Arg::Blob(b) => Ok(b),
            _ => Err(StackError::ArgType { expected: TypeTag::Blob, found: None }),
        }
    }

    /// Replaces a blob argument on top with a frame holding the blob's bytes, so an encoded
    /// element carried as a blob becomes a native element. Bytes that do not decode are
    /// kept as an opaque frame.
    pub fn blob_to_elem(&mut self) -> Result<(), StackError> {
        let bytes = self.pop_blob()?;
        self.push_frame(&bytes);
        Ok(())
    }

    pub fn drop_top(&mut self) -> Result<(), StackError> {
        self.pop_frame().map(|_| ())
    }

    pub fn swap(&mut self) -> Result<(), StackError> {
        if self.len() < 2 {
            return Err(StackError::Underflow { needed: 2, available: self.len() });
        }
        let a = self.pop_frame()?;
        let b = self.pop_frame()?;
        self.push_frame(&a);
        self.push_frame(&b);
        Ok(())
    }

    /// Decoded elements, bottom first. Opaque frames are returned as errors.
    pub fn elements(&self) -> Vec<Result<Element, StackError>> {
        self.frames()
            .map(|v| v.and_then(|v| Element::decode(v.payload).map_err(StackError::from)))
            .collect()
    }
}

impl fmt::Display for ArgStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, view) in self.frames().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            match view {
                Ok(v) if v.payload.is_empty() => f.write_str("<empty>")?,
                Ok(v) => match Element::decode(v.payload) {
                    Ok(e) => write!(f, "{e}")?,
                    Err(_) => write!(f, "<opaque:{}>", v.declared_len)?,
                },
                Err(e) => write!(f, "<{e}>")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_rebuilds_frame_offsets() {
        let mut s = ArgStack::new();
        s.push_int32(7);
        s.push_string("a");
        let copy = ArgStack::from_raw(s.as_bytes().to_vec());
        assert_eq!(copy, s);
    }

    #[test]
    fn empty_frame_is_opaque() {
        let mut s = ArgStack::new();
        s.push_frame(&[]);
        assert_eq!(s.peek_type(), Some(ElemType::Opaque));
        assert_eq!(s.top_view().expect("view").declared_len, 0);
        assert_eq!(s.to_string(), "<empty>");
    }
}
