// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

//! CONTEXT: Element codec (OSC 1.0 layout: 4-byte aligned, big-endian)
//!
//! OWNERS: @runtime
//!
//! STATUS: Experimental
//!
//! API_STABILITY: Unstable
//!
//! TEST_COVERAGE: Tests in `userspace/nexus-argstack/tests/codec.rs`
//!   - Encode: message/bundle layout, padding of strings and blobs
//!   - Decode: reject truncated/unterminated/unknown-tag inputs
//!   - Decode: bound bundle nesting at MAX_BUNDLE_DEPTH
//!   - Property tests for panic-freedom on arbitrary input

use core::fmt;

/// Leading identifier of a bundle element.
pub const BUNDLE_ID: &[u8; 8] = b"#bundle\0";

/// Timetag meaning "immediately".
pub const TIMETAG_IMMEDIATE: u64 = 1;

/// Deepest bundle nesting accepted by [`Element::decode`].
pub const MAX_BUNDLE_DEPTH: usize = 64;

/// Argument type tags understood by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Int32,
    Float,
    Str,
    Blob,
}

impl TypeTag {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'i' => Some(TypeTag::Int32),
            b'f' => Some(TypeTag::Float),
            b's' => Some(TypeTag::Str),
            b'b' => Some(TypeTag::Blob),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            TypeTag::Int32 => b'i',
            TypeTag::Float => b'f',
            TypeTag::Str => b's',
            TypeTag::Blob => b'b',
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_byte() as char)
    }
}

/// A typed message argument.
#[derive(Clone, Debug, PartialEq)]
pub enum Arg {
    Int32(i32),
    Float(f32),
    Str(String),
    Blob(Vec<u8>),
}

impl Arg {
    pub fn tag(&self) -> TypeTag {
        match self {
            Arg::Int32(_) => TypeTag::Int32,
            Arg::Float(_) => TypeTag::Float,
            Arg::Str(_) => TypeTag::Str,
            Arg::Blob(_) => TypeTag::Blob,
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Int32(v) => write!(f, "{v}"),
            Arg::Float(v) => write!(f, "{v}"),
            Arg::Str(s) => write!(f, "{s:?}"),
            Arg::Blob(b) => write!(f, "<blob:{}>", b.len()),
        }
    }
}

/// Address plus typed arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub address: String,
    pub args: Vec<Arg>,
}

impl Message {
    pub fn new(address: impl Into<String>, args: Vec<Arg>) -> Self {
        Self { address: address.into(), args }
    }

    /// Anonymous single-argument message, the shape the host uses for plain values.
    pub fn value(arg: Arg) -> Self {
        Self::new("", vec![arg])
    }

    pub fn last_tag(&self) -> Option<TypeTag> {
        self.args.last().map(Arg::tag)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_str(&mut out, self.address.as_bytes());
        let mut tags = Vec::with_capacity(self.args.len() + 1);
        tags.push(b',');
        tags.extend(self.args.iter().map(|a| a.tag().as_byte()));
        write_str(&mut out, &tags);
        for arg in &self.args {
            match arg {
                Arg::Int32(v) => out.extend_from_slice(&v.to_be_bytes()),
                Arg::Float(v) => out.extend_from_slice(&v.to_bits().to_be_bytes()),
                Arg::Str(s) => write_str(&mut out, s.as_bytes()),
                Arg::Blob(b) => write_blob(&mut out, b),
            }
        }
        out
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// A decoded stack element.
#[derive(Clone, Debug, PartialEq)]
pub enum Element {
    Message(Message),
    Bundle { timetag: u64, elems: Vec<Element> },
}

impl Element {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Element::Message(m) => m.encode(),
            Element::Bundle { timetag, elems } => {
                let mut out = Vec::new();
                out.extend_from_slice(BUNDLE_ID);
                out.extend_from_slice(&timetag.to_be_bytes());
                for e in elems {
                    let bytes = e.encode();
                    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
                    out.extend_from_slice(&bytes);
                }
                out
            }
        }
    }

    /// Decodes one element. Bundles nested deeper than [`MAX_BUNDLE_DEPTH`] are rejected.
    pub fn decode(bytes: &[u8]) -> Result<Element, CodecError> {
        decode_element(bytes, 0)
    }

    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Element::Message(m) => Some(m),
            Element::Bundle { .. } => None,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Message(m) => write!(f, "{m}"),
            Element::Bundle { elems, .. } => {
                f.write_str("[")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{e}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Decode errors for element frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[must_use = "decode errors must be handled"]
pub enum CodecError {
    #[error("element truncated")]
    Truncated,
    #[error("string not terminated")]
    Unterminated,
    #[error("string is not utf-8")]
    BadUtf8,
    #[error("missing type tag string")]
    MissingTypeTags,
    #[error("unknown type tag {0:#04x}")]
    UnknownTypeTag(u8),
    #[error("{0} trailing bytes after arguments")]
    TrailingBytes(usize),
    #[error("bundles nested deeper than {}", MAX_BUNDLE_DEPTH)]
    TooDeep,
}

/// Rounds `n` up to the next multiple of four.
pub fn pad4(n: usize) -> usize {
    (n + 3) & !3
}

fn write_str(out: &mut Vec<u8>, s: &[u8]) {
    // Always at least one NUL.
    let padded = pad4(s.len() + 1);
    out.extend_from_slice(s);
    out.resize(out.len() + (padded - s.len()), 0);
}

fn write_blob(out: &mut Vec<u8>, b: &[u8]) {
    out.extend_from_slice(&(b.len() as u32).to_be_bytes());
    out.extend_from_slice(b);
    out.resize(out.len() + (pad4(b.len()) - b.len()), 0);
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::Truncated);
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn u32(&mut self) -> Result<u32, CodecError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64, CodecError> {
        let hi = self.u32()? as u64;
        let lo = self.u32()? as u64;
        Ok((hi << 32) | lo)
    }

    fn raw_str(&mut self) -> Result<&'a [u8], CodecError> {
        let rest = &self.buf[self.pos..];
        let nul = rest.iter().position(|&b| b == 0).ok_or(CodecError::Unterminated)?;
        let s = &rest[..nul];
        self.take(pad4(nul + 1))?;
        Ok(s)
    }

    fn string(&mut self) -> Result<String, CodecError> {
        let raw = self.raw_str()?;
        core::str::from_utf8(raw).map(str::to_owned).map_err(|_| CodecError::BadUtf8)
    }

    fn blob(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.u32()? as usize;
        if len > self.remaining() {
            return Err(CodecError::Truncated);
        }
        let data = self.take(len)?.to_vec();
        self.take(pad4(len) - len)?;
        Ok(data)
    }
}

fn decode_message(bytes: &[u8]) -> Result<Message, CodecError> {
    let mut r = Reader { buf: bytes, pos: 0 };
    let address = r.string()?;
    if r.remaining() == 0 {
        return Err(CodecError::MissingTypeTags);
    }
    let tags = r.raw_str()?;
    let Some((&b',', tags)) = tags.split_first() else {
        return Err(CodecError::MissingTypeTags);
    };
    let mut args = Vec::with_capacity(tags.len());
    for &t in tags {
        let tag = TypeTag::from_byte(t).ok_or(CodecError::UnknownTypeTag(t))?;
        args.push(match tag {
            TypeTag::Int32 => Arg::Int32(r.u32()? as i32),
            TypeTag::Float => Arg::Float(f32::from_bits(r.u32()?)),
            TypeTag::Str => Arg::Str(r.string()?),
            TypeTag::Blob => Arg::Blob(r.blob()?),
        });
    }
    if r.remaining() != 0 {
        return Err(CodecError::TrailingBytes(r.remaining()));
    }
    Ok(Message { address, args })
}

fn decode_element(bytes: &[u8], depth: usize) -> Result<Element, CodecError> {
    if bytes.starts_with(BUNDLE_ID) {
        decode_bundle(bytes, depth + 1)
    } else {
        decode_message(bytes).map(Element::Message)
    }
}

// `depth` counts this bundle; the outermost bundle is depth 1.
fn decode_bundle(bytes: &[u8], depth: usize) -> Result<Element, CodecError> {
    if depth > MAX_BUNDLE_DEPTH {
        return Err(CodecError::TooDeep);
    }
    let mut r = Reader { buf: bytes, pos: BUNDLE_ID.len() };
    let timetag = r.u64()?;
    let mut elems = Vec::new();
    while r.remaining() > 0 {
        let len = r.u32()? as usize;
        elems.push(decode_element(r.take(len)?, depth)?);
    }
    Ok(Element::Bundle { timetag, elems })
}
