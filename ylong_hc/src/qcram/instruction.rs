// Copyright (c) 2023 Huawei Device Co., Ltd.
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Instruction codecs for the two QCRAM side channels.
//!
//! The control stream (encoder to decoder) reuses HPACK's wire vocabulary
//! as standalone messages: `01xxxxxx` inserts a field (6-bit-prefix name
//! index, 0 for a literal name) and `001xxxxx` changes the table capacity.
//! The decoder stream (decoder to encoder) carries `1xxxxxxx` section
//! acknowledgments and `01xxxxxx` stream cancellations, both addressed by
//! request id.
//!
//! Stream bytes arrive in arbitrary chunks, so both decoders are resumable
//! state machines: every `decode` call either yields one complete
//! instruction, or parks its state in the caller's holder until more bytes
//! arrive.

use core::cmp::Ordering;

use crate::error::HcError;
use crate::huffman::huffman_decode;
use crate::integer::{write_integer, IntegerDecoder};
use crate::strings::{write_string, HuffmanChoice};

/// A control stream instruction, encoder to decoder.
#[derive(Debug)]
pub(crate) enum ControlInstruction {
    SetCapacity { capacity: u64 },
    Insert { name: InstName, value: Vec<u8> },
}

/// Name of an insert instruction: a table index (static, or dynamic
/// relative to the newest entry at this point of the control stream) or a
/// string literal.
#[derive(Debug)]
pub(crate) enum InstName {
    Index(u64),
    Literal(Vec<u8>),
}

/// A decoder stream instruction, decoder to encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DecoderInstruction {
    Ack { request_id: u64 },
    Cancel { request_id: u64 },
}

/// Appends an insert instruction to a control stream buffer.
pub(crate) fn write_insert(
    dst: &mut Vec<u8>,
    name: &InstName,
    value: &[u8],
    huffman: HuffmanChoice,
) -> Result<(), HcError> {
    match name {
        InstName::Index(index) => write_integer(dst, *index, 0x3f, 0x40)?,
        InstName::Literal(octets) => {
            write_integer(dst, 0, 0x3f, 0x40)?;
            write_string(dst, octets, huffman)?;
        }
    }
    write_string(dst, value, huffman)
}

/// Appends a capacity change instruction to a control stream buffer.
pub(crate) fn write_set_capacity(dst: &mut Vec<u8>, capacity: u64) -> Result<(), HcError> {
    write_integer(dst, capacity, 0x1f, 0x20)
}

/// Appends a section acknowledgment to a decoder stream buffer.
pub(crate) fn write_ack(dst: &mut Vec<u8>, request_id: u64) -> Result<(), HcError> {
    write_integer(dst, request_id, 0x7f, 0x80)
}

/// Appends a stream cancellation to a decoder stream buffer.
pub(crate) fn write_cancel(dst: &mut Vec<u8>, request_id: u64) -> Result<(), HcError> {
    write_integer(dst, request_id, 0x3f, 0x40)
}

/// Decoder for control stream instructions. Every call to `decode` tries
/// to produce one instruction; when the buffer runs out mid-instruction
/// the partial state is saved in `holder` and picked up by the next call.
pub(crate) struct ControlDecoder;

impl ControlDecoder {
    pub(crate) fn decode(
        buf: &mut &[u8],
        holder: &mut Option<InstDecodeState>,
    ) -> Result<Option<ControlInstruction>, HcError> {
        // If buf is empty, leave the state unchanged.
        if buf.is_empty() {
            return Ok(None);
        }
        match holder
            .take()
            .unwrap_or_else(|| InstDecodeState::Index(Index::new()))
            .decode(buf)
        {
            DecResult::NeedMore(state) => {
                *holder = Some(state);
                Ok(None)
            }
            DecResult::Decoded(inst) => Ok(Some(inst)),
            DecResult::Error(error) => Err(error),
        }
    }
}

macro_rules! state_def {
    ($name: ident, $decoded: ty, $($state: ident),* $(,)?) => {
        pub(crate) enum $name {
            $(
                $state($state),
            )*
        }

        impl $name {
            fn decode(self, buf: &mut &[u8]) -> DecResult<$decoded, $name> {
                match self {
                    $(
                        Self::$state(state) => state.decode(buf),
                    )*
                }
            }
        }

        $(
            impl From<$state> for $name {
                fn from(s: $state) -> Self {
                    Self::$state(s)
                }
            }
        )*
    }
}

// Control instruction decoding state diagram:
//
//                    ┌ `Index` ─ `IndexInner` ┬ `InstFirstByte`
//                    │                        └ `InstTrailingBytes`
//                    │
// `InstDecodeState`  ┼ `NameString`  ┐                 ┌ `LengthFirstByte`
//                    │               ├ `LiteralString` ┼ `LengthTrailingBytes`
//                    └ `ValueString` ┘                 ├ `AsciiStringBytes`
//                                                      └ `HuffmanStringBytes`

state_def!(
    InstDecodeState,
    ControlInstruction,
    Index,
    NameString,
    ValueString,
);

state_def!(
    IndexInner,
    (InstPrefix, u64),
    InstFirstByte,
    InstTrailingBytes,
);

state_def!(
    LiteralString,
    Vec<u8>,
    LengthFirstByte,
    LengthTrailingBytes,
    AsciiStringBytes,
    HuffmanStringBytes,
);

#[derive(Clone, Copy, PartialEq, Eq)]
enum InstPrefix {
    Insert,
    SetCapacity,
}

/// `Index` decodes the leading prefixed integer of an instruction and
/// dispatches on the instruction kind.
pub(crate) struct Index {
    inner: IndexInner,
}

impl Index {
    fn new() -> Self {
        Self::from_inner(InstFirstByte.into())
    }

    fn from_inner(inner: IndexInner) -> Self {
        Self { inner }
    }

    fn decode(self, buf: &mut &[u8]) -> DecResult<ControlInstruction, InstDecodeState> {
        match self.inner.decode(buf) {
            DecResult::Decoded((InstPrefix::SetCapacity, capacity)) => {
                DecResult::Decoded(ControlInstruction::SetCapacity { capacity })
            }
            DecResult::Decoded((InstPrefix::Insert, 0)) => NameString::new().decode(buf),
            DecResult::Decoded((InstPrefix::Insert, index)) => {
                ValueString::new(InstName::Index(index)).decode(buf)
            }
            DecResult::NeedMore(inner) => DecResult::NeedMore(Index::from_inner(inner).into()),
            DecResult::Error(e) => e.into(),
        }
    }
}

/// `NameString` decodes the literal name of an insert instruction.
pub(crate) struct NameString {
    inner: LiteralString,
}

impl NameString {
    fn new() -> Self {
        Self {
            inner: LengthFirstByte.into(),
        }
    }

    fn from_inner(inner: LiteralString) -> Self {
        Self { inner }
    }

    fn decode(self, buf: &mut &[u8]) -> DecResult<ControlInstruction, InstDecodeState> {
        match self.inner.decode(buf) {
            DecResult::Decoded(octets) => {
                ValueString::new(InstName::Literal(octets)).decode(buf)
            }
            DecResult::NeedMore(inner) => DecResult::NeedMore(Self::from_inner(inner).into()),
            DecResult::Error(e) => e.into(),
        }
    }
}

/// `ValueString` decodes the value of an insert instruction.
pub(crate) struct ValueString {
    name: InstName,
    inner: LiteralString,
}

impl ValueString {
    fn new(name: InstName) -> Self {
        Self {
            name,
            inner: LengthFirstByte.into(),
        }
    }

    fn from_inner(name: InstName, inner: LiteralString) -> Self {
        Self { name, inner }
    }

    fn decode(self, buf: &mut &[u8]) -> DecResult<ControlInstruction, InstDecodeState> {
        match self.inner.decode(buf) {
            DecResult::Decoded(value) => DecResult::Decoded(ControlInstruction::Insert {
                name: self.name,
                value,
            }),
            DecResult::NeedMore(inner) => {
                DecResult::NeedMore(Self::from_inner(self.name, inner).into())
            }
            DecResult::Error(e) => e.into(),
        }
    }
}

/// `InstFirstByte` classifies the first octet of an instruction and
/// starts its prefixed integer.
pub(crate) struct InstFirstByte;

impl InstFirstByte {
    fn decode(self, buf: &mut &[u8]) -> DecResult<(InstPrefix, u64), IndexInner> {
        if buf.is_empty() {
            return DecResult::NeedMore(self.into());
        }
        let byte = buf[0];
        *buf = &buf[1..];
        let (prefix, mask) = match byte {
            x if x >= 0x80 => return HcError::UnsupportedRepresentation.into(),
            x if x >= 0x40 => (InstPrefix::Insert, 0x3f),
            x if x >= 0x20 => (InstPrefix::SetCapacity, 0x1f),
            _ => return HcError::UnsupportedRepresentation.into(),
        };
        match IntegerDecoder::first_byte(byte, mask) {
            Ok(value) => DecResult::Decoded((prefix, value)),
            Err(int) => InstTrailingBytes::new(prefix, int).decode(buf),
        }
    }
}

/// `InstTrailingBytes` finishes the prefixed integer of an instruction.
pub(crate) struct InstTrailingBytes {
    prefix: InstPrefix,
    int: IntegerDecoder,
}

impl InstTrailingBytes {
    fn new(prefix: InstPrefix, int: IntegerDecoder) -> Self {
        Self { prefix, int }
    }

    fn decode(mut self, buf: &mut &[u8]) -> DecResult<(InstPrefix, u64), IndexInner> {
        loop {
            if buf.is_empty() {
                return DecResult::NeedMore(self.into());
            }
            let byte = buf[0];
            *buf = &buf[1..];
            match self.int.next_byte(byte) {
                Ok(None) => {}
                Ok(Some(value)) => return DecResult::Decoded((self.prefix, value)),
                Err(e) => return e.into(),
            }
        }
    }
}

/// `LengthFirstByte` starts a string literal: the Huffman flag and the
/// first octet of the length.
pub(crate) struct LengthFirstByte;

impl LengthFirstByte {
    fn decode(self, buf: &mut &[u8]) -> DecResult<Vec<u8>, LiteralString> {
        if buf.is_empty() {
            return DecResult::NeedMore(self.into());
        }
        let byte = buf[0];
        *buf = &buf[1..];
        match (IntegerDecoder::first_byte(byte, 0x7f), byte & 0x80 == 0x80) {
            (Ok(len), true) => HuffmanStringBytes::new(len).decode(buf),
            (Ok(len), false) => AsciiStringBytes::new(len).decode(buf),
            (Err(int), huffman) => LengthTrailingBytes::new(huffman, int).decode(buf),
        }
    }
}

/// `LengthTrailingBytes` finishes a string literal's length.
pub(crate) struct LengthTrailingBytes {
    is_huffman: bool,
    length: IntegerDecoder,
}

impl LengthTrailingBytes {
    fn new(is_huffman: bool, length: IntegerDecoder) -> Self {
        Self { is_huffman, length }
    }

    fn decode(mut self, buf: &mut &[u8]) -> DecResult<Vec<u8>, LiteralString> {
        loop {
            if buf.is_empty() {
                return DecResult::NeedMore(self.into());
            }
            let byte = buf[0];
            *buf = &buf[1..];
            match (self.length.next_byte(byte), self.is_huffman) {
                (Ok(None), _) => {}
                (Err(e), _) => return e.into(),
                (Ok(Some(length)), true) => return HuffmanStringBytes::new(length).decode(buf),
                (Ok(Some(length)), false) => return AsciiStringBytes::new(length).decode(buf),
            }
        }
    }
}

/// `AsciiStringBytes` collects the octets of a raw string literal.
pub(crate) struct AsciiStringBytes {
    octets: Vec<u8>,
    length: usize,
}

impl AsciiStringBytes {
    fn new(length: u64) -> Self {
        Self {
            octets: Vec::new(),
            length: length as usize,
        }
    }

    fn decode(mut self, buf: &mut &[u8]) -> DecResult<Vec<u8>, LiteralString> {
        match (buf.len() + self.octets.len()).cmp(&self.length) {
            Ordering::Greater | Ordering::Equal => {
                let pos = self.length - self.octets.len();
                self.octets.extend_from_slice(&buf[..pos]);
                *buf = &buf[pos..];
                DecResult::Decoded(self.octets)
            }
            Ordering::Less => {
                self.octets.extend_from_slice(buf);
                *buf = &buf[buf.len()..];
                DecResult::NeedMore(self.into())
            }
        }
    }
}

/// `HuffmanStringBytes` collects the octets of a Huffman string literal
/// and decompresses them once complete.
pub(crate) struct HuffmanStringBytes {
    octets: Vec<u8>,
    length: usize,
}

impl HuffmanStringBytes {
    fn new(length: u64) -> Self {
        Self {
            octets: Vec::new(),
            length: length as usize,
        }
    }

    fn decode(mut self, buf: &mut &[u8]) -> DecResult<Vec<u8>, LiteralString> {
        match (buf.len() + self.octets.len()).cmp(&self.length) {
            Ordering::Greater | Ordering::Equal => {
                let pos = self.length - self.octets.len();
                self.octets.extend_from_slice(&buf[..pos]);
                *buf = &buf[pos..];
                let mut decoded = Vec::with_capacity(self.octets.len() * 2);
                match huffman_decode(&self.octets, &mut decoded) {
                    Ok(()) => DecResult::Decoded(decoded),
                    Err(e) => e.into(),
                }
            }
            Ordering::Less => {
                self.octets.extend_from_slice(buf);
                *buf = &buf[buf.len()..];
                DecResult::NeedMore(self.into())
            }
        }
    }
}

/// Decoder for the decoder stream, encoder side. Resumable like
/// `ControlDecoder`.
pub(crate) struct AckDecoder;

/// Partial state of a decoder stream instruction.
pub(crate) enum AckDecodeState {
    First,
    Trailing(AckPrefix, IntegerDecoder),
}

#[derive(Clone, Copy)]
pub(crate) enum AckPrefix {
    Ack,
    Cancel,
}

impl AckPrefix {
    fn apply(self, request_id: u64) -> DecoderInstruction {
        match self {
            Self::Ack => DecoderInstruction::Ack { request_id },
            Self::Cancel => DecoderInstruction::Cancel { request_id },
        }
    }
}

impl AckDecoder {
    pub(crate) fn decode(
        buf: &mut &[u8],
        holder: &mut Option<AckDecodeState>,
    ) -> Result<Option<DecoderInstruction>, HcError> {
        let mut state = holder.take().unwrap_or(AckDecodeState::First);
        loop {
            let (byte, rest) = match buf.split_first() {
                Some((byte, rest)) => (*byte, rest),
                None => {
                    *holder = Some(state);
                    return Ok(None);
                }
            };
            *buf = rest;
            state = match state {
                AckDecodeState::First => {
                    let (prefix, mask) = match byte {
                        x if x >= 0x80 => (AckPrefix::Ack, 0x7f),
                        x if x >= 0x40 => (AckPrefix::Cancel, 0x3f),
                        _ => return Err(HcError::UnsupportedRepresentation),
                    };
                    match IntegerDecoder::first_byte(byte, mask) {
                        Ok(id) => return Ok(Some(prefix.apply(id))),
                        Err(int) => AckDecodeState::Trailing(prefix, int),
                    }
                }
                AckDecodeState::Trailing(prefix, mut int) => match int.next_byte(byte)? {
                    Some(id) => return Ok(Some(prefix.apply(id))),
                    None => AckDecodeState::Trailing(prefix, int),
                },
            };
        }
    }
}

/// Decoder's possible returns during the decoding process.
enum DecResult<D, S> {
    /// Decoder has got a `D`. Users can continue to call `decode` to try
    /// to get the next `D`.
    Decoded(D),

    /// Decoder needs more bytes to get a `D`. Returns the current
    /// decoding state `S`.
    NeedMore(S),

    /// Errors that may occur when decoding.
    Error(HcError),
}

impl<D, S> From<HcError> for DecResult<D, S> {
    fn from(e: HcError) -> Self {
        DecResult::Error(e)
    }
}
