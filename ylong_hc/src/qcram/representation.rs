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

//! Header block representations of QCRAM.
//!
//! A block is pure reference plus literal: insertions never appear here,
//! they travel on the control stream. Dynamic references are encoded
//! relative to the block's largest reference `L`: the entry with absolute
//! insertion number `a` appears on the wire as `62 + (L - a)`, and indices
//! 1 to 61 address the static table as in HPACK.
//!
//! # Binary Format
//! ```text
//!   0   1   2   3   4   5   6   7
//! +---+---+---+---+---+---+---+---+
//! | 1 |        Index (7+)         |  Indexed
//! +---+---+-----------------------+
//! | 0 | 1 |      Index (6+)       |  Indexed name, literal value
//! +---+---+---+---+---------------+
//! | 0 | 0 | 1 | H | Name len (4+) |  Literal name and value
//! +---+---+---+---+---------------+
//! | 0 | 0 | 0 | 1 |  Index (4+)   |  Literal never indexed (sensitive)
//! +---+---+---+---+---------------+
//! ```
//! The never-indexed form follows HPACK: a 4-bit-prefix name index where 0
//! means a literal name string follows. The value string always comes
//! last. `0000xxxx` is reserved and rejected.

use crate::error::HcError;
use crate::huffman::{huffman_decode, huffman_encode};
use crate::integer::{read_integer, write_integer};
use crate::strings::{read_string, write_string, HuffmanChoice};

/// One decoded representation of a QCRAM header block. Indices are the
/// raw wire values; the decoder resolves dynamic ones against the block's
/// largest reference.
pub(crate) enum Representation {
    Indexed { index: usize },
    IndexedName { index: usize, value: Vec<u8> },
    Literal { name: Vec<u8>, value: Vec<u8> },
    NeverIndexed { name: Name, value: Vec<u8> },
}

/// Name of a never-indexed representation.
pub(crate) enum Name {
    Index(usize),
    Literal(Vec<u8>),
}

/// Reads one complete representation from the front of `buf`.
pub(crate) fn read_representation(buf: &mut &[u8]) -> Result<Representation, HcError> {
    let first = *buf.first().ok_or(HcError::InvalidFrame)?;
    match first {
        x if x >= 0x80 => {
            let index = read_index(buf, 0x7f)?;
            Ok(Representation::Indexed { index })
        }
        x if x >= 0x40 => {
            let index = read_index(buf, 0x3f)?;
            let value = read_string(buf)?;
            Ok(Representation::IndexedName { index, value })
        }
        x if x >= 0x20 => {
            let huffman = first & 0x10 == 0x10;
            let length = read_integer(buf, 0x0f)?;
            if (buf.len() as u64) < length {
                return Err(HcError::InvalidFrame);
            }
            let (octets, rest) = buf.split_at(length as usize);
            let name = if huffman {
                let mut name = Vec::with_capacity(octets.len() * 2);
                huffman_decode(octets, &mut name)?;
                name
            } else {
                octets.to_vec()
            };
            *buf = rest;
            let value = read_string(buf)?;
            Ok(Representation::Literal { name, value })
        }
        x if x >= 0x10 => {
            let index = read_integer(buf, 0x0f)?;
            let index = usize::try_from(index).map_err(|_| HcError::TableIndexOutOfRange)?;
            let name = match index {
                0 => Name::Literal(read_string(buf)?),
                n => Name::Index(n),
            };
            let value = read_string(buf)?;
            Ok(Representation::NeverIndexed { name, value })
        }
        _ => Err(HcError::UnsupportedRepresentation),
    }
}

fn read_index(buf: &mut &[u8], mask: u8) -> Result<usize, HcError> {
    let index = read_integer(buf, mask)?;
    let index = usize::try_from(index).map_err(|_| HcError::TableIndexOutOfRange)?;
    // Index 0 is not used: dynamic references start at 62 and static ones
    // at 1, and literal names have their own representation.
    if index == 0 {
        return Err(HcError::InvalidFrame);
    }
    Ok(index)
}

/// Appends an indexed representation.
pub(crate) fn write_indexed(dst: &mut Vec<u8>, index: usize) -> Result<(), HcError> {
    write_integer(dst, index as u64, 0x7f, 0x80)
}

/// Appends an indexed-name representation with a literal value.
pub(crate) fn write_indexed_name(
    dst: &mut Vec<u8>,
    index: usize,
    value: &[u8],
    huffman: HuffmanChoice,
) -> Result<(), HcError> {
    write_integer(dst, index as u64, 0x3f, 0x40)?;
    write_string(dst, value, huffman)
}

/// Appends a fully literal representation.
pub(crate) fn write_literal(
    dst: &mut Vec<u8>,
    name: &[u8],
    value: &[u8],
    huffman: HuffmanChoice,
) -> Result<(), HcError> {
    if huffman != HuffmanChoice::Never {
        let mut compressed = Vec::with_capacity(name.len());
        huffman_encode(name, &mut compressed);
        if huffman == HuffmanChoice::Always || compressed.len() < name.len() {
            write_integer(dst, compressed.len() as u64, 0x0f, 0x30)?;
            dst.extend_from_slice(&compressed);
            return write_string(dst, value, huffman);
        }
    }
    write_integer(dst, name.len() as u64, 0x0f, 0x20)?;
    dst.extend_from_slice(name);
    write_string(dst, value, huffman)
}

/// Appends a never-indexed representation for a sensitive field.
pub(crate) fn write_never_indexed(
    dst: &mut Vec<u8>,
    name: &Name,
    value: &[u8],
    huffman: HuffmanChoice,
) -> Result<(), HcError> {
    match name {
        Name::Index(index) => write_integer(dst, *index as u64, 0x0f, 0x10)?,
        Name::Literal(octets) => {
            write_integer(dst, 0, 0x0f, 0x10)?;
            write_string(dst, octets, huffman)?;
        }
    }
    write_string(dst, value, huffman)
}

#[cfg(test)]
mod ut_qcram_representation {
    use super::*;
    use crate::util::test_util::decode;

    /// UT test cases for `read_representation`.
    ///
    /// # Brief
    /// 1. Reads each representation kind from its wire form.
    /// 2. Checks fields, cursor advance and the reserved pattern.
    #[test]
    fn ut_qcram_read_representation() {
        // Indexed, static index 2.
        let bytes = [0x82];
        let mut slice = &bytes[..];
        match read_representation(&mut slice) {
            Ok(Representation::Indexed { index: 2 }) => {}
            _ => panic!("read_representation() failed!"),
        }

        // Indexed name with a literal value.
        let bytes = decode("58086e6f2d6361636865").unwrap();
        let mut slice = bytes.as_slice();
        match read_representation(&mut slice) {
            Ok(Representation::IndexedName { index: 24, value }) => {
                assert_eq!(value, b"no-cache");
            }
            _ => panic!("read_representation() failed!"),
        }

        // Fully literal, raw name.
        let bytes = decode("2a637573746f6d2d6b65790d637573746f6d2d686561646572").unwrap();
        let mut slice = bytes.as_slice();
        match read_representation(&mut slice) {
            Ok(Representation::Literal { name, value }) => {
                assert_eq!(name, b"custom-key");
                assert_eq!(value, b"custom-header");
            }
            _ => panic!("read_representation() failed!"),
        }

        // Never indexed, literal name.
        let bytes = decode("100870617373776f726406736563726574").unwrap();
        let mut slice = bytes.as_slice();
        match read_representation(&mut slice) {
            Ok(Representation::NeverIndexed {
                name: Name::Literal(name),
                value,
            }) => {
                assert_eq!(name, b"password");
                assert_eq!(value, b"secret");
            }
            _ => panic!("read_representation() failed!"),
        }

        // The 0000 pattern is reserved.
        let bytes = [0x04];
        let mut slice = &bytes[..];
        assert!(matches!(
            read_representation(&mut slice),
            Err(HcError::UnsupportedRepresentation)
        ));

        // Index 0 is invalid in the indexed forms.
        let bytes = [0x80];
        let mut slice = &bytes[..];
        assert!(matches!(
            read_representation(&mut slice),
            Err(HcError::InvalidFrame)
        ));
    }

    /// UT test cases for the representation writers.
    ///
    /// # Brief
    /// 1. Writes each representation kind and reads it back.
    /// 2. Checks the wire octets where fixed.
    #[test]
    fn ut_qcram_write_representation() {
        let mut dst = Vec::new();
        write_indexed(&mut dst, 62).unwrap();
        assert_eq!(dst, [0xbe]);

        let mut dst = Vec::new();
        write_indexed_name(&mut dst, 24, b"no-cache", HuffmanChoice::Never).unwrap();
        assert_eq!(dst, decode("58086e6f2d6361636865").unwrap());

        let mut dst = Vec::new();
        write_literal(&mut dst, b"custom-key", b"custom-header", HuffmanChoice::Never).unwrap();
        assert_eq!(
            dst,
            decode("2a637573746f6d2d6b65790d637573746f6d2d686561646572").unwrap()
        );

        // The Huffman flag of a literal name sits in the first octet.
        let mut dst = Vec::new();
        write_literal(&mut dst, b"custom-key", b"x", HuffmanChoice::Always).unwrap();
        let mut slice = dst.as_slice();
        match read_representation(&mut slice) {
            Ok(Representation::Literal { name, value }) => {
                assert_eq!(name, b"custom-key");
                assert_eq!(value, b"x");
            }
            _ => panic!("read_representation() failed!"),
        }
        assert_eq!(dst[0] & 0xf0, 0x30);

        let mut dst = Vec::new();
        write_never_indexed(
            &mut dst,
            &Name::Literal(b"password".to_vec()),
            b"secret",
            HuffmanChoice::Never,
        )
        .unwrap();
        assert_eq!(dst, decode("100870617373776f726406736563726574").unwrap());

        let mut dst = Vec::new();
        write_never_indexed(&mut dst, &Name::Index(23), b"s3cr3t", HuffmanChoice::Never).unwrap();
        let mut slice = dst.as_slice();
        match read_representation(&mut slice) {
            Ok(Representation::NeverIndexed {
                name: Name::Index(23),
                value,
            }) => assert_eq!(value, b"s3cr3t"),
            _ => panic!("read_representation() failed!"),
        }
    }
}
