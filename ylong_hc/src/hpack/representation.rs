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

//! [Header Field Representation] implementation of [HPACK].
//!
//! [Header Field Representation]: https://www.rfc-editor.org/rfc/rfc7541.html#section-2.4
//! [HPACK]: https://httpwg.org/specs/rfc7541.html
//!
//! An encoded header field is represented either as an index or as a
//! literal. A literal carries its value (and possibly its name) as string
//! literals and comes in three forms: one that inserts the field into the
//! dynamic table, one that leaves the table untouched, and a never-indexed
//! form for sensitive fields that intermediaries must preserve as-is. A
//! fifth representation signals a dynamic table size change.

use crate::error::HcError;
use crate::integer::{read_integer, write_integer};
use crate::strings::{read_string, write_string, HuffmanChoice};

/// One decoded representation of a header block.
///
/// # Binary Format
/// ```text
///   0   1   2   3   4   5   6   7
/// +---+---+---+---+---+---+---+---+
/// | 1 |        Index (7+)         |  Indexed
/// +---+---+-----------------------+
/// | 0 | 1 |      Index (6+)       |  Literal with incremental indexing
/// +---+---+---+-------------------+
/// | 0 | 0 | 1 |   Max size (5+)   |  Dynamic table size update
/// +---+---+---+---+---------------+
/// | 0 | 0 | 0 | 1 |  Index (4+)   |  Literal never indexed
/// +---+---+---+---+---------------+
/// | 0 | 0 | 0 | 0 |  Index (4+)   |  Literal without indexing
/// +---+---+---+---+---------------+
/// ```
/// In the literal forms an index of 0 means a literal name string follows;
/// the value string always follows last.
pub(crate) enum Representation {
    Indexed { index: usize },
    LiteralWithIndexing { name: Name, value: Vec<u8> },
    LiteralWithoutIndexing { name: Name, value: Vec<u8> },
    LiteralNeverIndexed { name: Name, value: Vec<u8> },
    SizeUpdate { max_size: usize },
}

/// Name of a literal representation: a table index or a string literal.
pub(crate) enum Name {
    Index(usize),
    Literal(Vec<u8>),
}

/// Prefix bit of a `Representation`.
#[derive(Copy, Clone, PartialEq, Eq)]
pub(crate) struct PrefixBit(u8);

impl PrefixBit {
    pub(crate) const INDEXED: Self = Self(0x80);
    pub(crate) const LITERAL_WITH_INDEXING: Self = Self(0x40);
    pub(crate) const SIZE_UPDATE: Self = Self(0x20);
    pub(crate) const LITERAL_NEVER_INDEXED: Self = Self(0x10);
    pub(crate) const LITERAL_WITHOUT_INDEXING: Self = Self(0x00);

    /// Creates a `PrefixBit` from the first byte of a representation.
    pub(crate) fn from_u8(byte: u8) -> Self {
        match byte {
            x if x >= 0x80 => Self::INDEXED,
            x if x >= 0x40 => Self::LITERAL_WITH_INDEXING,
            x if x >= 0x20 => Self::SIZE_UPDATE,
            x if x >= 0x10 => Self::LITERAL_NEVER_INDEXED,
            _ => Self::LITERAL_WITHOUT_INDEXING,
        }
    }

    /// Returns the all-ones prefix mask that goes with this prefix bit.
    pub(crate) fn prefix_index_mask(&self) -> u8 {
        match self.0 {
            0x80 => 0x7f,
            0x40 => 0x3f,
            0x20 => 0x1f,
            _ => 0x0f,
        }
    }

    pub(crate) fn pattern(&self) -> u8 {
        self.0
    }
}

/// Reads one complete representation from the front of `buf`, advancing
/// it. The caller loops until the buffer is empty.
pub(crate) fn read_representation(buf: &mut &[u8]) -> Result<Representation, HcError> {
    let first = *buf.first().ok_or(HcError::InvalidFrame)?;
    let repr = PrefixBit::from_u8(first);
    let index = read_integer(buf, repr.prefix_index_mask())?;
    let index = usize::try_from(index).map_err(|_| HcError::TableIndexOutOfRange)?;

    match repr {
        PrefixBit::INDEXED => {
            // RFC7541-6.1: The index value of 0 is not used. It MUST be
            // treated as a decoding error in an indexed representation.
            if index == 0 {
                return Err(HcError::InvalidFrame);
            }
            Ok(Representation::Indexed { index })
        }
        PrefixBit::SIZE_UPDATE => Ok(Representation::SizeUpdate { max_size: index }),
        _ => {
            let name = match index {
                0 => Name::Literal(read_string(buf)?),
                n => Name::Index(n),
            };
            let value = read_string(buf)?;
            Ok(match repr {
                PrefixBit::LITERAL_WITH_INDEXING => {
                    Representation::LiteralWithIndexing { name, value }
                }
                PrefixBit::LITERAL_WITHOUT_INDEXING => {
                    Representation::LiteralWithoutIndexing { name, value }
                }
                _ => Representation::LiteralNeverIndexed { name, value },
            })
        }
    }
}

/// Appends an indexed representation.
pub(crate) fn write_indexed(dst: &mut Vec<u8>, index: usize) -> Result<(), HcError> {
    write_integer(dst, index as u64, 0x7f, 0x80)
}

/// Appends a literal representation under the given prefix bit.
pub(crate) fn write_literal(
    dst: &mut Vec<u8>,
    repr: PrefixBit,
    name: &Name,
    value: &[u8],
    huffman: HuffmanChoice,
) -> Result<(), HcError> {
    let mask = repr.prefix_index_mask();
    match name {
        Name::Index(index) => write_integer(dst, *index as u64, mask, repr.pattern())?,
        Name::Literal(octets) => {
            write_integer(dst, 0, mask, repr.pattern())?;
            write_string(dst, octets, huffman)?;
        }
    }
    write_string(dst, value, huffman)
}

/// Appends a dynamic table size update.
pub(crate) fn write_size_update(dst: &mut Vec<u8>, max_size: usize) -> Result<(), HcError> {
    write_integer(dst, max_size as u64, 0x1f, 0x20)
}

#[cfg(test)]
mod ut_representation {
    use super::*;
    use crate::util::test_util::decode;

    macro_rules! inner_test_case {
        ($buf: expr, SizeUpdate => $max: expr) => {
            match read_representation($buf) {
                Ok(Representation::SizeUpdate { max_size }) => assert_eq!($max, max_size),
                _ => panic!("read_representation() failed!"),
            }
        };
        ($buf: expr, $pat: ident => $index: expr) => {
            match read_representation($buf) {
                Ok(Representation::$pat { index }) => assert_eq!($index, index),
                _ => panic!("read_representation() failed!"),
            }
        };
        ($buf: expr, $pat: ident, $kind: ident => $name: expr, $value: expr) => {
            match read_representation($buf) {
                Ok(Representation::$pat {
                    name: Name::$kind(n),
                    value: v,
                }) => {
                    assert_eq!($name, n);
                    assert_eq!($value, v);
                }
                _ => panic!("read_representation() failed!"),
            }
        };
    }

    macro_rules! repr_test_case {
        ($octets: literal, $({ $pat: ident $(, $kind: ident)? => $first: expr $(, $second: expr)?} $(,)?)*) => {
            let bytes = decode($octets).unwrap();
            let mut slice = bytes.as_slice();
            $(
                inner_test_case!(&mut slice, $pat $(, $kind)? => $first $(, $second)?);
            )*
            assert!(slice.is_empty());
        }
    }

    /// UT test cases for `read_representation`.
    ///
    /// # Brief
    /// 1. Calls `read_representation` over RFC7541 Appendix C blocks.
    /// 2. Checks every decoded representation.
    #[test]
    fn ut_read_representation() {
        // C.2.1. Literal Header Field with Indexing
        repr_test_case!(
            "400a637573746f6d2d6b65790d637573746f6d2d686561646572",
            { LiteralWithIndexing, Literal => b"custom-key".to_vec(), b"custom-header".to_vec() }
        );

        // C.2.2. Literal Header Field without Indexing
        repr_test_case!(
            "040c2f73616d706c652f70617468",
            { LiteralWithoutIndexing, Index => 4, b"/sample/path".to_vec() }
        );

        // C.2.3. Literal Header Field Never Indexed
        repr_test_case!(
            "100870617373776f726406736563726574",
            { LiteralNeverIndexed, Literal => b"password".to_vec(), b"secret".to_vec() }
        );

        // C.2.4. Indexed Header Field
        repr_test_case!(
            "82",
            { Indexed => 2 }
        );

        // C.3.1. First Request
        repr_test_case!(
            "828684410f7777772e6578616d706c652e636f6d",
            { Indexed => 2 },
            { Indexed => 6 },
            { Indexed => 4 },
            { LiteralWithIndexing, Index => 1, b"www.example.com".to_vec() }
        );

        // C.4.2. Second Request
        repr_test_case!(
            "828684be5886a8eb10649cbf",
            { Indexed => 2 },
            { Indexed => 6 },
            { Indexed => 4 },
            { Indexed => 62 },
            { LiteralWithIndexing, Index => 24, b"no-cache".to_vec() }
        );

        // A size update between indexed fields.
        repr_test_case!(
            "823fe10184",
            { Indexed => 2 },
            { SizeUpdate => 256 },
            { Indexed => 4 }
        );
    }

    /// UT test cases for `read_representation` error handling.
    ///
    /// # Brief
    /// 1. Feeds an indexed representation with index 0 and a truncated
    ///    literal.
    /// 2. Checks the error kinds.
    #[test]
    fn ut_read_representation_invalid() {
        let bytes = [0x80];
        let mut slice = &bytes[..];
        assert!(matches!(
            read_representation(&mut slice),
            Err(HcError::InvalidFrame)
        ));

        let bytes = decode("400a637573").unwrap();
        let mut slice = bytes.as_slice();
        assert!(matches!(
            read_representation(&mut slice),
            Err(HcError::InvalidFrame)
        ));
    }

    /// UT test cases for the representation writers.
    ///
    /// # Brief
    /// 1. Writes each representation kind.
    /// 2. Checks the emitted octets against RFC7541 Appendix C.
    #[test]
    fn ut_write_representation() {
        let mut dst = Vec::new();
        write_indexed(&mut dst, 2).unwrap();
        assert_eq!(dst, [0x82]);

        let mut dst = Vec::new();
        write_literal(
            &mut dst,
            PrefixBit::LITERAL_WITH_INDEXING,
            &Name::Literal(b"custom-key".to_vec()),
            b"custom-header",
            HuffmanChoice::Never,
        )
        .unwrap();
        assert_eq!(
            dst,
            decode("400a637573746f6d2d6b65790d637573746f6d2d686561646572").unwrap()
        );

        let mut dst = Vec::new();
        write_literal(
            &mut dst,
            PrefixBit::LITERAL_NEVER_INDEXED,
            &Name::Literal(b"password".to_vec()),
            b"secret",
            HuffmanChoice::Never,
        )
        .unwrap();
        assert_eq!(dst, decode("100870617373776f726406736563726574").unwrap());

        let mut dst = Vec::new();
        write_literal(
            &mut dst,
            PrefixBit::LITERAL_WITHOUT_INDEXING,
            &Name::Index(4),
            b"/sample/path",
            HuffmanChoice::Never,
        )
        .unwrap();
        assert_eq!(dst, decode("040c2f73616d706c652f70617468").unwrap());

        let mut dst = Vec::new();
        write_size_update(&mut dst, 256).unwrap();
        assert_eq!(dst, decode("3fe101").unwrap());
    }
}
