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

//! String literal representation shared by the codecs: a 1-bit Huffman
//! flag, a 7-bit-prefix length and that many octets of string data.

use crate::error::HcError;
use crate::huffman::{huffman_decode, huffman_encode};
use crate::integer::{read_integer, write_integer};

/// Controls whether string literals are Huffman coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HuffmanChoice {
    /// Always emit the Huffman form, even when it is longer.
    Always,
    /// Always emit the raw form.
    Never,
    /// Encode both ways and keep the shorter form; ties go to the raw
    /// form.
    #[default]
    Auto,
}

/// Appends the string literal representation of `src` to `dst`.
pub(crate) fn write_string(
    dst: &mut Vec<u8>,
    src: &[u8],
    choice: HuffmanChoice,
) -> Result<(), HcError> {
    if choice != HuffmanChoice::Never {
        let mut compressed = Vec::with_capacity(src.len());
        huffman_encode(src, &mut compressed);
        if choice == HuffmanChoice::Always || compressed.len() < src.len() {
            write_integer(dst, compressed.len() as u64, 0x7f, 0x80)?;
            dst.extend_from_slice(&compressed);
            return Ok(());
        }
    }
    write_integer(dst, src.len() as u64, 0x7f, 0x00)?;
    dst.extend_from_slice(src);
    Ok(())
}

/// Reads a string literal from the front of `buf`, advancing it.
pub(crate) fn read_string(buf: &mut &[u8]) -> Result<Vec<u8>, HcError> {
    let huffman = match buf.first() {
        Some(first) => first & 0x80 == 0x80,
        None => return Err(HcError::InvalidFrame),
    };
    let length = read_integer(buf, 0x7f)?;
    if (buf.len() as u64) < length {
        return Err(HcError::InvalidFrame);
    }
    let (octets, rest) = buf.split_at(length as usize);
    *buf = rest;
    if huffman {
        let mut decoded = Vec::with_capacity(octets.len() * 2);
        huffman_decode(octets, &mut decoded)?;
        Ok(decoded)
    } else {
        Ok(octets.to_vec())
    }
}
