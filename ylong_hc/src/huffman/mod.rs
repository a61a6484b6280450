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

//! [Huffman coding] implementation shared by the codecs.
//!
//! [Huffman coding]: https://en.wikipedia.org/wiki/Huffman_coding
//!
//! The code is the fixed 256-symbol table of RFC7541 Appendix B, generated
//! from statistics over a large sample of HTTP headers. Compression emits
//! each symbol's code bits and pads the final partial octet with ones, so a
//! truncated trailing code is indistinguishable from EOS prefix padding.
//! Decompression walks a binary tree one bit at a time; the tree is stored
//! as a flat arena of index-addressed nodes and built once per process on
//! first use.

mod consts;

use std::sync::OnceLock;

use consts::HUFFMAN_CODES;

use crate::bitio::{BitReader, BitWriter};
use crate::error::HcError;

/// Compresses `src` with the static Huffman code and appends the result,
/// padded with ones to an octet boundary, to `dst`.
pub(crate) fn huffman_encode(src: &[u8], dst: &mut Vec<u8>) {
    let mut writer = BitWriter::new(dst);
    for byte in src.iter() {
        let (code, nbits) = HUFFMAN_CODES[*byte as usize];
        writer.write_bits(u64::from(code), nbits);
    }
    writer.pad(0xff);
}

/// Decompresses a complete Huffman-coded string into `dst`.
///
/// Input may end on a symbol boundary or inside an all-ones run of at most
/// 7 bits, the padding `huffman_encode` produces. Ending anywhere else,
/// stepping off the tree, or 8 or more trailing one-bits is an error.
pub(crate) fn huffman_decode(src: &[u8], dst: &mut Vec<u8>) -> Result<(), HcError> {
    let tree = decode_tree();
    let mut reader = BitReader::new(src);
    let mut node = 0usize;
    // Bits consumed since the last emitted symbol, and whether every one
    // of them was a 1-bit.
    let mut depth = 0u32;
    let mut all_ones = true;

    while let Some(bit) = reader.read_bit() {
        let next = tree[node].children[bit as usize];
        if next == NO_CHILD {
            return Err(HcError::InvalidHuffmanCoding);
        }
        node = next as usize;
        depth += 1;
        all_ones &= bit == 1;
        if let Some(symbol) = tree[node].symbol {
            dst.push(symbol);
            node = 0;
            depth = 0;
            all_ones = true;
        }
    }

    if depth == 0 || (all_ones && depth <= 7) {
        Ok(())
    } else {
        Err(HcError::InvalidHuffmanCoding)
    }
}

const NO_CHILD: u16 = u16::MAX;

struct TreeNode {
    children: [u16; 2],
    symbol: Option<u8>,
}

static DECODE_TREE: OnceLock<Vec<TreeNode>> = OnceLock::new();

fn decode_tree() -> &'static [TreeNode] {
    DECODE_TREE.get_or_init(build_decode_tree)
}

/// Builds the decode tree by inserting every code of the table, creating
/// interior nodes on demand. Children are arena indices, not references.
fn build_decode_tree() -> Vec<TreeNode> {
    let mut nodes = vec![TreeNode {
        children: [NO_CHILD; 2],
        symbol: None,
    }];
    for (symbol, &(code, nbits)) in HUFFMAN_CODES.iter().enumerate() {
        let mut node = 0usize;
        for depth in (0..nbits).rev() {
            let bit = ((code >> depth) & 1) as usize;
            node = match nodes[node].children[bit] {
                NO_CHILD => {
                    let next = nodes.len() as u16;
                    nodes[node].children[bit] = next;
                    nodes.push(TreeNode {
                        children: [NO_CHILD; 2],
                        symbol: None,
                    });
                    next as usize
                }
                next => next as usize,
            };
        }
        nodes[node].symbol = Some(symbol as u8);
    }
    nodes
}
