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

//! Bit-granular reading and writing over a byte stream.
//!
//! The writer buffers a single partial byte; the underlying sink only sees
//! whole bytes, so output is byte-aligned exactly at `pad` boundaries.
//! Huffman string termination pads with `0xff` so that a trailing partial
//! code reads back as a run of ones.

/// MSB-first bit writer over a byte vector.
pub(crate) struct BitWriter<'a> {
    dst: &'a mut Vec<u8>,
    saved: u8,
    saved_bits: u8,
}

impl<'a> BitWriter<'a> {
    pub(crate) fn new(dst: &'a mut Vec<u8>) -> Self {
        Self {
            dst,
            saved: 0,
            saved_bits: 0,
        }
    }

    /// Appends the low `count` bits of `value`, most significant first.
    /// `count` must not exceed 64.
    pub(crate) fn write_bits(&mut self, value: u64, count: u8) {
        debug_assert!(count <= 64);
        let mut left = count;
        while left > 0 {
            let free = 8 - self.saved_bits;
            let take = free.min(left);
            let chunk = ((value >> (left - take)) & ((1u64 << take) - 1)) as u8;
            self.saved |= chunk << (free - take);
            self.saved_bits += take;
            left -= take;
            if self.saved_bits == 8 {
                self.dst.push(self.saved);
                self.saved = 0;
                self.saved_bits = 0;
            }
        }
    }

    /// If a partial byte is held, fills its remaining bits with the high
    /// bits of `pattern` and flushes it. A no-op on an aligned stream.
    pub(crate) fn pad(&mut self, pattern: u8) {
        if self.saved_bits != 0 {
            self.saved |= pattern >> self.saved_bits;
            self.dst.push(self.saved);
            self.saved = 0;
            self.saved_bits = 0;
        }
    }
}

/// MSB-first bit reader over a byte slice. Returns `None` when the input
/// is exhausted.
pub(crate) struct BitReader<'a> {
    src: &'a [u8],
    byte: usize,
    bit: u8,
}

impl<'a> BitReader<'a> {
    pub(crate) fn new(src: &'a [u8]) -> Self {
        Self {
            src,
            byte: 0,
            bit: 0,
        }
    }

    pub(crate) fn read_bit(&mut self) -> Option<u8> {
        let byte = *self.src.get(self.byte)?;
        let bit = (byte >> (7 - self.bit)) & 1;
        self.bit += 1;
        if self.bit == 8 {
            self.bit = 0;
            self.byte += 1;
        }
        Some(bit)
    }

    pub(crate) fn read_bits(&mut self, count: u8) -> Option<u64> {
        debug_assert!(count <= 64);
        let mut value = 0u64;
        for _ in 0..count {
            value = (value << 1) | u64::from(self.read_bit()?);
        }
        Some(value)
    }
}

#[cfg(test)]
mod ut_bitio {
    use super::{BitReader, BitWriter};

    /// UT test cases for `BitWriter`.
    ///
    /// # Brief
    /// 1. Writes bit groups of assorted widths into a `BitWriter`.
    /// 2. Pads the stream and checks the emitted bytes.
    #[test]
    fn ut_bit_writer() {
        let mut dst = Vec::new();
        let mut writer = BitWriter::new(&mut dst);
        writer.write_bits(0b101, 3);
        writer.write_bits(0b01, 2);
        writer.write_bits(0b110, 3);
        assert_eq!(dst, [0b1010_1110]);

        let mut dst = Vec::new();
        let mut writer = BitWriter::new(&mut dst);
        writer.write_bits(0b10101, 5);
        writer.pad(0xff);
        assert_eq!(dst, [0b1010_1111]);

        // Padding an aligned stream emits nothing.
        let mut dst = Vec::new();
        let mut writer = BitWriter::new(&mut dst);
        writer.write_bits(0xab, 8);
        writer.pad(0xff);
        assert_eq!(dst, [0xab]);

        // A 64-bit write crosses byte boundaries intact.
        let mut dst = Vec::new();
        let mut writer = BitWriter::new(&mut dst);
        writer.write_bits(0b1, 1);
        writer.write_bits(0x0123_4567_89ab_cdef, 64);
        writer.pad(0x00);
        assert_eq!(dst, [0x80, 0x91, 0xa2, 0xb3, 0xc4, 0xd5, 0xe6, 0xf7, 0x80]);
    }

    /// UT test cases for `BitReader`.
    ///
    /// # Brief
    /// 1. Reads single bits and bit groups from a byte slice.
    /// 2. Checks the values and the end-of-input behavior.
    #[test]
    fn ut_bit_reader() {
        let src = [0b1010_1110, 0b0100_0000];
        let mut reader = BitReader::new(&src);
        assert_eq!(reader.read_bit(), Some(1));
        assert_eq!(reader.read_bit(), Some(0));
        assert_eq!(reader.read_bits(6), Some(0b101110));
        assert_eq!(reader.read_bits(8), Some(0b0100_0000));
        assert_eq!(reader.read_bit(), None);

        let mut reader = BitReader::new(&[0xff]);
        assert_eq!(reader.read_bits(4), Some(0xf));
        // Not enough bits left for the requested count.
        assert_eq!(reader.read_bits(5), None);
    }

    /// UT test cases for writer/reader round trips.
    ///
    /// # Brief
    /// 1. Writes a bit sequence, then reads it back group by group.
    /// 2. Checks that every group matches.
    #[test]
    fn ut_bitio_round_trip() {
        let mut dst = Vec::new();
        let mut writer = BitWriter::new(&mut dst);
        writer.write_bits(0x3ffffffc, 30);
        writer.write_bits(0b0, 1);
        writer.write_bits(0x14, 6);
        writer.pad(0xff);

        let mut reader = BitReader::new(&dst);
        assert_eq!(reader.read_bits(30), Some(0x3ffffffc));
        assert_eq!(reader.read_bits(1), Some(0));
        assert_eq!(reader.read_bits(6), Some(0x14));
    }
}
