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

use std::collections::HashMap;

use crate::error::HcError;
use crate::field::{HeaderField, PseudoGuard};
use crate::integer::write_integer;
use crate::qcram::instruction::{
    write_insert, write_set_capacity, AckDecodeState, AckDecoder, DecoderInstruction, InstName,
};
use crate::qcram::representation::{
    write_indexed, write_indexed_name, write_literal, write_never_indexed, Name,
};
use crate::qcram::table::{DynamicTable, TableMatch};
use crate::static_table::{self, TableIndex};
use crate::strings::HuffmanChoice;

/// One encoded header block: the block bytes for the request's stream and
/// the control stream bytes the block depends on. The control bytes must
/// be handed to the control stream before or while the block travels; the
/// peer parks the block until they arrive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBlock {
    header: Vec<u8>,
    control: Vec<u8>,
}

impl EncodedBlock {
    pub fn header(&self) -> &[u8] {
        &self.header
    }

    pub fn control(&self) -> &[u8] {
        &self.control
    }
}

/// Encoder implementation of QCRAM.
///
/// All dynamic table insertions are emitted as control stream
/// instructions; header blocks only reference the table. Every block's
/// dynamic references are recorded in the outstanding set and pin the
/// referenced entries until the peer acknowledges the request, so no
/// entry disappears while a block that needs it is still in flight.
pub struct QcramEncoder {
    table: DynamicTable,
    huffman: HuffmanChoice,
    /// Smallest absolute index referenced per unacknowledged request.
    outstanding: HashMap<u64, u64>,
    pending_capacity: Option<usize>,
    ack_state: Option<AckDecodeState>,
}

impl QcramEncoder {
    /// Creates a `QcramEncoder` with the given dynamic table capacity and
    /// Huffman preference. The capacity must match what the peer's
    /// decoder was configured with.
    pub fn with_capacity(capacity: usize, huffman: HuffmanChoice) -> Self {
        Self {
            table: DynamicTable::with_capacity(capacity),
            huffman,
            outstanding: HashMap::new(),
            pending_capacity: None,
            ack_state: None,
        }
    }

    /// Requests a dynamic table capacity change, announced on the control
    /// stream at the next block boundary. A reduction that would have to
    /// evict entries pinned by unacknowledged blocks fails with
    /// `DynamicTableBlocked`; it can be retried once acknowledgments
    /// arrive.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<(), HcError> {
        if !self.table.can_set_capacity(capacity, self.fence(None)) {
            return Err(HcError::DynamicTableBlocked);
        }
        self.pending_capacity = Some(capacity);
        Ok(())
    }

    /// Encodes `fields` as the header block of `request_id`.
    ///
    /// Pseudo-header fields must precede all regular fields.
    pub fn encode(
        &mut self,
        request_id: u64,
        fields: &[HeaderField],
    ) -> Result<EncodedBlock, HcError> {
        let mut control = Vec::new();
        self.flush_capacity(&mut control)?;

        let mut guard = PseudoGuard::new();
        let mut reps = Vec::with_capacity(fields.len());
        let mut block_min: Option<u64> = None;
        let mut largest_ref = 0u64;

        for field in fields {
            guard.check(field.name())?;
            let rep = self.resolve_field(field, &mut control, block_min)?;
            if let Some(abs) = rep.dynamic_ref() {
                largest_ref = largest_ref.max(abs);
                block_min = Some(block_min.map_or(abs, |min| min.min(abs)));
            }
            reps.push(rep);
        }

        let mut header = Vec::new();
        write_integer(&mut header, largest_ref, 0xff, 0x00)?;
        for rep in &reps {
            rep.write(&mut header, largest_ref, self.huffman)?;
        }

        if let Some(min) = block_min {
            self.outstanding
                .entry(request_id)
                .and_modify(|m| *m = (*m).min(min))
                .or_insert(min);
        }
        Ok(EncodedBlock { header, control })
    }

    /// Consumes decoder stream bytes: section acknowledgments release the
    /// request's pins, stream cancellations do the same for abandoned
    /// requests. Bytes may arrive in arbitrary chunks.
    pub fn read_decoder_instructions(&mut self, buf: &[u8]) -> Result<(), HcError> {
        let mut cursor = buf;
        let mut state = self.ack_state.take();
        while let Some(inst) = AckDecoder::decode(&mut cursor, &mut state)? {
            match inst {
                DecoderInstruction::Ack { request_id } => self.acknowledge(request_id),
                DecoderInstruction::Cancel { request_id } => self.cancel(request_id),
            }
        }
        self.ack_state = state;
        Ok(())
    }

    /// Releases the pins of an acknowledged request. Idempotent.
    pub fn acknowledge(&mut self, request_id: u64) {
        self.outstanding.remove(&request_id);
    }

    /// Releases the pins of a cancelled request. Idempotent.
    pub fn cancel(&mut self, request_id: u64) {
        self.outstanding.remove(&request_id);
    }

    /// The eviction fence: the smallest absolute index still pinned by an
    /// outstanding request or by the block currently being encoded.
    /// Entries below it may be evicted.
    fn fence(&self, block_min: Option<u64>) -> u64 {
        self.outstanding
            .values()
            .copied()
            .chain(block_min)
            .min()
            .unwrap_or(u64::MAX)
    }

    fn flush_capacity(&mut self, control: &mut Vec<u8>) -> Result<(), HcError> {
        if let Some(capacity) = self.pending_capacity {
            // Pins may have appeared since the change was accepted; if so
            // it simply stays pending until the next boundary.
            if self.table.can_set_capacity(capacity, self.fence(None)) {
                write_set_capacity(control, capacity as u64)?;
                self.table.set_capacity(capacity);
                self.pending_capacity = None;
            }
        }
        Ok(())
    }

    fn resolve_field(
        &mut self,
        field: &HeaderField,
        control: &mut Vec<u8>,
        block_min: Option<u64>,
    ) -> Result<BlockRep, HcError> {
        let value = field.value().to_vec();

        if field.is_sensitive() {
            let name = match static_table::find(field.name(), b"") {
                Some(TableIndex::Field(n)) | Some(TableIndex::FieldName(n)) => RepName::Static(n),
                None => match self.table.find_name(field.name()) {
                    Some(abs) => RepName::Dynamic(abs),
                    None => RepName::Literal(field.name().to_vec()),
                },
            };
            return Ok(BlockRep::NeverIndexed { name, value });
        }

        let in_static = static_table::find(field.name(), field.value());
        if let Some(TableIndex::Field(n)) = in_static {
            return Ok(BlockRep::Indexed(RepIndex::Static(n)));
        }
        if let Some(TableMatch::Field(abs)) = self.table.find(field.name(), field.value()) {
            return Ok(BlockRep::Indexed(RepIndex::Dynamic(abs)));
        }

        // No full match anywhere: insert through the control stream and
        // reference the new entry, unless eviction would cross the
        // pinning fence.
        if self.table.can_insert(field.size(), self.fence(block_min)) {
            let name = self.insert_name(field.name());
            write_insert(control, &name, field.value(), self.huffman)?;
            let abs = self.table.insert(HeaderField::new(field.name(), field.value()));
            return Ok(BlockRep::Indexed(RepIndex::Dynamic(abs)));
        }

        // Blocked or oversized: encode the field without touching the
        // table.
        match in_static {
            Some(TableIndex::FieldName(n)) | Some(TableIndex::Field(n)) => {
                Ok(BlockRep::IndexedName {
                    index: RepIndex::Static(n),
                    value,
                })
            }
            None => match self.table.find_name(field.name()) {
                Some(abs) => Ok(BlockRep::IndexedName {
                    index: RepIndex::Dynamic(abs),
                    value,
                }),
                None => Ok(BlockRep::Literal {
                    name: field.name().to_vec(),
                    value,
                }),
            },
        }
    }

    /// Picks the name form of an insert instruction: static index, then
    /// dynamic index relative to the newest entry, then a literal.
    fn insert_name(&self, name: &[u8]) -> InstName {
        match static_table::find(name, b"") {
            Some(TableIndex::Field(n)) | Some(TableIndex::FieldName(n)) => {
                InstName::Index(n as u64)
            }
            None => match self.table.find_name(name) {
                Some(abs) => InstName::Index(62 + (self.table.insert_count() - abs)),
                None => InstName::Literal(name.to_vec()),
            },
        }
    }

    #[cfg(test)]
    pub(crate) fn table(&self) -> &DynamicTable {
        &self.table
    }

    #[cfg(test)]
    pub(crate) fn outstanding(&self) -> &HashMap<u64, u64> {
        &self.outstanding
    }
}

/// An intermediate representation of one field. Dynamic references are
/// kept absolute until the whole block is resolved, because their wire
/// form depends on the block's final largest reference.
enum BlockRep {
    Indexed(RepIndex),
    IndexedName { index: RepIndex, value: Vec<u8> },
    Literal { name: Vec<u8>, value: Vec<u8> },
    NeverIndexed { name: RepName, value: Vec<u8> },
}

enum RepIndex {
    Static(usize),
    Dynamic(u64),
}

enum RepName {
    Static(usize),
    Dynamic(u64),
    Literal(Vec<u8>),
}

impl RepIndex {
    fn wire(&self, largest_ref: u64) -> usize {
        match self {
            Self::Static(n) => *n,
            Self::Dynamic(abs) => 62 + (largest_ref - abs) as usize,
        }
    }
}

impl BlockRep {
    fn dynamic_ref(&self) -> Option<u64> {
        match self {
            Self::Indexed(RepIndex::Dynamic(abs)) => Some(*abs),
            Self::IndexedName {
                index: RepIndex::Dynamic(abs),
                ..
            } => Some(*abs),
            Self::NeverIndexed {
                name: RepName::Dynamic(abs),
                ..
            } => Some(*abs),
            _ => None,
        }
    }

    fn write(
        &self,
        dst: &mut Vec<u8>,
        largest_ref: u64,
        huffman: HuffmanChoice,
    ) -> Result<(), HcError> {
        match self {
            Self::Indexed(index) => write_indexed(dst, index.wire(largest_ref)),
            Self::IndexedName { index, value } => {
                write_indexed_name(dst, index.wire(largest_ref), value, huffman)
            }
            Self::Literal { name, value } => write_literal(dst, name, value, huffman),
            Self::NeverIndexed { name, value } => {
                let name = match name {
                    RepName::Static(n) => Name::Index(*n),
                    RepName::Dynamic(abs) => Name::Index(62 + (largest_ref - abs) as usize),
                    RepName::Literal(octets) => Name::Literal(octets.clone()),
                };
                write_never_indexed(dst, &name, value, huffman)
            }
        }
    }
}

#[cfg(test)]
mod ut_qcram_encoder {
    use super::QcramEncoder;
    use crate::error::HcError;
    use crate::field::HeaderField;
    use crate::strings::HuffmanChoice;
    use crate::util::test_util::decode;

    fn request_block() -> Vec<HeaderField> {
        vec![
            HeaderField::new(*b":method", *b"GET"),
            HeaderField::new(*b":scheme", *b"http"),
            HeaderField::new(*b":path", *b"/"),
            HeaderField::new(*b":authority", *b"www.example.com"),
        ]
    }

    /// UT test cases for the control/header split.
    ///
    /// # Brief
    /// 1. Encodes blocks whose insertions travel on the control stream.
    /// 2. Checks both byte streams and the largest reference.
    #[test]
    fn ut_qcram_encoder_split() {
        // All insertions on the control stream, all references in the
        // block.
        let mut encoder = QcramEncoder::with_capacity(4096, HuffmanChoice::Never);
        let block = encoder.encode(1, &request_block()).unwrap();
        assert_eq!(
            block.control(),
            decode("410f7777772e6578616d706c652e636f6d").unwrap()
        );
        assert_eq!(block.header(), decode("01828684be").unwrap());
        assert_eq!(encoder.outstanding().get(&1), Some(&1));

        // The follow-up block reuses entry 1 and inserts entry 2.
        let mut fields = request_block();
        fields.push(HeaderField::new(*b"cache-control", *b"no-cache"));
        let block = encoder.encode(2, &fields).unwrap();
        assert_eq!(block.control(), decode("58086e6f2d6361636865").unwrap());
        assert_eq!(block.header(), decode("02828684bfbe").unwrap());
        assert_eq!(encoder.outstanding().get(&2), Some(&1));
        assert_eq!(encoder.table().insert_count(), 2);
    }

    /// UT test cases for Huffman-coded control insertions.
    ///
    /// # Brief
    /// 1. Encodes the same block with Huffman coding enabled.
    /// 2. Checks that only the control stream changes.
    #[test]
    fn ut_qcram_encoder_huffman() {
        let mut encoder = QcramEncoder::with_capacity(4096, HuffmanChoice::Always);
        let block = encoder.encode(1, &request_block()).unwrap();
        assert_eq!(
            block.control(),
            decode("418cf1e3c2e5f23a6ba0ab90f4ff").unwrap()
        );
        assert_eq!(block.header(), decode("01828684be").unwrap());
    }

    /// UT test cases for blocks without dynamic dependencies.
    ///
    /// # Brief
    /// 1. Encodes static-only and sensitive fields.
    /// 2. Checks the zero largest reference and the empty control stream.
    #[test]
    fn ut_qcram_encoder_no_dependency() {
        let mut encoder = QcramEncoder::with_capacity(4096, HuffmanChoice::Never);
        let block = encoder
            .encode(1, &[HeaderField::new(*b":method", *b"GET")])
            .unwrap();
        assert!(block.control().is_empty());
        assert_eq!(block.header(), decode("0082").unwrap());
        assert!(encoder.outstanding().is_empty());

        let block = encoder
            .encode(2, &[HeaderField::sensitive(*b"password", *b"secret")])
            .unwrap();
        assert!(block.control().is_empty());
        assert_eq!(
            block.header(),
            decode("00100870617373776f726406736563726574").unwrap()
        );
        assert_eq!(encoder.table().insert_count(), 0);
    }

    /// UT test cases for eviction safety.
    ///
    /// # Brief
    /// 1. Fills a tight table with a pinned entry, then encodes a field
    ///    whose insertion would evict it.
    /// 2. Checks the literal fallback, then the insertion after the
    ///    acknowledgment arrives.
    #[test]
    fn ut_qcram_encoder_pinned_fallback() {
        let mut encoder = QcramEncoder::with_capacity(64, HuffmanChoice::Never);
        let block = encoder
            .encode(1, &[HeaderField::new(*b"one", *b"1")])
            .unwrap();
        assert_eq!(block.control(), decode("40036f6e650131").unwrap());
        assert_eq!(block.header(), decode("01be").unwrap());

        // Entry 1 is pinned by request 1; inserting "two" must not evict
        // it, so the field falls back to a literal and the table is
        // untouched.
        let block = encoder
            .encode(2, &[HeaderField::new(*b"two", *b"2")])
            .unwrap();
        assert!(block.control().is_empty());
        assert_eq!(block.header(), decode("002374776f0132").unwrap());
        assert_eq!(encoder.table().insert_count(), 1);
        assert_eq!(encoder.table().get(1).unwrap().name(), b"one");

        // Once request 1 is acknowledged the entry may be evicted.
        encoder.acknowledge(1);
        let block = encoder
            .encode(3, &[HeaderField::new(*b"two", *b"2")])
            .unwrap();
        assert_eq!(block.control(), decode("400374776f0132").unwrap());
        assert_eq!(block.header(), decode("02be").unwrap());
        assert_eq!(encoder.table().insert_count(), 2);
        assert!(encoder.table().get(1).is_none());
    }

    /// UT test cases for capacity changes.
    ///
    /// # Brief
    /// 1. Requests reductions with and without pinned entries in the way.
    /// 2. Checks the control stream announcement and the blocked error.
    #[test]
    fn ut_qcram_encoder_set_capacity() {
        let mut encoder = QcramEncoder::with_capacity(4096, HuffmanChoice::Never);
        encoder.encode(1, &request_block()).unwrap();

        // Entry 1 (57 bytes) is pinned, so shrinking below it is blocked.
        assert_eq!(encoder.set_capacity(0), Err(HcError::DynamicTableBlocked));

        encoder.acknowledge(1);
        encoder.set_capacity(128).unwrap();
        let block = encoder
            .encode(2, &[HeaderField::new(*b":method", *b"GET")])
            .unwrap();
        // The announcement opens the control stream of the next block.
        assert_eq!(block.control(), decode("3f61").unwrap());
        assert_eq!(encoder.table().capacity(), 128);
    }

    /// UT test cases for decoder stream intake.
    ///
    /// # Brief
    /// 1. Feeds acknowledgment and cancellation instructions in split
    ///    chunks.
    /// 2. Checks that the outstanding set empties.
    #[test]
    fn ut_qcram_encoder_read_decoder_instructions() {
        let mut encoder = QcramEncoder::with_capacity(4096, HuffmanChoice::Never);
        encoder.encode(1, &request_block()).unwrap();
        let mut fields = request_block();
        fields.push(HeaderField::new(*b"cache-control", *b"no-cache"));
        encoder.encode(2, &fields).unwrap();
        assert_eq!(encoder.outstanding().len(), 2);

        // Ack request 1, cancel request 2, split across chunks.
        encoder.read_decoder_instructions(&[0x81]).unwrap();
        assert_eq!(encoder.outstanding().len(), 1);
        encoder.read_decoder_instructions(&[0x42]).unwrap();
        assert!(encoder.outstanding().is_empty());

        // Cancellation is idempotent.
        encoder.read_decoder_instructions(&[0x42]).unwrap();
        assert!(encoder.outstanding().is_empty());
    }
}
