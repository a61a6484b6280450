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

use crate::error::HcError;
use crate::field::{HeaderField, PseudoGuard};
use crate::hpack::representation::{
    write_indexed, write_literal, write_size_update, Name, PrefixBit,
};
use crate::hpack::table::{DynamicTable, TableSearcher};
use crate::static_table::TableIndex;
use crate::strings::HuffmanChoice;

/// Encoder implementation of [`HPACK`].
///
/// [`HPACK`]: https://httpwg.org/specs/rfc7541.html
///
/// Each call to `encode` produces one complete header block and updates the
/// dynamic table exactly as the peer's decoder will. Capacity changes
/// requested between blocks are announced through size update
/// representations at the start of the next block.
pub struct HpackEncoder {
    table: DynamicTable,
    huffman: HuffmanChoice,
    pending_capacity: Option<PendingCapacity>,
}

/// Capacity changes requested since the last block. The minimum must be
/// announced separately when the requests dipped below the final value, so
/// the peer evicts just as this side did.
struct PendingCapacity {
    lowest: usize,
    latest: usize,
}

impl HpackEncoder {
    /// Creates a `HpackEncoder` with the given dynamic table capacity and
    /// Huffman preference.
    pub fn with_capacity(capacity: usize, huffman: HuffmanChoice) -> Self {
        Self {
            table: DynamicTable::with_capacity(capacity),
            huffman,
            pending_capacity: None,
        }
    }

    /// Requests a dynamic table capacity change. It takes effect at the
    /// start of the next block.
    pub fn set_capacity(&mut self, capacity: usize) {
        match self.pending_capacity.as_mut() {
            Some(pending) => {
                pending.lowest = pending.lowest.min(capacity);
                pending.latest = capacity;
            }
            None => {
                self.pending_capacity = Some(PendingCapacity {
                    lowest: capacity,
                    latest: capacity,
                });
            }
        }
    }

    /// Encodes `fields` as one header block appended to `dst`.
    ///
    /// Pseudo-header fields must precede all regular fields.
    pub fn encode(&mut self, fields: &[HeaderField], dst: &mut Vec<u8>) -> Result<(), HcError> {
        self.flush_capacity(dst)?;
        let mut guard = PseudoGuard::new();
        for field in fields {
            guard.check(field.name())?;
            self.encode_field(field, dst)?;
        }
        Ok(())
    }

    fn flush_capacity(&mut self, dst: &mut Vec<u8>) -> Result<(), HcError> {
        if let Some(PendingCapacity { lowest, latest }) = self.pending_capacity.take() {
            if lowest < latest && lowest < self.table.capacity() {
                write_size_update(dst, lowest)?;
                self.table.set_capacity(lowest);
            }
            if latest != self.table.capacity() {
                write_size_update(dst, latest)?;
                self.table.set_capacity(latest);
            }
        }
        Ok(())
    }

    fn encode_field(&mut self, field: &HeaderField, dst: &mut Vec<u8>) -> Result<(), HcError> {
        let searcher = TableSearcher::new(&self.table);

        if field.is_sensitive() {
            let name = match searcher.find_name(field.name()) {
                Some(index) => Name::Index(index),
                None => Name::Literal(field.name().to_vec()),
            };
            return write_literal(
                dst,
                PrefixBit::LITERAL_NEVER_INDEXED,
                &name,
                field.value(),
                self.huffman,
            );
        }

        match searcher.find(field.name(), field.value()) {
            Some(TableIndex::Field(index)) => write_indexed(dst, index),
            Some(TableIndex::FieldName(index)) => {
                self.encode_literal(Name::Index(index), field, dst)
            }
            None => self.encode_literal(Name::Literal(field.name().to_vec()), field, dst),
        }
    }

    /// Emits a literal representation, inserting the field into the
    /// dynamic table. A field too large to ever fit is downgraded to the
    /// non-indexing form so the table is not flushed for nothing.
    fn encode_literal(
        &mut self,
        name: Name,
        field: &HeaderField,
        dst: &mut Vec<u8>,
    ) -> Result<(), HcError> {
        if field.size() > self.table.capacity() {
            return write_literal(
                dst,
                PrefixBit::LITERAL_WITHOUT_INDEXING,
                &name,
                field.value(),
                self.huffman,
            );
        }
        write_literal(
            dst,
            PrefixBit::LITERAL_WITH_INDEXING,
            &name,
            field.value(),
            self.huffman,
        )?;
        self.table.insert(field.clone());
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn table(&self) -> &DynamicTable {
        &self.table
    }
}
