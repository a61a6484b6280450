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
use crate::hpack::representation::{read_representation, Name, Representation};
use crate::hpack::table::{DynamicTable, TableSearcher};

/// Decoder implementation of [`HPACK`].
///
/// [`HPACK`]: https://httpwg.org/specs/rfc7541.html
///
/// Blocks must be decoded in the order the peer produced them: every
/// representation is applied to the dynamic table as it is consumed, and
/// any error is fatal for the whole connection.
pub struct HpackDecoder {
    table: DynamicTable,
    /// The capacity the peer is allowed to claim through size updates.
    max_capacity: usize,
}

impl HpackDecoder {
    /// Creates a `HpackDecoder` whose peer may use up to `capacity` bytes
    /// of dynamic table.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            table: DynamicTable::with_capacity(capacity),
            max_capacity: capacity,
        }
    }

    /// Decodes one complete header block.
    pub fn decode(&mut self, block: &[u8]) -> Result<Vec<HeaderField>, HcError> {
        let mut buf = block;
        let mut fields = Vec::new();
        let mut guard = PseudoGuard::new();
        let mut seen_field = false;

        while !buf.is_empty() {
            match read_representation(&mut buf)? {
                Representation::SizeUpdate { max_size } => {
                    // RFC7541-4.2: a size update is only valid before the
                    // first field of a block and within the configured
                    // budget.
                    if seen_field {
                        return Err(HcError::InvalidFrame);
                    }
                    if max_size > self.max_capacity {
                        return Err(HcError::CapacityChangeRejected);
                    }
                    self.table.set_capacity(max_size);
                }
                Representation::Indexed { index } => {
                    seen_field = true;
                    let field = TableSearcher::new(&self.table)
                        .field(index)
                        .ok_or(HcError::TableIndexOutOfRange)?;
                    guard.check(field.name())?;
                    fields.push(field);
                }
                Representation::LiteralWithIndexing { name, value } => {
                    seen_field = true;
                    let name = self.resolve_name(name)?;
                    guard.check(&name)?;
                    let field = HeaderField::new(name, value);
                    self.table.insert(field.clone());
                    fields.push(field);
                }
                Representation::LiteralWithoutIndexing { name, value } => {
                    seen_field = true;
                    let name = self.resolve_name(name)?;
                    guard.check(&name)?;
                    fields.push(HeaderField::new(name, value));
                }
                Representation::LiteralNeverIndexed { name, value } => {
                    seen_field = true;
                    let name = self.resolve_name(name)?;
                    guard.check(&name)?;
                    fields.push(HeaderField::sensitive(name, value));
                }
            }
        }
        Ok(fields)
    }

    fn resolve_name(&self, name: Name) -> Result<Vec<u8>, HcError> {
        match name {
            Name::Index(index) => TableSearcher::new(&self.table)
                .field_name(index)
                .ok_or(HcError::TableIndexOutOfRange),
            Name::Literal(octets) => Ok(octets),
        }
    }

    #[cfg(test)]
    pub(crate) fn table(&self) -> &DynamicTable {
        &self.table
    }
}
