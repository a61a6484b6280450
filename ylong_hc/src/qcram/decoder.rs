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
use crate::integer::read_integer;
use crate::qcram::instruction::{
    write_ack, write_cancel, ControlDecoder, ControlInstruction, InstDecodeState, InstName,
};
use crate::qcram::representation::{read_representation, Name, Representation};
use crate::qcram::table::DynamicTable;
use crate::static_table::{self, STATIC_TABLE_LEN};

/// A header block that became decodable through control stream progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBlock {
    request_id: u64,
    fields: Vec<HeaderField>,
}

impl DecodedBlock {
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    pub fn fields(&self) -> &[HeaderField] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<HeaderField> {
        self.fields
    }
}

struct ParkedBlock {
    largest_ref: u64,
    body: Vec<u8>,
}

/// Decoder implementation of QCRAM.
///
/// Header blocks may arrive in any order relative to each other and to
/// the control stream. A block whose largest reference is not covered yet
/// is parked; feeding control bytes re-examines all parked blocks and
/// returns the ones that became decodable, so one blocked request never
/// delays another. Finished and cancelled blocks are reported to the peer
/// through the decoder instruction stream.
pub struct QcramDecoder {
    table: DynamicTable,
    /// The capacity the peer is allowed to claim on the control stream.
    max_capacity: usize,
    max_blocked: usize,
    inst_state: Option<InstDecodeState>,
    parked: HashMap<u64, ParkedBlock>,
    decoder_stream: Vec<u8>,
}

impl QcramDecoder {
    /// Creates a `QcramDecoder` whose peer may use up to `capacity` bytes
    /// of dynamic table and park at most `max_blocked` blocks.
    pub fn new(capacity: usize, max_blocked: usize) -> Self {
        Self {
            table: DynamicTable::with_capacity(capacity),
            max_capacity: capacity,
            max_blocked,
            inst_state: None,
            parked: HashMap::new(),
            decoder_stream: Vec::new(),
        }
    }

    /// Decodes the header block of `request_id`, or parks it when its
    /// largest reference is beyond the control stream progress. Parking
    /// more than `max_blocked` blocks is fatal.
    pub fn decode_block(
        &mut self,
        request_id: u64,
        block: &[u8],
    ) -> Result<Option<Vec<HeaderField>>, HcError> {
        let mut buf = block;
        let largest_ref = read_integer(&mut buf, 0xff)?;
        if largest_ref > self.table.insert_count() {
            if self.parked.len() >= self.max_blocked {
                return Err(HcError::BlockedStreamLimit);
            }
            self.parked.insert(
                request_id,
                ParkedBlock {
                    largest_ref,
                    body: buf.to_vec(),
                },
            );
            return Ok(None);
        }
        self.decode_body(request_id, largest_ref, buf).map(Some)
    }

    /// Applies a chunk of control stream bytes in order, then decodes and
    /// returns every parked block the new table state satisfies.
    pub fn read_control(&mut self, buf: &[u8]) -> Result<Vec<DecodedBlock>, HcError> {
        let mut cursor = buf;
        let mut state = self.inst_state.take();
        while let Some(inst) = ControlDecoder::decode(&mut cursor, &mut state)? {
            match inst {
                ControlInstruction::SetCapacity { capacity } => {
                    if capacity > self.max_capacity as u64 {
                        return Err(HcError::CapacityChangeRejected);
                    }
                    self.table.set_capacity(capacity as usize);
                }
                ControlInstruction::Insert { name, value } => {
                    let name = self.resolve_insert_name(name)?;
                    self.table.insert(HeaderField::new(name, value));
                }
            }
        }
        self.inst_state = state;
        self.drain_unblocked()
    }

    /// Discards the parked block of a cancelled request, if any, and
    /// tells the peer so it releases the request's pins. Idempotent.
    pub fn cancel(&mut self, request_id: u64) -> Result<(), HcError> {
        self.parked.remove(&request_id);
        write_cancel(&mut self.decoder_stream, request_id)
    }

    /// Takes the accumulated decoder stream bytes (acknowledgments and
    /// cancellations) destined for the peer's encoder.
    pub fn take_decoder_instructions(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.decoder_stream)
    }

    /// The number of blocks currently parked.
    pub fn blocked(&self) -> usize {
        self.parked.len()
    }

    fn drain_unblocked(&mut self) -> Result<Vec<DecodedBlock>, HcError> {
        let insert_count = self.table.insert_count();
        let mut ready = self
            .parked
            .iter()
            .filter(|(_, block)| block.largest_ref <= insert_count)
            .map(|(id, _)| *id)
            .collect::<Vec<_>>();
        ready.sort_unstable();

        let mut decoded = Vec::with_capacity(ready.len());
        for request_id in ready {
            let block = self.parked.remove(&request_id).unwrap();
            let fields = self.decode_body(request_id, block.largest_ref, &block.body)?;
            decoded.push(DecodedBlock { request_id, fields });
        }
        Ok(decoded)
    }

    fn decode_body(
        &mut self,
        request_id: u64,
        largest_ref: u64,
        body: &[u8],
    ) -> Result<Vec<HeaderField>, HcError> {
        let mut buf = body;
        let mut guard = PseudoGuard::new();
        let mut fields = Vec::new();
        while !buf.is_empty() {
            match read_representation(&mut buf)? {
                Representation::Indexed { index } => {
                    let field = self.resolve_field(index, largest_ref)?;
                    guard.check(field.name())?;
                    fields.push(field);
                }
                Representation::IndexedName { index, value } => {
                    let name = self.resolve_field_name(index, largest_ref)?;
                    guard.check(&name)?;
                    fields.push(HeaderField::new(name, value));
                }
                Representation::Literal { name, value } => {
                    guard.check(&name)?;
                    fields.push(HeaderField::new(name, value));
                }
                Representation::NeverIndexed { name, value } => {
                    let name = match name {
                        Name::Index(index) => self.resolve_field_name(index, largest_ref)?,
                        Name::Literal(octets) => octets,
                    };
                    guard.check(&name)?;
                    fields.push(HeaderField::sensitive(name, value));
                }
            }
        }
        write_ack(&mut self.decoder_stream, request_id)?;
        Ok(fields)
    }

    /// Resolves a wire index against the static table or, through the
    /// block's largest reference, the dynamic table.
    fn resolve_field(&self, index: usize, largest_ref: u64) -> Result<HeaderField, HcError> {
        if index <= STATIC_TABLE_LEN {
            return static_table::field(index)
                .map(|(name, value)| HeaderField::new(name, value))
                .ok_or(HcError::TableIndexOutOfRange);
        }
        self.table
            .get(Self::absolute(index, largest_ref)?)
            .cloned()
            .ok_or(HcError::TableIndexOutOfRange)
    }

    fn resolve_field_name(&self, index: usize, largest_ref: u64) -> Result<Vec<u8>, HcError> {
        if index <= STATIC_TABLE_LEN {
            return static_table::field_name(index)
                .map(|name| name.to_vec())
                .ok_or(HcError::TableIndexOutOfRange);
        }
        self.table
            .get(Self::absolute(index, largest_ref)?)
            .map(|field| field.name().to_vec())
            .ok_or(HcError::TableIndexOutOfRange)
    }

    fn absolute(index: usize, largest_ref: u64) -> Result<u64, HcError> {
        largest_ref
            .checked_sub((index - 62) as u64)
            .filter(|abs| *abs >= 1)
            .ok_or(HcError::TableIndexOutOfRange)
    }

    /// Resolves the name of an insert instruction. Dynamic name indices
    /// are relative to the newest entry at this point of the control
    /// stream.
    fn resolve_insert_name(&self, name: InstName) -> Result<Vec<u8>, HcError> {
        match name {
            InstName::Literal(octets) => Ok(octets),
            InstName::Index(index) => {
                if index == 0 {
                    return Err(HcError::InvalidFrame);
                }
                if index <= STATIC_TABLE_LEN as u64 {
                    return static_table::field_name(index as usize)
                        .map(|name| name.to_vec())
                        .ok_or(HcError::TableIndexOutOfRange);
                }
                let abs = self
                    .table
                    .insert_count()
                    .checked_sub(index - 62)
                    .filter(|abs| *abs >= 1)
                    .ok_or(HcError::TableIndexOutOfRange)?;
                self.table
                    .get(abs)
                    .map(|field| field.name().to_vec())
                    .ok_or(HcError::TableIndexOutOfRange)
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn table(&self) -> &DynamicTable {
        &self.table
    }
}
