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

//! QCRAM implementation.
//!
//! QCRAM splits HPACK across two channels so header blocks can be decoded
//! out of order:
//!
//! - A per-connection, totally ordered **control stream** carries every
//!   dynamic table mutation: insertions and capacity changes. Because both
//!   peers process it in arrival order, insertions commit in the same
//!   order on both sides.
//! - Each **header block** starts with a varint *largest reference*, the
//!   highest dynamic table index it depends on, followed by
//!   representations that only reference tables or carry literals.
//!
//! A block whose largest reference is beyond the local insert count is
//! parked until the control stream catches up; parked blocks never delay
//! each other. The decoder reports finished and cancelled blocks back on
//! its own instruction stream, and the encoder pins every referenced entry
//! until that acknowledgment arrives, so no entry is evicted while a block
//! in flight still needs it.

pub(crate) mod instruction;
pub(crate) mod representation;
pub(crate) mod table;

mod decoder;
mod encoder;

pub use decoder::{DecodedBlock, QcramDecoder};
pub use encoder::{EncodedBlock, QcramEncoder};
