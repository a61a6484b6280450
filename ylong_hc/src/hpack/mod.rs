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

//! [HPACK] implementation.
//!
//! [HPACK]: https://httpwg.org/specs/rfc7541.html
//!
//! # Introduction
//! HPACK eliminates redundant header fields between the messages of one
//! connection. Encoder and decoder each hold a dynamic table of recently
//! transmitted fields; because every representation of a block is processed
//! strictly in order on a single byte stream, both tables evolve in
//! lockstep and an index on the wire means the same entry to both peers.
//!
//! The format is intentionally simple and inflexible: a block is a plain
//! concatenation of representations, each either an index into the tables
//! or a literal, optionally inserting the field into the dynamic table.
//! Sensitive fields use a representation that forbids indexing, so their
//! values cannot be probed through the shared compression state.

mod decoder;
mod encoder;
mod representation;
pub(crate) mod table;

pub use decoder::HpackDecoder;
pub use encoder::HpackEncoder;
