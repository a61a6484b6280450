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

//! Error classification of the header compression codecs.
//!
//! Every error in this crate is fatal for the connection that produced it:
//! dynamic table consistency depends on synchronous progress on the byte
//! streams, so no representation may be skipped or retried. The codecs
//! classify the failure and return it; closing the transport with a
//! protocol error code is the caller's responsibility.

use thiserror::Error;

/// Errors returned by the `HPACK` and `QCRAM` codecs.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HcError {
    /// A block or instruction byte does not begin a complete, well-formed
    /// representation, or the input ended in the middle of one.
    #[error("invalid frame")]
    InvalidFrame,

    /// A bit pattern that is defined by neither the block grammar nor the
    /// instruction grammar of the codec that read it.
    #[error("unsupported representation")]
    UnsupportedRepresentation,

    /// A prefixed integer does not fit in 64 bits.
    #[error("integer overflow")]
    IntegerOverflow,

    /// A Huffman-coded string walked off the code tree or ended with
    /// invalid padding.
    #[error("invalid huffman coding")]
    InvalidHuffmanCoding,

    /// A regular header field preceded a pseudo-header field within one
    /// block.
    #[error("pseudo-header after regular header")]
    PseudoHeaderOrdering,

    /// A reference to a table slot that is not (or not yet) populated.
    #[error("table index out of range")]
    TableIndexOutOfRange,

    /// The encoder cannot evict an entry that is pinned by an
    /// unacknowledged header block.
    #[error("dynamic table blocked")]
    DynamicTableBlocked,

    /// A dynamic table capacity change was requested at a point where it
    /// cannot take effect.
    #[error("capacity change rejected")]
    CapacityChangeRejected,

    /// The number of header blocks waiting for control stream progress
    /// exceeded the configured limit.
    #[error("blocked stream limit exceeded")]
    BlockedStreamLimit,
}
