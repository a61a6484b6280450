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

#![allow(dead_code)]

//! `ylong_hc` provides the header compression components used by `HTTP/2`-
//! and `HTTP/3`-style protocol stacks.
//!
//! # Supported codecs
//! - [`HPACK`]: a synchronous per-block codec. Encoder and decoder share one
//!   dynamic table which stays consistent because representations are
//!   processed strictly in order on a single byte stream.
//! - `QCRAM`: an asynchronous codec. Dynamic table mutations travel on a
//!   dedicated control stream and header blocks reference the table by
//!   index, so blocks can be decoded out of order once the control stream
//!   has caught up with the block's largest reference.
//!
//! Both codecs share the prefixed integer format, the string literal format,
//! the static table and the Huffman code defined by [`HPACK`].
//!
//! [`HPACK`]: https://httpwg.org/specs/rfc7541.html

mod bitio;
mod error;
mod field;
mod huffman;
mod integer;
mod static_table;
mod strings;

#[cfg(feature = "hpack")]
pub mod hpack;

#[cfg(feature = "qcram")]
pub mod qcram;

pub(crate) mod util;

pub use error::HcError;
pub use field::HeaderField;
pub use strings::HuffmanChoice;
