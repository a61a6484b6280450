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

//! The constant 61-entry static table defined by RFC7541 Appendix A.
//!
//! Indices are 1-based and identical across peers. Both codecs resolve
//! indices below 62 into this table and everything above it into their
//! dynamic tables.

/// The position of a table match: a full field match or a name-only match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TableIndex {
    Field(usize),
    FieldName(usize),
}

pub(crate) const STATIC_TABLE_LEN: usize = 61;

static STATIC_TABLE: [(&[u8], &[u8]); STATIC_TABLE_LEN] = [
    (b":authority", b""),
    (b":method", b"GET"),
    (b":method", b"POST"),
    (b":path", b"/"),
    (b":path", b"/index.html"),
    (b":scheme", b"http"),
    (b":scheme", b"https"),
    (b":status", b"200"),
    (b":status", b"204"),
    (b":status", b"206"),
    (b":status", b"304"),
    (b":status", b"400"),
    (b":status", b"404"),
    (b":status", b"500"),
    (b"accept-charset", b""),
    (b"accept-encoding", b"gzip, deflate"),
    (b"accept-language", b""),
    (b"accept-ranges", b""),
    (b"accept", b""),
    (b"access-control-allow-origin", b""),
    (b"age", b""),
    (b"allow", b""),
    (b"authorization", b""),
    (b"cache-control", b""),
    (b"content-disposition", b""),
    (b"content-encoding", b""),
    (b"content-language", b""),
    (b"content-length", b""),
    (b"content-location", b""),
    (b"content-range", b""),
    (b"content-type", b""),
    (b"cookie", b""),
    (b"date", b""),
    (b"etag", b""),
    (b"expect", b""),
    (b"expires", b""),
    (b"from", b""),
    (b"host", b""),
    (b"if-match", b""),
    (b"if-modified-since", b""),
    (b"if-none-match", b""),
    (b"if-range", b""),
    (b"if-unmodified-since", b""),
    (b"last-modified", b""),
    (b"link", b""),
    (b"location", b""),
    (b"max-forwards", b""),
    (b"proxy-authenticate", b""),
    (b"proxy-authorization", b""),
    (b"range", b""),
    (b"referer", b""),
    (b"refresh", b""),
    (b"retry-after", b""),
    (b"server", b""),
    (b"set-cookie", b""),
    (b"strict-transport-security", b""),
    (b"transfer-encoding", b""),
    (b"user-agent", b""),
    (b"vary", b""),
    (b"via", b""),
    (b"www-authenticate", b""),
];

/// Gets a field by its 1-based index.
pub(crate) fn field(index: usize) -> Option<(&'static [u8], &'static [u8])> {
    match index {
        1..=STATIC_TABLE_LEN => Some(STATIC_TABLE[index - 1]),
        _ => None,
    }
}

/// Gets a field name by its 1-based index.
pub(crate) fn field_name(index: usize) -> Option<&'static [u8]> {
    field(index).map(|(name, _)| name)
}

/// Searches the table for the given field. A full match always wins over a
/// name-only match; among matches of the same kind the lowest index wins,
/// because it encodes in the fewest bytes.
pub(crate) fn find(name: &[u8], value: &[u8]) -> Option<TableIndex> {
    let mut name_match = None;
    for (n, (entry_name, entry_value)) in STATIC_TABLE.iter().enumerate() {
        if *entry_name == name {
            if *entry_value == value {
                return Some(TableIndex::Field(n + 1));
            }
            if name_match.is_none() {
                name_match = Some(TableIndex::FieldName(n + 1));
            }
        }
    }
    name_match
}
