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

//! The [`Dynamic Table`][dynamic_table] implementation of [HPACK].
//!
//! [dynamic_table]: https://httpwg.org/specs/rfc7541.html#dynamic.table
//! [HPACK]: https://httpwg.org/specs/rfc7541.html
//!
//! # Introduction
//! The dynamic table is a list of header fields maintained in first-in,
//! first-out order. The newest entry has the lowest index, the oldest the
//! highest; inserting shifts every index up by one and evicting removes
//! from the high end. The table may contain duplicate entries.
//!
//! The table is size-bounded: the sum of its entry sizes never exceeds the
//! configured capacity, and inserting evicts from the oldest end until the
//! new entry fits.

use std::collections::VecDeque;

use crate::field::HeaderField;
use crate::static_table;
use crate::static_table::TableIndex;

/// `TableSearcher` resolves indices and finds fields across the combined
/// index space: 1 to 61 address the static table, 62 and up address the
/// dynamic table from its newest entry.
pub(crate) struct TableSearcher<'a> {
    dynamic: &'a DynamicTable,
}

impl<'a> TableSearcher<'a> {
    pub(crate) fn new(dynamic: &'a DynamicTable) -> Self {
        Self { dynamic }
    }

    /// Resolves an index into a full field.
    pub(crate) fn field(&self, index: usize) -> Option<HeaderField> {
        if index <= static_table::STATIC_TABLE_LEN {
            static_table::field(index).map(|(name, value)| HeaderField::new(name, value))
        } else {
            self.dynamic.field(index - 62).cloned()
        }
    }

    /// Resolves an index into a field name.
    pub(crate) fn field_name(&self, index: usize) -> Option<Vec<u8>> {
        if index <= static_table::STATIC_TABLE_LEN {
            static_table::field_name(index).map(|name| name.to_vec())
        } else {
            self.dynamic
                .field(index - 62)
                .map(|field| field.name().to_vec())
        }
    }

    /// Searches both tables for the given field. A full match anywhere
    /// beats a name-only match; the static table wins ties because its
    /// indices are lower.
    pub(crate) fn find(&self, name: &[u8], value: &[u8]) -> Option<TableIndex> {
        let in_static = static_table::find(name, value);
        if let Some(TableIndex::Field(_)) = in_static {
            return in_static;
        }
        match self.dynamic.find(name, value) {
            Some(TableIndex::Field(k)) => Some(TableIndex::Field(k + 62)),
            in_dynamic => in_static.or(match in_dynamic {
                Some(TableIndex::FieldName(k)) => Some(TableIndex::FieldName(k + 62)),
                _ => None,
            }),
        }
    }

    /// Searches both tables for a name match only, regardless of values.
    pub(crate) fn find_name(&self, name: &[u8]) -> Option<usize> {
        match static_table::find(name, b"") {
            Some(TableIndex::Field(n)) | Some(TableIndex::FieldName(n)) => Some(n),
            None => self.dynamic.find_name(name).map(|k| k + 62),
        }
    }
}

pub(crate) struct DynamicTable {
    queue: VecDeque<HeaderField>,
    used: usize,
    capacity: usize,
}

impl DynamicTable {
    /// Creates a `DynamicTable` with the given byte capacity.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            used: 0,
            capacity,
        }
    }

    pub(crate) fn used(&self) -> usize {
        self.used
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    /// Gets an entry by its 0-based distance from the newest entry.
    pub(crate) fn field(&self, k: usize) -> Option<&HeaderField> {
        self.queue.get(k)
    }

    /// Prepends an entry, evicting from the oldest end until it fits. An
    /// entry larger than the whole capacity empties the table and is
    /// dropped itself.
    pub(crate) fn insert(&mut self, field: HeaderField) {
        self.used += field.size();
        self.queue.push_front(field);
        self.fit_size();
        self.assert_size();
    }

    /// Changes the capacity, evicting from the oldest end until the table
    /// fits. Zero empties the table.
    pub(crate) fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.fit_size();
        self.assert_size();
    }

    fn fit_size(&mut self) {
        while self.used > self.capacity && !self.queue.is_empty() {
            let evicted = self.queue.pop_back().unwrap();
            self.used -= evicted.size();
        }
    }

    fn assert_size(&self) {
        debug_assert!(self.used <= self.capacity || self.queue.is_empty());
        debug_assert_eq!(
            self.used,
            self.queue.iter().map(HeaderField::size).sum::<usize>()
        );
    }

    /// Searches the table, returning the 0-based position of the best
    /// match. The newest full match wins; name-only matches also prefer
    /// the newest entry.
    fn find(&self, name: &[u8], value: &[u8]) -> Option<TableIndex> {
        let mut name_match = None;
        for (k, field) in self.queue.iter().enumerate() {
            if field.name() == name {
                if field.value() == value {
                    return Some(TableIndex::Field(k));
                }
                if name_match.is_none() {
                    name_match = Some(TableIndex::FieldName(k));
                }
            }
        }
        name_match
    }

    fn find_name(&self, name: &[u8]) -> Option<usize> {
        self.queue.iter().position(|field| field.name() == name)
    }
}
