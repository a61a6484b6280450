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

//! The QCRAM dynamic table.
//!
//! Unlike HPACK's table this one is addressed absolutely: every inserted
//! entry keeps the 1-based insertion number it was given for its whole
//! life, and `insert_count`/`evict_count` delimit the live range. An
//! entry's position in the queue is always recomputed from those counters,
//! never stored, because eviction shifts positions but not numbers.
//!
//! Entries referenced by unacknowledged header blocks are pinned: the
//! encoder passes an eviction fence below which entries may still be
//! evicted, and refuses mutations that would have to cross it.

use std::collections::VecDeque;

use crate::field::HeaderField;

/// The position of a dynamic table match, in absolute insertion numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TableMatch {
    Field(u64),
    FieldName(u64),
}

pub(crate) struct DynamicTable {
    /// Live entries, oldest at the front.
    queue: VecDeque<HeaderField>,
    used: usize,
    capacity: usize,
    insert_count: u64,
    evict_count: u64,
}

impl DynamicTable {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            used: 0,
            capacity,
            insert_count: 0,
            evict_count: 0,
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

    /// The absolute index of the newest entry ever inserted.
    pub(crate) fn insert_count(&self) -> u64 {
        self.insert_count
    }

    /// Gets a live entry by its absolute index.
    pub(crate) fn get(&self, index: u64) -> Option<&HeaderField> {
        if index <= self.evict_count || index > self.insert_count {
            return None;
        }
        self.queue.get((index - self.evict_count - 1) as usize)
    }

    /// Appends an entry, evicting from the oldest end until the table
    /// fits, and returns its absolute index. An entry larger than the
    /// whole capacity empties the table and is dropped itself, but still
    /// consumes an insertion number so both peers keep counting in step.
    pub(crate) fn insert(&mut self, field: HeaderField) -> u64 {
        self.used += field.size();
        self.queue.push_back(field);
        self.insert_count += 1;
        self.fit_size();
        self.assert_size();
        self.insert_count
    }

    /// Changes the capacity, evicting from the oldest end until the table
    /// fits. Zero empties the table.
    pub(crate) fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.fit_size();
        self.assert_size();
    }

    /// Whether an entry of `size` bytes can be inserted while evicting
    /// only entries below the `fence` (exclusive). The entry must also fit
    /// in the table on its own.
    pub(crate) fn can_insert(&self, size: usize, fence: u64) -> bool {
        size <= self.capacity && self.can_free(self.capacity - size, fence)
    }

    /// Whether the table can shrink to `capacity` while evicting only
    /// entries below the `fence`.
    pub(crate) fn can_set_capacity(&self, capacity: usize, fence: u64) -> bool {
        self.can_free(capacity, fence)
    }

    /// Whether evicting oldest-first down to `target` used bytes stays
    /// below the fence.
    fn can_free(&self, target: usize, fence: u64) -> bool {
        let mut used = self.used;
        for (n, field) in self.queue.iter().enumerate() {
            if used <= target {
                break;
            }
            if self.evict_count + 1 + n as u64 >= fence {
                return false;
            }
            used -= field.size();
        }
        used <= target
    }

    fn fit_size(&mut self) {
        while self.used > self.capacity && !self.queue.is_empty() {
            let evicted = self.queue.pop_front().unwrap();
            self.used -= evicted.size();
            self.evict_count += 1;
        }
    }

    fn assert_size(&self) {
        debug_assert!(self.used <= self.capacity || self.queue.is_empty());
        debug_assert_eq!(
            self.used,
            self.queue.iter().map(HeaderField::size).sum::<usize>()
        );
        debug_assert_eq!(
            self.queue.len() as u64,
            self.insert_count - self.evict_count
        );
    }

    /// Searches the table for the given field, preferring the newest
    /// match of each kind.
    pub(crate) fn find(&self, name: &[u8], value: &[u8]) -> Option<TableMatch> {
        let mut name_match = None;
        for (n, field) in self.queue.iter().enumerate().rev() {
            let index = self.evict_count + 1 + n as u64;
            if field.name() == name {
                if field.value() == value {
                    return Some(TableMatch::Field(index));
                }
                if name_match.is_none() {
                    name_match = Some(TableMatch::FieldName(index));
                }
            }
        }
        name_match
    }

    /// Searches for the newest entry with the given name.
    pub(crate) fn find_name(&self, name: &[u8]) -> Option<u64> {
        self.queue
            .iter()
            .enumerate()
            .rev()
            .find(|(_, field)| field.name() == name)
            .map(|(n, _)| self.evict_count + 1 + n as u64)
    }
}

#[cfg(test)]
mod ut_qcram_table {
    use super::{DynamicTable, TableMatch};
    use crate::field::HeaderField;

    /// UT test cases for absolute indexing.
    ///
    /// # Brief
    /// 1. Inserts entries and evicts some through a tight capacity.
    /// 2. Checks that surviving entries keep their insertion numbers.
    #[test]
    fn ut_qcram_table_absolute_index() {
        let mut table = DynamicTable::with_capacity(64);
        assert_eq!(table.insert(HeaderField::new(*b"one", *b"1")), 1);
        assert_eq!(table.insert(HeaderField::new(*b"two", *b"2")), 2);
        // "one" was evicted to make room.
        assert_eq!(table.len(), 1);
        assert_eq!(table.insert_count(), 2);
        assert!(table.get(1).is_none());
        assert_eq!(table.get(2).unwrap().name(), b"two");
        assert!(table.get(3).is_none());
        assert!(table.get(0).is_none());
    }

    /// UT test cases for oversized inserts.
    ///
    /// # Brief
    /// 1. Inserts an entry larger than the whole capacity.
    /// 2. Checks that the table empties but the insertion number is still
    ///    consumed.
    #[test]
    fn ut_qcram_table_oversized_insert() {
        let mut table = DynamicTable::with_capacity(40);
        assert_eq!(table.insert(HeaderField::new(*b"one", *b"1")), 1);
        assert_eq!(table.insert(HeaderField::new(*b"oversized", *b"0123456789")), 2);
        assert_eq!(table.len(), 0);
        assert_eq!(table.used(), 0);
        assert_eq!(table.insert_count(), 2);
        assert!(table.get(2).is_none());
    }

    /// UT test cases for the eviction fence.
    ///
    /// # Brief
    /// 1. Fills a table, then asks whether inserts and capacity changes
    ///    can proceed under different fences.
    /// 2. Checks that evictions never cross the fence.
    #[test]
    fn ut_qcram_table_fence() {
        let mut table = DynamicTable::with_capacity(72);
        table.insert(HeaderField::new(*b"one", *b"1"));
        table.insert(HeaderField::new(*b"two", *b"2"));
        assert_eq!(table.used(), 72);

        // Inserting 36 more bytes must evict entry 1.
        assert!(table.can_insert(36, u64::MAX));
        assert!(table.can_insert(36, 2));
        assert!(!table.can_insert(36, 1));
        // An entry that cannot fit alone is never insertable.
        assert!(!table.can_insert(73, u64::MAX));

        // Shrinking to one entry evicts entry 1; to zero evicts both.
        assert!(table.can_set_capacity(36, 2));
        assert!(!table.can_set_capacity(36, 1));
        assert!(!table.can_set_capacity(0, 2));
        assert!(table.can_set_capacity(0, 3));
    }

    /// UT test cases for `find` and `find_name`.
    ///
    /// # Brief
    /// 1. Inserts duplicate names and searches for fields and names.
    /// 2. Checks that the newest match wins.
    #[test]
    fn ut_qcram_table_find() {
        let mut table = DynamicTable::with_capacity(4096);
        table.insert(HeaderField::new(*b"x-key", *b"a"));
        table.insert(HeaderField::new(*b"x-key", *b"b"));
        table.insert(HeaderField::new(*b"other", *b"c"));

        assert_eq!(table.find(b"x-key", b"a"), Some(TableMatch::Field(1)));
        assert_eq!(table.find(b"x-key", b"b"), Some(TableMatch::Field(2)));
        assert_eq!(table.find(b"x-key", b"z"), Some(TableMatch::FieldName(2)));
        assert_eq!(table.find(b"missing", b""), None);
        assert_eq!(table.find_name(b"x-key"), Some(2));
        assert_eq!(table.find_name(b"other"), Some(3));
    }
}
