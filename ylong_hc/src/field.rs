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

//! Header field model shared by the codecs.
//!
//! Names and values are opaque byte strings compared byte-exact. By
//! convention names are lowercase ASCII, but the codecs do not enforce it.

use crate::error::HcError;

/// A single header field: a name, a value and a sensitivity flag.
///
/// A sensitive field is never inserted into a dynamic table and never
/// encoded through a representation that would index its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    name: Vec<u8>,
    value: Vec<u8>,
    sensitive: bool,
}

impl HeaderField {
    /// Creates a non-sensitive `HeaderField`.
    pub fn new(name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            sensitive: false,
        }
    }

    /// Creates a sensitive `HeaderField`.
    pub fn sensitive(name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            sensitive: true,
        }
    }

    pub fn name(&self) -> &[u8] {
        &self.name
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn is_sensitive(&self) -> bool {
        self.sensitive
    }

    /// Returns whether the field is a pseudo-header, i.e. its name starts
    /// with b':'.
    pub fn is_pseudo(&self) -> bool {
        self.name.first() == Some(&b':')
    }

    /// The size an entry holding this field occupies in a dynamic table.
    ///
    /// RFC7541-4.1: The additional 32 octets account for an estimated
    /// overhead associated with an entry.
    pub fn size(&self) -> usize {
        self.name.len() + self.value.len() + 32
    }
}

/// Per-block pseudo-header ordering guard. Pseudo-headers must precede all
/// regular fields within a block; the check resets between blocks.
pub(crate) struct PseudoGuard {
    saw_regular: bool,
}

impl PseudoGuard {
    pub(crate) fn new() -> Self {
        Self { saw_regular: false }
    }

    pub(crate) fn check(&mut self, name: &[u8]) -> Result<(), HcError> {
        if name.first() == Some(&b':') {
            if self.saw_regular {
                return Err(HcError::PseudoHeaderOrdering);
            }
        } else {
            self.saw_regular = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod ut_field {
    use super::{HeaderField, PseudoGuard};
    use crate::error::HcError;

    /// UT test cases for `HeaderField::size`.
    ///
    /// # Brief
    /// 1. Creates `HeaderField`s of various name and value lengths.
    /// 2. Checks that the entry size follows the fixed-overhead formula.
    #[test]
    fn ut_header_field_size() {
        let field = HeaderField::new(*b"custom-key", *b"custom-header");
        assert_eq!(field.size(), 55);

        let field = HeaderField::new(*b":authority", *b"www.example.com");
        assert_eq!(field.size(), 57);

        let field = HeaderField::new(*b"", *b"");
        assert_eq!(field.size(), 32);
    }

    /// UT test cases for `HeaderField::is_pseudo`.
    ///
    /// # Brief
    /// 1. Creates pseudo and regular `HeaderField`s.
    /// 2. Checks the pseudo-header predicate.
    #[test]
    fn ut_header_field_is_pseudo() {
        assert!(HeaderField::new(*b":method", *b"GET").is_pseudo());
        assert!(!HeaderField::new(*b"cookie", *b"a=b").is_pseudo());
        assert!(!HeaderField::new(*b"", *b"").is_pseudo());
    }

    /// UT test cases for `PseudoGuard`.
    ///
    /// # Brief
    /// 1. Feeds a guard a legal sequence, then an illegal one.
    /// 2. Checks that only a pseudo-header after a regular header fails.
    #[test]
    fn ut_pseudo_guard() {
        let mut guard = PseudoGuard::new();
        assert!(guard.check(b":method").is_ok());
        assert!(guard.check(b":path").is_ok());
        assert!(guard.check(b"accept").is_ok());
        assert!(guard.check(b"cookie").is_ok());
        assert_eq!(guard.check(b":scheme"), Err(HcError::PseudoHeaderOrdering));

        let mut guard = PseudoGuard::new();
        assert!(guard.check(b"accept").is_ok());
        assert_eq!(guard.check(b":method"), Err(HcError::PseudoHeaderOrdering));
    }
}
