// Copyright 2026 The Matrix.org Foundation C.I.C.
//
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

//! Record identity and the directory seam towards the record layer.
//!
//! Records themselves are opaque to this crate: unification only needs
//! their identity, their kind, a liveness probe, and a way to repoint
//! record→main-text bindings when a private body is swapped for a shared
//! one.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use strum_macros::{AsRefStr, Display};

use crate::main_text::SharedMainText;

/// Stable identity of a domain record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What kind of record a [`RecordRef`] points at.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum RecordKind {
    /// An ordinary domain record carrying a main text.
    Entry,
    /// The record owning a hub; not itself unifiable further.
    TextHub,
}

/// Identity plus kind — everything unification needs to know about a
/// record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RecordRef {
    pub id: RecordId,
    pub kind: RecordKind,
}

impl RecordRef {
    pub fn new(id: u64, kind: RecordKind) -> Self {
        Self {
            id: RecordId(id),
            kind,
        }
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// The collaborator seam towards the record layer: identity resolution,
/// liveness, and main-text binding maintenance.
pub trait RecordDirectory {
    /// Whether the record no longer resolves to live content.
    fn is_empty(&self, id: RecordId) -> bool;

    /// The kind the record currently resolves to, if it exists at all.
    fn kind_of(&self, id: RecordId) -> Option<RecordKind>;

    /// Repoint every record→main-text binding from `old` to `new`. Called
    /// when a connector swaps its private body for a hub's shared one (and
    /// back again on disunite), so external indexes keep resolving.
    fn replace_main_text(&mut self, old: &SharedMainText, new: &SharedMainText);
}

/// In-memory [`RecordDirectory`] used by tests and simple embedders.
#[derive(Default)]
pub struct MemoryDirectory {
    records: HashMap<RecordId, DirectoryEntry>,
}

struct DirectoryEntry {
    kind: RecordKind,
    live: bool,
    main_text: Option<SharedMainText>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: RecordRef) {
        self.records.insert(
            record.id,
            DirectoryEntry {
                kind: record.kind,
                live: true,
                main_text: None,
            },
        );
    }

    /// Mark a record deleted. `is_empty` reports true for it afterwards.
    pub fn delete(&mut self, id: RecordId) {
        if let Some(entry) = self.records.get_mut(&id) {
            entry.live = false;
        }
    }

    pub fn bind_main_text(&mut self, id: RecordId, text: &SharedMainText) {
        if let Some(entry) = self.records.get_mut(&id) {
            entry.main_text = Some(text.clone());
        }
    }

    pub fn main_text_of(&self, id: RecordId) -> Option<SharedMainText> {
        self.records.get(&id).and_then(|e| e.main_text.clone())
    }
}

impl RecordDirectory for MemoryDirectory {
    fn is_empty(&self, id: RecordId) -> bool {
        !self.records.get(&id).map_or(false, |e| e.live)
    }

    fn kind_of(&self, id: RecordId) -> Option<RecordKind> {
        self.records.get(&id).map(|e| e.kind)
    }

    fn replace_main_text(
        &mut self,
        old: &SharedMainText,
        new: &SharedMainText,
    ) {
        for entry in self.records.values_mut() {
            if let Some(bound) = &entry.main_text {
                if Rc::ptr_eq(bound, old) {
                    entry.main_text = Some(new.clone());
                }
            }
        }
    }
}
