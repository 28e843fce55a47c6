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

use std::cell::{Cell, RefCell};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::main_text::{MainText, SharedMainText};
use crate::unify::{
    DisuniteOutcome, Hub, ProcessingContext, RecordDirectory, RecordKind,
    RecordRef, UnifyError,
};

/// The per-record adapter binding one domain record to a main text and,
/// optionally, to a [`Hub`].
///
/// A connector always holds exactly one main text. Standalone, that text
/// is private; unified, it is the hub's shared one — the two states are
/// distinguished by `hub` being `None` or `Some`.
pub struct Connector {
    record: RecordRef,
    main_text: RefCell<SharedMainText>,
    hub: RefCell<Option<Rc<Hub>>>,
    /// Reentrancy flag breaking the hub ↔ spoke notification cycle.
    /// Per-connector, so independent unification groups can be edited in
    /// one pass.
    notifying: Cell<bool>,
    /// Modification bookkeeping for the owning record.
    modifications: Cell<u64>,
}

impl Connector {
    /// Create a standalone connector owning a fresh private main text.
    pub fn new(record: RecordRef) -> Rc<Self> {
        Self::with_main_text(record, MainText::new().into_shared())
    }

    pub fn with_main_text(
        record: RecordRef,
        main_text: SharedMainText,
    ) -> Rc<Self> {
        Rc::new(Self {
            record,
            main_text: RefCell::new(main_text),
            hub: RefCell::new(None),
            notifying: Cell::new(false),
            modifications: Cell::new(0),
        })
    }

    /// The record this connector speaks for.
    pub fn record(&self) -> RecordRef {
        self.record
    }

    pub fn hub(&self) -> Option<Rc<Hub>> {
        self.hub.borrow().clone()
    }

    pub fn has_hub(&self) -> bool {
        self.hub.borrow().is_some()
    }

    /// The main text, shared by reference.
    pub fn main_text(&self) -> SharedMainText {
        self.main_text.borrow().clone()
    }

    /// How many times this record has been marked modified.
    pub fn modification_count(&self) -> u64 {
        self.modifications.get()
    }

    /// Mark the owning record modified, fanning the notification out to
    /// the hub (and transitively to every other unified spoke).
    ///
    /// No-op while a bulk conversion is in progress — bulk operations run
    /// their own consistency pass and must not trigger per-record
    /// cascades. No-op while this connector is already notifying: that
    /// breaks the mutual recursion a hub ↔ spoke cycle would otherwise
    /// produce.
    pub fn modify_now(&self, ctx: &ProcessingContext) {
        if ctx.bulk_conversion_active() {
            return;
        }
        if self.notifying.get() {
            return;
        }
        self.notifying.set(true);
        let hub = self.hub.borrow().clone();
        if let Some(hub) = hub {
            hub.modify_now(ctx);
        }
        self.modifications.set(self.modifications.get() + 1);
        self.notifying.set(false);
    }

    /// Repair pointers after a bulk load.
    ///
    /// A hub whose record no longer resolves to live content is safely
    /// cleared — ownership becomes standalone. A hub whose record
    /// resolves to the wrong kind is a fatal internal-consistency
    /// failure: the load that triggered it must abort.
    pub fn resolve_pointers(
        &self,
        directory: &dyn RecordDirectory,
    ) -> Result<(), UnifyError> {
        let hub = self.hub.borrow().clone();
        if let Some(hub) = hub {
            let hub_record = hub.record();
            if directory.is_empty(hub_record.id) {
                log::warn!(
                    "hub record {hub_record} is gone; \
                     record {} becomes standalone",
                    self.record
                );
                *self.hub.borrow_mut() = None;
            } else {
                match directory.kind_of(hub_record.id) {
                    Some(RecordKind::TextHub) => {}
                    resolved => {
                        return Err(UnifyError::ReferentialIntegrity {
                            record: self.record,
                            detail: format!(
                                "hub pointer resolves to {resolved:?} \
                                 instead of a text hub"
                            ),
                        });
                    }
                }
            }
        }
        self.main_text.borrow().borrow_mut().resolve_pointers();
        Ok(())
    }

    /// Terminal teardown of this record's text-body association.
    ///
    /// A hub-kind connector is torn down by its owning record's own
    /// lifecycle, never generically: no-op. A unified spoke first leaves
    /// the union (sibling spokes keep the shared text), then expires the
    /// private body it got back. Returns the disunite outcome when the
    /// connector was unified, so the record layer sees the teardown
    /// signal once the union drops below two spokes.
    pub fn expire(
        self: &Rc<Self>,
        directory: &mut dyn RecordDirectory,
    ) -> Option<DisuniteOutcome> {
        if self.record.kind == RecordKind::TextHub {
            return None;
        }
        let hub = self.hub.borrow().clone();
        let outcome =
            hub.map(|hub| hub.disunite_record(self, true, directory));
        self.main_text.borrow().borrow_mut().expire();
        outcome
    }

    /// Transition from standalone to unified: adopt the hub's shared main
    /// text and register as a spoke. The previously-owned private body is
    /// discarded — its content must already have been merged into the
    /// shared one by the caller.
    pub fn init_from_hub(
        self: &Rc<Self>,
        hub: &Rc<Hub>,
        directory: &mut dyn RecordDirectory,
    ) {
        let old = self.main_text();
        let shared = hub.main_text();
        if !Rc::ptr_eq(&old, &shared) {
            *self.main_text.borrow_mut() = shared.clone();
            directory.replace_main_text(&old, &shared);
        }
        *self.hub.borrow_mut() = Some(hub.clone());
        hub.attach_spoke(self);
    }

    pub(crate) fn replace_main_text(&self, text: SharedMainText) {
        *self.main_text.borrow_mut() = text;
    }

    pub(crate) fn set_hub(&self, hub: Rc<Hub>) {
        *self.hub.borrow_mut() = Some(hub);
    }

    pub(crate) fn clear_hub(&self) {
        *self.hub.borrow_mut() = None;
    }
}

/// Two connectors are equal iff they wrap the same record.
impl PartialEq for Connector {
    fn eq(&self, other: &Self) -> bool {
        self.record.id == other.record.id
    }
}

impl Eq for Connector {}

impl Hash for Connector {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.record.id.hash(state);
    }
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("record", &self.record)
            .field("has_hub", &self.has_hub())
            .field("modifications", &self.modifications.get())
            .finish()
    }
}
