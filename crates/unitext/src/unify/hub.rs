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
use std::rc::{Rc, Weak};

use crate::main_text::SharedMainText;
use crate::unify::{
    Connector, ProcessingContext, RecordDirectory, RecordKind, RecordRef,
    UnifyError,
};

/// What `disunite_record` leaves behind: teardown policy stays with the
/// record layer, the hub only reports whether it still represents a union.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisuniteOutcome {
    /// The union still has at least two live spokes.
    Retained,
    /// The union dropped below two members; the record layer should tear
    /// the hub down.
    HubShouldTearDown,
}

/// Shared coordination object for two or more records unified onto one
/// main text.
///
/// Spokes hold the hub by `Rc` (a unified connector keeps its hub alive);
/// the hub holds its spokes by `Weak` so the relation carries no ownership
/// cycle. The shared main text is the one object with genuine shared
/// ownership — it lives as long as the longest-surviving spoke or the hub
/// itself.
pub struct Hub {
    record: RecordRef,
    main_text: SharedMainText,
    spokes: RefCell<Vec<Weak<Connector>>>,
    /// Reentrancy flag for the fan-out itself: while the hub is notifying
    /// its spokes, a spoke's nested hub notification must not start a
    /// second pass over spokes whose own guards have already cleared.
    notifying: Cell<bool>,
}

impl Hub {
    /// Unify two or more records onto one shared main text.
    ///
    /// The first connector's body becomes the canonical shared one —
    /// content reconciliation between the bodies has already happened
    /// upstream. Returns the hub together with the hub-kind connector for
    /// `hub_record`, which is not a spoke and not unifiable further.
    pub fn unify(
        hub_record: RecordRef,
        connectors: &[Rc<Connector>],
        directory: &mut dyn RecordDirectory,
    ) -> Result<(Rc<Hub>, Rc<Connector>), UnifyError> {
        assert_eq!(
            hub_record.kind,
            RecordKind::TextHub,
            "hub record must be of hub kind"
        );
        if connectors.len() < 2 {
            return Err(UnifyError::TooFewRecords {
                count: connectors.len(),
            });
        }

        let canonical = connectors[0].main_text();
        let hub = Rc::new(Hub {
            record: hub_record,
            main_text: canonical,
            spokes: RefCell::new(Vec::new()),
            notifying: Cell::new(false),
        });
        for connector in connectors {
            connector.init_from_hub(&hub, directory);
        }

        let hub_connector =
            Connector::with_main_text(hub_record, hub.main_text());
        hub_connector.set_hub(hub.clone());
        log::debug!(
            "unified {} records through {hub_record}",
            connectors.len()
        );
        Ok((hub, hub_connector))
    }

    /// The hub's own record.
    pub fn record(&self) -> RecordRef {
        self.record
    }

    /// The canonical shared main text.
    pub fn main_text(&self) -> SharedMainText {
        self.main_text.clone()
    }

    /// Number of spokes still alive.
    pub fn spoke_count(&self) -> usize {
        self.spokes
            .borrow()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Fan a modification out to every live spoke, exactly once per edit
    /// origin: nested spoke→hub notifications during an active fan-out are
    /// no-ops.
    pub fn modify_now(&self, ctx: &ProcessingContext) {
        if self.notifying.get() {
            return;
        }
        self.notifying.set(true);
        let spokes: Vec<Rc<Connector>> = self
            .spokes
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .collect();
        for spoke in spokes {
            spoke.modify_now(ctx);
        }
        self.notifying.set(false);
    }

    /// Remove one spoke from the union.
    ///
    /// When `destroying` is false the departing connector receives a
    /// private body carrying a copy of the shared content, so the record
    /// keeps readable text; when true (the record is going away) it gets
    /// an empty private body. Sibling spokes are never touched either
    /// way.
    pub fn disunite_record(
        &self,
        connector: &Rc<Connector>,
        destroying: bool,
        directory: &mut dyn RecordDirectory,
    ) -> DisuniteOutcome {
        self.spokes.borrow_mut().retain(|weak| match weak.upgrade() {
            Some(spoke) => !Rc::ptr_eq(&spoke, connector),
            None => false,
        });

        let private = if destroying {
            crate::main_text::MainText::new()
        } else {
            self.main_text.borrow().clone()
        };
        let private = private.into_shared();
        let old = connector.main_text();
        connector.replace_main_text(private.clone());
        directory.replace_main_text(&old, &private);
        connector.clear_hub();

        let outcome = if self.spoke_count() < 2 {
            DisuniteOutcome::HubShouldTearDown
        } else {
            DisuniteOutcome::Retained
        };
        log::debug!(
            "disunited {} from {}: {outcome:?}",
            connector.record(),
            self.record
        );
        outcome
    }

    pub(crate) fn attach_spoke(&self, connector: &Rc<Connector>) {
        self.spokes.borrow_mut().push(Rc::downgrade(connector));
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("record", &self.record)
            .field("spokes", &self.spoke_count())
            .finish()
    }
}
