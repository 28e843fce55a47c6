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

//! Record unification: several domain records sharing one main text.
//!
//! A [`Connector`] binds one record to its main text. Unifying records
//! creates a [`Hub`] whose shared main text replaces each member's
//! private body; modifications made through any member fan out to all of
//! them, bounded by a per-connector reentrancy guard. The whole graph is
//! single-threaded by construction (`Rc`/`RefCell`, no `Send`).

mod connector;
mod context;
mod hub;
mod record;

pub use connector::Connector;
pub use context::ProcessingContext;
pub use hub::{DisuniteOutcome, Hub};
pub use record::{
    MemoryDirectory, RecordDirectory, RecordId, RecordKind, RecordRef,
};

use std::fmt;

/// Failures surfaced by unification-graph maintenance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnifyError {
    /// A stored pointer resolves to a record of the wrong kind. The data
    /// is internally inconsistent; the operation that found this must
    /// abort rather than guess.
    ReferentialIntegrity { record: RecordRef, detail: String },
    /// Unification needs at least two records.
    TooFewRecords { count: usize },
}

impl fmt::Display for UnifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReferentialIntegrity { record, detail } => {
                write!(
                    f,
                    "referential integrity failure at {record}: {detail}"
                )
            }
            Self::TooFewRecords { count } => {
                write!(
                    f,
                    "unification needs at least 2 records, got {count}"
                )
            }
        }
    }
}

impl std::error::Error for UnifyError {}
