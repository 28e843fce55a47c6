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

use std::cell::Cell;

/// Shared processing state passed through every mutation of the
/// unification graph.
///
/// Carrying the "bulk conversion in progress" mode here instead of in
/// ambient global state lets bulk and incremental paths run isolated in
/// tests without cross-test leakage.
#[derive(Debug, Default)]
pub struct ProcessingContext {
    bulk_conversion: Cell<bool>,
}

impl ProcessingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter bulk-conversion mode: per-record modification cascades are
    /// suppressed until [`end_bulk_conversion`](Self::end_bulk_conversion).
    /// The bulk operation must restore consistency itself afterwards, e.g.
    /// with a `resolve_pointers` pass over all affected records.
    pub fn begin_bulk_conversion(&self) {
        self.bulk_conversion.set(true);
    }

    pub fn end_bulk_conversion(&self) {
        self.bulk_conversion.set(false);
    }

    pub fn bulk_conversion_active(&self) -> bool {
        self.bulk_conversion.get()
    }
}
