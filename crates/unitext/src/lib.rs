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

//! Shared rich-text bodies for domain records.
//!
//! Records carry a markup main text. Two or more records can be unified
//! so they share one body through a hub ([`unify`]); edits made through
//! any member propagate to all of them. The [`text_index`] module maps
//! plain-text offset ranges back to the markup text nodes that produce
//! them, which is what makes it safe to materialize hyperlinks into the
//! markup without disturbing the visible text.

pub mod dom;
pub mod main_text;
pub mod text_index;
pub mod unify;

pub use crate::dom::{MarkupDom, MarkupHandle, MarkupNode, MarkupParseError};
pub use crate::main_text::{LinkAnnotation, MainText, SharedMainText};
pub use crate::text_index::{IndexError, TextNodeIndex, TextSpan};
pub use crate::unify::{
    Connector, DisuniteOutcome, Hub, MemoryDirectory, ProcessingContext,
    RecordDirectory, RecordId, RecordKind, RecordRef, UnifyError,
};
