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

use std::fmt;

use super::MarkupDom;

/// The markup could not be parsed into a [`MarkupDom`].
#[derive(Clone, Debug, PartialEq)]
pub struct MarkupParseError {
    pub parse_errors: Vec<String>,
}

impl fmt::Display for MarkupParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse markup: {}", self.parse_errors.join("; "))
    }
}

impl std::error::Error for MarkupParseError {}

/// Internal parse failure carrying the partially-built arena alongside the
/// error messages, mirroring what the tree sink accumulates while parsing.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct MarkupCreationError {
    pub(crate) dom: MarkupDom,
    pub(crate) parse_errors: Vec<String>,
}

impl MarkupCreationError {
    pub(crate) fn new() -> Self {
        Self {
            dom: MarkupDom::new(),
            parse_errors: Vec::new(),
        }
    }
}
