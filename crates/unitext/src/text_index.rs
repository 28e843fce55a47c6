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

//! Mapping from flattened plain-text offsets back to markup text nodes.
//!
//! A [`TextNodeIndex`] is rebuilt per render pass and must not outlive a
//! structural mutation of the tree performed outside [`split_span_at`].
//! Text under a non-linkable element (an existing link, a `summary`
//! heading, or anything carrying `data-nolink`) and whitespace-only text
//! nodes occupy flattened offsets but yield no span, so a link can never
//! land on them.
//!
//! [`split_span_at`]: TextNodeIndex::split_span_at

use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;

use crate::dom::{MarkupDom, MarkupHandle, MarkupNode};

/// Elements whose descendant text must never receive a link.
static NON_LINKABLE_TAGS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["a", "summary"].into_iter().collect());

/// Attribute marking an element (and everything under it) as "no links".
const NO_LINK_ATTR: &str = "data-nolink";

/// A contiguous run of flattened plain text traceable to one markup text
/// node. `start`/`end` are half-open Unicode scalar offsets into the
/// flattened text; `node` is a non-owning back-reference into the arena.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
    pub source_text: String,
    pub node: MarkupHandle,
}

/// Failure modes of span queries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexError {
    /// No span overlaps the requested range. Recoverable: the requested
    /// link is skipped, the rest of the batch continues.
    LinkTargetNotFound { start: usize, end: usize },
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinkTargetNotFound { start, end } => {
                write!(
                    f,
                    "no linkable text backs the range [{start}, {end})"
                )
            }
        }
    }
}

impl std::error::Error for IndexError {}

/// An ordered sequence of [`TextSpan`]s partitioning the non-excluded
/// plain text of one markup fragment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextNodeIndex {
    spans: Vec<TextSpan>,
    flat_text: String,
    flat_len: usize,
}

impl TextNodeIndex {
    /// Traverse the fragment under `root`, producing the flattened plain
    /// text and the span list. Exclusion is inherited: once an ancestor is
    /// excluded, all its descendant text nodes are excluded regardless of
    /// their own attributes.
    pub fn build(dom: &MarkupDom, root: MarkupHandle) -> Self {
        let mut index = Self {
            spans: Vec::new(),
            flat_text: String::new(),
            flat_len: 0,
        };
        index.walk(dom, root, false);
        index
    }

    fn walk(&mut self, dom: &MarkupDom, handle: MarkupHandle, excluded: bool) {
        match dom.get_node(handle) {
            MarkupNode::Text(t) => {
                let len = t.content.chars().count();
                if !excluded && !t.content.trim().is_empty() {
                    self.spans.push(TextSpan {
                        start: self.flat_len,
                        end: self.flat_len + len,
                        source_text: t.content.clone(),
                        node: handle,
                    });
                }
                self.flat_text.push_str(&t.content);
                self.flat_len += len;
            }
            MarkupNode::Element(e) => {
                let excluded = excluded
                    || NON_LINKABLE_TAGS.contains(e.tag())
                    || e.has_attr(NO_LINK_ATTR);
                for child in e.children.clone() {
                    self.walk(dom, child, excluded);
                }
            }
            MarkupNode::Document(d) => {
                for child in d.children.clone() {
                    self.walk(dom, child, excluded);
                }
            }
        }
    }

    pub fn spans(&self) -> &[TextSpan] {
        &self.spans
    }

    pub fn span(&self, idx: usize) -> &TextSpan {
        &self.spans[idx]
    }

    /// Length of the flattened plain text in Unicode scalars, excluded
    /// regions included.
    pub fn flat_len(&self) -> usize {
        self.flat_len
    }

    /// The flattened plain text this index was built from.
    pub fn flattened_text(&self) -> &str {
        &self.flat_text
    }

    /// Indices of every span overlapping the half-open range
    /// `[start, end)`, in document order. An empty result reports
    /// [`IndexError::LinkTargetNotFound`]: a caller should never request a
    /// range with no backing text.
    pub fn get_spans_in_range(
        &self,
        start: usize,
        end: usize,
    ) -> Result<Vec<usize>, IndexError> {
        let hits: Vec<usize> = self
            .spans
            .iter()
            .enumerate()
            .filter(|(_, s)| s.start < end && start < s.end)
            .map(|(i, _)| i)
            .collect();
        if hits.is_empty() {
            Err(IndexError::LinkTargetNotFound { start, end })
        } else {
            Ok(hits)
        }
    }

    /// Split the span at `span_idx` so it starts at `new_start`, splitting
    /// the backing text node at the corresponding markup-local offset. The
    /// now-detached leading text node is returned so the caller can wrap it
    /// separately. The flattened offsets of all later spans are unchanged,
    /// since the split moves no text.
    ///
    /// `new_start` must fall strictly inside the span; anything else is a
    /// programming error (ranges are only produced by
    /// [`get_spans_in_range`](Self::get_spans_in_range)).
    pub fn split_span_at(
        &mut self,
        dom: &mut MarkupDom,
        span_idx: usize,
        new_start: usize,
    ) -> MarkupHandle {
        let span = &self.spans[span_idx];
        assert!(
            span.start < new_start && new_start < span.end,
            "split offset {new_start} not strictly inside span [{}, {})",
            span.start,
            span.end
        );
        let local = new_start - span.start;
        let leading = dom.split_text(span.node, local);

        let span = &mut self.spans[span_idx];
        span.source_text = span.source_text.chars().skip(local).collect();
        span.start = new_start;
        leading
    }
}
