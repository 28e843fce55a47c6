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

//! The shared, mutable rich-text payload of a record (or a unified group
//! of records): source markup, derived plain text, and the link
//! annotations materialized into that markup.

use std::cell::RefCell;
use std::rc::Rc;

use crate::dom::{MarkupDom, MarkupParseError};
use crate::text_index::{IndexError, TextNodeIndex};

/// A main text shared by reference. Shared among every connector unified
/// through the same hub; otherwise owned exclusively by one connector.
pub type SharedMainText = Rc<RefCell<MainText>>;

/// A link recorded against a plain-text offset range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkAnnotation {
    pub start: usize,
    pub end: usize,
    pub target: String,
}

/// The rich-text body of a record: source markup plus the plain text and
/// link annotations derived from it.
#[derive(Clone, Debug)]
pub struct MainText {
    dom: MarkupDom,
    plain_text: String,
    links: Vec<LinkAnnotation>,
    expired: bool,
}

impl MainText {
    pub fn new() -> Self {
        Self {
            dom: MarkupDom::new(),
            plain_text: String::new(),
            links: Vec::new(),
            expired: false,
        }
    }

    pub fn from_html(html: &str) -> Result<Self, MarkupParseError> {
        let dom = MarkupDom::parse(html)?;
        let plain_text = dom.flatten(dom.document_handle());
        Ok(Self {
            dom,
            plain_text,
            links: Vec::new(),
            expired: false,
        })
    }

    /// Wrap in an [`Rc<RefCell>`] for sharing.
    pub fn into_shared(self) -> SharedMainText {
        Rc::new(RefCell::new(self))
    }

    /// Replace the markup wholesale, re-deriving the plain text and
    /// clearing any previously recorded annotations.
    pub fn set_markup(&mut self, html: &str) -> Result<(), MarkupParseError> {
        let dom = MarkupDom::parse(html)?;
        self.plain_text = dom.flatten(dom.document_handle());
        self.dom = dom;
        self.links.clear();
        self.expired = false;
        Ok(())
    }

    pub fn to_html(&self) -> String {
        self.dom.to_html()
    }

    pub fn plain_text(&self) -> &str {
        &self.plain_text
    }

    pub fn links(&self) -> &[LinkAnnotation] {
        &self.links
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    pub fn dom(&self) -> &MarkupDom {
        &self.dom
    }

    /// Materialize a link over the plain-text range `[start, end)`.
    ///
    /// Locates the overlapping spans, splits boundary spans whose text the
    /// range only partially covers, wraps the now-exactly-aligned text
    /// node(s) in `<a href=target>` elements and records the annotation.
    /// Wrapping never alters the visible text: re-deriving the plain text
    /// afterwards reproduces it byte-identically.
    ///
    /// A range with no backing text (already linked, excluded, or out of
    /// document) reports [`IndexError::LinkTargetNotFound`]; the caller
    /// skips this link and continues with the rest of its batch.
    pub fn insert_link(
        &mut self,
        start: usize,
        end: usize,
        target: &str,
    ) -> Result<(), IndexError> {
        let mut index =
            TextNodeIndex::build(&self.dom, self.dom.document_handle());
        let overlapping = match index.get_spans_in_range(start, end) {
            Ok(spans) => spans,
            Err(err) => {
                log::warn!("link to {target} not inserted: {err}");
                return Err(err);
            }
        };

        for idx in overlapping {
            if index.span(idx).start < start {
                // The leading part stays outside the link.
                index.split_span_at(&mut self.dom, idx, start);
            }
            let node = if index.span(idx).end > end {
                // The detached leading node is the part inside the link.
                index.split_span_at(&mut self.dom, idx, end)
            } else {
                index.span(idx).node
            };
            self.dom.wrap_in_link(node, target);
        }

        let annotation = LinkAnnotation {
            start,
            end,
            target: target.to_owned(),
        };
        let pos = self
            .links
            .partition_point(|link| link.start <= annotation.start);
        self.links.insert(pos, annotation);

        debug_assert_eq!(
            self.plain_text,
            self.dom.flatten(self.dom.document_handle()),
            "link wrapping must not alter the visible text"
        );
        Ok(())
    }

    /// Validate embedded cross-references after a bulk load. Annotations
    /// whose ranges no longer lie inside the plain text are dropped.
    pub fn resolve_pointers(&mut self) {
        let len = self.plain_text.chars().count();
        self.links.retain(|link| {
            let valid = link.start < link.end && link.end <= len;
            if !valid {
                log::warn!(
                    "dropping dangling link annotation [{}, {}) -> {}",
                    link.start,
                    link.end,
                    link.target
                );
            }
            valid
        });
    }

    /// Release held markup, plain text and annotations. Idempotent.
    pub fn expire(&mut self) {
        if self.expired {
            return;
        }
        self.dom = MarkupDom::new();
        self.plain_text.clear();
        self.links.clear();
        self.expired = true;
    }
}

impl Default for MainText {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(html: &str) -> MainText {
        MainText::from_html(html).unwrap()
    }

    #[test]
    fn from_html_derives_plain_text() {
        let text = body("one <b>two</b> three");
        assert_eq!(text.plain_text(), "one two three");
    }

    #[test]
    fn insert_link_splits_a_single_span_in_three() {
        // "The quick fox", link over [4, 9) ("quick").
        let mut text = body("The quick fox");
        text.insert_link(4, 9, "https://example.com/quick").unwrap();
        assert_eq!(
            text.to_html(),
            "The <a href=\"https://example.com/quick\">quick</a> fox"
        );
        // Re-flattening yields the original text unchanged.
        assert_eq!(
            text.dom().flatten(text.dom().document_handle()),
            "The quick fox"
        );
        assert_eq!(text.plain_text(), "The quick fox");
    }

    #[test]
    fn insert_link_at_exact_span_bounds_needs_no_split() {
        let mut text = body("one <b>two</b> three");
        text.insert_link(4, 7, "https://example.com").unwrap();
        assert_eq!(
            text.to_html(),
            "one <b><a href=\"https://example.com\">two</a></b> three"
        );
    }

    #[test]
    fn insert_link_straddling_two_text_nodes() {
        // Link "e tw" across the boundary between "one " and "two".
        let mut text = body("one <b>two</b> three");
        text.insert_link(2, 6, "https://example.com").unwrap();
        assert_eq!(
            text.to_html(),
            "on<a href=\"https://example.com\">e </a>\
             <b><a href=\"https://example.com\">tw</a>o</b> three"
        );
        assert_eq!(text.plain_text(), "one two three");
    }

    #[test]
    fn insert_link_records_annotations_in_offset_order() {
        let mut text = body("alpha beta gamma");
        text.insert_link(11, 16, "https://example.com/gamma").unwrap();
        text.insert_link(0, 5, "https://example.com/alpha").unwrap();
        let starts: Vec<usize> =
            text.links().iter().map(|l| l.start).collect();
        assert_eq!(starts, vec![0, 11]);
    }

    #[test]
    fn insert_link_into_existing_link_is_skipped() {
        let mut text =
            body(r#"one <a href="https://x.org">two</a> three"#);
        let err = text.insert_link(4, 7, "https://y.org").unwrap_err();
        assert_eq!(
            err,
            IndexError::LinkTargetNotFound { start: 4, end: 7 }
        );
        // The markup is untouched.
        assert_eq!(
            text.to_html(),
            r#"one <a href="https://x.org">two</a> three"#
        );
    }

    #[test]
    fn insert_link_out_of_document_is_skipped() {
        let mut text = body("short");
        assert!(text.insert_link(10, 20, "https://x.org").is_err());
        assert!(text.links().is_empty());
    }

    #[test]
    fn resolve_pointers_drops_dangling_annotations() {
        let mut text = body("The quick fox");
        text.insert_link(4, 9, "https://example.com").unwrap();
        text.set_markup("tiny").unwrap();
        // set_markup cleared the links; simulate a stale deserialized one.
        text.links.push(LinkAnnotation {
            start: 2,
            end: 40,
            target: "https://stale.example".into(),
        });
        text.links.push(LinkAnnotation {
            start: 0,
            end: 3,
            target: "https://fine.example".into(),
        });
        text.resolve_pointers();
        assert_eq!(text.links().len(), 1);
        assert_eq!(text.links()[0].target, "https://fine.example");
    }

    #[test]
    fn expire_is_idempotent() {
        let mut text = body("content");
        text.insert_link(0, 7, "https://example.com").unwrap();
        text.expire();
        assert!(text.is_expired());
        assert_eq!(text.plain_text(), "");
        assert!(text.links().is_empty());
        text.expire();
        assert!(text.is_expired());
    }
}
