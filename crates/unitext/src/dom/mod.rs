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

//! The mutable markup tree behind a rich-text body.
//!
//! Nodes are owned in one big list held by [`MarkupDom`]; parents refer to
//! their children by [`MarkupHandle`]s. The arena supports the two surgical
//! mutations link insertion needs — splitting a text node at a character
//! offset and wrapping a node in a link element — without re-serializing the
//! rest of the fragment.

mod markup_error;
mod markup_node;
pub(crate) mod parser;

pub use markup_error::MarkupParseError;
pub use markup_node::{
    DocumentNode, ElementNode, MarkupHandle, MarkupNode, TextNode,
};

pub(crate) use markup_node::markup_qual_name;

use html5ever::{Attribute, QualName};

/// Elements serialized without a closing tag.
const VOID_TAGS: &[&str] = &["br", "hr", "img"];

/// An arena of markup nodes rooted at a document node.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkupDom {
    pub(crate) nodes: Vec<MarkupNode>,
    pub(crate) document_handle: MarkupHandle,
}

impl MarkupDom {
    /// Create an empty arena containing only the document node.
    pub fn new() -> Self {
        Self {
            nodes: vec![MarkupNode::Document(DocumentNode::default())],
            document_handle: MarkupHandle(0),
        }
    }

    /// Parse an HTML fragment, normalizing structural whitespace.
    pub fn parse(html: &str) -> Result<Self, MarkupParseError> {
        parser::parse(html)
    }

    pub fn document_handle(&self) -> MarkupHandle {
        self.document_handle
    }

    pub fn get_node(&self, handle: MarkupHandle) -> &MarkupNode {
        &self.nodes[handle.0]
    }

    pub(crate) fn get_mut_node(
        &mut self,
        handle: MarkupHandle,
    ) -> &mut MarkupNode {
        &mut self.nodes[handle.0]
    }

    pub(crate) fn add_node(&mut self, node: MarkupNode) -> MarkupHandle {
        self.nodes.push(node);
        MarkupHandle(self.nodes.len() - 1)
    }

    pub(crate) fn create_element(
        &mut self,
        name: QualName,
        attrs: Vec<Attribute>,
        _flags: html5ever::tree_builder::ElementFlags,
    ) -> MarkupHandle {
        self.add_node(MarkupNode::Element(ElementNode {
            name,
            attrs: attrs
                .iter()
                .map(|attr| {
                    (
                        attr.name.local.as_ref().to_owned(),
                        attr.value.as_ref().to_owned(),
                    )
                })
                .collect(),
            children: Vec::new(),
        }))
    }

    /// Find the parent of `child` and its position in the parent's child
    /// list, searching from the document root in document order.
    pub(crate) fn position_of(
        &self,
        child: MarkupHandle,
    ) -> Option<(MarkupHandle, usize)> {
        fn walk(
            dom: &MarkupDom,
            handle: MarkupHandle,
            child: MarkupHandle,
        ) -> Option<(MarkupHandle, usize)> {
            let children = match dom.get_node(handle) {
                MarkupNode::Document(d) => &d.children,
                MarkupNode::Element(e) => &e.children,
                MarkupNode::Text(_) => return None,
            };
            if let Some(pos) = children.iter().position(|c| *c == child) {
                return Some((handle, pos));
            }
            children.iter().find_map(|c| walk(dom, *c, child))
        }
        walk(self, self.document_handle, child)
    }

    /// Split the text node at `handle` in two at `char_offset` (a Unicode
    /// scalar offset strictly inside its content). The new leading node is
    /// inserted immediately before the original, which keeps the tail. The
    /// exact characters are preserved; document order and total text length
    /// are unchanged.
    ///
    /// Panics if `handle` is not an attached text node or the offset is not
    /// strictly inside it — callers must only pass offsets validated against
    /// a [`TextNodeIndex`](crate::TextNodeIndex).
    pub fn split_text(
        &mut self,
        handle: MarkupHandle,
        char_offset: usize,
    ) -> MarkupHandle {
        let (parent, pos) = self
            .position_of(handle)
            .expect("text node to split must be attached to the tree");
        let content = match self.get_node(handle) {
            MarkupNode::Text(t) => t.content.clone(),
            _ => panic!("split_text called on a non-text node"),
        };
        let byte = content
            .char_indices()
            .nth(char_offset)
            .map(|(b, _)| b)
            .expect("split offset must lie inside the text node");
        assert!(
            byte > 0,
            "split offset must be strictly inside the text node"
        );

        let leading = content[..byte].to_owned();
        let trailing = content[byte..].to_owned();

        if let MarkupNode::Text(t) = self.get_mut_node(handle) {
            t.content = trailing;
        }
        let new_handle =
            self.add_node(MarkupNode::Text(TextNode { content: leading }));
        match self.get_mut_node(parent) {
            MarkupNode::Element(e) => e.children.insert(pos, new_handle),
            MarkupNode::Document(d) => d.children.insert(pos, new_handle),
            MarkupNode::Text(_) => {
                unreachable!("parent changed from container to text")
            }
        }
        new_handle
    }

    /// Replace `handle` in its parent's child list with a new
    /// `<a href="…">` element containing it. Returns the link element.
    pub fn wrap_in_link(
        &mut self,
        handle: MarkupHandle,
        href: &str,
    ) -> MarkupHandle {
        let (parent, pos) = self
            .position_of(handle)
            .expect("node to wrap must be attached to the tree");
        let link = self.add_node(MarkupNode::Element(ElementNode {
            name: markup_qual_name("a"),
            attrs: vec![("href".to_owned(), href.to_owned())],
            children: vec![handle],
        }));
        match self.get_mut_node(parent) {
            MarkupNode::Element(e) => e.children[pos] = link,
            MarkupNode::Document(d) => d.children[pos] = link,
            MarkupNode::Text(_) => {
                unreachable!("parent changed from container to text")
            }
        }
        link
    }

    /// Concatenate the content of every text node under `handle`, in
    /// document order. This is the flattened plain-text view that
    /// [`TextNodeIndex`](crate::TextNodeIndex) offsets refer to.
    pub fn flatten(&self, handle: MarkupHandle) -> String {
        let mut out = String::new();
        self.flatten_into(handle, &mut out);
        out
    }

    fn flatten_into(&self, handle: MarkupHandle, out: &mut String) {
        match self.get_node(handle) {
            MarkupNode::Text(t) => out.push_str(&t.content),
            MarkupNode::Element(e) => {
                for child in &e.children {
                    self.flatten_into(*child, out);
                }
            }
            MarkupNode::Document(d) => {
                for child in &d.children {
                    self.flatten_into(*child, out);
                }
            }
        }
    }

    /// Serialize the whole fragment back to HTML, escaping text content and
    /// attribute values.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(self.document_handle, &mut out);
        out
    }

    fn write_html(&self, handle: MarkupHandle, out: &mut String) {
        match self.get_node(handle) {
            MarkupNode::Document(d) => {
                for child in &d.children {
                    self.write_html(*child, out);
                }
            }
            MarkupNode::Text(t) => {
                out.push_str(&html_escape::encode_text(&t.content));
            }
            MarkupNode::Element(e) => {
                let tag = e.tag();
                out.push('<');
                out.push_str(tag);
                for (name, value) in &e.attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(
                        &html_escape::encode_double_quoted_attribute(value),
                    );
                    out.push('"');
                }
                if VOID_TAGS.contains(&tag) {
                    out.push_str(" />");
                    return;
                }
                out.push('>');
                for child in &e.children {
                    self.write_html(*child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }

    /// A debug tree rendering of the fragment, one node per line.
    pub fn to_tree(&self) -> String {
        let mut out = String::from("\n");
        let children = match self.get_node(self.document_handle) {
            MarkupNode::Document(d) => d.children.clone(),
            _ => Vec::new(),
        };
        for (i, child) in children.iter().enumerate() {
            self.write_tree(*child, "", i == children.len() - 1, &mut out);
        }
        out
    }

    fn write_tree(
        &self,
        handle: MarkupHandle,
        prefix: &str,
        is_last: bool,
        out: &mut String,
    ) {
        let connector = if is_last { "└>" } else { "├>" };
        match self.get_node(handle) {
            MarkupNode::Text(t) => {
                out.push_str(&format!(
                    "{prefix}{connector}\"{}\"\n",
                    t.content
                ));
            }
            MarkupNode::Element(e) => {
                if let Some(href) = e.get_attr("href") {
                    out.push_str(&format!(
                        "{prefix}{connector}{} \"{href}\"\n",
                        e.tag()
                    ));
                } else {
                    out.push_str(&format!(
                        "{prefix}{connector}{}\n",
                        e.tag()
                    ));
                }
                let child_prefix = if is_last {
                    format!("{prefix}  ")
                } else {
                    format!("{prefix}│ ")
                };
                for (i, child) in e.children.iter().enumerate() {
                    self.write_tree(
                        *child,
                        &child_prefix,
                        i == e.children.len() - 1,
                        out,
                    );
                }
            }
            MarkupNode::Document(_) => {
                unreachable!("document nested inside the tree")
            }
        }
    }
}

impl Default for MarkupDom {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    fn dom(html: &str) -> MarkupDom {
        MarkupDom::parse(html).unwrap()
    }

    fn first_text_node(dom: &MarkupDom) -> MarkupHandle {
        fn walk(dom: &MarkupDom, handle: MarkupHandle) -> Option<MarkupHandle> {
            match dom.get_node(handle) {
                MarkupNode::Text(_) => Some(handle),
                MarkupNode::Element(e) => {
                    e.children.iter().find_map(|c| walk(dom, *c))
                }
                MarkupNode::Document(d) => {
                    d.children.iter().find_map(|c| walk(dom, *c))
                }
            }
        }
        walk(dom, dom.document_handle()).expect("no text node in fragment")
    }

    #[test]
    fn flatten_concatenates_text_in_document_order() {
        let d = dom("before <b>within</b> after");
        assert_eq!(d.flatten(d.document_handle()), "before within after");
    }

    #[test]
    fn to_html_roundtrips_simple_markup() {
        let d = dom("before <b>within</b> after");
        assert_eq!(d.to_html(), "before <b>within</b> after");
    }

    #[test]
    fn to_html_escapes_text_and_attributes() {
        let mut d = dom("a & b");
        let text = first_text_node(&d);
        d.wrap_in_link(text, "https://example.com/?x=1&y=2");
        let html = d.to_html();
        assert!(html.contains("a &amp; b"), "expected escaped text in: {html}");
        assert!(
            html.contains("href=\"https://example.com/?x=1&amp;y=2\""),
            "expected escaped attribute in: {html}"
        );
    }

    #[test]
    fn split_text_preserves_characters_and_order() {
        let mut d = dom("The quick fox");
        let text = first_text_node(&d);
        let leading = d.split_text(text, 4);
        match d.get_node(leading) {
            MarkupNode::Text(t) => assert_eq!(t.content(), "The "),
            other => panic!("expected text node, got {other:?}"),
        }
        match d.get_node(text) {
            MarkupNode::Text(t) => assert_eq!(t.content(), "quick fox"),
            other => panic!("expected text node, got {other:?}"),
        }
        assert_eq!(d.flatten(d.document_handle()), "The quick fox");
    }

    #[test]
    fn split_text_with_multibyte_characters() {
        let mut d = dom("héllo wörld");
        let text = first_text_node(&d);
        d.split_text(text, 5);
        assert_eq!(d.flatten(d.document_handle()), "héllo wörld");
        assert_eq!(d.to_html(), "héllo wörld");
    }

    #[test]
    #[should_panic(expected = "strictly inside")]
    fn split_text_at_start_is_a_programming_error() {
        let mut d = dom("abc");
        let text = first_text_node(&d);
        d.split_text(text, 0);
    }

    #[test]
    fn wrap_in_link_replaces_child_in_place() {
        let mut d = dom("one <b>two</b> three");
        let text = first_text_node(&d);
        d.wrap_in_link(text, "https://example.com");
        assert_eq!(
            d.to_html(),
            "<a href=\"https://example.com\">one </a><b>two</b> three"
        );
        assert_eq!(d.flatten(d.document_handle()), "one two three");
    }

    #[test]
    fn to_tree_renders_nested_structure() {
        let d = dom("A<i>B<a href=\"https://x.org\">C</a></i>");
        assert_eq!(
            d.to_tree(),
            indoc! {
            r#"

            ├>"A"
            └>i
              ├>"B"
              └>a "https://x.org"
                └>"C"
            "#}
        );
    }
}
