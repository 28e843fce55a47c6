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

//! html5ever front end for [`MarkupDom`].
//!
//! The tree sink builds nodes directly into the arena; parents refer to
//! their children by handles. After the sink finishes, the implicit `html`
//! wrapper element html5ever adds around fragments is hoisted away and
//! structural whitespace is normalized, so the arena's flattened text is
//! the plain text every offset in this crate refers to.

use std::cell::{Ref, RefCell};

use html5ever::interface::NextParserState;
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{parse_fragment, Attribute, QualName};
use once_cell::sync::Lazy;
use regex::Regex;

use super::markup_error::{MarkupCreationError, MarkupParseError};
use super::{markup_qual_name, MarkupDom, MarkupHandle, MarkupNode, TextNode};

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t\r\n]+").expect("whitespace regex"));

pub(crate) fn parse(html: &str) -> Result<MarkupDom, MarkupParseError> {
    MarkupDomCreator::parse(html)
        .map(|mut dom| {
            hoist_fragment_root(&mut dom);
            normalize_structural_whitespace(&mut dom);
            dom
        })
        .map_err(|err| MarkupParseError {
            parse_errors: err.parse_errors,
        })
}

/// html5ever wraps fragment content in an `html` element. Replace the
/// document's children with that element's children so the fragment content
/// sits directly under the document node.
fn hoist_fragment_root(dom: &mut MarkupDom) {
    let doc = dom.document_handle();
    let first = match dom.get_node(doc) {
        MarkupNode::Document(d) => d.children.first().copied(),
        _ => None,
    };
    let Some(root) = first else {
        return;
    };
    let hoisted = match dom.get_node(root) {
        MarkupNode::Element(e) if e.tag() == "html" => e.children.clone(),
        _ => return,
    };
    if let MarkupNode::Document(d) = dom.get_mut_node(doc) {
        d.children = hoisted;
    }
}

/// Collapse runs of ASCII whitespace in text nodes to a single space and
/// turn non-breaking spaces into plain spaces, except inside `pre`. The
/// derived plain text stays exactly the markup's text content with
/// structural whitespace normalized.
fn normalize_structural_whitespace(dom: &mut MarkupDom) {
    fn walk(dom: &mut MarkupDom, handle: MarkupHandle, in_pre: bool) {
        let (children, in_pre) = match dom.get_node(handle) {
            MarkupNode::Text(_) => {
                if !in_pre {
                    if let MarkupNode::Text(t) = dom.get_mut_node(handle) {
                        let unbroken = t.content.replace('\u{A0}', " ");
                        t.content = WHITESPACE_RUN
                            .replace_all(&unbroken, " ")
                            .into_owned();
                    }
                }
                return;
            }
            MarkupNode::Element(e) => {
                (e.children.clone(), in_pre || e.tag() == "pre")
            }
            MarkupNode::Document(d) => (d.children.clone(), in_pre),
        };
        for child in children {
            walk(dom, child, in_pre);
        }
    }
    walk(dom, dom.document_handle(), false);
}

type DomCreationResult = Result<MarkupDom, MarkupCreationError>;

struct MarkupDomCreator {
    state: RefCell<MarkupCreationError>,
}

impl MarkupDomCreator {
    fn parse(html: &str) -> DomCreationResult {
        parse_fragment(
            MarkupDomCreator::default(),
            Default::default(),
            markup_qual_name(""),
            vec![],
        )
        .from_utf8()
        .one(html.as_bytes())
    }
}

impl Default for MarkupDomCreator {
    fn default() -> Self {
        Self {
            state: RefCell::new(MarkupCreationError::new()),
        }
    }
}

impl TreeSink for MarkupDomCreator {
    type Handle = MarkupHandle;
    type Output = DomCreationResult;
    type ElemName<'a> = Ref<'a, QualName>;

    fn finish(self) -> Self::Output {
        if self.state.borrow().parse_errors.is_empty() {
            Ok(self.state.borrow().dom.clone())
        } else {
            Err(MarkupCreationError {
                dom: self.state.borrow().dom.clone(),
                parse_errors: self.state.borrow().parse_errors.clone(),
            })
        }
    }

    fn parse_error(&self, msg: std::borrow::Cow<'static, str>) {
        self.state.borrow_mut().parse_errors.push(String::from(msg));
    }

    fn get_document(&self) -> Self::Handle {
        self.state.borrow().dom.document_handle()
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        Ref::map(self.state.borrow(), |state| {
            state.dom.get_node(*target).name()
        })
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Attribute>,
        flags: ElementFlags,
    ) -> Self::Handle {
        self.state
            .borrow_mut()
            .dom
            .create_element(name, attrs, flags)
    }

    fn create_comment(&self, _text: StrTendril) -> Self::Handle {
        // The arena has no comment node; hand the builder an empty text
        // node so comments vanish from the fragment.
        self.state
            .borrow_mut()
            .dom
            .add_node(MarkupNode::Text(TextNode {
                content: String::new(),
            }))
    }

    fn create_pi(
        &self,
        _target: StrTendril,
        _data: StrTendril,
    ) -> Self::Handle {
        todo!("create_pi not yet supported")
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        let dom = &mut self.state.borrow_mut().dom;
        match child {
            NodeOrText::AppendNode(child) => match dom.get_mut_node(*parent) {
                MarkupNode::Element(p) => p.children.push(child),
                MarkupNode::Document(p) => p.children.push(child),
                MarkupNode::Text(_) => {
                    panic!("Appending node to text! {:?}", parent)
                }
            },
            NodeOrText::AppendText(tendril) => {
                // Merge with a trailing text sibling when there is one.
                let text_handle = match dom.get_node(*parent) {
                    MarkupNode::Document(_) => None,
                    MarkupNode::Text(_) => Some(*parent),
                    MarkupNode::Element(p) => match p
                        .children
                        .last()
                        .map(|handle| (*handle, dom.get_node(*handle)))
                    {
                        Some((last_child, MarkupNode::Text(_))) => {
                            Some(last_child)
                        }
                        _ => None,
                    },
                };

                if let Some(text_handle) = text_handle {
                    if let MarkupNode::Text(t) = dom.get_mut_node(text_handle)
                    {
                        t.content += tendril.as_ref();
                    } else {
                        unreachable!(
                            "`text_handle` must map to a `MarkupNode::Text`"
                        )
                    }
                } else {
                    let new_handle = dom.add_node(MarkupNode::Text(TextNode {
                        content: tendril.as_ref().to_owned(),
                    }));
                    match dom.get_mut_node(*parent) {
                        MarkupNode::Element(p) => p.children.push(new_handle),
                        MarkupNode::Document(p) => p.children.push(new_handle),
                        MarkupNode::Text(_) => {
                            panic!("parent changed from container to text!")
                        }
                    }
                }
            }
        };
    }

    fn append_based_on_parent_node(
        &self,
        _element: &Self::Handle,
        _prev_element: &Self::Handle,
        _child: NodeOrText<Self::Handle>,
    ) {
        todo!("append_based_on_parent_node not yet supported")
    }

    fn append_doctype_to_document(
        &self,
        _name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
        todo!("append_doctype_to_document not yet supported")
    }

    fn mark_script_already_started(&self, _node: &Self::Handle) {
        todo!()
    }

    fn pop(&self, _node: &Self::Handle) {
        // Nothing to do here for now
    }

    fn get_template_contents(&self, _target: &Self::Handle) -> Self::Handle {
        todo!("get_template_contents not yet supported")
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        x == y
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {
        // Nothing to do here for now
    }

    fn append_before_sibling(
        &self,
        _sibling: &Self::Handle,
        _new_node: NodeOrText<Self::Handle>,
    ) {
        todo!("append_before_sibling not yet supported")
    }

    fn add_attrs_if_missing(
        &self,
        target: &Self::Handle,
        attrs: Vec<Attribute>,
    ) {
        let dom = &mut self.state.borrow_mut().dom;
        let node = dom.get_mut_node(*target);
        if let MarkupNode::Element(node) = node {
            let to_add: Vec<(String, String)> = attrs
                .iter()
                .filter_map(|attr| {
                    let attr_name = attr.name.local.as_ref();
                    if node.attrs.iter().any(|(name, _)| name == attr_name) {
                        None
                    } else {
                        Some((
                            attr_name.to_owned(),
                            attr.value.as_ref().to_owned(),
                        ))
                    }
                })
                .collect();
            node.attrs.extend(to_add);
        } else {
            panic!("Non-element passed to add_attrs_if_missing!");
        }
    }

    fn associate_with_form(
        &self,
        _target: &Self::Handle,
        _form: &Self::Handle,
        _nodes: (&Self::Handle, Option<&Self::Handle>),
    ) {
        todo!()
    }

    fn remove_from_parent(&self, _target: &Self::Handle) {
        todo!("remove_from_parent not yet supported")
    }

    fn reparent_children(
        &self,
        _node: &Self::Handle,
        _new_parent: &Self::Handle,
    ) {
        todo!("reparent_children not yet supported")
    }

    fn is_mathml_annotation_xml_integration_point(
        &self,
        _handle: &Self::Handle,
    ) -> bool {
        todo!("is_mathml_annotation_xml_integration_point not yet supported")
    }

    fn set_current_line(&self, _line_number: u64) {
        // Nothing to do here for now
    }

    fn complete_script(&self, _node: &Self::Handle) -> NextParserState {
        todo!("complete_script not yet supported")
    }

    fn allow_declarative_shadow_roots(
        &self,
        _intended_parent: &Self::Handle,
    ) -> bool {
        todo!("allow_declarative_shadow_roots not yet supported")
    }

    fn attach_declarative_shadow(
        &self,
        _location: &Self::Handle,
        _template: &Self::Handle,
        _attrs: Vec<Attribute>,
    ) -> Result<(), String> {
        todo!("attach_declarative_shadow not yet supported")
    }
}

#[cfg(test)]
mod tests {
    use speculoos::{assert_that, AssertionFailure, Spec};

    use super::*;

    trait Roundtrips<T> {
        fn roundtrips(&self);
    }

    impl<'s, T> Roundtrips<T> for Spec<'s, T>
    where
        T: AsRef<str>,
    {
        fn roundtrips(&self) {
            let subject = self.subject.as_ref();
            let dom = parse(subject).unwrap();
            let output = dom.to_html();
            if output != subject {
                AssertionFailure::from_spec(self)
                    .with_expected(String::from(subject))
                    .with_actual(output)
                    .fail();
            }
        }
    }

    #[test]
    fn parse_plain_text() {
        assert_that!("some text").roundtrips();
    }

    #[test]
    fn parse_simple_tag() {
        assert_that!("<strong>sdfds</strong>").roundtrips();
    }

    #[test]
    fn parse_tag_with_surrounding_text() {
        assert_that!("before <strong> within </strong> after").roundtrips();
        assert_that!("before<strong>within</strong>after").roundtrips();
    }

    #[test]
    fn parse_nested_tags() {
        assert_that!("<b><em>ZZ</em></b>").roundtrips();
        assert_that!("X<b>Y<em>ZZ</em>0</b>1").roundtrips();
    }

    #[test]
    fn parse_tags_with_attributes() {
        assert_that!(r#"<b><a href="http://example.com">ZZ</a></b>"#)
            .roundtrips();
    }

    #[test]
    fn parse_escaped_html_entities_in_text() {
        let dom = parse("aaa&lt;strong&gt;bbb&lt;/strong&gt;ccc").unwrap();
        assert_eq!(
            dom.flatten(dom.document_handle()),
            "aaa<strong>bbb</strong>ccc"
        );
    }

    #[test]
    fn parse_collapses_whitespace_runs() {
        let dom = parse("<p>one\n\t  two</p>").unwrap();
        assert_eq!(dom.flatten(dom.document_handle()), "one two");
    }

    #[test]
    fn parse_replaces_nbsp_with_plain_space() {
        let dom = parse("<p>one\u{A0}two</p>").unwrap();
        assert_eq!(dom.flatten(dom.document_handle()), "one two");
    }

    #[test]
    fn parse_keeps_whitespace_inside_pre() {
        let dom = parse("<pre>one\n  two</pre>").unwrap();
        assert_eq!(dom.flatten(dom.document_handle()), "one\n  two");
    }

    #[test]
    fn parse_hoists_the_implicit_html_wrapper() {
        let dom = parse("<p>foo</p>").unwrap();
        match dom.get_node(dom.document_handle()) {
            MarkupNode::Document(d) => {
                assert_eq!(d.children.len(), 1);
                match dom.get_node(d.children[0]) {
                    MarkupNode::Element(e) => assert_eq!(e.tag(), "p"),
                    other => panic!("expected <p>, got {other:?}"),
                }
            }
            other => panic!("expected document root, got {other:?}"),
        }
    }

    #[test]
    fn parse_drops_html_comments() {
        let dom = parse("a<!-- ignored -->b").unwrap();
        assert_eq!(dom.flatten(dom.document_handle()), "ab");
        assert_eq!(dom.to_html(), "ab");
    }

    #[test]
    fn parse_empty_string_creates_empty_fragment() {
        let dom = parse("").unwrap();
        assert_eq!(dom.to_html(), "");
        assert_eq!(dom.flatten(dom.document_handle()), "");
    }
}
