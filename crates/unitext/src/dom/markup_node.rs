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

use html5ever::{namespace_url, ns, LocalName, QualName};
use once_cell::sync::Lazy;

/// Index of a node inside a [`MarkupDom`] arena.
///
/// Handles are plain indices: cheap to copy, but invalidated if the arena
/// is rebuilt.
///
/// [`MarkupDom`]: super::MarkupDom
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MarkupHandle(pub(crate) usize);

/// Build a [`QualName`] in the HTML namespace for a local tag name.
pub(crate) fn markup_qual_name(local: &str) -> QualName {
    QualName::new(None, ns!(html), LocalName::from(local))
}

static NO_NAME: Lazy<QualName> = Lazy::new(|| markup_qual_name(""));

/// A node in the markup arena. All nodes are owned in one big list held by
/// the [`MarkupDom`] itself; parents refer to their children by handles.
///
/// [`MarkupDom`]: super::MarkupDom
#[derive(Clone, Debug, PartialEq)]
pub enum MarkupNode {
    Document(DocumentNode),
    Element(ElementNode),
    Text(TextNode),
}

impl MarkupNode {
    pub(crate) fn name(&self) -> &QualName {
        match self {
            Self::Element(e) => &e.name,
            _ => &NO_NAME,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DocumentNode {
    pub(crate) children: Vec<MarkupHandle>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ElementNode {
    pub(crate) name: QualName,
    pub(crate) attrs: Vec<(String, String)>,
    pub(crate) children: Vec<MarkupHandle>,
}

impl ElementNode {
    /// The local tag name, e.g. `"a"` or `"p"`.
    pub fn tag(&self) -> &str {
        self.name.local.as_ref()
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _v)| n == name)
            .map(|(_n, v)| v.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.get_attr(name).is_some()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextNode {
    pub(crate) content: String,
}

impl TextNode {
    pub fn content(&self) -> &str {
        &self.content
    }
}
