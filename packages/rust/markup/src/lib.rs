//! Markup loading into an immutable, arena-indexed node tree.
//!
//! Source documents are parsed with `scraper` (html5ever) and copied into a
//! flat arena of [`NodeData`] addressed by [`NodeId`]. Only two node kinds
//! survive the copy, text and element; comments, doctypes and processing
//! instructions are dropped. The resulting [`Document`] never changes after
//! construction, and [`Node`] is a cheap `Copy` handle into it.

mod text;

use scraper::{ElementRef, Html};
use tracing::{debug, instrument};

use folio_shared::{FolioError, Result};

pub use text::{normalize_lines, normalize_whitespace, slugify, title_from_file_name};

// ---------------------------------------------------------------------------
// Arena types
// ---------------------------------------------------------------------------

/// Index of a node inside its [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// An element's tag name and attributes.
#[derive(Debug, Clone)]
pub struct Element {
    /// Lowercase local name, e.g. `p` or `blockquote`.
    pub name: String,
    /// Attributes in source order.
    pub attrs: Vec<(String, String)>,
}

/// The closed set of node kinds kept in the tree.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Text(String),
    Element(Element),
}

/// Arena slot: the node itself plus its links.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// A parsed, immutable markup document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl Document {
    /// Parse a full HTML/XHTML document.
    #[instrument(level = "debug", skip_all, fields(len = source.len()))]
    pub fn parse(source: &str) -> Self {
        let html = Html::parse_document(source);
        let mut builder = Builder { nodes: Vec::new() };
        let root = builder.copy_element(html.root_element(), None);

        debug!(nodes = builder.nodes.len(), "document tree built");

        Self {
            nodes: builder.nodes,
            root,
        }
    }

    /// Decode raw bytes as UTF-8 (tolerating a byte-order mark) and parse them.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let source = std::str::from_utf8(bytes)
            .map_err(|e| FolioError::parse(format!("source is not valid UTF-8: {e}")))?;
        Ok(Self::parse(source))
    }

    /// The root (`html`) element.
    pub fn root(&self) -> Node<'_> {
        self.node(self.root)
    }

    /// Handle for a node id.
    ///
    /// # Panics
    /// Panics if `id` did not come from this document.
    pub fn node(&self, id: NodeId) -> Node<'_> {
        assert!(id.0 < self.nodes.len(), "node id out of range");
        Node { doc: self, id }
    }

    /// The `body` element, falling back to the root element.
    pub fn body(&self) -> Node<'_> {
        self.root()
            .descendants()
            .find(|n| n.tag() == Some("body"))
            .unwrap_or_else(|| self.root())
    }

    /// Normalized text of the `<title>` element, if present and non-empty.
    pub fn title(&self) -> Option<String> {
        self.root()
            .descendants()
            .find(|n| n.tag() == Some("title"))
            .map(|n| normalize_whitespace(&n.text_content()))
            .filter(|t| !t.is_empty())
    }

    /// Total number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

struct Builder {
    nodes: Vec<NodeData>,
}

impl Builder {
    fn push(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    fn copy_element(&mut self, el: ElementRef<'_>, parent: Option<NodeId>) -> NodeId {
        let value = el.value();
        let element = Element {
            name: value.name().to_ascii_lowercase(),
            attrs: value
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        };
        let id = self.push(NodeKind::Element(element), parent);

        for child in el.children() {
            match child.value() {
                scraper::Node::Text(text) => {
                    self.push(NodeKind::Text(String::from(&**text)), Some(id));
                }
                scraper::Node::Element(_) => {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        self.copy_element(child_el, Some(id));
                    }
                }
                _ => {}
            }
        }

        id
    }
}

// ---------------------------------------------------------------------------
// Node handle
// ---------------------------------------------------------------------------

/// Borrowed handle to one node of a [`Document`].
#[derive(Clone, Copy)]
pub struct Node<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl std::fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind() {
            NodeKind::Text(text) => f.debug_tuple("Text").field(text).finish(),
            NodeKind::Element(el) => f
                .debug_struct("Element")
                .field("id", &self.id)
                .field("name", &el.name)
                .finish(),
        }
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl Eq for Node<'_> {}

impl<'a> Node<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    fn data(&self) -> &'a NodeData {
        &self.doc.nodes[self.id.0]
    }

    pub fn kind(&self) -> &'a NodeKind {
        &self.data().kind
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind(), NodeKind::Text(_))
    }

    pub fn is_element(&self) -> bool {
        matches!(self.kind(), NodeKind::Element(_))
    }

    /// Element data, or `None` for text nodes.
    pub fn element(&self) -> Option<&'a Element> {
        match self.kind() {
            NodeKind::Element(el) => Some(el),
            NodeKind::Text(_) => None,
        }
    }

    /// Lowercase tag name, or `None` for text nodes.
    pub fn tag(&self) -> Option<&'a str> {
        self.element().map(|el| el.name.as_str())
    }

    /// True if this is an element with one of the given tag names.
    pub fn is_any_of(&self, tags: &[&str]) -> bool {
        self.tag().is_some_and(|t| tags.contains(&t))
    }

    /// Attribute value by (case-sensitive) name.
    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.element()?
            .attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// True if the whitespace-separated `class` attribute contains `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    pub fn parent(&self) -> Option<Node<'a>> {
        self.data().parent.map(|id| self.doc.node(id))
    }

    /// Direct children in document order.
    pub fn children(&self) -> impl Iterator<Item = Node<'a>> + use<'a> {
        let doc = self.doc;
        self.data().children.iter().map(move |&id| doc.node(id))
    }

    /// All descendants in document (pre-)order, excluding `self`.
    pub fn descendants(&self) -> Descendants<'a> {
        let mut stack: Vec<NodeId> = self.data().children.clone();
        stack.reverse();
        Descendants {
            doc: self.doc,
            stack,
        }
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self) -> impl Iterator<Item = Node<'a>> + use<'a> {
        std::iter::successors(self.parent(), |n| n.parent())
    }

    /// Siblings after this node, in document order.
    pub fn following_siblings(&self) -> impl Iterator<Item = Node<'a>> + use<'a> {
        let doc = self.doc;
        let id = self.id;
        let siblings: &'a [NodeId] = match self.data().parent {
            Some(parent) => &doc.nodes[parent.0].children,
            None => &[],
        };
        let start = siblings
            .iter()
            .position(|&s| s == id)
            .map_or(siblings.len(), |p| p + 1);
        siblings[start..].iter().map(move |&s| doc.node(s))
    }

    /// Concatenated raw text of this node and all its descendants.
    pub fn text_content(&self) -> String {
        match self.kind() {
            NodeKind::Text(text) => text.clone(),
            NodeKind::Element(_) => self
                .descendants()
                .filter_map(|n| match n.kind() {
                    NodeKind::Text(text) => Some(text.as_str()),
                    NodeKind::Element(_) => None,
                })
                .collect(),
        }
    }

    /// True if `other` is a strict descendant of this node.
    pub fn contains(&self, other: &Node<'_>) -> bool {
        std::ptr::eq(self.doc, other.doc) && other.ancestors().any(|a| a.id == self.id)
    }

    /// Text as a reader would see it: non-content elements are skipped and
    /// block-level elements start and end a line. Lines are not normalized.
    pub fn readable_text(&self) -> String {
        let mut out = String::new();
        self.push_readable(&mut out);
        out
    }

    fn push_readable(&self, out: &mut String) {
        match self.kind() {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element(el) => {
                let name = el.name.as_str();
                if NON_CONTENT_TAGS.contains(&name) {
                    return;
                }
                let block = BLOCK_LEVEL_TAGS.contains(&name);
                if block {
                    out.push('\n');
                }
                for child in self.children() {
                    child.push_readable(out);
                }
                if block {
                    out.push('\n');
                }
            }
        }
    }
}

/// Elements whose text is never document content.
pub const NON_CONTENT_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Elements that break lines in [`Node::readable_text`].
const BLOCK_LEVEL_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav",
    "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

/// Pre-order iterator over a node's descendants.
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = Node<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let children = &self.doc.nodes[id.0].children;
        self.stack.extend(children.iter().rev());
        Some(self.doc.node(id))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
