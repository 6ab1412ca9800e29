//! Block extractor.
//!
//! Walks the content boundary of one section and turns it into an ordered
//! list of [`RawBlock`]s. Typing follows [`detect_block_type`]; footnote
//! references are resolved against the document's [`FootnoteIndex`] and each
//! footnote is attached to the first block in the section that cites it.

use std::collections::HashSet;

use tracing::trace;

use folio_markup::{NON_CONTENT_TAGS, Node, NodeKind, normalize_whitespace};
use folio_shared::{BlockType, FootnoteEntry};

use crate::footnotes::FootnoteIndex;

/// Class of the spans marking individual verse lines.
pub const VERSE_LINE_CLASS: &str = "verse-line";

/// Prefix for each list item line.
pub const LIST_BULLET: &str = "• ";

/// Containers that never produce a block themselves.
const GROUPING_TAGS: &[&str] = &[
    "body", "div", "section", "article", "main", "header", "footer", "aside", "nav", "figure",
];

const SINGLE_BLOCK_TAGS: &[&str] = &["p", "h1", "h2", "h3", "h4", "h5", "h6"];

/// A block as extracted, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBlock {
    pub kind: BlockType,
    /// Normalized text (multi-line for lists and poetry).
    pub text: String,
    pub source_id: Option<String>,
    /// Resolved footnotes in citation order.
    pub footnotes: Vec<FootnoteEntry>,
}

/// Classify a node by the first rule that matches:
/// blockquote, `h4`–`h6`, list, paragraph with several verse lines, paragraph.
pub fn detect_block_type(node: &Node<'_>) -> BlockType {
    match node.tag() {
        Some("blockquote") => BlockType::Quote,
        Some("h4" | "h5" | "h6") => BlockType::Heading,
        Some("ul" | "ol") => BlockType::List,
        Some("p") if verse_lines(node).count() > 1 => BlockType::Poetry,
        _ => BlockType::Paragraph,
    }
}

/// Extract the raw blocks of one section's content nodes.
pub fn extract_blocks(content: &[Node<'_>], footnotes: &FootnoteIndex) -> Vec<RawBlock> {
    let mut extractor = BlockExtractor::new(footnotes);
    for node in content {
        extractor.walk(*node);
    }
    extractor.blocks
}

struct BlockExtractor<'i> {
    footnotes: &'i FootnoteIndex,
    /// Footnote ids already attached to a block in this section.
    consumed: HashSet<String>,
    /// Depth of enclosing blockquotes; paragraphs inside one are quotes.
    quote_depth: usize,
    blocks: Vec<RawBlock>,
}

impl<'i> BlockExtractor<'i> {
    fn new(footnotes: &'i FootnoteIndex) -> Self {
        Self {
            footnotes,
            consumed: HashSet::new(),
            quote_depth: 0,
            blocks: Vec::new(),
        }
    }

    fn in_quote(&self, kind: BlockType) -> BlockType {
        match kind {
            BlockType::Paragraph if self.quote_depth > 0 => BlockType::Quote,
            other => other,
        }
    }

    fn walk(&mut self, node: Node<'_>) {
        let tag = match node.kind() {
            NodeKind::Text(text) => {
                let text = normalize_whitespace(text);
                if !text.is_empty() {
                    let kind = self.in_quote(BlockType::Paragraph);
                    self.blocks.push(RawBlock {
                        kind,
                        text,
                        source_id: None,
                        footnotes: Vec::new(),
                    });
                }
                return;
            }
            NodeKind::Element(el) => el.name.as_str(),
        };

        match tag {
            t if NON_CONTENT_TAGS.contains(&t) => {}
            t if SINGLE_BLOCK_TAGS.contains(&t) => {
                self.push_element(node, detect_block_type(&node));
            }
            "blockquote" => self.walk_quote(node),
            "ul" | "ol" => self.push_list(node),
            t if GROUPING_TAGS.contains(&t) => {
                for child in node.children() {
                    self.walk(child);
                }
            }
            _ => {
                if node.children().next().is_some() {
                    for child in node.children() {
                        self.walk(child);
                    }
                } else {
                    self.push_element(node, detect_block_type(&node));
                }
            }
        }
    }

    /// Every paragraph of a quote becomes its own quote block, at any depth,
    /// as does loose text beside them. A quote without paragraphs becomes
    /// one block.
    fn walk_quote(&mut self, quote: Node<'_>) {
        if !quote.descendants().any(|d| d.tag() == Some("p")) {
            self.push_element(quote, BlockType::Quote);
            return;
        }

        self.quote_depth += 1;
        for child in quote.children() {
            self.walk(child);
        }
        self.quote_depth -= 1;
    }

    fn push_element(&mut self, node: Node<'_>, kind: BlockType) {
        let kind = self.in_quote(kind);
        let text = match kind {
            BlockType::Poetry => poetry_text(&node),
            _ => normalize_whitespace(&node.text_content()),
        };

        let footnotes = self.collect_footnotes(&node);
        trace!(%kind, len = text.len(), footnotes = footnotes.len(), "block");

        self.blocks.push(RawBlock {
            kind,
            text,
            source_id: source_id(&node),
            footnotes,
        });
    }

    /// One block for the whole list, one bulleted line per item.
    fn push_list(&mut self, list: Node<'_>) {
        let text = list
            .children()
            .filter(|c| c.tag() == Some("li"))
            .map(|li| normalize_whitespace(&li.text_content()))
            .filter(|item| !item.is_empty())
            .map(|item| format!("{LIST_BULLET}{item}"))
            .collect::<Vec<_>>()
            .join("\n");

        let footnotes = self.collect_footnotes(&list);

        self.blocks.push(RawBlock {
            kind: BlockType::List,
            text,
            source_id: source_id(&list),
            footnotes,
        });
    }

    /// Resolve the footnote references inside `node`, skipping ids that are
    /// unknown or already attached earlier in this section.
    fn collect_footnotes(&mut self, node: &Node<'_>) -> Vec<FootnoteEntry> {
        let mut found = Vec::new();

        for fragment in footnote_refs(node) {
            let Some(entry) = self.footnotes.get(fragment) else {
                trace!(fragment, "unresolved footnote reference");
                continue;
            };
            if self.consumed.insert(fragment.to_string()) {
                found.push(entry.clone());
            }
        }

        found
    }
}

/// Fragment ids of superscript anchors (`<sup><a href="#x">` or
/// `<a href="#x"><sup>`) inside `node`, in document order.
pub fn footnote_refs<'a>(node: &Node<'a>) -> impl Iterator<Item = &'a str> + use<'a> {
    let root = *node;
    std::iter::once(root)
        .chain(root.descendants())
        .filter(|n| n.tag() == Some("a"))
        .filter_map(move |a| {
            let fragment = a.attribute("href")?.strip_prefix('#')?;
            let superscript = a.ancestors().any(|p| p.tag() == Some("sup"))
                || a.descendants().any(|d| d.tag() == Some("sup"));
            (superscript && !fragment.is_empty()).then_some(fragment)
        })
}

/// Own `id`, else the first descendant `id`.
fn source_id(node: &Node<'_>) -> Option<String> {
    std::iter::once(*node)
        .chain(node.descendants())
        .find_map(|n| n.attribute("id").filter(|id| !id.is_empty()))
        .map(String::from)
}

/// All of a poetry paragraph's text, one line per verse-line span. Text
/// outside the spans keeps its own lines; `<br>` also breaks a line.
fn poetry_text(node: &Node<'_>) -> String {
    fn collect(node: Node<'_>, current: &mut String, lines: &mut Vec<String>) {
        for child in node.children() {
            match child.kind() {
                NodeKind::Text(text) => current.push_str(text),
                NodeKind::Element(el) if NON_CONTENT_TAGS.contains(&el.name.as_str()) => {}
                NodeKind::Element(el) if el.name == "br" => {
                    lines.push(std::mem::take(current));
                }
                NodeKind::Element(el)
                    if el.name == "span" && child.has_class(VERSE_LINE_CLASS) =>
                {
                    lines.push(std::mem::take(current));
                    lines.push(child.text_content());
                }
                NodeKind::Element(_) => collect(child, current, lines),
            }
        }
    }

    let mut current = String::new();
    let mut lines = Vec::new();
    collect(*node, &mut current, &mut lines);
    lines.push(current);

    lines
        .iter()
        .map(|line| normalize_whitespace(line))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn verse_lines<'a>(node: &Node<'a>) -> impl Iterator<Item = Node<'a>> + use<'a> {
    node.descendants()
        .filter(|d| d.tag() == Some("span") && d.has_class(VERSE_LINE_CLASS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_markup::Document;

    fn index(entries: &[(&str, Option<&str>, &str)]) -> FootnoteIndex {
        entries
            .iter()
            .map(|(id, number, text)| {
                (
                    id.to_string(),
                    FootnoteEntry {
                        id: id.to_string(),
                        number: number.map(String::from),
                        text: text.to_string(),
                        target_id: None,
                    },
                )
            })
            .collect()
    }

    fn extract(html: &str, footnotes: &FootnoteIndex) -> Vec<RawBlock> {
        let doc = Document::parse(html);
        let content: Vec<_> = doc.body().children().collect();
        extract_blocks(&content, footnotes)
    }

    fn kinds(blocks: &[RawBlock]) -> Vec<BlockType> {
        blocks.iter().map(|b| b.kind).collect()
    }

    #[test]
    fn classification_priority() {
        let doc = Document::parse(
            r#"<blockquote id="q"></blockquote><h4 id="h"></h4><h2 id="h2"></h2><ol id="l"></ol>
            <p id="poem"><span class="verse-line">a</span><span class="verse-line">b</span></p>
            <p id="one"><span class="verse-line">a</span></p>"#,
        );
        let by_id = |id: &str| {
            doc.body()
                .descendants()
                .find(|n| n.attribute("id") == Some(id))
                .unwrap()
        };
        assert_eq!(detect_block_type(&by_id("q")), BlockType::Quote);
        assert_eq!(detect_block_type(&by_id("h")), BlockType::Heading);
        assert_eq!(detect_block_type(&by_id("h2")), BlockType::Paragraph);
        assert_eq!(detect_block_type(&by_id("l")), BlockType::List);
        assert_eq!(detect_block_type(&by_id("poem")), BlockType::Poetry);
        assert_eq!(detect_block_type(&by_id("one")), BlockType::Paragraph);
    }

    #[test]
    fn grouping_containers_are_transparent() {
        let blocks = extract(
            r#"<div><section><p>One</p><article><h5>Two</h5></article></section></div>"#,
            &FootnoteIndex::new(),
        );
        assert_eq!(kinds(&blocks), vec![BlockType::Paragraph, BlockType::Heading]);
        assert_eq!(blocks[1].text, "Two");
    }

    #[test]
    fn quote_paragraphs_become_separate_blocks() {
        let blocks = extract(
            "<blockquote><p>Do not despair.</p><p>-- Author Name</p></blockquote>",
            &FootnoteIndex::new(),
        );
        assert_eq!(kinds(&blocks), vec![BlockType::Quote, BlockType::Quote]);
        assert_eq!(blocks[0].text, "Do not despair.");
        assert_eq!(blocks[1].text, "-- Author Name");
    }

    #[test]
    fn quote_without_paragraphs_is_one_block() {
        let blocks = extract("<blockquote>  Bare   quote </blockquote>", &FootnoteIndex::new());
        assert_eq!(kinds(&blocks), vec![BlockType::Quote]);
        assert_eq!(blocks[0].text, "Bare quote");
    }

    #[test]
    fn lists_are_bulleted_lines() {
        let blocks = extract(
            r#"<ul id="items"><li> First  item </li><li></li><li>Second</li></ul>"#,
            &FootnoteIndex::new(),
        );
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, BlockType::List);
        assert_eq!(blocks[0].text, "• First item\n• Second");
        assert_eq!(blocks[0].source_id.as_deref(), Some("items"));
    }

    #[test]
    fn poetry_keeps_line_breaks() {
        let blocks = extract(
            r#"<p><span class="verse-line">The Lord is my shepherd;</span><br>
               <span class="verse-line">I shall not  want.</span></p>"#,
            &FootnoteIndex::new(),
        );
        assert_eq!(blocks[0].kind, BlockType::Poetry);
        assert_eq!(blocks[0].text, "The Lord is my shepherd;\nI shall not want.");
    }

    #[test]
    fn poetry_keeps_text_outside_verse_lines() {
        let footnotes = index(&[("fn4", Some("4"), "Psalm 119")]);
        let blocks = extract(
            r##"<p>Intro words <span class="verse-line">line one</span><span class="verse-line">line
               two<sup><a href="#fn4">4</a></sup></span> closing <em>words</em></p>"##,
            &footnotes,
        );
        assert_eq!(blocks[0].kind, BlockType::Poetry);
        assert_eq!(blocks[0].text, "Intro words\nline one\nline two4\nclosing words");
        assert_eq!(blocks[0].footnotes.len(), 1);
    }

    #[test]
    fn nested_quote_content_stays_quoted() {
        let blocks = extract(
            r#"<blockquote>Loose line<div><p>Deep paragraph</p></div><p>Direct</p>
               <h5>Heading</h5></blockquote><p>After</p>"#,
            &FootnoteIndex::new(),
        );
        let texts: Vec<_> = blocks.iter().map(|b| (b.kind, b.text.as_str())).collect();
        assert_eq!(
            texts,
            vec![
                (BlockType::Quote, "Loose line"),
                (BlockType::Quote, "Deep paragraph"),
                (BlockType::Quote, "Direct"),
                (BlockType::Heading, "Heading"),
                (BlockType::Paragraph, "After"),
            ]
        );
    }

    #[test]
    fn bare_text_and_inline_elements() {
        let blocks = extract("Loose text<span>inline</span><hr>", &FootnoteIndex::new());
        let texts: Vec<_> = blocks.iter().map(|b| b.text.as_str()).collect();
        // the childless <hr> yields an empty block, dropped later by the normalizer
        assert_eq!(texts, vec!["Loose text", "inline", ""]);
    }

    #[test]
    fn scripts_are_skipped() {
        let blocks = extract("<script>var x = 1;</script><p>Kept</p>", &FootnoteIndex::new());
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "Kept");
    }

    #[test]
    fn source_id_prefers_own_then_descendant() {
        let blocks = extract(
            r#"<p id="own"><a id="inner">x</a></p><p><a id="inner2">y</a></p><p>z</p>"#,
            &FootnoteIndex::new(),
        );
        let ids: Vec<_> = blocks.iter().map(|b| b.source_id.as_deref()).collect();
        assert_eq!(ids, vec![Some("own"), Some("inner2"), None]);
    }

    #[test]
    fn footnotes_resolve_and_dedupe() {
        let footnotes = index(&[("fn1", Some("1"), "See also X"), ("fn2", None, "Plain")]);
        let blocks = extract(
            r##"<p>Text<sup><a href="#fn1">1</a></sup> again<sup><a href="#fn1">1</a></sup>
                 and <a href="#fn2"><sup>2</sup></a> and <sup><a href="#missing">9</a></sup>
                 and <a href="#fn2">not superscript</a></p>"##,
            &footnotes,
        );
        let ids: Vec<_> = blocks[0].footnotes.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["fn1", "fn2"]);
    }

    #[test]
    fn first_block_consumes_footnote() {
        let footnotes = index(&[("fn1", Some("1"), "See also X")]);
        let blocks = extract(
            r##"<p>A<sup><a href="#fn1">1</a></sup></p><p>B<sup><a href="#fn1">1</a></sup></p>"##,
            &footnotes,
        );
        assert_eq!(blocks[0].footnotes.len(), 1);
        assert!(blocks[1].footnotes.is_empty());
    }
}
