//! Footnote indexer.
//!
//! Builds an id → [`FootnoteEntry`] map from the list items of a document's
//! footnote list. A list item only counts when it carries all three markers:
//! a number label, a content anchor with an `id`, and a return link pointing
//! back at the citation (`href="#..."`). Anything else is silently skipped.

use std::collections::HashMap;

use tracing::{debug, instrument};

use folio_markup::{Document, Node, normalize_whitespace};
use folio_shared::FootnoteEntry;

/// Class of the element holding the footnote's number label.
pub const FOOTNOTE_NUMBER_CLASS: &str = "footnote-number";
/// Class of the anchor whose `id` in-text references point at.
pub const FOOTNOTE_CONTENT_CLASS: &str = "footnote-content";
/// Class of the `<a>` linking back to the citation point.
pub const FOOTNOTE_RETURN_CLASS: &str = "footnote-return";

/// Footnotes of one document, keyed by content anchor id.
pub type FootnoteIndex = HashMap<String, FootnoteEntry>;

/// Scan every `<li>` of the document and index the qualifying footnotes.
///
/// When two list items share an id, the first one in document order wins.
#[instrument(skip_all)]
pub fn index_footnotes(doc: &Document) -> FootnoteIndex {
    let mut index = FootnoteIndex::new();

    for li in doc.root().descendants().filter(|n| n.tag() == Some("li")) {
        let Some(entry) = footnote_from_item(li) else {
            continue;
        };
        index.entry(entry.id.clone()).or_insert(entry);
    }

    debug!(count = index.len(), "footnotes indexed");
    index
}

fn footnote_from_item(li: Node<'_>) -> Option<FootnoteEntry> {
    let owned = || li.descendants().filter(move |n| nearest_item(n) == Some(li));

    let number_el = owned().find(|n| n.has_class(FOOTNOTE_NUMBER_CLASS))?;
    let content = owned().find(|n| {
        n.has_class(FOOTNOTE_CONTENT_CLASS) && n.attribute("id").is_some_and(|id| !id.is_empty())
    })?;
    let back_ref = owned().find(|n| {
        n.tag() == Some("a")
            && n.has_class(FOOTNOTE_RETURN_CLASS)
            && n.attribute("href").is_some_and(|h| h.starts_with('#'))
    })?;

    let id = content.attribute("id")?.to_string();

    // Prefer the paragraph around the content anchor; fall back to the whole item.
    let text_source = std::iter::once(content)
        .chain(content.ancestors().take_while(|a| *a != li))
        .find(|n| n.tag() == Some("p"))
        .unwrap_or(li);
    let text = normalize_whitespace(&text_source.text_content());
    if text.is_empty() {
        return None;
    }

    let number = normalize_whitespace(&number_el.text_content())
        .trim_end_matches('.')
        .trim()
        .to_string();

    let target_id = back_ref
        .attribute("href")
        .map(|h| h.trim_start_matches('#').to_string())
        .filter(|t| !t.is_empty());

    Some(FootnoteEntry {
        id,
        number: (!number.is_empty()).then_some(number),
        text,
        target_id,
    })
}

/// The closest enclosing `<li>` of a node.
fn nearest_item<'a>(node: &Node<'a>) -> Option<Node<'a>> {
    node.ancestors().find(|a| a.tag() == Some("li"))
}
