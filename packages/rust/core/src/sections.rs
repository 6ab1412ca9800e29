//! Section locator.
//!
//! Sections are introduced by "card" elements that contain an `h2`. Each
//! card yields a title (its first `h2`, plus the first fully parenthesized
//! `h3` if there is one), a slug id, and a content boundary running from the
//! card itself up to the next card.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};

use folio_markup::{Node, NodeId, normalize_whitespace, slugify};

/// Class of the structural element that introduces a section.
pub const SECTION_ANCHOR_CLASS: &str = "card";

/// Headings of the anchor itself that are consumed as the section title.
const TITLE_HEADINGS: &[&str] = &["h1", "h2", "h3"];

/// A section anchor with its derived title, id, and content boundary.
#[derive(Debug, Clone)]
pub struct LocatedSection<'a> {
    /// Slug, unique within the document.
    pub id: String,
    /// Combined title (`h2` text plus optional parenthesized `h3`).
    pub title: String,
    /// The anchor element.
    pub anchor: Node<'a>,
    /// Top-level nodes belonging to this section, in document order.
    pub content: Vec<Node<'a>>,
}

/// Find every section anchor below `body`, in document order.
#[instrument(skip_all)]
pub fn locate_sections<'a>(body: Node<'a>) -> Vec<LocatedSection<'a>> {
    let anchors: Vec<Node<'a>> = body.descendants().filter(is_section_anchor).collect();
    let anchor_ids: HashSet<NodeId> = anchors.iter().map(Node::id).collect();

    let mut seen_ids: HashMap<String, usize> = HashMap::new();
    let mut sections = Vec::with_capacity(anchors.len());

    for (i, anchor) in anchors.iter().enumerate() {
        let title = section_title(anchor);
        let slug = match slugify(&title) {
            s if s.is_empty() => format!("section-{}", i + 1),
            s => s,
        };
        let id = unique_id(slug, &mut seen_ids);

        sections.push(LocatedSection {
            id,
            title,
            anchor: *anchor,
            content: section_content(anchor, &anchor_ids),
        });
    }

    debug!(count = sections.len(), "sections located");
    sections
}

/// A card element with at least one `h2` somewhere inside it.
pub fn is_section_anchor(node: &Node<'_>) -> bool {
    node.has_class(SECTION_ANCHOR_CLASS) && node.descendants().any(|d| d.tag() == Some("h2"))
}

/// Title of a section anchor: first `h2`, plus the first `h3` whose text is
/// entirely wrapped in parentheses.
pub fn section_title(anchor: &Node<'_>) -> String {
    static PARENTHESIZED_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^\(.*\)$").expect("valid regex"));

    let base = anchor
        .descendants()
        .find(|d| d.tag() == Some("h2"))
        .map(|h| normalize_whitespace(&h.text_content()))
        .unwrap_or_default();

    let qualifier = anchor
        .descendants()
        .filter(|d| d.tag() == Some("h3"))
        .map(|h| normalize_whitespace(&h.text_content()))
        .find(|t| PARENTHESIZED_RE.is_match(t));

    match qualifier {
        Some(q) if base.is_empty() => q,
        Some(q) => format!("{base} {q}"),
        None => base,
    }
}

/// Suffix repeated slugs with `-2`, `-3`, ... so ids stay unique.
fn unique_id(slug: String, seen: &mut HashMap<String, usize>) -> String {
    let count = seen.entry(slug.clone()).or_insert(0);
    *count += 1;
    if *count == 1 {
        return slug;
    }

    let mut n = *count;
    loop {
        let candidate = format!("{slug}-{n}");
        if !seen.contains_key(&candidate) {
            seen.insert(candidate.clone(), 1);
            return candidate;
        }
        n += 1;
    }
}

/// The anchor's children minus its title headings, followed by its
/// siblings up to (not including) the next anchor.
///
/// Nodes that are or contain another anchor never belong to this section:
/// nested children are dropped, and such a sibling ends the section, so no
/// content is emitted twice.
fn section_content<'a>(anchor: &Node<'a>, anchor_ids: &HashSet<NodeId>) -> Vec<Node<'a>> {
    let holds_anchor = |n: &Node<'_>| {
        anchor_ids.contains(&n.id()) || n.descendants().any(|d| anchor_ids.contains(&d.id()))
    };

    let own = anchor
        .children()
        .filter(|c| !c.is_any_of(TITLE_HEADINGS) && !holds_anchor(c));

    let following = anchor.following_siblings().take_while(|s| !holds_anchor(s));

    own.chain(following).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_markup::Document;

    fn tags(section: &LocatedSection<'_>) -> Vec<String> {
        section
            .content
            .iter()
            .filter_map(|n| n.tag().map(String::from))
            .collect()
    }

    #[test]
    fn locates_cards_with_h2() {
        let html = r#"<body>
            <div class="card"><h2>Preface</h2><p>a</p></div>
            <p>b</p>
            <div class="card"><h3>No h2 here</h3></div>
            <div class="card highlighted"><h2>Notes</h2></div>
            <ul><li>c</li></ul>
        </body>"#;
        let doc = Document::parse(html);
        let sections = locate_sections(doc.body());

        let titles: Vec<_> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Preface", "Notes"]);
        assert_eq!(sections[0].id, "preface");

        // the h2-less card is ordinary content of the first section
        assert_eq!(tags(&sections[0]), vec!["p", "p", "div"]);
        assert_eq!(tags(&sections[1]), vec!["ul"]);
    }

    #[test]
    fn parenthesized_h3_is_appended() {
        let html = r#"<div class="card">
            <h2>Psalm 23</h2><h3>A Psalm of David</h3><div><h3> (Shepherd
            Psalm) </h3></div><h3>(second)</h3></div>"#;
        let doc = Document::parse(html);
        let sections = locate_sections(doc.body());
        assert_eq!(sections[0].title, "Psalm 23 (Shepherd Psalm)");
        assert_eq!(sections[0].id, "psalm-23-shepherd-psalm");
    }

    #[test]
    fn title_headings_are_excluded_from_content() {
        let html = r#"<div class="card"><h1>Book</h1><h2>Title</h2><h3>(x)</h3><h4>Sub</h4><p>body</p></div>"#;
        let doc = Document::parse(html);
        let sections = locate_sections(doc.body());
        assert_eq!(tags(&sections[0]), vec!["h4", "p"]);
    }

    #[test]
    fn empty_slug_falls_back_to_index() {
        let html = r#"<div class="card"><h2>Intro</h2></div><div class="card"><h2> *** </h2></div>"#;
        let doc = Document::parse(html);
        let sections = locate_sections(doc.body());
        assert_eq!(sections[1].id, "section-2");
        assert_eq!(sections[1].title, "***");
    }

    #[test]
    fn duplicate_titles_get_unique_ids() {
        let html = r#"
            <div class="card"><h2>Notes</h2></div>
            <div class="card"><h2>Notes</h2></div>
            <div class="card"><h2>Notes 2</h2></div>
            <div class="card"><h2>Notes</h2></div>"#;
        let doc = Document::parse(html);
        let ids: Vec<_> = locate_sections(doc.body()).into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["notes", "notes-2", "notes-2-2", "notes-3"]);
    }

    #[test]
    fn wrapper_containing_next_anchor_ends_section() {
        let html = r#"
            <div class="card"><h2>One</h2></div>
            <p>kept</p>
            <section><p>lost</p><div class="card"><h2>Two</h2><p>two body</p></div></section>"#;
        let doc = Document::parse(html);
        let sections = locate_sections(doc.body());
        assert_eq!(sections.len(), 2);
        assert_eq!(tags(&sections[0]), vec!["p"]);
        assert_eq!(tags(&sections[1]), vec!["p"]);
    }

    #[test]
    fn nested_card_belongs_only_to_itself() {
        let html = r#"<div class="card"><h2>Outer</h2><p>outer body</p>
            <div class="card"><h2>Inner</h2><p>inner body</p></div></div>"#;
        let doc = Document::parse(html);
        let sections = locate_sections(doc.body());
        assert_eq!(sections.len(), 2);

        let texts = |s: &LocatedSection<'_>| -> Vec<String> {
            s.content
                .iter()
                .map(|n| normalize_whitespace(&n.text_content()))
                .filter(|t| !t.is_empty())
                .collect()
        };
        assert_eq!(texts(&sections[0]), vec!["outer body"]);
        assert_eq!(texts(&sections[1]), vec!["inner body"]);
    }

    #[test]
    fn no_anchors_means_no_sections() {
        let doc = Document::parse("<p>just prose</p>");
        assert!(locate_sections(doc.body()).is_empty());
    }
}
