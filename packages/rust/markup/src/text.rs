//! Plain-text helpers: whitespace normalization, slugs and file-name titles.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

/// Collapse every whitespace run (newlines included) to one space and trim.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize each line on its own and drop empty lines, keeping line breaks.
///
/// Used where a value is intentionally multi-line (list blocks, share text
/// parts, whole-document text).
pub fn normalize_lines(text: &str) -> String {
    text.lines()
        .map(normalize_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Generate a URL-safe slug from a title.
pub fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Derive a human-readable title from a file name.
///
/// The extension is dropped, runs of separators become single spaces, and
/// the first letter of each word is uppercased (the rest is left alone).
pub fn title_from_file_name(file_name: &str) -> String {
    static SEPARATORS_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[\s_.\-]+").expect("valid regex"));

    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);

    let spaced = SEPARATORS_RE.replace_all(stem, " ");

    let mut title = String::with_capacity(spaced.len());
    let mut at_word_start = true;
    for c in spaced.chars() {
        if at_word_start && c.is_alphanumeric() {
            title.extend(c.to_uppercase());
        } else {
            title.push(c);
        }
        at_word_start = !(c.is_alphanumeric() || c == '_');
    }

    title.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_collapses_everything() {
        assert_eq!(normalize_whitespace("  a\n\t b\u{a0}c  "), "a b c");
        assert_eq!(normalize_whitespace(" \n "), "");
    }

    #[test]
    fn lines_keep_breaks_but_drop_blank_lines() {
        assert_eq!(normalize_lines("  • one  \n\n   • two\t\n"), "• one\n• two");
        assert_eq!(normalize_lines("Do not despair.\n\n-- Author"), "Do not despair.\n-- Author");
    }

    #[test]
    fn slugify_titles() {
        assert_eq!(slugify("Preface"), "preface");
        assert_eq!(slugify("Chapter One (Abridged)"), "chapter-one-abridged");
        assert_eq!(slugify("  --  "), "");
        assert_eq!(slugify("Über die Gnade"), "über-die-gnade");
    }

    #[test]
    fn file_name_titles() {
        assert_eq!(title_from_file_name("morning-prayers.html"), "Morning Prayers");
        assert_eq!(title_from_file_name("the__little_flowers.htm"), "The Little Flowers");
        assert_eq!(title_from_file_name("psalms.of.david.xhtml"), "Psalms Of David");
        assert_eq!(title_from_file_name("-leading-dash-.html"), "Leading Dash");
        assert_eq!(title_from_file_name("already Cased.html"), "Already Cased");
    }
}
