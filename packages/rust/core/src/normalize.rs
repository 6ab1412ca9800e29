//! Block normalizer.
//!
//! Runs once over a section's raw blocks, in this order:
//! 1. drop blocks with no text and no footnotes
//! 2. drop `* * *` separators
//! 3. drop bare roman or decimal numerals
//! 4. fold dash-prefixed lines into the previous block's attribution
//! 5. derive share text
//! 6. assign ids and emit the public [`Block`] shape

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use folio_markup::normalize_lines;
use folio_shared::{Block, BlockType, FootnoteEntry};

use crate::blocks::RawBlock;

/// Scene-break literal removed from the output.
pub const SEPARATOR: &str = "* * *";

static NUMERAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[IVXLCDM0-9]+$").expect("valid regex"));

static ATTRIBUTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:--|[-–—])\s*").expect("valid regex"));

/// Working state of a block between steps 4 and 6.
#[derive(Debug)]
struct PendingBlock {
    kind: BlockType,
    text: String,
    source_id: Option<String>,
    attribution: Option<String>,
    footnotes: Vec<FootnoteEntry>,
    /// Attribution lines, in the order they were folded in.
    share_parts: Vec<String>,
}

impl PendingBlock {
    fn from_raw(raw: RawBlock, text: String) -> Self {
        Self {
            kind: raw.kind,
            text,
            source_id: raw.source_id,
            attribution: None,
            footnotes: raw.footnotes,
            share_parts: Vec::new(),
        }
    }

    fn fold_attribution(&mut self, line: String, footnotes: Vec<FootnoteEntry>) {
        self.attribution = Some(match self.attribution.take() {
            Some(existing) => format!("{existing}\n{line}"),
            None => line.clone(),
        });
        self.share_parts.push(line);
        self.footnotes.extend(footnotes);
    }

    fn share_text(&self) -> String {
        let parts: Vec<String> = std::iter::once(self.text.clone())
            .chain(self.share_parts.iter().cloned())
            .chain(self.footnotes.iter().map(FootnoteEntry::render))
            .map(|part| normalize_lines(&part))
            .filter(|part| !part.is_empty())
            .collect();

        if parts.is_empty() {
            self.text.clone()
        } else {
            parts.join("\n\n")
        }
    }

    fn finish(self, id: String) -> Block {
        let share_text = self.share_text();
        Block {
            id,
            kind: self.kind,
            text: self.text,
            source_id: self.source_id,
            attribution: self.attribution,
            footnotes: self.footnotes.iter().map(FootnoteEntry::render).collect(),
            share_text,
        }
    }
}

/// True if `text` is an attribution line (`-`, `–`, `—` or `--` prefix).
pub fn is_attribution(text: &str) -> bool {
    ATTRIBUTION_RE.is_match(text)
}

/// True if `text` is nothing but a roman or decimal numeral.
pub fn is_bare_numeral(text: &str) -> bool {
    NUMERAL_RE.is_match(text)
}

/// Normalize a section's raw blocks into output blocks with ids
/// `{section_id}-{n}` (1-based, in output order).
pub fn normalize_blocks(section_id: &str, raw: Vec<RawBlock>) -> Vec<Block> {
    let mut pending: Vec<PendingBlock> = Vec::with_capacity(raw.len());

    for block in raw {
        let text = normalize_lines(&block.text);

        if text.is_empty() && block.footnotes.is_empty() {
            continue;
        }
        if text == SEPARATOR || is_bare_numeral(&text) {
            trace!(text = %text, "dropping separator or numeral");
            continue;
        }

        if is_attribution(&text) {
            match pending.last_mut() {
                Some(previous) => previous.fold_attribution(text, block.footnotes),
                None => {
                    let mut synthetic = PendingBlock::from_raw(block, String::new());
                    let footnotes = std::mem::take(&mut synthetic.footnotes);
                    synthetic.fold_attribution(text, footnotes);
                    pending.push(synthetic);
                }
            }
            continue;
        }

        pending.push(PendingBlock::from_raw(block, text));
    }

    pending
        .into_iter()
        .enumerate()
        .map(|(i, block)| block.finish(format!("{section_id}-{}", i + 1)))
        .collect()
}

/// Display paragraphs for a section: each block's share text, or its text.
pub fn section_paragraphs(blocks: &[Block]) -> Vec<String> {
    blocks
        .iter()
        .map(|b| {
            if b.share_text.is_empty() {
                b.text.clone()
            } else {
                b.share_text.clone()
            }
        })
        .collect()
}
