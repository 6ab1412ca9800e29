//! Manifest assembler.
//!
//! Orders each writing's sections against the canonical title list, wraps
//! all processed writings into a [`Manifest`], and writes it to disk.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use folio_markup::normalize_whitespace;
use folio_shared::{FolioError, Manifest, Result, Section, Writing};

use crate::normalize::SEPARATOR;

/// Move sections whose title matches a canonical title to the front, in
/// canonical order. Everything else keeps its document order after them.
///
/// Titles are compared after whitespace normalization; each canonical title
/// claims at most one section (the first match).
pub fn order_sections(mut sections: Vec<Section>, canonical: &[String]) -> Vec<Section> {
    let mut ordered = Vec::with_capacity(sections.len());

    for wanted in canonical {
        let wanted = normalize_whitespace(wanted);
        if let Some(pos) = sections
            .iter()
            .position(|s| normalize_whitespace(&s.title) == wanted)
        {
            ordered.push(sections.remove(pos));
        }
    }

    ordered.extend(sections);
    ordered
}

/// Wrap processed writings into a manifest stamped with `generated_at`.
pub fn build_manifest(items: Vec<Writing>, generated_at: DateTime<Utc>) -> Manifest {
    Manifest {
        generated_at,
        items,
    }
}

/// SHA-256 of the serialized `items`, independent of `generatedAt`.
pub fn items_digest(items: &[Writing]) -> Result<String> {
    let bytes = serde_json::to_vec(items)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Write the manifest as pretty JSON.
///
/// Creates the parent directory, writes to a temp file beside the target,
/// then renames it into place.
#[instrument(skip_all, fields(path = %path.display(), items = manifest.items.len()))]
pub async fn write_manifest(path: &Path, manifest: &Manifest) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| FolioError::io(parent, e))?;
    }

    let json = serde_json::to_string_pretty(manifest)?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| FolioError::config(format!("invalid output path {}", path.display())))?;
    let temp = path.with_file_name(format!(".{file_name}.tmp"));

    tokio::fs::write(&temp, json.as_bytes())
        .await
        .map_err(|e| FolioError::io(&temp, e))?;
    tokio::fs::rename(&temp, path)
        .await
        .map_err(|e| FolioError::io(path, e))?;

    info!(bytes = json.len(), "manifest written");
    Ok(())
}

/// Read a manifest back from disk.
pub async fn load_manifest(path: &Path) -> Result<Manifest> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| FolioError::io(path, e))?;

    serde_json::from_str(&content)
        .map_err(|e| FolioError::validation(format!("invalid manifest {}: {e}", path.display())))
}

/// Check the structural guarantees consumers rely on.
///
/// Reports every violation in one error.
pub fn validate_manifest(manifest: &Manifest) -> Result<()> {
    let mut problems: Vec<String> = Vec::new();

    for writing in &manifest.items {
        let mut section_ids = HashSet::new();

        for section in &writing.sections {
            let at = format!("{}/{}", writing.id, section.id);

            if !section_ids.insert(section.id.as_str()) {
                problems.push(format!("{at}: duplicate section id"));
            }
            if section.paragraphs.len() != section.blocks.len() {
                problems.push(format!("{at}: paragraphs do not match blocks"));
            }

            let mut block_ids = HashSet::new();
            let mut footnotes = HashSet::new();

            for block in &section.blocks {
                if !block_ids.insert(block.id.as_str()) {
                    problems.push(format!("{at}: duplicate block id `{}`", block.id));
                }
                if block.share_text.is_empty() {
                    problems.push(format!("{at}: block `{}` has empty shareText", block.id));
                }
                if block.text == SEPARATOR {
                    problems.push(format!("{at}: block `{}` is a separator", block.id));
                }
                for note in &block.footnotes {
                    if !footnotes.insert(note.as_str()) {
                        problems.push(format!(
                            "{at}: footnote `{note}` repeated in block `{}`",
                            block.id
                        ));
                    }
                }
            }
        }
    }

    debug!(
        writings = manifest.items.len(),
        problems = problems.len(),
        "manifest validated"
    );

    if problems.is_empty() {
        Ok(())
    } else {
        Err(FolioError::validation(problems.join("; ")))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
