//! End-to-end `build` pipeline: source files → writings → manifest.
//!
//! Files are processed one at a time. A failure inside one file (unreadable,
//! not UTF-8, or a panic during extraction) is logged and that writing is
//! left out; only failing to write the manifest aborts the run.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use folio_markup::{Document, normalize_lines, title_from_file_name};
use folio_shared::{BuildConfig, FolioError, Result, Section, Writing};

use crate::assembler;
use crate::blocks::extract_blocks;
use crate::footnotes::index_footnotes;
use crate::normalize::{normalize_blocks, section_paragraphs};
use crate::sections::locate_sections;

/// Result of a `build` run.
#[derive(Debug)]
pub struct BuildResult {
    /// Where the manifest was written.
    pub output_path: PathBuf,
    /// Writings included in the manifest.
    pub written: usize,
    /// Source files left out because of errors.
    pub skipped: usize,
    /// SHA-256 of the serialized items (stable across identical runs).
    pub items_sha256: String,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each source file, whether it succeeded or not.
    fn file_processed(&self, file_name: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &BuildResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn file_processed(&self, _file_name: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &BuildResult) {}
}

/// Run the full build.
///
/// 1. List source files
/// 2. Extract each file into a [`Writing`] (failures are skipped)
/// 3. Assemble and write the manifest
#[instrument(skip_all, fields(run_id = %Uuid::now_v7(), input = %config.input_dir.display()))]
pub async fn build(config: &BuildConfig, progress: &dyn ProgressReporter) -> Result<BuildResult> {
    let start = Instant::now();

    progress.phase("Scanning sources");
    let sources = list_sources(&config.input_dir, &config.extension).await;
    if sources.is_empty() {
        warn!(
            dir = %config.input_dir.display(),
            extension = %config.extension,
            "no source files found, writing an empty manifest"
        );
    }

    progress.phase("Extracting writings");
    let total = sources.len();
    let mut items: Vec<Writing> = Vec::with_capacity(total);
    let mut skipped = 0;

    for (i, path) in sources.iter().enumerate() {
        let file_name = file_name_of(path);

        match process_file(path, &file_name, &config.canonical_order).await {
            Ok(writing) => {
                debug!(
                    file = %file_name,
                    sections = writing.sections.len(),
                    "writing extracted"
                );
                items.push(writing);
            }
            Err(e) => {
                warn!(file = %file_name, error = %e, "extraction failed, skipping file");
                skipped += 1;
            }
        }

        progress.file_processed(&file_name, i + 1, total);
    }

    progress.phase("Writing manifest");
    let items_sha256 = assembler::items_digest(&items)?;
    let manifest = assembler::build_manifest(items, chrono::Utc::now());

    if let Err(e) = assembler::write_manifest(&config.output_path, &manifest).await {
        error!(path = %config.output_path.display(), error = %e, "could not write manifest");
        return Err(e);
    }

    let result = BuildResult {
        output_path: config.output_path.clone(),
        written: manifest.items.len(),
        skipped,
        items_sha256,
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        written = result.written,
        skipped = result.skipped,
        items_sha256 = %result.items_sha256,
        elapsed_ms = result.elapsed.as_millis(),
        "build complete"
    );

    Ok(result)
}

/// Extract one document into a writing. Pure and synchronous.
#[instrument(level = "debug", skip(source, canonical_order), fields(len = source.len()))]
pub fn extract_writing(file_name: &str, source: &[u8], canonical_order: &[String]) -> Result<Writing> {
    let doc = Document::parse_bytes(source)?;
    let footnotes = index_footnotes(&doc);
    let body = doc.body();

    let sections: Vec<Section> = locate_sections(body)
        .into_iter()
        .map(|located| {
            let raw = extract_blocks(&located.content, &footnotes);
            let blocks = normalize_blocks(&located.id, raw);
            let paragraphs = section_paragraphs(&blocks);
            Section {
                id: located.id,
                title: located.title,
                blocks,
                paragraphs,
            }
        })
        .collect();

    let id = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name)
        .to_string();

    Ok(Writing {
        id,
        title: doc.title().unwrap_or_else(|| title_from_file_name(file_name)),
        file_name: file_name.to_string(),
        text: normalize_lines(&body.readable_text()),
        sections: assembler::order_sections(sections, canonical_order),
    })
}

/// Read one file and extract it on the blocking pool, so a panic stays
/// contained in this file.
async fn process_file(path: &Path, file_name: &str, canonical_order: &[String]) -> Result<Writing> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| FolioError::io(path, e))?;

    let name = file_name.to_string();
    let canonical = canonical_order.to_vec();

    tokio::task::spawn_blocking(move || extract_writing(&name, &bytes, &canonical))
        .await
        .map_err(|e| FolioError::extraction(file_name, format!("extraction task failed: {e}")))?
}

/// Source files with the given extension, sorted by file name.
///
/// An unreadable directory is logged and treated as empty.
async fn list_sources(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            error!(dir = %dir.display(), error = %e, "cannot read input directory");
            return Vec::new();
        }
    };

    let mut sources = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let path = entry.path();
                let matches = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case(extension));
                let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
                if matches && is_file {
                    sources.push(path);
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "error while listing input directory");
                break;
            }
        }
    }

    sources.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!(count = sources.len(), "source files found");
    sources
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
