//! Extraction pipeline and domain logic for folio.
//!
//! This crate ties together footnote indexing, section location, block
//! extraction, and normalization into the end-to-end `build` workflow.

pub mod assembler;
pub mod blocks;
pub mod footnotes;
pub mod normalize;
pub mod pipeline;
pub mod sections;

pub use pipeline::{BuildResult, ProgressReporter, SilentProgress, build, extract_writing};
