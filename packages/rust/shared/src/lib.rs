//! Shared types, error model, and configuration for Folio.
//!
//! This crate is the foundation depended on by all other Folio crates.
//! It provides:
//! - [`FolioError`]: the unified error type
//! - Manifest types ([`Manifest`], [`Writing`], [`Section`], [`Block`], [`FootnoteEntry`])
//! - Configuration ([`AppConfig`], [`BuildConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BuildConfig, CONFIG_FILE_NAME, InputConfig, OutputConfig, SectionsConfig,
    config_file_path, init_config, load_config, load_config_from, to_toml,
};
pub use error::{FolioError, Result};
pub use types::{Block, BlockType, FootnoteEntry, Manifest, Section, Writing};
