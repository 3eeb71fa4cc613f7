//! Shared types, error model, and configuration for docmine.
//!
//! This crate is the foundation depended on by all other docmine crates.
//! It provides:
//! - [`DocmineError`]: the unified error type
//! - Domain types ([`SourceFile`], [`Object`], [`TableContent`], [`Tags`], [`CorpusManifest`])
//! - Configuration ([`AppConfig`], [`BuildSettings`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BuildSettings, ConversionConfig, DefaultsConfig, TaggingConfig, TaggingMode,
    config_dir, config_file_path, init_config, load_config, load_config_from, validate_config,
};
pub use error::{DocmineError, Result};
pub use types::{
    CURRENT_SCHEMA_VERSION, CorpusId, CorpusManifest, IdAllocator, Object, ObjectContent,
    SourceFile, TableContent, Tags,
};
