//! Core pipeline orchestration and domain logic for docmine.
//!
//! This crate turns parsed documents into Objects, resolves their context,
//! tags them, and ties everything together into the end-to-end `build`
//! workflow ([`pipeline::build_corpus`]).

pub mod builder;
pub mod context;
pub mod dates;
pub mod pipeline;
pub mod render;
pub mod tagger;

pub use builder::{Extraction, ObjectBuilder, extract_objects, table_placeholder, table_title};
pub use context::ContextResolver;
pub use pipeline::{
    BuildConfig, BuildResult, FileOutcome, MinedCorpus, Miner, ProgressReporter, SilentProgress,
    build_corpus, corpus_name, discover_documents, source_hash,
};
pub use render::{draw_table, render_display, render_for_prompt};
pub use tagger::{Tagger, load_vocabulary};
