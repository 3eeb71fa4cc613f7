//! Word document reading: block traversal, table grids, and table splitting.
//!
//! Parses `.docx` packages with `docx-rs`, walks their blocks in native order,
//! normalizes table cells, and splits visually merged tables into logical
//! sub-tables. Legacy `.doc` files go through a [`LegacyConverter`] first.

mod blocks;
pub mod convert;
mod split;

use std::path::Path;

use tracing::{debug, instrument};

use docmine_shared::{DocmineError, Result};

pub use blocks::{Block, BlockStream, Container, clean_paragraph, normalize_cell};
pub use convert::{ConvertedDocument, LegacyConverter, SofficeConverter};
pub use split::{is_numeric_cell, split_tables};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A block detached from the document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawBlock {
    /// Cleaned paragraph text (may be empty).
    Text(String),
    /// Normalized cell grid, row by row.
    Table(Vec<Vec<String>>),
}

/// Document formats the miner accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Docx,
    /// Legacy binary `.doc`, readable only after conversion.
    Doc,
}

impl DocumentKind {
    /// Classify a path by extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "docx" => Some(Self::Docx),
            "doc" => Some(Self::Doc),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A parsed `.docx` document.
pub struct Document {
    docx: docx_rs::Docx,
}

impl Document {
    /// Read and parse a `.docx` file.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| DocmineError::io(path, e))?;
        let docx = docx_rs::read_docx(&bytes)
            .map_err(|e| DocmineError::Document(format!("{}: {e:?}", path.display())))?;
        debug!(bytes = bytes.len(), "document parsed");
        Ok(Self { docx })
    }

    /// Parse a `.docx` package held in memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let docx = docx_rs::read_docx(bytes)
            .map_err(|e| DocmineError::Document(format!("invalid docx package: {e:?}")))?;
        Ok(Self { docx })
    }

    /// Wrap an already-built document tree.
    pub fn from_docx(docx: docx_rs::Docx) -> Self {
        Self { docx }
    }

    /// Top-level blocks in document order.
    pub fn blocks(&self) -> BlockStream<'_> {
        BlockStream::document(&self.docx)
    }

    /// Top-level blocks detached from the tree.
    pub fn raw_blocks(&self) -> impl Iterator<Item = RawBlock> + '_ {
        self.blocks().map(|block| block.to_raw())
    }
}
