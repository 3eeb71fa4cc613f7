//! Turning a file's blocks into Objects.
//!
//! Paragraphs and logical sub-tables share one position counter per file.
//! Each emitted Object also appends a context unit (paragraph text, or a
//! `<Table:{id}>` placeholder) so that `units[position]` is the Object's own
//! unit.

use tracing::{debug, instrument};

use docmine_document::{RawBlock, split_tables};
use docmine_shared::{IdAllocator, Object, SourceFile};

/// Objects of one file plus the unified element stream they were cut from.
#[derive(Debug, Default)]
pub struct Extraction {
    pub objects: Vec<Object>,
    pub units: Vec<String>,
}

/// Builds the Objects of a single file in block order.
pub struct ObjectBuilder<'a> {
    file_id: u64,
    file_name: String,
    ids: &'a mut IdAllocator,
    last_text: Option<String>,
    out: Extraction,
}

impl<'a> ObjectBuilder<'a> {
    pub fn new(file: &SourceFile, ids: &'a mut IdAllocator) -> Self {
        Self {
            file_id: file.file_id,
            file_name: file.stem(),
            ids,
            last_text: None,
            out: Extraction::default(),
        }
    }

    /// Feed one block. Empty paragraphs and header-only tables emit nothing.
    pub fn push(&mut self, block: RawBlock) {
        match block {
            RawBlock::Text(text) => self.push_text(text),
            RawBlock::Table(grid) => self.push_table(&grid),
        }
    }

    fn push_text(&mut self, text: String) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let object_id = self.ids.next_object_id();
        let position = self.out.objects.len();
        self.out.objects.push(Object::text(
            object_id,
            self.file_id,
            self.file_name.as_str(),
            position,
            text,
        ));
        self.out.units.push(text.to_string());
        self.last_text = Some(text.to_string());
    }

    fn push_table(&mut self, grid: &[Vec<String>]) {
        let title = self
            .last_text
            .as_deref()
            .map(table_title)
            .unwrap_or_default();

        for table in split_tables(grid) {
            let object_id = self.ids.next_object_id();
            let position = self.out.objects.len();
            self.out.objects.push(Object::table(
                object_id,
                self.file_id,
                self.file_name.as_str(),
                position,
                title.as_str(),
                table,
            ));
            self.out.units.push(table_placeholder(object_id));
        }
    }

    pub fn finish(self) -> Extraction {
        self.out
    }
}

/// Build every Object of `file` from its blocks.
#[instrument(skip_all, fields(file_id = file.file_id))]
pub fn extract_objects(
    file: &SourceFile,
    blocks: impl IntoIterator<Item = RawBlock>,
    ids: &mut IdAllocator,
) -> Extraction {
    let mut builder = ObjectBuilder::new(file, ids);
    for block in blocks {
        builder.push(block);
    }
    let extraction = builder.finish();
    debug!(
        objects = extraction.objects.len(),
        tables = extraction.objects.iter().filter(|o| o.is_table()).count(),
        "objects extracted"
    );
    extraction
}

/// Context unit standing in for a table Object.
pub fn table_placeholder(object_id: u64) -> String {
    format!("<Table:{object_id}>")
}

/// Table name from the paragraph preceding it: the part after the last comma
/// (half- or full-width), without a trailing colon.
pub fn table_title(text: &str) -> String {
    let tail = match text.rfind([',', '，']) {
        Some(idx) => {
            let comma_len = text[idx..].chars().next().map_or(1, char::len_utf8);
            &text[idx + comma_len..]
        }
        None => text,
    };
    let tail = tail.trim();
    tail.strip_suffix([':', '：']).unwrap_or(tail).trim().to_string()
}
