//! Tag vocabulary upkeep and Object tagging.
//!
//! Three policies feed one corpus-wide [`Tags`] map:
//!
//! - tables: every non-numeric body cell becomes a tag of the table
//! - texts: every known tag occurring in the text is associated with it
//! - dates: the Object's "Month Year" period becomes a tag and its `date`
//!
//! Text tagging only sees tags minted before it runs, so call order matters.
//! None of these can fail.

use std::path::Path;

use tracing::{debug, instrument, trace};

use docmine_document::is_numeric_cell;
use docmine_shared::{DocmineError, Object, ObjectContent, Result, Tags};

use crate::dates::resolve_period;

/// Owns the vocabulary for one build.
#[derive(Debug, Default)]
pub struct Tagger {
    tags: Tags,
}

impl Tagger {
    /// Start from a seeded vocabulary (possibly empty).
    pub fn new(tags: Tags) -> Self {
        Self { tags }
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub fn into_tags(self) -> Tags {
        self.tags
    }

    pub fn add_tag(&mut self, name: &str, object_id: Option<u64>) {
        self.tags.add_tag(name, object_id);
    }

    /// Tag a table Object with its non-numeric body cells.
    pub fn tag_table(&mut self, object: &mut Object) {
        let ObjectContent::Table(table) = &object.content else {
            return;
        };
        let mut found = Vec::new();
        for cell in table.cells() {
            if !is_numeric_cell(cell) {
                found.push(cell.to_string());
            }
        }
        for tag in found {
            self.tags.add_tag(&tag, Some(object.object_id));
            object.tags.insert(tag);
        }
        trace!(object_id = object.object_id, tags = object.tags.len(), "table tagged");
    }

    /// Tag a text Object with every known tag it contains.
    pub fn tag_text(&mut self, object: &mut Object) {
        let ObjectContent::Text(text) = &object.content else {
            return;
        };
        let hits: Vec<String> = self
            .tags
            .names()
            .filter(|tag| !tag.is_empty() && text.contains(tag))
            .map(str::to_string)
            .collect();
        for tag in hits {
            self.tags.add_tag(&tag, Some(object.object_id));
            object.tags.insert(tag);
        }
        trace!(object_id = object.object_id, tags = object.tags.len(), "text tagged");
    }

    /// Attach the Object's period, searched in its text (or table title)
    /// first and its file name second.
    pub fn tag_date(&mut self, object: &mut Object) {
        let source = match &object.content {
            ObjectContent::Text(text) => text.as_str(),
            ObjectContent::Table(_) => object.title.as_str(),
        };
        if let Some(period) = resolve_period(&object.file_name, source) {
            self.tags.add_tag(&period, Some(object.object_id));
            object.date.insert(period);
        }
    }
}

/// Load a seed vocabulary: a JSON array of tag strings.
///
/// Entries are trimmed; empty entries are skipped. Seeded tags carry no
/// associations until an Object mentions them.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_vocabulary(path: &Path) -> Result<Tags> {
    let raw = std::fs::read_to_string(path).map_err(|e| DocmineError::io(path, e))?;
    let entries: Vec<String> = serde_json::from_str(&raw)
        .map_err(|e| DocmineError::parse(format!("{}: {e}", path.display())))?;

    let mut tags = Tags::new();
    for entry in &entries {
        let name = entry.trim();
        if !name.is_empty() {
            tags.add_tag(name, None);
        }
    }
    debug!(seeded = tags.len(), "vocabulary loaded");
    Ok(tags)
}
