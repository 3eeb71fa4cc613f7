//! Core domain types for docmine corpora.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Current schema version for the corpus manifest and tabular files.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// CorpusId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for corpus identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorpusId(pub Uuid);

impl CorpusId {
    /// Generate a new time-sortable corpus identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for CorpusId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorpusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CorpusId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// CorpusManifest
// ---------------------------------------------------------------------------

/// The `manifest.json` written next to the tabular corpus files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusManifest {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    /// Unique identifier for this corpus build.
    pub id: CorpusId,
    /// Human-readable name (defaults to the source folder name).
    pub name: String,
    /// Folder the documents were mined from.
    pub source_dir: String,
    /// Tool version that created this corpus.
    pub tool_version: String,
    /// When the corpus was built.
    pub created_at: DateTime<Utc>,
    /// Rows in `documents.csv`.
    pub file_count: usize,
    /// Rows in `objects.csv`.
    pub object_count: usize,
    /// Rows in `tags.csv`.
    pub tag_count: usize,
    /// SHA-256 over the source folder listing, if it was computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_hash: Option<String>,
    /// Build configuration used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// IdAllocator
// ---------------------------------------------------------------------------

/// Monotonic id source for files and objects, scoped to one corpus build.
#[derive(Debug, Default, Clone)]
pub struct IdAllocator {
    next_file: u64,
    next_object: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start allocation at the given ids (e.g. to partition ranges).
    pub fn starting_at(file_id: u64, object_id: u64) -> Self {
        Self {
            next_file: file_id,
            next_object: object_id,
        }
    }

    pub fn next_file_id(&mut self) -> u64 {
        let id = self.next_file;
        self.next_file += 1;
        id
    }

    pub fn next_object_id(&mut self) -> u64 {
        let id = self.next_object;
        self.next_object += 1;
        id
    }
}

// ---------------------------------------------------------------------------
// SourceFile
// ---------------------------------------------------------------------------

/// One discovered source document. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub file_id: u64,
    pub file_path: String,
}

impl SourceFile {
    pub fn new(file_id: u64, file_path: impl Into<String>) -> Self {
        Self {
            file_id,
            file_path: file_path.into(),
        }
    }

    /// File name without directory or extension, as stored on each Object.
    pub fn stem(&self) -> String {
        std::path::Path::new(&self.file_path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// TableContent
// ---------------------------------------------------------------------------

/// Ordered mapping from column name to that column's row values.
///
/// Serializes as a JSON object whose key order is the column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableContent {
    columns: Vec<(String, Vec<String>)>,
}

impl TableContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from a grid whose first row holds the headers.
    ///
    /// Short rows read as empty cells; cells beyond the header width are
    /// ignored. A repeated header overwrites the earlier column's values.
    pub fn from_grid(grid: &[Vec<String>]) -> Self {
        let mut table = Self::new();
        let Some((header, body)) = grid.split_first() else {
            return table;
        };

        for (idx, name) in header.iter().enumerate() {
            let values = body
                .iter()
                .map(|row| row.get(idx).cloned().unwrap_or_default())
                .collect();
            table.insert_column(name.clone(), values);
        }
        table
    }

    /// Insert a column, replacing the values of an existing column with the
    /// same name (which keeps its original position).
    pub fn insert_column(&mut self, name: String, values: Vec<String>) {
        match self.columns.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = values,
            None => self.columns.push((name, values)),
        }
    }

    pub fn column(&self, name: &str) -> Option<&[String]> {
        self.columns
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.columns
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.columns
            .iter()
            .map(|(_, values)| values.len())
            .max()
            .unwrap_or(0)
    }

    /// Every body cell, column by column.
    pub fn cells(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .flat_map(|(_, values)| values.iter().map(String::as_str))
    }

    /// Body rows reassembled from the columns, for display.
    pub fn rows(&self) -> Vec<Vec<&str>> {
        (0..self.row_count())
            .map(|row| {
                self.columns
                    .iter()
                    .map(|(_, values)| values.get(row).map(String::as_str).unwrap_or(""))
                    .collect()
            })
            .collect()
    }
}

impl Serialize for TableContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, values) in &self.columns {
            map.serialize_entry(name, values)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TableContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = TableContent;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of column name to row values")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut table = TableContent::new();
                while let Some((name, values)) = access.next_entry::<String, Vec<String>>()? {
                    table.insert_column(name, values);
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

// ---------------------------------------------------------------------------
// Object
// ---------------------------------------------------------------------------

/// Content of an [`Object`]: a paragraph or one logical table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectContent {
    Text(String),
    Table(TableContent),
}

/// The atomic extracted unit (one paragraph or one table) of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    /// Unique across the whole build.
    pub object_id: u64,
    /// Owning [`SourceFile`].
    pub file_id: u64,
    /// Stem of the source file name.
    pub file_name: String,
    /// Ordinal in the file's unified block stream (texts and tables share it).
    pub position: usize,
    /// Nearest surviving preceding context unit, or empty.
    pub above: String,
    /// Nearest surviving following context unit, or empty.
    pub below: String,
    /// Table name inferred from preceding text; empty for texts.
    pub title: String,
    pub content: ObjectContent,
    /// Normalized "Month Year" periods.
    pub date: BTreeSet<String>,
    pub tags: BTreeSet<String>,
}

impl Object {
    /// A text Object with empty context, title, date and tags.
    pub fn text(
        object_id: u64,
        file_id: u64,
        file_name: impl Into<String>,
        position: usize,
        text: impl Into<String>,
    ) -> Self {
        Self {
            object_id,
            file_id,
            file_name: file_name.into(),
            position,
            above: String::new(),
            below: String::new(),
            title: String::new(),
            content: ObjectContent::Text(text.into()),
            date: BTreeSet::new(),
            tags: BTreeSet::new(),
        }
    }

    /// A table Object with empty context, date and tags.
    pub fn table(
        object_id: u64,
        file_id: u64,
        file_name: impl Into<String>,
        position: usize,
        title: impl Into<String>,
        table: TableContent,
    ) -> Self {
        Self {
            title: title.into(),
            content: ObjectContent::Table(table),
            ..Self::text(object_id, file_id, file_name, position, "")
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(self.content, ObjectContent::Table(_))
    }

    /// The text of a text Object.
    pub fn as_text(&self) -> Option<&str> {
        match &self.content {
            ObjectContent::Text(text) => Some(text),
            ObjectContent::Table(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// Corpus-wide tag vocabulary: tag name -> associated object ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags {
    entries: BTreeMap<String, BTreeSet<u64>>,
}

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure `name` exists and, if given, associate `object_id` with it.
    ///
    /// Idempotent. Without an id the tag is seeded with an empty association
    /// set (or left untouched if it already exists).
    pub fn add_tag(&mut self, name: &str, object_id: Option<u64>) {
        let related = self.entries.entry(name.to_string()).or_default();
        if let Some(id) = object_id {
            related.insert(id);
        }
    }

    /// Replace the association set of `name` wholesale.
    pub fn set_related(&mut self, name: impl Into<String>, ids: BTreeSet<u64>) {
        self.entries.insert(name.into(), ids);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn related(&self, name: &str) -> Option<&BTreeSet<u64>> {
        self.entries.get(name)
    }

    /// All tag names, including seeded tags with no associations.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Tags with at least one association, in export order.
    pub fn associated(&self) -> impl Iterator<Item = (&str, &BTreeSet<u64>)> {
        self.entries
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(name, ids)| (name.as_str(), ids))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn corpus_id_roundtrip() {
        let id = CorpusId::new();
        let parsed: CorpusId = id.to_string().parse().expect("parse CorpusId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn id_allocator_is_monotonic_and_independent() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.next_object_id(), 0);
        assert_eq!(ids.next_object_id(), 1);
        assert_eq!(ids.next_file_id(), 0);
        assert_eq!(ids.next_object_id(), 2);

        let mut offset = IdAllocator::starting_at(10, 100);
        assert_eq!(offset.next_file_id(), 10);
        assert_eq!(offset.next_object_id(), 100);
    }

    #[test]
    fn source_file_stem_drops_extension() {
        let file = SourceFile::new(0, "/data/Store/January_2025_Sales_Report.docx");
        assert_eq!(file.stem(), "January_2025_Sales_Report");
    }

    #[test]
    fn table_from_grid_maps_columns() {
        let table = TableContent::from_grid(&grid(&[
            &["region", "sales"],
            &["north", "10"],
            &["south", "12"],
        ]));
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column("region").unwrap(), ["north", "south"]);
        assert_eq!(table.rows(), vec![vec!["north", "10"], vec!["south", "12"]]);
    }

    #[test]
    fn table_duplicate_header_later_column_wins() {
        let table = TableContent::from_grid(&grid(&[&["a", "a", "b"], &["1", "2", "3"]]));
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.column("a").unwrap(), ["2"]);
        let names: Vec<_> = table.columns().map(|(name, _)| name).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn table_ragged_rows_pad_and_truncate() {
        let table = TableContent::from_grid(&grid(&[&["a", "b"], &["1"], &["2", "3", "4"]]));
        assert_eq!(table.column("b").unwrap(), ["", "3"]);
        assert_eq!(table.cells().count(), 4);
    }

    #[test]
    fn table_json_preserves_column_order() {
        let table = TableContent::from_grid(&grid(&[&["zeta", "alpha"], &["1", "2"]]));
        let json = serde_json::to_string(&table).expect("serialize");
        assert_eq!(json, r#"{"zeta":["1"],"alpha":["2"]}"#);
        let parsed: TableContent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, table);
    }

    #[test]
    fn add_tag_is_idempotent() {
        let mut once = Tags::new();
        once.add_tag("sales", Some(3));

        let mut twice = Tags::new();
        twice.add_tag("sales", Some(3));
        twice.add_tag("sales", Some(3));

        assert_eq!(once, twice);
        assert_eq!(twice.related("sales").unwrap().len(), 1);
    }

    #[test]
    fn seeded_tag_keeps_existing_associations() {
        let mut tags = Tags::new();
        tags.add_tag("revenue", None);
        assert!(tags.contains("revenue"));
        assert!(tags.related("revenue").unwrap().is_empty());

        tags.add_tag("revenue", Some(7));
        tags.add_tag("revenue", None);
        assert_eq!(tags.related("revenue").unwrap().len(), 1);
    }

    #[test]
    fn associated_skips_empty_tags() {
        let mut tags = Tags::new();
        tags.add_tag("seed-only", None);
        tags.add_tag("used", Some(1));
        let exported: Vec<_> = tags.associated().map(|(name, _)| name).collect();
        assert_eq!(exported, ["used"]);
        assert_eq!(tags.len(), 2);
    }

    #[test]
    fn object_constructors() {
        let text = Object::text(1, 0, "report", 0, "hello");
        assert!(!text.is_table());
        assert_eq!(text.as_text(), Some("hello"));

        let table = Object::table(2, 0, "report", 1, "sales", TableContent::new());
        assert!(table.is_table());
        assert_eq!(table.title, "sales");
        assert_eq!(table.as_text(), None);
    }
}
