//! Tabular corpus layout.
//!
//! Each corpus directory holds three CSV tables and a JSON manifest. The
//! manifest carries the schema version; readers refuse corpora written by a
//! newer schema than they understand.

use std::path::Path;

use csv::StringRecord;
use docmine_shared::{CURRENT_SCHEMA_VERSION, DocmineError, Result};

/// A CSV table: its file name and exact header row.
pub(crate) struct TableSchema {
    pub file_name: &'static str,
    pub columns: &'static [&'static str],
}

pub(crate) const DOCUMENTS: TableSchema = TableSchema {
    file_name: "documents.csv",
    columns: &["file_id", "file_path"],
};

pub(crate) const OBJECTS: TableSchema = TableSchema {
    file_name: "objects.csv",
    columns: &[
        "object_id",
        "file_id",
        "file_name",
        "position",
        "above",
        "below",
        "title",
        "date",
        "content",
        "tags",
    ],
};

pub(crate) const TAGS: TableSchema = TableSchema {
    file_name: "tags.csv",
    columns: &["tag_id", "tag_name", "related_object_ids"],
};

pub(crate) const MANIFEST_FILE: &str = "manifest.json";

impl TableSchema {
    /// Reject a header row that does not match this table exactly.
    pub(crate) fn check_header(&self, path: &Path, header: &StringRecord) -> Result<()> {
        if header.iter().eq(self.columns.iter().copied()) {
            return Ok(());
        }
        Err(DocmineError::parse(format!(
            "{}:1: expected header [{}], found [{}]",
            path.display(),
            self.columns.join(","),
            header.iter().collect::<Vec<_>>().join(",")
        )))
    }
}

/// Reject manifests from a newer (unknown) schema.
pub(crate) fn check_schema_version(version: u32) -> Result<()> {
    if version == 0 || version > CURRENT_SCHEMA_VERSION {
        return Err(DocmineError::validation(format!(
            "unsupported corpus schema version {version} (this build reads up to {CURRENT_SCHEMA_VERSION})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_header_passes() {
        let header = StringRecord::from(vec!["file_id", "file_path"]);
        DOCUMENTS
            .check_header(Path::new("documents.csv"), &header)
            .expect("header matches");
    }

    #[test]
    fn reordered_or_short_header_fails() {
        let swapped = StringRecord::from(vec!["file_path", "file_id"]);
        let err = DOCUMENTS
            .check_header(Path::new("documents.csv"), &swapped)
            .unwrap_err();
        assert!(err.to_string().contains("documents.csv:1"));

        let short = StringRecord::from(vec!["tag_id", "tag_name"]);
        assert!(TAGS.check_header(Path::new("tags.csv"), &short).is_err());
    }

    #[test]
    fn schema_versions() {
        assert!(check_schema_version(CURRENT_SCHEMA_VERSION).is_ok());
        assert!(check_schema_version(0).is_err());
        assert!(check_schema_version(CURRENT_SCHEMA_VERSION + 1).is_err());
    }
}
