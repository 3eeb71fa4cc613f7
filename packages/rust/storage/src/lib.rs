//! Corpus persistence: CSV tables plus a versioned JSON manifest.
//!
//! The [`CorpusStore`] writes and reads one corpus directory:
//!
//! - `documents.csv`: one row per source file
//! - `objects.csv`: one row per extracted Object, sets and tables JSON-encoded
//! - `tags.csv`: tags with at least one association, sequentially numbered
//! - `manifest.json`: [`CorpusManifest`] with the schema version
//!
//! Fields are plain strings or JSON; nothing read back is evaluated.

mod schema;

use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use docmine_shared::{
    CorpusManifest, DocmineError, Object, ObjectContent, Result, SourceFile, TableContent, Tags,
};
use tracing::{debug, info, instrument, warn};

use schema::{DOCUMENTS, MANIFEST_FILE, OBJECTS, TAGS, TableSchema};

// ---------------------------------------------------------------------------
// Corpus
// ---------------------------------------------------------------------------

/// Everything one build produces.
#[derive(Debug, Clone)]
pub struct Corpus {
    pub manifest: CorpusManifest,
    pub files: Vec<SourceFile>,
    pub objects: Vec<Object>,
    pub tags: Tags,
}

impl Corpus {
    /// Look up an Object by id.
    pub fn object(&self, object_id: u64) -> Option<&Object> {
        self.objects.iter().find(|o| o.object_id == object_id)
    }

    /// Objects associated with `tag`, in corpus order. Empty for unknown tags.
    pub fn objects_tagged(&self, tag: &str) -> Vec<&Object> {
        match self.tags.related(tag) {
            Some(ids) => self
                .objects
                .iter()
                .filter(|o| ids.contains(&o.object_id))
                .collect(),
            None => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// CorpusStore
// ---------------------------------------------------------------------------

/// Handle on a corpus directory.
#[derive(Debug, Clone)]
pub struct CorpusStore {
    root: PathBuf,
}

impl CorpusStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn table_path(&self, table: &TableSchema) -> PathBuf {
        self.root.join(table.file_name)
    }

    /// Write the whole corpus, replacing any previous contents.
    #[instrument(skip_all, fields(root = %self.root.display()))]
    pub fn write(&self, corpus: &Corpus) -> Result<()> {
        std::fs::create_dir_all(&self.root).map_err(|e| DocmineError::io(&self.root, e))?;

        self.write_documents(&corpus.files)?;
        self.write_objects(&corpus.objects)?;
        let exported = self.write_tags(&corpus.tags)?;
        self.write_manifest(&corpus.manifest)?;

        info!(
            files = corpus.files.len(),
            objects = corpus.objects.len(),
            tags = exported,
            "corpus written"
        );
        Ok(())
    }

    /// Read a corpus back, validating the manifest and every table.
    #[instrument(skip_all, fields(root = %self.root.display()))]
    pub fn read(&self) -> Result<Corpus> {
        let manifest = self.read_manifest()?;
        let files = self.read_documents()?;
        let objects = self.read_objects()?;
        let tags = self.read_tags()?;
        debug!(
            files = files.len(),
            objects = objects.len(),
            tags = tags.len(),
            "corpus read"
        );
        Ok(Corpus {
            manifest,
            files,
            objects,
            tags,
        })
    }

    // -----------------------------------------------------------------------
    // documents.csv
    // -----------------------------------------------------------------------

    pub fn write_documents(&self, files: &[SourceFile]) -> Result<()> {
        let path = self.table_path(&DOCUMENTS);
        let mut writer = TableWriter::create(&path, &DOCUMENTS)?;
        for file in files {
            writer.row(&[file.file_id.to_string(), file.file_path.clone()])?;
        }
        writer.finish()
    }

    pub fn read_documents(&self) -> Result<Vec<SourceFile>> {
        let path = self.table_path(&DOCUMENTS);
        read_table(&path, &DOCUMENTS, |row| {
            Ok(SourceFile::new(row.number(0, "file_id")?, row.text(1)))
        })
    }

    // -----------------------------------------------------------------------
    // objects.csv
    // -----------------------------------------------------------------------

    pub fn write_objects(&self, objects: &[Object]) -> Result<()> {
        let path = self.table_path(&OBJECTS);
        let mut writer = TableWriter::create(&path, &OBJECTS)?;
        for object in objects {
            if let ObjectContent::Text(text) = &object.content {
                if reads_back_as_table(text) {
                    warn!(
                        object_id = object.object_id,
                        "text content is a JSON column mapping and will read back as a table"
                    );
                }
            }
            writer.row(&[
                object.object_id.to_string(),
                object.file_id.to_string(),
                object.file_name.clone(),
                object.position.to_string(),
                object.above.clone(),
                object.below.clone(),
                object.title.clone(),
                encode_json(&object.date)?,
                encode_content(&object.content)?,
                encode_json(&object.tags)?,
            ])?;
        }
        writer.finish()
    }

    pub fn read_objects(&self) -> Result<Vec<Object>> {
        let path = self.table_path(&OBJECTS);
        read_table(&path, &OBJECTS, |row| {
            Ok(Object {
                object_id: row.number(0, "object_id")?,
                file_id: row.number(1, "file_id")?,
                file_name: row.text(2),
                position: row.number(3, "position")?,
                above: row.text(4),
                below: row.text(5),
                title: row.text(6),
                date: row.json::<BTreeSet<String>>(7, "date")?,
                content: decode_content(row.field(8)),
                tags: row.json::<BTreeSet<String>>(9, "tags")?,
            })
        })
    }

    // -----------------------------------------------------------------------
    // tags.csv
    // -----------------------------------------------------------------------

    /// Write associated tags only; returns how many rows were exported.
    pub fn write_tags(&self, tags: &Tags) -> Result<usize> {
        let path = self.table_path(&TAGS);
        let mut writer = TableWriter::create(&path, &TAGS)?;
        let mut exported = 0usize;
        for (tag_id, (name, ids)) in tags.associated().enumerate() {
            writer.row(&[tag_id.to_string(), name.to_string(), encode_json(ids)?])?;
            exported += 1;
        }
        writer.finish()?;
        Ok(exported)
    }

    pub fn read_tags(&self) -> Result<Tags> {
        let path = self.table_path(&TAGS);
        let rows = read_table(&path, &TAGS, |row| {
            let _tag_id: u64 = row.number(0, "tag_id")?;
            Ok((row.text(1), row.json::<BTreeSet<u64>>(2, "related_object_ids")?))
        })?;

        let mut tags = Tags::new();
        for (name, ids) in rows {
            tags.set_related(name, ids);
        }
        Ok(tags)
    }

    // -----------------------------------------------------------------------
    // manifest.json
    // -----------------------------------------------------------------------

    pub fn write_manifest(&self, manifest: &CorpusManifest) -> Result<()> {
        let path = self.root.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(manifest)
            .map_err(|e| DocmineError::Storage(format!("failed to serialize manifest: {e}")))?;
        std::fs::write(&path, json).map_err(|e| DocmineError::io(&path, e))
    }

    pub fn read_manifest(&self) -> Result<CorpusManifest> {
        let path = self.root.join(MANIFEST_FILE);
        let raw = std::fs::read_to_string(&path).map_err(|e| DocmineError::io(&path, e))?;
        let manifest: CorpusManifest = serde_json::from_str(&raw)
            .map_err(|e| DocmineError::parse(format!("{}: {e}", path.display())))?;
        schema::check_schema_version(manifest.schema_version)?;
        Ok(manifest)
    }
}

// ---------------------------------------------------------------------------
// Field codecs
// ---------------------------------------------------------------------------

fn encode_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| DocmineError::Storage(format!("failed to encode field: {e}")))
}

/// Text is written verbatim, so a text that is itself a `{...}` column
/// mapping (e.g. `{}`) cannot be told apart from a table on read.
fn encode_content(content: &ObjectContent) -> Result<String> {
    match content {
        ObjectContent::Text(text) => Ok(text.clone()),
        ObjectContent::Table(table) => encode_json(table),
    }
}

/// A field is a table iff it is `{...}` and decodes as a column mapping;
/// anything else is literal text.
fn decode_content(field: &str) -> ObjectContent {
    if field.starts_with('{') && field.ends_with('}') {
        if let Ok(table) = serde_json::from_str::<TableContent>(field) {
            return ObjectContent::Table(table);
        }
    }
    ObjectContent::Text(field.to_string())
}

fn reads_back_as_table(text: &str) -> bool {
    matches!(decode_content(text), ObjectContent::Table(_))
}

// ---------------------------------------------------------------------------
// CSV plumbing
// ---------------------------------------------------------------------------

struct TableWriter<'a> {
    path: &'a Path,
    inner: csv::Writer<File>,
}

impl<'a> TableWriter<'a> {
    fn create(path: &'a Path, table: &TableSchema) -> Result<Self> {
        let file = File::create(path).map_err(|e| DocmineError::io(path, e))?;
        let mut writer = Self {
            path,
            inner: WriterBuilder::new().from_writer(file),
        };
        writer.row(table.columns)?;
        Ok(writer)
    }

    fn row<I, T>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.inner
            .write_record(fields)
            .map_err(|e| DocmineError::Storage(format!("{}: {e}", self.path.display())))
    }

    fn finish(mut self) -> Result<()> {
        self.inner
            .flush()
            .map_err(|e| DocmineError::io(self.path, e))
    }
}

/// One data row plus where it came from, for error messages.
struct Row<'a> {
    record: &'a StringRecord,
    path: &'a Path,
    line: u64,
}

impl Row<'_> {
    fn field(&self, index: usize) -> &str {
        self.record.get(index).unwrap_or_default()
    }

    fn text(&self, index: usize) -> String {
        self.field(index).to_string()
    }

    fn number<N: FromStr>(&self, index: usize, column: &str) -> Result<N>
    where
        N::Err: std::fmt::Display,
    {
        self.field(index)
            .parse()
            .map_err(|e| self.error(format!("invalid {column}: {e}")))
    }

    fn json<T: serde::de::DeserializeOwned>(&self, index: usize, column: &str) -> Result<T> {
        serde_json::from_str(self.field(index))
            .map_err(|e| self.error(format!("invalid {column}: {e}")))
    }

    fn error(&self, message: String) -> DocmineError {
        DocmineError::parse(format!("{}:{}: {message}", self.path.display(), self.line))
    }
}

/// Read every data row of a table, failing on the first malformed one.
fn read_table<T>(
    path: &Path,
    table: &TableSchema,
    mut parse: impl FnMut(&Row<'_>) -> Result<T>,
) -> Result<Vec<T>> {
    let file = File::open(path).map_err(|e| DocmineError::io(path, e))?;
    let mut reader = ReaderBuilder::new().flexible(false).from_reader(file);

    let header = reader
        .headers()
        .map_err(|e| DocmineError::parse(format!("{}:1: {e}", path.display())))?
        .clone();
    table.check_header(path, &header)?;

    let mut out = Vec::new();
    let mut record = StringRecord::new();
    loop {
        match reader.read_record(&mut record) {
            Ok(true) => {
                let line = record.position().map_or(0, |p| p.line());
                out.push(parse(&Row {
                    record: &record,
                    path,
                    line,
                })?);
            }
            Ok(false) => break,
            Err(e) => {
                let line = e.position().map_or(0, |p| p.line());
                return Err(DocmineError::parse(format!(
                    "{}:{line}: {e}",
                    path.display()
                )));
            }
        }
    }
    Ok(out)
}
