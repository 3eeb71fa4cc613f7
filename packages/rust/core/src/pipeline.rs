//! End-to-end `build` pipeline: folder → documents → Objects → tagged corpus.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, UNIX_EPOCH};

use sha2::{Digest, Sha256};
use tracing::{debug, error, info, instrument, warn};

use docmine_document::{Document, DocumentKind, LegacyConverter, RawBlock, SofficeConverter};
use docmine_shared::{
    BuildSettings, CURRENT_SCHEMA_VERSION, CorpusId, CorpusManifest, DocmineError, IdAllocator,
    Object, Result, SourceFile, Tags, TaggingMode,
};
use docmine_storage::{Corpus, CorpusStore};

use crate::builder::{Extraction, extract_objects};
use crate::context::ContextResolver;
use crate::tagger::{Tagger, load_vocabulary};

/// Configuration for [`build_corpus`].
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Folder to mine (a single document is accepted too).
    pub input: PathBuf,
    /// Directory the corpus files are written to.
    pub corpus_dir: PathBuf,
    /// Human-readable corpus name.
    pub name: String,
    /// Context radius, tagging mode, vocabulary and converter.
    pub settings: BuildSettings,
    /// Tool version string recorded in the manifest.
    pub tool_version: String,
}

/// Result of [`build_corpus`].
#[derive(Debug)]
pub struct BuildResult {
    pub corpus_path: PathBuf,
    pub corpus_id: CorpusId,
    pub file_count: usize,
    pub object_count: usize,
    /// Tags with at least one association (the exported ones).
    pub tag_count: usize,
    /// Files that were missing or could not be read.
    pub skipped: usize,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after a document has been mined.
    fn file_processed(&self, path: &str, current: usize, total: usize);
    /// Called when a document is skipped.
    fn file_skipped(&self, path: &str, reason: &str);
    /// Called when the pipeline completes.
    fn done(&self, result: &BuildResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn file_processed(&self, _path: &str, _current: usize, _total: usize) {}
    fn file_skipped(&self, _path: &str, _reason: &str) {}
    fn done(&self, _result: &BuildResult) {}
}

// ---------------------------------------------------------------------------
// Miner (build context)
// ---------------------------------------------------------------------------

/// What happened to one source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Mined { objects: usize },
    Missing,
}

/// Files, Objects and tags accumulated by a [`Miner`].
#[derive(Debug)]
pub struct MinedCorpus {
    pub files: Vec<SourceFile>,
    pub objects: Vec<Object>,
    pub tags: Tags,
}

/// Build context: owns the id allocator, the vocabulary and every Object
/// mined so far.
pub struct Miner {
    ids: IdAllocator,
    tagger: Tagger,
    resolver: ContextResolver,
    mode: TaggingMode,
    converter: Option<Box<dyn LegacyConverter>>,
    files: Vec<SourceFile>,
    objects: Vec<Object>,
}

impl Miner {
    pub fn new(settings: &BuildSettings, vocabulary: Tags) -> Self {
        let converter = settings
            .converter_command
            .as_ref()
            .map(|cmd| Box::new(SofficeConverter::new(cmd.clone())) as Box<dyn LegacyConverter>);
        Self {
            ids: IdAllocator::new(),
            tagger: Tagger::new(vocabulary),
            resolver: ContextResolver::new(settings.context_radius),
            mode: settings.tagging_mode,
            converter,
            files: Vec::new(),
            objects: Vec::new(),
        }
    }

    /// Replace the legacy converter (`None` skips `.doc` files).
    pub fn with_converter(mut self, converter: Option<Box<dyn LegacyConverter>>) -> Self {
        self.converter = converter;
        self
    }

    /// Allocate a File for a discovered document.
    pub fn register(&mut self, path: &Path) -> SourceFile {
        let file = SourceFile::new(self.ids.next_file_id(), path.to_string_lossy());
        self.files.push(file.clone());
        file
    }

    /// Mine one registered file.
    ///
    /// A file that no longer exists is reported as [`FileOutcome::Missing`];
    /// unreadable or unconvertible documents are errors the caller may skip.
    #[instrument(skip_all, fields(file_id = file.file_id, path = %file.file_path))]
    pub fn process(&mut self, file: &SourceFile) -> Result<FileOutcome> {
        let path = Path::new(&file.file_path);
        if !path.exists() {
            warn!("source file missing, skipping");
            return Ok(FileOutcome::Missing);
        }
        let blocks = self.load_blocks(path)?;
        let objects = self.process_blocks(file, blocks);
        Ok(FileOutcome::Mined { objects })
    }

    fn load_blocks(&self, path: &Path) -> Result<Vec<RawBlock>> {
        match DocumentKind::from_path(path) {
            Some(DocumentKind::Docx) => Ok(Document::open(path)?.raw_blocks().collect()),
            Some(DocumentKind::Doc) => {
                let converter = self.converter.as_ref().ok_or_else(|| {
                    DocmineError::Conversion("legacy conversion is disabled".into())
                })?;
                let converted = converter.convert(path)?;
                let blocks = Document::open(converted.path())?.raw_blocks().collect();
                Ok(blocks)
            }
            None => Err(DocmineError::validation(format!(
                "{} is not a .doc or .docx file",
                path.display()
            ))),
        }
    }

    /// Turn one file's blocks into context-resolved, tagged Objects.
    ///
    /// Tables are tagged before texts so a text can match tags minted by the
    /// tables of its own file. In two-pass mode text content tagging waits
    /// for [`Miner::finish`].
    pub fn process_blocks(&mut self, file: &SourceFile, blocks: Vec<RawBlock>) -> usize {
        let Extraction { mut objects, units } = extract_objects(file, blocks, &mut self.ids);
        self.resolver.resolve(&mut objects, &units);

        for table in objects.iter_mut().filter(|o| o.is_table()) {
            self.tagger.tag_table(table);
            self.tagger.tag_date(table);
        }
        for text in objects.iter_mut().filter(|o| !o.is_table()) {
            if self.mode == TaggingMode::SinglePass {
                self.tagger.tag_text(text);
            }
            self.tagger.tag_date(text);
        }

        let count = objects.len();
        self.objects.extend(objects);
        count
    }

    /// Run any deferred tagging and hand back everything mined.
    pub fn finish(self) -> MinedCorpus {
        let Self {
            mut tagger,
            mode,
            files,
            mut objects,
            ..
        } = self;

        if mode == TaggingMode::TwoPass {
            for text in objects.iter_mut().filter(|o| !o.is_table()) {
                tagger.tag_text(text);
            }
        }

        MinedCorpus {
            files,
            objects,
            tags: tagger.into_tags(),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run the full `build` pipeline.
///
/// 1. Discover `.doc`/`.docx` files
/// 2. Load the seed vocabulary
/// 3. Mine each file (per-file failures are logged and skipped)
/// 4. Finish tagging
/// 5. Write the corpus directory
#[instrument(skip_all, fields(input = %config.input.display(), name = %config.name))]
pub fn build_corpus(config: &BuildConfig, progress: &dyn ProgressReporter) -> Result<BuildResult> {
    let start = Instant::now();
    let corpus_id = CorpusId::new();
    info!(%corpus_id, "starting build pipeline");

    // --- Phase 1: Discovery ---
    progress.phase("Discovering documents");
    let paths = discover_documents(&config.input)?;
    if paths.is_empty() {
        return Err(DocmineError::validation(format!(
            "no .doc or .docx files found under {}",
            config.input.display()
        )));
    }
    info!(documents = paths.len(), "documents discovered");

    // --- Phase 2: Vocabulary ---
    let vocabulary = match &config.settings.vocabulary_path {
        Some(path) => {
            progress.phase("Loading vocabulary");
            load_vocabulary(path)?
        }
        None => Tags::new(),
    };

    // --- Phase 3: Mining ---
    progress.phase("Mining documents");
    let mut miner = Miner::new(&config.settings, vocabulary);
    let files: Vec<SourceFile> = paths.iter().map(|path| miner.register(path)).collect();
    let total = files.len();
    let mut skipped = 0usize;

    for (i, file) in files.iter().enumerate() {
        match miner.process(file) {
            Ok(FileOutcome::Mined { objects }) => {
                debug!(path = %file.file_path, objects, "document mined");
                progress.file_processed(&file.file_path, i + 1, total);
            }
            Ok(FileOutcome::Missing) => {
                skipped += 1;
                progress.file_skipped(&file.file_path, "file missing");
            }
            Err(e) => {
                error!(path = %file.file_path, error = %e, "failed to mine document, skipping");
                skipped += 1;
                progress.file_skipped(&file.file_path, &e.to_string());
            }
        }
    }

    // --- Phase 4: Tagging ---
    if config.settings.tagging_mode == TaggingMode::TwoPass {
        progress.phase("Tagging texts");
    }
    let mined = miner.finish();

    // --- Phase 5: Write corpus ---
    progress.phase("Writing corpus");
    let tag_count = mined.tags.associated().count();
    let manifest = CorpusManifest {
        schema_version: CURRENT_SCHEMA_VERSION,
        id: corpus_id.clone(),
        name: config.name.clone(),
        source_dir: config.input.display().to_string(),
        tool_version: config.tool_version.clone(),
        created_at: chrono::Utc::now(),
        file_count: mined.files.len(),
        object_count: mined.objects.len(),
        tag_count,
        source_hash: Some(source_hash(&config.input, &paths)),
        config: serde_json::to_value(&config.settings).ok(),
    };

    let corpus = Corpus {
        manifest,
        files: mined.files,
        objects: mined.objects,
        tags: mined.tags,
    };
    CorpusStore::new(&config.corpus_dir).write(&corpus)?;

    let result = BuildResult {
        corpus_path: config.corpus_dir.clone(),
        corpus_id,
        file_count: corpus.files.len(),
        object_count: corpus.objects.len(),
        tag_count,
        skipped,
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        corpus_id = %result.corpus_id,
        files = result.file_count,
        objects = result.object_count,
        tags = result.tag_count,
        skipped = result.skipped,
        elapsed_ms = result.elapsed.as_millis(),
        "build pipeline complete"
    );

    Ok(result)
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Every `.doc`/`.docx` file under `root`, recursively, sorted by path.
///
/// Office lock files (`~$name.docx`) are ignored. A `root` that is itself a
/// document yields just that document.
pub fn discover_documents(root: &Path) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(is_document(root).then(|| root.to_path_buf()).into_iter().collect());
    }

    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = std::fs::read_dir(&dir).map_err(|e| DocmineError::io(&dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| DocmineError::io(&dir, e))?;
            let path = entry.path();
            // Symlinked directories are not followed.
            let file_type = entry.file_type().map_err(|e| DocmineError::io(&path, e))?;
            if file_type.is_dir() {
                pending.push(path);
            } else if is_document(&path) {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

fn is_document(path: &Path) -> bool {
    let lock_file = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("~$"));
    !lock_file && DocumentKind::from_path(path).is_some()
}

/// SHA-256 over the sorted `(relative path, modified time)` pairs of the
/// discovered documents.
pub fn source_hash(root: &Path, paths: &[PathBuf]) -> String {
    let base = if root.is_file() {
        root.parent().unwrap_or(root)
    } else {
        root
    };

    let mut entries: Vec<(String, u128)> = paths
        .iter()
        .map(|path| {
            let relative = path.strip_prefix(base).unwrap_or(path);
            let modified = std::fs::metadata(path)
                .and_then(|m| m.modified())
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map_or(0, |d| d.as_nanos());
            (relative.to_string_lossy().replace('\\', "/"), modified)
        })
        .collect();
    entries.sort();

    let mut hasher = Sha256::new();
    for (relative, modified) in &entries {
        hasher.update(relative.as_bytes());
        hasher.update([0u8]);
        hasher.update(modified.to_string().as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

/// Corpus name derived from the input path's last component.
pub fn corpus_name(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "corpus".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{Docx, Paragraph, Run, Table, TableCell, TableRow};

    use crate::render::render_for_prompt;

    fn para(text: &str) -> Paragraph {
        Paragraph::new().add_run(Run::new().add_text(text))
    }

    fn table(rows: &[&[&str]]) -> Table {
        Table::new(
            rows.iter()
                .map(|row| {
                    TableRow::new(
                        row.iter()
                            .map(|c| TableCell::new().add_paragraph(para(c)))
                            .collect(),
                    )
                })
                .collect(),
        )
    }

    fn write_docx(path: &Path, docx: Docx) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let file = std::fs::File::create(path).unwrap();
        docx.build().pack(file).expect("pack docx");
    }

    fn settings(mode: TaggingMode) -> BuildSettings {
        BuildSettings {
            context_radius: 1,
            tagging_mode: mode,
            vocabulary_path: None,
            converter_command: None,
        }
    }

    fn config(input: &Path, out: &Path, mode: TaggingMode) -> BuildConfig {
        BuildConfig {
            input: input.to_path_buf(),
            corpus_dir: out.to_path_buf(),
            name: "test".into(),
            settings: settings(mode),
            tool_version: "0.0.0-test".into(),
        }
    }

    /// `a_notes.docx` mentions "south" before `b_March_2024_sales.docx` mints it.
    fn seed_folder(root: &Path) {
        write_docx(
            &root.join("a_notes.docx"),
            Docx::new().add_paragraph(para("The south region lagged")),
        );
        write_docx(
            &root.join("nested/b_March_2024_sales.docx"),
            Docx::new()
                .add_paragraph(para("Quarterly figures, Sales by region:"))
                .add_table(table(&[&["Region", "Sales"], &["North", "10"], &["South", "7"]]))
                .add_paragraph(para("The north region led; see above table"))
                .add_paragraph(para("Results for January 2024 are final")),
        );
    }

    #[test]
    fn discovery_is_recursive_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for name in ["b.docx", "a/c.DOC", "a/z.DocX", "notes.txt", "~$b.docx"] {
            let path = root.join(name);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, b"").unwrap();
        }

        let found: Vec<String> = discover_documents(root)
            .unwrap()
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(found, ["a/c.DOC", "a/z.DocX", "b.docx"]);
    }

    #[cfg(unix)]
    #[test]
    fn discovery_does_not_follow_directory_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("sub")).unwrap();
        std::fs::write(root.join("sub/a.docx"), b"").unwrap();
        std::os::unix::fs::symlink(root, root.join("sub/loop")).unwrap();

        let found = discover_documents(root).expect("walk terminates");
        assert_eq!(found, [root.join("sub/a.docx")]);
    }

    #[test]
    fn build_writes_a_readable_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let out = dir.path().join("out");
        seed_folder(&input);

        let result = build_corpus(&config(&input, &out, TaggingMode::SinglePass), &SilentProgress)
            .expect("build corpus");
        assert_eq!(result.file_count, 2);
        assert_eq!(result.skipped, 0);

        let corpus = CorpusStore::new(&out).read().expect("read corpus");
        assert_eq!(corpus.manifest.id, result.corpus_id);
        assert!(corpus.manifest.source_hash.is_some());
        assert_eq!(corpus.files.len(), 2);

        let sales: Vec<&Object> = corpus
            .objects
            .iter()
            .filter(|o| o.file_name == "b_March_2024_sales")
            .collect();
        let positions: Vec<usize> = sales.iter().map(|o| o.position).collect();
        assert_eq!(positions, [0, 1, 2, 3]);

        let table = sales[1];
        assert!(table.is_table());
        assert_eq!(table.title, "Sales by region");
        assert_eq!(table.above, "Quarterly figures, Sales by region:");
        assert_eq!(table.below, "The north region led; see above table");
        assert!(table.tags.contains("north") && table.tags.contains("south"));
        assert!(table.date.contains("March 2024"));

        let led = sales[2];
        assert!(led.tags.contains("north"));
        assert_eq!(led.above, format!("<Table:{}>", table.object_id));

        // A unit pointing at the "above table" is never preceding context.
        assert_eq!(sales[3].above, "");
        // Content date beats the file name.
        assert!(sales[3].date.contains("January 2024"));
        assert!(!sales[3].date.contains("March 2024"));

        // Single pass: the earlier file never saw "south".
        let notes = corpus
            .objects
            .iter()
            .find(|o| o.file_name == "a_notes")
            .unwrap();
        assert!(notes.tags.is_empty());

        let tagged: Vec<u64> = corpus.objects_tagged("north").iter().map(|o| o.object_id).collect();
        assert_eq!(tagged, [table.object_id, led.object_id]);

        assert!(render_for_prompt(table).starts_with("Filename: b_March_2024_sales\n"));
    }

    #[test]
    fn two_pass_tags_texts_with_later_tables() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let out = dir.path().join("out");
        seed_folder(&input);

        build_corpus(&config(&input, &out, TaggingMode::TwoPass), &SilentProgress).unwrap();
        let corpus = CorpusStore::new(&out).read().unwrap();
        let notes = corpus
            .objects
            .iter()
            .find(|o| o.file_name == "a_notes")
            .unwrap();
        assert!(notes.tags.contains("south"));
    }

    #[test]
    fn unreadable_documents_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let out = dir.path().join("out");
        seed_folder(&input);
        std::fs::write(input.join("broken.docx"), b"not a zip").unwrap();
        std::fs::write(input.join("legacy.doc"), b"binary").unwrap();

        let result =
            build_corpus(&config(&input, &out, TaggingMode::SinglePass), &SilentProgress).unwrap();
        assert_eq!(result.file_count, 4);
        assert_eq!(result.skipped, 2);

        let corpus = CorpusStore::new(&out).read().unwrap();
        assert_eq!(corpus.files.len(), 4);
        assert!(corpus.objects.iter().all(|o| o.file_name != "broken"));
    }

    #[test]
    fn missing_file_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut miner = Miner::new(&settings(TaggingMode::SinglePass), Tags::new());
        let file = miner.register(&dir.path().join("gone.docx"));
        assert_eq!(miner.process(&file).unwrap(), FileOutcome::Missing);
        let mined = miner.finish();
        assert_eq!(mined.files.len(), 1);
        assert!(mined.objects.is_empty());
    }

    /// Stands in for the office converter by writing a fixed `.docx`.
    struct FixtureConverter;

    impl LegacyConverter for FixtureConverter {
        fn convert(&self, path: &Path) -> Result<docmine_document::ConvertedDocument> {
            let workspace = tempfile::tempdir().map_err(|e| DocmineError::io(path, e))?;
            let converted = workspace.path().join("converted.docx");
            write_docx(&converted, Docx::new().add_paragraph(para("Converted body")));
            Ok(docmine_document::ConvertedDocument::new(converted, workspace))
        }
    }

    #[test]
    fn legacy_documents_go_through_the_converter() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = dir.path().join("old_memo.doc");
        std::fs::write(&legacy, b"binary").unwrap();

        let mut miner = Miner::new(&settings(TaggingMode::SinglePass), Tags::new())
            .with_converter(Some(Box::new(FixtureConverter)));
        let file = miner.register(&legacy);
        assert_eq!(
            miner.process(&file).unwrap(),
            FileOutcome::Mined { objects: 1 }
        );
        let mined = miner.finish();
        assert_eq!(mined.objects[0].file_name, "old_memo");
        assert_eq!(mined.objects[0].as_text(), Some("Converted body"));
    }

    #[test]
    fn seeded_tags_reach_texts_but_not_the_export() {
        let mut vocabulary = Tags::new();
        vocabulary.add_tag("revenue", None);
        vocabulary.add_tag("headcount", None);

        let mut miner = Miner::new(&settings(TaggingMode::SinglePass), vocabulary);
        let file = miner.register(Path::new("memo.docx"));
        miner.process_blocks(&file, vec![RawBlock::Text("revenue grew".into())]);
        let mined = miner.finish();

        assert!(mined.objects[0].tags.contains("revenue"));
        let exported: Vec<&str> = mined.tags.associated().map(|(name, _)| name).collect();
        assert_eq!(exported, ["revenue"]);
    }

    #[test]
    fn empty_folder_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = build_corpus(
            &config(dir.path(), &dir.path().join("out"), TaggingMode::SinglePass),
            &SilentProgress,
        )
        .unwrap_err();
        assert!(matches!(err, DocmineError::Validation { .. }));
    }

    #[test]
    fn source_hash_tracks_listing() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.docx");
        std::fs::write(&a, b"").unwrap();
        let one = source_hash(dir.path(), std::slice::from_ref(&a));
        assert_eq!(one, source_hash(dir.path(), std::slice::from_ref(&a)));
        assert_eq!(one.len(), 64);

        let b = dir.path().join("b.docx");
        std::fs::write(&b, b"").unwrap();
        assert_ne!(one, source_hash(dir.path(), &[a, b]));
    }

    #[test]
    fn corpus_names() {
        assert_eq!(corpus_name(Path::new("/data/Store")), "Store");
        assert_eq!(corpus_name(Path::new("/data/report.docx")), "report");
        assert_eq!(corpus_name(Path::new("/")), "corpus");
    }
}
