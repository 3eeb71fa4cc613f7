//! Conversion of legacy `.doc` files to `.docx` through an external converter.
//!
//! The converted file lives in a temporary directory owned by the returned
//! [`ConvertedDocument`]; dropping it removes the directory on every exit path.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tempfile::TempDir;
use tracing::{debug, info, instrument};

use docmine_shared::{DocmineError, Result};

/// Turns a legacy document into a readable `.docx`.
pub trait LegacyConverter {
    /// Convert `path`, returning a handle to the converted file.
    fn convert(&self, path: &Path) -> Result<ConvertedDocument>;
}

/// A converted `.docx` plus the scratch space backing it.
#[derive(Debug)]
pub struct ConvertedDocument {
    path: PathBuf,
    _workspace: TempDir,
}

impl ConvertedDocument {
    /// Tie `path` to the scratch directory that holds it.
    pub fn new(path: PathBuf, workspace: TempDir) -> Self {
        Self {
            path,
            _workspace: workspace,
        }
    }

    /// Path of the converted `.docx`; valid while `self` is alive.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Converter backed by a headless LibreOffice (`soffice`) process.
#[derive(Debug, Clone)]
pub struct SofficeConverter {
    command: String,
}

impl SofficeConverter {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl LegacyConverter for SofficeConverter {
    #[instrument(skip(self), fields(cmd = %self.command))]
    fn convert(&self, path: &Path) -> Result<ConvertedDocument> {
        let workspace = tempfile::Builder::new()
            .prefix("docmine-convert-")
            .tempdir()
            .map_err(|e| DocmineError::Conversion(format!("failed to create scratch dir: {e}")))?;

        // A private profile keeps concurrent office sessions from locking each other.
        let profile = workspace.path().join("profile");
        let out_dir = workspace.path().join("out");
        std::fs::create_dir_all(&out_dir).map_err(|e| DocmineError::io(&out_dir, e))?;

        info!(path = %path.display(), "converting legacy document");

        let output = Command::new(&self.command)
            .arg(format!("-env:UserInstallation=file://{}", profile.display()))
            .arg("--headless")
            .arg("--convert-to")
            .arg("docx")
            .arg("--outdir")
            .arg(&out_dir)
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                DocmineError::Conversion(format!(
                    "failed to spawn converter: {e}. Is `{}` installed?",
                    self.command
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DocmineError::Conversion(format!(
                "{} exited with {} for {}: {}",
                self.command,
                output.status,
                path.display(),
                stderr.trim()
            )));
        }

        let stem = path
            .file_stem()
            .ok_or_else(|| DocmineError::Conversion(format!("{} has no file name", path.display())))?;
        let converted = out_dir.join(format!("{}.docx", stem.to_string_lossy()));

        if !converted.exists() {
            return Err(DocmineError::Conversion(format!(
                "converter produced no output for {}",
                path.display()
            )));
        }

        debug!(converted = %converted.display(), "legacy document converted");
        Ok(ConvertedDocument::new(converted, workspace))
    }
}
