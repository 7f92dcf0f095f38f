//! File access shared by a pack and the resources it owns.

use crate::config::{DEFAULT_TRASH_DIR, PackConfig, TrashPolicy};
use crate::error::{Error, Result};
use serde_json::Value;
use std::cell::RefCell;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Reads, writes and trashes files relative to a pack's bases.
///
/// Resources hold a weak handle to this; a resource whose handle is unset or
/// dead is floating.
#[derive(Debug)]
pub struct PackIo {
    config: PackConfig,
    output_base: RefCell<PathBuf>,
}

impl PackIo {
    pub fn new(config: PackConfig) -> Self {
        let output_base = RefCell::new(config.output_base_path().to_path_buf());
        Self {
            config,
            output_base,
        }
    }

    pub fn config(&self) -> &PackConfig {
        &self.config
    }

    pub fn input_base(&self) -> &Path {
        self.config.input_base_path()
    }

    /// Output base as of now. Saves resolve it per call.
    pub fn output_base(&self) -> PathBuf {
        self.output_base.borrow().clone()
    }

    /// Redirect future writes; inputs are untouched.
    pub fn set_output_base(&self, output_base: impl Into<PathBuf>) {
        *self.output_base.borrow_mut() = output_base.into();
    }

    pub fn input_path(&self, local_path: &Path) -> PathBuf {
        self.input_base().join(local_path)
    }

    pub fn output_path(&self, local_path: &Path) -> PathBuf {
        self.output_base.borrow().join(local_path)
    }

    /// Read a text file relative to the input base.
    pub fn read_text(&self, local_path: &Path) -> Result<String> {
        Ok(fs::read_to_string(self.input_path(local_path))?)
    }

    /// Read and parse a JSON document relative to the input base.
    pub fn read_json(&self, local_path: &Path) -> Result<Value> {
        let full_path = self.input_path(local_path);
        let content = fs::read_to_string(&full_path)?;
        tracing::debug!(path = %full_path.display(), "loading document");
        parse_document(&content, &full_path, self.config.is_tolerant())
    }

    /// Write a JSON document relative to the output base.
    pub fn write_json(&self, local_path: &Path, value: &Value) -> Result<()> {
        let content = to_pretty_json(value)?;
        self.write_text(local_path, &content)
    }

    /// Write a text file relative to the output base, atomically, creating
    /// missing directories.
    pub fn write_text(&self, local_path: &Path, content: &str) -> Result<()> {
        let full_path = self.output_path(local_path);
        write_atomic(&full_path, content.as_bytes())?;
        tracing::debug!(path = %full_path.display(), bytes = content.len(), "saved file");
        Ok(())
    }

    /// Send a file under the output base to the trash.
    ///
    /// Best effort: failures are logged and swallowed.
    pub fn delete_file(&self, local_path: &Path) {
        let full_path = self.output_path(local_path);
        if let Err(e) = self.trash(&full_path, local_path) {
            tracing::warn!(path = %full_path.display(), error = %e, "could not trash file");
        }
    }

    fn trash(&self, full_path: &Path, local_path: &Path) -> Result<()> {
        let trash_root = match self.config.trash_policy() {
            TrashPolicy::Permanent => {
                fs::remove_file(full_path)?;
                tracing::debug!(path = %full_path.display(), "removed file");
                return Ok(());
            }
            TrashPolicy::OutputDir => self.output_base().join(DEFAULT_TRASH_DIR),
            TrashPolicy::Directory(dir) => dir.clone(),
        };

        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let destination = trash_root.join(stamp.to_string()).join(local_path);

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }

        // Rename fails across filesystems; fall back to copy and remove
        if fs::rename(full_path, &destination).is_err() {
            fs::copy(full_path, &destination)?;
            fs::remove_file(full_path)?;
        }

        tracing::debug!(
            path = %full_path.display(),
            trash = %destination.display(),
            "moved file to trash"
        );
        Ok(())
    }
}

/// Parse a document, optionally retrying with comments stripped.
pub fn parse_document(content: &str, origin: &Path, tolerant: bool) -> Result<Value> {
    let strict_error = match serde_json::from_str(content) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    if !tolerant {
        tracing::error!(path = %origin.display(), error = %strict_error, "malformed document");
        return Err(Error::malformed_document(origin, strict_error));
    }

    tracing::warn!(
        path = %origin.display(),
        error = %strict_error,
        "strict parse failed, retrying with comments stripped"
    );

    serde_json::from_str(&strip_comments(content)).map_err(|e| {
        tracing::error!(path = %origin.display(), error = %e, "malformed document");
        Error::malformed_document(origin, e)
    })
}

/// Remove `//` line comments and `/* */` block comments.
///
/// This is a textual pass: comment markers inside string literals are
/// stripped too. An unterminated block comment swallows the rest of the text.
pub fn strip_comments(content: &str) -> String {
    let mut without_lines = String::with_capacity(content.len());
    for line in content.split_inclusive('\n') {
        match line.split_once("//") {
            Some((kept, _)) => {
                without_lines.push_str(kept);
                if line.ends_with('\n') {
                    without_lines.push('\n');
                }
            }
            None => without_lines.push_str(line),
        }
    }

    let mut result = String::with_capacity(without_lines.len());
    let mut rest = without_lines.as_str();
    while let Some((before, after)) = rest.split_once("/*") {
        result.push_str(before);
        rest = match after.split_once("*/") {
            Some((_, tail)) => tail,
            None => "",
        };
    }
    result.push_str(rest);
    result
}

/// Pretty JSON with 2-space indentation, keys in insertion order and
/// non-ASCII characters written literally.
pub fn to_pretty_json(value: &Value) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| Error::Io {
        source: std::io::Error::other(e),
    })
}

/// Write a file atomically using tempfile.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    temp_file.write_all(contents)?;
    temp_file.flush()?;

    // Persist atomically
    temp_file.persist(path)?;
    Ok(())
}
