//! Whole-file JSON documents.

use crate::document::Document;
use crate::error::Result;
use crate::fingerprint::Fingerprint;
use crate::io::PackIo;
use crate::resource::{FileBacking, FileResource, Resource};
use crate::tracked::Owner;
use serde_json::Value;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// A JSON document persisted as one file of a pack.
#[derive(Debug)]
pub struct DocumentFile {
    backing: FileBacking,
    document: Document,
}

impl DocumentFile {
    /// A floating document file. It cannot be saved until a pack adopts it.
    pub fn new(path: impl Into<PathBuf>, value: impl Into<Value>) -> Self {
        Self {
            backing: FileBacking::new(path),
            document: Document::new(value),
        }
    }

    /// Load `path` from the pack's input base.
    pub(crate) fn load(path: impl Into<PathBuf>, pack: &Rc<PackIo>) -> Result<Self> {
        let path = path.into();
        let value = pack.read_json(&path)?;

        let mut backing = FileBacking::attached(path, pack);
        backing.set_fingerprint(Some(Fingerprint::of_json(&value)));

        Ok(Self {
            backing,
            document: Document::new(value),
        })
    }

    pub(crate) fn attach(&mut self, pack: &Rc<PackIo>) {
        self.backing.attach(pack);
    }

    pub fn path(&self) -> &Path {
        self.backing.path()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.backing.file_name()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }
}

impl Deref for DocumentFile {
    type Target = Document;

    fn deref(&self) -> &Document {
        &self.document
    }
}

impl DerefMut for DocumentFile {
    fn deref_mut(&mut self) -> &mut Document {
        &mut self.document
    }
}

impl fmt::Display for DocumentFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.document, f)
    }
}

impl Resource for DocumentFile {
    fn owner(&self) -> &Owner {
        self.document.owner()
    }

    fn should_save(&self) -> bool {
        self.backing
            .should_save(self.is_dirty(), self.current_fingerprint())
    }

    fn save(&mut self, force: bool) -> Result<()> {
        let pack = self.backing.pack()?;

        if self.backing.is_marked_for_deletion() {
            tracing::debug!(path = %self.path().display(), "skipping save of deleted file");
            return Ok(());
        }
        if !(force || self.should_save()) {
            return Ok(());
        }

        // Fragments land in our tree before it is serialized
        self.document.flush_fragments(force)?;
        pack.write_json(self.backing.path(), self.document.value())?;

        self.backing
            .set_fingerprint(Some(Fingerprint::of_json(self.document.value())));
        self.document.owner().clear();
        Ok(())
    }

    fn delete(&mut self, force: bool) -> Result<()> {
        if self.backing.is_marked_for_deletion() && !force {
            return Ok(());
        }

        self.document.delete_fragments()?;
        self.backing.mark_for_deletion();
        tracing::debug!(path = %self.path().display(), "marked file for deletion");
        Ok(())
    }
}

impl FileResource for DocumentFile {
    fn backing(&self) -> &FileBacking {
        &self.backing
    }

    fn current_fingerprint(&self) -> Option<Fingerprint> {
        Some(Fingerprint::of_json(self.document.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PackConfig;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn pack_io(dir: &TempDir) -> Rc<PackIo> {
        Rc::new(PackIo::new(PackConfig::new(dir.path())))
    }

    #[test]
    fn test_floating_save_fails() {
        let mut file = DocumentFile::new("entities/cow.json", json!({"a": 1}));
        let err = file.save(false).unwrap_err();
        assert!(err.is_floating());

        // Even forced
        assert!(file.save(true).unwrap_err().is_floating());
    }

    #[test]
    fn test_load_is_clean() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.json"), r#"{"a": {"b": 1}}"#).unwrap();

        let file = DocumentFile::load("a.json", &pack_io(&temp_dir)).unwrap();
        assert!(!file.is_dirty());
        assert!(!file.should_save());
        assert_eq!(file.file_name(), Some("a.json"));
    }

    #[test]
    fn test_save_clears_dirty_and_writes() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.json"), r#"{"a": {"b": {"c": 1}}}"#).unwrap();
        let io = pack_io(&temp_dir);

        let mut file = DocumentFile::load("a.json", &io).unwrap();
        file.set("a/b/c", 2).unwrap();
        assert!(file.is_dirty());

        file.save(false).unwrap();
        assert!(!file.is_dirty());
        assert!(!file.should_save());

        let written = fs::read_to_string(temp_dir.path().join("a.json")).unwrap();
        assert_eq!(written, "{\n  \"a\": {\n    \"b\": {\n      \"c\": 2\n    }\n  }\n}");
    }

    #[test]
    fn test_clean_save_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let original = r#"{"compact":true}"#;
        fs::write(temp_dir.path().join("a.json"), original).unwrap();

        let io = pack_io(&temp_dir);
        let mut file = DocumentFile::load("a.json", &io).unwrap();
        file.save(false).unwrap();

        // Untouched, so the compact original stays as it was
        let on_disk = fs::read_to_string(temp_dir.path().join("a.json")).unwrap();
        assert_eq!(on_disk, original);
    }

    #[test]
    fn test_save_includes_fragment_changes() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("a.json"),
            r#"{"components": {"health": {"value": 10}}}"#,
        )
        .unwrap();
        let io = pack_io(&temp_dir);

        let mut file = DocumentFile::load("a.json", &io).unwrap();
        file.save(false).unwrap();

        file.fragment("components/health")
            .unwrap()
            .set("value", 30)
            .unwrap();
        file.save(false).unwrap();

        let reread = io.read_json(Path::new("a.json")).unwrap();
        assert_eq!(reread, json!({"components": {"health": {"value": 30}}}));
        assert!(!file.is_dirty());
    }

    #[test]
    fn test_delete_marks_and_blocks_save() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.json"), r#"{"list": [1, 2]}"#).unwrap();
        let io = pack_io(&temp_dir);

        let mut file = DocumentFile::load("a.json", &io).unwrap();
        file.fragment("list/[0]").unwrap();
        file.delete(false).unwrap();

        assert!(file.is_marked_for_deletion());
        assert!(file.fragments().is_empty());

        file.set("list", json!([])).unwrap();
        file.save(true).unwrap();

        // Deletion wins: nothing was written
        let on_disk = fs::read_to_string(temp_dir.path().join("a.json")).unwrap();
        assert_eq!(on_disk, r#"{"list": [1, 2]}"#);
    }

    #[test]
    fn test_display_is_pretty_json() {
        let file = DocumentFile::new("a.json", json!({"ä": [1]}));
        assert_eq!(file.to_string(), "{\n  \"ä\": [\n    1\n  ]\n}");
    }
}
