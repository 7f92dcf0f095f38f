//! Packs: collections of file resources sharing an input/output base.

use crate::config::PackConfig;
use crate::error::{Error, Result};
use crate::file::DocumentFile;
use crate::io::PackIo;
use crate::project::ProjectInfo;
use crate::resource::{FileResource, Resource};
use crate::translation::TranslationTable;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

/// Directory, relative to the input base, searched for translation tables.
pub const TEXTS_DIR: &str = "texts";

/// Extension of translation table files.
pub const LANG_EXTENSION: &str = "lang";

/// Role of a pack inside a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackKind {
    /// Behavior-style pack (entities, items, blocks logic).
    Behavior,
    /// Resource-style pack (textures, models, client definitions).
    Resource,
    /// Not part of a project.
    Standalone,
}

/// A top-level collection of file resources.
///
/// Documents are loaded on demand and cached by path; translation tables are
/// discovered once, on first access.
#[derive(Debug)]
pub struct Pack {
    io: Rc<PackIo>,
    kind: PackKind,
    project: Weak<ProjectInfo>,
    documents: Vec<DocumentFile>,
    translations: Option<Vec<TranslationTable>>,
}

impl Pack {
    /// A standalone pack with default configuration.
    pub fn new(input_base: impl Into<PathBuf>) -> Self {
        Self::with_config(PackConfig::new(input_base))
    }

    /// A standalone pack with explicit configuration.
    pub fn with_config(config: PackConfig) -> Self {
        Self {
            io: Rc::new(PackIo::new(config)),
            kind: PackKind::Standalone,
            project: Weak::new(),
            documents: Vec::new(),
            translations: None,
        }
    }

    /// A standalone pack configured from the `reticle.config` file at
    /// `input_base`, if there is one.
    pub fn open(input_base: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::with_config(PackConfig::load(input_base)?))
    }

    pub(crate) fn for_project(
        kind: PackKind,
        config: PackConfig,
        project: &Rc<ProjectInfo>,
    ) -> Self {
        let mut pack = Self::with_config(config);
        pack.kind = kind;
        pack.project = Rc::downgrade(project);
        pack
    }

    pub fn kind(&self) -> PackKind {
        self.kind
    }

    /// The project this pack belongs to, if any.
    pub fn project(&self) -> Option<Rc<ProjectInfo>> {
        self.project.upgrade()
    }

    /// Shared I/O handle of this pack.
    pub fn io(&self) -> &Rc<PackIo> {
        &self.io
    }

    pub fn input_base(&self) -> &Path {
        self.io.input_base()
    }

    pub fn output_base(&self) -> PathBuf {
        self.io.output_base()
    }

    /// Export subsequent saves to `output_base`; inputs are not modified.
    pub fn set_output_location(&self, output_base: impl Into<PathBuf>) {
        self.io.set_output_base(output_base);
    }

    /// Read and parse a JSON file relative to the input base.
    pub fn load_json(&self, local_path: impl AsRef<Path>) -> Result<Value> {
        self.io.read_json(local_path.as_ref())
    }

    /// Write a JSON file relative to the output base.
    pub fn save_json(&self, local_path: impl AsRef<Path>, value: &Value) -> Result<()> {
        self.io.write_json(local_path.as_ref(), value)
    }

    /// Trash a file relative to the output base. Failures are swallowed.
    pub fn delete_file(&self, local_path: impl AsRef<Path>) {
        self.io.delete_file(local_path.as_ref())
    }

    /// The document at `local_path`, loading it on first access.
    pub fn load_document(&mut self, local_path: impl AsRef<Path>) -> Result<&mut DocumentFile> {
        let local_path = local_path.as_ref();
        let index = match self.document_index(local_path) {
            Some(index) => index,
            None => {
                let file = DocumentFile::load(local_path, &self.io)?;
                self.documents.push(file);
                self.documents.len() - 1
            }
        };
        Ok(&mut self.documents[index])
    }

    /// A new document at `local_path`, written on the next save.
    ///
    /// If the path is already indexed its value is replaced instead.
    pub fn create_document(
        &mut self,
        local_path: impl AsRef<Path>,
        value: impl Into<Value>,
    ) -> &mut DocumentFile {
        let local_path = local_path.as_ref();
        let value = value.into();

        if let Some(index) = self.document_index(local_path) {
            let file = &mut self.documents[index];
            file.root_mut().replace(value);
            return file;
        }

        let mut file = DocumentFile::new(local_path, value);
        file.attach(&self.io);
        file.mark_dirty();
        self.documents.push(file);
        let last = self.documents.len() - 1;
        &mut self.documents[last]
    }

    /// Take ownership of a floating document file.
    ///
    /// Replaces any document already indexed at the same path.
    pub fn adopt(&mut self, mut file: DocumentFile) -> &mut DocumentFile {
        file.attach(&self.io);
        file.mark_dirty();

        let index = match self.document_index(file.path()) {
            Some(index) => {
                self.documents[index] = file;
                index
            }
            None => {
                self.documents.push(file);
                self.documents.len() - 1
            }
        };
        &mut self.documents[index]
    }

    /// An already loaded document.
    pub fn document(&self, local_path: impl AsRef<Path>) -> Result<&DocumentFile> {
        let local_path = local_path.as_ref();
        self.document_index(local_path)
            .map(|index| &self.documents[index])
            .ok_or_else(|| not_loaded(local_path))
    }

    pub fn document_mut(&mut self, local_path: impl AsRef<Path>) -> Result<&mut DocumentFile> {
        let local_path = local_path.as_ref();
        let index = self
            .document_index(local_path)
            .ok_or_else(|| not_loaded(local_path))?;
        Ok(&mut self.documents[index])
    }

    /// Loaded documents in load order.
    pub fn documents(&self) -> &[DocumentFile] {
        &self.documents
    }

    /// Translation tables under `texts/`, discovered on first call.
    pub fn translation_tables(&mut self) -> Result<&mut Vec<TranslationTable>> {
        if self.translations.is_none() {
            self.translations = Some(self.discover_translation_tables()?);
        }
        Ok(self.translations.get_or_insert_with(Vec::new))
    }

    /// The translation table with the given file name, e.g. `en_US.lang`.
    pub fn translation_table(&mut self, file_name: &str) -> Result<&mut TranslationTable> {
        self.translation_tables()?
            .iter_mut()
            .find(|table| table.file_name() == Some(file_name))
            .ok_or_else(|| Error::not_found(file_name, "no translation table with this name"))
    }

    /// A new, empty translation table at `local_path`, written on the next save.
    pub fn create_translation_table(
        &mut self,
        local_path: impl AsRef<Path>,
    ) -> Result<&mut TranslationTable> {
        let table = TranslationTable::create(local_path.as_ref(), &self.io);
        let tables = self.translation_tables()?;
        tables.push(table);
        let last = tables.len() - 1;
        Ok(&mut tables[last])
    }

    /// Whether any owned resource has pending changes.
    pub fn is_dirty(&self) -> bool {
        self.documents.iter().any(|d| d.should_save() || d.is_marked_for_deletion())
            || self
                .translations
                .iter()
                .flatten()
                .any(|t| t.should_save() || t.is_marked_for_deletion())
    }

    /// Save every resource; trash the ones marked for deletion.
    pub fn save(&mut self, force: bool) -> Result<()> {
        tracing::debug!(
            input = %self.input_base().display(),
            output = %self.output_base().display(),
            force,
            "saving pack"
        );

        save_all(&self.io, &mut self.documents, force)?;
        if let Some(tables) = self.translations.as_mut() {
            save_all(&self.io, tables, force)?;
        }
        Ok(())
    }

    fn document_index(&self, local_path: &Path) -> Option<usize> {
        self.documents.iter().position(|d| d.path() == local_path)
    }

    fn discover_translation_tables(&self) -> Result<Vec<TranslationTable>> {
        let input_base = self.input_base();
        let texts_dir = input_base.join(TEXTS_DIR);
        if !texts_dir.is_dir() {
            return Ok(Vec::new());
        }

        let walker = ignore::WalkBuilder::new(&texts_dir)
            .hidden(false)
            .git_ignore(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut tables = Vec::new();
        for entry in walker {
            let entry = entry?;
            let path = entry.path();
            let is_lang = path.extension().and_then(|e| e.to_str()) == Some(LANG_EXTENSION);
            if !path.is_file() || !is_lang {
                continue;
            }

            let local_path = path.strip_prefix(input_base).unwrap_or(path);
            tables.push(TranslationTable::load(local_path, &self.io)?);
        }

        tracing::debug!(count = tables.len(), "discovered translation tables");
        Ok(tables)
    }
}

fn not_loaded(local_path: &Path) -> Error {
    Error::not_found(local_path.display().to_string(), "document is not loaded")
}

/// Save resources in order, then trash and drop the ones marked for deletion.
fn save_all<R: FileResource>(io: &PackIo, resources: &mut Vec<R>, force: bool) -> Result<()> {
    for resource in resources.iter_mut() {
        if !resource.is_marked_for_deletion() {
            resource.save(force)?;
        }
    }

    resources.retain(|resource| {
        if resource.is_marked_for_deletion() {
            io.delete_file(resource.path());
            false
        } else {
            true
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::Translation;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, path: &str, content: &str) {
        let full = dir.path().join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }

    #[test]
    fn test_load_document_is_cached() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir, "entities/cow.json", r#"{"a": 1}"#);
        let mut pack = Pack::new(temp_dir.path());

        pack.load_document("entities/cow.json").unwrap().set("a", 2).unwrap();
        let again = pack.load_document("entities/cow.json").unwrap();
        assert_eq!(again.get("a").unwrap(), &json!(2));
        assert_eq!(pack.documents().len(), 1);
    }

    #[test]
    fn test_load_missing_document() {
        let temp_dir = TempDir::new().unwrap();
        let mut pack = Pack::new(temp_dir.path());
        assert!(matches!(
            pack.load_document("nope.json").unwrap_err(),
            Error::Io { .. }
        ));
        assert!(pack.document("nope.json").unwrap_err().is_not_found());
    }

    #[test]
    fn test_load_malformed_document() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir, "bad.json", "{ \"a\": ");
        let mut pack = Pack::new(temp_dir.path());
        assert!(matches!(
            pack.load_document("bad.json").unwrap_err(),
            Error::MalformedDocument { .. }
        ));
        assert!(pack.documents().is_empty());
    }

    #[test]
    fn test_create_document_saves() {
        let temp_dir = TempDir::new().unwrap();
        let mut pack = Pack::new(temp_dir.path());

        pack.create_document("items/sword.json", json!({"damage": 5}));
        assert!(pack.is_dirty());
        pack.save(false).unwrap();

        assert!(!pack.is_dirty());
        let reread = pack.load_json("items/sword.json").unwrap();
        assert_eq!(reread, json!({"damage": 5}));
    }

    #[test]
    fn test_adopt_floating_document() {
        let temp_dir = TempDir::new().unwrap();
        let mut pack = Pack::new(temp_dir.path());

        let mut floating = DocumentFile::new("blocks/dirt.json", json!({"hardness": 1}));
        assert!(floating.save(false).unwrap_err().is_floating());

        pack.adopt(floating);
        pack.save(false).unwrap();
        assert!(temp_dir.path().join("blocks/dirt.json").exists());
    }

    #[test]
    fn test_delete_trashes_on_next_save() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir, "entities/pig.json", r#"{"a": 1}"#);
        let mut pack = Pack::new(temp_dir.path());

        pack.load_document("entities/pig.json").unwrap().delete(false).unwrap();

        // Nothing happens on disk until the save pass
        assert!(temp_dir.path().join("entities/pig.json").exists());
        assert!(pack.is_dirty());

        pack.save(false).unwrap();
        assert!(!temp_dir.path().join("entities/pig.json").exists());
        assert!(pack.documents().is_empty());
        assert!(temp_dir.path().join(crate::config::DEFAULT_TRASH_DIR).exists());
    }

    #[test]
    fn test_output_redirect_keeps_inputs() {
        let temp_dir = TempDir::new().unwrap();
        let original = r#"{"a": 1}"#;
        write(&temp_dir, "bp/doc.json", original);
        let out = temp_dir.path().join("export");

        let mut pack = Pack::new(temp_dir.path().join("bp"));
        pack.set_output_location(&out);
        pack.load_document("doc.json").unwrap().set("a", 2).unwrap();
        pack.save(false).unwrap();

        assert_eq!(
            fs::read_to_string(temp_dir.path().join("bp/doc.json")).unwrap(),
            original
        );
        assert_eq!(
            fs::read_to_string(out.join("doc.json")).unwrap(),
            "{\n  \"a\": 2\n}"
        );
    }

    #[test]
    fn test_translation_discovery() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir, "texts/en_US.lang", "a=1\n");
        write(&temp_dir, "texts/sub/de_DE.lang", "a=eins\n");
        write(&temp_dir, "texts/languages.json", "[]");
        let mut pack = Pack::new(temp_dir.path());

        let names: Vec<_> = pack
            .translation_tables()
            .unwrap()
            .iter()
            .map(|t| t.path().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("texts/en_US.lang"),
                PathBuf::from("texts/sub/de_DE.lang")
            ]
        );

        assert_eq!(
            pack.translation_table("de_DE.lang").unwrap().get("a").unwrap().value,
            "eins"
        );
        assert!(pack.translation_table("fr_FR.lang").unwrap_err().is_not_found());
    }

    #[test]
    fn test_translation_tables_are_cached() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir, "texts/en_US.lang", "a=1\n");
        let mut pack = Pack::new(temp_dir.path());

        assert_eq!(pack.translation_tables().unwrap().len(), 1);

        // Files appearing later are not picked up by the same pack
        write(&temp_dir, "texts/ja_JP.lang", "a=1\n");
        assert_eq!(pack.translation_tables().unwrap().len(), 1);
    }

    #[test]
    fn test_translation_save_and_create() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir, "texts/en_US.lang", "a=1\n");
        let mut pack = Pack::new(temp_dir.path());

        pack.translation_table("en_US.lang")
            .unwrap()
            .add(Translation::new("b", "2", ""), true);
        pack.create_translation_table("texts/fr_FR.lang")
            .unwrap()
            .add(Translation::new("a", "un", ""), true);
        pack.save(false).unwrap();

        assert_eq!(
            fs::read_to_string(temp_dir.path().join("texts/en_US.lang")).unwrap(),
            "a=1\t##\nb=2\t##\n"
        );
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("texts/fr_FR.lang")).unwrap(),
            "a=un\t##\n"
        );
    }

    #[test]
    fn test_no_texts_dir() {
        let temp_dir = TempDir::new().unwrap();
        let mut pack = Pack::new(temp_dir.path());
        assert!(pack.translation_tables().unwrap().is_empty());
    }

    #[test]
    fn test_standalone_pack_has_no_project() {
        let pack = Pack::new("bp");
        assert_eq!(pack.kind(), PackKind::Standalone);
        assert!(pack.project().is_none());
    }
}
