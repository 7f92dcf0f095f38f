//! Translation tables (`texts/*.lang`).
//!
//! Each line is `key=value`, optionally followed by a `#`-prefixed comment:
//!
//! ```text
//! item.sword.name=Sword	## shown in the inventory
//! ```

use crate::error::Result;
use crate::fingerprint::Fingerprint;
use crate::io::PackIo;
use crate::resource::{FileBacking, FileResource, Resource};
use crate::tracked::Owner;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// One `key=value` record of a translation table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub key: String,
    pub value: String,
    pub comment: String,
}

impl Translation {
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            comment: comment.into(),
        }
    }

    /// Parse one line.
    ///
    /// Yields `None` for lines without `=`, with an empty key or value, whose
    /// key contains `#` (comment lines), or whose comment contains another `#`
    /// after the leading run.
    pub fn parse_line(line: &str) -> Option<Self> {
        let (key, rest) = line.split_once('=')?;
        let key = key.trim();
        if key.is_empty() || key.contains('#') {
            return None;
        }

        let (value, comment) = match rest.split_once('#') {
            Some((value, comment)) => (value, comment.trim_start_matches('#')),
            None => (rest, ""),
        };
        if value.is_empty() || comment.contains('#') {
            return None;
        }

        Some(Self::new(key, value.trim(), comment.trim()))
    }

    /// Serialize as `key=value\t##comment`.
    pub fn to_line(&self) -> String {
        format!("{}={}\t##{}", self.key, self.value, self.comment)
    }
}

/// An ordered list of translations persisted as one `.lang` file.
///
/// Duplicate keys are tolerated in storage; lookups return the first match.
#[derive(Debug)]
pub struct TranslationTable {
    backing: FileBacking,
    owner: Owner,
    translations: Vec<Translation>,
}

impl TranslationTable {
    /// An empty, floating table.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            backing: FileBacking::new(path),
            owner: Owner::new(),
            translations: Vec::new(),
        }
    }

    /// A floating table parsed from `content`.
    pub fn parse(path: impl Into<PathBuf>, content: &str) -> Self {
        let mut table = Self::new(path);
        table.translations = content.lines().filter_map(Translation::parse_line).collect();
        table
    }

    /// Load `path` from the pack's input base.
    pub(crate) fn load(path: impl Into<PathBuf>, pack: &Rc<PackIo>) -> Result<Self> {
        let path = path.into();
        let content = pack.read_text(&path)?;

        let mut table = Self::parse(path, &content);
        table.backing.attach(pack);
        table
            .backing
            .set_fingerprint(table.current_fingerprint());

        tracing::debug!(
            path = %table.path().display(),
            translations = table.len(),
            "loaded translation table"
        );
        Ok(table)
    }

    /// A new table owned by `pack`, written on its next save.
    pub(crate) fn create(path: impl Into<PathBuf>, pack: &Rc<PackIo>) -> Self {
        let mut table = Self::new(path);
        table.backing.attach(pack);
        table
    }

    pub fn path(&self) -> &Path {
        self.backing.path()
    }

    /// File name, e.g. `en_US.lang`.
    pub fn file_name(&self) -> Option<&str> {
        self.backing.file_name()
    }

    pub fn translations(&self) -> &[Translation] {
        &self.translations
    }

    pub fn len(&self) -> usize {
        self.translations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.translations.is_empty()
    }

    /// First translation with `key`.
    pub fn get(&self, key: &str) -> Option<&Translation> {
        self.translations.iter().find(|t| t.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Append a translation.
    ///
    /// With `overwrite` false an existing key is left alone and `false` is
    /// returned.
    pub fn add(&mut self, translation: Translation, overwrite: bool) -> bool {
        if !overwrite && self.contains(&translation.key) {
            return false;
        }

        self.owner.mark_dirty();
        self.translations.push(translation);
        true
    }

    /// Remove the first translation with `key`. Returns whether one was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        match self.translations.iter().position(|t| t.key == key) {
            Some(index) => {
                self.owner.mark_dirty();
                self.translations.remove(index);
                true
            }
            None => false,
        }
    }

    /// File content as it would be written.
    pub fn serialize(&self) -> String {
        self.translations
            .iter()
            .map(|t| format!("{}\n", t.to_line()))
            .collect()
    }
}

impl Resource for TranslationTable {
    fn owner(&self) -> &Owner {
        &self.owner
    }

    fn should_save(&self) -> bool {
        self.backing
            .should_save(self.is_dirty(), self.current_fingerprint())
    }

    fn save(&mut self, force: bool) -> Result<()> {
        let pack = self.backing.pack()?;

        if self.backing.is_marked_for_deletion() {
            return Ok(());
        }
        if !(force || self.should_save()) {
            return Ok(());
        }

        let content = self.serialize();
        pack.write_text(self.backing.path(), &content)?;

        self.backing
            .set_fingerprint(Some(Fingerprint::of_bytes(content.as_bytes())));
        self.owner.clear();
        Ok(())
    }

    fn delete(&mut self, force: bool) -> Result<()> {
        if self.backing.is_marked_for_deletion() && !force {
            return Ok(());
        }

        self.backing.mark_for_deletion();
        tracing::debug!(path = %self.path().display(), "marked translation table for deletion");
        Ok(())
    }
}

impl FileResource for TranslationTable {
    fn backing(&self) -> &FileBacking {
        &self.backing
    }

    fn current_fingerprint(&self) -> Option<Fingerprint> {
        Some(Fingerprint::of_bytes(self.serialize().as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PackConfig;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_line_with_comment() {
        let t = Translation::parse_line("a.b=Hello#comment").unwrap();
        assert_eq!(t, Translation::new("a.b", "Hello", "comment"));
    }

    #[test]
    fn test_parse_line_variants() {
        assert_eq!(
            Translation::parse_line("item.sword=Sword\t## inventory name"),
            Some(Translation::new("item.sword", "Sword", "inventory name"))
        );
        assert_eq!(
            Translation::parse_line("k=v"),
            Some(Translation::new("k", "v", ""))
        );
        assert_eq!(
            Translation::parse_line("url=a=b"),
            Some(Translation::new("url", "a=b", ""))
        );
    }

    #[test]
    fn test_parse_line_skips() {
        assert_eq!(Translation::parse_line(""), None);
        assert_eq!(Translation::parse_line("no separator"), None);
        assert_eq!(Translation::parse_line("## just=a comment"), None);
        assert_eq!(Translation::parse_line("=value"), None);
        assert_eq!(Translation::parse_line("k="), None);
        assert_eq!(Translation::parse_line("k=#only a comment"), None);
        assert_eq!(Translation::parse_line("k=v#one#two"), None);
    }

    #[test]
    fn test_parse_table() {
        let table = TranslationTable::parse("texts/en_US.lang", "a.b=Hello#comment\n");
        assert_eq!(table.len(), 1);
        assert_eq!(table.translations()[0], Translation::new("a.b", "Hello", "comment"));
        assert_eq!(table.file_name(), Some("en_US.lang"));
    }

    #[test]
    fn test_parse_table_ignores_blank_and_comment_lines() {
        let content = "## header\n\nfirst=One\n   \nsecond=Two ## note\n";
        let table = TranslationTable::parse("en_US.lang", content);
        assert_eq!(table.len(), 2);
        assert_eq!(table.serialize(), "first=One\t##\nsecond=Two\t##note\n");
    }

    #[test]
    fn test_add_duplicate_without_overwrite() {
        let mut table = TranslationTable::parse("en_US.lang", "a.b=Hello\n");

        assert!(!table.add(Translation::new("a.b", "Other", ""), false));
        assert_eq!(table.len(), 1);
        assert!(!table.is_dirty());

        assert!(table.add(Translation::new("a.b", "Other", ""), true));
        assert_eq!(table.len(), 2);
        assert!(table.is_dirty());

        // First match wins
        assert_eq!(table.get("a.b").unwrap().value, "Hello");
    }

    #[test]
    fn test_delete() {
        let mut table = TranslationTable::parse("en_US.lang", "a=1\nb=2\na=3\n");

        assert!(!table.delete("zzz"));
        assert!(!table.is_dirty());

        assert!(table.delete("a"));
        assert!(table.is_dirty());
        assert_eq!(table.get("a").unwrap().value, "3");
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_floating_save_fails() {
        let mut table = TranslationTable::new("texts/en_US.lang");
        assert!(table.save(true).unwrap_err().is_floating());
    }

    #[test]
    fn test_save_writes_format() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("texts")).unwrap();
        fs::write(temp_dir.path().join("texts/en_US.lang"), "a=1 # one\n").unwrap();
        let io = Rc::new(PackIo::new(PackConfig::new(temp_dir.path())));

        let mut table = TranslationTable::load("texts/en_US.lang", &io).unwrap();
        assert!(!table.should_save());

        table.add(Translation::new("b", "2", "two"), true);
        table.save(false).unwrap();
        assert!(!table.is_dirty());
        assert!(!table.should_save());

        let written = fs::read_to_string(temp_dir.path().join("texts/en_US.lang")).unwrap();
        assert_eq!(written, "a=1\t##one\nb=2\t##two\n");
    }

    #[test]
    fn test_created_table_always_saves() {
        let temp_dir = TempDir::new().unwrap();
        let io = Rc::new(PackIo::new(PackConfig::new(temp_dir.path())));

        let mut table = TranslationTable::create("texts/de_DE.lang", &io);
        assert!(table.should_save());
        table.save(false).unwrap();
        assert!(temp_dir.path().join("texts/de_DE.lang").exists());
    }

    #[test]
    fn test_translation_serde() {
        let t = Translation::new("k", "v", "c");
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json, serde_json::json!({"key": "k", "value": "v", "comment": "c"}));
        let back: Translation = serde_json::from_value(json).unwrap();
        assert_eq!(back, t);
    }
}
