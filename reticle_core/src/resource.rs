//! The save/delete cascade shared by every resource.

use crate::error::{Error, Result};
use crate::fingerprint::Fingerprint;
use crate::io::PackIo;
use crate::tracked::Owner;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

/// A node of the ownership tree that takes part in saving and deleting.
///
/// `save` always persists children before the node itself, and `delete`
/// always deletes children first.
pub trait Resource {
    /// The dirty flag mutations of this resource mark.
    fn owner(&self) -> &Owner;

    fn is_dirty(&self) -> bool {
        self.owner().is_dirty()
    }

    /// Flag uncommitted changes explicitly.
    fn mark_dirty(&self) {
        self.owner().mark_dirty()
    }

    /// Whether a non-forced save would write anything.
    fn should_save(&self) -> bool {
        self.is_dirty()
    }

    /// Persist this resource and its children.
    ///
    /// Fails with [`Error::FloatingAsset`] when there is no owning pack.
    fn save(&mut self, force: bool) -> Result<()>;

    /// Delete this resource and its children.
    fn delete(&mut self, force: bool) -> Result<()>;
}

/// A resource whose persisted form is one file of a pack.
pub trait FileResource: Resource {
    fn backing(&self) -> &FileBacking;

    /// Fingerprint of the content a save would write now.
    ///
    /// Resources that do not fingerprint return `None` and are always
    /// considered changed.
    fn current_fingerprint(&self) -> Option<Fingerprint> {
        None
    }

    fn path(&self) -> &Path {
        self.backing().path()
    }

    fn is_marked_for_deletion(&self) -> bool {
        self.backing().is_marked_for_deletion()
    }
}

/// File-level state of a [`FileResource`].
#[derive(Debug, Clone)]
pub struct FileBacking {
    path: PathBuf,
    pack: Weak<PackIo>,
    fingerprint: Option<Fingerprint>,
    marked_for_deletion: bool,
}

impl FileBacking {
    /// A floating backing with no pack.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pack: Weak::new(),
            fingerprint: None,
            marked_for_deletion: false,
        }
    }

    /// A backing owned by `pack`.
    pub(crate) fn attached(path: impl Into<PathBuf>, pack: &Rc<PackIo>) -> Self {
        let mut backing = Self::new(path);
        backing.attach(pack);
        backing
    }

    pub(crate) fn attach(&mut self, pack: &Rc<PackIo>) {
        self.pack = Rc::downgrade(pack);
    }

    /// Path relative to the pack's bases.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Final path component, e.g. `en_US.lang`.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    /// The owning pack's I/O handle.
    pub fn pack(&self) -> Result<Rc<PackIo>> {
        self.pack
            .upgrade()
            .ok_or_else(|| Error::floating_asset(&self.path))
    }

    /// Whether there is no owning pack.
    pub fn is_floating(&self) -> bool {
        self.pack.strong_count() == 0
    }

    /// Fingerprint of the last loaded or saved content.
    pub fn fingerprint(&self) -> Option<Fingerprint> {
        self.fingerprint
    }

    pub(crate) fn set_fingerprint(&mut self, fingerprint: Option<Fingerprint>) {
        self.fingerprint = fingerprint;
    }

    /// Whether content with `current` fingerprint differs from what was
    /// last persisted. Unknown on either side counts as changed.
    pub fn has_changed(&self, current: Option<Fingerprint>) -> bool {
        match (self.fingerprint, current) {
            (Some(stored), Some(current)) => stored != current,
            _ => true,
        }
    }

    /// Save predicate for file resources. Deletion wins over everything.
    pub fn should_save(&self, dirty: bool, current: Option<Fingerprint>) -> bool {
        !self.marked_for_deletion && (dirty || self.has_changed(current))
    }

    pub fn is_marked_for_deletion(&self) -> bool {
        self.marked_for_deletion
    }

    /// Mark for removal during the pack's next save pass.
    pub(crate) fn mark_for_deletion(&mut self) {
        self.marked_for_deletion = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PackConfig;

    #[test]
    fn test_floating_backing() {
        let backing = FileBacking::new("entities/cow.json");
        assert!(backing.is_floating());
        assert!(backing.pack().unwrap_err().is_floating());
        assert_eq!(backing.file_name(), Some("cow.json"));
    }

    #[test]
    fn test_attached_backing_floats_when_pack_drops() {
        let io = Rc::new(PackIo::new(PackConfig::new("bp")));
        let backing = FileBacking::attached("a.json", &io);
        assert!(!backing.is_floating());
        assert!(backing.pack().is_ok());

        drop(io);
        assert!(backing.is_floating());
    }

    #[test]
    fn test_change_detection() {
        let mut backing = FileBacking::new("a.json");
        let one = Fingerprint::of_bytes(b"one");
        let two = Fingerprint::of_bytes(b"two");

        // Never persisted, or not fingerprinting
        assert!(backing.has_changed(Some(one)));
        assert!(backing.has_changed(None));

        backing.set_fingerprint(Some(one));
        assert!(!backing.has_changed(Some(one)));
        assert!(backing.has_changed(Some(two)));
        assert!(backing.has_changed(None));
    }

    #[test]
    fn test_deletion_wins() {
        let mut backing = FileBacking::new("a.json");
        assert!(backing.should_save(true, None));

        backing.mark_for_deletion();
        assert!(!backing.should_save(true, None));
        assert!(backing.is_marked_for_deletion());
    }
}
