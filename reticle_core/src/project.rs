//! Projects: one behavior pack paired with one resource pack.

use crate::config::PackConfig;
use crate::error::Result;
use crate::pack::{Pack, PackKind};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Identity of a project, shared with its packs through a weak link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo {
    behavior_base: PathBuf,
    resource_base: PathBuf,
}

impl ProjectInfo {
    pub fn behavior_base(&self) -> &Path {
        &self.behavior_base
    }

    pub fn resource_base(&self) -> &Path {
        &self.resource_base
    }
}

/// A behavior pack and a resource pack, saved together.
///
/// Packs are constructed on first access, configured from their own
/// `reticle.config` if present.
#[derive(Debug)]
pub struct Project {
    info: Rc<ProjectInfo>,
    behavior: Option<Pack>,
    resource: Option<Pack>,
}

impl Project {
    pub fn new(behavior_base: impl Into<PathBuf>, resource_base: impl Into<PathBuf>) -> Self {
        Self {
            info: Rc::new(ProjectInfo {
                behavior_base: behavior_base.into(),
                resource_base: resource_base.into(),
            }),
            behavior: None,
            resource: None,
        }
    }

    pub fn info(&self) -> &Rc<ProjectInfo> {
        &self.info
    }

    /// The behavior pack, constructed on first call.
    pub fn behavior_pack(&mut self) -> Result<&mut Pack> {
        let pack = match self.behavior.take() {
            Some(pack) => pack,
            None => {
                let config = PackConfig::load(self.info.behavior_base())?;
                Pack::for_project(PackKind::Behavior, config, &self.info)
            }
        };
        Ok(self.behavior.insert(pack))
    }

    /// The resource pack, constructed on first call.
    pub fn resource_pack(&mut self) -> Result<&mut Pack> {
        let pack = match self.resource.take() {
            Some(pack) => pack,
            None => {
                let config = PackConfig::load(self.info.resource_base())?;
                Pack::for_project(PackKind::Resource, config, &self.info)
            }
        };
        Ok(self.resource.insert(pack))
    }

    /// Whether either constructed pack has pending changes.
    pub fn is_dirty(&self) -> bool {
        self.behavior.iter().chain(self.resource.iter()).any(Pack::is_dirty)
    }

    /// Save the behavior pack, then the resource pack. Packs never accessed
    /// are skipped.
    pub fn save(&mut self, force: bool) -> Result<()> {
        if let Some(pack) = self.behavior.as_mut() {
            pack.save(force)?;
        }
        if let Some(pack) = self.resource.as_mut() {
            pack.save(force)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn project(dir: &TempDir) -> Project {
        Project::new(dir.path().join("bp"), dir.path().join("rp"))
    }

    #[test]
    fn test_packs_are_lazy_and_cached() {
        let temp_dir = TempDir::new().unwrap();
        let mut project = project(&temp_dir);
        assert!(project.behavior.is_none());
        assert!(project.resource.is_none());

        project
            .behavior_pack()
            .unwrap()
            .create_document("a.json", json!({}));
        assert_eq!(project.behavior_pack().unwrap().documents().len(), 1);
        assert!(project.resource.is_none());
    }

    #[test]
    fn test_packs_know_their_project() {
        let temp_dir = TempDir::new().unwrap();
        let mut project = project(&temp_dir);
        let info = Rc::clone(project.info());

        let behavior = project.behavior_pack().unwrap();
        assert_eq!(behavior.kind(), PackKind::Behavior);
        assert_eq!(behavior.project().unwrap(), info);

        let resource = project.resource_pack().unwrap();
        assert_eq!(resource.kind(), PackKind::Resource);
        assert_eq!(resource.input_base(), info.resource_base());
    }

    #[test]
    fn test_save_both_packs() {
        let temp_dir = TempDir::new().unwrap();
        let mut project = project(&temp_dir);

        project
            .behavior_pack()
            .unwrap()
            .create_document("entities/cow.json", json!({"id": "cow"}));
        project
            .resource_pack()
            .unwrap()
            .create_document("entity/cow.json", json!({"id": "cow"}));
        assert!(project.is_dirty());

        project.save(false).unwrap();
        assert!(!project.is_dirty());
        assert!(temp_dir.path().join("bp/entities/cow.json").exists());
        assert!(temp_dir.path().join("rp/entity/cow.json").exists());
    }

    #[test]
    fn test_save_untouched_project() {
        let temp_dir = TempDir::new().unwrap();
        let mut project = project(&temp_dir);
        project.save(true).unwrap();
        assert!(!temp_dir.path().join("bp").exists());
    }

    #[test]
    fn test_pack_config_is_read() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("bp")).unwrap();
        fs::write(
            temp_dir.path().join("bp").join(crate::config::CONFIG_FILE_NAME),
            "output=out\n",
        )
        .unwrap();
        let mut project = project(&temp_dir);

        let pack = project.behavior_pack().unwrap();
        assert_eq!(pack.output_base(), temp_dir.path().join("bp/out"));
    }
}
