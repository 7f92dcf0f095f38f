//! Pack configuration.

use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the optional configuration file at a pack's input base.
pub const CONFIG_FILE_NAME: &str = "reticle.config";

/// Directory name used for trashed files when no explicit location is set.
pub const DEFAULT_TRASH_DIR: &str = ".trash";

/// What happens to files removed during a save pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TrashPolicy {
    /// Move into `.trash/` under the output base.
    #[default]
    OutputDir,
    /// Move into the given directory.
    Directory(PathBuf),
    /// Remove permanently.
    Permanent,
}

impl TrashPolicy {
    /// Parse the value of a `trash=` config line.
    fn parse(value: &str) -> Self {
        match value {
            "" | "output" => TrashPolicy::OutputDir,
            "permanent" => TrashPolicy::Permanent,
            dir => TrashPolicy::Directory(PathBuf::from(dir)),
        }
    }
}

/// Settings for a [`Pack`](crate::Pack).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackConfig {
    input_base: PathBuf,
    output_base: Option<PathBuf>,
    trash: TrashPolicy,
    tolerant_comments: bool,
}

impl PackConfig {
    /// Configuration reading from and writing to `input_base`.
    pub fn new(input_base: impl Into<PathBuf>) -> Self {
        Self {
            input_base: input_base.into(),
            output_base: None,
            trash: TrashPolicy::default(),
            tolerant_comments: true,
        }
    }

    /// Load configuration for `input_base`, reading `reticle.config` there if
    /// it exists.
    ///
    /// The file is `key=value` lines; `#` starts a comment line. Known keys:
    /// `output` (output base, relative paths resolve against the input base),
    /// `trash` (`output`, `permanent` or a directory) and `tolerant_comments`
    /// (`true`/`false`).
    pub fn load(input_base: impl Into<PathBuf>) -> Result<Self> {
        let input_base = input_base.into();
        let config_path = input_base.join(CONFIG_FILE_NAME);
        let config = Self::new(&input_base);

        if !config_path.exists() {
            return Ok(config);
        }

        let content = fs::read_to_string(&config_path)?;
        config.apply(&content, &config_path)
    }

    /// Apply `key=value` lines on top of this configuration.
    fn apply(mut self, content: &str, origin: &Path) -> Result<Self> {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();

            match key.trim() {
                "output" => self.output_base = Some(self.input_base.join(value)),
                "trash" => self.trash = TrashPolicy::parse(value),
                "tolerant_comments" => {
                    self.tolerant_comments = value.parse().map_err(|_| {
                        Error::invalid_config(
                            origin,
                            format!("tolerant_comments expects true or false, got {}", value),
                        )
                    })?
                }
                other => tracing::debug!(key = other, "ignoring unknown config key"),
            }
        }

        Ok(self)
    }

    /// Write to a different tree than the one being read.
    pub fn output_base(mut self, output_base: impl Into<PathBuf>) -> Self {
        self.output_base = Some(output_base.into());
        self
    }

    pub fn trash(mut self, trash: TrashPolicy) -> Self {
        self.trash = trash;
        self
    }

    /// Whether documents that fail strict parsing get a second, comment-stripped pass.
    pub fn tolerant_comments(mut self, enabled: bool) -> Self {
        self.tolerant_comments = enabled;
        self
    }

    pub fn input_base_path(&self) -> &Path {
        &self.input_base
    }

    /// Output base, falling back to the input base.
    pub fn output_base_path(&self) -> &Path {
        self.output_base.as_deref().unwrap_or(&self.input_base)
    }

    pub fn trash_policy(&self) -> &TrashPolicy {
        &self.trash
    }

    pub fn is_tolerant(&self) -> bool {
        self.tolerant_comments
    }
}
