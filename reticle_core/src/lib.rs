//! # Reticle Core
//!
//! A change-tracked document model for trees of JSON documents and
//! translation files.
//!
//! Resources form an ownership tree: a [`Project`] owns two [`Pack`]s, a pack
//! owns [`DocumentFile`]s and [`TranslationTable`]s, and documents own the
//! [`Fragment`]s spawned from them. Every mutation goes through a tracked view
//! and marks its resource, and every ancestor, dirty. Saving runs children
//! first so fragments land in their parent's tree before it is written.
//!
//! ## Features
//!
//! - Path access into JSON trees (`a/b/[0]`, `a/b/*` for enumeration)
//! - Dirty tracking that bubbles up the ownership tree
//! - Content fingerprints so untouched files are never rewritten
//! - Comment-tolerant JSON input, pretty insertion-ordered output
//! - Deletion into a recoverable trash directory
//!
//! ## Example
//!
//! ```no_run
//! use reticle_core::{Project, Resource};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut project = Project::new("./behavior_pack", "./resource_pack");
//!
//! // Load a document and edit a nested value
//! let cow = project.behavior_pack()?.load_document("entities/cow.json")?;
//! cow.set("minecraft:entity/components/minecraft:health/value", 20)?;
//!
//! // Edit a sub-object through a fragment
//! let health = cow.fragment("minecraft:entity/components/minecraft:health")?;
//! health.set("max", 20)?;
//!
//! // Translations
//! let table = project.resource_pack()?.translation_table("en_US.lang")?;
//! println!("{} translations", table.len());
//!
//! // Only changed files are written
//! project.save(false)?;
//! # Ok(())
//! # }
//! ```

mod config;
mod document;
mod error;
mod file;
mod fingerprint;
mod io;
mod pack;
mod path;
mod project;
mod resource;
mod tracked;
mod translation;

pub use config::{CONFIG_FILE_NAME, DEFAULT_TRASH_DIR, PackConfig, TrashPolicy};
pub use document::{Children, Document, Fragment};
pub use error::{Error, Result};
pub use file::DocumentFile;
pub use fingerprint::{FINGERPRINT_SIZE, Fingerprint};
pub use io::{PackIo, parse_document, strip_comments, to_pretty_json};
pub use pack::{LANG_EXTENSION, Pack, PackKind, TEXTS_DIR};
pub use path::{JsonPath, Rebase, Segment, WILDCARD};
pub use project::{Project, ProjectInfo};
pub use resource::{FileBacking, FileResource, Resource};
pub use tracked::{Owner, TrackedList, TrackedMap, TrackedValue};
pub use translation::{Translation, TranslationTable};
