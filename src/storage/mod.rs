// Storage adapter layer for notekeeper
// Every path is relative to the storage root the adapter was opened on

pub mod local;
pub mod memory;

use crate::errors::NoteResult;

pub use local::LocalStorage;
pub use memory::{MemoryStorage, Op};

pub const NOTE_EXTENSION: &str = ".html";
pub const REVISIONS_SUFFIX: &str = ".revisions";
pub const TRASH_DIR: &str = ".Trash";
/// What id 0 resolves to: a file that does not exist yet
pub const NEW_FILE_SENTINEL: &str = "new.html";

// ============================================
// ADAPTER CAPABILITY
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub kind: EntryKind,
    pub size: u64,
    /// Modification time in epoch millis, when the backend knows it
    pub mtime: Option<i64>,
}

/// Outcome of a `stat` call. A missing entry is an answer, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatResult {
    Found(Metadata),
    NotFound,
}

impl StatResult {
    pub fn exists(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

/// Primitive storage operations consumed by the pipelines.
///
/// Implementations decide their own timeouts; any `Err` ends the current
/// save cycle. `mkdir` must accept an existing directory.
pub trait StorageAdapter: Send + Sync {
    fn write_file(&self, path: &str, data: &str) -> NoteResult<()>;
    fn read_file(&self, path: &str) -> NoteResult<String>;
    fn rename(&self, from: &str, to: &str) -> NoteResult<()>;
    fn mkdir(&self, path: &str, recursive: bool) -> NoteResult<()>;
    fn stat(&self, path: &str) -> NoteResult<StatResult>;
    fn delete_file(&self, path: &str) -> NoteResult<()>;
    fn read_dir(&self, path: &str) -> NoteResult<Vec<DirEntry>>;
}

// ============================================
// PATH HELPERS
// ============================================

/// Revision namespace of a primary file (`a.html` -> `a.html.revisions`)
pub fn revisions_dir(path: &str) -> String {
    format!("{path}{REVISIONS_SUFFIX}")
}

/// Snapshot file for one editing session
pub fn revision_path(path: &str, revision_name: &str) -> String {
    format!("{path}{REVISIONS_SUFFIX}/{revision_name}{NOTE_EXTENSION}")
}

/// Directory prefix of a relative path ("" for the root)
pub fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

pub fn file_name(path: &str) -> &str {
    path.rsplit_once('/').map(|(_, name)| name).unwrap_or(path)
}

pub fn join(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

/// `a/title.html` -> `a/title.1700000000000.html`
pub fn with_timestamp(path: &str, millis: i64) -> String {
    match path.strip_suffix(NOTE_EXTENSION) {
        Some(stem) => format!("{stem}.{millis}{NOTE_EXTENSION}"),
        None => format!("{path}.{millis}"),
    }
}

pub fn is_trash_dir(dir: &str) -> bool {
    dir.split('/').any(|part| part == TRASH_DIR)
}

/// Matched on extension alone. A leading dot hides directories, not notes.
pub fn is_note_file(name: &str) -> bool {
    name.ends_with(NOTE_EXTENSION)
}
