// Note model for file-per-note storage
// The numeric id is the only stable handle; the path follows the content

use serde::{Deserialize, Serialize};
use std::fmt;

use super::block::Block;

/// Opaque note handle. `0` is reserved for a note that was never saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub u32);

impl NoteId {
    pub const NEW: NoteId = NoteId(0);

    pub fn is_new(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persisted view of a note, as handed to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtime: Option<i64>,
}

/// In-memory state of a note that is open in the editor.
///
/// `text` is the last serialization that reached the primary file (or was
/// read from it). A blank note starts with the serialization of its empty
/// paragraph, so nothing is written until the content changes.
#[derive(Debug, Clone, Default)]
pub struct NoteState {
    pub id: NoteId,
    pub path: Option<String>,
    pub blocks: Vec<Block>,
    pub text: Option<String>,
    pub tags: Vec<String>,
    pub title: String,
    pub mtime: Option<i64>,
}

impl NoteState {
    pub fn new(id: NoteId, path: Option<String>) -> Self {
        Self {
            id,
            path,
            ..Self::default()
        }
    }

    pub fn to_note(&self) -> Note {
        Note {
            id: self.id,
            path: self.path.clone(),
            content: self.text.clone().unwrap_or_default(),
            tags: self.tags.clone(),
            title: self.title.clone(),
            mtime: self.mtime,
        }
    }
}
