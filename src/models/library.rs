// Library model - tree of folders and notes found under the storage root

use serde::Serialize;

use super::note::NoteId;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LibraryEntry {
    Folder {
        name: String,
        path: String,
        children: Vec<LibraryEntry>,
    },
    Note {
        id: NoteId,
        title: String,
        path: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Library {
    pub entries: Vec<LibraryEntry>,
    /// Cloud placeholders (`*.icloud`) were seen; some notes are not local yet
    pub has_undownloaded: bool,
}

impl Library {
    /// Every note in the tree, depth-first
    pub fn notes(&self) -> Vec<(NoteId, &str)> {
        fn walk<'a>(entries: &'a [LibraryEntry], out: &mut Vec<(NoteId, &'a str)>) {
            for entry in entries {
                match entry {
                    LibraryEntry::Folder { children, .. } => walk(children, out),
                    LibraryEntry::Note { id, path, .. } => out.push((*id, path.as_str())),
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.entries, &mut out);
        out
    }
}
