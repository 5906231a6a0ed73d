// Library scan - walk the storage root and index every note found

use crate::errors::NoteResult;
use crate::models::{Library, LibraryEntry};
use crate::path_index::PathIndex;
use crate::storage::{EntryKind, NOTE_EXTENSION, REVISIONS_SUFFIX, StorageAdapter, is_note_file, join};

/// Placeholder iCloud leaves for files that are not downloaded yet
const CLOUD_PLACEHOLDER_SUFFIX: &str = ".icloud";

/// Walk the whole storage root.
///
/// Hidden directories (`.Trash` included) and revision namespaces are
/// skipped. Notes already in the index keep their id; others get a new one.
pub fn scan_library(storage: &dyn StorageAdapter, index: &PathIndex) -> NoteResult<Library> {
    let mut library = Library::default();
    library.entries = scan_dir(storage, index, "", &mut library.has_undownloaded)?;

    tracing::info!("[scan_library] found {} notes", library.notes().len());
    if library.has_undownloaded {
        tracing::warn!("[scan_library] some files are not downloaded from iCloud yet");
    }
    Ok(library)
}

fn scan_dir(
    storage: &dyn StorageAdapter,
    index: &PathIndex,
    dir: &str,
    has_undownloaded: &mut bool,
) -> NoteResult<Vec<LibraryEntry>> {
    let mut entries = Vec::new();

    for entry in storage.read_dir(dir)? {
        let path = join(dir, &entry.name);
        match entry.kind {
            EntryKind::Directory => {
                if entry.name.starts_with('.') || entry.name.ends_with(REVISIONS_SUFFIX) {
                    continue;
                }
                let children = scan_dir(storage, index, &path, has_undownloaded)?;
                entries.push(LibraryEntry::Folder {
                    name: entry.name,
                    path,
                    children,
                });
            }
            EntryKind::File => {
                if entry.name.ends_with(CLOUD_PLACEHOLDER_SUFFIX) {
                    *has_undownloaded = true;
                    continue;
                }
                if !is_note_file(&entry.name) {
                    continue;
                }
                let id = match index.find(&path) {
                    Some(id) => id,
                    None => index.assign(&path)?,
                };
                entries.push(LibraryEntry::Note {
                    id,
                    title: display_title(&entry.name),
                    path,
                });
            }
        }
    }

    Ok(entries)
}

/// File name without extension, percent-escapes undone
fn display_title(file_name: &str) -> String {
    let stem = file_name.strip_suffix(NOTE_EXTENSION).unwrap_or(file_name);
    urlencoding::decode(stem)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| stem.to_string())
}
