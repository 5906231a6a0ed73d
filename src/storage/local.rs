// Local filesystem adapter - std::fs rooted at the selected folder

use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

use super::{DirEntry, EntryKind, Metadata, StatResult, StorageAdapter};
use crate::errors::{NoteError, NoteResult};

const TEMP_SUFFIX: &str = ".tmp";

#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Open a storage root, creating the directory if needed
    pub fn new(root: impl Into<PathBuf>) -> NoteResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        tracing::debug!("[LocalStorage::new] root: {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a root-relative path onto the filesystem, refusing anything that
    /// could escape the root.
    fn resolve(&self, path: &str) -> NoteResult<PathBuf> {
        let relative = Path::new(path);
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => return Err(NoteError::InvalidPath(path.to_string())),
            }
        }
        Ok(self.root.join(relative))
    }
}

fn kind_of(file_type: fs::FileType) -> EntryKind {
    if file_type.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    }
}

impl StorageAdapter for LocalStorage {
    /// Writes a sibling temp file, then renames it over `path`. Readers see
    /// either the old content or the new, never a partial file.
    fn write_file(&self, path: &str, data: &str) -> NoteResult<()> {
        let target = self.resolve(path)?;
        let dir = target.parent().unwrap_or(&self.root);
        let mut temp = tempfile::Builder::new()
            .prefix(".")
            .suffix(TEMP_SUFFIX)
            .tempfile_in(dir)?;
        temp.write_all(data.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    }

    fn read_file(&self, path: &str) -> NoteResult<String> {
        Ok(fs::read_to_string(self.resolve(path)?)?)
    }

    fn rename(&self, from: &str, to: &str) -> NoteResult<()> {
        fs::rename(self.resolve(from)?, self.resolve(to)?)?;
        Ok(())
    }

    fn mkdir(&self, path: &str, recursive: bool) -> NoteResult<()> {
        let target = self.resolve(path)?;
        let result = if recursive {
            fs::create_dir_all(&target)
        } else {
            fs::create_dir(&target)
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && target.is_dir() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn stat(&self, path: &str) -> NoteResult<StatResult> {
        match fs::metadata(self.resolve(path)?) {
            Ok(meta) => {
                let mtime = meta
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .and_then(|d| i64::try_from(d.as_millis()).ok());
                Ok(StatResult::Found(Metadata {
                    kind: kind_of(meta.file_type()),
                    size: meta.len(),
                    mtime,
                }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StatResult::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    fn delete_file(&self, path: &str) -> NoteResult<()> {
        fs::remove_file(self.resolve(path)?)?;
        Ok(())
    }

    fn read_dir(&self, path: &str) -> NoteResult<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(self.resolve(path)?)? {
            let entry = entry?;
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().to_string(),
                kind: kind_of(entry.file_type()?),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}
