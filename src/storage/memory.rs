// In-memory adapter with call counters and fault injection
// Behaves like a strict filesystem: parents must exist, directories move as a whole

use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::{DirEntry, EntryKind, Metadata, StatResult, StorageAdapter, parent_dir};
use crate::errors::{NoteError, NoteResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Write,
    Read,
    Rename,
    Mkdir,
    Stat,
    Delete,
    ReadDir,
}

#[derive(Debug, Clone)]
struct Fault {
    op: Op,
    /// Matches when the (source) path contains this text
    pattern: String,
    /// `None` fails forever
    remaining: Option<usize>,
}

#[derive(Debug, Default)]
struct Inner {
    files: BTreeMap<String, String>,
    dirs: BTreeSet<String>,
    faults: Vec<Fault>,
    calls: HashMap<Op, usize>,
}

impl Inner {
    fn dir_exists(&self, path: &str) -> bool {
        path.is_empty() || self.dirs.contains(path)
    }

    fn check(&mut self, op: Op, path: &str) -> NoteResult<()> {
        *self.calls.entry(op).or_insert(0) += 1;
        let hit = self
            .faults
            .iter_mut()
            .position(|f| f.op == op && path.contains(&f.pattern) && f.remaining != Some(0));
        if let Some(index) = hit {
            if let Some(left) = self.faults[index].remaining.as_mut() {
                *left -= 1;
            }
            return Err(NoteError::Io(format!("injected {op:?} failure on {path}")));
        }
        Ok(())
    }

    fn require_parent(&self, path: &str) -> NoteResult<()> {
        if self.dir_exists(parent_dir(path)) {
            Ok(())
        } else {
            Err(NoteError::NotFound(format!("parent directory of {path}")))
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: Mutex<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every `op` whose path contains `pattern`
    pub fn fail_on(&self, op: Op, pattern: &str) {
        self.inner.lock().faults.push(Fault {
            op,
            pattern: pattern.to_string(),
            remaining: None,
        });
    }

    /// Fail the next `op` whose path contains `pattern`
    pub fn fail_once(&self, op: Op, pattern: &str) {
        self.inner.lock().faults.push(Fault {
            op,
            pattern: pattern.to_string(),
            remaining: Some(1),
        });
    }

    pub fn clear_faults(&self) {
        self.inner.lock().faults.clear();
    }

    pub fn calls(&self, op: Op) -> usize {
        self.inner.lock().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.inner.lock().files.get(path).cloned()
    }

    pub fn files(&self) -> Vec<String> {
        self.inner.lock().files.keys().cloned().collect()
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.inner.lock().dirs.contains(path)
    }
}

impl StorageAdapter for MemoryStorage {
    fn write_file(&self, path: &str, data: &str) -> NoteResult<()> {
        let mut inner = self.inner.lock();
        inner.check(Op::Write, path)?;
        inner.require_parent(path)?;
        if inner.dirs.contains(path) {
            return Err(NoteError::Io(format!("{path} is a directory")));
        }
        inner.files.insert(path.to_string(), data.to_string());
        Ok(())
    }

    fn read_file(&self, path: &str) -> NoteResult<String> {
        let mut inner = self.inner.lock();
        inner.check(Op::Read, path)?;
        inner
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| NoteError::NotFound(path.to_string()))
    }

    fn rename(&self, from: &str, to: &str) -> NoteResult<()> {
        let mut inner = self.inner.lock();
        inner.check(Op::Rename, from)?;
        inner.require_parent(to)?;

        if let Some(data) = inner.files.remove(from) {
            inner.files.insert(to.to_string(), data);
            return Ok(());
        }
        if !inner.dirs.contains(from) {
            return Err(NoteError::NotFound(from.to_string()));
        }
        if inner.dirs.contains(to) || inner.files.contains_key(to) {
            return Err(NoteError::Io(format!("{to} already exists")));
        }

        let prefix = format!("{from}/");
        let moved_dirs: Vec<String> = inner
            .dirs
            .iter()
            .filter(|d| d.as_str() == from || d.starts_with(&prefix))
            .cloned()
            .collect();
        for dir in moved_dirs {
            inner.dirs.remove(&dir);
            inner.dirs.insert(format!("{to}{}", &dir[from.len()..]));
        }
        let moved_files: Vec<String> = inner
            .files
            .keys()
            .filter(|f| f.starts_with(&prefix))
            .cloned()
            .collect();
        for file in moved_files {
            if let Some(data) = inner.files.remove(&file) {
                inner.files.insert(format!("{to}{}", &file[from.len()..]), data);
            }
        }
        Ok(())
    }

    fn mkdir(&self, path: &str, recursive: bool) -> NoteResult<()> {
        let mut inner = self.inner.lock();
        inner.check(Op::Mkdir, path)?;
        if inner.files.contains_key(path) {
            return Err(NoteError::Io(format!("{path} is a file")));
        }
        if recursive {
            let mut current = String::new();
            for part in path.split('/').filter(|p| !p.is_empty()) {
                if !current.is_empty() {
                    current.push('/');
                }
                current.push_str(part);
                inner.dirs.insert(current.clone());
            }
            return Ok(());
        }
        inner.require_parent(path)?;
        inner.dirs.insert(path.to_string());
        Ok(())
    }

    fn stat(&self, path: &str) -> NoteResult<StatResult> {
        let mut inner = self.inner.lock();
        inner.check(Op::Stat, path)?;
        if let Some(data) = inner.files.get(path) {
            return Ok(StatResult::Found(Metadata {
                kind: EntryKind::File,
                size: data.len() as u64,
                mtime: None,
            }));
        }
        if inner.dirs.contains(path) {
            return Ok(StatResult::Found(Metadata {
                kind: EntryKind::Directory,
                size: 0,
                mtime: None,
            }));
        }
        Ok(StatResult::NotFound)
    }

    fn delete_file(&self, path: &str) -> NoteResult<()> {
        let mut inner = self.inner.lock();
        inner.check(Op::Delete, path)?;
        inner
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| NoteError::NotFound(path.to_string()))
    }

    fn read_dir(&self, path: &str) -> NoteResult<Vec<DirEntry>> {
        let mut inner = self.inner.lock();
        inner.check(Op::ReadDir, path)?;
        if !inner.dir_exists(path) {
            return Err(NoteError::NotFound(path.to_string()));
        }
        let mut entries: Vec<DirEntry> = inner
            .dirs
            .iter()
            .filter(|d| parent_dir(d) == path)
            .map(|d| DirEntry {
                name: super::file_name(d).to_string(),
                kind: EntryKind::Directory,
            })
            .chain(inner.files.keys().filter(|f| parent_dir(f) == path).map(|f| DirEntry {
                name: super::file_name(f).to_string(),
                kind: EntryKind::File,
            }))
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}
