// Note commands - the document store and the per-note editing session

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::common::new_revision_name;
use super::library::scan_library;
use crate::analyzer::sanitize_file_name;
use crate::codec::BlockCodec;
use crate::errors::{NoteError, NoteResult};
use crate::models::{Block, Library, Note, NoteId, NoteState};
use crate::path_index::PathIndex;
use crate::pipeline::{Debouncer, Pipeline, RenameOutcome, SaveOutcome, load_note, move_with_revisions, pick_target, save_note};
use crate::storage::{
    NOTE_EXTENSION, StorageAdapter, TRASH_DIR, file_name, is_trash_dir, join, revision_path, revisions_dir,
};

/// A background save that did not complete
#[derive(Debug)]
pub struct SaveFailure {
    pub id: NoteId,
    pub path: Option<String>,
    pub error: NoteError,
}

// ============================================
// DOCUMENT STORE
// ============================================

/// Owns the path index and hands out editing sessions
pub struct NoteStore {
    pipeline: Pipeline,
    debounce: Duration,
    failures: mpsc::UnboundedSender<SaveFailure>,
}

impl NoteStore {
    /// The receiver gets every failed background save
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        codec: Arc<dyn BlockCodec>,
        debounce: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<SaveFailure>) {
        let (failures, receiver) = mpsc::unbounded_channel();
        let store = Self {
            pipeline: Pipeline::new(storage, Arc::new(PathIndex::new()), codec),
            debounce,
            failures,
        };
        (store, receiver)
    }

    pub fn index(&self) -> &Arc<PathIndex> {
        &self.pipeline.index
    }

    pub fn storage(&self) -> &Arc<dyn StorageAdapter> {
        &self.pipeline.storage
    }

    /// Load a note into an editing session (id 0 opens a blank note)
    pub fn open(&self, id: NoteId) -> NoteResult<NoteSession> {
        let state = load_note(&self.pipeline, id)?;
        tracing::info!("[open] note {} at {:?}", id, state.path);
        Ok(NoteSession::new(
            self.pipeline.clone(),
            state,
            self.debounce,
            self.failures.clone(),
        ))
    }

    /// Walk the storage root and index every note in it
    pub fn scan_library(&self) -> NoteResult<Library> {
        scan_library(self.pipeline.storage.as_ref(), &self.pipeline.index)
    }

    fn saved_path(&self, id: NoteId) -> NoteResult<String> {
        self.pipeline
            .index
            .resolve(id)?
            .into_path()
            .ok_or_else(|| NoteError::NotFound(format!("note {id} has never been saved")))
    }

    /// Move a note into `dir`, optionally giving it a new file stem.
    ///
    /// The revision namespace moves with it. A `.Trash` target directory is
    /// created on demand; any other target directory must exist.
    pub fn move_note(&self, id: NoteId, dir: &str, new_name: Option<&str>) -> NoteResult<NoteId> {
        let from = self.saved_path(id)?;
        let name = match new_name {
            Some(name) if name.trim().is_empty() => {
                return Err(NoteError::InvalidPath(name.to_string()));
            }
            Some(name) => format!("{}{NOTE_EXTENSION}", sanitize_file_name(name)),
            None => file_name(&from).to_string(),
        };
        let wanted = join(dir, &name);
        let storage = self.pipeline.storage.as_ref();

        if is_trash_dir(dir) {
            if let Err(e) = storage.mkdir(dir, true) {
                tracing::debug!("[move_note] trash dir {}: {}", dir, e);
            }
        }

        let Some(target) = pick_target(storage, &from, &wanted)? else {
            return Ok(id);
        };
        match move_with_revisions(storage, &from, &target)? {
            RenameOutcome::Moved(path) => {
                self.pipeline.index.update(id, &path)?;
                Ok(id)
            }
            RenameOutcome::RolledBack => Err(NoteError::Io(format!(
                "could not move the revisions of {from}; the note was left in place"
            ))),
        }
    }

    pub fn move_to_trash(&self, id: NoteId) -> NoteResult<NoteId> {
        self.move_note(id, TRASH_DIR, None)
    }

    /// Create a folder (and its parents) and give it an id
    pub fn create_folder(&self, path: &str) -> NoteResult<NoteId> {
        self.pipeline.storage.mkdir(path, true)?;
        match self.pipeline.index.find(path) {
            Some(id) => Ok(id),
            None => self.pipeline.index.assign(path),
        }
    }

    /// Revision names of a note, oldest first
    pub fn revisions(&self, id: NoteId) -> NoteResult<Vec<String>> {
        let path = self.saved_path(id)?;
        let entries = match self.pipeline.storage.read_dir(&revisions_dir(&path)) {
            Ok(entries) => entries,
            Err(NoteError::NotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut names: Vec<String> = entries
            .into_iter()
            .filter_map(|e| e.name.strip_suffix(NOTE_EXTENSION).map(str::to_string))
            .collect();
        names.sort();
        Ok(names)
    }

    pub fn read_revision(&self, id: NoteId, revision_name: &str) -> NoteResult<String> {
        let path = self.saved_path(id)?;
        self.pipeline.storage.read_file(&revision_path(&path, revision_name))
    }
}

// ============================================
// EDITING SESSION
// ============================================

#[derive(Debug, Clone, Copy, Default)]
struct SaveRequest {
    trash: bool,
}

/// One note open in the editor.
///
/// Edits are saved after the debounce delay. Dropping the session flushes a
/// pending save. All saves of one session run one at a time, and a running
/// save never holds the note while it talks to storage.
pub struct NoteSession {
    shared: Arc<SessionState>,
    revision_name: Arc<str>,
    pipeline: Pipeline,
    debouncer: Debouncer<SaveRequest>,
}

struct SessionState {
    note: Mutex<NoteState>,
    /// Held for a whole save cycle
    cycle: Mutex<()>,
}

fn run_save(
    pipeline: &Pipeline,
    shared: &SessionState,
    revision_name: &str,
    request: SaveRequest,
) -> NoteResult<SaveOutcome> {
    let _cycle = shared.cycle.lock();
    let mut working = shared.note.lock().clone();
    let result = save_note(pipeline, &mut working, revision_name, request.trash);

    // Blocks edited meanwhile stay for the next cycle
    let mut note = shared.note.lock();
    note.id = working.id;
    note.path = working.path;
    note.text = working.text;
    note.tags = working.tags;
    note.title = working.title;
    note.mtime = working.mtime;
    result
}

impl NoteSession {
    fn new(
        pipeline: Pipeline,
        state: NoteState,
        debounce: Duration,
        failures: mpsc::UnboundedSender<SaveFailure>,
    ) -> Self {
        let shared = Arc::new(SessionState {
            note: Mutex::new(state),
            cycle: Mutex::new(()),
        });
        let revision_name: Arc<str> = Arc::from(new_revision_name());

        let debouncer = {
            let pipeline = pipeline.clone();
            let shared = Arc::clone(&shared);
            let revision_name = Arc::clone(&revision_name);
            Debouncer::new(debounce, move |request: SaveRequest| {
                if let Err(error) = run_save(&pipeline, &shared, &revision_name, request) {
                    let (id, path) = {
                        let note = shared.note.lock();
                        (note.id, note.path.clone())
                    };
                    tracing::error!("[save] note {} ({:?}) failed: {}", id, path, error);
                    // Nobody listening is fine: the error is logged
                    let _ = failures.send(SaveFailure { id, path, error });
                }
            })
        };

        Self {
            shared,
            revision_name,
            pipeline,
            debouncer,
        }
    }

    /// Current id; changes from 0 once a new note is first written
    pub fn id(&self) -> NoteId {
        self.shared.note.lock().id
    }

    pub fn revision_name(&self) -> &str {
        &self.revision_name
    }

    pub fn blocks(&self) -> Vec<Block> {
        self.shared.note.lock().blocks.clone()
    }

    pub fn snapshot(&self) -> Note {
        self.shared.note.lock().to_note()
    }

    pub fn has_pending_save(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Replace the document and schedule a save
    pub fn edit(&self, blocks: Vec<Block>) {
        self.shared.note.lock().blocks = blocks;
        self.debouncer.schedule(SaveRequest::default());
    }

    /// Run a scheduled save now; failures go to the failure channel
    pub fn flush(&self) -> bool {
        self.debouncer.flush_now()
    }

    /// Save immediately and report the result to the caller
    pub fn save_now(&self) -> NoteResult<SaveOutcome> {
        self.debouncer.cancel();
        run_save(&self.pipeline, &self.shared, &self.revision_name, SaveRequest::default())
    }

    /// Save the latest content, then delete the primary file
    pub fn trash(self) -> NoteResult<SaveOutcome> {
        self.debouncer.cancel();
        run_save(
            &self.pipeline,
            &self.shared,
            &self.revision_name,
            SaveRequest { trash: true },
        )
    }
}
