// notekeeper - one file per note, revision history beside it, file names derived from content

pub mod analyzer;
pub mod codec;
pub mod commands;
pub mod config;
pub mod errors;
pub mod models;
pub mod path_index;
pub mod pipeline;
pub mod storage;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

pub use codec::{BlockCodec, HtmlBlockCodec};
pub use commands::note::{NoteSession, NoteStore, SaveFailure};
pub use errors::{NoteError, NoteResult};
pub use models::{Block, Library, LibraryEntry, Note, NoteId, Settings};
pub use path_index::{PathIndex, Resolved};
pub use pipeline::SaveOutcome;
pub use storage::{LocalStorage, MemoryStorage, StorageAdapter};

// ============================================
// LOGGING
// ============================================

/// Install the global fmt subscriber. `RUST_LOG` wins over `filter`.
/// Returns false when a subscriber was already installed.
pub fn init_logging(filter: &str) -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init()
        .is_ok()
}

// ============================================
// SESSION
// ============================================

/// A store over a local storage root, wired from settings
pub struct Session {
    pub store: NoteStore,
    pub failures: mpsc::UnboundedReceiver<SaveFailure>,
    pub settings: Settings,
    root: PathBuf,
}

impl Session {
    pub fn open(settings: Settings) -> NoteResult<Self> {
        init_logging(&settings.log_filter);

        let root = match &settings.storage_root {
            Some(root) => root.clone(),
            None => config::default_storage_root()
                .ok_or_else(|| NoteError::Config("no storage root available".to_string()))?,
        };
        tracing::info!("[Session::open] storage root {}", root.display());

        let storage = Arc::new(LocalStorage::new(root.clone())?);
        let (store, failures) = NoteStore::new(storage, Arc::new(HtmlBlockCodec), settings.debounce());
        Ok(Self {
            store,
            failures,
            settings,
            root,
        })
    }

    /// Open with the settings in the global config file
    pub fn open_default() -> NoteResult<Self> {
        let path = config::global_config_path()?;
        Self::open(config::load_settings(&path))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
