// Save/load pipelines and the debounce timer that drives saves

pub mod debounce;
pub mod load;
pub mod rename;
pub mod save;

use std::sync::Arc;

use crate::codec::BlockCodec;
use crate::path_index::PathIndex;
use crate::storage::StorageAdapter;

pub use debounce::Debouncer;
pub use load::{hydrate, load_note};
pub use rename::{RenameOutcome, move_with_revisions, pick_target};
pub use save::{SaveOutcome, save_note};

/// Collaborators every pipeline step needs
#[derive(Clone)]
pub struct Pipeline {
    pub storage: Arc<dyn StorageAdapter>,
    pub index: Arc<PathIndex>,
    pub codec: Arc<dyn BlockCodec>,
}

impl Pipeline {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        index: Arc<PathIndex>,
        codec: Arc<dyn BlockCodec>,
    ) -> Self {
        Self { storage, index, codec }
    }
}
