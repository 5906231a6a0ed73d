// Load pipeline - resolve the id, then hydrate in-memory state from storage

use super::Pipeline;
use crate::analyzer::{derive_title, extract_tags};
use crate::errors::NoteResult;
use crate::models::{Block, NoteId, NoteState};

/// Load the note behind `id` (id 0 gives a blank note)
pub fn load_note(ctx: &Pipeline, id: NoteId) -> NoteResult<NoteState> {
    let path = ctx.index.resolve(id)?.into_path();
    hydrate(ctx, id, path)
}

/// Build in-memory state for a note at `path`.
///
/// A note without a path gets a single empty paragraph. Its serialization
/// becomes the baseline `text`, so opening a blank note writes nothing until
/// the content differs from it.
pub fn hydrate(ctx: &Pipeline, id: NoteId, path: Option<String>) -> NoteResult<NoteState> {
    let Some(path) = path else {
        tracing::debug!("[load] note {} is new", id);
        let mut state = NoteState::new(id, None);
        state.blocks = vec![Block::paragraph("")];
        state.text = Some(ctx.codec.serialize(&state.blocks));
        return Ok(state);
    };

    let text = ctx.storage.read_file(&path)?;
    tracing::debug!("[load] read {} ({} bytes)", path, text.len());

    let blocks = ctx.codec.parse(&text);
    let mut state = NoteState::new(id, Some(path));
    state.tags = extract_tags(&text);
    state.title = derive_title(ctx.codec.as_ref(), &blocks, false);
    state.blocks = blocks;
    state.text = Some(text);
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{BlockCodec, HtmlBlockCodec};
    use crate::errors::NoteError;
    use crate::path_index::PathIndex;
    use crate::pipeline::save::save_note;
    use crate::storage::{MemoryStorage, Op, StorageAdapter};
    use std::sync::Arc;

    fn pipeline() -> (Pipeline, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let ctx = Pipeline::new(storage.clone(), Arc::new(PathIndex::new()), Arc::new(HtmlBlockCodec));
        (ctx, storage)
    }

    #[test]
    fn new_note_starts_with_empty_paragraph() {
        let (ctx, storage) = pipeline();
        let state = load_note(&ctx, NoteId::NEW).unwrap();

        assert_eq!(state.blocks, vec![Block::paragraph("")]);
        assert!(state.path.is_none());
        assert_eq!(storage.calls(Op::Read), 0);

        let mut state = state;
        let outcome = save_note(&ctx, &mut state, "r", false).unwrap();
        assert!(!outcome.wrote);
        assert!(storage.files().is_empty());
    }

    #[test]
    fn existing_note_is_hydrated() {
        let (ctx, storage) = pipeline();
        let blocks = vec![Block::paragraph("Groceries <u>#home</u>"), Block::paragraph("eggs")];
        let text = HtmlBlockCodec.serialize(&blocks);
        storage.write_file("Groceries #home.html", &text).unwrap();
        let id = ctx.index.assign("Groceries #home.html").unwrap();

        let state = load_note(&ctx, id).unwrap();

        assert_eq!(state.blocks, blocks);
        assert_eq!(state.text.as_deref(), Some(text.as_str()));
        assert_eq!(state.tags, vec!["#home"]);
        assert_eq!(state.title, "Groceries");
    }

    #[test]
    fn stale_id_is_out_of_range() {
        let (ctx, _) = pipeline();
        assert!(matches!(load_note(&ctx, NoteId(9)), Err(NoteError::OutOfRange(9))));
    }

    #[test]
    fn loaded_note_saves_nothing_until_edited() {
        let (ctx, storage) = pipeline();
        let text = HtmlBlockCodec.serialize(&[Block::paragraph("Kept")]);
        storage.write_file("Kept.html", &text).unwrap();
        let id = ctx.index.assign("Kept.html").unwrap();
        let writes = storage.calls(Op::Write);

        let mut state = load_note(&ctx, id).unwrap();
        let outcome = save_note(&ctx, &mut state, "r", false).unwrap();

        assert!(!outcome.wrote);
        assert_eq!(storage.calls(Op::Write), writes);
    }
}
