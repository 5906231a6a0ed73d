// Save pipeline - commit the primary file, append the revision, then rename
//
// Order matters: the primary file is written before anything else so that
// it always holds the latest content, whatever fails afterwards.

use super::Pipeline;
use super::rename::{RenameOutcome, move_with_revisions, pick_target};
use crate::analyzer::{derive_file_name, derive_title, extract_tags};
use crate::commands::common::now_millis;
use crate::errors::NoteResult;
use crate::models::NoteState;
use crate::storage::{NOTE_EXTENSION, join, parent_dir, revision_path, revisions_dir};

/// What one save cycle did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveOutcome {
    /// Primary file and revision were written
    pub wrote: bool,
    pub renamed_to: Option<String>,
    /// A rename was attempted and undone
    pub rolled_back: bool,
    pub trashed: bool,
}

/// Run one save cycle for an open note.
///
/// Unchanged content writes nothing. `trash` deletes the primary file at the
/// end of the cycle whether or not anything was written.
pub fn save_note(
    ctx: &Pipeline,
    state: &mut NoteState,
    revision_name: &str,
    trash: bool,
) -> NoteResult<SaveOutcome> {
    let mut outcome = SaveOutcome::default();

    // A move made through the store while this note was open wins
    if !state.id.is_new() {
        state.path = ctx.index.resolve(state.id)?.into_path();
    }

    let text = ctx.codec.serialize(&state.blocks);
    if state.text.as_deref() == Some(text.as_str()) {
        tracing::debug!("[save] note {} unchanged", state.id);
    } else {
        commit(ctx, state, revision_name, text, &mut outcome)?;
    }

    if trash {
        if let Some(path) = state.path.as_deref() {
            ctx.storage.delete_file(path)?;
            tracing::info!("[save] trashed {}", path);
            outcome.trashed = true;
        }
    }

    Ok(outcome)
}

fn commit(
    ctx: &Pipeline,
    state: &mut NoteState,
    revision_name: &str,
    text: String,
    outcome: &mut SaveOutcome,
) -> NoteResult<()> {
    let path = state
        .path
        .clone()
        .unwrap_or_else(|| format!("{}{}", now_millis(), NOTE_EXTENSION));

    ctx.storage.write_file(&path, &text)?;
    outcome.wrote = true;
    tracing::debug!("[save] wrote {} ({} bytes)", path, text.len());

    if state.id.is_new() {
        state.id = ctx.index.assign(&path)?;
    }
    state.path = Some(path.clone());

    if let Err(e) = ctx.storage.mkdir(&revisions_dir(&path), false) {
        tracing::debug!("[save] revisions dir for {}: {}", path, e);
    }
    ctx.storage.write_file(&revision_path(&path, revision_name), &text)?;

    let tags = extract_tags(&text);
    let title = derive_title(ctx.codec.as_ref(), &state.blocks, false);
    state.text = Some(text);
    state.mtime = Some(now_millis());
    state.tags = tags;
    state.title = title;

    let Some(stem) = derive_file_name(&state.title, &state.tags) else {
        return Ok(());
    };
    let wanted = join(parent_dir(&path), &format!("{stem}{NOTE_EXTENSION}"));
    let Some(target) = pick_target(ctx.storage.as_ref(), &path, &wanted)? else {
        return Ok(());
    };

    match move_with_revisions(ctx.storage.as_ref(), &path, &target)? {
        RenameOutcome::Moved(new_path) => {
            ctx.index.update(state.id, &new_path)?;
            state.path = Some(new_path.clone());
            outcome.renamed_to = Some(new_path);
        }
        RenameOutcome::RolledBack => {
            outcome.rolled_back = true;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{BlockCodec, HtmlBlockCodec};
    use crate::models::{Block, NoteId};
    use crate::path_index::{PathIndex, Resolved};
    use crate::storage::{MemoryStorage, Op, StorageAdapter};
    use std::sync::Arc;

    const REVISION: &str = "2024-05-01T10_00_00.000Z";

    fn pipeline() -> (Pipeline, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let ctx = Pipeline::new(storage.clone(), Arc::new(PathIndex::new()), Arc::new(HtmlBlockCodec));
        (ctx, storage)
    }

    fn edited(blocks: Vec<Block>) -> NoteState {
        let mut state = NoteState::new(NoteId::NEW, None);
        state.blocks = blocks;
        state
    }

    #[test]
    fn first_save_writes_renames_and_indexes() {
        let (ctx, storage) = pipeline();
        let mut state = edited(vec![Block::paragraph("Hello world <u>#todo</u>")]);

        let outcome = save_note(&ctx, &mut state, REVISION, false).unwrap();

        assert!(outcome.wrote);
        assert_eq!(outcome.renamed_to.as_deref(), Some("Hello world #todo.html"));
        assert_eq!(state.path.as_deref(), Some("Hello world #todo.html"));
        assert!(!state.id.is_new());
        assert_eq!(
            ctx.index.resolve(state.id).unwrap(),
            Resolved::Path("Hello world #todo.html".to_string())
        );
        assert_eq!(state.tags, vec!["#todo"]);
        assert_eq!(state.title, "Hello world");

        let text = HtmlBlockCodec.serialize(&state.blocks);
        assert_eq!(storage.file("Hello world #todo.html"), Some(text.clone()));
        assert_eq!(
            storage.file(&format!("Hello world #todo.html.revisions/{REVISION}.html")),
            Some(text)
        );
    }

    #[test]
    fn unchanged_content_is_a_no_op() {
        let (ctx, storage) = pipeline();
        let mut state = edited(vec![Block::paragraph("Same")]);

        save_note(&ctx, &mut state, REVISION, false).unwrap();
        let writes = storage.calls(Op::Write);
        let outcome = save_note(&ctx, &mut state, REVISION, false).unwrap();

        assert_eq!(outcome, SaveOutcome::default());
        assert_eq!(storage.calls(Op::Write), writes);
        // primary + revision on the first cycle only
        assert_eq!(writes, 2);
    }

    #[test]
    fn untitled_note_keeps_generated_name() {
        let (ctx, storage) = pipeline();
        let mut state = edited(vec![Block::paragraph("<u>#onlytag</u>")]);

        let outcome = save_note(&ctx, &mut state, REVISION, false).unwrap();

        let path = state.path.clone().unwrap();
        assert!(outcome.renamed_to.is_none());
        assert!(path.ends_with(".html"));
        assert!(path.trim_end_matches(".html").bytes().all(|b| b.is_ascii_digit()));
        assert!(storage.file(&path).is_some());
    }

    #[test]
    fn primary_survives_revision_write_failure() {
        let (ctx, storage) = pipeline();
        storage.write_file("note.html", "old").unwrap();
        let id = ctx.index.assign("note.html").unwrap();
        let mut state = NoteState::new(id, Some("note.html".to_string()));
        state.text = Some("old".to_string());
        state.blocks = vec![Block::paragraph("New text")];
        storage.fail_on(Op::Write, ".revisions/");

        assert!(save_note(&ctx, &mut state, REVISION, false).is_err());

        let expected = HtmlBlockCodec.serialize(&state.blocks);
        assert_eq!(storage.file("note.html"), Some(expected));
        assert_eq!(state.path.as_deref(), Some("note.html"));
        // not recorded as written, so the next cycle tries again
        assert_eq!(state.text.as_deref(), Some("old"));
    }

    #[test]
    fn primary_write_failure_aborts_cycle() {
        let (ctx, storage) = pipeline();
        storage.fail_on(Op::Write, "");
        let mut state = edited(vec![Block::paragraph("Lost?")]);

        assert!(save_note(&ctx, &mut state, REVISION, false).is_err());
        assert!(state.path.is_none());
        assert!(state.id.is_new());
        assert_eq!(storage.calls(Op::Mkdir), 0);
        assert_eq!(storage.calls(Op::Rename), 0);
    }

    #[test]
    fn failed_revision_rename_keeps_old_path() {
        let (ctx, storage) = pipeline();
        storage.write_file("123.html", "").unwrap();
        let id = ctx.index.assign("123.html").unwrap();
        let mut state = NoteState::new(id, Some("123.html".to_string()));
        state.blocks = vec![Block::paragraph("Renamed title")];
        storage.fail_on(Op::Rename, ".revisions");

        let outcome = save_note(&ctx, &mut state, REVISION, false).unwrap();

        assert!(outcome.rolled_back);
        assert!(outcome.renamed_to.is_none());
        assert_eq!(state.path.as_deref(), Some("123.html"));
        assert_eq!(ctx.index.resolve(id).unwrap(), Resolved::Path("123.html".to_string()));
        assert!(storage.file("123.html").is_some());
        assert!(storage.file("Renamed title.html").is_none());
    }

    #[test]
    fn collision_does_not_overwrite_existing_file() {
        let (ctx, storage) = pipeline();
        storage.write_file("Shopping.html", "someone else's list").unwrap();
        let mut state = edited(vec![Block::paragraph("Shopping")]);

        let outcome = save_note(&ctx, &mut state, REVISION, false).unwrap();

        let target = outcome.renamed_to.unwrap();
        assert_ne!(target, "Shopping.html");
        assert!(target.starts_with("Shopping.") && target.ends_with(".html"));
        assert_eq!(storage.file("Shopping.html").as_deref(), Some("someone else's list"));
        assert!(storage.file(&format!("{target}.revisions/{REVISION}.html")).is_some());
    }

    #[test]
    fn rename_stays_in_the_same_folder() {
        let (ctx, storage) = pipeline();
        storage.mkdir("work", false).unwrap();
        storage.write_file("work/1.html", "").unwrap();
        let id = ctx.index.assign("work/1.html").unwrap();
        let mut state = NoteState::new(id, Some("work/1.html".to_string()));
        state.blocks = vec![Block::paragraph("a/b: c?")];

        let outcome = save_note(&ctx, &mut state, REVISION, false).unwrap();

        assert_eq!(outcome.renamed_to.as_deref(), Some("work/a%2Fb%3A c%3F.html"));
        assert!(storage.file("work/a%2Fb%3A c%3F.html").is_some());
    }

    #[test]
    fn trash_runs_even_without_changes() {
        let (ctx, storage) = pipeline();
        let mut state = edited(vec![Block::paragraph("Bye")]);
        save_note(&ctx, &mut state, REVISION, false).unwrap();

        let outcome = save_note(&ctx, &mut state, REVISION, true).unwrap();

        assert!(!outcome.wrote);
        assert!(outcome.trashed);
        assert!(storage.file("Bye.html").is_none());
        // revisions and the index slot stay behind
        assert!(storage.file(&format!("Bye.html.revisions/{REVISION}.html")).is_some());
        assert_eq!(ctx.index.resolve(state.id).unwrap(), Resolved::Path("Bye.html".to_string()));
    }

    #[test]
    fn new_note_does_not_collide_with_trashed_history() {
        let (ctx, storage) = pipeline();
        let mut first = edited(vec![Block::paragraph("Hello")]);
        save_note(&ctx, &mut first, REVISION, false).unwrap();
        save_note(&ctx, &mut first, REVISION, true).unwrap();

        let mut second = edited(vec![Block::paragraph("Hello")]);
        let outcome = save_note(&ctx, &mut second, "2024-05-02T10_00_00.000Z", false).unwrap();

        assert!(!outcome.rolled_back);
        let target = outcome.renamed_to.unwrap();
        assert!(target.starts_with("Hello.") && target != "Hello.html");
        assert!(storage.file(&format!("{target}.revisions/2024-05-02T10_00_00.000Z.html")).is_some());
        // the trashed note's history is untouched
        assert_eq!(storage.read_dir("Hello.html.revisions").unwrap().len(), 1);
        assert!(storage.file(&format!("Hello.html.revisions/{REVISION}.html")).is_some());
    }

    #[test]
    fn same_session_overwrites_one_revision() {
        let (ctx, storage) = pipeline();
        let mut state = edited(vec![Block::paragraph("Draft")]);
        save_note(&ctx, &mut state, REVISION, false).unwrap();
        state.blocks = vec![Block::paragraph("Draft"), Block::paragraph("more")];
        save_note(&ctx, &mut state, REVISION, false).unwrap();

        let revisions = storage.read_dir("Draft.html.revisions").unwrap();
        assert_eq!(revisions.len(), 1);
        assert_eq!(
            storage.file(&format!("Draft.html.revisions/{REVISION}.html")),
            state.text.clone()
        );
    }
}
