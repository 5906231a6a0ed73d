// Rename protocol - primary file and revision namespace move together or not at all

use crate::commands::common::now_millis;
use crate::errors::{NoteError, NoteResult};
use crate::storage::{NOTE_EXTENSION, StorageAdapter, revisions_dir, with_timestamp};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    Moved(String),
    /// Revision namespace could not follow; primary file is back at its old name
    RolledBack,
}

/// `current` is `wanted` with a `.<millis>` suffix from an earlier collision
fn is_disambiguated(current: &str, wanted: &str) -> bool {
    let (Some(current), Some(wanted)) = (
        current.strip_suffix(NOTE_EXTENSION),
        wanted.strip_suffix(NOTE_EXTENSION),
    ) else {
        return false;
    };
    current
        .strip_prefix(wanted)
        .and_then(|rest| rest.strip_prefix('.'))
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Where `current` should move to reach `wanted` without overwriting
/// anything. `None` when no move is needed.
pub fn pick_target(storage: &dyn StorageAdapter, current: &str, wanted: &str) -> NoteResult<Option<String>> {
    if current == wanted {
        return Ok(None);
    }
    // Revisions left behind by a trashed note still own the name
    let taken = storage.stat(wanted)?.exists() || storage.stat(&revisions_dir(wanted))?.exists();
    if !taken {
        return Ok(Some(wanted.to_string()));
    }
    if is_disambiguated(current, wanted) {
        // Already parked next to the taken name
        return Ok(None);
    }
    let target = with_timestamp(wanted, now_millis());
    tracing::debug!("[rename] {} is taken, using {}", wanted, target);
    Ok(Some(target))
}

/// Move a primary file and its revision namespace.
///
/// The primary file moves first. If the revision namespace then fails to
/// move, the primary file is moved back and `RolledBack` is returned. If
/// moving it back fails as well the note is split across two names and
/// `RollbackFailed` is returned.
pub fn move_with_revisions(storage: &dyn StorageAdapter, from: &str, to: &str) -> NoteResult<RenameOutcome> {
    let revisions_from = revisions_dir(from);
    let revisions_to = revisions_dir(to);
    let has_revisions = storage.stat(&revisions_from)?.exists();

    storage.rename(from, to)?;
    if !has_revisions {
        tracing::info!("[rename] {} -> {} (no revisions)", from, to);
        return Ok(RenameOutcome::Moved(to.to_string()));
    }

    match storage.rename(&revisions_from, &revisions_to) {
        Ok(()) => {
            tracing::info!("[rename] {} -> {}", from, to);
            Ok(RenameOutcome::Moved(to.to_string()))
        }
        Err(err) => {
            tracing::warn!("[rename] moving {} failed ({}), restoring {}", revisions_from, err, from);
            storage.rename(to, from).map_err(|rollback| {
                tracing::error!("[rename] rollback of {} failed: {}", to, rollback);
                NoteError::RollbackFailed {
                    from: to.to_string(),
                    to: from.to_string(),
                    reason: format!("{rollback} (after revisions move failed: {err})"),
                }
            })?;
            Ok(RenameOutcome::RolledBack)
        }
    }
}
