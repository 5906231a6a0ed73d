// Path index - stable numeric ids for notes whose file names keep changing
// Append-only: a slot is never removed, so an id never changes meaning

use parking_lot::RwLock;

use crate::errors::{NoteError, NoteResult};
use crate::models::NoteId;
use crate::storage::NEW_FILE_SENTINEL;

/// Result of resolving an id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Id 0: the note has no file yet
    New,
    Path(String),
}

impl Resolved {
    pub fn as_str(&self) -> &str {
        match self {
            Self::New => NEW_FILE_SENTINEL,
            Self::Path(path) => path,
        }
    }

    pub fn into_path(self) -> Option<String> {
        match self {
            Self::New => None,
            Self::Path(path) => Some(path),
        }
    }
}

/// Slot position -> externally visible id
pub fn encode_id(slot: usize) -> Option<NoteId> {
    slot.checked_add(1)
        .and_then(|raw| u32::try_from(raw).ok())
        .map(NoteId)
}

/// Externally visible id -> slot position (`None` for the new-note id)
pub fn decode_id(id: NoteId) -> Option<usize> {
    id.0.checked_sub(1).map(|slot| slot as usize)
}

#[derive(Debug, Default)]
pub struct PathIndex {
    slots: RwLock<Vec<String>>,
}

impl PathIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&self, id: NoteId) -> NoteResult<Resolved> {
        let Some(slot) = decode_id(id) else {
            return Ok(Resolved::New);
        };
        self.slots
            .read()
            .get(slot)
            .cloned()
            .map(Resolved::Path)
            .ok_or(NoteError::OutOfRange(id.0))
    }

    pub fn assign(&self, path: &str) -> NoteResult<NoteId> {
        let mut slots = self.slots.write();
        let id = encode_id(slots.len()).ok_or(NoteError::OutOfRange(u32::MAX))?;
        slots.push(path.to_string());
        tracing::debug!("[PathIndex::assign] {} -> {}", id, path);
        Ok(id)
    }

    pub fn update(&self, id: NoteId, path: &str) -> NoteResult<()> {
        let mut slots = self.slots.write();
        let slot = decode_id(id)
            .and_then(|slot| slots.get_mut(slot))
            .ok_or(NoteError::OutOfRange(id.0))?;
        tracing::debug!("[PathIndex::update] {}: {} -> {}", id, slot, path);
        *slot = path.to_string();
        Ok(())
    }

    /// Reverse lookup of the id currently pointing at `path`
    pub fn find(&self, path: &str) -> Option<NoteId> {
        self.slots
            .read()
            .iter()
            .position(|p| p == path)
            .and_then(encode_id)
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_always_resolves_to_sentinel() {
        let index = PathIndex::new();
        assert_eq!(index.resolve(NoteId::NEW).unwrap(), Resolved::New);
        index.assign("a.html").unwrap();
        index.assign("b.html").unwrap();
        let resolved = index.resolve(NoteId::NEW).unwrap();
        assert_eq!(resolved, Resolved::New);
        assert_eq!(resolved.as_str(), "new.html");
    }

    #[test]
    fn update_changes_only_its_own_slot() {
        let index = PathIndex::new();
        let a = index.assign("p1.html").unwrap();
        let b = index.assign("other.html").unwrap();
        assert_ne!(a, b);

        index.update(a, "p2.html").unwrap();

        assert_eq!(index.resolve(a).unwrap(), Resolved::Path("p2.html".to_string()));
        assert_eq!(index.resolve(b).unwrap(), Resolved::Path("other.html".to_string()));
        assert_eq!(index.find("p1.html"), None);
        assert_eq!(index.find("p2.html"), Some(a));
    }

    #[test]
    fn unknown_ids_are_out_of_range() {
        let index = PathIndex::new();
        assert!(matches!(index.resolve(NoteId(1)), Err(NoteError::OutOfRange(1))));
        assert!(matches!(index.update(NoteId(7), "x.html"), Err(NoteError::OutOfRange(7))));
        assert!(matches!(index.update(NoteId::NEW, "x.html"), Err(NoteError::OutOfRange(0))));
    }

    #[test]
    fn ids_are_stable_across_calls() {
        let index = PathIndex::new();
        let first = index.assign("a.html").unwrap();
        let second = index.assign("b.html").unwrap();
        assert_eq!(decode_id(first), Some(0));
        assert_eq!(decode_id(second), Some(1));
        assert_eq!(encode_id(1), Some(second));
        assert_eq!(index.len(), 2);
    }
}
