// Models module for notekeeper
// Plain data types shared by the pipelines, the store and the library scan

pub mod block;
pub mod config;
pub mod library;
pub mod note;

pub use block::Block;
pub use config::Settings;
pub use library::{Library, LibraryEntry};
pub use note::{Note, NoteId, NoteState};
