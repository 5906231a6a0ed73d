// Commands module - document store operations exposed to the shell

pub mod common;
pub mod library;
pub mod note;
