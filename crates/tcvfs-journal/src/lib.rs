//! tcvfs-journal: sync journal holding pin states and item hydration records

pub mod db;

pub use db::{ItemRecord, JournalDb};
