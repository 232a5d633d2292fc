pub mod archiver;
pub mod gc;

pub use archiver::{list_entries, ArchiveManifest, Archiver};
pub use gc::purge_stale;
