pub mod sqlite;
pub mod store;
pub mod tables;
pub mod workspace_cache;

pub use sqlite::Database;
pub use store::{NoteWhere, SectionWhere, WorkspaceStore};
pub use workspace_cache::{WorkspaceCache, WorkspaceSnapshot};
