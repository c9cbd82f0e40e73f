//! Bulk filter engine: pure note selection plus uniform bulk mutations.

pub mod filter;
pub mod operations;

pub use filter::{filter_notes, NoteFilter};
pub use operations::{
    execute_bulk_operation, plan_change, preview, BulkOperation, BulkOutcome, BulkPreview,
    NoteChange,
};
