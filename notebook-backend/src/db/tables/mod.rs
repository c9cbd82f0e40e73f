pub mod kv_store;
pub mod notes;
pub mod pages;
pub mod sections;
