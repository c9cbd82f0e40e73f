pub mod bulk;
pub mod config;
pub mod db;
pub mod error;
pub mod indexing;
pub mod models;
pub mod offline;
pub mod plan;
pub mod turns;
