pub mod cache;
pub mod config;
pub mod equivalence;
pub mod http;
pub mod sources;
pub mod sqlite;
