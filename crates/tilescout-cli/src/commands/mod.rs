pub mod config;
pub mod import;
pub mod query;
pub mod serve;
pub mod status;
