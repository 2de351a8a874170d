//! SQLite schema and access layer for the local embedding store.

pub mod db;
pub mod migrations;

pub use db::{ChipRecord, Database};
