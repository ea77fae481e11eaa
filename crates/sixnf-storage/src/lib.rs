//! # sixnf-storage
//!
//! SQLite persistence for the sixnf rewriting engine.
//! `SqliteEngine` implements `ISqlEngine` (statement execution, transaction
//! boundaries, introspection) and `ICatalogStore` (reserved catalog tables)
//! over a single connection.

pub mod engine;
pub mod migrations;
pub mod pragmas;
pub mod queries;

pub use engine::SqliteEngine;
