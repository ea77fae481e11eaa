//! # sixnf-core
//!
//! Foundation crate for the sixnf temporal rewriting engine.
//! Defines the data model (periods, logical tables, statement intents,
//! shadow facts, physical plans), the storage and engine traits, errors,
//! configuration, and tracing setup.

pub mod config;
pub mod errors;
pub mod models;
pub mod observability;
pub mod traits;

pub use config::SixnfConfig;
pub use errors::{SixnfError, SixnfResult};
