//! # sixnf-temporal
//!
//! Rewrites SQL against temporal tables into operations over append-only
//! sixth-normal-form fact logs on SQLite.
//!
//! `TemporalEngine` classifies each statement; temporal DDL is normalized
//! into root and shadow logs, writes go through the write pipeline, and
//! reads with `FOR SYSTEM_TIME` or period predicates are rewritten by the
//! translator. Anything else passes through unchanged.

pub mod algebra;
pub mod catalog;
pub mod classifier;
pub mod clock;
pub mod engine;
pub mod normalizer;
pub mod parser;
pub mod pipeline;
pub mod translator;
pub mod views;

pub use engine::TemporalEngine;
