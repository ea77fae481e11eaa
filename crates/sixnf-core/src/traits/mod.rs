mod catalog_store;
mod sql_engine;
mod temporal_engine;

pub use catalog_store::ICatalogStore;
pub use sql_engine::{ColumnInfo, ISqlEngine};
pub use temporal_engine::ITemporalEngine;
