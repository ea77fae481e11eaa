pub mod catalog_ops;
pub mod schema_ops;
pub mod statement_ops;
