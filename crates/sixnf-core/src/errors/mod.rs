mod sixnf_error;
mod storage_error;
mod temporal_error;

pub use sixnf_error::{SixnfError, SixnfResult};
pub use storage_error::StorageError;
pub use temporal_error::TemporalError;
