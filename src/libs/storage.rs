pub mod database;
pub mod memory;
pub mod records;
pub mod storage_traits;
