pub mod config;
pub mod constants;
pub mod error;
pub mod session;
pub mod storage;
