pub mod aggregate;
pub mod categories;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod schedule;
pub mod storage;
pub mod types;
