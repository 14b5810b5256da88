pub mod config;
pub mod merge;
pub mod pipeline;
pub mod process;
pub mod report;
pub mod store;
