pub mod config;
pub mod data;
pub mod monitoring;
pub mod output;
pub mod pipeline;
pub mod server;
pub mod stats;
pub mod watcher;
