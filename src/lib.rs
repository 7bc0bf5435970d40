pub mod cli;
pub mod config;
pub mod labels;
pub mod loki;
pub mod pipeline;
pub mod syslog;
