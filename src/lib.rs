pub mod aggregate;
pub mod cache;
pub mod cli;
pub mod config;
pub mod cutoff;
pub mod document;
pub mod error;
pub mod merge;
pub mod model;
pub mod output;
pub mod period;
pub mod pipeline;
pub mod render;
pub mod retry;
pub mod rewrite;
pub mod source;
pub mod style;
