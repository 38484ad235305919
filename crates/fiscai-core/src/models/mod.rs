//! Data models shared across the pipeline.

pub mod canonical;
pub mod config;
pub mod nfe;
