pub mod config;
pub mod error;
pub mod db;
pub mod relations;
pub mod cache;
pub mod graph;

pub use config::Config;
pub use error::{DigfyError, Result};
pub use graph::{CrawlLimits, GraphBuilder, GraphDocument};
