pub mod abp;
pub mod cache;
pub mod config;
pub mod error;
pub mod mcp;
pub mod tools;
pub mod utils;

pub use config::Config;
pub use error::{McpError, McpResult};
