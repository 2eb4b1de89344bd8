pub mod models;
pub mod registry;
pub mod speak;
pub mod r#trait;
pub mod voices;

pub use registry::ToolRegistry;
pub use r#trait::{SharedTool, ToolContext, ToolExecutor};
