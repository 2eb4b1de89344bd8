pub mod api;
pub mod audio;
pub mod config;
pub mod directory;
pub mod error;
pub mod output;
pub mod server;
pub mod speech;
pub mod tools;

// Public library API - the server entry point plus the pieces needed to
// embed the tools somewhere other than stdio.
pub use api::DaisysClient;
pub use config::DaisysConfig;
pub use error::SpeakError;
pub use server::{serve_stdio, DaisysServer};
pub use tools::{ToolExecutor, ToolRegistry};
