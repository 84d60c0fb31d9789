pub mod config;
pub mod error;
pub mod gemini;
pub mod retry;
pub mod schema;
pub mod server;
pub mod types;
