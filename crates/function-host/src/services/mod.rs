//! Tool implementations exposed over `/api/tools`.
//!
//! # Components
//!
//! - `tools` - tool registry and dispatch
//! - `clock` - `get_current_time`
//! - `weather` - `get_weather_info` (mock data)
//! - `snippets` - `SnippetStore` trait and in-memory store

pub mod clock;
pub mod snippets;
pub mod tools;
pub mod weather;

pub use snippets::{InMemorySnippetStore, SnippetStore};
pub use tools::Tool;
