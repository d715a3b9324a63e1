//! CLI command implementations.

pub mod item;
pub mod search;

pub use item::ItemCommand;
pub use search::{SearchCommand, SearchOptions};
