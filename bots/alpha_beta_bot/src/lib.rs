mod cache;
mod config;
mod evaluator;
mod search;
pub use cache::*;
pub use config::*;
pub use evaluator::*;
pub use search::*;
