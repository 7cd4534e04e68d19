//! CLI command implementations

pub mod cache;
pub mod config;
pub mod fetch;
pub mod render;
pub mod serve;
pub mod status;

pub use cache::execute as cache;
pub use config::execute as config;
pub use fetch::execute as fetch;
pub use render::execute as render;
pub use serve::execute as serve;
pub use status::execute as status;
