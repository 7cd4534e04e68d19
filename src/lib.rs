//! TracMath - LaTeX formulas for wiki pages
//!
//! Renders LaTeX snippets into PNG images through `latex` and `dvipng`,
//! caches them by content hash, and serves them back over HTTP.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod html;
pub mod markup;
pub mod render;
pub mod server;
pub mod toolchain;

pub use error::{TracMathError, TracMathResult};
pub use render::{RenderedImage, Renderer};
