//! Rendered image cache
//!
//! Images are stored as `<key>.png` in a single directory, where the key is
//! a content hash of the formula and the render settings. The same formula
//! under the same settings always maps to the same file.
//!
//! # Entry lifecycle
//!
//! | File | Created | Removed |
//! |------|---------|---------|
//! | `<key>.tex/.log/.aux/.dvi/.pdf` | during a miss-fill | next populate cycle |
//! | `<key>.part` | by the rasterizer | renamed to `<key>.png` on success, else removed |
//! | `<key>.png` | by that rename | evicted oldest-by-mtime past `max_png` |

pub mod store;

pub use store::{
    CacheEntry, CacheStore, PopulateReport, IMAGE_EXT, INTERMEDIATE_EXTS, PARTIAL_EXT,
};
