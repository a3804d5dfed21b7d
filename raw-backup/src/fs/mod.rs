//! Filesystem helpers: target validation, traversal, metadata and copies.

pub mod copy;
pub mod metadata;
pub mod target;
pub mod walker;

pub use copy::{copy_file, copy_tree, CopyStats};
pub use target::ensure_writable;
