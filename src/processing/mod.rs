//! Tree processing that sits on top of the models:
//! - [`rebuild`] - parent link reconstruction after loading
//! - [`validate`] - structural checks for loaded trees
//! - [`rows`] - per-leaf table rows

mod rebuild;
mod rows;
mod validate;

pub use rebuild::rebuild_parents;
pub use rows::{leaf_rows, LeafRow};
pub use validate::validate_tree;
