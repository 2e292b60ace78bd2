//! Output formatting for the partition tree.
//!
//! - [`table`] - one row per leaf
//! - [`tree`] - every block, indented by depth
//! - [`terminal`] - column helpers

mod table;
mod terminal;
mod tree;

pub use table::render_table;
pub use terminal::{format_count, format_field};
pub use tree::render_tree;
