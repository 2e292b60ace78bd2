//! Indented tree view of every block, divided or not.

use super::terminal::{format_count, format_field};
use crate::error::Result;
use crate::models::Subnet;
use crate::processing::LeafRow;
use colored::Colorize;
use itertools::Itertools;

const BOTTOM_LEFT: &str = " └──";

pub fn render_tree(root: &Subnet) -> Result<String> {
    let mut out = String::new();
    for (depth, node) in root.walk() {
        if depth > 0 {
            out.push_str(&" ".repeat((depth - 1) * 2));
            out.push_str(&format!("{} ", BOTTOM_LEFT.dimmed()));
        }
        out.push_str(&format_field(node.cidr(), 18usize.saturating_sub(depth * 2)));
        out.push_str(&describe(node)?);
        if !node.labels.is_empty() {
            out.push_str(&format!(" {}", node.labels.iter().join(", ").cyan()));
        }
        out.push('\n');
    }
    Ok(out)
}

fn describe(node: &Subnet) -> Result<String> {
    let row = LeafRow::from_subnet(node)?;
    let state = if node.is_divided() { "divided" } else { "leaf" };
    Ok(format!(
        " | {state:<7} | Netmask {} | Usable {} - {} | Addresses {} |",
        row.netmask,
        row.first_usable,
        row.last_usable,
        format_count(row.address_count)
    ))
}
