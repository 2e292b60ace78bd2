//! Leaf table view.

use super::terminal::{format_count, format_field};
use crate::processing::LeafRow;
use colored::Colorize;
use itertools::Itertools;

const WIDTHS: [usize; 6] = [18, 18, 15, 31, 31, 13];

/// Render one line per leaf, with a header.
pub fn render_table(rows: &[LeafRow]) -> String {
    let header = [
        "Subnet",
        "Parent",
        "Netmask",
        "Range of addresses",
        "Usable IPs",
        "Addresses",
    ]
    .iter()
    .zip(WIDTHS)
    .map(|(name, width)| format_field(name, width))
    .join(" ");

    let mut out = format!("{} Labels\n", header.bold());
    for row in rows {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out
}

fn render_row(row: &LeafRow) -> String {
    let parent = row
        .parent
        .map_or_else(|| "-".to_string(), |p| p.to_string());
    let cells = [
        row.subnet.to_string(),
        parent,
        row.netmask.to_string(),
        format!("{} - {}", row.first_address, row.last_address),
        format!("{} - {}", row.first_usable, row.last_usable),
        format_count(row.address_count),
    ];
    let line = cells
        .iter()
        .zip(WIDTHS)
        .map(|(cell, width)| format_field(cell, width))
        .join(" ");
    if row.labels.is_empty() {
        line.trim_end().to_string()
    } else {
        format!("{line} {}", row.labels.iter().join(", ").cyan())
    }
}
