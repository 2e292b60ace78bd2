//! Terminal output utilities.
//!
//! Column padding and number formatting shared by the table and tree views.

use std::fmt::Display;

/// Left-align a value in a column of at least `width` characters.
///
/// Values longer than the column are kept whole.
pub fn format_field<T: Display>(value: T, width: usize) -> String {
    // to_string first, Display impls built on write! ignore the width
    let value_str = value.to_string();
    format!("{value_str:<width$}")
}

/// Group the digits of an address count in threes, `65536` -> `65,536`.
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
