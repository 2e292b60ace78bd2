//! Domain models for the subnet splitter.
//!
//! - [`Ipv4`] and the address math helpers
//! - [`Subnet`] - a node of the address-partition tree

mod ipv4;
mod subnet;

// Re-export public types
pub use ipv4::{
    address_count, format_addr, is_valid_address_string, last_address, mask_len_from_mask,
    netmask, network_address, parse_addr, parse_mask_len, usable_range, Ipv4, MAX_LENGTH,
};
pub use subnet::{Children, Leaves, Subnet};
