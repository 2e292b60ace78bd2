//! Structural checks for a tree that did not come from `divide`.

use crate::error::{Result, SubnetError};
use crate::models::{address_count, network_address, Subnet, MAX_LENGTH};

/// Verify every node is aligned and every divided node holds its two exact halves.
///
/// Parent links are not inspected, they are rebuilt after loading.
pub fn validate_tree(root: &Subnet) -> Result<()> {
    for (_, node) in root.walk() {
        check_node(node)?;
    }
    Ok(())
}

fn check_node(node: &Subnet) -> Result<()> {
    if node.mask_len() > MAX_LENGTH {
        return Err(malformed(node, "mask length above 32"));
    }
    if network_address(node.address(), node.mask_len())? != node.address() {
        return Err(malformed(node, "address has host bits set"));
    }

    let (Some(left), Some(right)) = (node.left(), node.right()) else {
        return Ok(());
    };
    if node.mask_len() == MAX_LENGTH {
        return Err(malformed(node, "a /32 cannot have children"));
    }

    let child_len = node.mask_len() + 1;
    if left.mask_len() != child_len || right.mask_len() != child_len {
        return Err(malformed(node, "children must be exactly one bit longer"));
    }
    if left.address() != node.address() {
        return Err(malformed(node, "left half must start at the block address"));
    }
    let expected_right = u64::from(node.address()) + address_count(child_len)?;
    if u64::from(right.address()) != expected_right {
        return Err(malformed(node, "right half must start at the block midpoint"));
    }
    Ok(())
}

fn malformed(node: &Subnet, what: &str) -> SubnetError {
    SubnetError::Malformed(format!(
        "{}/{}: {what}",
        std::net::Ipv4Addr::from(node.address()),
        node.mask_len()
    ))
}
