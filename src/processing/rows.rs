//! Per-leaf rows for the subnet table.

use crate::error::Result;
use crate::models::{
    address_count, last_address, netmask, network_address, usable_range, Ipv4, Subnet,
};
use std::net::Ipv4Addr;

/// One line of the current partition.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafRow {
    /// The leaf block.
    pub subnet: Ipv4,
    /// The block it was divided from, `None` for an undivided root.
    pub parent: Option<Ipv4>,
    pub netmask: Ipv4Addr,
    /// First address of the block (network address).
    pub first_address: Ipv4Addr,
    /// Last address of the block (broadcast address).
    pub last_address: Ipv4Addr,
    pub first_usable: Ipv4Addr,
    pub last_usable: Ipv4Addr,
    pub address_count: u64,
    pub labels: Vec<String>,
}

impl LeafRow {
    /// Compute the row for a single node.
    pub fn from_subnet(node: &Subnet) -> Result<LeafRow> {
        let network = network_address(node.address(), node.mask_len())?;
        let last = last_address(network, node.mask_len())?;
        let (first_usable, last_usable) = usable_range(network, node.mask_len())?;
        Ok(LeafRow {
            subnet: node.cidr(),
            parent: node.parent(),
            netmask: Ipv4Addr::from(netmask(node.mask_len())?),
            first_address: Ipv4Addr::from(network),
            last_address: Ipv4Addr::from(last),
            first_usable: Ipv4Addr::from(first_usable),
            last_usable: Ipv4Addr::from(last_usable),
            address_count: address_count(node.mask_len())?,
            labels: node.labels.clone(),
        })
    }
}

/// Rows for every leaf of `root`, in address order.
pub fn leaf_rows(root: &Subnet) -> Result<Vec<LeafRow>> {
    root.leaves().map(LeafRow::from_subnet).collect()
}
