//! Address-partition tree.
//!
//! A [`Subnet`] is one CIDR block. Dividing it attaches two owned halves, joining
//! removes them again. The leaves, read left to right, always tile the root block.

use super::ipv4::{address_count, format_addr, network_address, Ipv4, MAX_LENGTH};
use crate::error::{Result, SubnetError};
use std::net::Ipv4Addr;

/// The two halves of a divided block.
#[derive(Debug, Clone, PartialEq)]
pub struct Children {
    pub left: Subnet,
    pub right: Subnet,
}

/// A node of the partition tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Subnet {
    address: u32,
    mask_len: u8,
    parent: Option<Ipv4>,
    /// Free-form user annotations.
    pub labels: Vec<String>,
    children: Option<Box<Children>>,
}

impl Subnet {
    /// Create a parentless leaf. The address must already be a network address.
    pub fn new(address: u32, mask_len: u8) -> Result<Subnet> {
        if network_address(address, mask_len)? != address {
            return Err(SubnetError::Misaligned {
                address: format_addr(address),
                mask_len,
            });
        }
        Ok(Subnet {
            address,
            mask_len,
            parent: None,
            labels: Vec::new(),
            children: None,
        })
    }

    /// Assemble a node from already checked parts. Used when loading a saved tree.
    pub(crate) fn from_parts(
        address: u32,
        mask_len: u8,
        labels: Vec<String>,
        children: Option<(Subnet, Subnet)>,
    ) -> Subnet {
        Subnet {
            address,
            mask_len,
            parent: None,
            labels,
            children: children.map(|(left, right)| Box::new(Children { left, right })),
        }
    }

    /// Network address of the block.
    pub fn address(&self) -> u32 {
        self.address
    }

    /// Prefix length (0-32).
    pub fn mask_len(&self) -> u8 {
        self.mask_len
    }

    /// Key of the structural parent, `None` for the root. Never owns anything.
    pub fn parent(&self) -> Option<Ipv4> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<Ipv4>) {
        self.parent = parent;
    }

    /// The `(address, mask_len)` key of this block.
    pub fn cidr(&self) -> Ipv4 {
        Ipv4 {
            addr: Ipv4Addr::from(self.address),
            mask: self.mask_len,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    pub fn is_divided(&self) -> bool {
        self.children.is_some()
    }

    pub fn left(&self) -> Option<&Subnet> {
        self.children.as_deref().map(|c| &c.left)
    }

    pub fn right(&self) -> Option<&Subnet> {
        self.children.as_deref().map(|c| &c.right)
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Children> {
        self.children.as_deref_mut()
    }

    /// Split this block into two halves of prefix `mask_len + 1`.
    ///
    /// Returns `Ok(false)` for a /32, which cannot be split. Dividing a block that
    /// is already divided fails rather than dropping its subtree.
    pub fn divide(&mut self) -> Result<bool> {
        if self.mask_len >= MAX_LENGTH {
            return Ok(false);
        }
        if self.is_divided() {
            return Err(SubnetError::AlreadyDivided(self.cidr()));
        }

        let child_len = self.mask_len + 1;
        let offset = u32::try_from(address_count(child_len)?)
            .map_err(|_| SubnetError::AddressOverflow)?;
        let Some(right_address) = self.address.checked_add(offset) else {
            return Err(SubnetError::AddressOverflow);
        };
        let parent = Some(self.cidr());

        let mut left = Subnet::new(self.address, child_len)?;
        left.parent = parent;
        let mut right = Subnet::new(right_address, child_len)?;
        right.parent = parent;

        self.children = Some(Box::new(Children { left, right }));
        Ok(true)
    }

    /// Merge the two halves back into this block.
    ///
    /// Returns `Ok(false)` on a leaf. Fails when either half is itself divided,
    /// use [`Subnet::collapse`] to drop a deeper subtree on purpose.
    pub fn join(&mut self) -> Result<bool> {
        let Some(children) = self.children.as_deref() else {
            return Ok(false);
        };
        if children.left.is_divided() || children.right.is_divided() {
            return Err(SubnetError::ChildrenDivided(self.cidr()));
        }
        self.children = None;
        Ok(true)
    }

    /// Drop everything below this block. Returns the number of discarded nodes.
    pub fn collapse(&mut self) -> usize {
        match self.children.take() {
            Some(children) => children.left.node_count() + children.right.node_count(),
            None => 0,
        }
    }

    /// True when `(address, mask_len)` names this block or one nested inside it.
    fn may_contain(&self, address: u32, mask_len: u8) -> bool {
        mask_len >= self.mask_len
            && network_address(address, self.mask_len).map_or(false, |net| net == self.address)
    }

    /// Find the node with exactly this address and mask length.
    ///
    /// Searches depth first, this node before its left and right halves.
    /// Subtrees that cannot hold the key are skipped.
    pub fn find(&self, address: u32, mask_len: u8) -> Option<&Subnet> {
        if self.address == address && self.mask_len == mask_len {
            return Some(self);
        }
        let children = self.children.as_deref()?;
        [&children.left, &children.right]
            .into_iter()
            .filter(|child| child.may_contain(address, mask_len))
            .find_map(|child| child.find(address, mask_len))
    }

    /// Mutable variant of [`Subnet::find`].
    pub fn find_mut(&mut self, address: u32, mask_len: u8) -> Option<&mut Subnet> {
        if self.address == address && self.mask_len == mask_len {
            return Some(self);
        }
        let children = self.children.as_deref_mut()?;
        if children.left.may_contain(address, mask_len) {
            children.left.find_mut(address, mask_len)
        } else if children.right.may_contain(address, mask_len) {
            children.right.find_mut(address, mask_len)
        } else {
            None
        }
    }

    /// Lookup by [`Ipv4`] key.
    pub fn find_cidr(&self, cidr: Ipv4) -> Option<&Subnet> {
        self.find(cidr.bits(), cidr.mask)
    }

    /// Mutable lookup by [`Ipv4`] key.
    pub fn find_cidr_mut(&mut self, cidr: Ipv4) -> Option<&mut Subnet> {
        self.find_mut(cidr.bits(), cidr.mask)
    }

    /// Leaves in address order.
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves { stack: vec![self] }
    }

    /// Call `visit` on every leaf, left before right.
    pub fn iterate<F>(&self, visit: F)
    where
        F: FnMut(&Subnet),
    {
        self.leaves().for_each(visit);
    }

    /// Every node, pre-order, with its depth below this node.
    pub fn walk(&self) -> Vec<(usize, &Subnet)> {
        let mut out = Vec::new();
        let mut stack = vec![(0usize, self)];
        while let Some((depth, node)) = stack.pop() {
            out.push((depth, node));
            if let Some(children) = node.children.as_deref() {
                stack.push((depth + 1, &children.right));
                stack.push((depth + 1, &children.left));
            }
        }
        out
    }

    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .as_deref()
            .map_or(0, |c| c.left.node_count() + c.right.node_count())
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves().count()
    }

    /// Replace the labels of this block.
    pub fn set_labels(&mut self, labels: Vec<String>) {
        self.labels = labels;
    }

    pub fn add_label(&mut self, label: impl Into<String>) {
        self.labels.push(label.into());
    }
}

impl std::fmt::Display for Subnet {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.cidr())
    }
}

/// Iterator over the leaves of a tree, see [`Subnet::leaves`].
pub struct Leaves<'a> {
    stack: Vec<&'a Subnet>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = &'a Subnet;

    fn next(&mut self) -> Option<&'a Subnet> {
        while let Some(node) = self.stack.pop() {
            match node.children.as_deref() {
                Some(children) => {
                    self.stack.push(&children.right);
                    self.stack.push(&children.left);
                }
                None => return Some(node),
            }
        }
        None
    }
}
