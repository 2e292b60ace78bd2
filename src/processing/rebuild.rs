//! Parent back-reference reconstruction.
//!
//! Saved trees carry no parent links. After loading, one top-down pass points
//! every child at the block it was divided from.

use crate::models::Subnet;

/// Set `parent` on every node below `root`; the root gets `None`.
pub fn rebuild_parents(root: &mut Subnet) {
    root.set_parent(None);
    link_children(root);
}

fn link_children(node: &mut Subnet) {
    let cidr = node.cidr();
    if let Some(children) = node.children_mut() {
        children.left.set_parent(Some(cidr));
        children.right.set_parent(Some(cidr));
        link_children(&mut children.left);
        link_children(&mut children.right);
    }
}
