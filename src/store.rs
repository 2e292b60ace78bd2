//! Owned, lock-guarded holder of the partition tree.
//!
//! Every command holds the lock from lookup to mutation, so two callers can
//! never divide the same block at once.

use crate::error::{Result, SubnetError};
use crate::models::{format_addr, network_address, Ipv4, Subnet};
use crate::persist;
use crate::processing::{leaf_rows, LeafRow};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// What a targeted command did to the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Changed,
    /// The block exists but the command had nothing to do.
    Unchanged,
    NotFound,
}

impl From<bool> for Outcome {
    fn from(changed: bool) -> Outcome {
        if changed {
            Outcome::Changed
        } else {
            Outcome::Unchanged
        }
    }
}

#[derive(Debug, Default)]
pub struct SubnetStore {
    root: Mutex<Option<Subnet>>,
}

impl SubnetStore {
    pub fn new() -> SubnetStore {
        SubnetStore::default()
    }

    // Tree operations never panic mid-mutation, a poisoned lock still holds a sound tree.
    fn lock(&self) -> MutexGuard<'_, Option<Subnet>> {
        self.root.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` on the node `(address, mask_len)` while holding the lock.
    fn with_node<F>(&self, address: u32, mask_len: u8, f: F) -> Result<Outcome>
    where
        F: FnOnce(&mut Subnet) -> Result<bool>,
    {
        let mut guard = self.lock();
        let root = guard.as_mut().ok_or(SubnetError::NotInitialized)?;
        match root.find_mut(address, mask_len) {
            Some(node) => f(node).map(Outcome::from),
            None => {
                log::debug!("{}/{} not in tree", format_addr(address), mask_len);
                Ok(Outcome::NotFound)
            }
        }
    }

    /// Start a new tree, replacing any current one.
    ///
    /// Host bits in `address` are cleared so the root is always a network address.
    pub fn initialize(&self, address: u32, mask_len: u8) -> Result<Ipv4> {
        let network = network_address(address, mask_len)?;
        if network != address {
            log::warn!(
                "{}/{} has host bits set, using {}/{}",
                format_addr(address),
                mask_len,
                format_addr(network),
                mask_len
            );
        }
        let root = Subnet::new(network, mask_len)?;
        let cidr = root.cidr();
        *self.lock() = Some(root);
        log::info!("Initialized subnet tree {cidr}");
        Ok(cidr)
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().is_some()
    }

    pub fn divide(&self, address: u32, mask_len: u8) -> Result<Outcome> {
        let outcome = self.with_node(address, mask_len, Subnet::divide)?;
        log::info!("divide {}/{}: {outcome:?}", format_addr(address), mask_len);
        Ok(outcome)
    }

    pub fn join(&self, address: u32, mask_len: u8) -> Result<Outcome> {
        let outcome = self.with_node(address, mask_len, Subnet::join)?;
        log::info!("join {}/{}: {outcome:?}", format_addr(address), mask_len);
        Ok(outcome)
    }

    /// Drop the whole subtree below a block.
    pub fn collapse(&self, address: u32, mask_len: u8) -> Result<Outcome> {
        let outcome = self.with_node(address, mask_len, |node| {
            let dropped = node.collapse();
            if dropped > 0 {
                log::warn!("collapse {node} discarded {dropped} nodes");
            }
            Ok(dropped > 0)
        })?;
        Ok(outcome)
    }

    pub fn set_labels(&self, address: u32, mask_len: u8, labels: Vec<String>) -> Result<Outcome> {
        self.with_node(address, mask_len, |node| {
            let changed = node.labels != labels;
            node.set_labels(labels);
            Ok(changed)
        })
    }

    /// Forget the current tree.
    pub fn reset(&self) {
        if self.lock().take().is_some() {
            log::info!("Subnet tree reset");
        }
    }

    /// The current leaves with their computed columns.
    pub fn list(&self) -> Result<Vec<LeafRow>> {
        let guard = self.lock();
        let root = guard.as_ref().ok_or(SubnetError::NotInitialized)?;
        leaf_rows(root)
    }

    /// A copy of the current tree.
    pub fn snapshot(&self) -> Result<Subnet> {
        self.lock().clone().ok_or(SubnetError::NotInitialized)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let guard = self.lock();
        let root = guard.as_ref().ok_or(SubnetError::NotInitialized)?;
        persist::save_tree(root, path)
    }

    /// Replace the current tree with the one saved at `path`.
    ///
    /// The current tree is kept when the file cannot be read or is invalid.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Ipv4> {
        let root = persist::load_tree(path)?;
        let cidr = root.cidr();
        *self.lock() = Some(root);
        Ok(cidr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_addr;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn addr(text: &str) -> u32 {
        parse_addr(text).unwrap()
    }

    fn cidrs(store: &SubnetStore) -> Vec<String> {
        store
            .list()
            .unwrap()
            .iter()
            .map(|row| row.subnet.to_string())
            .collect()
    }

    #[test]
    fn test_not_initialized() {
        let store = SubnetStore::new();
        assert!(!store.is_initialized());
        assert!(matches!(
            store.divide(addr("10.0.0.0"), 8),
            Err(SubnetError::NotInitialized)
        ));
        assert!(matches!(store.list(), Err(SubnetError::NotInitialized)));
        assert!(store.snapshot().is_err());
    }

    #[test]
    fn test_initialize_aligns_address() {
        let store = SubnetStore::new();
        let cidr = store.initialize(addr("10.2.3.4"), 16).unwrap();
        assert_eq!(cidr.to_string(), "10.2.0.0/16");
        assert!(store.initialize(addr("10.2.3.4"), 33).is_err());
    }

    #[test]
    fn test_divide_and_join() {
        let store = SubnetStore::new();
        store.initialize(addr("10.2.0.0"), 16).unwrap();

        assert_eq!(store.divide(addr("10.2.0.0"), 16).unwrap(), Outcome::Changed);
        assert_eq!(cidrs(&store), vec!["10.2.0.0/17", "10.2.128.0/17"]);

        let rows = store.list().unwrap();
        assert_eq!(rows[1].parent.unwrap().to_string(), "10.2.0.0/16");

        assert_eq!(store.join(addr("10.2.0.0"), 16).unwrap(), Outcome::Changed);
        assert_eq!(cidrs(&store), vec!["10.2.0.0/16"]);
        assert_eq!(store.join(addr("10.2.0.0"), 16).unwrap(), Outcome::Unchanged);
    }

    #[test]
    fn test_not_found_is_not_an_error() {
        let store = SubnetStore::new();
        store.initialize(addr("10.2.0.0"), 16).unwrap();
        assert_eq!(store.divide(addr("10.3.0.0"), 16).unwrap(), Outcome::NotFound);
        assert_eq!(store.join(addr("10.2.0.0"), 17).unwrap(), Outcome::NotFound);
        assert_eq!(cidrs(&store), vec!["10.2.0.0/16"]);
    }

    #[test]
    fn test_host_route_divide_is_unchanged() {
        let store = SubnetStore::new();
        store.initialize(addr("192.168.1.1"), 32).unwrap();
        assert_eq!(
            store.divide(addr("192.168.1.1"), 32).unwrap(),
            Outcome::Unchanged
        );
    }

    #[test]
    fn test_hardened_errors_propagate() {
        let store = SubnetStore::new();
        store.initialize(addr("10.0.0.0"), 8).unwrap();
        store.divide(addr("10.0.0.0"), 8).unwrap();
        store.divide(addr("10.0.0.0"), 9).unwrap();

        assert!(matches!(
            store.divide(addr("10.0.0.0"), 8),
            Err(SubnetError::AlreadyDivided(_))
        ));
        assert!(matches!(
            store.join(addr("10.0.0.0"), 8),
            Err(SubnetError::ChildrenDivided(_))
        ));
        assert_eq!(store.list().unwrap().len(), 3);

        assert_eq!(store.collapse(addr("10.0.0.0"), 8).unwrap(), Outcome::Changed);
        assert_eq!(cidrs(&store), vec!["10.0.0.0/8"]);
    }

    #[test]
    fn test_set_labels() {
        let store = SubnetStore::new();
        store.initialize(addr("10.0.0.0"), 8).unwrap();
        let labels = vec!["core".to_string(), "dc1".to_string()];
        assert_eq!(
            store.set_labels(addr("10.0.0.0"), 8, labels.clone()).unwrap(),
            Outcome::Changed
        );
        assert_eq!(
            store.set_labels(addr("10.0.0.0"), 8, labels.clone()).unwrap(),
            Outcome::Unchanged
        );
        assert_eq!(store.list().unwrap()[0].labels, labels);
    }

    #[test]
    fn test_reset() {
        let store = SubnetStore::new();
        store.initialize(addr("10.0.0.0"), 8).unwrap();
        store.reset();
        assert!(!store.is_initialized());
        store.reset();
    }

    #[test]
    fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("subnets.json");

        let store = SubnetStore::new();
        store.initialize(addr("10.2.0.0"), 16).unwrap();
        store.divide(addr("10.2.0.0"), 16).unwrap();
        store.save(&path).unwrap();
        let saved = store.snapshot().unwrap();

        let other = SubnetStore::new();
        assert_eq!(other.load(&path).unwrap().to_string(), "10.2.0.0/16");
        assert_eq!(other.snapshot().unwrap(), saved);
    }

    #[test]
    fn test_failed_load_keeps_current_tree() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.json");
        std::fs::write(&path, "{\"root\": {\"address\": \"10.0.0.1\", \"mask_len\": 8}}").unwrap();

        let store = SubnetStore::new();
        store.initialize(addr("192.168.0.0"), 24).unwrap();
        assert!(store.load(&path).is_err());
        assert_eq!(cidrs(&store), vec!["192.168.0.0/24"]);
    }

    #[test]
    fn test_concurrent_divides_lose_nothing() {
        let store = Arc::new(SubnetStore::new());
        store.initialize(addr("10.0.0.0"), 8).unwrap();
        store.divide(addr("10.0.0.0"), 8).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let target = if i % 2 == 0 { "10.0.0.0" } else { "10.128.0.0" };
                    store.divide(addr(target), 9)
                })
            })
            .collect();

        let mut changed = 0;
        for handle in handles {
            match handle.join().unwrap() {
                Ok(Outcome::Changed) => changed += 1,
                Err(SubnetError::AlreadyDivided(_)) => {}
                other => panic!("unexpected result {other:?}"),
            }
        }
        assert_eq!(changed, 2);
        assert_eq!(store.list().unwrap().len(), 4);
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let store = Arc::new(SubnetStore::new());
        store.initialize(addr("10.0.0.0"), 8).unwrap();
        store.divide(addr("10.0.0.0"), 8).unwrap();

        let poisoner = Arc::clone(&store);
        let result = std::thread::spawn(move || {
            let _guard = poisoner.root.lock().unwrap();
            panic!("panic while holding the tree lock");
        })
        .join();
        assert!(result.is_err());
        assert!(store.root.is_poisoned());

        assert_eq!(cidrs(&store), vec!["10.0.0.0/9", "10.128.0.0/9"]);
        assert_eq!(store.divide(addr("10.128.0.0"), 9).unwrap(), Outcome::Changed);
        assert_eq!(store.list().unwrap().len(), 3);
    }
}
