//! Saving and loading the partition tree as JSON.
//!
//! The document nests `left`/`right` sub-documents and never stores parent
//! links; those are rebuilt after a successful load.

use crate::error::{Result, SubnetError};
use crate::models::{format_addr, parse_addr, Subnet};
use crate::processing::{rebuild_parents, validate_tree};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Top level of a saved tree.
#[derive(Serialize, Deserialize, Debug)]
pub struct TreeDocument {
    /// When the document was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
    pub root: NodeDocument,
}

/// Address as written to disk. Dotted on save, either form on load.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum AddressField {
    Dotted(String),
    Numeric(u32),
}

/// One node of a saved tree.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NodeDocument {
    pub address: AddressField,
    pub mask_len: u8,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<Box<NodeDocument>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<Box<NodeDocument>>,
}

impl NodeDocument {
    pub fn from_subnet(node: &Subnet) -> NodeDocument {
        NodeDocument {
            address: AddressField::Dotted(format_addr(node.address())),
            mask_len: node.mask_len(),
            labels: node.labels.clone(),
            left: node.left().map(|n| Box::new(NodeDocument::from_subnet(n))),
            right: node.right().map(|n| Box::new(NodeDocument::from_subnet(n))),
        }
    }

    /// Build the in-memory tree. Fails unless every node is aligned and every
    /// divided node holds its two exact halves. Parent links are relinked.
    pub fn into_subnet(self) -> Result<Subnet> {
        let mut root = self.build()?;
        validate_tree(&root)?;
        rebuild_parents(&mut root);
        Ok(root)
    }

    fn build(self) -> Result<Subnet> {
        let address = match &self.address {
            AddressField::Dotted(text) => parse_addr(text)?,
            AddressField::Numeric(bits) => *bits,
        };
        let children = match (self.left, self.right) {
            (Some(left), Some(right)) => Some((left.build()?, right.build()?)),
            (None, None) => None,
            _ => {
                return Err(SubnetError::Malformed(format!(
                    "{}/{}: a divided block needs both halves",
                    format_addr(address),
                    self.mask_len
                )))
            }
        };
        Ok(Subnet::from_parts(address, self.mask_len, self.labels, children))
    }
}

/// Serialize a tree to pretty printed JSON.
pub fn to_json(root: &Subnet) -> Result<String> {
    let doc = TreeDocument {
        saved_at: Some(Utc::now()),
        root: NodeDocument::from_subnet(root),
    };
    serde_json::to_string_pretty(&doc)
        .map_err(|e| SubnetError::Malformed(format!("Error serializing JSON: {e}")))
}

/// Parse, check and relink a tree. `source` only labels error messages.
pub fn from_json(json: &str, source: &Path) -> Result<Subnet> {
    let mut deserializer = serde_json::Deserializer::from_str(json);
    let doc: TreeDocument =
        serde_path_to_error::deserialize(&mut deserializer).map_err(|e| SubnetError::Parse {
            path: source.to_path_buf(),
            location: e.path().to_string(),
            message: e.inner().to_string(),
        })?;

    doc.root.into_subnet()
}

/// Write the tree to `path`.
///
/// The JSON goes to a sibling `.tmp` file first and is renamed over `path`, so a
/// failed write leaves the previous save intact.
pub fn save_tree(root: &Subnet, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json = to_json(root)?;
    log::info!("Writing {} nodes to {}", root.node_count(), path.display());

    let tmp = temp_path(path);
    let io_err = |source| SubnetError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Err(e) = std::fs::write(&tmp, json) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(e));
    }
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        io_err(e)
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Read a tree from `path`. Nothing is returned unless the whole document is valid.
pub fn load_tree(path: impl AsRef<Path>) -> Result<Subnet> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|source| SubnetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("Reading subnet tree from {}", path.display());
    let root = from_json(&json, path)?;
    log::debug!("Loaded {} with {} leaves", root.cidr(), root.leaf_count());
    Ok(root)
}
