//! Error type shared by the address math, the partition tree and persistence.

use crate::models::Ipv4;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SubnetError>;

#[derive(Error, Debug)]
pub enum SubnetError {
    #[error("Invalid address: {0:?}")]
    InvalidAddress(String),

    #[error("Invalid mask length: {0:?} (expected 0-32)")]
    InvalidMaskLength(String),

    #[error("Address {address} is not the network address of a /{mask_len}")]
    Misaligned { address: String, mask_len: u8 },

    #[error("Address calculation overflowed the IPv4 space")]
    AddressOverflow,

    #[error("Subnet {0} is already divided")]
    AlreadyDivided(Ipv4),

    #[error("Subnet {0} has divided children, collapse it instead")]
    ChildrenDivided(Ipv4),

    #[error("No subnet tree, initialize one first")]
    NotInitialized,

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error parsing {path} at {location}: {message}")]
    Parse {
        path: PathBuf,
        location: String,
        message: String,
    },

    #[error("Malformed subnet tree: {0}")]
    Malformed(String),

    #[error("Invalid command: {0}")]
    Command(String),
}
