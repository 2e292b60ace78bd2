//! Split an IPv4 block into smaller CIDR blocks and join them back.
//!
//! The tree lives in [`models::Subnet`]; [`store::SubnetStore`] owns one tree and
//! serializes access to it, [`persist`] saves and loads it as JSON.

pub mod config;
pub mod error;
pub mod models;
pub mod output;
pub mod persist;
pub mod processing;
pub mod session;
pub mod store;

pub use error::{Result, SubnetError};
pub use models::{Ipv4, Subnet};
pub use store::{Outcome, SubnetStore};
