//! IPv4 address and CIDR arithmetic.
//!
//! Addresses are handled as `u32` in network byte order. Every function that
//! takes a mask length rejects values above [`MAX_LENGTH`] instead of shifting
//! past the width of the integer.

use crate::error::{Result, SubnetError};
use serde::de;
use serde::{Deserialize, Deserializer, Serialize};
use std::net::Ipv4Addr;

/// Maximum length for an IPv4 subnet mask (32 bits).
pub const MAX_LENGTH: u8 = 32;

fn check_mask_len(len: u8) -> Result<()> {
    if len > MAX_LENGTH {
        Err(SubnetError::InvalidMaskLength(len.to_string()))
    } else {
        Ok(())
    }
}

// Clamps instead of failing, callers validate first.
fn mask_bits(len: u8) -> u32 {
    let host_bits = u32::from(MAX_LENGTH.saturating_sub(len));
    u32::MAX.checked_shl(host_bits).unwrap_or(0)
}

/// Parse a dotted-quad string into its `u32` value.
///
/// Each octet is one to three decimal digits, leading zeros allowed.
///
/// # Examples
/// ```
/// use subnet_splitter::models::parse_addr;
/// assert_eq!(parse_addr("192.168.1.1").unwrap(), 3232235777);
/// assert!(parse_addr("192.168.1").is_err());
/// ```
pub fn parse_addr(text: &str) -> Result<u32> {
    let text = text.trim();
    let invalid = || SubnetError::InvalidAddress(text.to_string());

    let mut parts = text.split('.');
    let mut addr: u32 = 0;
    for _ in 0..4 {
        let part = parts.next().ok_or_else(invalid)?;
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let octet: u8 = part.parse().map_err(|_| invalid())?;
        addr = (addr << 8) | u32::from(octet);
    }
    if parts.next().is_some() {
        return Err(invalid());
    }
    Ok(addr)
}

/// Render a `u32` address as a dotted quad.
pub fn format_addr(addr: u32) -> String {
    Ipv4Addr::from(addr).to_string()
}

/// True when `text` is a well formed dotted-quad address.
pub fn is_valid_address_string(text: &str) -> bool {
    parse_addr(text).is_ok()
}

/// Parse a decimal mask length, with or without a leading `/`.
pub fn parse_mask_len(text: &str) -> Result<u8> {
    let trimmed = text.trim();
    let digits = trimmed.strip_prefix('/').unwrap_or(trimmed);
    let len: u8 = digits
        .parse()
        .map_err(|_| SubnetError::InvalidMaskLength(trimmed.to_string()))?;
    check_mask_len(len)?;
    Ok(len)
}

/// Convert a CIDR prefix length to a subnet mask.
///
/// # Examples
/// ```
/// use subnet_splitter::models::netmask;
/// assert_eq!(netmask(24).unwrap(), 0xFFFFFF00);
/// assert_eq!(netmask(0).unwrap(), 0);
/// ```
pub fn netmask(len: u8) -> Result<u32> {
    check_mask_len(len)?;
    Ok(mask_bits(len))
}

/// Count the leading one bits of a contiguous subnet mask.
pub fn mask_len_from_mask(mask: u32) -> u8 {
    mask.leading_ones() as u8
}

/// Clear the host bits of `addr` for the given prefix length.
pub fn network_address(addr: u32, len: u8) -> Result<u32> {
    Ok(addr & netmask(len)?)
}

/// Number of addresses in a block, `2^(32 - len)`. A /0 holds `2^32`.
pub fn address_count(len: u8) -> Result<u64> {
    check_mask_len(len)?;
    Ok(1u64 << (MAX_LENGTH - len))
}

/// Highest address of the block starting at `network`.
pub fn last_address(network: u32, len: u8) -> Result<u32> {
    let last = u64::from(network) + address_count(len)? - 1;
    u32::try_from(last).map_err(|_| SubnetError::AddressOverflow)
}

/// First and last host address of a block.
///
/// A /31 is a point-to-point link with both addresses usable, a /32 is a
/// single host. Larger blocks exclude the network and broadcast address.
pub fn usable_range(network: u32, len: u8) -> Result<(u32, u32)> {
    let last = last_address(network, len)?;
    match len {
        32 | 31 => Ok((network, last)),
        _ => Ok((network + 1, last - 1)),
    }
}

/// IPv4 address with CIDR notation support.
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Copy, Clone, Hash)]
pub struct Ipv4 {
    /// The IPv4 address.
    pub addr: Ipv4Addr,
    /// The subnet mask length (0-32).
    pub mask: u8,
}

impl Serialize for Ipv4 {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Ipv4 {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Ipv4, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ipv4::new(&s).map_err(de::Error::custom)
    }
}

impl Ipv4 {
    /// Create a new [`Ipv4`] from a CIDR string (e.g., "10.0.0.0/24").
    pub fn new(addr_cidr: &str) -> Result<Ipv4> {
        let addr_cidr = addr_cidr.trim();
        let (addr, mask) = addr_cidr
            .split_once('/')
            .ok_or_else(|| SubnetError::InvalidAddress(addr_cidr.to_string()))?;
        Ipv4::from_parts(parse_addr(addr)?, parse_mask_len(mask)?)
    }

    /// Build from a raw address and mask length.
    pub fn from_parts(addr: u32, mask: u8) -> Result<Ipv4> {
        check_mask_len(mask)?;
        Ok(Ipv4 {
            addr: Ipv4Addr::from(addr),
            mask,
        })
    }

    /// The address as `u32`.
    pub fn bits(&self) -> u32 {
        u32::from(self.addr)
    }

    /// Get the lowest (network) address in the subnet.
    pub fn lo(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.bits() & mask_bits(self.mask))
    }

    /// Get the highest (broadcast) address in the subnet.
    pub fn hi(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.bits() | !mask_bits(self.mask))
    }

    /// True when `addr` lies inside this block.
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        self.lo() <= addr && addr <= self.hi()
    }

    /// True when the address carries no host bits.
    pub fn is_aligned(&self) -> bool {
        self.lo() == self.addr
    }

    /// Same block with the host bits cleared.
    pub fn network(&self) -> Ipv4 {
        Ipv4 {
            addr: self.lo(),
            mask: self.mask,
        }
    }
}

impl std::fmt::Display for Ipv4 {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{}", self.addr, self.mask)
    }
}

impl std::str::FromStr for Ipv4 {
    type Err = SubnetError;

    fn from_str(s: &str) -> Result<Ipv4> {
        Ipv4::new(s)
    }
}
