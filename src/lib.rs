//! Exact arithmetic on IPv4 and IPv6 addresses and CIDR blocks built on it.
//!
//! [`Addr`] stores an address of either family as an unsigned integer at its
//! exact bit width (32 or 128) and converts it between presentation text,
//! hex and binary forms. [`CidrBlock`] sits on top and turns one input
//! string, `"10.0.0.0/24"`, `"2001:db8::1"` or `"10.0.0.10-10.0.0.20"`,
//! into a normalized range with network, broadcast, host-count and
//! intersection queries.
//!
//! ```
//! use cidr_range::{CidrBlock, Intersection};
//!
//! let block = CidrBlock::new("10.0.0.0/24").unwrap();
//! assert_eq!(block.total_hosts(false), 256);
//!
//! let wider = CidrBlock::new("10.0.0.0/16").unwrap();
//! assert_eq!(block.intersect(&wider), Intersection::Full);
//! ```

pub mod addr;
pub mod block;

pub use crate::addr::Addr;
pub use crate::block::{prefix_to_range, CidrBlock, Intersection};

use std::fmt;
use thiserror::Error;

/// Address family, fixing the bit width of every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    /// Bit width of the address space, 32 or 128.
    pub fn bits(self) -> u32 {
        match self {
            IpVersion::V4 => 32,
            IpVersion::V6 => 128,
        }
    }

    /// Largest value representable at this width.
    pub fn max(self) -> u128 {
        match self {
            IpVersion::V4 => u32::MAX as u128,
            IpVersion::V6 => u128::MAX,
        }
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IpVersion::V4 => write!(f, "IPv4"),
            IpVersion::V6 => write!(f, "IPv6"),
        }
    }
}

/// Errors reported by address parsing and range construction.
///
/// Every failure is detected at the point of input; no operation leaves a
/// half-initialized value behind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CidrError {
    /// Malformed or unparseable address literal.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    /// Prefix length outside 0..=32 (IPv4) or 0..=128 (IPv6).
    #[error("invalid prefix: {0}")]
    InvalidPrefix(String),
    /// Malformed `start-end` range, mixed versions, or start above end.
    #[error("invalid range: {0}")]
    InvalidRange(String),
    /// Mixed IPv4/IPv6 operands passed to a bitwise or comparison op.
    #[error("version mismatch: {0} vs {1}")]
    VersionMismatch(IpVersion, IpVersion),
}
