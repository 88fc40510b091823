//! CIDR blocks and range classification.
//!
//! A [`CidrBlock`] is built from one of three textual forms, in this
//! priority order: a `start-end` range, an `address/prefix` pair, or a bare
//! address (treated as a single-host block). The block normalizes into a
//! `(start, end, prefix, version)` tuple and answers network, broadcast,
//! host-count and intersection queries from it.

use log::debug;
use std::cell::Cell;
use std::fmt;
use std::str::FromStr;

use crate::addr::Addr;
use crate::{CidrError, IpVersion};

/// How one range relates to a reference range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intersection {
    /// The ranges are disjoint.
    None,
    /// The tested range lies wholly inside the reference.
    Full,
    /// Overlap at the reference's low edge.
    PartialLow,
    /// Overlap at the reference's high edge.
    PartialHigh,
}

/// Netmask with the top `prefix` bits set at the version's width.
fn netmask(version: IpVersion, prefix: u8) -> Result<u128, CidrError> {
    let bits = version.bits() as u8;
    if prefix > bits {
        return Err(CidrError::InvalidPrefix(format!(
            "/{} exceeds the {} width of {} bits",
            prefix, version, bits
        )));
    }
    if prefix == 0 {
        return Ok(0);
    }
    let host = (bits - prefix) as u32;
    Ok((version.max() >> host) << host)
}

/// Compute the `(network, broadcast)` bounds of `address/prefix`.
///
/// The network keeps the top `prefix` bits of the address, the broadcast
/// sets every remaining host bit, both at the exact 32- or 128-bit width.
pub fn prefix_to_range(addr: Addr, prefix: u8) -> Result<(Addr, Addr), CidrError> {
    let mask = netmask(addr.version(), prefix)?;
    let network = addr.value() & mask;
    let broadcast = network | (!mask & addr.version().max());
    Ok((
        Addr::new(addr.version(), network)?,
        Addr::new(addr.version(), broadcast)?,
    ))
}

/// Length of the high-order bit run shared by two same-version addresses.
fn shared_prefix_len(start: Addr, end: Addr) -> u8 {
    let width = start.version().bits();
    let xor = start.value() ^ end.value();
    if xor == 0 {
        return width as u8;
    }
    (xor.leading_zeros() - (128 - width)) as u8
}

/// A mutable CIDR block or arbitrary address range.
///
/// `start` retains the address exactly as given, so a block built from a
/// non-canonical input such as `2001:4056::1/96` keeps displaying that
/// address; [`network`](CidrBlock::network) and
/// [`broadcast`](CidrBlock::broadcast) derive the masked bounds from it.
///
/// The memoized (network, broadcast) pair lives in a [`Cell`], so a block
/// is not safe to share across threads; callers needing that wrap it
/// themselves.
#[derive(Debug, Clone)]
pub struct CidrBlock {
    version: IpVersion,
    start: Addr,
    end: Addr,
    prefix: u8,
    masked: Cell<Option<(Addr, Addr)>>,
}

impl PartialEq for CidrBlock {
    fn eq(&self, other: &CidrBlock) -> bool {
        self.version == other.version
            && self.start == other.start
            && self.end == other.end
            && self.prefix == other.prefix
    }
}

impl Eq for CidrBlock {}

fn parse_parts(s: &str) -> Result<(IpVersion, Addr, Addr, u8), CidrError> {
    let s = s.trim();
    if let Some(i) = s.find('-') {
        let (a, b) = (s[..i].trim(), s[i + 1..].trim());
        let start = Addr::parse(a).map_err(|_| CidrError::InvalidRange(s.to_owned()))?;
        let end = Addr::parse(b).map_err(|_| CidrError::InvalidRange(s.to_owned()))?;
        if start.version() != end.version() {
            return Err(CidrError::InvalidRange(format!(
                "{} and {} are of different versions",
                a, b
            )));
        }
        if start.value() > end.value() {
            return Err(CidrError::InvalidRange(format!("{} is above {}", a, b)));
        }
        let prefix = shared_prefix_len(start, end);
        Ok((start.version(), start, end, prefix))
    } else if let Some(i) = s.find('/') {
        let addr = Addr::parse(&s[..i])?;
        let prefix: u8 = s[i + 1..]
            .parse()
            .map_err(|_| CidrError::InvalidPrefix(s[i + 1..].to_owned()))?;
        let (_, broadcast) = prefix_to_range(addr, prefix)?;
        Ok((addr.version(), addr, broadcast, prefix))
    } else {
        let addr = Addr::parse(s)?;
        Ok((addr.version(), addr, addr, addr.version().bits() as u8))
    }
}

impl CidrBlock {
    /// Build a block from `"a.b.c.d"`, `"a.b.c.d/nn"` or
    /// `"a.b.c.d-e.f.g.h"` (and the IPv6 equivalents).
    ///
    /// A `start-end` range with `start` numerically above `end` is rejected
    /// with [`CidrError::InvalidRange`] rather than swapped.
    pub fn new(s: &str) -> Result<Self, CidrError> {
        let (version, start, end, prefix) = parse_parts(s)?;
        debug!("{} normalized to {}-{} /{}", s.trim(), start, end, prefix);
        Ok(CidrBlock {
            version,
            start,
            end,
            prefix,
            masked: Cell::new(None),
        })
    }

    /// Replace the whole range with a newly parsed one, clearing the
    /// derived cache. On error the block keeps its previous value.
    pub fn set(&mut self, s: &str) -> Result<(), CidrError> {
        let (version, start, end, prefix) = parse_parts(s)?;
        self.version = version;
        self.start = start;
        self.end = end;
        self.prefix = prefix;
        self.masked.set(None);
        Ok(())
    }

    pub fn version(&self) -> IpVersion {
        self.version
    }

    /// The prefix length: exact for `address/prefix` inputs, the shared
    /// leading-bit run of the endpoints for `start-end` inputs.
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Lower bound of the raw range, exactly as constructed.
    pub fn start(&self) -> Addr {
        self.start
    }

    /// Upper bound of the raw range.
    pub fn end(&self) -> Addr {
        self.end
    }

    fn masked_range(&self) -> (Addr, Addr) {
        if let Some(pair) = self.masked.get() {
            return pair;
        }
        let pair = prefix_to_range(self.start, self.prefix).expect("prefix checked on input");
        self.masked.set(Some(pair));
        pair
    }

    /// The prefix-derived network address (all host bits zero).
    pub fn network(&self) -> Addr {
        self.masked_range().0
    }

    /// The prefix-derived broadcast address (all host bits one).
    pub fn broadcast(&self) -> Addr {
        self.masked_range().1
    }

    /// The `(low, high)` bounds: the raw `start`/`end` pair when
    /// `ignore_prefix` is set, the memoized network/broadcast otherwise.
    pub fn range(&self, ignore_prefix: bool) -> (Addr, Addr) {
        if ignore_prefix {
            (self.start, self.end)
        } else {
            self.masked_range()
        }
    }

    /// Number of addresses in the range, `broadcast - network + 1`.
    ///
    /// The whole IPv6 space holds 2^128 addresses, one more than a `u128`
    /// can carry; that single case saturates to `u128::MAX`.
    pub fn total_hosts(&self, ignore_prefix: bool) -> u128 {
        let (lo, hi) = self.range(ignore_prefix);
        (hi.value() - lo.value()).checked_add(1).unwrap_or(u128::MAX)
    }

    /// True iff `start` equals the prefix-derived network, i.e. the range
    /// is exactly expressible as a canonical CIDR block.
    pub fn is_true_cidr(&self) -> bool {
        self.start == self.network()
    }

    /// Classify this block's range against a reference block.
    ///
    /// Both ranges are the prefix-derived bounds, compared numerically;
    /// V4 values already live in the shared 128-bit space, so mixed-version
    /// comparisons are well defined (and disjoint in practice). Boundary
    /// equality counts as overlap, never as `None`.
    pub fn intersect(&self, other: &CidrBlock) -> Intersection {
        let (lo, hi) = self.range(false);
        let (min, max) = other.range(false);
        let (lo, hi) = (lo.value(), hi.value());
        let (min, max) = (min.value(), max.value());
        if lo >= min && hi <= max {
            Intersection::Full
        } else if max < lo || min > hi {
            Intersection::None
        } else if max <= hi && min <= lo {
            Intersection::PartialLow
        } else if min >= lo && max >= hi {
            Intersection::PartialHigh
        } else {
            // unreachable over totally ordered bounds, kept as a default
            Intersection::None
        }
    }
}

impl FromStr for CidrBlock {
    type Err = CidrError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CidrBlock::new(s)
    }
}

impl fmt::Display for CidrBlock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.prefix as u32 == self.version.bits() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}/{}", self.start, self.prefix)
        }
    }
}
