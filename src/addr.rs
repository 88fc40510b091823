//! Fixed-width address values and their text forms.
//!
//! An [`Addr`] is an unsigned integer pinned to the exact width of its
//! address family. All arithmetic here is width-aware: masks, complements
//! and paddings are computed against 32 or 128 bits, never against the
//! magnitude of the value.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::cmp::Ordering;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::{CidrError, IpVersion};

/// An immutable IPv4 or IPv6 address value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Addr {
    version: IpVersion,
    bits: u128,
}

impl Addr {
    /// Wrap a raw value, checking it fits the version's width.
    pub fn new(version: IpVersion, value: u128) -> Result<Self, CidrError> {
        if value > version.max() {
            return Err(CidrError::InvalidAddress(format!(
                "{:#x} does not fit in an {} address",
                value, version
            )));
        }
        Ok(Addr {
            version,
            bits: value,
        })
    }

    pub fn version(&self) -> IpVersion {
        self.version
    }

    /// The address as an unsigned integer in the low bits of a `u128`.
    pub fn value(&self) -> u128 {
        self.bits
    }

    /// Parse a presentation-form literal.
    ///
    /// A string containing `:` is parsed as colon-hex IPv6 (including `::`
    /// compression and embedded dotted forms such as `::10.0.0.1`, which
    /// land in the low 32 bits of a V6 value). Anything else must be a
    /// dotted-decimal IPv4 literal. CIDR suffixes are rejected here;
    /// callers split those off first.
    pub fn parse(s: &str) -> Result<Self, CidrError> {
        if s.contains(':') {
            let v6 = Ipv6Addr::from_str(s)
                .map_err(|_| CidrError::InvalidAddress(s.to_owned()))?;
            return Ok(Addr {
                version: IpVersion::V6,
                bits: u128::from(v6),
            });
        }
        lazy_static! {
            static ref RE: Regex = Regex::new(
                r"^(1?[0-9]{1,2}|2[0-4][0-9]|25[0-5])\.(1?[0-9]{1,2}|2[0-4][0-9]|25[0-5])\.(1?[0-9]{1,2}|2[0-4][0-9]|25[0-5])\.(1?[0-9]{1,2}|2[0-4][0-9]|25[0-5])$"
            )
            .expect("Not possible");
        }
        fn octet<'t>(ind: usize, v: &Captures<'t>) -> Result<u32, CidrError> {
            v.get(ind)
                .map(|r| r.as_str().parse::<u32>())
                .ok_or_else(|| CidrError::InvalidAddress("missing octet".to_owned()))?
                .map_err(|e| CidrError::InvalidAddress(e.to_string()))
        }
        match RE.captures(s) {
            Some(ref v) => {
                let bits = (octet(1, v)? << 24)
                    + (octet(2, v)? << 16)
                    + (octet(3, v)? << 8)
                    + octet(4, v)?;
                Ok(Addr {
                    version: IpVersion::V4,
                    bits: bits as u128,
                })
            }
            _ => Err(CidrError::InvalidAddress(s.to_owned())),
        }
    }

    /// Render the address as presentation text.
    ///
    /// With `expand` set, a V6 address is written as eight zero-padded
    /// colon-hex groups instead of the compressed `::` form. A V6 value
    /// whose upper 96 bits are zero renders in the historical `::a.b.c.d`
    /// dotted form.
    pub fn to_presentation(&self, expand: bool) -> String {
        match self.version {
            IpVersion::V4 => Ipv4Addr::from(self.bits as u32).to_string(),
            IpVersion::V6 => {
                if expand {
                    let mut groups = Vec::with_capacity(8);
                    for i in (0..8).rev() {
                        groups.push(format!("{:04x}", ((self.bits >> (i * 16)) & 0xffff) as u16));
                    }
                    groups.join(":")
                } else if self.bits >> 32 == 0 && self.bits != 0 {
                    format!("::{}", Ipv4Addr::from(self.bits as u32))
                } else {
                    Ipv6Addr::from(self.bits).to_string()
                }
            }
        }
    }

    /// Exact-width lowercase hex: 8 digits for V4, 32 for V6.
    pub fn to_hex(&self) -> String {
        match self.version {
            IpVersion::V4 => format!("{:08x}", self.bits),
            IpVersion::V6 => format!("{:032x}", self.bits),
        }
    }

    /// Inverse of [`to_hex`](Addr::to_hex); the digit count selects the
    /// version, case is ignored.
    pub fn from_hex(s: &str) -> Result<Self, CidrError> {
        let version = match s.len() {
            8 => IpVersion::V4,
            32 => IpVersion::V6,
            _ => return Err(CidrError::InvalidAddress(s.to_owned())),
        };
        if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CidrError::InvalidAddress(s.to_owned()));
        }
        let bits =
            u128::from_str_radix(s, 16).map_err(|_| CidrError::InvalidAddress(s.to_owned()))?;
        Addr::new(version, bits)
    }

    /// Base-2 string, optionally left-zero-padded to `pad` characters.
    ///
    /// Padding never truncates: a `pad` below the natural width yields the
    /// full unpadded representation.
    pub fn to_binary(&self, pad: Option<usize>) -> String {
        match pad {
            Some(w) => format!("{:0w$b}", self.bits, w = w),
            None => format!("{:b}", self.bits),
        }
    }

    /// Parse a base-2 string into an address of the given version.
    ///
    /// The version is taken explicitly because a minimal binary string
    /// carries no width information of its own.
    pub fn from_binary(s: &str, version: IpVersion) -> Result<Self, CidrError> {
        if s.is_empty() || !s.bytes().all(|b| b == b'0' || b == b'1') {
            return Err(CidrError::InvalidAddress(s.to_owned()));
        }
        let bits =
            u128::from_str_radix(s, 2).map_err(|_| CidrError::InvalidAddress(s.to_owned()))?;
        Addr::new(version, bits)
    }

    fn same_version(&self, other: &Addr) -> Result<(), CidrError> {
        if self.version != other.version {
            return Err(CidrError::VersionMismatch(self.version, other.version));
        }
        Ok(())
    }

    /// Bitwise AND of two same-version addresses.
    pub fn and(&self, other: &Addr) -> Result<Addr, CidrError> {
        self.same_version(other)?;
        Ok(Addr {
            version: self.version,
            bits: self.bits & other.bits,
        })
    }

    /// Bitwise OR of two same-version addresses.
    pub fn or(&self, other: &Addr) -> Result<Addr, CidrError> {
        self.same_version(other)?;
        Ok(Addr {
            version: self.version,
            bits: self.bits | other.bits,
        })
    }

    /// Bitwise XOR of two same-version addresses.
    pub fn xor(&self, other: &Addr) -> Result<Addr, CidrError> {
        self.same_version(other)?;
        Ok(Addr {
            version: self.version,
            bits: self.bits ^ other.bits,
        })
    }

    /// Bitwise complement, masked to the version's width.
    pub fn not(&self) -> Addr {
        Addr {
            version: self.version,
            bits: !self.bits & self.version.max(),
        }
    }

    /// Unsigned numeric comparison of two same-version addresses.
    pub fn compare(&self, other: &Addr) -> Result<Ordering, CidrError> {
        self.same_version(other)?;
        Ok(self.bits.cmp(&other.bits))
    }
}

impl FromStr for Addr {
    type Err = CidrError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Addr::parse(s)
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_presentation(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn parse_v4() {
        let a = Addr::parse("10.0.0.1").unwrap();
        assert_eq!(a.version(), IpVersion::V4);
        assert_eq!(a.value(), 167772161);
        assert_eq!(a.to_hex(), "0a000001");
        assert_eq!(a.to_string(), "10.0.0.1");

        assert_eq!(Addr::parse("0.0.0.0").unwrap().value(), 0);
        assert_eq!(
            Addr::parse("255.255.255.255").unwrap().value(),
            u32::MAX as u128
        );
    }

    #[test]
    fn parse_v4_rejects() {
        assert!(Addr::parse("256.0.0.1").is_err());
        assert!(Addr::parse("10.0.0").is_err());
        assert!(Addr::parse("10.0.0.1.2").is_err());
        assert!(Addr::parse("10.0.0.1/24").is_err());
        assert!(Addr::parse("").is_err());
        assert!(Addr::parse("hosts").is_err());
    }

    #[test]
    fn parse_v6() {
        let a = Addr::parse("2001:4056::1").unwrap();
        assert_eq!(a.version(), IpVersion::V6);
        assert_eq!(a.to_string(), "2001:4056::1");
        assert_eq!(
            a.to_presentation(true),
            "2001:4056:0000:0000:0000:0000:0000:0001"
        );
        assert_eq!(a.to_hex(), "20014056000000000000000000000001");

        assert!(Addr::parse("2001::4056::1").is_err());
        assert!(Addr::parse("2001:4056::1/96").is_err());
    }

    #[test]
    fn parse_v4_mapped() {
        // embedded dotted form lands in the low 32 bits of a V6 value
        let a = Addr::parse("::10.0.0.1").unwrap();
        assert_eq!(a.version(), IpVersion::V6);
        assert_eq!(a.value(), 167772161);
        assert_eq!(a.to_string(), "::10.0.0.1");
        // the dotted rendering applies whenever the upper 96 bits are zero
        assert_eq!(Addr::parse("::1").unwrap().to_string(), "::0.0.0.1");
        assert_eq!(Addr::parse("::").unwrap().to_string(), "::");
    }

    #[test]
    fn hex_width_and_case() {
        let a = Addr::from_hex("0A000001").unwrap();
        assert_eq!(a.version(), IpVersion::V4);
        assert_eq!(a.to_hex(), "0a000001");

        let b = Addr::from_hex("20014056000000000000000000000001").unwrap();
        assert_eq!(b.version(), IpVersion::V6);
        assert_eq!(b.to_string(), "2001:4056::1");

        // only the two exact widths are accepted
        assert!(Addr::from_hex("a000001").is_err());
        assert!(Addr::from_hex("0a0000010").is_err());
        assert!(Addr::from_hex("+a000001").is_err());
        assert!(Addr::from_hex("0a00000g").is_err());
    }

    #[test]
    fn binary_padding() {
        let a = Addr::parse("10.0.0.1").unwrap();
        assert_eq!(a.to_binary(None), format!("1010{}1", "0".repeat(23)));
        assert_eq!(a.to_binary(Some(32)).len(), 32);
        assert_eq!(
            a.to_binary(Some(32)),
            "00001010000000000000000000000001"
        );
        // pad below the natural width is ignored rather than truncating
        assert_eq!(a.to_binary(Some(4)), a.to_binary(None));

        let one = Addr::new(IpVersion::V6, 1).unwrap();
        assert_eq!(one.to_binary(None), "1");
        assert_eq!(one.to_binary(Some(128)).len(), 128);
    }

    #[test]
    fn binary_parse() {
        assert_eq!(
            Addr::from_binary("1010", IpVersion::V4).unwrap().value(),
            10
        );
        assert!(Addr::from_binary("", IpVersion::V4).is_err());
        assert!(Addr::from_binary("10102", IpVersion::V4).is_err());
        // 33 significant bits do not fit a V4 address
        let wide = "1".repeat(33);
        assert!(Addr::from_binary(&wide, IpVersion::V4).is_err());
        assert!(Addr::from_binary(&wide, IpVersion::V6).is_ok());
    }

    #[test]
    fn bitwise_width() {
        let a = Addr::parse("10.0.0.1").unwrap();
        let m = Addr::parse("255.255.255.0").unwrap();
        assert_eq!(a.and(&m).unwrap().to_string(), "10.0.0.0");
        assert_eq!(a.or(&m.not()).unwrap().to_string(), "10.0.0.255");
        assert_eq!(a.xor(&a).unwrap().value(), 0);
        // complement stays inside 32 bits for V4
        assert_eq!(Addr::parse("0.0.0.0").unwrap().not().value(), u32::MAX as u128);
    }

    #[test]
    fn mixed_versions_rejected() {
        let four = Addr::parse("10.0.0.1").unwrap();
        let six = Addr::parse("::1").unwrap();
        assert_eq!(
            four.and(&six).unwrap_err(),
            CidrError::VersionMismatch(IpVersion::V4, IpVersion::V6)
        );
        assert!(four.compare(&six).is_err());
        assert_eq!(four.compare(&four).unwrap(), Ordering::Equal);
    }

    #[test]
    fn value_width_checked() {
        assert!(Addr::new(IpVersion::V4, 1u128 << 32).is_err());
        assert!(Addr::new(IpVersion::V4, u32::MAX as u128).is_ok());
        assert!(Addr::new(IpVersion::V6, u128::MAX).is_ok());
    }

    #[quickcheck]
    fn hex_roundtrip_v4(x: u32) -> bool {
        let a = Addr::new(IpVersion::V4, x as u128).unwrap();
        Addr::from_hex(&a.to_hex()).unwrap() == a
    }

    #[quickcheck]
    fn hex_roundtrip_v6(x: u128) -> bool {
        let a = Addr::new(IpVersion::V6, x).unwrap();
        let hex = a.to_hex();
        hex.len() == 32 && Addr::from_hex(&hex).unwrap() == a
    }

    #[quickcheck]
    fn binary_roundtrip_v6(x: u128) -> bool {
        let a = Addr::new(IpVersion::V6, x).unwrap();
        Addr::from_binary(&a.to_binary(None), IpVersion::V6).unwrap() == a
            && Addr::from_binary(&a.to_binary(Some(128)), IpVersion::V6).unwrap() == a
    }

    #[quickcheck]
    fn presentation_roundtrip_v4(x: u32) -> bool {
        let a = Addr::new(IpVersion::V4, x as u128).unwrap();
        Addr::parse(&a.to_presentation(false)).unwrap() == a
    }

    #[quickcheck]
    fn presentation_roundtrip_v6(x: u128) -> bool {
        let a = Addr::new(IpVersion::V6, x).unwrap();
        Addr::parse(&a.to_presentation(false)).unwrap() == a
            && Addr::parse(&a.to_presentation(true)).unwrap() == a
    }

    #[quickcheck]
    fn not_is_involution(x: u32) -> bool {
        let a = Addr::new(IpVersion::V4, x as u128).unwrap();
        a.not().not() == a && a.not().value() <= IpVersion::V4.max()
    }
}
