// Routes module - route entries, the routing table and route lookups

pub mod aggregate;
pub mod codec;
pub mod lookup;
pub mod parser;
pub mod table;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

use crate::error::{RouterError, RouterResult};

pub use lookup::{LongestPrefixMatch, RouteEngine, RouteMatcher};
pub use table::RouteTable;

/// A subnet mask stored as its 32-bit form. Always contiguous leading ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SubnetMask(u32);

impl SubnetMask {
    pub const HOST: SubnetMask = SubnetMask(u32::MAX);
    pub const DEFAULT_ROUTE: SubnetMask = SubnetMask(0);

    pub fn from_prefix_len(prefix_len: u8) -> RouterResult<Self> {
        if prefix_len > 32 {
            return Err(RouterError::InvalidPrefixLength(prefix_len.to_string()));
        }
        Ok(SubnetMask(prefix_mask(prefix_len)))
    }

    /// Parse a dotted mask such as `255.255.252.0`
    pub fn from_dotted(mask: &str) -> RouterResult<Self> {
        let bits = codec::parse_dotted(mask)?;
        if bits.leading_ones() + bits.trailing_zeros() != 32 {
            return Err(RouterError::InvalidSubnetMask(mask.to_string()));
        }
        Ok(SubnetMask(bits))
    }

    pub fn prefix_len(&self) -> u8 {
        self.0.leading_ones() as u8
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Zero the host bits of an address
    pub fn apply(&self, address: u32) -> u32 {
        address & self.0
    }
}

fn prefix_mask(prefix_len: u8) -> u32 {
    u32::MAX.checked_shl(32 - prefix_len as u32).unwrap_or(0)
}

impl TryFrom<u8> for SubnetMask {
    type Error = RouterError;

    fn try_from(prefix_len: u8) -> Result<Self, Self::Error> {
        SubnetMask::from_prefix_len(prefix_len)
    }
}

impl From<SubnetMask> for u8 {
    fn from(mask: SubnetMask) -> u8 {
        mask.prefix_len()
    }
}

impl fmt::Display for SubnetMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", codec::decode(self.0))
    }
}

/// Where a route came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RouteSource {
    Static,
    Kernel,
    /// Supernet synthesized by aggregation
    Merge,
}

impl fmt::Display for RouteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RouteSource::Static => "static",
            RouteSource::Kernel => "kernel",
            RouteSource::Merge => "merge",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RouteStatus {
    Active,
    Inactive,
}

/// One forwarding rule.
///
/// `destination_network` is kept masked by `subnet_mask`, and `address_as_int`
/// mirrors it, once the entry has passed through a [`RouteTable`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteEntry {
    pub id: u64,
    pub destination_network: Ipv4Addr,
    pub subnet_mask: SubnetMask,
    pub address_as_int: u32,
    pub next_hop: Ipv4Addr,
    pub outgoing_interface: String,
    pub outgoing_ip: Ipv4Addr,
    pub hop_count: u32,
    pub source: RouteSource,
    pub last_update_time: DateTime<Utc>,
    pub status: RouteStatus,
    pub priority: u32,
    pub bandwidth: u64,
    pub load: u32,
    pub delay: u32,
}

impl RouteEntry {
    pub fn new(destination: Ipv4Addr, subnet_mask: SubnetMask, next_hop: Ipv4Addr) -> Self {
        let mut entry = RouteEntry {
            id: 0,
            destination_network: destination,
            subnet_mask,
            address_as_int: 0,
            next_hop,
            outgoing_interface: String::new(),
            outgoing_ip: Ipv4Addr::UNSPECIFIED,
            hop_count: 0,
            source: RouteSource::Static,
            last_update_time: Utc::now(),
            status: RouteStatus::Active,
            priority: 0,
            bandwidth: 0,
            load: 0,
            delay: 0,
        };
        entry.normalize();
        entry
    }

    /// Build an entry from `a.b.c.d/len` and a dotted next hop.
    ///
    /// Parsing happens here so that bad input never reaches a table.
    pub fn from_cidr(destination: &str, next_hop: &str) -> RouterResult<Self> {
        let (address, mask) = codec::parse_cidr(destination)?;
        let next_hop = codec::decode(codec::parse_dotted(next_hop)?);
        Ok(RouteEntry::new(codec::decode(address), mask, next_hop))
    }

    pub fn with_hop_count(mut self, hop_count: u32) -> Self {
        self.hop_count = hop_count;
        self
    }

    pub fn with_interface(mut self, name: impl Into<String>, outgoing_ip: Ipv4Addr) -> Self {
        self.outgoing_interface = name.into();
        self.outgoing_ip = outgoing_ip;
        self
    }

    pub fn with_source(mut self, source: RouteSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn prefix_len(&self) -> u8 {
        self.subnet_mask.prefix_len()
    }

    /// Whether `address` falls inside this entry's network
    pub fn contains(&self, address: Ipv4Addr) -> bool {
        let network = codec::encode_v4(self.destination_network);
        self.subnet_mask.apply(codec::encode_v4(address)) == network
    }

    /// Mask the destination and refresh `address_as_int`
    pub(crate) fn normalize(&mut self) {
        self.address_as_int = self.subnet_mask.apply(codec::encode_v4(self.destination_network));
        self.destination_network = codec::decode(self.address_as_int);
    }
}

impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} via {}",
            self.destination_network,
            self.prefix_len(),
            self.next_hop
        )?;
        if !self.outgoing_interface.is_empty() {
            write!(f, " dev {}", self.outgoing_interface)?;
        }
        write!(f, " hops {} [{}]", self.hop_count, self.source)
    }
}
