// IPv4 address codec: dotted-decimal / octets <-> u32

use std::net::{IpAddr, Ipv4Addr};

use super::SubnetMask;
use crate::error::{RouterError, RouterResult};

/// Pack an address into its big-endian integer form
pub fn encode(address: IpAddr) -> RouterResult<u32> {
    match address {
        IpAddr::V4(v4) => Ok(encode_v4(v4)),
        IpAddr::V6(v6) => Err(RouterError::InvalidAddress(v6.to_string())),
    }
}

pub fn encode_v4(address: Ipv4Addr) -> u32 {
    let [o0, o1, o2, o3] = address.octets();
    pack(o0, o1, o2, o3)
}

/// Pack a raw octet slice; anything but four bytes is rejected
pub fn encode_octets(octets: &[u8]) -> RouterResult<u32> {
    match octets {
        [o0, o1, o2, o3] => Ok(pack(*o0, *o1, *o2, *o3)),
        _ => Err(RouterError::InvalidAddress(format!("{:?}", octets))),
    }
}

fn pack(o0: u8, o1: u8, o2: u8, o3: u8) -> u32 {
    ((o0 as u32) << 24) | ((o1 as u32) << 16) | ((o2 as u32) << 8) | o3 as u32
}

pub fn decode(num: u32) -> Ipv4Addr {
    let mut octets = [0u8; 4];
    let mut rest = num;
    for i in 0..4 {
        octets[3 - i] = (rest & 0xFF) as u8;
        rest >>= 8;
    }
    Ipv4Addr::from(octets)
}

/// Parse `a.b.c.d` into its integer form
pub fn parse_dotted(address: &str) -> RouterResult<u32> {
    let parts: Vec<&str> = address.split('.').collect();
    if parts.len() != 4 {
        return Err(RouterError::MalformedAddress(address.to_string()));
    }

    let mut num = 0u32;
    for part in parts {
        let octet: i64 = part
            .parse()
            .map_err(|_| RouterError::MalformedAddress(address.to_string()))?;
        if !(0..=255).contains(&octet) {
            return Err(RouterError::OctetOutOfRange {
                address: address.to_string(),
                octet,
            });
        }
        num = (num << 8) | octet as u32;
    }

    Ok(num)
}

/// Parse `a.b.c.d/len`; a bare address is treated as a host route
pub fn parse_cidr(cidr: &str) -> RouterResult<(u32, SubnetMask)> {
    let (address, prefix) = match cidr.split_once('/') {
        Some((address, prefix)) => (address, Some(prefix)),
        None => (cidr, None),
    };

    let address = parse_dotted(address)?;
    let mask = match prefix {
        Some(prefix) => {
            let prefix_len: u8 = prefix
                .parse()
                .map_err(|_| RouterError::InvalidPrefixLength(prefix.to_string()))?;
            SubnetMask::from_prefix_len(prefix_len)?
        }
        None => SubnetMask::HOST,
    };

    Ok((address, mask))
}
