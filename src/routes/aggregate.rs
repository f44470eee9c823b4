// Route aggregation: fold entries that share a next hop into a supernet

use chrono::Utc;

use super::{codec, RouteEntry, RouteSource, SubnetMask};

/// Try to fold `candidate` into `source`.
///
/// Both entries must share a next hop. The two addresses are compared on the
/// shorter of the two prefixes, dropping one trailing bit at a time until they
/// agree. On success `source` is rewritten as the covering supernet and `true`
/// is returned; the caller is expected to drop `candidate`.
pub fn try_merge(source: &mut RouteEntry, candidate: &RouteEntry) -> bool {
    if source.next_hop != candidate.next_hop {
        return false;
    }

    let mut prefix_len = source.prefix_len().min(candidate.prefix_len()) as u32;
    let mut source_bits = shift_right(source.address_as_int, 32 - prefix_len);
    let mut candidate_bits = shift_right(candidate.address_as_int, 32 - prefix_len);

    while prefix_len > 0 && source_bits != candidate_bits {
        source_bits >>= 1;
        candidate_bits >>= 1;
        prefix_len -= 1;
    }

    // A zero-length common prefix would turn the pair into a default route
    if prefix_len == 0 {
        return false;
    }

    let mask = match SubnetMask::from_prefix_len(prefix_len as u8) {
        Ok(mask) => mask,
        Err(_) => return false,
    };

    source.address_as_int = shift_left(source_bits, 32 - prefix_len);
    source.subnet_mask = mask;
    source.destination_network = codec::decode(source.address_as_int);
    source.last_update_time = Utc::now();
    source.source = RouteSource::Merge;

    true
}

/// Run one forward aggregation pass over `routes`.
///
/// Every entry is compared once against each later entry still present.
/// Absorbed entries are removed. This is not iterated to a fixpoint, so some
/// chains of mergeable networks may need a later mutation to fully collapse.
/// Returns the number of entries absorbed.
pub fn aggregate(routes: &mut Vec<RouteEntry>) -> usize {
    if routes.len() <= 1 {
        return 0;
    }

    let mut removed = vec![false; routes.len()];

    for i in 0..routes.len() {
        if removed[i] {
            continue;
        }

        let (head, tail) = routes.split_at_mut(i + 1);
        let source = &mut head[i];

        for (offset, candidate) in tail.iter().enumerate() {
            let j = i + 1 + offset;
            if removed[j] {
                continue;
            }

            if try_merge(source, candidate) {
                tracing::debug!(
                    "Merged route {} (id {}) into {} (id {})",
                    candidate,
                    candidate.id,
                    source,
                    source.id
                );
                removed[j] = true;
            }
        }
    }

    let absorbed = removed.iter().filter(|r| **r).count();
    let mut index = 0;
    routes.retain(|_| {
        let keep = !removed[index];
        index += 1;
        keep
    });

    absorbed
}

fn shift_right(bits: u32, by: u32) -> u32 {
    bits.checked_shr(by).unwrap_or(0)
}

fn shift_left(bits: u32, by: u32) -> u32 {
    bits.checked_shl(by).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn route(cidr: &str, next_hop: &str) -> RouteEntry {
        RouteEntry::from_cidr(cidr, next_hop).unwrap()
    }

    #[test]
    fn test_merge_adjacent_networks() {
        let mut source = route("10.0.0.0/24", "192.168.0.1");
        let candidate = route("10.0.1.0/24", "192.168.0.1");

        assert!(try_merge(&mut source, &candidate));
        assert_eq!(source.destination_network, Ipv4Addr::new(10, 0, 0, 0));
        assert_eq!(source.prefix_len(), 23);
        assert_eq!(source.address_as_int, 0x0A00_0000);
        assert_eq!(source.source, RouteSource::Merge);
    }

    #[test]
    fn test_merge_finds_maximal_common_prefix() {
        let mut source = route("192.192.100.0/24", "1.1.1.1");
        let candidate = route("192.192.1.0/24", "1.1.1.1");

        assert!(try_merge(&mut source, &candidate));
        // 100 = 0110_0100, 1 = 0000_0001: they agree on the top bit only
        assert_eq!(source.prefix_len(), 17);
        assert_eq!(source.destination_network, Ipv4Addr::new(192, 192, 0, 0));
    }

    #[test]
    fn test_merge_covering_network() {
        let mut source = route("10.0.0.0/8", "1.1.1.1");
        let candidate = route("10.20.0.0/16", "1.1.1.1");

        assert!(try_merge(&mut source, &candidate));
        assert_eq!(source.prefix_len(), 8);
        assert_eq!(source.destination_network, Ipv4Addr::new(10, 0, 0, 0));
    }

    #[test]
    fn test_no_merge_with_different_next_hop() {
        let mut source = route("10.0.0.0/24", "192.168.0.1");
        let candidate = route("10.0.1.0/24", "192.168.0.2");
        let before = source.clone();

        assert!(!try_merge(&mut source, &candidate));
        assert_eq!(source, before);
    }

    #[test]
    fn test_no_merge_without_common_prefix() {
        let mut source = route("10.0.0.0/24", "1.1.1.1");
        let candidate = route("192.168.0.0/24", "1.1.1.1");
        let before = source.clone();

        assert!(!try_merge(&mut source, &candidate));
        assert_eq!(source, before);
    }

    #[test]
    fn test_no_merge_with_default_route() {
        let mut source = route("0.0.0.0/0", "1.1.1.1");
        let candidate = route("10.0.0.0/8", "1.1.1.1");

        assert!(!try_merge(&mut source, &candidate));
        assert_eq!(source.prefix_len(), 0);
    }

    #[test]
    fn test_aggregate_pass_removes_absorbed() {
        let mut routes = vec![
            route("10.0.0.0/24", "1.1.1.1"),
            route("172.16.0.0/16", "2.2.2.2"),
            route("10.0.1.0/24", "1.1.1.1"),
        ];

        assert_eq!(aggregate(&mut routes), 1);
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].prefix_len(), 23);
        assert_eq!(routes[1].destination_network, Ipv4Addr::new(172, 16, 0, 0));
    }

    #[test]
    fn test_aggregate_keeps_last_entry() {
        let mut routes = vec![
            route("10.0.0.0/24", "1.1.1.1"),
            route("172.16.0.0/16", "2.2.2.2"),
        ];

        assert_eq!(aggregate(&mut routes), 0);
        assert_eq!(routes.len(), 2);
    }

    #[test]
    fn test_aggregate_skips_other_next_hops() {
        let mut routes = vec![
            route("10.0.2.0/24", "9.9.9.9"),
            route("10.0.0.0/24", "1.1.1.1"),
            route("10.0.1.0/24", "1.1.1.1"),
        ];

        assert_eq!(aggregate(&mut routes), 1);
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].next_hop, Ipv4Addr::new(9, 9, 9, 9));
        assert_eq!(routes[0].prefix_len(), 24);
        assert_eq!(routes[1].prefix_len(), 23);
    }

    #[test]
    fn test_aggregate_grows_source_across_chain() {
        let mut routes = vec![
            route("10.0.0.0/24", "1.1.1.1"),
            route("10.0.1.0/24", "1.1.1.1"),
            route("10.0.2.0/24", "1.1.1.1"),
        ];

        assert_eq!(aggregate(&mut routes), 2);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].destination_network, Ipv4Addr::new(10, 0, 0, 0));
        assert_eq!(routes[0].prefix_len(), 22);
    }
}
