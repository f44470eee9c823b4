// Route lookup engine with longest prefix matching

use std::net::Ipv4Addr;

use super::{codec, RouteEntry, RouteTable};
use crate::error::{RouterError, RouterResult};

/// Pluggable route selection policy.
///
/// A matcher sees the whole table snapshot and picks the route for a
/// destination. Its answer is returned to the caller as is.
pub trait RouteMatcher {
    fn match_route(&self, routes: &[RouteEntry], destination: Ipv4Addr) -> Option<RouteEntry>;
}

impl<F> RouteMatcher for F
where
    F: Fn(&[RouteEntry], Ipv4Addr) -> Option<RouteEntry>,
{
    fn match_route(&self, routes: &[RouteEntry], destination: Ipv4Addr) -> Option<RouteEntry> {
        self(routes, destination)
    }
}

/// Longest prefix wins; on equal prefixes the lowest hop count wins.
///
/// Expects `routes` ordered by prefix length, longest first.
#[derive(Debug, Clone, Copy, Default)]
pub struct LongestPrefixMatch;

impl LongestPrefixMatch {
    pub fn select<'a>(
        &self,
        routes: &'a [RouteEntry],
        destination: Ipv4Addr,
    ) -> Option<&'a RouteEntry> {
        let dest_bits = codec::encode_v4(destination);
        let mut best: Option<&RouteEntry> = None;

        for route in routes {
            if let Some(current) = best {
                // Shorter prefixes can no longer beat the match we hold
                if route.prefix_len() < current.prefix_len() {
                    break;
                }
            }

            if !ip_v4_matches(route, dest_bits) {
                continue;
            }

            match best {
                None => best = Some(route),
                Some(current) if route.hop_count < current.hop_count => best = Some(route),
                _ => {}
            }
        }

        best
    }
}

impl RouteMatcher for LongestPrefixMatch {
    fn match_route(&self, routes: &[RouteEntry], destination: Ipv4Addr) -> Option<RouteEntry> {
        self.select(routes, destination).cloned()
    }
}

fn ip_v4_matches(route: &RouteEntry, dest_bits: u32) -> bool {
    route.subnet_mask.apply(dest_bits) == codec::encode_v4(route.destination_network)
}

/// Lookup over a snapshot of a routing table
pub struct RouteEngine {
    routes: Vec<RouteEntry>,
}

impl RouteEngine {
    pub fn new(routing_table: &RouteTable) -> Self {
        RouteEngine {
            routes: routing_table.get_all_routes(),
        }
    }

    pub fn routes(&self) -> &[RouteEntry] {
        &self.routes
    }

    /// Find the best matching route for a destination
    pub fn lookup(&self, dest: Ipv4Addr) -> Option<&RouteEntry> {
        LongestPrefixMatch.select(&self.routes, dest)
    }

    pub fn lookup_with<M: RouteMatcher + ?Sized>(
        &self,
        dest: Ipv4Addr,
        matcher: &M,
    ) -> Option<RouteEntry> {
        matcher.match_route(&self.routes, dest)
    }
}

impl RouteTable {
    /// Resolve `dest` with longest prefix match and hop-count tie-break
    pub fn default_lookup(&self, dest: Ipv4Addr) -> RouterResult<RouteEntry> {
        let engine = RouteEngine::new(self);
        let route = engine
            .lookup(dest)
            .cloned()
            .ok_or(RouterError::NoRouteFound(dest))?;
        tracing::trace!("Resolved {} via {}", dest, route);
        Ok(route)
    }

    /// Resolve `dest` with a caller-supplied policy
    pub fn custom_lookup<M: RouteMatcher + ?Sized>(
        &self,
        dest: Ipv4Addr,
        matcher: &M,
    ) -> Option<RouteEntry> {
        RouteEngine::new(self).lookup_with(dest, matcher)
    }
}
