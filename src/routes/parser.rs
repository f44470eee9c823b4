// Import routes from `ip route show` output

use std::net::Ipv4Addr;
use std::path::Path;
use std::process::Command;

use super::{codec, RouteEntry, RouteSource, RouteStatus, SubnetMask};
use crate::error::{RouterError, RouterResult};

/// Read the host's IPv4 routing table
pub fn get_kernel_routes() -> RouterResult<Vec<RouteEntry>> {
    #[cfg(target_os = "linux")]
    return get_kernel_routes_linux();

    #[cfg(not(target_os = "linux"))]
    return Err(RouterError::RouteImport("Unsupported platform".to_string()));
}

#[cfg(target_os = "linux")]
fn get_kernel_routes_linux() -> RouterResult<Vec<RouteEntry>> {
    // Try using `ip -json -4 route show` first
    let output = Command::new("ip")
        .args(["-json", "-4", "route", "show"])
        .output()
        .map_err(|e| RouterError::RouteImport(format!("Failed to execute ip command: {}", e)))?;

    if output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        return parse_ip_json(&stdout);
    }

    // Fallback to parsing `ip -4 route show` (non-JSON)
    let output = Command::new("ip")
        .args(["-4", "route", "show"])
        .output()
        .map_err(|e| RouterError::RouteImport(format!("Failed to execute ip command: {}", e)))?;

    if !output.status.success() {
        return Err(RouterError::RouteImport("ip route show exited with an error".to_string()));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_ip_route(&stdout))
}

/// Load a saved `ip route show` dump, JSON or plain text
pub fn load_route_dump(path: &Path) -> RouterResult<Vec<RouteEntry>> {
    let content = std::fs::read_to_string(path)?;
    if content.trim_start().starts_with('[') {
        parse_ip_json(&content)
    } else {
        Ok(parse_ip_route(&content))
    }
}

/// Parse JSON output from `ip -json route show`
pub fn parse_ip_json(json_str: &str) -> RouterResult<Vec<RouteEntry>> {
    let routes: Vec<serde_json::Value> = serde_json::from_str(json_str)
        .map_err(|e| RouterError::RouteImport(format!("Failed to parse JSON: {}", e)))?;

    let mut parsed_routes = Vec::new();

    for route in routes {
        let destination = route
            .get("dst")
            .and_then(|v| v.as_str())
            .unwrap_or("default");

        let gateway = route.get("gateway").and_then(|v| v.as_str());
        let prefsrc = route.get("prefsrc").and_then(|v| v.as_str());

        let interface = route
            .get("dev")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        let metric = route
            .get("metric")
            .and_then(|v| v.as_u64())
            .map(saturate_metric)
            .unwrap_or(0);

        let linkdown = route
            .get("flags")
            .and_then(|v| v.as_array())
            .is_some_and(|flags| flags.iter().any(|f| f.as_str() == Some("linkdown")));

        match kernel_route(destination, gateway, prefsrc, interface, metric)
            .map(|entry| mark_linkdown(entry, linkdown))
        {
            Ok(entry) => parsed_routes.push(entry),
            Err(e) => tracing::warn!("Skipping route {}: {}", destination, e),
        }
    }

    Ok(parsed_routes)
}

/// Parse plain `ip route show` output. Lines that are not IPv4 unicast
/// routes are skipped.
pub fn parse_ip_route(output: &str) -> Vec<RouteEntry> {
    let mut routes = Vec::new();

    for line in output.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let destination = match parts.first() {
            Some(dest) => *dest,
            None => continue,
        };

        let mut gateway = None;
        let mut prefsrc = None;
        let mut interface = "";
        let mut metric = 0;
        let mut linkdown = false;

        let mut i = 1;
        while i < parts.len() {
            match (parts[i], parts.get(i + 1)) {
                ("via", Some(gw)) => {
                    gateway = Some(*gw);
                    i += 2;
                }
                ("dev", Some(iface)) => {
                    interface = *iface;
                    i += 2;
                }
                ("src", Some(src)) => {
                    prefsrc = Some(*src);
                    i += 2;
                }
                ("metric", Some(m)) => {
                    metric = m.parse::<u64>().map(saturate_metric).unwrap_or(0);
                    i += 2;
                }
                ("linkdown", _) => {
                    linkdown = true;
                    i += 1;
                }
                _ => {
                    i += 1;
                }
            }
        }

        match kernel_route(destination, gateway, prefsrc, interface, metric)
            .map(|entry| mark_linkdown(entry, linkdown))
        {
            Ok(entry) => routes.push(entry),
            Err(e) => tracing::warn!("Skipping route line '{}': {}", line.trim(), e),
        }
    }

    routes
}

fn saturate_metric(metric: u64) -> u32 {
    u32::try_from(metric).unwrap_or(u32::MAX)
}

/// Routes over a carrier-less link are kept but flagged inactive
fn mark_linkdown(mut entry: RouteEntry, linkdown: bool) -> RouteEntry {
    if linkdown {
        entry.status = RouteStatus::Inactive;
    }
    entry
}

/// Build an entry for one kernel route.
///
/// Connected routes have no gateway; they use the interface address as next
/// hop so that networks on different interfaces never aggregate together.
/// A connected route without a source address has no usable next hop and is
/// rejected.
fn kernel_route(
    destination: &str,
    gateway: Option<&str>,
    prefsrc: Option<&str>,
    interface: &str,
    metric: u32,
) -> RouterResult<RouteEntry> {
    let (address, mask) = match destination {
        "default" => (0, SubnetMask::DEFAULT_ROUTE),
        cidr => codec::parse_cidr(cidr)?,
    };

    let outgoing_ip = match prefsrc {
        Some(src) => codec::decode(codec::parse_dotted(src)?),
        None => Ipv4Addr::UNSPECIFIED,
    };

    let (next_hop, hop_count) = match gateway {
        Some(gw) => (codec::decode(codec::parse_dotted(gw)?), 1),
        None if outgoing_ip.is_unspecified() => {
            return Err(RouterError::RouteImport(format!(
                "connected route on dev {} has no source address",
                interface
            )));
        }
        None => (outgoing_ip, 0),
    };

    Ok(RouteEntry::new(codec::decode(address), mask, next_hop)
        .with_interface(interface, outgoing_ip)
        .with_hop_count(hop_count)
        .with_priority(metric)
        .with_source(RouteSource::Kernel))
}
