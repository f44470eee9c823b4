// Error types for the router engine

use std::net::Ipv4Addr;
use thiserror::Error;

/// Main error type for the routing core
#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Malformed IPv4 address: {0}")]
    MalformedAddress(String),

    #[error("Octet {octet} out of range in address {address}")]
    OctetOutOfRange { address: String, octet: i64 },

    #[error("Not an IPv4 address: {0}")]
    InvalidAddress(String),

    #[error("Invalid prefix length: {0}")]
    InvalidPrefixLength(String),

    #[error("Invalid subnet mask: {0}")]
    InvalidSubnetMask(String),

    #[error("No route found for {0}")]
    NoRouteFound(Ipv4Addr),

    #[error("Route service is not initialized")]
    ServiceNotInitialized,

    #[error("Failed to import routes: {0}")]
    RouteImport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using RouterError
pub type RouterResult<T> = Result<T, RouterError>;

impl RouterError {
    /// Convert error to operator-facing message
    pub fn user_message(&self) -> String {
        match self {
            RouterError::MalformedAddress(addr) => {
                format!("'{}' is not a dotted-decimal IPv4 address (a.b.c.d).", addr)
            }
            RouterError::OctetOutOfRange { address, octet } => {
                format!("Octet {} in '{}' must be between 0 and 255.", octet, address)
            }
            RouterError::InvalidAddress(_) => {
                "Only IPv4 addresses are supported.".to_string()
            }
            RouterError::InvalidPrefixLength(_) => {
                "Prefix length must be a number between 0 and 32.".to_string()
            }
            RouterError::InvalidSubnetMask(_) => {
                "Subnet mask must be contiguous leading ones, e.g. 255.255.255.0.".to_string()
            }
            RouterError::NoRouteFound(addr) => {
                format!("No route to {}. Add a matching or default route.", addr)
            }
            RouterError::ServiceNotInitialized => {
                "Route service has not been started.".to_string()
            }
            RouterError::RouteImport(_) => {
                "Could not read routes from the system. Make sure `ip` is installed.".to_string()
            }
            RouterError::Config(_) => {
                "Configuration error. Check your config file or command-line arguments.".to_string()
            }
            RouterError::Io(_) => {
                "File system error. Check paths and permissions.".to_string()
            }
        }
    }

    /// Whether the error came from parsing caller input
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            RouterError::MalformedAddress(_)
                | RouterError::OctetOutOfRange { .. }
                | RouterError::InvalidAddress(_)
                | RouterError::InvalidPrefixLength(_)
                | RouterError::InvalidSubnetMask(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_classification() {
        assert!(RouterError::MalformedAddress("1.2.3".to_string()).is_parse_error());
        assert!(
            RouterError::OctetOutOfRange {
                address: "1.2.3.300".to_string(),
                octet: 300
            }
            .is_parse_error()
        );
        assert!(!RouterError::NoRouteFound(Ipv4Addr::new(8, 8, 8, 8)).is_parse_error());
        assert!(!RouterError::ServiceNotInitialized.is_parse_error());
    }

    #[test]
    fn test_user_message_mentions_address() {
        let err = RouterError::NoRouteFound(Ipv4Addr::new(10, 1, 2, 3));
        assert!(err.user_message().contains("10.1.2.3"));
        assert_eq!(err.to_string(), "No route found for 10.1.2.3");
    }
}
