//! OSC address grammar validation and the `udp!<host>!<port>` transport URI.

use std::net::IpAddr;
use std::str::FromStr;

use rme_core::{ErrorKind, Result, RmeError};

/// A parsed `udp!<host>!<port>` transport address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressUri {
    pub host: IpAddr,
    pub port: u16,
}

impl AddressUri {
    /// Whether `host` is an IPv4 multicast address (`224.0.0.0/4`) or an
    /// IPv6 link-local unicast address.
    pub fn is_multicast_or_link_local(&self) -> bool {
        match self.host {
            IpAddr::V4(v4) => v4.is_multicast(),
            IpAddr::V6(v6) => v6.is_unicast_link_local(),
        }
    }
}

impl FromStr for AddressUri {
    type Err = RmeError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split('!');
        let scheme = parts.next().unwrap_or_default();
        let host = parts.next().ok_or_else(|| {
            RmeError::new(ErrorKind::Config, "AddressUri::parse", "missing host segment")
        })?;
        let port = parts.next().ok_or_else(|| {
            RmeError::new(ErrorKind::Config, "AddressUri::parse", "missing port segment")
        })?;
        if parts.next().is_some() {
            return Err(RmeError::new(
                ErrorKind::Config,
                "AddressUri::parse",
                "too many `!`-separated segments",
            ));
        }
        if scheme != "udp" {
            return Err(RmeError::new(
                ErrorKind::Config,
                "AddressUri::parse",
                "only the udp scheme is supported",
            ));
        }
        let host: IpAddr = host.parse().map_err(|_| {
            RmeError::new(ErrorKind::Config, "AddressUri::parse", "invalid host address")
        })?;
        let port: u16 = port.parse().map_err(|_| {
            RmeError::new(ErrorKind::Config, "AddressUri::parse", "invalid port number")
        })?;
        Ok(Self { host, port })
    }
}

/// A single address path segment is a run of `[A-Za-z0-9_-]` or a positive
/// decimal integer.
fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Validate an OSC address against the grammar `/segment(/segment)*`.
pub fn validate_address(address: &str) -> Result<()> {
    if !address.starts_with('/') {
        return Err(RmeError::new(
            ErrorKind::Protocol,
            "validate_address",
            "address must start with '/'",
        ));
    }
    let body = &address[1..];
    if body.is_empty() {
        return Err(RmeError::new(
            ErrorKind::Protocol,
            "validate_address",
            "address has no segments",
        ));
    }
    for segment in body.split('/') {
        if !is_valid_segment(segment) {
            return Err(RmeError::new(
                ErrorKind::Protocol,
                "validate_address",
                format!("invalid address segment '{segment}'"),
            ));
        }
    }
    Ok(())
}
