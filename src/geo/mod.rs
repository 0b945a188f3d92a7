//! Coarse IP geolocation
//!
//! The store only needs an opaque, side-effect-free lookup from an IP string
//! to optional location fields. The production implementation memory-maps a
//! MaxMind GeoLite2/GeoIP2 City database; deployments without a database get
//! the no-op resolver and log bare IPs.

use std::net::IpAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use maxminddb::{geoip2, Mmap, Reader};

/// Location fields attached to a log entry. All optional; lookups that fail
/// simply yield an empty location, never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoLocation {
    /// ISO country code (e.g. "US", "JP")
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub timezone: Option<String>,
}

pub trait GeoResolver: Send + Sync {
    fn resolve(&self, ip: IpAddr) -> Option<GeoLocation>;
}

/// Resolver backed by a memory-mapped MaxMind City database
pub struct MaxmindResolver {
    reader: Arc<Reader<Mmap>>,
}

impl MaxmindResolver {
    pub fn open(path: &str) -> Result<Self> {
        let reader = unsafe { Reader::open_mmap(path) }
            .with_context(|| format!("Failed to open GeoIP database at {}", path))?;
        Ok(Self {
            reader: Arc::new(reader),
        })
    }
}

impl GeoResolver for MaxmindResolver {
    fn resolve(&self, ip: IpAddr) -> Option<GeoLocation> {
        let result = self.reader.lookup(ip).ok()?;
        let city = result.decode::<geoip2::City>().ok()??;

        let mut location = GeoLocation {
            country: city.country.iso_code.map(|s| s.to_string()),
            ..Default::default()
        };
        if let Some(subdivision) = city.subdivisions.first() {
            location.region = subdivision.names.english.map(|s| s.to_string());
        }
        location.city = city.city.names.english.map(|s| s.to_string());
        location.timezone = city.location.time_zone.map(|s| s.to_string());

        Some(location)
    }
}

impl Clone for MaxmindResolver {
    fn clone(&self) -> Self {
        Self {
            reader: self.reader.clone(),
        }
    }
}

/// Resolver used when no GeoIP database is configured
pub struct NoopResolver;

impl GeoResolver for NoopResolver {
    fn resolve(&self, _ip: IpAddr) -> Option<GeoLocation> {
        None
    }
}

/// Strip the IPv6-mapped prefix some runtimes report for IPv4 peers
pub fn normalize_ip(ip: &str) -> &str {
    ip.strip_prefix("::ffff:").unwrap_or(ip)
}

/// Normalize an IP string and resolve it to a location.
///
/// Loopback and private-range addresses short-circuit to a sentinel location
/// without touching the database, matching what the badge UI displays for
/// local traffic.
pub fn locate(resolver: &dyn GeoResolver, ip: &str) -> (String, GeoLocation) {
    let clean = normalize_ip(ip).to_string();

    if clean == "localhost" {
        return (clean, local_sentinel());
    }

    let Ok(addr) = clean.parse::<IpAddr>() else {
        return (clean, GeoLocation::default());
    };

    if is_local(addr) {
        return (clean, local_sentinel());
    }

    let location = resolver.resolve(addr).unwrap_or_default();
    (clean, location)
}

fn local_sentinel() -> GeoLocation {
    GeoLocation {
        country: Some("LOCAL".to_string()),
        city: Some("localhost".to_string()),
        ..Default::default()
    }
}

fn is_local(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_private() || v4.is_link_local(),
        IpAddr::V6(v6) => v6.is_loopback(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maxmind_resolver_invalid_path() {
        assert!(MaxmindResolver::open("/nonexistent/path.mmdb").is_err());
    }

    #[test]
    fn test_normalize_strips_mapped_prefix() {
        assert_eq!(normalize_ip("::ffff:1.2.3.4"), "1.2.3.4");
        assert_eq!(normalize_ip("8.8.8.8"), "8.8.8.8");
        assert_eq!(normalize_ip("::1"), "::1");
    }

    #[test]
    fn test_locate_local_addresses() {
        for ip in ["127.0.0.1", "::1", "::ffff:192.168.1.5", "10.0.0.7", "localhost"] {
            let (_, location) = locate(&NoopResolver, ip);
            assert_eq!(location.country.as_deref(), Some("LOCAL"), "ip {}", ip);
            assert_eq!(location.city.as_deref(), Some("localhost"));
        }
    }

    #[test]
    fn test_locate_public_address_without_database() {
        let (clean, location) = locate(&NoopResolver, "::ffff:8.8.8.8");
        assert_eq!(clean, "8.8.8.8");
        assert_eq!(location, GeoLocation::default());
    }

    #[test]
    fn test_locate_unparseable_input() {
        let (clean, location) = locate(&NoopResolver, "not-an-ip");
        assert_eq!(clean, "not-an-ip");
        assert_eq!(location, GeoLocation::default());
    }
}
