//! # Target Address Resolution
//!
//! Determines the IP address of the robot before the link is opened.
//!
//! Two strategies are available:
//! - [`StaticResolver`]: a configured IP literal or hostname
//! - [`NeighborTableResolver`]: looks up a known MAC address in the local
//!   neighbor table (`/proc/net/arp`, or a saved `arp -a` listing)
//!
//! Resolution happens once at startup. A failure is reported as
//! [`TeleopError::ResolutionFailure`] and is never replaced by a default.

use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::LinkConfig;
use crate::error::{Result, TeleopError};

/// Source of the link's target address
#[cfg_attr(test, mockall::automock)]
pub trait AddressResolver: Send + Sync {
    /// Resolve the current target address
    ///
    /// # Errors
    ///
    /// Returns `ResolutionFailure` if no address can be determined
    fn resolve(&self) -> Result<IpAddr>;
}

/// Resolves a fixed host: an IP literal, or a name via the system resolver
#[derive(Debug, Clone)]
pub struct StaticResolver {
    host: String,
}

impl StaticResolver {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }
}

impl AddressResolver for StaticResolver {
    fn resolve(&self) -> Result<IpAddr> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(TeleopError::ResolutionFailure("No host configured".to_string()));
        }
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(ip);
        }

        let mut addrs = (host, 0).to_socket_addrs().map_err(|e| {
            TeleopError::ResolutionFailure(format!("Failed to resolve '{}': {}", host, e))
        })?;
        let addr = addrs.next().ok_or_else(|| {
            TeleopError::ResolutionFailure(format!("'{}' resolved to no addresses", host))
        })?;
        debug!("Resolved {} to {}", host, addr.ip());
        Ok(addr.ip())
    }
}

/// Finds the IPv4 address currently bound to a MAC address
#[derive(Debug, Clone)]
pub struct NeighborTableResolver {
    table: PathBuf,
    mac: String,
}

impl NeighborTableResolver {
    /// # Arguments
    ///
    /// * `table` - Neighbor table file (e.g., "/proc/net/arp")
    /// * `mac` - Hardware address, `:` or `-` separated, any case
    pub fn new(table: impl AsRef<Path>, mac: impl Into<String>) -> Self {
        Self {
            table: table.as_ref().to_path_buf(),
            mac: mac.into(),
        }
    }
}

impl AddressResolver for NeighborTableResolver {
    fn resolve(&self) -> Result<IpAddr> {
        let text = fs::read_to_string(&self.table).map_err(|e| {
            TeleopError::ResolutionFailure(format!(
                "Failed to read neighbor table {}: {}",
                self.table.display(),
                e
            ))
        })?;

        let ip = parse_neighbor_table(&text, &self.mac).ok_or_else(|| {
            TeleopError::ResolutionFailure(format!(
                "MAC address {} not found in {}",
                self.mac,
                self.table.display()
            ))
        })?;
        info!("Resolved {} to {}", self.mac, ip);
        Ok(IpAddr::V4(ip))
    }
}

fn normalize_mac(mac: &str) -> String {
    mac.trim().to_ascii_lowercase().replace('-', ":")
}

/// Find the IPv4 address on the neighbor table line containing `mac`
///
/// Works on both the Linux `/proc/net/arp` format and `arp -a` output
/// (`host (192.168.1.20) at aa:bb:cc:dd:ee:ff ...`). MAC comparison ignores
/// case and accepts `-` separators on either side.
///
/// # Returns
///
/// * `Some(ip)` - First IPv4 address on the first matching line
/// * `None` - No line contains the MAC, or that line has no IPv4 address
///
/// # Examples
///
/// ```
/// use std::net::Ipv4Addr;
/// use mecanum_teleop::link::resolver::parse_neighbor_table;
///
/// let table = "IP address       HW type     Flags       HW address            Mask     Device\n\
///              192.168.1.20     0x1         0x2         aa:bb:cc:dd:ee:ff     *        wlan0\n";
/// assert_eq!(
///     parse_neighbor_table(table, "AA-BB-CC-DD-EE-FF"),
///     Some(Ipv4Addr::new(192, 168, 1, 20))
/// );
/// ```
pub fn parse_neighbor_table(text: &str, mac: &str) -> Option<Ipv4Addr> {
    let needle = normalize_mac(mac);
    if needle.is_empty() {
        return None;
    }

    let line = text
        .lines()
        .find(|line| normalize_mac(line).contains(&needle))?;

    line.split_whitespace()
        .map(|token| token.trim_matches(|c| c == '(' || c == ')'))
        .find_map(|token| token.parse::<Ipv4Addr>().ok())
}

/// Pick the resolver for a link configuration
///
/// A non-empty `mac_address` selects the neighbor table; otherwise `host`
/// is used.
pub fn resolver_for(config: &LinkConfig) -> Box<dyn AddressResolver> {
    if config.mac_address.trim().is_empty() {
        Box::new(StaticResolver::new(config.host.clone()))
    } else {
        Box::new(NeighborTableResolver::new(
            &config.neighbor_table,
            config.mac_address.clone(),
        ))
    }
}

/// Resolve the robot's socket address on `port`
///
/// # Errors
///
/// Propagates the resolver's `ResolutionFailure`
pub fn resolve_target(resolver: &dyn AddressResolver, port: u16) -> Result<SocketAddr> {
    let target = SocketAddr::new(resolver.resolve()?, port);
    info!("Robot at {}", target);
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const PROC_ARP: &str = "\
IP address       HW type     Flags       HW address            Mask     Device
192.168.1.1      0x1         0x2         10:20:30:40:50:60     *        wlan0
192.168.1.42     0x1         0x2         dc:a6:32:01:02:03     *        wlan0
";

    const ARP_A_WINDOWS: &str = "\
Interface: 192.168.1.5 --- 0x4
  Internet Address      Physical Address      Type
  192.168.1.1           10-20-30-40-50-60     dynamic
  192.168.1.42          dc-a6-32-01-02-03     dynamic
";

    const ARP_A_UNIX: &str = "\
router (192.168.1.1) at 10:20:30:40:50:60 [ether] on wlan0
raspberrypi (192.168.1.42) at dc:a6:32:01:02:03 [ether] on wlan0
";

    // ==================== Neighbor Table Parsing Tests ====================

    #[test]
    fn test_parse_proc_net_arp() {
        assert_eq!(
            parse_neighbor_table(PROC_ARP, "dc:a6:32:01:02:03"),
            Some(Ipv4Addr::new(192, 168, 1, 42))
        );
    }

    #[test]
    fn test_parse_dash_separated_listing() {
        assert_eq!(
            parse_neighbor_table(ARP_A_WINDOWS, "dc:a6:32:01:02:03"),
            Some(Ipv4Addr::new(192, 168, 1, 42))
        );
    }

    #[test]
    fn test_parse_parenthesized_address() {
        assert_eq!(
            parse_neighbor_table(ARP_A_UNIX, "DC:A6:32:01:02:03"),
            Some(Ipv4Addr::new(192, 168, 1, 42))
        );
    }

    #[test]
    fn test_parse_missing_mac() {
        assert_eq!(parse_neighbor_table(PROC_ARP, "00:11:22:33:44:55"), None);
        assert_eq!(parse_neighbor_table("", "dc:a6:32:01:02:03"), None);
    }

    #[test]
    fn test_parse_empty_mac_matches_nothing() {
        assert_eq!(parse_neighbor_table(PROC_ARP, ""), None);
    }

    #[test]
    fn test_parse_matching_line_without_ip() {
        let text = "incomplete entry dc:a6:32:01:02:03 on wlan0\n192.168.1.9 other";
        assert_eq!(parse_neighbor_table(text, "dc:a6:32:01:02:03"), None);
    }

    // ==================== Resolver Tests ====================

    #[test]
    fn test_neighbor_table_resolver_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(PROC_ARP.as_bytes()).unwrap();

        let resolver = NeighborTableResolver::new(file.path(), "10:20:30:40:50:60");
        assert_eq!(
            resolver.resolve().unwrap(),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1))
        );
    }

    #[test]
    fn test_neighbor_table_resolver_unknown_mac() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(PROC_ARP.as_bytes()).unwrap();

        let resolver = NeighborTableResolver::new(file.path(), "00:00:00:00:00:01");
        match resolver.resolve() {
            Err(TeleopError::ResolutionFailure(msg)) => assert!(msg.contains("not found")),
            other => panic!("Expected ResolutionFailure, got: {:?}", other),
        }
    }

    #[test]
    fn test_neighbor_table_resolver_missing_file() {
        let resolver = NeighborTableResolver::new("/nonexistent/arp/table", "10:20:30:40:50:60");
        assert!(matches!(
            resolver.resolve(),
            Err(TeleopError::ResolutionFailure(_))
        ));
    }

    #[test]
    fn test_static_resolver_ip_literal() {
        let resolver = StaticResolver::new("10.0.0.7");
        assert_eq!(
            resolver.resolve().unwrap(),
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7))
        );
        let v6 = StaticResolver::new("::1");
        assert_eq!(v6.resolve().unwrap(), "::1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_static_resolver_localhost_name() {
        let ip = StaticResolver::new("localhost").resolve().unwrap();
        assert!(ip.is_loopback());
    }

    #[test]
    fn test_static_resolver_empty_host() {
        assert!(matches!(
            StaticResolver::new("  ").resolve(),
            Err(TeleopError::ResolutionFailure(_))
        ));
    }

    #[test]
    fn test_resolver_for_prefers_mac() {
        let mut config = LinkConfig::default();
        config.host = "10.0.0.9".to_string();
        config.mac_address = String::new();
        assert_eq!(
            resolver_for(&config).resolve().unwrap(),
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 9))
        );

        config.mac_address = "10:20:30:40:50:60".to_string();
        config.neighbor_table = "/nonexistent/arp/table".into();
        assert!(resolver_for(&config).resolve().is_err());
    }

    // ==================== resolve_target Tests ====================

    #[test]
    fn test_resolve_target_attaches_port() {
        let mut resolver = MockAddressResolver::new();
        resolver
            .expect_resolve()
            .times(1)
            .returning(|| Ok(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 42))));

        let target = resolve_target(&resolver, 9999).unwrap();
        assert_eq!(target, "192.168.1.42:9999".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_resolve_target_propagates_failure() {
        let mut resolver = MockAddressResolver::new();
        resolver
            .expect_resolve()
            .times(1)
            .returning(|| Err(TeleopError::ResolutionFailure("offline".to_string())));

        match resolve_target(&resolver, 9999) {
            Err(TeleopError::ResolutionFailure(msg)) => assert_eq!(msg, "offline"),
            other => panic!("Expected ResolutionFailure, got {:?}", other),
        }
    }
}
