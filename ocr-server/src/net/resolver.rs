use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use super::source::{InterfaceSource, SystemInterfaces};

/// Finds the first usable IPv4 address of named interfaces.
#[derive(Clone)]
pub struct NetworkAddressResolver {
    source: Arc<dyn InterfaceSource>,
}

impl Default for NetworkAddressResolver {
    fn default() -> Self {
        Self::new(Arc::new(SystemInterfaces))
    }
}

impl NetworkAddressResolver {
    pub fn new(source: Arc<dyn InterfaceSource>) -> Self {
        Self { source }
    }

    /// Map each requested interface to its dotted-decimal IPv4 address.
    ///
    /// The host list is enumerated once. Interfaces that are down, not
    /// running, loopback or without an IPv4 address are left out. A failed
    /// enumeration yields an empty map.
    pub fn resolve<S: AsRef<str>>(&self, interface_names: &[S]) -> BTreeMap<String, String> {
        let records = match self.source.interfaces() {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Unable to enumerate network interfaces");
                return BTreeMap::new();
            }
        };

        let mut resolved = BTreeMap::new();
        for name in interface_names {
            let name = name.as_ref();
            let ipv4 = records
                .iter()
                .filter(|r| r.name == name && r.is_usable())
                .find_map(|r| match r.address {
                    Some(IpAddr::V4(addr)) => Some(addr),
                    _ => None,
                });

            match ipv4 {
                Some(addr) => {
                    resolved.insert(name.to_string(), addr.to_string());
                }
                None => debug!(interface = name, "No usable IPv4 address"),
            }
        }
        resolved
    }
}

/// Interface name to IPv4 address table shared with observers.
///
/// Only [`NetworkAddressTable::refresh`] writes it, and it always replaces
/// the whole table.
#[derive(Clone, Default)]
pub struct NetworkAddressTable {
    entries: Arc<RwLock<BTreeMap<String, String>>>,
}

impl NetworkAddressTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refresh<S: AsRef<str>>(
        &self,
        resolver: &NetworkAddressResolver,
        interface_names: &[S],
    ) -> BTreeMap<String, String> {
        let fresh = resolver.resolve(interface_names);
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *entries = fresh.clone();
        fresh
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::source::{InterfaceRecord, StaticInterfaces};
    use std::io;

    fn record(name: &str, up: bool, running: bool, loopback: bool, addr: &str) -> InterfaceRecord {
        InterfaceRecord {
            name: name.to_string(),
            up,
            running,
            loopback,
            address: Some(addr.parse().unwrap()),
        }
    }

    struct FailingSource;

    impl InterfaceSource for FailingSource {
        fn interfaces(&self) -> io::Result<Vec<InterfaceRecord>> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "sandboxed"))
        }
    }

    #[test]
    fn test_resolve_skips_down_interfaces() {
        let resolver = NetworkAddressResolver::new(Arc::new(StaticInterfaces::new(vec![
            record("en0", true, true, false, "192.168.1.20"),
            record("en1", false, false, false, "10.0.0.5"),
        ])));

        let resolved = resolver.resolve(&["en0", "en1"]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved.get("en0").map(String::as_str), Some("192.168.1.20"));
    }

    #[test]
    fn test_resolve_takes_first_ipv4_and_ignores_ipv6() {
        let resolver = NetworkAddressResolver::new(Arc::new(StaticInterfaces::new(vec![
            record("en0", true, true, false, "fe80::1"),
            record("en0", true, true, false, "192.168.1.20"),
            record("en0", true, true, false, "192.168.1.21"),
        ])));

        let resolved = resolver.resolve(&["en0"]);
        assert_eq!(resolved["en0"], "192.168.1.20");
    }

    #[test]
    fn test_resolve_skips_loopback_and_not_running() {
        let resolver = NetworkAddressResolver::new(Arc::new(StaticInterfaces::new(vec![
            record("lo0", true, true, true, "127.0.0.1"),
            record("en2", true, false, false, "172.16.0.2"),
        ])));

        assert!(resolver.resolve(&["lo0", "en2"]).is_empty());
    }

    #[test]
    fn test_enumeration_failure_yields_empty_map() {
        let resolver = NetworkAddressResolver::new(Arc::new(FailingSource));
        assert!(resolver.resolve(&["en0"]).is_empty());
    }

    #[test]
    fn test_table_refresh_replaces_old_entries() {
        let table = NetworkAddressTable::new();
        let first = NetworkAddressResolver::new(Arc::new(StaticInterfaces::new(vec![
            record("en0", true, true, false, "192.168.1.20"),
        ])));
        table.refresh(&first, &["en0", "en1"]);
        assert_eq!(table.snapshot().len(), 1);

        let second = NetworkAddressResolver::new(Arc::new(StaticInterfaces::new(vec![
            record("en1", true, true, false, "10.0.0.9"),
        ])));
        table.refresh(&second, &["en0", "en1"]);

        let snapshot = table.snapshot();
        assert!(!snapshot.contains_key("en0"));
        assert_eq!(snapshot["en1"], "10.0.0.9");
    }
}
