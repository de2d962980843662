use std::io;
use std::net::IpAddr;

/// One address entry of a network interface.
///
/// An interface with several addresses appears once per address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceRecord {
    pub name: String,
    pub up: bool,
    pub running: bool,
    pub loopback: bool,
    pub address: Option<IpAddr>,
}

impl InterfaceRecord {
    /// Up, running and not loopback.
    pub fn is_usable(&self) -> bool {
        self.up && self.running && !self.loopback
    }
}

pub trait InterfaceSource: Send + Sync {
    /// Enumerate every interface address on the host.
    fn interfaces(&self) -> io::Result<Vec<InterfaceRecord>>;
}

/// Interface list read from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInterfaces;

#[cfg(unix)]
impl InterfaceSource for SystemInterfaces {
    fn interfaces(&self) -> io::Result<Vec<InterfaceRecord>> {
        use nix::net::if_::InterfaceFlags;
        use std::net::Ipv4Addr;

        let addrs = nix::ifaddrs::getifaddrs().map_err(io::Error::from)?;
        Ok(addrs
            .map(|ifa| {
                let address = ifa.address.as_ref().and_then(|storage| {
                    if let Some(v4) = storage.as_sockaddr_in() {
                        Some(IpAddr::V4(Ipv4Addr::from(v4.ip())))
                    } else {
                        storage.as_sockaddr_in6().map(|v6| IpAddr::V6(v6.ip()))
                    }
                });
                InterfaceRecord {
                    name: ifa.interface_name,
                    up: ifa.flags.contains(InterfaceFlags::IFF_UP),
                    running: ifa.flags.contains(InterfaceFlags::IFF_RUNNING),
                    loopback: ifa.flags.contains(InterfaceFlags::IFF_LOOPBACK),
                    address,
                }
            })
            .collect())
    }
}

#[cfg(not(unix))]
impl InterfaceSource for SystemInterfaces {
    fn interfaces(&self) -> io::Result<Vec<InterfaceRecord>> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "interface enumeration is not supported on this platform",
        ))
    }
}

/// Fixed interface list.
#[derive(Debug, Clone, Default)]
pub struct StaticInterfaces {
    records: Vec<InterfaceRecord>,
}

impl StaticInterfaces {
    pub fn new(records: Vec<InterfaceRecord>) -> Self {
        Self { records }
    }
}

impl InterfaceSource for StaticInterfaces {
    fn interfaces(&self) -> io::Result<Vec<InterfaceRecord>> {
        Ok(self.records.clone())
    }
}
