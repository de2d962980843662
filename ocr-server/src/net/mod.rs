//! Local network address discovery.
//!
//! Interface enumeration is platform specific, so it sits behind
//! [`InterfaceSource`]. Platforms without `getifaddrs` (or sandboxes that
//! forbid it) can hand the resolver a [`StaticInterfaces`] list instead.

mod resolver;
mod source;

pub use resolver::{NetworkAddressResolver, NetworkAddressTable};
pub use source::{InterfaceRecord, InterfaceSource, StaticInterfaces, SystemInterfaces};
