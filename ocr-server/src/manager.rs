//! Front end for a consuming UI.
//!
//! [`ServerManager`] applies persisted settings before each (re)start, keeps
//! a human-readable status line and the table of addresses the server can be
//! reached on.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::net::{NetworkAddressResolver, NetworkAddressTable};
use crate::server::{
    ServerState, ServerSupervisor, STATUS_RESTARTING, STATUS_RUNNING, STATUS_START_FAILED,
    STATUS_STOPPED,
};
use crate::settings::SettingsStore;

#[derive(Clone)]
pub struct ServerManager {
    supervisor: ServerSupervisor,
    resolver: NetworkAddressResolver,
    settings: SettingsStore,
    interfaces: Arc<Vec<String>>,
    addresses: NetworkAddressTable,
    status: Arc<RwLock<String>>,
}

impl ServerManager {
    pub fn new(
        supervisor: ServerSupervisor,
        resolver: NetworkAddressResolver,
        settings: SettingsStore,
        interfaces: Vec<String>,
    ) -> Self {
        let status = supervisor.status().to_string();
        Self {
            supervisor,
            resolver,
            settings,
            interfaces: Arc::new(interfaces),
            addresses: NetworkAddressTable::new(),
            status: Arc::new(RwLock::new(status)),
        }
    }

    pub fn supervisor(&self) -> &ServerSupervisor {
        &self.supervisor
    }

    pub fn status(&self) -> String {
        self.status
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_status(&self, status: &str) {
        *self
            .status
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = status.to_string();
    }

    fn apply_settings(&self) -> Result<()> {
        let patch = self.settings.patch();
        if !patch.is_empty() {
            self.supervisor.configure(&patch)?;
        }
        Ok(())
    }

    /// Apply settings, start the listener and refresh the address table.
    pub async fn start_server(&self) -> Result<SocketAddr> {
        let started = match self.apply_settings() {
            Ok(()) => self.supervisor.start().await,
            Err(e) => Err(e),
        };
        self.finish_start(started)
    }

    pub async fn stop_server(&self) {
        self.supervisor.stop().await;
        self.set_status(STATUS_STOPPED);
    }

    /// Report a restart, wait the configured delay, re-read settings and
    /// restart the listener.
    pub async fn restart_server(&self) -> Result<SocketAddr> {
        self.set_status(STATUS_RESTARTING);
        let delay = self.supervisor.config().restart_delay();
        debug!(delay_ms = delay.as_millis() as u64, "Waiting before restart");
        tokio::time::sleep(delay).await;

        let restarted = match self.apply_settings() {
            Ok(()) => self.supervisor.restart().await,
            Err(e) => Err(e),
        };
        self.finish_start(restarted)
    }

    fn finish_start(&self, outcome: Result<SocketAddr>) -> Result<SocketAddr> {
        match outcome {
            Ok(addr) => {
                self.set_status(STATUS_RUNNING);
                self.refresh_network_addresses();
                for url in self.server_urls() {
                    info!(%url, "Server reachable");
                }
                Ok(addr)
            }
            Err(e) => {
                warn!(error = %e, "Unable to start the server");
                self.set_status(STATUS_START_FAILED);
                Err(e)
            }
        }
    }

    pub fn network_addresses(&self) -> BTreeMap<String, String> {
        self.addresses.snapshot()
    }

    pub fn refresh_network_addresses(&self) -> BTreeMap<String, String> {
        self.addresses.refresh(&self.resolver, self.interfaces.as_slice())
    }

    /// `http://<ip>:<port>` for every resolved interface, in interface name
    /// order.
    pub fn server_urls(&self) -> Vec<String> {
        let port = self
            .supervisor
            .local_addr()
            .map(|addr| addr.port())
            .unwrap_or_else(|| self.supervisor.config().port);

        self.addresses
            .snapshot()
            .values()
            .map(|ip| format!("http://{ip}:{port}"))
            .collect()
    }

    /// Mirror supervisor events into the status line and refresh addresses
    /// whenever the listener comes (back) up.
    pub fn spawn_event_listener(&self, cancel_token: CancellationToken) -> JoinHandle<()> {
        let manager = self.clone();
        let mut events = self.supervisor.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => {
                        debug!("Server event listener shutting down");
                        break;
                    }
                    received = events.recv() => match received {
                        Ok(event) => {
                            manager.set_status(&event.status);
                            if event.state == ServerState::Running {
                                manager.refresh_network_addresses();
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Server event listener lagged");
                            manager.set_status(manager.supervisor.status());
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OcrConfig, ServerConfig};
    use crate::net::{InterfaceRecord, StaticInterfaces};
    use crate::ocr::OcrProvider;

    fn manager_with(addresses: &[(&str, &str)]) -> ServerManager {
        let records = addresses
            .iter()
            .map(|(name, ip)| InterfaceRecord {
                name: name.to_string(),
                up: true,
                running: true,
                loopback: false,
                address: Some(ip.parse().unwrap()),
            })
            .collect();
        let supervisor = ServerSupervisor::new(
            ServerConfig {
                port: 8123,
                ..ServerConfig::default()
            },
            OcrProvider::unavailable("test", &OcrConfig::default()),
        );
        ServerManager::new(
            supervisor,
            NetworkAddressResolver::new(Arc::new(StaticInterfaces::new(records))),
            SettingsStore::in_memory(),
            vec!["en0".to_string(), "en1".to_string()],
        )
    }

    #[test]
    fn test_initial_status_is_stopped() {
        let manager = manager_with(&[]);
        assert_eq!(manager.status(), "server stopped");
        assert!(manager.network_addresses().is_empty());
    }

    #[test]
    fn test_server_urls_use_configured_port_when_stopped() {
        let manager = manager_with(&[("en0", "192.168.1.20"), ("en1", "10.0.0.5")]);
        manager.refresh_network_addresses();
        assert_eq!(
            manager.server_urls(),
            vec![
                "http://192.168.1.20:8123".to_string(),
                "http://10.0.0.5:8123".to_string()
            ]
        );
    }

    #[test]
    fn test_refresh_only_keeps_configured_interfaces() {
        let manager = manager_with(&[("en0", "192.168.1.20"), ("wlan9", "10.1.1.1")]);
        let table = manager.refresh_network_addresses();
        assert_eq!(table.len(), 1);
        assert_eq!(manager.network_addresses(), table);
    }
}
