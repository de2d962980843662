mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use common::{free_port, hello_provider, init_test_logger, local_config, wait_until};
use ocr_server::config::RecognitionLevel;
use ocr_server::manager::ServerManager;
use ocr_server::net::{InterfaceRecord, NetworkAddressResolver, StaticInterfaces};
use ocr_server::server::{ServerState, ServerSupervisor};
use ocr_server::settings::{Settings, SettingsStore};

fn lan_resolver() -> NetworkAddressResolver {
    NetworkAddressResolver::new(Arc::new(StaticInterfaces::new(vec![InterfaceRecord {
        name: "en0".to_string(),
        up: true,
        running: true,
        loopback: false,
        address: Some("192.168.1.20".parse().unwrap()),
    }])))
}

fn manager(settings: SettingsStore) -> ServerManager {
    let supervisor = ServerSupervisor::new(local_config(free_port()), hello_provider());
    ServerManager::new(
        supervisor,
        lan_resolver(),
        settings,
        vec!["en0".to_string(), "en1".to_string()],
    )
}

fn write_settings(store: &SettingsStore, port: u16, level: &str) {
    store
        .save(&Settings {
            http_port: port,
            recognition_level: level.to_string(),
            ..Settings::default()
        })
        .unwrap();
}

#[tokio::test]
async fn test_start_applies_settings_and_reports_urls() {
    init_test_logger();
    let dir = common::tempfile::tempdir().unwrap();
    let store = SettingsStore::new(dir.path().join("settings.json"));
    let port = free_port();
    write_settings(&store, port, "Fast");

    let manager = manager(store);
    let addr = manager.start_server().await.unwrap();

    assert_eq!(addr.port(), port);
    assert_eq!(manager.status(), "server is running");
    let config = manager.supervisor().config();
    assert_eq!(config.port, port);
    assert_eq!(config.recognition.level, RecognitionLevel::Fast);

    assert_eq!(
        manager.network_addresses().get("en0").map(String::as_str),
        Some("192.168.1.20")
    );
    assert_eq!(
        manager.server_urls(),
        vec![format!("http://192.168.1.20:{port}")]
    );

    manager.stop_server().await;
    assert_eq!(manager.status(), "server stopped");
}

#[tokio::test]
async fn test_start_without_settings_file_keeps_config() {
    init_test_logger();
    let manager = manager(SettingsStore::in_memory());
    let configured = manager.supervisor().config().port;

    let addr = manager.start_server().await.unwrap();
    assert_eq!(addr.port(), configured);
    manager.stop_server().await;
}

#[tokio::test]
async fn test_restart_picks_up_new_settings() {
    init_test_logger();
    let dir = common::tempfile::tempdir().unwrap();
    let store = SettingsStore::new(dir.path().join("settings.json"));
    write_settings(&store, free_port(), "Accurate");

    let manager = manager(store.clone());
    manager.start_server().await.unwrap();

    let new_port = free_port();
    write_settings(&store, new_port, "Fast");
    let addr = manager.restart_server().await.unwrap();

    assert_eq!(addr.port(), new_port);
    assert_eq!(manager.status(), "server is running");
    assert_eq!(manager.supervisor().state(), ServerState::Running);
    assert_eq!(
        manager.server_urls(),
        vec![format!("http://192.168.1.20:{new_port}")]
    );

    manager.stop_server().await;
}

#[tokio::test]
async fn test_bind_failure_sets_failure_status() {
    init_test_logger();
    let blocker = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = blocker.local_addr().unwrap().port();
    let dir = common::tempfile::tempdir().unwrap();
    let store = SettingsStore::new(dir.path().join("settings.json"));
    write_settings(&store, port, "Accurate");

    let manager = manager(store);
    assert!(manager.start_server().await.is_err());
    assert_eq!(manager.status(), "unable to start the server");
    assert_eq!(manager.supervisor().state(), ServerState::Failed);
}

#[tokio::test]
async fn test_invalid_port_in_settings_is_rejected() {
    init_test_logger();
    let dir = common::tempfile::tempdir().unwrap();
    let store = SettingsStore::new(dir.path().join("settings.json"));
    write_settings(&store, 0, "Accurate");

    let manager = manager(store);
    assert!(manager.start_server().await.is_err());
    assert_eq!(manager.status(), "unable to start the server");
    assert_eq!(manager.supervisor().state(), ServerState::Stopped);
}

#[tokio::test]
async fn test_event_listener_tracks_crash_and_recovery() {
    init_test_logger();
    let mut config = local_config(free_port());
    config.restart_delay_ms = 400;
    let manager = ServerManager::new(
        ServerSupervisor::new(config, hello_provider()),
        lan_resolver(),
        SettingsStore::in_memory(),
        vec!["en0".to_string()],
    );
    let cancel = CancellationToken::new();
    let listener = manager.spawn_event_listener(cancel.clone());

    manager.start_server().await.unwrap();
    let mut state = manager.supervisor().watch_state();
    manager.supervisor().kill().await;

    let observed = manager.clone();
    assert!(
        wait_until(Duration::from_secs(2), || {
            let m = observed.clone();
            async move { m.status() == "server stopped - restarting..." }
        })
        .await
    );

    tokio::time::timeout(
        Duration::from_secs(5),
        state.wait_for(|s| *s == ServerState::Running),
    )
    .await
    .unwrap()
    .unwrap();

    assert!(
        wait_until(Duration::from_secs(2), || {
            let m = observed.clone();
            async move { m.status() == "server is running" }
        })
        .await
    );
    assert_eq!(manager.server_urls().len(), 1);

    cancel.cancel();
    listener.await.unwrap();
    manager.stop_server().await;
}

#[tokio::test]
async fn test_new_manager_reports_supervisor_status() {
    init_test_logger();
    let supervisor = ServerSupervisor::new(local_config(free_port()), hello_provider());
    supervisor.set_auto_restart(false);
    supervisor.start().await.unwrap();
    supervisor.kill().await;

    let mut state = supervisor.watch_state();
    tokio::time::timeout(
        Duration::from_secs(2),
        state.wait_for(|s| *s == ServerState::Failed),
    )
    .await
    .unwrap()
    .unwrap();

    let manager = ServerManager::new(
        supervisor,
        lan_resolver(),
        SettingsStore::in_memory(),
        vec!["en0".to_string()],
    );
    assert_eq!(manager.status(), "server stopped");
}
