//! Shared helpers for the integration suites.

use std::net::TcpListener;
use std::path::Path;

use pyrite_node_lib::NodeConfig;

/// Grab a free loopback port from the OS.
///
/// The listener is dropped before returning, so the port can race with other
/// processes in principle; in practice the suite binds it again immediately.
pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("bind ephemeral port")
        .local_addr()
        .expect("local addr")
        .port()
}

/// Node config rooted in a per-test data directory.
pub fn test_config(port: u16, data_dir: &Path) -> NodeConfig {
    NodeConfig {
        port,
        data_dir: data_dir.to_path_buf(),
        ..NodeConfig::default()
    }
}
