//! Shared, read-only server state built once from the config.

use std::net::SocketAddr;

use tracing::{info, warn};

use crate::sys_config::core::Config;
use crate::sys_statichost::core::StaticMount;
use crate::sys_unionfs::core::RootSet;

#[derive(Debug, Clone)]
pub struct AppState {
    pub roots: RootSet,
    pub mounts: Vec<StaticMount>,
    pub bind: SocketAddr,
}

impl AppState {
    pub fn from_config(config: Config) -> Self {
        for (precedence, root) in config.roots.iter().enumerate() {
            if root.is_dir() {
                info!(precedence, root = %root.display(), "union root");
            } else {
                warn!(precedence, root = %root.display(), "union root is not a directory yet");
            }
        }
        for mount in &config.static_mounts {
            info!(dir = %mount.dir.display(), extensions = ?mount.extensions, "static mount");
        }

        Self {
            roots: RootSet::new(config.roots),
            mounts: config.static_mounts,
            bind: config.bind,
        }
    }
}
