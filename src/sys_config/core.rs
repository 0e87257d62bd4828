//! Startup settings, read once from the environment.

use std::env;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;

use thiserror::Error;

use crate::sys_statichost::core::StaticMount;

pub const ENV_ROOTS: &str = "UNIONFS_ROOTS";
pub const ENV_STATIC: &str = "UNIONFS_STATIC";
pub const ENV_BIND: &str = "UNIONFS_BIND";

const DEFAULT_ROOT: &str = "./base";
const DEFAULT_BIND: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Union roots, highest precedence first.
    pub roots: Vec<PathBuf>,
    /// Static mounts in declared order, each with its own fallback extensions.
    pub static_mounts: Vec<StaticMount>,
    pub bind: SocketAddr,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("UNIONFS_ROOTS lists no directories")]
    NoRoots,

    #[error("invalid UNIONFS_BIND value {value:?}: {source}")]
    Bind {
        value: String,
        #[source]
        source: AddrParseError,
    },
}

/// Load from the process environment.
pub fn from_env() -> Result<Config, ConfigError> {
    from_lookup(|key| env::var(key).ok())
}

/// Load from any key lookup; unset keys fall back to defaults.
pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let roots = split_dirs(&lookup(ENV_ROOTS).unwrap_or_else(|| DEFAULT_ROOT.to_string()));
    if roots.is_empty() {
        return Err(ConfigError::NoRoots);
    }

    let static_mounts = lookup(ENV_STATIC)
        .map(|v| split_dirs(&v).into_iter().map(parse_mount).collect())
        .unwrap_or_default();

    let bind_raw = lookup(ENV_BIND).unwrap_or_else(|| DEFAULT_BIND.to_string());
    let bind = bind_raw
        .trim()
        .parse()
        .map_err(|source| ConfigError::Bind { value: bind_raw.clone(), source })?;

    Ok(Config {
        roots,
        static_mounts,
        bind,
    })
}

/// `./web=html` → mount `./web` with `.html` fallback; no `=` means no fallback.
fn parse_mount(entry: PathBuf) -> StaticMount {
    let split = entry
        .to_str()
        .and_then(|raw| raw.rsplit_once('='))
        .map(|(dir, exts)| (PathBuf::from(dir), exts.to_string()));
    let Some((dir, exts)) = split else {
        return StaticMount { dir: entry, extensions: Vec::new() };
    };
    StaticMount {
        dir,
        extensions: exts
            .split(',')
            .map(|ext| ext.trim().trim_start_matches('.'))
            .filter(|ext| !ext.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

fn split_dirs(value: &str) -> Vec<PathBuf> {
    env::split_paths(value)
        .filter(|p| !p.as_os_str().is_empty())
        .collect()
}
