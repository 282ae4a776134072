use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Global configuration loaded from `~/.config/bget/config.toml`.
///
/// These are the ambient knobs a batch run rarely changes; the per-run
/// surface (worker count, output directory, bandwidth ceiling, link file)
/// comes from the CLI instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BgetConfig {
    /// Maximum number of jobs accepted but not yet completed before
    /// submission blocks. Effectively unbounded for realistic batches, but
    /// prevents pathological queue growth.
    pub queue_bound: usize,
    /// Floor for the client's total keep-alive connections; the effective
    /// total is raised to the worker count when that is larger.
    pub max_keep_alive_connections: usize,
    /// Seconds an idle keep-alive connection is retained in the pool.
    pub pool_idle_secs: u64,
    /// Seconds a graceful shutdown waits for in-flight jobs before
    /// cancelling the rest.
    pub shutdown_grace_secs: u64,
    /// Maximum redirect hops followed per request.
    pub max_redirects: usize,
}

impl Default for BgetConfig {
    fn default() -> Self {
        Self {
            queue_bound: 100_000,
            max_keep_alive_connections: 50,
            pool_idle_secs: 120,
            shutdown_grace_secs: 60,
            max_redirects: 10,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("bget")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<BgetConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = BgetConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: BgetConfig = toml::from_str(&data)?;
    Ok(cfg)
}
