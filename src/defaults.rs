//! Default values for repo-mirror configuration.

use std::path::{Path, PathBuf};

/// File name looked up in the current directory.
pub const CONFIG_FILE_NAME: &str = "repo-mirror.ini";

/// Workers used when neither the config file nor `--workers` sets a count.
pub const DEFAULT_WORKERS: usize = 1;

/// Returns the configuration file to use when none is given.
///
/// `repo-mirror.ini` in the current directory wins if it exists. Otherwise
/// the platform config directory is used:
/// - Linux: `~/.config/repo-mirror/repo-mirror.ini`
/// - macOS: `~/Library/Application Support/repo-mirror/repo-mirror.ini`
///
/// This can be overridden by the `--config` CLI flag or the
/// `REPO_MIRROR_CONFIG` environment variable.
pub fn default_config_path() -> PathBuf {
    default_config_path_in(Path::new("."))
}

fn default_config_path_in(cwd: &Path) -> PathBuf {
    let local = cwd.join(CONFIG_FILE_NAME);
    if local.is_file() {
        return local;
    }
    match dirs::config_dir() {
        Some(dir) => dir.join("repo-mirror").join(CONFIG_FILE_NAME),
        None => local,
    }
}
