// TabSync platform paths
// Where settings.json and the local state database live on each OS.
//
// Linux:   $XDG_CONFIG_HOME/tabsync, $XDG_DATA_HOME/tabsync (XDG defaults otherwise)
// macOS:   ~/Library/Application Support/TabSync for both
// Windows: %APPDATA%/TabSync for both

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

/// Overrides the data directory, e.g. for a browser profile-scoped install.
pub const DATA_DIR_ENV: &str = "TABSYNC_DATA_DIR";

#[cfg(target_os = "linux")]
fn base_dir(xdg_var: &str, home_fallback: &[&str]) -> PathBuf {
    if let Some(xdg) = env::var_os(xdg_var) {
        return PathBuf::from(xdg).join("tabsync");
    }
    let mut dir = PathBuf::from(env::var_os("HOME").unwrap_or_else(|| "/tmp".into()));
    dir.extend(home_fallback);
    dir.join("tabsync")
}

#[cfg(target_os = "macos")]
fn app_support_dir() -> PathBuf {
    PathBuf::from(env::var_os("HOME").unwrap_or_else(|| "/tmp".into()))
        .join("Library")
        .join("Application Support")
        .join("TabSync")
}

#[cfg(target_os = "windows")]
fn roaming_dir() -> PathBuf {
    PathBuf::from(
        env::var_os("APPDATA").unwrap_or_else(|| "C:\\Users\\Default\\AppData\\Roaming".into()),
    )
    .join("TabSync")
}

/// Directory holding `settings.json`.
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        base_dir("XDG_CONFIG_HOME", &[".config"])
    }
    #[cfg(target_os = "macos")]
    {
        app_support_dir()
    }
    #[cfg(target_os = "windows")]
    {
        roaming_dir()
    }
}

fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        base_dir("XDG_DATA_HOME", &[".local", "share"])
    }
    #[cfg(target_os = "macos")]
    {
        app_support_dir()
    }
    #[cfg(target_os = "windows")]
    {
        roaming_dir()
    }
}

fn data_dir_from(override_dir: Option<OsString>) -> PathBuf {
    match override_dir {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => default_data_dir(),
    }
}

/// Directory holding the local state database. `TABSYNC_DATA_DIR` wins when set.
pub fn get_data_dir() -> PathBuf {
    data_dir_from(env::var_os(DATA_DIR_ENV))
}
