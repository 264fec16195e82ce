// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine where Dan Papers keeps its site configuration and the stored
//! session credential. Nothing here checks whether the returned paths exist.

use std::path::PathBuf;

/// Determine default absolute path to the site configuration file.
///
/// Uses XDG Base Directory path `$XDG_CONFIG_HOME/danpapers/config.toml`.
///
/// # Errors
///
/// - Return [`NoWayHome`] if the configuration directory cannot be
///   determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("danpapers").join("config.toml"))
        .ok_or(NoWayHome)
}

/// Determine default absolute path to the session file.
///
/// Uses XDG Base Directory path `$XDG_DATA_HOME/danpapers/session.toml`.
///
/// # Errors
///
/// - Return [`NoWayHome`] if the data directory cannot be determined.
pub fn default_session_path() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|path| path.join("danpapers").join("session.toml"))
        .ok_or(NoWayHome)
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[cfg(target_os = "linux")]
    #[sealed_test(env = [
        ("XDG_CONFIG_HOME", "/tmp/xdg/config"),
        ("XDG_DATA_HOME", "/tmp/xdg/data")
    ])]
    fn default_paths_follow_xdg() -> anyhow::Result<()> {
        assert_eq!(
            default_config_path()?,
            PathBuf::from("/tmp/xdg/config/danpapers/config.toml")
        );
        assert_eq!(
            default_session_path()?,
            PathBuf::from("/tmp/xdg/data/danpapers/session.toml")
        );

        Ok(())
    }
}
