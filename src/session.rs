// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Stored login session.
//!
//! Dan Papers keeps the bearer credential of the last login in a small TOML
//! file, along with the login it resolved to. The commit engine itself never
//! touches this file. It only ever sees the [`Credential`] loaded from it.
//!
//! The session file is readable by its owner only on unix systems. A session
//! whose credential the remote host rejects should be discarded, so the user
//! is made to log in again instead of failing the same way on every command.
//!
//! # See Also
//!
//! 1. [`device`] to obtain a credential through the OAuth device flow.

pub mod device;

use crate::remote::Credential;

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

/// Credential of a logged in user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Login the credential resolved to at login time.
    pub login: String,
    token: String,
}

impl Session {
    /// Construct new session.
    pub fn new(login: impl Into<String>, credential: &Credential) -> Self {
        Self {
            login: login.into(),
            token: credential.expose().to_string(),
        }
    }

    /// Bearer credential of this session.
    pub fn credential(&self) -> Credential {
        Credential::new(self.token.clone())
    }

    /// Load session from `path`.
    ///
    /// Returns `None` if nobody is logged in, i.e., the file does not exist.
    ///
    /// # Errors
    ///
    /// - Return [`SessionError::Io`] if the file cannot be read.
    /// - Return [`SessionError::Deserialize`] if the file is not a session.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SessionError::Io {
                    path: path.into(),
                    source,
                })
            }
        };

        debug!("load session from {}", path.display());
        Ok(Some(toml::de::from_str(&text)?))
    }

    /// Save session to `path`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// - Return [`SessionError::Io`] if the file cannot be written.
    /// - Return [`SessionError::Serialize`] if the session cannot be
    ///   serialized.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let io_error = |source| SessionError::Io {
            path: path.into(),
            source,
        };

        if let Some(parent) = path.parent() {
            mkdirp::mkdirp(parent).map_err(io_error)?;
        }

        fs::write(path, toml::ser::to_string(self)?).map_err(io_error)?;
        restrict_permissions(path).map_err(io_error)?;
        info!("session for {} saved to {}", self.login, path.display());

        Ok(())
    }

    /// Discard session stored at `path`.
    ///
    /// Returns whether there was a session to discard.
    ///
    /// # Errors
    ///
    /// - Return [`SessionError::Io`] if the file exists but cannot be removed.
    pub fn discard(path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        match fs::remove_file(path) {
            Ok(()) => {
                info!("session at {} discarded", path.display());
                Ok(true)
            }
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(SessionError::Io {
                path: path.into(),
                source,
            }),
        }
    }

    /// Discard session stored at `path` after the remote rejected it.
    ///
    /// Failure to remove the file is logged rather than returned. Returns
    /// whether a session was discarded.
    pub fn revoke(path: impl AsRef<Path>) -> bool {
        match Self::discard(path) {
            Ok(discarded) => {
                if discarded {
                    warn!("stored session discarded, run `danpapers login` again");
                }
                discarded
            }
            Err(error) => {
                warn!("cannot discard stored session: {error}");
                false
            }
        }
    }
}

impl Debug for Session {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.debug_struct("Session")
            .field("login", &self.login)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Session storage error types.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Session file cannot be accessed.
    #[error("failed to access session file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Session file cannot be parsed.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Session cannot be serialized.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),
}

/// Friendly result alias :3
pub type Result<T, E = SessionError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[sealed_test]
    fn save_load_discard() -> anyhow::Result<()> {
        let path = std::env::current_dir()?.join("state/danpapers/session.toml");
        assert_eq!(Session::load(&path)?, None);

        let session = Session::new("dan", &Credential::new("gho_abc"));
        session.save(&path)?;
        assert_eq!(Session::load(&path)?, Some(session.clone()));
        assert_eq!(session.credential(), Credential::new("gho_abc"));

        assert!(Session::discard(&path)?);
        assert!(!Session::discard(&path)?);
        assert_eq!(Session::load(&path)?, None);

        Ok(())
    }

    #[sealed_test]
    fn revoke_never_fails() -> anyhow::Result<()> {
        let path = std::env::current_dir()?.join("session.toml");
        Session::new("dan", &Credential::new("gho_stale")).save(&path)?;
        assert!(Session::revoke(&path));
        assert!(!Session::revoke(&path));
        assert_eq!(Session::load(&path)?, None);

        let dir = std::env::current_dir()?.join("not-a-file");
        fs::create_dir(&dir)?;
        assert!(!Session::revoke(&dir));
        assert!(dir.is_dir());

        Ok(())
    }

    #[cfg(unix)]
    #[sealed_test]
    fn saved_session_is_owner_only() -> anyhow::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let path = std::env::current_dir()?.join("session.toml");
        Session::new("dan", &Credential::new("gho_abc")).save(&path)?;
        let mode = fs::metadata(&path)?.permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        Ok(())
    }

    #[test]
    fn debug_hides_token() {
        let session = Session::new("dan", &Credential::new("gho_abc"));
        let debug = format!("{session:?}");
        assert!(!debug.contains("gho_abc"));
        assert!(debug.contains("dan"));
    }
}
