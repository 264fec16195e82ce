// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the site configuration file so that serialization
//! and deserialization stay simple. File I/O is left to the caller to figure
//! out.

use crate::remote::Location;

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    str::FromStr,
};

/// Site configuration layout.
///
/// A site is a single source file in a GitHub repository that holds every
/// published article. The configuration says where that file lives, how to
/// find the records array inside of it, who may touch whose articles, and
/// how to authenticate against GitHub.
///
/// # General Layout
///
/// Four sections, all optional: `[remote]`, `[source]`, `[policy]`, and
/// `[auth]`. Missing sections or keys fall back to their defaults.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Location of the source file.
    pub remote: RemoteSettings,

    /// Shape of the source file.
    pub source: SourceSettings,

    /// Authorization rules.
    pub policy: PolicySettings,

    /// Authentication settings.
    pub auth: AuthSettings,
}

impl FromStr for SiteConfig {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: SiteConfig = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on session file path.
        if let Some(session_file) = config.auth.session_file.take() {
            config.auth.session_file = Some(PathBuf::from(
                shellexpand::full(session_file.to_string_lossy().as_ref())
                    .map_err(ConfigError::ShellExpansion)?
                    .into_owned(),
            ));
        }

        Ok(config)
    }
}

impl Display for SiteConfig {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Where the source file lives.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RemoteSettings {
    /// Repository owner. Defaults to the login of whoever is committing.
    pub owner: Option<String>,

    /// Repository name.
    pub repository: String,

    /// Path of the source file inside the repository.
    pub path: String,

    /// Branch to read from and commit to.
    pub branch: String,

    /// Base URL of the GitHub REST API.
    pub api_url: String,
}

impl RemoteSettings {
    /// Resolve the concrete file location for a caller.
    ///
    /// Uses the configured owner when present, otherwise `caller_login`.
    pub fn location(&self, caller_login: &str) -> Location {
        Location {
            owner: self
                .owner
                .clone()
                .unwrap_or_else(|| caller_login.to_string()),
            repository: self.repository.clone(),
            path: self.path.clone(),
            branch: self.branch.clone(),
        }
    }
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            owner: None,
            repository: "dan-papers".into(),
            path: "constants.ts".into(),
            branch: "main".into(),
            api_url: "https://api.github.com".into(),
        }
    }
}

/// Shape of the source file.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Name of the records array declaration.
    pub marker: String,

    /// Tag given to articles published without any.
    pub default_tag: String,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            marker: "ARTICLES".into(),
            default_tag: "Research".into(),
        }
    }
}

/// Authorization rules.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PolicySettings {
    /// Logins allowed to edit or delete any article.
    pub admins: Vec<String>,

    /// Display name or login whose articles only admins may touch.
    pub site_owner: Option<String>,
}

/// Authentication settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Client ID of the OAuth app used for device flow login.
    pub client_id: Option<String>,

    /// OAuth scopes requested during device flow login.
    pub scope: String,

    /// Where the session credential is stored.
    pub session_file: Option<PathBuf>,
}

impl AuthSettings {
    /// Session file path, if one was configured.
    pub fn session_file(&self) -> Option<&Path> {
        self.session_file.as_deref()
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            scope: "repo user".into(),
            session_file: None,
        }
    }
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
