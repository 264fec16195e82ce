// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Remote storage of the source file.
//!
//! The source file lives in a hosted, version-controlled repository. Dan
//! Papers needs exactly three things from that host:
//!
//! 1. __read__ the current file content along with a version token.
//! 2. __write__ new content, on the condition that the file still carries the
//!    version token obtained by the read.
//! 3. __identify__ who a bearer credential belongs to.
//!
//! The condition on write is the only concurrency control there is. If
//! anybody else committed to the file in between, the host rejects the write
//! and the caller has to start over from a fresh read.
//!
//! # See Also
//!
//! 1. [`github`] for the GitHub Contents API implementation.
//! 2. [`memory`] for an in-process implementation.

pub mod github;
pub mod memory;

use std::fmt::{Debug, Display, Formatter, Result as FmtResult};

/// Where the source file lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Owner of the repository.
    pub owner: String,

    /// Name of the repository.
    pub repository: String,

    /// Path of the file inside of the repository.
    pub path: String,

    /// Branch holding the file.
    pub branch: String,
}

impl Display for Location {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(
            fmt,
            "{}/{}/{}@{}",
            self.owner, self.repository, self.path, self.branch
        )
    }
}

/// Opaque content version returned by a read.
///
/// Required as the precondition of the write that follows. Consumed once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionToken(String);

impl VersionToken {
    /// Construct new version token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Treat version token as string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for VersionToken {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(&self.0)
    }
}

/// Content of the source file at some version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub content: String,
    pub version: VersionToken,
}

/// Who a credential belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Unique account name.
    pub login: String,

    /// Name shown on articles. Falls back to the login.
    pub display_name: String,
}

/// Bearer credential for the remote host.
///
/// Never printed through [`Debug`].
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Construct new credential.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw credential text to put on the wire.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl Debug for Credential {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str("Credential(<redacted>)")
    }
}

/// Layer of indirection for remote file access.
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    /// Read current content and version of the file at `location`.
    ///
    /// # Errors
    ///
    /// - Return [`RemoteError::NotFound`] if the file does not exist.
    /// - Return [`RemoteError::Unauthorized`] if the credential is rejected.
    /// - Return [`RemoteError::Forbidden`] if the credential lacks access.
    async fn read(&self, credential: &Credential, location: &Location) -> Result<RemoteFile>;

    /// Write new content if the file still carries `expected` version.
    ///
    /// Returns the version of the newly written content.
    ///
    /// # Errors
    ///
    /// - Return [`RemoteError::VersionConflict`] if the file changed since
    ///   `expected` was read.
    /// - Return [`RemoteError::Unauthorized`], [`RemoteError::Forbidden`], or
    ///   [`RemoteError::Unprocessable`] if the host refuses the write.
    async fn write(
        &self,
        credential: &Credential,
        location: &Location,
        content: &str,
        expected: &VersionToken,
        message: &str,
    ) -> Result<VersionToken>;

    /// Resolve who `credential` belongs to.
    ///
    /// # Errors
    ///
    /// - Return [`RemoteError::Unauthorized`] if the credential is rejected.
    async fn identify(&self, credential: &Credential) -> Result<Identity>;
}

/// Remote storage error types.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// Target does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Credential is missing, invalid, or expired.
    #[error("credential rejected by remote")]
    Unauthorized,

    /// Credential lacks access to the target.
    #[error("access forbidden: {0}")]
    Forbidden(String),

    /// File changed since it was read.
    #[error("remote file changed since it was read")]
    VersionConflict,

    /// Request is well-formed but refused.
    #[error("remote rejected request: {0}")]
    Unprocessable(String),

    /// Any other failure status.
    #[error("remote request failed: {0}")]
    Transport(String),

    /// Request could not be performed at all.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// File content is not valid base64.
    #[error("remote file content is not valid base64")]
    Base64(#[from] base64::DecodeError),

    /// File content is not valid UTF-8.
    #[error("remote file content is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl RemoteError {
    /// Check if the remote refused the credential itself.
    pub fn credential_rejected(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// Friendly result alias :3
pub type Result<T, E = RemoteError> = std::result::Result<T, E>;
