// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! In-process remote store.
//!
//! Keeps a single file in memory and enforces the same version precondition
//! a real host does. Every call is recorded, so callers can check exactly
//! which remote operations a commit performed. Used for dry runs, and as the
//! test double of the commit orchestrator.

use crate::remote::{
    Credential, Identity, Location, RemoteError, RemoteFile, RemoteStore, Result, VersionToken,
};

use std::cell::RefCell;
use tracing::debug;

/// Remote operation performed against [`MemoryRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Read,
    Write { message: String },
    Identify,
}

#[derive(Debug, Default)]
struct State {
    content: Option<String>,
    revision: u64,
    calls: Vec<Call>,
}

/// Remote store holding one file in memory.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    state: RefCell<State>,
    identity: Option<Identity>,
    accepted: Option<Credential>,
}

impl MemoryRemote {
    /// Construct new in-memory remote holding `content` at version `v1`.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            state: RefCell::new(State {
                content: Some(content.into()),
                revision: 1,
                calls: Vec::new(),
            }),
            ..Default::default()
        }
    }

    /// Construct new in-memory remote without any file.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Resolve every accepted credential to `identity`.
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Only accept `credential`, rejecting all others as unauthorized.
    pub fn accepting(mut self, credential: Credential) -> Self {
        self.accepted = Some(credential);
        self
    }

    /// Current file content.
    pub fn content(&self) -> Option<String> {
        self.state.borrow().content.clone()
    }

    /// Current version token.
    pub fn version(&self) -> VersionToken {
        version_of(self.state.borrow().revision)
    }

    /// Every call performed so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    /// Number of writes that landed or were attempted.
    pub fn writes(&self) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|call| matches!(call, Call::Write { .. }))
            .count()
    }

    /// Replace content as some other writer would, invalidating every
    /// version token handed out so far.
    pub fn bump(&self, content: impl Into<String>) {
        let mut state = self.state.borrow_mut();
        state.content = Some(content.into());
        state.revision += 1;
    }

    fn admit(&self, credential: &Credential) -> Result<()> {
        match &self.accepted {
            Some(accepted) if accepted != credential => Err(RemoteError::Unauthorized),
            _ => Ok(()),
        }
    }
}

impl RemoteStore for MemoryRemote {
    async fn read(&self, credential: &Credential, location: &Location) -> Result<RemoteFile> {
        self.state.borrow_mut().calls.push(Call::Read);
        self.admit(credential)?;

        let state = self.state.borrow();
        let content = state
            .content
            .clone()
            .ok_or_else(|| RemoteError::NotFound(location.to_string()))?;

        Ok(RemoteFile {
            content,
            version: version_of(state.revision),
        })
    }

    async fn write(
        &self,
        credential: &Credential,
        location: &Location,
        content: &str,
        expected: &VersionToken,
        message: &str,
    ) -> Result<VersionToken> {
        self.state.borrow_mut().calls.push(Call::Write {
            message: message.to_string(),
        });
        self.admit(credential)?;

        let mut state = self.state.borrow_mut();
        if state.content.is_none() {
            return Err(RemoteError::NotFound(location.to_string()));
        }

        if version_of(state.revision) != *expected {
            debug!("reject write at {expected}, file is at v{}", state.revision);
            return Err(RemoteError::VersionConflict);
        }

        state.content = Some(content.to_string());
        state.revision += 1;
        Ok(version_of(state.revision))
    }

    async fn identify(&self, credential: &Credential) -> Result<Identity> {
        self.state.borrow_mut().calls.push(Call::Identify);
        self.admit(credential)?;

        self.identity.clone().ok_or(RemoteError::Unauthorized)
    }
}

fn version_of(revision: u64) -> VersionToken {
    VersionToken::new(format!("v{revision}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn location() -> Location {
        Location {
            owner: "dan".into(),
            repository: "dan-papers".into(),
            path: "constants.ts".into(),
            branch: "main".into(),
        }
    }

    #[tokio::test]
    async fn write_requires_current_version() -> anyhow::Result<()> {
        let remote = MemoryRemote::new("old");
        let credential = Credential::new("token");

        let file = remote.read(&credential, &location()).await?;
        assert_eq!(file.version, VersionToken::new("v1"));

        remote.bump("theirs");
        let result = remote
            .write(&credential, &location(), "mine", &file.version, "edit")
            .await;
        assert!(matches!(result, Err(RemoteError::VersionConflict)));
        assert_eq!(remote.content().as_deref(), Some("theirs"));

        let file = remote.read(&credential, &location()).await?;
        let version = remote
            .write(&credential, &location(), "mine", &file.version, "edit")
            .await?;
        assert_eq!(version, VersionToken::new("v3"));
        assert_eq!(remote.content().as_deref(), Some("mine"));
        assert_eq!(remote.writes(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn rejects_foreign_credential() {
        let remote = MemoryRemote::new("")
            .with_identity(Identity {
                login: "dan".into(),
                display_name: "Dan".into(),
            })
            .accepting(Credential::new("good"));

        let result = remote.identify(&Credential::new("bad")).await;
        assert!(matches!(result, Err(RemoteError::Unauthorized)));
        assert!(remote.identify(&Credential::new("good")).await.is_ok());
        assert_eq!(remote.calls(), vec![Call::Identify, Call::Identify]);
    }

    #[tokio::test]
    async fn read_missing_file() {
        let remote = MemoryRemote::empty();
        let result = remote.read(&Credential::new("x"), &location()).await;
        assert!(matches!(result, Err(RemoteError::NotFound(_))));
    }
}
