// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Commit orchestration.
//!
//! Every publish, edit, or delete of an article is one __commit__ against the
//! remote source file. A commit walks through a fixed sequence of states:
//!
//! ```text
//! Idle -> Authenticating -> Reading -> Authorizing -> Splicing -> Writing -> Done
//!                   \            \            \            \          \
//!                    +------------+------------+------------+----------+-> Failed
//! ```
//!
//! Authorizing only happens for edits and deletes. Anybody who is logged in
//! may publish.
//!
//! # Optimistic Concurrency
//!
//! The version token obtained while Reading is the precondition of the write.
//! If somebody else committed in between, the remote host rejects the write
//! and the commit fails with [`ErrorKind::VersionConflict`]. There is no
//! automatic retry. Replaying the edit on top of a fresher read could clobber
//! a legitimate concurrent change, so the caller has to start over.
//!
//! # Operation Log
//!
//! Each commit yields an [`OperationLog`] with one line per state entered,
//! plus the milestones of the splice engine. It is meant for the user to read,
//! so it is returned on success and failure alike.
//!
//! # Working Set
//!
//! The [`ArticleStore`] handed to a commit is only ever touched in the Done
//! state, i.e., after the remote host confirmed the write. Failed commits
//! leave it exactly as it was.

use crate::{
    article::{format_date, Article, Draft},
    config::{RemoteSettings, SiteConfig},
    policy::{Caller, Denied, Policy},
    remote::{Credential, Location, RemoteError, RemoteStore, VersionToken},
    source::{
        self,
        codec::{decode, encode, CodecError},
        locate::{BraceScanner, LocateError, RecordLocator},
        splice::{Marker, SpliceError, SpliceOp, Splicer},
        SourceError,
    },
    store::ArticleStore,
};

use chrono::Local;
use std::fmt::{Display, Formatter, Result as FmtResult};
use tracing::{info, instrument, warn};

/// State of a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitState {
    Idle,
    Authenticating,
    Reading,
    Authorizing,
    Splicing,
    Writing,
    Done,
    Failed(ErrorKind),
}

impl Display for CommitState {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Idle => fmt.write_str("idle"),
            Self::Authenticating => fmt.write_str("authenticating"),
            Self::Reading => fmt.write_str("reading"),
            Self::Authorizing => fmt.write_str("authorizing"),
            Self::Splicing => fmt.write_str("splicing"),
            Self::Writing => fmt.write_str("writing"),
            Self::Done => fmt.write_str("done"),
            Self::Failed(kind) => write!(fmt, "failed: {kind}"),
        }
    }
}

/// Kind of commit failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthenticated,
    PermissionDenied,
    RemoteUnavailable,
    NotFound,
    MarkerNotFound,
    MalformedSource,
    VersionConflict,
}

impl Display for ErrorKind {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let kind = match self {
            Self::Unauthenticated => "unauthenticated",
            Self::PermissionDenied => "permission denied",
            Self::RemoteUnavailable => "remote unavailable",
            Self::NotFound => "not found",
            Self::MarkerNotFound => "marker not found",
            Self::MalformedSource => "malformed source",
            Self::VersionConflict => "version conflict",
        };
        fmt.write_str(kind)
    }
}

/// One line of an operation log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub state: CommitState,
    pub message: String,
}

impl Display for LogEntry {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "[{}] {}", self.state, self.message)
    }
}

/// User-visible account of a commit.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationLog {
    entries: Vec<LogEntry>,
}

impl OperationLog {
    /// Append line to the log.
    pub fn push(&mut self, state: CommitState, message: impl Into<String>) {
        let entry = LogEntry {
            state,
            message: message.into(),
        };
        match state {
            CommitState::Failed(_) => warn!("{entry}"),
            _ => info!("{entry}"),
        }
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// States entered, in order, without repeats for milestones.
    pub fn states(&self) -> Vec<CommitState> {
        let mut states = self
            .entries
            .iter()
            .map(|entry| entry.state)
            .collect::<Vec<_>>();
        states.dedup();
        states
    }

    /// Last state entered.
    pub fn state(&self) -> CommitState {
        self.entries
            .last()
            .map_or(CommitState::Idle, |entry| entry.state)
    }
}

impl Display for OperationLog {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        for entry in &self.entries {
            writeln!(fmt, "{entry}")?;
        }
        Ok(())
    }
}

/// Successful commit.
#[derive(Debug, Clone)]
pub struct Receipt {
    /// Id of the article committed.
    pub id: String,

    /// Version of the source file after the commit.
    pub version: VersionToken,

    /// Source file text that was written.
    pub content: String,

    pub log: OperationLog,
}

/// Failed commit.
#[derive(Debug, thiserror::Error)]
#[error("commit failed ({})", .error.kind())]
pub struct Failure {
    #[source]
    pub error: CommitError,
    pub log: OperationLog,
}

impl Failure {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

/// Orchestrate commits of articles against a remote store.
#[derive(Debug)]
pub struct Publisher<R, L = BraceScanner>
where
    R: RemoteStore,
    L: RecordLocator,
{
    remote: R,
    splicer: Splicer<L>,
    marker: Marker,
    policy: Policy,
    settings: RemoteSettings,
    default_tag: String,
}

impl<R> Publisher<R>
where
    R: RemoteStore,
{
    /// Construct new publisher locating records by brace scanning.
    ///
    /// # Errors
    ///
    /// - Return [`SpliceError::Pattern`] if the configured marker cannot be
    ///   turned into a pattern.
    pub fn new(remote: R, config: &SiteConfig) -> Result<Self, SpliceError> {
        Self::with_locator(remote, BraceScanner::new(), config)
    }
}

impl<R, L> Publisher<R, L>
where
    R: RemoteStore,
    L: RecordLocator,
{
    /// Construct new publisher with a custom record locator.
    ///
    /// # Errors
    ///
    /// - Same as [`Publisher::new`].
    pub fn with_locator(remote: R, locator: L, config: &SiteConfig) -> Result<Self, SpliceError> {
        Ok(Self {
            remote,
            splicer: Splicer::new(locator),
            marker: Marker::new(&config.source.marker)?,
            policy: Policy::from_settings(&config.policy),
            settings: config.remote.clone(),
            default_tag: config.source.default_tag.clone(),
        })
    }

    /// Remote store in use.
    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Resolve who `credential` belongs to.
    ///
    /// # Errors
    ///
    /// - Return [`CommitError::NoCredential`] if there is no credential.
    /// - Return [`CommitError::CredentialRejected`] if the remote rejects it.
    pub async fn identify(&self, credential: Option<&Credential>) -> Result<Caller, CommitError> {
        let credential = credential.ok_or(CommitError::NoCredential)?;
        let identity = self
            .remote
            .identify(credential)
            .await
            .map_err(CommitError::from_remote)?;

        Ok(self.policy.caller(identity))
    }

    /// Read the source file and reset the working set to its records.
    ///
    /// Returns the file location that was read.
    ///
    /// # Errors
    ///
    /// - Same failure kinds as a commit up to its Reading state, plus
    ///   [`ErrorKind::MarkerNotFound`] and [`ErrorKind::MalformedSource`] if
    ///   the records cannot be listed.
    #[instrument(skip(self, credential, store), level = "debug")]
    pub async fn load(
        &self,
        credential: Option<&Credential>,
        store: &mut ArticleStore,
    ) -> Result<Location, Failure> {
        let mut log = OperationLog::default();
        let result: Result<_, CommitError> = async {
            let (caller, credential) = self.authenticate(credential, &mut log).await?;
            let location = self.settings.location(caller.login());
            let text = self.read(credential, &location, &mut log).await?.content;
            let records = source::records(&text, &self.marker)?;
            log.push(
                CommitState::Done,
                format!("listed {} records", records.len()),
            );
            Ok((location, records))
        }
        .await;

        match result {
            Ok((location, records)) => {
                store.reset(records);
                Ok(location)
            }
            Err(error) => Err(fail(log, error)),
        }
    }

    /// Publish draft as a new article at the top of the records array.
    ///
    /// The article gets the slug of its title as id, suffixed with `-2`,
    /// `-3`, and so on if that id is already taken.
    ///
    /// # Errors
    ///
    /// - Return [`Failure`] carrying the failed state's error and the log up
    ///   to that point.
    #[instrument(skip(self, credential, draft, store), level = "debug")]
    pub async fn publish(
        &self,
        credential: Option<&Credential>,
        draft: Draft,
        store: &mut ArticleStore,
    ) -> Result<Receipt, Failure> {
        let mut log = OperationLog::default();
        let result: Result<_, CommitError> = async {
            let (caller, credential) = self.authenticate(credential, &mut log).await?;
            let location = self.settings.location(caller.login());
            let file = self.read(credential, &location, &mut log).await?;

            let now = Local::now();
            let base = draft.base_id(now.timestamp_millis());
            let id = self.unique_id(&file.content, &base);
            let article = draft.into_article(
                id,
                caller.display_name(),
                format_date(now.date_naive()),
                &self.default_tag,
            );

            let op = SpliceOp::InsertAfterMarker {
                marker: self.marker.clone(),
                record: encode(&article),
            };
            let content = self.splice(&file.content, &op, &mut log)?;
            let message = format!("Research: {}", article.title);
            let version = self
                .write(credential, &location, &content, &file.version, &message, &mut log)
                .await?;

            Ok(Committed {
                article,
                version,
                content,
            })
        }
        .await;

        self.finish(log, result, store, |store, article| store.upsert(article))
    }

    /// Replace article `id` with the contents of a draft.
    ///
    /// The article keeps its id, author, and date.
    ///
    /// # Errors
    ///
    /// - Return [`Failure`] carrying the failed state's error and the log up
    ///   to that point.
    #[instrument(skip(self, credential, draft, store), level = "debug")]
    pub async fn update(
        &self,
        credential: Option<&Credential>,
        id: &str,
        draft: Draft,
        store: &mut ArticleStore,
    ) -> Result<Receipt, Failure> {
        let mut log = OperationLog::default();
        let result: Result<_, CommitError> = async {
            let (caller, credential) = self.authenticate(credential, &mut log).await?;
            let location = self.settings.location(caller.login());
            let file = self.read(credential, &location, &mut log).await?;
            let existing = self.authorize(&caller, &file.content, id, &mut log)?;

            let article =
                draft.into_article(existing.id, existing.author, existing.date, &self.default_tag);
            let op = SpliceOp::ReplaceRecord {
                id: article.id.clone(),
                record: encode(&article),
            };
            let content = self.splice(&file.content, &op, &mut log)?;
            let message = format!("Update: {}", article.title);
            let version = self
                .write(credential, &location, &content, &file.version, &message, &mut log)
                .await?;

            Ok(Committed {
                article,
                version,
                content,
            })
        }
        .await;

        self.finish(log, result, store, |store, article| store.upsert(article))
    }

    /// Delete article `id` from the records array.
    ///
    /// # Errors
    ///
    /// - Return [`Failure`] carrying the failed state's error and the log up
    ///   to that point.
    #[instrument(skip(self, credential, store), level = "debug")]
    pub async fn delete(
        &self,
        credential: Option<&Credential>,
        id: &str,
        store: &mut ArticleStore,
    ) -> Result<Receipt, Failure> {
        let mut log = OperationLog::default();
        let result: Result<_, CommitError> = async {
            let (caller, credential) = self.authenticate(credential, &mut log).await?;
            let location = self.settings.location(caller.login());
            let file = self.read(credential, &location, &mut log).await?;
            let article = self.authorize(&caller, &file.content, id, &mut log)?;

            let op = SpliceOp::DeleteRecord {
                id: article.id.clone(),
            };
            let content = self.splice(&file.content, &op, &mut log)?;
            let message = format!("Delete: {}", article.title);
            let version = self
                .write(credential, &location, &content, &file.version, &message, &mut log)
                .await?;

            Ok(Committed {
                article,
                version,
                content,
            })
        }
        .await;

        self.finish(log, result, store, |store, article| {
            store.remove(&article.id);
        })
    }

    async fn authenticate<'c>(
        &self,
        credential: Option<&'c Credential>,
        log: &mut OperationLog,
    ) -> Result<(Caller, &'c Credential), CommitError> {
        log.push(CommitState::Authenticating, "verifying session");
        let caller = self.identify(credential).await?;
        let credential = credential.ok_or(CommitError::NoCredential)?;
        log.push(
            CommitState::Authenticating,
            format!(
                "verified session for {}{}",
                caller.login(),
                if caller.is_admin { " (admin)" } else { "" }
            ),
        );

        Ok((caller, credential))
    }

    async fn read(
        &self,
        credential: &Credential,
        location: &Location,
        log: &mut OperationLog,
    ) -> Result<crate::remote::RemoteFile, CommitError> {
        log.push(CommitState::Reading, format!("fetching {location}"));
        let file = self
            .remote
            .read(credential, location)
            .await
            .map_err(CommitError::from_remote)?;
        log.push(
            CommitState::Reading,
            format!("fetched {} bytes at version {}", file.content.len(), file.version),
        );

        Ok(file)
    }

    fn authorize(
        &self,
        caller: &Caller,
        text: &str,
        id: &str,
        log: &mut OperationLog,
    ) -> Result<Article, CommitError> {
        log.push(
            CommitState::Authorizing,
            format!("checking permission of {} on {id:?}", caller.login()),
        );
        let span = self.splicer.locator().locate(text, id)?;
        let article = decode(span.extract(text))?;
        self.policy.authorize(caller, &article.author)?;
        log.push(
            CommitState::Authorizing,
            format!("{} may modify {id:?} by {}", caller.login(), article.author),
        );

        Ok(article)
    }

    fn splice(&self, text: &str, op: &SpliceOp, log: &mut OperationLog) -> Result<String, CommitError> {
        log.push(CommitState::Splicing, op.to_string());
        let content = self.splicer.apply(text, op)?;
        log.push(
            CommitState::Splicing,
            format!("source file went from {} to {} bytes", text.len(), content.len()),
        );

        Ok(content)
    }

    async fn write(
        &self,
        credential: &Credential,
        location: &Location,
        content: &str,
        expected: &VersionToken,
        message: &str,
        log: &mut OperationLog,
    ) -> Result<VersionToken, CommitError> {
        log.push(
            CommitState::Writing,
            format!("committing {message:?} on top of version {expected}"),
        );

        self.remote
            .write(credential, location, content, expected, message)
            .await
            .map_err(CommitError::from_remote)
    }

    fn unique_id(&self, text: &str, base: &str) -> String {
        let locator = self.splicer.locator();
        let mut id = base.to_string();
        let mut suffix = 1;
        while locator.contains(text, &id) {
            suffix += 1;
            id = format!("{base}-{suffix}");
        }

        id
    }

    fn finish(
        &self,
        mut log: OperationLog,
        result: Result<Committed, CommitError>,
        store: &mut ArticleStore,
        reconcile: impl FnOnce(&mut ArticleStore, Article),
    ) -> Result<Receipt, Failure> {
        let committed = match result {
            Ok(committed) => committed,
            Err(error) => return Err(fail(log, error)),
        };
        let id = committed.article.id.clone();

        // INVARIANT: Working set only changes once the write is confirmed.
        reconcile(store, committed.article);
        log.push(
            CommitState::Done,
            format!("committed {id:?} as version {}", committed.version),
        );

        Ok(Receipt {
            id,
            version: committed.version,
            content: committed.content,
            log,
        })
    }
}

struct Committed {
    article: Article,
    version: VersionToken,
    content: String,
}

fn fail(mut log: OperationLog, error: CommitError) -> Failure {
    log.push(CommitState::Failed(error.kind()), error.to_string());
    Failure { error, log }
}

/// Commit error types.
#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    /// Nobody is logged in.
    #[error("not logged in")]
    NoCredential,

    /// Remote host rejected the credential.
    #[error("credential rejected by remote, log in again")]
    CredentialRejected,

    /// Authorization policy refused the caller.
    #[error(transparent)]
    Denied(#[from] Denied),

    /// Remote host refused access.
    #[error("access forbidden by remote: {0}")]
    Forbidden(String),

    /// Source file changed since it was read.
    #[error("source file changed since it was read, reload and try again")]
    VersionConflict,

    /// Remote host cannot be reached or refused the request.
    #[error(transparent)]
    Remote(RemoteError),

    /// No record carries the target id.
    #[error("no article with id {0:?}")]
    RecordNotFound(String),

    /// Records array declaration is missing.
    #[error("records array {0:?} not found in source file, fix it by hand")]
    MarkerNotFound(String),

    /// Source file cannot be spliced safely.
    #[error("malformed source file, fix it by hand: {0}")]
    Malformed(String),
}

impl CommitError {
    /// Map remote store failure onto commit failure.
    pub fn from_remote(error: RemoteError) -> Self {
        match error {
            RemoteError::Unauthorized => Self::CredentialRejected,
            RemoteError::Forbidden(message) => Self::Forbidden(message),
            RemoteError::VersionConflict => Self::VersionConflict,
            other => Self::Remote(other),
        }
    }

    /// Kind of failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoCredential | Self::CredentialRejected => ErrorKind::Unauthenticated,
            Self::Denied(_) | Self::Forbidden(_) => ErrorKind::PermissionDenied,
            Self::VersionConflict => ErrorKind::VersionConflict,
            Self::Remote(_) => ErrorKind::RemoteUnavailable,
            Self::RecordNotFound(_) => ErrorKind::NotFound,
            Self::MarkerNotFound(_) => ErrorKind::MarkerNotFound,
            Self::Malformed(_) => ErrorKind::MalformedSource,
        }
    }

    /// Check if the stored credential should be discarded.
    pub fn credential_rejected(&self) -> bool {
        matches!(self, Self::CredentialRejected)
    }
}

impl From<LocateError> for CommitError {
    fn from(error: LocateError) -> Self {
        match error {
            LocateError::NotFound { id } => Self::RecordNotFound(id),
            other => Self::Malformed(other.to_string()),
        }
    }
}

impl From<SpliceError> for CommitError {
    fn from(error: SpliceError) -> Self {
        match error {
            SpliceError::MarkerNotFound(name) => Self::MarkerNotFound(name),
            SpliceError::Locate(error) => error.into(),
            other => Self::Malformed(other.to_string()),
        }
    }
}

impl From<SourceError> for CommitError {
    fn from(error: SourceError) -> Self {
        match error {
            SourceError::MarkerNotFound(name) => Self::MarkerNotFound(name),
            SourceError::Locate(error) => error.into(),
            SourceError::Codec(error) => error.into(),
        }
    }
}

impl From<CodecError> for CommitError {
    fn from(error: CodecError) -> Self {
        Self::Malformed(error.to_string())
    }
}
