// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! GitHub Contents API access.
//!
//! Reads and writes the source file through the REST endpoint
//! `/repos/{owner}/{repo}/contents/{path}`. File content travels base64
//! encoded. The blob SHA of the file doubles as its version token: GitHub
//! refuses a write whose `sha` no longer matches the file on the branch.
//!
//! # See Also
//!
//! - [Repository contents](https://docs.github.com/en/rest/repos/contents)

use crate::remote::{
    Credential, Identity, Location, RemoteError, RemoteFile, RemoteStore, Result, VersionToken,
};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{
    header::{ACCEPT, AUTHORIZATION},
    Client, RequestBuilder, Response, StatusCode,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

pub(crate) const USER_AGENT: &str = concat!("danpapers/", env!("CARGO_PKG_VERSION"));
const MEDIA_TYPE: &str = "application/vnd.github.v3+json";

/// Remote store backed by the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHub {
    client: Client,
    api_url: String,
}

impl GitHub {
    /// Construct new GitHub remote store talking to `api_url`.
    ///
    /// # Errors
    ///
    /// - Return [`RemoteError::Http`] if the HTTP client cannot be built.
    pub fn new(api_url: impl AsRef<str>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.as_ref().trim_end_matches('/').to_string(),
        })
    }

    fn contents_url(&self, location: &Location) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_url,
            location.owner,
            location.repository,
            location.path.trim_start_matches('/')
        )
    }

    fn authorized(&self, request: RequestBuilder, credential: &Credential) -> RequestBuilder {
        request
            .header(AUTHORIZATION, format!("token {}", credential.expose()))
            .header(ACCEPT, MEDIA_TYPE)
    }
}

impl RemoteStore for GitHub {
    #[instrument(skip(self, credential), level = "debug")]
    async fn read(&self, credential: &Credential, location: &Location) -> Result<RemoteFile> {
        let request = self
            .client
            .get(self.contents_url(location))
            .query(&[("ref", location.branch.as_str())]);
        let response = self.authorized(request, credential).send().await?;
        let response = check(response, &location.to_string()).await?;

        let body: ContentsResponse = response.json().await?;
        let content = decode_content(&body.content)?;
        debug!("read {} bytes at {}", content.len(), body.sha);

        Ok(RemoteFile {
            content,
            version: VersionToken::new(body.sha),
        })
    }

    #[instrument(skip(self, credential, content), level = "debug")]
    async fn write(
        &self,
        credential: &Credential,
        location: &Location,
        content: &str,
        expected: &VersionToken,
        message: &str,
    ) -> Result<VersionToken> {
        let body = UpdateRequest {
            message,
            content: STANDARD.encode(content),
            sha: expected.as_str(),
            branch: &location.branch,
        };

        let request = self.client.put(self.contents_url(location)).json(&body);
        let response = self.authorized(request, credential).send().await?;
        let response = check(response, &location.to_string()).await?;

        let body: UpdateResponse = response.json().await?;
        debug!("wrote {} bytes as {}", content.len(), body.content.sha);

        Ok(VersionToken::new(body.content.sha))
    }

    #[instrument(skip(self, credential), level = "debug")]
    async fn identify(&self, credential: &Credential) -> Result<Identity> {
        let request = self.client.get(format!("{}/user", self.api_url));
        let response = self.authorized(request, credential).send().await?;
        let response = check(response, "user").await?;

        let user: UserResponse = response.json().await?;
        Ok(user.into())
    }
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    content: String,
    sha: String,
}

#[derive(Debug, Serialize)]
struct UpdateRequest<'a> {
    message: &'a str,
    content: String,
    sha: &'a str,
    branch: &'a str,
}

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    content: UpdatedContent,
}

#[derive(Debug, Deserialize)]
struct UpdatedContent {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    login: String,
    name: Option<String>,
}

impl From<UserResponse> for Identity {
    fn from(user: UserResponse) -> Self {
        let display_name = user
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| user.login.clone());

        Self {
            login: user.login,
            display_name,
        }
    }
}

async fn check(response: Response, target: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(classify(status, &body, target))
}

/// Map a failure status onto a remote error.
fn classify(status: StatusCode, body: &str, target: &str) -> RemoteError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("message")?.as_str().map(str::to_owned))
        .unwrap_or_else(|| status.to_string());

    match status {
        StatusCode::UNAUTHORIZED => RemoteError::Unauthorized,
        StatusCode::FORBIDDEN => RemoteError::Forbidden(message),
        StatusCode::NOT_FOUND => RemoteError::NotFound(target.to_string()),
        StatusCode::CONFLICT => RemoteError::VersionConflict,
        StatusCode::UNPROCESSABLE_ENTITY => RemoteError::Unprocessable(message),
        _ => RemoteError::Transport(format!("status {status}: {message}")),
    }
}

/// Decode base64 file content, which GitHub wraps every 60 characters.
fn decode_content(encoded: &str) -> Result<String> {
    let compact = encoded
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace())
        .collect::<String>();

    Ok(String::from_utf8(STANDARD.decode(compact)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    #[test_case(StatusCode::UNAUTHORIZED, "Unauthorized"; "unauthorized")]
    #[test_case(StatusCode::FORBIDDEN, "Forbidden"; "forbidden")]
    #[test_case(StatusCode::NOT_FOUND, "NotFound"; "not found")]
    #[test_case(StatusCode::CONFLICT, "VersionConflict"; "conflict")]
    #[test_case(StatusCode::UNPROCESSABLE_ENTITY, "Unprocessable"; "unprocessable")]
    #[test_case(StatusCode::BAD_GATEWAY, "Transport"; "bad gateway")]
    #[test]
    fn classify_failure_status(status: StatusCode, expect: &str) {
        let error = classify(status, r#"{"message": "nope"}"#, "dan/dan-papers");
        let variant = format!("{error:?}");
        assert!(variant.starts_with(expect), "{variant} is not {expect}");
    }

    #[test]
    fn classify_keeps_remote_message() {
        let error = classify(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"message": "Invalid request.\n\n\"sha\" wasn't supplied."}"#,
            "x",
        );
        assert_eq!(
            error.to_string(),
            "remote rejected request: Invalid request.\n\n\"sha\" wasn't supplied."
        );

        let error = classify(StatusCode::INTERNAL_SERVER_ERROR, "<html>", "x");
        assert_eq!(
            error.to_string(),
            "remote request failed: status 500 Internal Server Error: 500 Internal Server Error"
        );
    }

    #[test]
    fn decode_wrapped_content() -> anyhow::Result<()> {
        let encoded = "ZXhwb3J0IGNvbnN0IEFSVElDTEVT\nID0gWwpdOwo=\n";
        assert_eq!(decode_content(encoded)?, "export const ARTICLES = [\n];\n");

        Ok(())
    }

    #[test]
    fn identity_display_name_falls_back_to_login() {
        let identity: Identity = UserResponse {
            login: "dan".into(),
            name: Some("  ".into()),
        }
        .into();
        assert_eq!(identity.display_name, "dan");

        let identity: Identity = UserResponse {
            login: "dan".into(),
            name: Some("Dan".into()),
        }
        .into();
        assert_eq!(identity.display_name, "Dan");
    }
}
