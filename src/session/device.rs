// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! OAuth device authorization flow.
//!
//! Lets a terminal user log in without pasting a token around:
//!
//! 1. Request a device code and a short user code.
//! 2. The user opens the verification page and enters the user code.
//! 3. Poll the token endpoint until the user approves, denies, or the device
//!    code expires.
//!
//! # See Also
//!
//! - [Device flow](https://docs.github.com/en/apps/oauth-apps/building-oauth-apps/authorizing-oauth-apps#device-flow)

use crate::remote::{github::USER_AGENT, Credential};

use reqwest::{header::ACCEPT, Client};
use serde::Deserialize;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument};

pub const DEVICE_CODE_URL: &str = "https://github.com/login/device/code";
pub const ACCESS_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";
const SLOW_DOWN_STEP: u64 = 5;

/// Device code handed out at the start of the flow.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceCode {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub expires_in: u64,
    pub interval: u64,
}

/// Outcome of one poll of the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll {
    /// User has not acted yet.
    Pending,

    /// Polling too fast, back off.
    SlowDown,

    /// User approved.
    Granted(Credential),
}

#[derive(Debug, Default, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl TokenResponse {
    fn interpret(self) -> Result<Poll> {
        if let Some(token) = self.access_token {
            return Ok(Poll::Granted(Credential::new(token)));
        }

        let description = self.error_description.unwrap_or_default();
        match self.error.as_deref() {
            Some("authorization_pending") => Ok(Poll::Pending),
            Some("slow_down") => Ok(Poll::SlowDown),
            Some("expired_token") => Err(DeviceError::Expired),
            Some("access_denied") => Err(DeviceError::Denied),
            Some(other) => Err(DeviceError::Rejected(format!("{other}: {description}"))),
            None => Err(DeviceError::Rejected("no token in response".into())),
        }
    }
}

/// Device flow client for one OAuth application.
#[derive(Debug, Clone)]
pub struct DeviceFlow {
    client: Client,
    client_id: String,
    code_url: String,
    token_url: String,
}

impl DeviceFlow {
    /// Construct new device flow for OAuth application `client_id`.
    ///
    /// # Errors
    ///
    /// - Return [`DeviceError::Http`] if the HTTP client cannot be built.
    pub fn new(client_id: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            client_id: client_id.into(),
            code_url: DEVICE_CODE_URL.into(),
            token_url: ACCESS_TOKEN_URL.into(),
        })
    }

    /// Request new device code for `scope`.
    ///
    /// # Errors
    ///
    /// - Return [`DeviceError::Http`] if the request fails.
    #[instrument(skip(self), level = "debug")]
    pub async fn start(&self, scope: &str) -> Result<DeviceCode> {
        let code = self
            .client
            .post(&self.code_url)
            .header(ACCEPT, "application/json")
            .form(&[("client_id", self.client_id.as_str()), ("scope", scope)])
            .send()
            .await?
            .error_for_status()?
            .json::<DeviceCode>()
            .await?;
        debug!("device code expires in {}s", code.expires_in);

        Ok(code)
    }

    /// Poll token endpoint once.
    ///
    /// # Errors
    ///
    /// - Return [`DeviceError::Expired`] if the device code expired.
    /// - Return [`DeviceError::Denied`] if the user denied access.
    /// - Return [`DeviceError::Rejected`] for any other refusal.
    pub async fn poll(&self, code: &DeviceCode) -> Result<Poll> {
        self.client
            .post(&self.token_url)
            .header(ACCEPT, "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("device_code", code.device_code.as_str()),
                ("grant_type", GRANT_TYPE),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<TokenResponse>()
            .await?
            .interpret()
    }

    /// Poll until the user acts on `code`, honoring its interval.
    ///
    /// # Errors
    ///
    /// - Return [`DeviceError::Expired`] if the device code runs out of time.
    /// - Same as [`DeviceFlow::poll`].
    #[instrument(skip(self, code), level = "debug")]
    pub async fn await_token(&self, code: &DeviceCode) -> Result<Credential> {
        let deadline = Instant::now() + Duration::from_secs(code.expires_in);
        let mut interval = code.interval.max(1);

        loop {
            sleep(Duration::from_secs(interval)).await;
            if Instant::now() >= deadline {
                return Err(DeviceError::Expired);
            }

            match self.poll(code).await? {
                Poll::Pending => debug!("authorization pending"),
                Poll::SlowDown => {
                    interval += SLOW_DOWN_STEP;
                    debug!("slow down, poll every {interval}s");
                }
                Poll::Granted(credential) => {
                    info!("device authorized");
                    return Ok(credential);
                }
            }
        }
    }
}

/// Device flow error types.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Device code expired before the user acted.
    #[error("device code expired, start the login again")]
    Expired,

    /// User denied access.
    #[error("access denied by user")]
    Denied,

    /// Token endpoint refused for another reason.
    #[error("device authorization failed: {0}")]
    Rejected(String),

    /// Request could not be performed.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Friendly result alias :3
pub type Result<T, E = DeviceError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn response(body: &str) -> TokenResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn interpret_token_responses() {
        let poll = response(r#"{"access_token": "gho_x", "token_type": "bearer"}"#).interpret();
        assert_eq!(poll.unwrap(), Poll::Granted(Credential::new("gho_x")));

        let poll = response(r#"{"error": "authorization_pending"}"#).interpret();
        assert_eq!(poll.unwrap(), Poll::Pending);

        let poll = response(r#"{"error": "slow_down", "interval": 10}"#).interpret();
        assert_eq!(poll.unwrap(), Poll::SlowDown);
    }

    #[test]
    fn interpret_terminal_errors() {
        let poll = response(r#"{"error": "expired_token"}"#).interpret();
        assert!(matches!(poll, Err(DeviceError::Expired)));

        let poll = response(r#"{"error": "access_denied"}"#).interpret();
        assert!(matches!(poll, Err(DeviceError::Denied)));

        let poll = response(r#"{"error": "incorrect_client_credentials", "error_description": "bad id"}"#)
            .interpret();
        assert!(
            matches!(poll, Err(DeviceError::Rejected(reason)) if reason == "incorrect_client_credentials: bad id")
        );
    }

    #[test]
    fn deserialize_device_code() {
        let code: DeviceCode = serde_json::from_str(
            r#"{
                "device_code": "3584d83530557fdd1f46af8289938c8ef79f9dc5",
                "user_code": "WDJB-MJHT",
                "verification_uri": "https://github.com/login/device",
                "expires_in": 900,
                "interval": 5
            }"#,
        )
        .unwrap();
        assert_eq!(code.user_code, "WDJB-MJHT");
        assert_eq!(code.interval, 5);
    }
}
