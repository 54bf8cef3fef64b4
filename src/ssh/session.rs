// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Session lifecycle: connect with bounded retries, keepalive, teardown.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use russh::client::{self, Handle};
use russh::keys::PrivateKeyWithHashAlg;
use russh::Disconnect;
use tokio::net::TcpStream;
use zeroize::Zeroizing;

use super::auth::{self, AttemptRunner, AuthAttempt};
use super::handler::AcceptingHandler;
use crate::credentials::CredentialSet;
use crate::error::{Error, Result};

// SSH connection timeout design:
// - 30 seconds for the TCP dial accommodates slow networks
// - 60 seconds for the protocol handshake: hosts under load intermittently
//   stall before the banner even arrives, and that case is classified
//   separately from credential failures
// - 30 seconds per authentication attempt
// These are fixed budgets rather than per-call knobs so behavior stays
// predictable for callers driving sessions from background tasks.

/// TCP connection timeout
pub const CONNECT_TIMEOUT_SECS: u64 = 30;
/// SSH protocol handshake (banner) timeout
pub const BANNER_TIMEOUT_SECS: u64 = 60;
/// Per-authentication-attempt timeout
pub const AUTH_TIMEOUT_SECS: u64 = 30;
/// Keepalive probe interval installed on every connected transport
pub const KEEPALIVE_INTERVAL_SECS: u64 = 60;
/// Default number of connect attempts
pub const DEFAULT_MAX_RETRIES: usize = 3;
/// Default delay between connect attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Connection state of a [`RemoteSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Closed,
}

/// One authenticated connection to a managed host.
///
/// A session exclusively owns its transport; it is never shared between
/// sessions, and the keepalive ticker lives on the transport itself, so
/// closing the session necessarily stops it. Operations issued against the
/// same session must be serialized by the caller.
pub struct RemoteSession {
    credentials: CredentialSet,
    handle: Option<Handle<AcceptingHandler>>,
    authenticated_via: Option<String>,
    state: SessionState,
}

impl RemoteSession {
    pub fn new(credentials: CredentialSet) -> Self {
        Self {
            credentials,
            handle: None,
            authenticated_via: None,
            state: SessionState::Disconnected,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Label of the authentication strategy that won, for diagnostics.
    pub fn authenticated_via(&self) -> Option<&str> {
        self.authenticated_via.as_deref()
    }

    pub fn credentials(&self) -> &CredentialSet {
        &self.credentials
    }

    /// Connect with the default retry policy (3 attempts, 2 seconds apart).
    pub async fn connect(&mut self) -> Result<()> {
        self.connect_with_retries(DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY)
            .await
    }

    /// Connect, retrying transient failures up to `max_retries` times.
    ///
    /// Every attempt builds a fresh transport; a partially-failed one is
    /// discarded with best-effort cleanup. A credential set with no usable
    /// material fails immediately with [`Error::Configuration`] and never
    /// touches the network.
    pub async fn connect_with_retries(
        &mut self,
        max_retries: usize,
        retry_delay: Duration,
    ) -> Result<()> {
        if self.state == SessionState::Closed {
            return Err(Error::SessionClosed);
        }

        // Reconnecting tears down any previous transport first; secondary
        // errors from that cleanup are ignored.
        if let Some(old_handle) = self.handle.take() {
            let _ = old_handle
                .disconnect(Disconnect::ByApplication, "", "")
                .await;
            self.authenticated_via = None;
            self.state = SessionState::Disconnected;
        }

        let attempts = auth::resolve_attempts(&self.credentials);
        if attempts.is_empty() {
            return Err(Error::Configuration);
        }

        let max_retries = max_retries.max(1);
        let mut last_error: Option<Error> = None;

        for attempt_no in 1..=max_retries {
            self.state = SessionState::Connecting;
            tracing::debug!(
                "connecting to {}:{} (attempt {}/{})",
                self.credentials.host,
                self.credentials.port,
                attempt_no,
                max_retries
            );

            match self.connect_once(&attempts).await {
                Ok((handle, via)) => {
                    tracing::debug!(
                        "connected to {}:{} via {}",
                        self.credentials.host,
                        self.credentials.port,
                        via
                    );
                    self.handle = Some(handle);
                    self.authenticated_via = Some(via);
                    self.state = SessionState::Connected;
                    return Ok(());
                }
                Err(e) => {
                    self.state = SessionState::Disconnected;
                    if e.is_banner_class() {
                        tracing::warn!(
                            "connection to {} failed (attempt {}/{}): could not read the SSH protocol banner",
                            self.credentials.host,
                            attempt_no,
                            max_retries
                        );
                    } else {
                        tracing::warn!(
                            "connection to {} failed (attempt {}/{}): {}",
                            self.credentials.host,
                            attempt_no,
                            max_retries,
                            e
                        );
                    }
                    last_error = Some(e);
                    if attempt_no < max_retries {
                        tracing::debug!("retrying in {:?}", retry_delay);
                        tokio::time::sleep(retry_delay).await;
                    }
                }
            }
        }

        let last_error = last_error.unwrap_or(Error::Configuration);
        if last_error.is_banner_class() {
            tracing::error!(
                "connection to {} failed after {} attempts: could not read the SSH protocol banner; \
                 the host may be overloaded or the network slow",
                self.credentials.host,
                max_retries
            );
        } else {
            tracing::error!(
                "connection to {} failed after {} attempts: {}",
                self.credentials.host,
                max_retries,
                last_error
            );
        }
        Err(last_error)
    }

    /// One fresh-transport connect: dial, handshake, then run the resolved
    /// attempts in order.
    async fn connect_once(
        &self,
        attempts: &[AuthAttempt],
    ) -> Result<(Handle<AcceptingHandler>, String)> {
        let config = Arc::new(client::Config {
            keepalive_interval: Some(Duration::from_secs(KEEPALIVE_INTERVAL_SECS)),
            ..Default::default()
        });

        let addr = (self.credentials.host.as_str(), self.credentials.port);
        let stream = tokio::time::timeout(
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
            TcpStream::connect(addr),
        )
        .await
        .map_err(|_| Error::ConnectTimeout(CONNECT_TIMEOUT_SECS))??;

        let mut handle = tokio::time::timeout(
            Duration::from_secs(BANNER_TIMEOUT_SECS),
            client::connect_stream(config, stream, AcceptingHandler),
        )
        .await
        .map_err(|_| Error::HandshakeTimeout(BANNER_TIMEOUT_SECS))??;

        // Key material is read once per transport. A read failure fails the
        // key attempts individually; the password attempt still runs.
        let key_data = match &self.credentials.key_path {
            Some(path) => match tokio::fs::read_to_string(path).await {
                Ok(data) => Some(Zeroizing::new(data)),
                Err(e) => {
                    tracing::warn!("failed to read key file {:?}: {}", path, e);
                    None
                }
            },
            None => None,
        };

        let mut runner = HandleRunner {
            handle: &mut handle,
            username: &self.credentials.username,
            key_data: key_data.as_deref().map(String::as_str),
        };

        match auth::first_successful(attempts, &mut runner).await {
            Ok(via) => Ok((handle, via)),
            Err(e) => {
                // Discard the partially-failed transport; secondary cleanup
                // errors must not mask the authentication error.
                let _ = handle
                    .disconnect(Disconnect::ByApplication, "", "")
                    .await;
                Err(e)
            }
        }
    }

    /// Ensure a live transport, attempting one implicit connect if needed.
    pub(crate) async fn ensure_connected(&mut self) -> Result<()> {
        match self.state {
            SessionState::Closed => Err(Error::SessionClosed),
            SessionState::Connected => {
                if self.handle.as_ref().is_some_and(|h| !h.is_closed()) {
                    return Ok(());
                }
                // The transport died underneath us; reconnect once.
                tracing::warn!(
                    "transport to {} was lost, reconnecting",
                    self.credentials.host
                );
                self.handle = None;
                self.state = SessionState::Disconnected;
                self.connect().await
            }
            _ => self.connect().await,
        }
    }

    pub(crate) fn live_handle(&self) -> Result<&Handle<AcceptingHandler>> {
        self.handle.as_ref().ok_or(Error::SessionClosed)
    }

    /// Close the session. Idempotent and infallible: safe on an
    /// already-closed or never-connected session, and secondary errors from
    /// transport teardown are swallowed.
    pub async fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle
                .disconnect(Disconnect::ByApplication, "", "")
                .await;
            tracing::debug!("session to {} closed", self.credentials.host);
        }
        self.state = SessionState::Closed;
    }
}

impl Debug for RemoteSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSession")
            .field("host", &self.credentials.host)
            .field("port", &self.credentials.port)
            .field("username", &self.credentials.username)
            .field("state", &self.state)
            .field("authenticated_via", &self.authenticated_via)
            .finish()
    }
}

/// Runs resolved attempts against a live russh handle.
struct HandleRunner<'a> {
    handle: &'a mut Handle<AcceptingHandler>,
    username: &'a str,
    key_data: Option<&'a str>,
}

impl AttemptRunner for HandleRunner<'_> {
    async fn try_attempt(&mut self, attempt: &AuthAttempt) -> Result<()> {
        match attempt {
            AuthAttempt::Key { format, passphrase } => {
                let data = self
                    .key_data
                    .ok_or_else(|| Error::KeyInvalid("key file could not be read".to_string()))?;
                let key =
                    russh::keys::decode_secret_key(data, passphrase.as_ref().map(|p| p.as_str()))
                        .map_err(|e| Error::KeyInvalid(e.to_string()))?;
                if !format.matches(&key.algorithm()) {
                    return Err(Error::KeyInvalid(format!(
                        "not a {} key",
                        format.name()
                    )));
                }

                let hash = self.handle.best_supported_rsa_hash().await?.flatten();
                let auth_result = tokio::time::timeout(
                    Duration::from_secs(AUTH_TIMEOUT_SECS),
                    self.handle.authenticate_publickey(
                        self.username,
                        PrivateKeyWithHashAlg::new(Arc::new(key), hash),
                    ),
                )
                .await
                .map_err(|_| Error::AuthTimeout(AUTH_TIMEOUT_SECS))??;

                if !auth_result.success() {
                    return Err(Error::KeyAuthFailed);
                }
            }
            AuthAttempt::Password { password } => {
                let auth_result = tokio::time::timeout(
                    Duration::from_secs(AUTH_TIMEOUT_SECS),
                    self.handle
                        .authenticate_password(self.username, password.as_str()),
                )
                .await
                .map_err(|_| Error::AuthTimeout(AUTH_TIMEOUT_SECS))??;

                if !auth_result.success() {
                    return Err(Error::PasswordWrong);
                }
            }
        }
        Ok(())
    }
}
