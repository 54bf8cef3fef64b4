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

//! Tests for session lifecycle guarantees.
//!
//! `close` must be idempotent and safe on a session that never connected,
//! and expected failures must come back as result values with a non-empty
//! error description rather than crossing the public boundary as errors.

use std::path::Path;
use std::time::Duration;

use remote_ops::{
    CredentialSet, Error, RemoteSession, SessionState, DEFAULT_READ_LIMIT,
};

fn unconnected_session() -> RemoteSession {
    RemoteSession::new(
        CredentialSet::new("127.0.0.1", "ops")
            .with_port(2222)
            .with_password("secret"),
    )
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let mut session = unconnected_session();

    session.close().await;
    assert_eq!(session.state(), SessionState::Closed);

    // Closing again is a no-op, not a failure.
    session.close().await;
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_close_on_never_connected_session_is_safe() {
    let mut session = unconnected_session();
    assert_eq!(session.state(), SessionState::Disconnected);
    session.close().await;
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_closed_session_is_not_reused() {
    let mut session = unconnected_session();
    session.close().await;

    let err = session.connect().await.unwrap_err();
    assert!(matches!(err, Error::SessionClosed), "{err:?}");
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_every_operation_returns_a_result_value_after_close() {
    let mut session = unconnected_session();
    session.close().await;

    let command = session.execute("systemctl status app", true).await;
    assert!(!command.success);
    assert_eq!(command.exit_code, -1);
    assert!(command.error.as_deref().is_some_and(|e| !e.is_empty()));

    let listing = session.list_files("/var/log", true).await;
    assert!(!listing.success);
    assert!(listing.error.as_deref().is_some_and(|e| !e.is_empty()));

    let read = session.read_file("/var/log/app.log", DEFAULT_READ_LIMIT).await;
    assert!(!read.success);
    assert!(read.payload.is_none());
    assert!(read.error.as_deref().is_some_and(|e| !e.is_empty()));

    let write = session.write_file("/etc/app/app.conf", "key = value").await;
    assert!(!write.success);
    assert!(write.error.as_deref().is_some_and(|e| !e.is_empty()));

    let upload = session
        .upload_file(Path::new("/tmp/build.tar.gz"), "/srv/app/build.tar.gz")
        .await;
    assert!(!upload.success);

    let download = session
        .download_file("/var/log/app.log", Path::new("/tmp/app.log"))
        .await;
    assert!(!download.success);

    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_unreachable_host_surfaces_through_the_result_value() {
    // Implicit connect inside execute fails (nothing listens on the port);
    // the failure must come back inside the CommandResult.
    let mut session = RemoteSession::new(
        CredentialSet::new("127.0.0.1", "ops")
            .with_port(reserved_free_port().await)
            .with_password("secret"),
    );

    let result = session.execute("echo hello", false).await;
    assert!(!result.success);
    assert_eq!(result.exit_code, -1);
    assert!(result.error.as_deref().is_some_and(|e| !e.is_empty()));
}

/// Reserve a localhost port and release it so connections to it are refused.
async fn reserved_free_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

#[tokio::test]
async fn test_connect_retry_defaults_are_visible() {
    // The default policy is part of the caller contract: 3 attempts,
    // 2 seconds apart, fixed per-phase budgets.
    assert_eq!(remote_ops::ssh::session::DEFAULT_MAX_RETRIES, 3);
    assert_eq!(
        remote_ops::ssh::session::DEFAULT_RETRY_DELAY,
        Duration::from_secs(2)
    );
    assert_eq!(remote_ops::ssh::session::CONNECT_TIMEOUT_SECS, 30);
    assert_eq!(remote_ops::ssh::session::BANNER_TIMEOUT_SECS, 60);
    assert_eq!(remote_ops::ssh::session::AUTH_TIMEOUT_SECS, 30);
    assert_eq!(remote_ops::ssh::session::KEEPALIVE_INTERVAL_SECS, 60);
    assert_eq!(remote_ops::ssh::COMMAND_TIMEOUT_SECS, 30);
}
