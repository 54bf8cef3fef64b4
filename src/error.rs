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

//! Error types for session, command and file-transfer operations.

use thiserror::Error;

/// Errors that can occur while connecting to or operating on a remote host.
///
/// Only `connect` surfaces these directly. Command and file operations
/// recover from them at the call boundary and report the message through
/// their result values instead.
#[derive(Debug, Error)]
pub enum Error {
    /// No usable credential material was supplied
    #[error("no usable credential material: provide a password or a private key path")]
    Configuration,

    /// TCP connection did not complete within the budget
    #[error("connection timeout after {0} seconds")]
    ConnectTimeout(u64),

    /// TCP connected but the SSH handshake never completed. Usually network
    /// latency or host overload rather than bad credentials.
    #[error("could not read the SSH protocol banner within {0} seconds")]
    HandshakeTimeout(u64),

    /// A single authentication attempt did not complete within the budget
    #[error("authentication timeout after {0} seconds")]
    AuthTimeout(u64),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// SSH error from russh
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// SFTP error from russh-sftp
    #[error("SFTP error: {0:?}")]
    Sftp(#[from] russh_sftp::client::error::Error),

    /// Private key could not be loaded or did not match the probed format
    #[error("invalid key: {0}")]
    KeyInvalid(String),

    /// The server rejected the offered key
    #[error("key authentication failed")]
    KeyAuthFailed,

    /// Wrong password
    #[error("password authentication failed")]
    PasswordWrong,

    /// Every resolved authentication attempt failed against a live transport
    #[error("all authentication attempts failed: {0}")]
    AuthenticationFailed(String),

    /// The session was explicitly closed and cannot be reused
    #[error("session is closed")]
    SessionClosed,

    /// Command dispatched but the channel closed without an exit report
    #[error("command did not exit")]
    CommandDidntExit,

    /// Command did not complete within the dispatch budget
    #[error("command did not complete within {0} seconds")]
    CommandTimeout(u64),
}

impl Error {
    /// Whether this is a banner/handshake-class connection failure.
    ///
    /// These are logged distinctly from other transport failures because they
    /// typically indicate transient network or host load, not bad credentials.
    pub fn is_banner_class(&self) -> bool {
        matches!(self, Error::HandshakeTimeout(_))
    }
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::Configuration.to_string(),
            "no usable credential material: provide a password or a private key path"
        );
        assert_eq!(
            Error::HandshakeTimeout(60).to_string(),
            "could not read the SSH protocol banner within 60 seconds"
        );
        assert_eq!(Error::SessionClosed.to_string(), "session is closed");
        assert_eq!(
            Error::CommandTimeout(30).to_string(),
            "command did not complete within 30 seconds"
        );
    }

    #[test]
    fn test_banner_class_is_distinct() {
        assert!(Error::HandshakeTimeout(60).is_banner_class());
        assert!(!Error::ConnectTimeout(30).is_banner_class());
        assert!(!Error::Configuration.is_banner_class());
        assert!(!Error::PasswordWrong.is_banner_class());
    }
}
