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

//! Remote operations client for managed hosts.
//!
//! This crate provides an authenticated remote-command session on top of
//! russh and russh-sftp with support for:
//! - Multiple authentication methods (private key in several formats, with or
//!   without passphrase, and plain password) tried in a fixed fallback order
//! - Command execution with optional privilege elevation
//! - Directory listing, bounded file reads, writes, uploads and downloads
//!
//! The heart of the crate is [`RemoteSession`]. Build one from a
//! [`CredentialSet`], connect (the connector retries transient handshake
//! failures), then issue command and file operations against it. Expected
//! failures never surface as errors from those operations; every call
//! returns a result value carrying a success flag and an error description.
//!
//! The caller owns scheduling: run each operation from a background task and
//! serialize operations issued against the same session.

pub mod credentials;
pub mod error;
pub mod sftp;
pub mod ssh;

pub use credentials::CredentialSet;
pub use error::{Error, Result};
pub use sftp::{FileListing, RemoteFileDescriptor, TransferOutcome, DEFAULT_READ_LIMIT};
pub use ssh::{CommandResult, RemoteSession, SessionState};
