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

//! Credential material for one remote host.

use std::path::PathBuf;
use zeroize::Zeroizing;

/// Default SSH port
pub const DEFAULT_PORT: u16 = 22;

/// Everything needed to reach and authenticate against one managed host.
///
/// The `password` field is deliberately ambiguous: when a key path is also
/// present it doubles as the key's passphrase before it is tried as a plain
/// login password. See the fallback order in [`crate::ssh::resolve_attempts`].
///
/// At least one of `password` / `key_path` must be set; a session built from
/// a `CredentialSet` carrying neither fails fast with a configuration error
/// before any network attempt. This crate never persists credentials.
#[derive(Debug, Clone)]
pub struct CredentialSet {
    pub host: String,
    pub port: u16,
    pub username: String,
    /// Login password, or passphrase for an encrypted private key
    pub password: Option<Zeroizing<String>>,
    /// Path to a private key file
    pub key_path: Option<PathBuf>,
}

impl CredentialSet {
    /// Create a credential set for `username@host` on the default port.
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            username: username.into(),
            password: None,
            key_path: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(Zeroizing::new(password.to_string()));
        self
    }

    pub fn with_key_path(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.key_path = Some(key_path.into());
        self
    }

    /// Whether any credential material is present at all.
    pub fn has_credential_material(&self) -> bool {
        self.password.is_some() || self.key_path.is_some()
    }
}
