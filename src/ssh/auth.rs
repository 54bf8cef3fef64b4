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

//! Authentication strategy resolution.
//!
//! This module turns a [`CredentialSet`] into an ordered, finite list of
//! authentication attempts and provides the generic first-success loop that
//! consumes it. Resolution is pure and does no I/O, so the fallback order is
//! testable without a transport. The connector decides how each attempt is
//! actually run against the wire.

use zeroize::Zeroizing;

use crate::credentials::CredentialSet;
use crate::error::Error;

/// Private key formats probed when loading a key file, in canonical order.
///
/// Remote hosts differ in which formats they accept, and the probing order
/// affects both connection latency and log clarity, so it is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFormat {
    Rsa,
    Ed25519,
    Ecdsa,
    /// Legacy format; modern key parsers reject it at load time, which the
    /// scan records and skips.
    Dsa,
}

impl KeyFormat {
    pub const CANONICAL_ORDER: [KeyFormat; 4] = [
        KeyFormat::Rsa,
        KeyFormat::Ed25519,
        KeyFormat::Ecdsa,
        KeyFormat::Dsa,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            KeyFormat::Rsa => "RSA",
            KeyFormat::Ed25519 => "Ed25519",
            KeyFormat::Ecdsa => "ECDSA",
            KeyFormat::Dsa => "DSA",
        }
    }

    /// Whether a parsed key's algorithm matches this probed format.
    pub(crate) fn matches(&self, algorithm: &russh::keys::Algorithm) -> bool {
        use russh::keys::Algorithm;
        match self {
            KeyFormat::Rsa => matches!(algorithm, Algorithm::Rsa { .. }),
            KeyFormat::Ed25519 => matches!(algorithm, Algorithm::Ed25519),
            KeyFormat::Ecdsa => matches!(algorithm, Algorithm::Ecdsa { .. }),
            KeyFormat::Dsa => matches!(algorithm, Algorithm::Dsa),
        }
    }
}

/// One candidate authentication method to try against a live transport.
#[derive(Debug, Clone)]
pub enum AuthAttempt {
    Key {
        format: KeyFormat,
        passphrase: Option<Zeroizing<String>>,
    },
    Password {
        password: Zeroizing<String>,
    },
}

impl AuthAttempt {
    /// Human-readable tag for diagnostics, recorded as `authenticated_via`
    /// on the session when the attempt wins.
    pub fn label(&self) -> String {
        match self {
            AuthAttempt::Key {
                format,
                passphrase: None,
            } => format!("{} key", format.name()),
            AuthAttempt::Key {
                format,
                passphrase: Some(_),
            } => format!("{} key (with passphrase)", format.name()),
            AuthAttempt::Password { .. } => "password".to_string(),
        }
    }
}

/// Resolve the ordered attempt list for a credential set.
///
/// Order:
/// 1. key path set: every key format without a passphrase;
/// 2. key path and password set: the same format scan with the password as
///    the key's passphrase;
/// 3. password set: plain password authentication.
///
/// An empty list means no usable credential material; the connector maps it
/// to a configuration error without ever dialing the network.
pub fn resolve_attempts(credentials: &CredentialSet) -> Vec<AuthAttempt> {
    let mut attempts = Vec::new();

    if credentials.key_path.is_some() {
        for format in KeyFormat::CANONICAL_ORDER {
            attempts.push(AuthAttempt::Key {
                format,
                passphrase: None,
            });
        }
        if let Some(password) = &credentials.password {
            for format in KeyFormat::CANONICAL_ORDER {
                attempts.push(AuthAttempt::Key {
                    format,
                    passphrase: Some(password.clone()),
                });
            }
        }
    }

    if let Some(password) = &credentials.password {
        attempts.push(AuthAttempt::Password {
            password: password.clone(),
        });
    }

    attempts
}

/// Runs one resolved attempt against a live transport.
///
/// Decouples what to try from how the network call is made; the session
/// implements this over its russh handle, tests over a scripted fake.
pub(crate) trait AttemptRunner {
    async fn try_attempt(&mut self, attempt: &AuthAttempt) -> Result<(), Error>;
}

/// Try each attempt in order until one succeeds.
///
/// Returns the label of the winning attempt. When every attempt fails, the
/// first few failure descriptions are folded into the error; the full scan
/// is noisy and rarely adds anything past that.
pub(crate) async fn first_successful<R: AttemptRunner>(
    attempts: &[AuthAttempt],
    runner: &mut R,
) -> Result<String, Error> {
    let mut failures: Vec<String> = Vec::new();

    for attempt in attempts {
        let label = attempt.label();
        match runner.try_attempt(attempt).await {
            Ok(()) => {
                tracing::info!("authenticated via {}", label);
                return Ok(label);
            }
            Err(e) => {
                tracing::debug!("authentication attempt '{}' failed: {}", label, e);
                failures.push(format!("{label}: {e}"));
            }
        }
    }

    let summary = failures
        .iter()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .join("; ");
    Err(Error::AuthenticationFailed(summary))
}
