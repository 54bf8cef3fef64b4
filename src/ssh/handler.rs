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

//! Client-side SSH event handler.

use russh::client::Handler;

use crate::error::Error;

/// Handler that accepts the server's host key unconditionally.
///
/// The managed hosts this client talks to are provisioned by the same
/// operators that configure the credentials. Host-key pinning, if wanted,
/// belongs to the caller.
#[derive(Debug, Clone)]
pub struct AcceptingHandler;

impl Handler for AcceptingHandler {
    type Error = Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}
