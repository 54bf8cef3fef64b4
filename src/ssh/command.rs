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

//! Remote command execution.

use std::time::Duration;

use russh::ChannelMsg;

use super::session::RemoteSession;
use crate::error::{Error, Result};

/// Per-command dispatch timeout
pub const COMMAND_TIMEOUT_SECS: u64 = 30;

/// Result of a command execution.
///
/// `success` means the command ran and exited zero. `exit_code` is `-1` when
/// the command could not be dispatched at all, and only then is `error` set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub success: bool,
    /// Decoded stdout, trailing whitespace stripped
    pub stdout: String,
    /// Decoded stderr, trailing whitespace stripped
    pub stderr: String,
    pub exit_code: i32,
    pub error: Option<String>,
}

impl CommandResult {
    pub(crate) fn dispatch_failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: -1,
            error: Some(error.into()),
        }
    }
}

impl RemoteSession {
    /// Execute a remote command and collect stdout, stderr and exit code.
    ///
    /// With `elevated` the command line is prefixed with the elevation
    /// invocation before dispatch. Output is decoded permissively (invalid
    /// bytes replaced). Every invocation is a new shell context, so `cd` and
    /// variable assignments do not carry over to the next call.
    ///
    /// Dispatch-level failures (no connection, timeout, channel breakage)
    /// are folded into the returned [`CommandResult`], never raised.
    pub async fn execute(&mut self, command: &str, elevated: bool) -> CommandResult {
        match self.try_execute(command, elevated).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("failed to execute '{}': {}", command, e);
                CommandResult::dispatch_failure(e.to_string())
            }
        }
    }

    async fn try_execute(&mut self, command: &str, elevated: bool) -> Result<CommandResult> {
        self.ensure_connected().await?;

        let command_line = if elevated {
            format!("sudo {command}")
        } else {
            command.to_string()
        };
        tracing::debug!("executing command: {}", command_line);

        let mut channel = self.live_handle()?.channel_open_session().await?;
        channel.exec(true, command_line.as_str()).await?;

        let mut stdout_buffer: Vec<u8> = Vec::new();
        let mut stderr_buffer: Vec<u8> = Vec::new();
        let mut exit_code: Option<u32> = None;

        let collect = async {
            while let Some(msg) = channel.wait().await {
                match msg {
                    ChannelMsg::Data { ref data } => stdout_buffer.extend_from_slice(data),
                    ChannelMsg::ExtendedData { ref data, ext } if ext == 1 => {
                        stderr_buffer.extend_from_slice(data)
                    }
                    // The exit report can precede trailing data; keep
                    // draining until the channel closes.
                    ChannelMsg::ExitStatus { exit_status } => exit_code = Some(exit_status),
                    _ => {}
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(COMMAND_TIMEOUT_SECS), collect)
            .await
            .map_err(|_| Error::CommandTimeout(COMMAND_TIMEOUT_SECS))?;

        let Some(status) = exit_code else {
            return Err(Error::CommandDidntExit);
        };

        let exit_code = status as i32;
        tracing::debug!("command exited with status {}", exit_code);
        Ok(CommandResult {
            success: exit_code == 0,
            stdout: String::from_utf8_lossy(&stdout_buffer)
                .trim_end()
                .to_string(),
            stderr: String::from_utf8_lossy(&stderr_buffer)
                .trim_end()
                .to_string(),
            exit_code,
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_failure_shape() {
        let result = CommandResult::dispatch_failure("session is closed");
        assert!(!result.success);
        assert_eq!(result.exit_code, -1);
        assert_eq!(result.error.as_deref(), Some("session is closed"));
        assert!(result.stdout.is_empty());
        assert!(result.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_execute_on_closed_session_returns_result_value() {
        let mut session = RemoteSession::new(
            crate::CredentialSet::new("host", "user").with_password("secret"),
        );
        session.close().await;

        let result = session.execute("systemctl status app", false).await;
        assert!(!result.success);
        assert_eq!(result.exit_code, -1);
        assert_eq!(result.error.as_deref(), Some("session is closed"));
    }
}
