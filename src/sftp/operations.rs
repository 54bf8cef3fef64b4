// Copyright 2025 Lablup Inc.
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

//! File operations over the SFTP subsystem.
//!
//! Every operation opens the `sftp` subsystem channel for the duration of
//! the call and closes it before returning; no file-subsystem handle is ever
//! held across calls. Underlying failures are converted to result values at
//! the call boundary and never raised past it.

use std::path::Path;

use russh_sftp::client::SftpSession;
use russh_sftp::protocol::OpenFlags;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::types::{join_remote, relative_to_root, FileListing, RemoteFileDescriptor, TransferOutcome};
use crate::error::Result;
use crate::ssh::session::RemoteSession;

/// Default cap for [`RemoteSession::read_file`]: 10 MiB
pub const DEFAULT_READ_LIMIT: u64 = 10 * 1024 * 1024;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Rejection message for a read whose remote file exceeds the cap. States
/// both figures in megabytes so the operator understands why no content came
/// back.
fn oversize_message(size: u64, max_size: u64) -> String {
    format!(
        "file is {:.2} MB, over the {:.2} MB limit; download it instead",
        size as f64 / BYTES_PER_MB,
        max_size as f64 / BYTES_PER_MB
    )
}

impl RemoteSession {
    /// Open the SFTP subsystem on a fresh channel.
    async fn open_sftp(&self) -> Result<SftpSession> {
        let channel = self.live_handle()?.channel_open_session().await?;
        channel.request_subsystem(true, "sftp").await?;
        Ok(SftpSession::new(channel.into_stream()).await?)
    }

    /// List a remote directory, depth-first.
    ///
    /// With `recursive`, subdirectory entries are merged into the same flat
    /// vector. A subdirectory that fails to list is logged and skipped; only
    /// a failure on the root itself fails the whole listing.
    pub async fn list_files(&mut self, root_path: &str, recursive: bool) -> FileListing {
        match self.try_list_files(root_path, recursive).await {
            Ok(files) => FileListing::ok(files),
            Err(e) => {
                tracing::error!("failed to list {}: {}", root_path, e);
                FileListing::failure(e.to_string())
            }
        }
    }

    async fn try_list_files(
        &mut self,
        root_path: &str,
        recursive: bool,
    ) -> Result<Vec<RemoteFileDescriptor>> {
        self.ensure_connected().await?;
        let sftp = self.open_sftp().await?;
        let result = list_via(&sftp, root_path, recursive).await;
        let _ = sftp.close().await;
        result
    }

    /// Read a remote file, refusing transfers larger than `max_size` bytes.
    ///
    /// The remote file is stat'ed first; an oversized file is rejected
    /// before any content moves, with the outcome's `size` carrying the real
    /// remote size. Content is decoded permissively (invalid bytes
    /// replaced). Use [`DEFAULT_READ_LIMIT`] for the standard 10 MiB cap.
    pub async fn read_file(&mut self, path: &str, max_size: u64) -> TransferOutcome {
        match self.try_read_file(path, max_size).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("failed to read {}: {}", path, e);
                TransferOutcome::failure(e.to_string())
            }
        }
    }

    async fn try_read_file(&mut self, path: &str, max_size: u64) -> Result<TransferOutcome> {
        self.ensure_connected().await?;
        let sftp = self.open_sftp().await?;
        let result = read_via(&sftp, path, max_size).await;
        let _ = sftp.close().await;
        result
    }

    /// Overwrite a remote file with `content`, UTF-8 encoded.
    ///
    /// No partial-write recovery is attempted; a mid-write failure comes
    /// back as a plain error.
    pub async fn write_file(&mut self, path: &str, content: &str) -> TransferOutcome {
        match self.try_write_file(path, content).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("failed to write {}: {}", path, e);
                TransferOutcome::failure(e.to_string())
            }
        }
    }

    async fn try_write_file(&mut self, path: &str, content: &str) -> Result<TransferOutcome> {
        self.ensure_connected().await?;
        let sftp = self.open_sftp().await?;
        let result = write_via(&sftp, path, content.as_bytes()).await;
        let _ = sftp.close().await;
        result
    }

    /// Upload a local file to the remote host in one whole-file copy.
    pub async fn upload_file(&mut self, local_path: &Path, remote_path: &str) -> TransferOutcome {
        match self.try_upload_file(local_path, remote_path).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("failed to upload {:?} to {}: {}", local_path, remote_path, e);
                TransferOutcome::failure(e.to_string())
            }
        }
    }

    async fn try_upload_file(
        &mut self,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<TransferOutcome> {
        self.ensure_connected().await?;
        let contents = tokio::fs::read(local_path).await?;
        tracing::debug!(
            "uploading {:?} ({} bytes) to {}",
            local_path,
            contents.len(),
            remote_path
        );
        let sftp = self.open_sftp().await?;
        let result = write_via(&sftp, remote_path, &contents).await;
        let _ = sftp.close().await;
        result
    }

    /// Download a remote file to a local path in one whole-file copy.
    pub async fn download_file(&mut self, remote_path: &str, local_path: &Path) -> TransferOutcome {
        match self.try_download_file(remote_path, local_path).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    "failed to download {} to {:?}: {}",
                    remote_path,
                    local_path,
                    e
                );
                TransferOutcome::failure(e.to_string())
            }
        }
    }

    async fn try_download_file(
        &mut self,
        remote_path: &str,
        local_path: &Path,
    ) -> Result<TransferOutcome> {
        self.ensure_connected().await?;
        let sftp = self.open_sftp().await?;
        let result = download_via(&sftp, remote_path, local_path).await;
        let _ = sftp.close().await;
        result
    }
}

async fn list_via(
    sftp: &SftpSession,
    root_path: &str,
    recursive: bool,
) -> Result<Vec<RemoteFileDescriptor>> {
    let mut files = Vec::new();
    let mut pending: Vec<String> = vec![root_path.to_string()];

    while let Some(dir) = pending.pop() {
        let entries = match sftp.read_dir(dir.as_str()).await {
            Ok(entries) => entries,
            Err(e) if dir == root_path => return Err(e.into()),
            Err(e) => {
                // Skip unreadable subdirectories, keep traversing.
                tracing::warn!("failed to list {}: {:?}", dir, e);
                continue;
            }
        };

        for entry in entries {
            let name = entry.file_name();
            let path = join_remote(&dir, &name);
            let attrs = match sftp.metadata(path.as_str()).await {
                Ok(attrs) => attrs,
                Err(e) => {
                    tracing::warn!("failed to stat {}: {:?}", path, e);
                    continue;
                }
            };
            let is_directory = attrs.is_dir();

            files.push(RemoteFileDescriptor {
                relative_path: relative_to_root(root_path, &path, &name),
                name,
                path: path.clone(),
                size: attrs.size.unwrap_or(0),
                is_directory,
                modified_at: attrs.mtime.map(u64::from).unwrap_or(0),
            });

            if recursive && is_directory {
                pending.push(path);
            }
        }
    }

    Ok(files)
}

async fn read_via(sftp: &SftpSession, path: &str, max_size: u64) -> Result<TransferOutcome> {
    let attrs = sftp.metadata(path).await?;
    let size = attrs.size.unwrap_or(0);
    if size > max_size {
        return Ok(TransferOutcome::rejected(
            size,
            oversize_message(size, max_size),
        ));
    }

    let mut file = sftp.open_with_flags(path, OpenFlags::READ).await?;
    let mut contents = Vec::new();
    file.read_to_end(&mut contents).await?;

    Ok(TransferOutcome::with_payload(
        String::from_utf8_lossy(&contents).into_owned(),
        size,
    ))
}

async fn write_via(sftp: &SftpSession, path: &str, contents: &[u8]) -> Result<TransferOutcome> {
    let mut file = sftp
        .open_with_flags(
            path,
            OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE,
        )
        .await?;
    file.write_all(contents).await?;
    file.flush().await?;
    file.shutdown().await?;
    Ok(TransferOutcome::ok())
}

async fn download_via(
    sftp: &SftpSession,
    remote_path: &str,
    local_path: &Path,
) -> Result<TransferOutcome> {
    let mut remote_file = sftp.open_with_flags(remote_path, OpenFlags::READ).await?;
    let mut contents = Vec::new();
    remote_file.read_to_end(&mut contents).await?;

    let mut local_file = tokio::fs::File::create(local_path).await?;
    local_file.write_all(&contents).await?;
    local_file.flush().await?;
    Ok(TransferOutcome::ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oversize_message_states_both_figures_in_mb() {
        let msg = oversize_message(200 * 1024 * 1024, 10 * 1024 * 1024);
        assert!(msg.contains("200.00 MB"), "{msg}");
        assert!(msg.contains("10.00 MB"), "{msg}");
    }

    #[test]
    fn test_oversize_message_with_fractional_sizes() {
        let msg = oversize_message(1536 * 1024, 1024 * 1024);
        assert!(msg.contains("1.50 MB"), "{msg}");
        assert!(msg.contains("1.00 MB"), "{msg}");
    }

    #[tokio::test]
    async fn test_file_operations_on_closed_session_return_result_values() {
        let mut session = crate::RemoteSession::new(
            crate::CredentialSet::new("host", "user").with_password("secret"),
        );
        session.close().await;

        let listing = session.list_files("/var/log", false).await;
        assert!(!listing.success);
        assert!(listing.files.is_empty());
        assert_eq!(listing.error.as_deref(), Some("session is closed"));

        let read = session.read_file("/var/log/app.log", DEFAULT_READ_LIMIT).await;
        assert!(!read.success);
        assert!(read.payload.is_none());
        assert_eq!(read.error.as_deref(), Some("session is closed"));

        let write = session.write_file("/tmp/x", "content").await;
        assert!(!write.success);

        let upload = session
            .upload_file(Path::new("/tmp/local"), "/tmp/remote")
            .await;
        assert!(!upload.success);

        let download = session
            .download_file("/tmp/remote", Path::new("/tmp/local"))
            .await;
        assert!(!download.success);
    }
}
