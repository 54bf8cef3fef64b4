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

//! Result shapes for file operations.

/// One entry produced by a directory listing. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFileDescriptor {
    /// Base filename
    pub name: String,
    /// Absolute remote path
    pub path: String,
    /// Path relative to the listing root; empty when the entry is the root
    pub relative_path: String,
    /// Size in bytes
    pub size: u64,
    pub is_directory: bool,
    /// Modification time in seconds since the epoch, host clock
    pub modified_at: u64,
}

/// Outcome of a directory listing. Recursive listings are flattened into a
/// single `files` vector; there is no nesting in this shape.
#[derive(Debug, Clone, Default)]
pub struct FileListing {
    pub success: bool,
    pub files: Vec<RemoteFileDescriptor>,
    pub error: Option<String>,
}

impl FileListing {
    pub(crate) fn ok(files: Vec<RemoteFileDescriptor>) -> Self {
        Self {
            success: true,
            files,
            error: None,
        }
    }

    pub(crate) fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            files: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Outcome shared by read, write, upload and download.
///
/// `payload` and `size` are populated only by reads; `size` carries the real
/// remote size even when the read was rejected for exceeding the cap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferOutcome {
    pub success: bool,
    pub payload: Option<String>,
    pub size: Option<u64>,
    pub error: Option<String>,
}

impl TransferOutcome {
    pub(crate) fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub(crate) fn with_payload(payload: String, size: u64) -> Self {
        Self {
            success: true,
            payload: Some(payload),
            size: Some(size),
            error: None,
        }
    }

    pub(crate) fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Rejection that still reports the remote side's real size.
    pub(crate) fn rejected(size: u64, error: impl Into<String>) -> Self {
        Self {
            success: false,
            payload: None,
            size: Some(size),
            error: Some(error.into()),
        }
    }
}

/// Join a remote directory and entry name without doubling separators.
pub(crate) fn join_remote(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Path of `entry_path` relative to the listing root.
///
/// The root itself maps to the empty string. An entry outside the root's
/// prefix (which should not normally occur) falls back to its own filename.
pub(crate) fn relative_to_root(root: &str, entry_path: &str, name: &str) -> String {
    let root = root.trim_end_matches('/');
    if entry_path == root {
        String::new()
    } else if let Some(rest) = entry_path.strip_prefix(root).and_then(|r| r.strip_prefix('/')) {
        rest.to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_direct_child() {
        assert_eq!(relative_to_root("/a/b", "/a/b/c.txt", "c.txt"), "c.txt");
    }

    #[test]
    fn test_relative_path_nested_child() {
        assert_eq!(
            relative_to_root("/a/b", "/a/b/sub/d.txt", "d.txt"),
            "sub/d.txt"
        );
    }

    #[test]
    fn test_relative_path_of_root_itself_is_empty() {
        assert_eq!(relative_to_root("/a/b", "/a/b", "b"), "");
        assert_eq!(relative_to_root("/a/b/", "/a/b", "b"), "");
    }

    #[test]
    fn test_relative_path_outside_root_falls_back_to_name() {
        assert_eq!(relative_to_root("/a/b", "/x/y/z.txt", "z.txt"), "z.txt");
        // A sibling sharing the prefix string but not the directory.
        assert_eq!(relative_to_root("/a/b", "/a/bc/d.txt", "d.txt"), "d.txt");
    }

    #[test]
    fn test_relative_path_with_trailing_slash_root() {
        assert_eq!(relative_to_root("/a/b/", "/a/b/c.txt", "c.txt"), "c.txt");
    }

    #[test]
    fn test_join_remote() {
        assert_eq!(join_remote("/var/log", "app.log"), "/var/log/app.log");
        assert_eq!(join_remote("/var/log/", "app.log"), "/var/log/app.log");
        assert_eq!(join_remote("/", "etc"), "/etc");
    }

    #[test]
    fn test_rejected_outcome_carries_real_size() {
        let outcome = TransferOutcome::rejected(200, "too large");
        assert!(!outcome.success);
        assert_eq!(outcome.size, Some(200));
        assert!(outcome.payload.is_none());
        assert_eq!(outcome.error.as_deref(), Some("too large"));
    }

    #[test]
    fn test_plain_outcomes() {
        assert!(TransferOutcome::ok().success);
        let failed = TransferOutcome::failure("io");
        assert!(!failed.success);
        assert!(failed.size.is_none());
    }
}
