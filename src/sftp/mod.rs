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

//! SFTP file operations: directory listing, bounded reads, writes,
//! uploads and downloads. The methods themselves live on
//! [`crate::RemoteSession`]; this module holds their result shapes.

pub mod operations;
pub mod types;

pub use operations::DEFAULT_READ_LIMIT;
pub use types::{FileListing, RemoteFileDescriptor, TransferOutcome};
