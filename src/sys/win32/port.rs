// Copyright 2026 BadCompany
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

use windows::Win32::Foundation::INVALID_HANDLE_VALUE;
use windows::Win32::System::Threading::INFINITE;
use windows::Win32::System::IO::{
    CreateIoCompletionPort, GetQueuedCompletionStatusEx, PostQueuedCompletionStatus, OVERLAPPED,
    OVERLAPPED_ENTRY,
};

use super::handle::Handle;
use crate::engine_core::errors::{Result, WincError};
use crate::engine_core::types::CompletionKey;
use crate::notify::queue::{CompletionQueue, RawEvent};

/// I/O completion port drained by a single listener thread.
pub struct IoCompletionPort {
    handle: Handle,
}

impl CompletionQueue for IoCompletionPort {
    fn open() -> Result<Self> {
        let port = unsafe { CreateIoCompletionPort(INVALID_HANDLE_VALUE, None, 0, 1) }
            .map_err(|e| WincError::CompletionPort(format!("CreateIoCompletionPort failed: {}", e)))?;
        Ok(Self {
            handle: Handle::new(port),
        })
    }

    fn wait_batch(&self, out: &mut Vec<RawEvent>, max: usize) -> Result<()> {
        let mut entries = vec![OVERLAPPED_ENTRY::default(); max.max(1)];
        let mut removed = 0u32;
        unsafe {
            GetQueuedCompletionStatusEx(
                self.handle.get(),
                &mut entries,
                &mut removed,
                INFINITE,
                false,
            )
        }
        .map_err(|e| {
            WincError::CompletionPort(format!("GetQueuedCompletionStatusEx failed: {}", e))
        })?;

        out.extend(entries.iter().take(removed as usize).map(|entry| RawEvent {
            key: CompletionKey::new(entry.lpCompletionKey),
            code: entry.dwNumberOfBytesTransferred,
            value: entry.lpOverlapped as usize,
        }));
        Ok(())
    }

    fn post(&self, event: RawEvent) -> Result<()> {
        unsafe {
            PostQueuedCompletionStatus(
                self.handle.get(),
                event.code,
                event.key.as_usize(),
                Some(event.value as *const OVERLAPPED),
            )
        }
        .map_err(|e| WincError::CompletionPort(format!("PostQueuedCompletionStatus failed: {}", e)))
    }

    fn raw_handle(&self) -> Option<isize> {
        Some(self.handle.as_raw())
    }
}
