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

use windows::Win32::Foundation::{CloseHandle, HANDLE};

/// Exclusively owned kernel handle, closed exactly once on drop.
pub struct Handle(HANDLE);

// Kernel handles are process-wide values; the owning wrapper decides who may use them.
unsafe impl Send for Handle {}
unsafe impl Sync for Handle {}

impl Handle {
    pub fn new(handle: HANDLE) -> Self {
        Self(handle)
    }

    pub fn get(&self) -> HANDLE {
        self.0
    }

    pub fn as_raw(&self) -> isize {
        self.0 .0 as isize
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if !self.0.is_invalid() {
            unsafe {
                let _ = CloseHandle(self.0);
            }
        }
    }
}
