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

//! Host backend.
//!
//! Job objects, completion ports and access tokens exist only on Windows.
//! Other hosts get a backend with the same surface whose constructors fail,
//! so the portable layers above still build and test everywhere.

#[cfg(windows)]
mod win32;
#[cfg(windows)]
pub use self::win32::{
    process_integrity_sid, process_user_sid, IoCompletionPort, JobHandle, TokenHandle,
};

#[cfg(not(windows))]
mod unsupported;
#[cfg(not(windows))]
pub use self::unsupported::{process_integrity_sid, process_user_sid, JobHandle, TokenHandle};
