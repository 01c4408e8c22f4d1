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

//! winc: a process containment engine.
//!
//! This library drives the host's native resource groups (job objects) and
//! security principals (access tokens) to run untrusted workloads under
//! aggregate limits and a reduced identity. Lifecycle and limit events for
//! every live group are multiplexed through one process-wide completion
//! queue and routed to the [`notify::Target`] that owns the group.

pub mod config;
pub mod engine_core;
pub mod job;
pub mod logon;
pub mod notify;
mod sys;

pub use engine_core::errors::{Result, ResultCode, WincError};
pub use engine_core::types::{CompletionKey, IntegrityLevel, ProcessId, RawProcessHandle};
pub use job::limits::{Accounting, ExtendedLimits, UiRestrictions};
pub use job::ResourceGroup;
pub use logon::{process_integrity_level, Logon, Sid};
pub use notify::{Dispatcher, JobMessage, Target};
