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

//! winc Constants - Single source of truth for host values.
//!
//! The numeric values mirror the host headers so the portable layers
//! (message decoding, limit flags, configuration) can be exercised on any
//! platform. The Windows backend converts to the `windows` crate types at
//! the boundary.

/// Job object completion message codes, delivered as the
/// "bytes transferred" field of a completion packet.
pub mod job_msg {
    pub const END_OF_JOB_TIME: u32 = 1;
    pub const END_OF_PROCESS_TIME: u32 = 2;
    pub const ACTIVE_PROCESS_LIMIT: u32 = 3;
    pub const ACTIVE_PROCESS_ZERO: u32 = 4;
    pub const NEW_PROCESS: u32 = 6;
    pub const EXIT_PROCESS: u32 = 7;
    pub const ABNORMAL_EXIT_PROCESS: u32 = 8;
    pub const PROCESS_MEMORY_LIMIT: u32 = 9;
    pub const JOB_MEMORY_LIMIT: u32 = 10;
    pub const NOTIFICATION_LIMIT: u32 = 11;
}

/// `LimitFlags` bits of the basic limit structure.
pub mod limit_flags {
    pub const WORKINGSET: u32 = 0x0000_0001;
    pub const PROCESS_TIME: u32 = 0x0000_0002;
    pub const JOB_TIME: u32 = 0x0000_0004;
    pub const ACTIVE_PROCESS: u32 = 0x0000_0008;
    pub const AFFINITY: u32 = 0x0000_0010;
    pub const PRIORITY_CLASS: u32 = 0x0000_0020;
    pub const PRESERVE_JOB_TIME: u32 = 0x0000_0040;
    pub const SCHEDULING_CLASS: u32 = 0x0000_0080;
    pub const PROCESS_MEMORY: u32 = 0x0000_0100;
    pub const JOB_MEMORY: u32 = 0x0000_0200;
    pub const DIE_ON_UNHANDLED_EXCEPTION: u32 = 0x0000_0400;
    pub const BREAKAWAY_OK: u32 = 0x0000_0800;
    pub const SILENT_BREAKAWAY_OK: u32 = 0x0000_1000;
    pub const KILL_ON_JOB_CLOSE: u32 = 0x0000_2000;
}

/// `UIRestrictionsClass` bits.
pub mod ui_limit {
    pub const HANDLES: u32 = 0x0000_0001;
    pub const READCLIPBOARD: u32 = 0x0000_0002;
    pub const WRITECLIPBOARD: u32 = 0x0000_0004;
    pub const SYSTEMPARAMETERS: u32 = 0x0000_0008;
    pub const DISPLAYSETTINGS: u32 = 0x0000_0010;
    pub const GLOBALATOMS: u32 = 0x0000_0020;
    pub const DESKTOP: u32 = 0x0000_0040;
    pub const EXITWINDOWS: u32 = 0x0000_0080;
}

/// Mandatory integrity label RIDs.
pub mod integrity {
    pub const UNTRUSTED_RID: u32 = 0x0000;
    pub const LOW_RID: u32 = 0x1000;
    pub const MEDIUM_RID: u32 = 0x2000;
    pub const MEDIUM_PLUS_RID: u32 = 0x2100;
    pub const HIGH_RID: u32 = 0x3000;
    pub const SYSTEM_RID: u32 = 0x4000;
    /// Identifier authority of mandatory label SIDs (S-1-16-*).
    pub const LABEL_AUTHORITY: [u8; 6] = [0, 0, 0, 0, 0, 16];
    /// `SE_GROUP_INTEGRITY` attribute of the label entry.
    pub const SE_GROUP_INTEGRITY: u32 = 0x0000_0020;
}

/// Win32 error codes the backend distinguishes.
pub mod win32 {
    pub const ERROR_PRIVILEGE_NOT_HELD: u32 = 1314;
    pub const ERROR_LOGON_FAILURE: u32 = 1326;
}

/// Completion listener tuning.
pub mod listener {
    /// Completion packets drained per wait.
    pub const ENTRIES_PER_CALL: usize = 16;
    /// Name of the dedicated listener thread.
    pub const THREAD_NAME: &str = "winc-job-events";
}

/// Durations in job structures are counted in 100ns ticks.
pub const TICKS_PER_SECOND: u64 = 10_000_000;

/// Configuration keys
pub mod config {
    pub const ENV_LOG_LEVEL: &str = "WINC_LOG_LEVEL";
    pub const ENV_LOG_FORMAT: &str = "WINC_LOG_FORMAT";
    pub const ENV_INTEGRITY_LEVEL: &str = "WINC_INTEGRITY_LEVEL";
    pub const ENV_PROFILE_PATH: &str = "WINC_PROFILE_PATH";

    pub const DEFAULT_LOG_LEVEL: &str = "info";
    pub const DEFAULT_LOG_FORMAT: &str = "text";
}
