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

// Domain error types. Every fallible entry point returns one of these; the
// binding layer translates `ResultCode` into its own error convention.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WincError>;

/// Result codes at the binding boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum ResultCode {
    Ok = 0,
    Sid = 1,
    Logon = 2,
    Spawn = 3,
    Desktop = 4,
    JobObject = 5,
    Target = 6,
    Util = 7,
    CompletionPort = 8,
    PrivilegeNotHeld = 9,
}

impl ResultCode {
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            0 => ResultCode::Ok,
            1 => ResultCode::Sid,
            2 => ResultCode::Logon,
            3 => ResultCode::Spawn,
            4 => ResultCode::Desktop,
            5 => ResultCode::JobObject,
            6 => ResultCode::Target,
            7 => ResultCode::Util,
            8 => ResultCode::CompletionPort,
            9 => ResultCode::PrivilegeNotHeld,
            _ => return None,
        })
    }
}

/// Main error type for the containment engine
#[derive(Error, Debug)]
pub enum WincError {
    /// Security identifier could not be resolved or copied
    #[error("SID error: {0}")]
    Sid(String),

    /// Token creation, authentication or integrity adjustment failed
    #[error("Logon error: {0}")]
    Logon(String),

    /// Process creation failed (owned by the spawner)
    #[error("Spawn error: {0}")]
    Spawn(String),

    /// Desktop or window station setup failed (owned by the spawner)
    #[error("Desktop error: {0}")]
    Desktop(String),

    /// Job object creation, limit, assignment or termination failed
    #[error("Job object error: {0}")]
    ResourceGroup(String),

    /// Target rejected or could not be wired
    #[error("Target error: {0}")]
    Target(String),

    /// Miscellaneous helper failure
    #[error("Util error: {0}")]
    Util(String),

    /// Completion queue or listener thread could not be created
    #[error("Completion port error: {0}")]
    CompletionPort(String),

    /// The caller's token lacks a privilege the operation requires
    #[error("Privilege not held: {0}")]
    PrivilegeNotHeld(String),

    /// Operation on an identity that was never successfully initialized
    #[error("not initialized")]
    Uninitialized,

    /// `init` called on an identity that already left the uninitialized state
    #[error("already initialized")]
    AlreadyInitialized,

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

impl WincError {
    /// Binding-boundary code for this error.
    pub fn code(&self) -> ResultCode {
        match self {
            WincError::Sid(_) => ResultCode::Sid,
            WincError::Logon(_) => ResultCode::Logon,
            WincError::Spawn(_) => ResultCode::Spawn,
            WincError::Desktop(_) => ResultCode::Desktop,
            WincError::ResourceGroup(_) => ResultCode::JobObject,
            WincError::Target(_) => ResultCode::Target,
            WincError::Util(_) => ResultCode::Util,
            WincError::CompletionPort(_) => ResultCode::CompletionPort,
            WincError::PrivilegeNotHeld(_) => ResultCode::PrivilegeNotHeld,
            WincError::Uninitialized | WincError::AlreadyInitialized | WincError::Config(_) => {
                ResultCode::Util
            }
        }
    }

    /// Usage errors are caller mistakes rather than host failures.
    pub fn is_usage_error(&self) -> bool {
        matches!(self, WincError::Uninitialized | WincError::AlreadyInitialized)
    }

    /// Get user-facing error message without host details.
    pub fn user_message(&self) -> String {
        match self {
            WincError::Sid(_) => "Security identifier unavailable".to_string(),
            WincError::Logon(_) => "Logon failed".to_string(),
            WincError::Spawn(_) => "Process could not be started".to_string(),
            WincError::Desktop(_) => "Desktop unavailable".to_string(),
            WincError::ResourceGroup(_) => "Job object operation failed".to_string(),
            WincError::Target(_) => "Internal error".to_string(),
            WincError::Util(_) => "Internal error".to_string(),
            WincError::CompletionPort(_) => "Notification service unavailable".to_string(),
            WincError::PrivilegeNotHeld(_) => "Required privilege not held".to_string(),
            WincError::Uninitialized => "not initialized".to_string(),
            WincError::AlreadyInitialized => "already initialized".to_string(),
            WincError::Config(reason) => format!("Configuration error: {}", reason),
        }
    }
}
