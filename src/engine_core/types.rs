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

//! Shared value types.

use crate::engine_core::constants::integrity;
use crate::engine_core::errors::WincError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Process identifier as reported in job messages.
pub type ProcessId = u32;

/// Correlation token attached to a job object at association time and
/// echoed back on every completion packet for that job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompletionKey(usize);

impl CompletionKey {
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }

    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for CompletionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Borrowed process handle supplied by the spawner. Ownership stays with
/// the caller; the job only needs it for the duration of the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawProcessHandle(isize);

impl RawProcessHandle {
    pub const fn from_raw(raw: isize) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> isize {
        self.0
    }
}

#[cfg(windows)]
impl From<std::os::windows::io::RawHandle> for RawProcessHandle {
    fn from(handle: std::os::windows::io::RawHandle) -> Self {
        Self(handle as isize)
    }
}

/// Mandatory integrity level, ordered from least to most trusted.
///
/// The named variants cover the well-known label RIDs. Any other RID the
/// host accepts is carried as [`IntegrityLevel::Custom`] and ordered by
/// its numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityLevel {
    Untrusted,
    #[default]
    Low,
    Medium,
    MediumPlus,
    High,
    System,
    Custom(u32),
}

impl IntegrityLevel {
    /// The well-known levels, in trust order.
    pub const ALL: [IntegrityLevel; 6] = [
        IntegrityLevel::Untrusted,
        IntegrityLevel::Low,
        IntegrityLevel::Medium,
        IntegrityLevel::MediumPlus,
        IntegrityLevel::High,
        IntegrityLevel::System,
    ];

    /// RID of the mandatory label SID (S-1-16-RID).
    pub fn rid(self) -> u32 {
        match self {
            IntegrityLevel::Untrusted => integrity::UNTRUSTED_RID,
            IntegrityLevel::Low => integrity::LOW_RID,
            IntegrityLevel::Medium => integrity::MEDIUM_RID,
            IntegrityLevel::MediumPlus => integrity::MEDIUM_PLUS_RID,
            IntegrityLevel::High => integrity::HIGH_RID,
            IntegrityLevel::System => integrity::SYSTEM_RID,
            IntegrityLevel::Custom(rid) => rid,
        }
    }

    /// Named level for a well-known RID, `Custom` for anything else.
    pub fn from_rid(rid: u32) -> Self {
        Self::ALL
            .into_iter()
            .find(|level| level.rid() == rid)
            .unwrap_or(IntegrityLevel::Custom(rid))
    }

    pub fn is_custom(self) -> bool {
        matches!(self, IntegrityLevel::Custom(_))
    }
}

impl Ord for IntegrityLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.rid(), self.is_custom()).cmp(&(other.rid(), other.is_custom()))
    }
}

impl PartialOrd for IntegrityLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for IntegrityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IntegrityLevel::Untrusted => "untrusted",
            IntegrityLevel::Low => "low",
            IntegrityLevel::Medium => "medium",
            IntegrityLevel::MediumPlus => "medium_plus",
            IntegrityLevel::High => "high",
            IntegrityLevel::System => "system",
            IntegrityLevel::Custom(rid) => return write!(f, "{:#x}", rid),
        };
        f.write_str(name)
    }
}

impl FromStr for IntegrityLevel {
    type Err = WincError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(hex) = trimmed.strip_prefix("0x") {
            return u32::from_str_radix(hex, 16)
                .map(Self::from_rid)
                .map_err(|e| WincError::Config(format!("bad integrity RID '{}': {}", s, e)));
        }
        match trimmed.to_lowercase().as_str() {
            "untrusted" => Ok(IntegrityLevel::Untrusted),
            "low" => Ok(IntegrityLevel::Low),
            "medium" => Ok(IntegrityLevel::Medium),
            "medium_plus" | "medium-plus" => Ok(IntegrityLevel::MediumPlus),
            "high" => Ok(IntegrityLevel::High),
            "system" => Ok(IntegrityLevel::System),
            other => Err(WincError::Config(format!(
                "unknown integrity level '{}'",
                other
            ))),
        }
    }
}
