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

//! Typed job limits, UI restrictions and accounting counters.
//!
//! Each optional limit is enabled exactly when its `LimitFlags` bit is set,
//! so an `ExtendedLimits` value can never disagree with the flags it
//! produces. `LimitRecord` is the flat host layout the backend copies to
//! and from the OS structure.

use crate::engine_core::constants::{limit_flags, ui_limit, TICKS_PER_SECOND};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const TICKS_PER_MILLI: u64 = TICKS_PER_SECOND / 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingSet {
    pub minimum: usize,
    pub maximum: usize,
}

/// Extended limits of a job object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtendedLimits {
    pub per_process_user_time_ms: Option<u64>,
    pub per_job_user_time_ms: Option<u64>,
    pub working_set: Option<WorkingSet>,
    pub active_process_limit: Option<u32>,
    pub affinity: Option<usize>,
    pub priority_class: Option<u32>,
    pub scheduling_class: Option<u32>,
    pub process_memory_limit: Option<usize>,
    pub job_memory_limit: Option<usize>,
    pub preserve_job_time: bool,
    pub die_on_unhandled_exception: bool,
    pub breakaway_ok: bool,
    pub silent_breakaway_ok: bool,
    pub kill_on_job_close: bool,
    /// Reported by the host; ignored when setting.
    #[serde(skip_deserializing)]
    pub peak_process_memory_used: usize,
    /// Reported by the host; ignored when setting.
    #[serde(skip_deserializing)]
    pub peak_job_memory_used: usize,
}

/// Flat mirror of the host's extended limit structure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimitRecord {
    pub flags: u32,
    pub per_process_user_time: i64,
    pub per_job_user_time: i64,
    pub minimum_working_set: usize,
    pub maximum_working_set: usize,
    pub active_process_limit: u32,
    pub affinity: usize,
    pub priority_class: u32,
    pub scheduling_class: u32,
    pub process_memory_limit: usize,
    pub job_memory_limit: usize,
    pub peak_process_memory_used: usize,
    pub peak_job_memory_used: usize,
}

fn ms_to_ticks(ms: u64) -> i64 {
    i64::try_from(ms.saturating_mul(TICKS_PER_MILLI)).unwrap_or(i64::MAX)
}

fn ticks_to_ms(ticks: i64) -> u64 {
    u64::try_from(ticks).unwrap_or(0) / TICKS_PER_MILLI
}

impl ExtendedLimits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_active_process_limit(mut self, limit: u32) -> Self {
        self.active_process_limit = Some(limit);
        self
    }

    pub fn with_job_memory_limit(mut self, bytes: usize) -> Self {
        self.job_memory_limit = Some(bytes);
        self
    }

    pub fn with_process_memory_limit(mut self, bytes: usize) -> Self {
        self.process_memory_limit = Some(bytes);
        self
    }

    pub fn with_kill_on_job_close(mut self, enabled: bool) -> Self {
        self.kill_on_job_close = enabled;
        self
    }

    pub fn limit_flags(&self) -> u32 {
        let mut flags = 0;
        let mut set = |enabled: bool, bit: u32| {
            if enabled {
                flags |= bit;
            }
        };
        set(self.per_process_user_time_ms.is_some(), limit_flags::PROCESS_TIME);
        set(self.per_job_user_time_ms.is_some(), limit_flags::JOB_TIME);
        set(self.working_set.is_some(), limit_flags::WORKINGSET);
        set(self.active_process_limit.is_some(), limit_flags::ACTIVE_PROCESS);
        set(self.affinity.is_some(), limit_flags::AFFINITY);
        set(self.priority_class.is_some(), limit_flags::PRIORITY_CLASS);
        set(self.scheduling_class.is_some(), limit_flags::SCHEDULING_CLASS);
        set(self.process_memory_limit.is_some(), limit_flags::PROCESS_MEMORY);
        set(self.job_memory_limit.is_some(), limit_flags::JOB_MEMORY);
        set(self.preserve_job_time, limit_flags::PRESERVE_JOB_TIME);
        set(
            self.die_on_unhandled_exception,
            limit_flags::DIE_ON_UNHANDLED_EXCEPTION,
        );
        set(self.breakaway_ok, limit_flags::BREAKAWAY_OK);
        set(self.silent_breakaway_ok, limit_flags::SILENT_BREAKAWAY_OK);
        set(self.kill_on_job_close, limit_flags::KILL_ON_JOB_CLOSE);
        flags
    }

    /// The subset the host round-trips through set and query.
    pub fn settable(&self) -> Self {
        Self {
            peak_process_memory_used: 0,
            peak_job_memory_used: 0,
            ..self.clone()
        }
    }

    pub fn to_record(&self) -> LimitRecord {
        let working_set = self.working_set.unwrap_or(WorkingSet {
            minimum: 0,
            maximum: 0,
        });
        LimitRecord {
            flags: self.limit_flags(),
            per_process_user_time: self.per_process_user_time_ms.map_or(0, ms_to_ticks),
            per_job_user_time: self.per_job_user_time_ms.map_or(0, ms_to_ticks),
            minimum_working_set: working_set.minimum,
            maximum_working_set: working_set.maximum,
            active_process_limit: self.active_process_limit.unwrap_or(0),
            affinity: self.affinity.unwrap_or(0),
            priority_class: self.priority_class.unwrap_or(0),
            scheduling_class: self.scheduling_class.unwrap_or(0),
            process_memory_limit: self.process_memory_limit.unwrap_or(0),
            job_memory_limit: self.job_memory_limit.unwrap_or(0),
            peak_process_memory_used: 0,
            peak_job_memory_used: 0,
        }
    }

    pub fn from_record(record: &LimitRecord) -> Self {
        let has = |bit: u32| record.flags & bit != 0;
        Self {
            per_process_user_time_ms: has(limit_flags::PROCESS_TIME)
                .then(|| ticks_to_ms(record.per_process_user_time)),
            per_job_user_time_ms: has(limit_flags::JOB_TIME)
                .then(|| ticks_to_ms(record.per_job_user_time)),
            working_set: has(limit_flags::WORKINGSET).then_some(WorkingSet {
                minimum: record.minimum_working_set,
                maximum: record.maximum_working_set,
            }),
            active_process_limit: has(limit_flags::ACTIVE_PROCESS)
                .then_some(record.active_process_limit),
            affinity: has(limit_flags::AFFINITY).then_some(record.affinity),
            priority_class: has(limit_flags::PRIORITY_CLASS).then_some(record.priority_class),
            scheduling_class: has(limit_flags::SCHEDULING_CLASS)
                .then_some(record.scheduling_class),
            process_memory_limit: has(limit_flags::PROCESS_MEMORY)
                .then_some(record.process_memory_limit),
            job_memory_limit: has(limit_flags::JOB_MEMORY).then_some(record.job_memory_limit),
            preserve_job_time: has(limit_flags::PRESERVE_JOB_TIME),
            die_on_unhandled_exception: has(limit_flags::DIE_ON_UNHANDLED_EXCEPTION),
            breakaway_ok: has(limit_flags::BREAKAWAY_OK),
            silent_breakaway_ok: has(limit_flags::SILENT_BREAKAWAY_OK),
            kill_on_job_close: has(limit_flags::KILL_ON_JOB_CLOSE),
            peak_process_memory_used: record.peak_process_memory_used,
            peak_job_memory_used: record.peak_job_memory_used,
        }
    }
}

/// Desktop and UI access restrictions for every process in a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiRestrictions {
    pub handles: bool,
    pub read_clipboard: bool,
    pub write_clipboard: bool,
    pub system_parameters: bool,
    pub display_settings: bool,
    pub global_atoms: bool,
    pub desktop: bool,
    pub exit_windows: bool,
}

impl UiRestrictions {
    pub fn all() -> Self {
        Self::from_bits(u32::MAX)
    }

    pub fn to_bits(&self) -> u32 {
        [
            (self.handles, ui_limit::HANDLES),
            (self.read_clipboard, ui_limit::READCLIPBOARD),
            (self.write_clipboard, ui_limit::WRITECLIPBOARD),
            (self.system_parameters, ui_limit::SYSTEMPARAMETERS),
            (self.display_settings, ui_limit::DISPLAYSETTINGS),
            (self.global_atoms, ui_limit::GLOBALATOMS),
            (self.desktop, ui_limit::DESKTOP),
            (self.exit_windows, ui_limit::EXITWINDOWS),
        ]
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .fold(0, |bits, (_, bit)| bits | bit)
    }

    /// Unknown bits are discarded.
    pub fn from_bits(bits: u32) -> Self {
        Self {
            handles: bits & ui_limit::HANDLES != 0,
            read_clipboard: bits & ui_limit::READCLIPBOARD != 0,
            write_clipboard: bits & ui_limit::WRITECLIPBOARD != 0,
            system_parameters: bits & ui_limit::SYSTEMPARAMETERS != 0,
            display_settings: bits & ui_limit::DISPLAYSETTINGS != 0,
            global_atoms: bits & ui_limit::GLOBALATOMS != 0,
            desktop: bits & ui_limit::DESKTOP != 0,
            exit_windows: bits & ui_limit::EXITWINDOWS != 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoCounters {
    pub read_operation_count: u64,
    pub write_operation_count: u64,
    pub other_operation_count: u64,
    pub read_transfer_count: u64,
    pub write_transfer_count: u64,
    pub other_transfer_count: u64,
}

/// Point-in-time accounting snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accounting {
    pub total_user_time: Duration,
    pub total_kernel_time: Duration,
    pub this_period_total_user_time: Duration,
    pub this_period_total_kernel_time: Duration,
    pub total_page_fault_count: u32,
    pub total_processes: u32,
    pub active_processes: u32,
    pub total_terminated_processes: u32,
    pub io: IoCounters,
}

impl Accounting {
    pub(crate) fn duration_from_ticks(ticks: i64) -> Duration {
        let ticks = u64::try_from(ticks).unwrap_or(0);
        Duration::from_secs(ticks / TICKS_PER_SECOND)
            + Duration::from_nanos((ticks % TICKS_PER_SECOND) * 100)
    }
}
