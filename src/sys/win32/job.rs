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

use std::ffi::c_void;
use std::mem::size_of;

use tracing::debug;
use windows::core::PCWSTR;
use windows::Win32::Foundation::HANDLE;
use windows::Win32::System::JobObjects::{
    AssignProcessToJobObject, CreateJobObjectW, JobObjectAssociateCompletionPortInformation,
    JobObjectBasicAndIoAccountingInformation, JobObjectBasicUIRestrictions,
    JobObjectExtendedLimitInformation, QueryInformationJobObject, SetInformationJobObject,
    TerminateJobObject, JOBOBJECTINFOCLASS, JOBOBJECT_ASSOCIATE_COMPLETION_PORT,
    JOBOBJECT_BASIC_AND_IO_ACCOUNTING_INFORMATION, JOBOBJECT_BASIC_UI_RESTRICTIONS,
    JOBOBJECT_EXTENDED_LIMIT_INFORMATION, JOB_OBJECT_LIMIT, JOB_OBJECT_UILIMIT,
};

use super::handle::Handle;
use crate::engine_core::errors::{Result, WincError};
use crate::engine_core::types::{CompletionKey, RawProcessHandle};
use crate::job::limits::{Accounting, IoCounters, LimitRecord};

fn job_error(call: &'static str) -> impl FnOnce(windows::core::Error) -> WincError {
    move |e| WincError::ResourceGroup(format!("{} failed: {}", call, e))
}

pub struct JobHandle {
    handle: Handle,
}

impl JobHandle {
    pub fn create() -> Result<Self> {
        let job = unsafe { CreateJobObjectW(None, PCWSTR::null()) }
            .map_err(job_error("CreateJobObjectW"))?;
        debug!("Created job object {:?}", job.0);
        Ok(Self {
            handle: Handle::new(job),
        })
    }

    pub fn as_raw(&self) -> isize {
        self.handle.as_raw()
    }

    pub fn assign(&self, process: RawProcessHandle) -> Result<()> {
        let process = HANDLE(process.as_raw() as *mut c_void);
        unsafe { AssignProcessToJobObject(self.handle.get(), process) }
            .map_err(job_error("AssignProcessToJobObject"))
    }

    fn query<T: Default>(&self, class: JOBOBJECTINFOCLASS, call: &'static str) -> Result<T> {
        let mut info = T::default();
        unsafe {
            QueryInformationJobObject(
                Some(self.handle.get()),
                class,
                &mut info as *mut T as *mut c_void,
                size_of::<T>() as u32,
                None,
            )
        }
        .map_err(job_error(call))?;
        Ok(info)
    }

    fn set<T>(&self, class: JOBOBJECTINFOCLASS, info: &T, call: &'static str) -> Result<()> {
        unsafe {
            SetInformationJobObject(
                self.handle.get(),
                class,
                info as *const T as *const c_void,
                size_of::<T>() as u32,
            )
        }
        .map_err(job_error(call))
    }

    pub fn limits(&self) -> Result<LimitRecord> {
        let info: JOBOBJECT_EXTENDED_LIMIT_INFORMATION =
            self.query(JobObjectExtendedLimitInformation, "QueryInformationJobObject(limits)")?;
        let basic = &info.BasicLimitInformation;
        Ok(LimitRecord {
            flags: basic.LimitFlags.0,
            per_process_user_time: basic.PerProcessUserTimeLimit,
            per_job_user_time: basic.PerJobUserTimeLimit,
            minimum_working_set: basic.MinimumWorkingSetSize,
            maximum_working_set: basic.MaximumWorkingSetSize,
            active_process_limit: basic.ActiveProcessLimit,
            affinity: basic.Affinity,
            priority_class: basic.PriorityClass,
            scheduling_class: basic.SchedulingClass,
            process_memory_limit: info.ProcessMemoryLimit,
            job_memory_limit: info.JobMemoryLimit,
            peak_process_memory_used: info.PeakProcessMemoryUsed,
            peak_job_memory_used: info.PeakJobMemoryUsed,
        })
    }

    pub fn set_limits(&self, record: &LimitRecord) -> Result<()> {
        let mut info = JOBOBJECT_EXTENDED_LIMIT_INFORMATION::default();
        let basic = &mut info.BasicLimitInformation;
        basic.LimitFlags = JOB_OBJECT_LIMIT(record.flags);
        basic.PerProcessUserTimeLimit = record.per_process_user_time;
        basic.PerJobUserTimeLimit = record.per_job_user_time;
        basic.MinimumWorkingSetSize = record.minimum_working_set;
        basic.MaximumWorkingSetSize = record.maximum_working_set;
        basic.ActiveProcessLimit = record.active_process_limit;
        basic.Affinity = record.affinity;
        basic.PriorityClass = record.priority_class;
        basic.SchedulingClass = record.scheduling_class;
        info.ProcessMemoryLimit = record.process_memory_limit;
        info.JobMemoryLimit = record.job_memory_limit;
        self.set(
            JobObjectExtendedLimitInformation,
            &info,
            "SetInformationJobObject(limits)",
        )
    }

    pub fn ui_restrictions(&self) -> Result<u32> {
        let info: JOBOBJECT_BASIC_UI_RESTRICTIONS =
            self.query(JobObjectBasicUIRestrictions, "QueryInformationJobObject(ui)")?;
        Ok(info.UIRestrictionsClass.0)
    }

    pub fn set_ui_restrictions(&self, bits: u32) -> Result<()> {
        let info = JOBOBJECT_BASIC_UI_RESTRICTIONS {
            UIRestrictionsClass: JOB_OBJECT_UILIMIT(bits),
        };
        self.set(
            JobObjectBasicUIRestrictions,
            &info,
            "SetInformationJobObject(ui)",
        )
    }

    pub fn accounting(&self) -> Result<Accounting> {
        let info: JOBOBJECT_BASIC_AND_IO_ACCOUNTING_INFORMATION = self.query(
            JobObjectBasicAndIoAccountingInformation,
            "QueryInformationJobObject(accounting)",
        )?;
        let basic = &info.BasicInfo;
        let io = &info.IoInfo;
        Ok(Accounting {
            total_user_time: Accounting::duration_from_ticks(basic.TotalUserTime),
            total_kernel_time: Accounting::duration_from_ticks(basic.TotalKernelTime),
            this_period_total_user_time: Accounting::duration_from_ticks(
                basic.ThisPeriodTotalUserTime,
            ),
            this_period_total_kernel_time: Accounting::duration_from_ticks(
                basic.ThisPeriodTotalKernelTime,
            ),
            total_page_fault_count: basic.TotalPageFaultCount,
            total_processes: basic.TotalProcesses,
            active_processes: basic.ActiveProcesses,
            total_terminated_processes: basic.TotalTerminatedProcesses,
            io: IoCounters {
                read_operation_count: io.ReadOperationCount,
                write_operation_count: io.WriteOperationCount,
                other_operation_count: io.OtherOperationCount,
                read_transfer_count: io.ReadTransferCount,
                write_transfer_count: io.WriteTransferCount,
                other_transfer_count: io.OtherTransferCount,
            },
        })
    }

    pub fn terminate(&self, exit_code: u32) -> Result<()> {
        unsafe { TerminateJobObject(self.handle.get(), exit_code) }
            .map_err(job_error("TerminateJobObject"))
    }

    pub fn associate_port(&self, port: isize, key: CompletionKey) -> Result<()> {
        let info = JOBOBJECT_ASSOCIATE_COMPLETION_PORT {
            CompletionKey: key.as_usize() as *mut c_void,
            CompletionPort: HANDLE(port as *mut c_void),
        };
        self.set(
            JobObjectAssociateCompletionPortInformation,
            &info,
            "SetInformationJobObject(completion port)",
        )
    }
}
