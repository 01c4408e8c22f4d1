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

//! Job message decoding.
//!
//! A completion packet carries the message code in its byte-count field and
//! an auxiliary value (usually a process id) in its overlapped pointer.

use crate::engine_core::constants::job_msg;
use crate::engine_core::types::ProcessId;
use crate::notify::target::Target;

/// A message code with no named variant. Only [`JobMessage::decode`]
/// builds one, so the code never collides with a known message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnknownCode(u32);

impl UnknownCode {
    pub fn code(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobMessage {
    EndOfJobTime,
    EndOfProcessTime(ProcessId),
    ActiveProcessLimit,
    ActiveProcessZero,
    NewProcess(ProcessId),
    ExitProcess(ProcessId),
    AbnormalExitProcess(ProcessId),
    ProcessMemoryLimit(ProcessId),
    JobMemoryLimit(ProcessId),
    NotificationLimit,
    Unknown(UnknownCode),
}

impl JobMessage {
    pub fn decode(code: u32, value: usize) -> Self {
        // Process ids travel in a pointer-sized slot; only the low 32 bits are meaningful.
        let pid = value as ProcessId;
        match code {
            job_msg::END_OF_JOB_TIME => JobMessage::EndOfJobTime,
            job_msg::END_OF_PROCESS_TIME => JobMessage::EndOfProcessTime(pid),
            job_msg::ACTIVE_PROCESS_LIMIT => JobMessage::ActiveProcessLimit,
            job_msg::ACTIVE_PROCESS_ZERO => JobMessage::ActiveProcessZero,
            job_msg::NEW_PROCESS => JobMessage::NewProcess(pid),
            job_msg::EXIT_PROCESS => JobMessage::ExitProcess(pid),
            job_msg::ABNORMAL_EXIT_PROCESS => JobMessage::AbnormalExitProcess(pid),
            job_msg::PROCESS_MEMORY_LIMIT => JobMessage::ProcessMemoryLimit(pid),
            job_msg::JOB_MEMORY_LIMIT => JobMessage::JobMemoryLimit(pid),
            job_msg::NOTIFICATION_LIMIT => JobMessage::NotificationLimit,
            other => JobMessage::Unknown(UnknownCode(other)),
        }
    }

    /// Inverse of [`JobMessage::decode`], used when posting synthetic packets.
    pub fn encode(self) -> (u32, usize) {
        match self {
            JobMessage::EndOfJobTime => (job_msg::END_OF_JOB_TIME, 0),
            JobMessage::EndOfProcessTime(pid) => (job_msg::END_OF_PROCESS_TIME, pid as usize),
            JobMessage::ActiveProcessLimit => (job_msg::ACTIVE_PROCESS_LIMIT, 0),
            JobMessage::ActiveProcessZero => (job_msg::ACTIVE_PROCESS_ZERO, 0),
            JobMessage::NewProcess(pid) => (job_msg::NEW_PROCESS, pid as usize),
            JobMessage::ExitProcess(pid) => (job_msg::EXIT_PROCESS, pid as usize),
            JobMessage::AbnormalExitProcess(pid) => {
                (job_msg::ABNORMAL_EXIT_PROCESS, pid as usize)
            }
            JobMessage::ProcessMemoryLimit(pid) => (job_msg::PROCESS_MEMORY_LIMIT, pid as usize),
            JobMessage::JobMemoryLimit(pid) => (job_msg::JOB_MEMORY_LIMIT, pid as usize),
            JobMessage::NotificationLimit => (job_msg::NOTIFICATION_LIMIT, 0),
            JobMessage::Unknown(unknown) => (unknown.code(), 0),
        }
    }

    /// Route this message to the matching callback. Returns `false` for
    /// messages no callback exists for.
    pub fn deliver(self, target: &dyn Target) -> bool {
        match self {
            JobMessage::ActiveProcessLimit => target.on_active_process_limit(),
            JobMessage::ActiveProcessZero => target.on_exit_all(),
            JobMessage::NewProcess(pid) => target.on_new_process(pid),
            JobMessage::ExitProcess(pid) | JobMessage::AbnormalExitProcess(pid) => {
                target.on_exit_process(pid)
            }
            JobMessage::JobMemoryLimit(pid) => target.on_memory_limit(pid),
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl Target for Recorder {
        fn on_active_process_limit(&self) {
            self.calls.lock().unwrap().push("limit".into());
        }
        fn on_exit_all(&self) {
            self.calls.lock().unwrap().push("exit_all".into());
        }
        fn on_new_process(&self, pid: ProcessId) {
            self.calls.lock().unwrap().push(format!("new:{}", pid));
        }
        fn on_exit_process(&self, pid: ProcessId) {
            self.calls.lock().unwrap().push(format!("exit:{}", pid));
        }
        fn on_memory_limit(&self, pid: ProcessId) {
            self.calls.lock().unwrap().push(format!("mem:{}", pid));
        }
    }

    #[test]
    fn test_decode_known_codes() {
        assert_eq!(JobMessage::decode(3, 0), JobMessage::ActiveProcessLimit);
        assert_eq!(JobMessage::decode(4, 0), JobMessage::ActiveProcessZero);
        assert_eq!(JobMessage::decode(6, 1234), JobMessage::NewProcess(1234));
        assert_eq!(JobMessage::decode(8, 77), JobMessage::AbnormalExitProcess(77));
        assert_eq!(JobMessage::decode(10, 5), JobMessage::JobMemoryLimit(5));
        assert!(matches!(
            JobMessage::decode(5, 0),
            JobMessage::Unknown(unknown) if unknown.code() == 5
        ));
    }

    #[test]
    fn test_unknown_code_never_aliases_known_message() {
        for code in 0..64u32 {
            let message = JobMessage::decode(code, 0);
            let (encoded, _) = message.encode();
            assert_eq!(encoded, code);
            let redecoded = JobMessage::decode(encoded, 0);
            assert_eq!(
                matches!(message, JobMessage::Unknown(_)),
                matches!(redecoded, JobMessage::Unknown(_))
            );
        }
        let unknown = JobMessage::decode(99, 0);
        assert_eq!(JobMessage::decode(unknown.encode().0, 0), unknown);
    }

    #[test]
    fn test_deliver_routes_to_callbacks() {
        let recorder = Recorder::default();
        assert!(JobMessage::NewProcess(10).deliver(&recorder));
        assert!(JobMessage::ExitProcess(10).deliver(&recorder));
        assert!(JobMessage::AbnormalExitProcess(11).deliver(&recorder));
        assert!(JobMessage::JobMemoryLimit(12).deliver(&recorder));
        assert!(JobMessage::ActiveProcessLimit.deliver(&recorder));
        assert!(JobMessage::ActiveProcessZero.deliver(&recorder));
        assert_eq!(
            *recorder.calls.lock().unwrap(),
            vec!["new:10", "exit:10", "exit:11", "mem:12", "limit", "exit_all"]
        );
    }

    #[test]
    fn test_unrouted_messages_are_ignored() {
        let recorder = Recorder::default();
        assert!(!JobMessage::EndOfJobTime.deliver(&recorder));
        assert!(!JobMessage::ProcessMemoryLimit(3).deliver(&recorder));
        assert!(!JobMessage::NotificationLimit.deliver(&recorder));
        assert!(!JobMessage::decode(99, 0).deliver(&recorder));
        assert!(recorder.calls.lock().unwrap().is_empty());
    }
}
