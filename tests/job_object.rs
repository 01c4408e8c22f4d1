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

//! Job object scenarios against real child processes.

#![cfg(windows)]

use std::io::Write;
use std::os::windows::io::AsRawHandle;
use std::os::windows::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::thread;
use std::time::{Duration, Instant};
use winc::config::GroupProfile;
use winc::{
    ExtendedLimits, ProcessId, RawProcessHandle, ResourceGroup, ResultCode, Target,
    UiRestrictions,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    ActiveProcessLimit,
    ExitAll,
    NewProcess(ProcessId),
    ExitProcess(ProcessId),
    MemoryLimit(ProcessId),
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    fn snapshot(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn wait_for(&self, event: Event) -> Vec<Event> {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            let events = self.snapshot();
            if events.contains(&event) {
                return events;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("timed out waiting for {:?}; saw {:?}", event, self.snapshot());
    }
}

impl Target for Recorder {
    fn on_active_process_limit(&self) {
        self.events.lock().unwrap().push(Event::ActiveProcessLimit);
    }
    fn on_exit_all(&self) {
        self.events.lock().unwrap().push(Event::ExitAll);
    }
    fn on_new_process(&self, pid: ProcessId) {
        self.events.lock().unwrap().push(Event::NewProcess(pid));
    }
    fn on_exit_process(&self, pid: ProcessId) {
        self.events.lock().unwrap().push(Event::ExitProcess(pid));
    }
    fn on_memory_limit(&self, pid: ProcessId) {
        self.events.lock().unwrap().push(Event::MemoryLimit(pid));
    }
}

/// A shell that blocks on a line of stdin, then runs `then` (if any).
fn gated_shell(then: Option<&str>) -> Child {
    let script = match then {
        Some(command) => format!("/c set /p gate= & {}", command),
        None => "/c set /p gate=".to_string(),
    };
    Command::new("cmd")
        .raw_arg(script)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap()
}

fn open_gate(child: &mut Child) {
    let stdin = child.stdin.as_mut().unwrap();
    stdin.write_all(b"\r\n").unwrap();
    stdin.flush().unwrap();
}

fn handle_of(child: &Child) -> RawProcessHandle {
    RawProcessHandle::from(child.as_raw_handle())
}

#[test]
fn test_limits_round_trip_through_host() {
    let group = ResourceGroup::create().unwrap();
    let limits = ExtendedLimits::new()
        .with_active_process_limit(3)
        .with_job_memory_limit(256 << 20)
        .with_process_memory_limit(128 << 20)
        .with_kill_on_job_close(true);
    group.set_limits(&limits).unwrap();
    assert_eq!(group.limits().unwrap().settable(), limits);

    let restrictions = UiRestrictions {
        desktop: true,
        exit_windows: true,
        read_clipboard: true,
        ..UiRestrictions::default()
    };
    group.set_ui_restrictions(&restrictions).unwrap();
    assert_eq!(group.ui_restrictions().unwrap(), restrictions);
}

#[test]
fn test_profile_applies_limits_and_ui_restrictions() {
    let profile = GroupProfile::from_yaml_str(
        "limits:\n  active_process_limit: 2\nui_restrictions:\n  handles: true\n",
    )
    .unwrap();
    let group = ResourceGroup::with_profile(&profile).unwrap();
    assert_eq!(group.limits().unwrap().active_process_limit, Some(2));
    assert!(group.ui_restrictions().unwrap().handles);
}

#[test]
fn test_terminate_empty_group_succeeds() {
    let group = ResourceGroup::create().unwrap();
    group.terminate(1).unwrap();
    assert_eq!(group.accounting().unwrap().active_processes, 0);
}

#[test]
fn test_assign_invalid_handle_is_job_object_error() {
    let group = ResourceGroup::create().unwrap();
    let err = group
        .assign_process(RawProcessHandle::from_raw(0))
        .unwrap_err();
    assert_eq!(err.code(), ResultCode::JobObject);
}

#[test]
fn test_terminate_stops_every_member() {
    let group = ResourceGroup::create().unwrap();
    let mut first = gated_shell(None);
    let mut second = gated_shell(None);
    group.assign_process(handle_of(&first)).unwrap();
    group.assign_process(handle_of(&second)).unwrap();
    assert_eq!(group.accounting().unwrap().active_processes, 2);

    group.terminate(42).unwrap();
    assert_eq!(first.wait().unwrap().code(), Some(42));
    assert_eq!(second.wait().unwrap().code(), Some(42));

    let accounting = group.accounting().unwrap();
    assert_eq!(accounting.active_processes, 0);
    assert_eq!(accounting.total_processes, 2);
    assert_eq!(accounting.total_terminated_processes, 2);
}

#[test]
fn test_normal_exit_notifies_once_then_exit_all() {
    let group = ResourceGroup::create().unwrap();
    let recorder = Arc::new(Recorder::default());
    let target: Arc<dyn Target> = recorder.clone();
    group.associate_notifications(&target).unwrap();
    assert!(group.is_associated());

    let mut child = gated_shell(None);
    let pid = child.id();
    group.assign_process(handle_of(&child)).unwrap();
    open_gate(&mut child);
    assert_eq!(child.wait().unwrap().code(), Some(0));

    let events = recorder.wait_for(Event::ExitAll);
    let exits = events
        .iter()
        .filter(|e| **e == Event::ExitProcess(pid))
        .count();
    assert_eq!(exits, 1);
    let exit_at = events.iter().position(|e| *e == Event::ExitProcess(pid));
    let all_at = events.iter().position(|e| *e == Event::ExitAll);
    assert!(exit_at < all_at);

    group.deassociate_notifications();
    assert!(!group.is_associated());
}

#[test]
fn test_active_process_limit_reported_before_exit() {
    let group = ResourceGroup::create().unwrap();
    group
        .set_limits(&ExtendedLimits::new().with_active_process_limit(1))
        .unwrap();

    let mut child = gated_shell(Some("cmd /c exit 0"));
    let pid = child.id();
    group.assign_process(handle_of(&child)).unwrap();

    let recorder = Arc::new(Recorder::default());
    let target: Arc<dyn Target> = recorder.clone();
    group.associate_notifications(&target).unwrap();

    open_gate(&mut child);
    child.wait().unwrap();

    let events = recorder.wait_for(Event::ExitProcess(pid));
    let limit_at = events
        .iter()
        .position(|e| *e == Event::ActiveProcessLimit)
        .expect("active process limit was not reported");
    let exit_at = events
        .iter()
        .position(|e| *e == Event::ExitProcess(pid))
        .unwrap();
    assert!(limit_at < exit_at);
}

#[test]
fn test_reassociating_reuses_port_binding() {
    let group = ResourceGroup::create().unwrap();
    let first: Arc<dyn Target> = Arc::new(Recorder::default());
    let recorder = Arc::new(Recorder::default());
    let second: Arc<dyn Target> = recorder.clone();

    group.associate_notifications(&first).unwrap();
    group.deassociate_notifications();
    group.associate_notifications(&second).unwrap();

    let mut child = gated_shell(None);
    let pid = child.id();
    group.assign_process(handle_of(&child)).unwrap();
    recorder.wait_for(Event::NewProcess(pid));
    open_gate(&mut child);
    child.wait().unwrap();
    recorder.wait_for(Event::ExitAll);
}

/// Deassociates its own group from inside the exit callback.
struct SelfReleasing {
    group: OnceLock<Weak<ResourceGroup>>,
    started: Mutex<Sender<()>>,
    released: Mutex<Sender<()>>,
}

impl Target for SelfReleasing {
    fn on_exit_all(&self) {
        let _ = self.started.lock().unwrap().send(());
        thread::sleep(Duration::from_millis(200));
        if let Some(group) = self.group.get().and_then(Weak::upgrade) {
            group.deassociate_notifications();
        }
        let _ = self.released.lock().unwrap().send(());
    }
}

#[test]
fn test_owner_and_callback_deassociate_concurrently() {
    let group = Arc::new(ResourceGroup::create().unwrap());
    let (started_tx, started) = mpsc::channel();
    let (released_tx, released) = mpsc::channel();
    let releasing = Arc::new(SelfReleasing {
        group: OnceLock::new(),
        started: Mutex::new(started_tx),
        released: Mutex::new(released_tx),
    });
    let _ = releasing.group.set(Arc::downgrade(&group));
    let target: Arc<dyn Target> = releasing.clone();
    group.associate_notifications(&target).unwrap();

    let mut child = gated_shell(None);
    group.assign_process(handle_of(&child)).unwrap();
    open_gate(&mut child);
    child.wait().unwrap();
    started.recv_timeout(Duration::from_secs(10)).unwrap();

    // The owner tears down while the callback is still running.
    let (done_tx, done) = mpsc::channel();
    let owner = {
        let group = group.clone();
        thread::spawn(move || {
            group.deassociate_notifications();
            let _ = done_tx.send(());
        })
    };
    done.recv_timeout(Duration::from_secs(10)).unwrap();
    released.recv_timeout(Duration::from_secs(10)).unwrap();
    owner.join().unwrap();
    assert!(!group.is_associated());
}
