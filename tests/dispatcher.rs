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

//! Behaviour of the process-wide dispatcher, driven with synthetic packets.
//!
//! Every test shares the same singleton, so each one uses its own range of
//! completion keys, far above any real handle value.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;
use winc::{CompletionKey, Dispatcher, JobMessage, ProcessId, Target};

const TIMEOUT: Duration = Duration::from_secs(5);

fn key(test: usize, n: usize) -> CompletionKey {
    CompletionKey::new(0x7A00_0000 + test * 0x100 + n)
}

/// Forwards every new-process notification to a channel.
struct Marker(Mutex<Sender<ProcessId>>);

impl Marker {
    fn pair() -> (Arc<dyn Target>, Receiver<ProcessId>) {
        let (tx, rx) = mpsc::channel();
        (Arc::new(Marker(Mutex::new(tx))), rx)
    }
}

impl Target for Marker {
    fn on_new_process(&self, pid: ProcessId) {
        let _ = self.0.lock().unwrap().send(pid);
    }
}

/// Posts a marker on `marker_key` and waits for it. The listener is FIFO,
/// so everything posted earlier has been dispatched once this returns.
fn flush(dispatcher: &Dispatcher, marker_key: CompletionKey) {
    let (marker, rx) = Marker::pair();
    dispatcher.attach(marker_key, &marker).unwrap();
    dispatcher
        .post(marker_key, JobMessage::NewProcess(0xF1u32))
        .unwrap();
    assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), 0xF1);
    dispatcher.detach(marker_key);
}

#[test]
fn test_concurrent_first_use_yields_one_dispatcher() {
    let barrier = Arc::new(Barrier::new(16));
    let handles: Vec<_> = (0..16)
        .map(|_| {
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                Dispatcher::shared().unwrap() as *const Dispatcher as usize
            })
        })
        .collect();

    let addresses: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(addresses.windows(2).all(|pair| pair[0] == pair[1]));

    let dispatcher = Dispatcher::shared().unwrap();
    assert_eq!(dispatcher.listener_spawns(), 1);
    assert!(std::ptr::eq(
        dispatcher,
        Dispatcher::existing().unwrap()
    ));
}

struct Slow {
    started: Mutex<Sender<()>>,
    finished: AtomicBool,
    calls: AtomicUsize,
}

impl Target for Slow {
    fn on_new_process(&self, _pid: ProcessId) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _ = self.started.lock().unwrap().send(());
        thread::sleep(Duration::from_millis(200));
        self.finished.store(true, Ordering::SeqCst);
    }
}

#[test]
fn test_detach_waits_for_running_callback() {
    let dispatcher = Dispatcher::shared().unwrap();
    let (tx, started) = mpsc::channel();
    let slow = Arc::new(Slow {
        started: Mutex::new(tx),
        finished: AtomicBool::new(false),
        calls: AtomicUsize::new(0),
    });
    let target: Arc<dyn Target> = slow.clone();

    dispatcher.attach(key(1, 0), &target).unwrap();
    dispatcher.post(key(1, 0), JobMessage::NewProcess(7)).unwrap();
    started.recv_timeout(TIMEOUT).unwrap();

    dispatcher.detach(key(1, 0));
    assert!(slow.finished.load(Ordering::SeqCst));
    assert!(!dispatcher.is_attached(key(1, 0)));

    dispatcher.post(key(1, 0), JobMessage::NewProcess(8)).unwrap();
    flush(dispatcher, key(1, 1));
    assert_eq!(slow.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unregistered_key_is_dropped_silently() {
    let dispatcher = Dispatcher::shared().unwrap();
    dispatcher.post(key(2, 0), JobMessage::NewProcess(1)).unwrap();
    dispatcher.post(key(2, 0), JobMessage::ActiveProcessZero).unwrap();

    // The listener keeps serving other keys.
    flush(dispatcher, key(2, 1));
    assert!(!dispatcher.is_attached(key(2, 0)));
}

struct SelfDetaching {
    key: CompletionKey,
    calls: AtomicUsize,
}

impl Target for SelfDetaching {
    fn on_new_process(&self, _pid: ProcessId) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Dispatcher::shared().unwrap().detach(self.key);
    }
}

#[test]
fn test_detach_from_inside_callback() {
    let dispatcher = Dispatcher::shared().unwrap();
    let target = Arc::new(SelfDetaching {
        key: key(3, 0),
        calls: AtomicUsize::new(0),
    });
    let as_dyn: Arc<dyn Target> = target.clone();
    dispatcher.attach(key(3, 0), &as_dyn).unwrap();

    dispatcher.post(key(3, 0), JobMessage::NewProcess(1)).unwrap();
    dispatcher.post(key(3, 0), JobMessage::NewProcess(2)).unwrap();
    flush(dispatcher, key(3, 1));

    assert_eq!(target.calls.load(Ordering::SeqCst), 1);
    assert!(!dispatcher.is_attached(key(3, 0)));
}

struct Chaining {
    next_key: CompletionKey,
    next: Arc<dyn Target>,
}

impl Target for Chaining {
    fn on_exit_all(&self) {
        Dispatcher::shared()
            .unwrap()
            .attach(self.next_key, &self.next)
            .unwrap();
    }
}

#[test]
fn test_attach_from_inside_callback() {
    let dispatcher = Dispatcher::shared().unwrap();
    let (next, rx) = Marker::pair();
    let chaining: Arc<dyn Target> = Arc::new(Chaining {
        next_key: key(4, 1),
        next,
    });
    dispatcher.attach(key(4, 0), &chaining).unwrap();

    dispatcher.post(key(4, 0), JobMessage::ActiveProcessZero).unwrap();
    dispatcher.post(key(4, 1), JobMessage::NewProcess(41)).unwrap();
    assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), 41);

    dispatcher.detach(key(4, 0));
    dispatcher.detach(key(4, 1));
}

#[test]
fn test_dropped_target_receives_nothing() {
    let dispatcher = Dispatcher::shared().unwrap();
    let (target, rx) = Marker::pair();
    dispatcher.attach(key(5, 0), &target).unwrap();
    drop(target);

    dispatcher.post(key(5, 0), JobMessage::NewProcess(5)).unwrap();
    flush(dispatcher, key(5, 1));
    assert!(rx.try_recv().is_err());
    assert!(!dispatcher.is_attached(key(5, 0)));
}

struct Panicking;

impl Target for Panicking {
    fn on_memory_limit(&self, pid: ProcessId) {
        panic!("callback failure for {}", pid);
    }
}

#[test]
fn test_panicking_callback_does_not_stop_listener() {
    let dispatcher = Dispatcher::shared().unwrap();
    let target: Arc<dyn Target> = Arc::new(Panicking);
    dispatcher.attach(key(6, 0), &target).unwrap();

    dispatcher.post(key(6, 0), JobMessage::JobMemoryLimit(9)).unwrap();
    flush(dispatcher, key(6, 1));
    assert!(dispatcher.is_attached(key(6, 0)));
    dispatcher.detach(key(6, 0));
}

#[test]
fn test_reattach_replaces_previous_target() {
    let dispatcher = Dispatcher::shared().unwrap();
    let (first, first_rx) = Marker::pair();
    let (second, second_rx) = Marker::pair();
    dispatcher.attach(key(7, 0), &first).unwrap();
    dispatcher.attach(key(7, 0), &second).unwrap();

    dispatcher.post(key(7, 0), JobMessage::NewProcess(70)).unwrap();
    assert_eq!(second_rx.recv_timeout(TIMEOUT).unwrap(), 70);
    assert!(first_rx.try_recv().is_err());
    dispatcher.detach(key(7, 0));
}

struct Inspector {
    key: CompletionKey,
    seen: Mutex<Sender<bool>>,
}

impl Target for Inspector {
    fn on_new_process(&self, _pid: ProcessId) {
        let dispatcher = Dispatcher::shared().unwrap();
        let attached = dispatcher.is_attached(self.key) && dispatcher.attached_count() >= 1;
        let _ = self.seen.lock().unwrap().send(attached);
    }
}

#[test]
fn test_registry_queries_from_inside_callback() {
    let dispatcher = Dispatcher::shared().unwrap();
    let (tx, rx) = mpsc::channel();
    let inspector: Arc<dyn Target> = Arc::new(Inspector {
        key: key(8, 0),
        seen: Mutex::new(tx),
    });
    dispatcher.attach(key(8, 0), &inspector).unwrap();

    dispatcher.post(key(8, 0), JobMessage::NewProcess(80)).unwrap();
    assert!(rx.recv_timeout(TIMEOUT).unwrap());

    // Another owner attached from a different thread still gets its events.
    let other = thread::spawn(move || {
        let dispatcher = Dispatcher::shared().unwrap();
        let (marker, rx) = Marker::pair();
        dispatcher.attach(key(8, 1), &marker).unwrap();
        dispatcher.post(key(8, 1), JobMessage::NewProcess(81)).unwrap();
        let pid = rx.recv_timeout(TIMEOUT);
        dispatcher.detach(key(8, 1));
        pid
    });
    assert_eq!(other.join().unwrap().unwrap(), 81);
    dispatcher.detach(key(8, 0));
}

/// Detaches its own key when the last reference goes away.
struct DetachOnDrop {
    key: CompletionKey,
    started: Mutex<Sender<()>>,
}

impl Target for DetachOnDrop {
    fn on_new_process(&self, _pid: ProcessId) {
        let _ = self.started.lock().unwrap().send(());
        thread::sleep(Duration::from_millis(100));
    }
}

impl Drop for DetachOnDrop {
    fn drop(&mut self) {
        Dispatcher::shared().unwrap().detach(self.key);
    }
}

#[test]
fn test_target_released_during_callback_may_detach() {
    let dispatcher = Dispatcher::shared().unwrap();
    let (tx, started) = mpsc::channel();
    let target: Arc<dyn Target> = Arc::new(DetachOnDrop {
        key: key(9, 0),
        started: Mutex::new(tx),
    });
    dispatcher.attach(key(9, 0), &target).unwrap();

    dispatcher.post(key(9, 0), JobMessage::NewProcess(90)).unwrap();
    started.recv_timeout(TIMEOUT).unwrap();
    // The listener now holds the last strong reference.
    drop(target);

    flush(dispatcher, key(9, 1));
    assert!(!dispatcher.is_attached(key(9, 0)));
}
