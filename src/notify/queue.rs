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

//! Completion queue abstraction.
//!
//! The dispatcher drains packets through this interface so that the
//! registry and listener logic are independent of the host primitive. On
//! Windows the queue is an I/O completion port; elsewhere a loopback
//! channel provides the same contract for synthetic packets.

use crate::engine_core::errors::{Result, WincError};
use crate::engine_core::types::CompletionKey;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// One completion packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub key: CompletionKey,
    pub code: u32,
    pub value: usize,
}

pub trait CompletionQueue: Send + Sync + 'static {
    /// Create a fresh queue.
    fn open() -> Result<Self>
    where
        Self: Sized;

    /// Block until at least one packet is available, then append up to
    /// `max` packets to `out`.
    fn wait_batch(&self, out: &mut Vec<RawEvent>, max: usize) -> Result<()>;

    /// Enqueue a packet.
    fn post(&self, event: RawEvent) -> Result<()>;

    /// Host handle to associate job objects with, if the queue has one.
    fn raw_handle(&self) -> Option<isize>;
}

#[cfg(windows)]
pub type PlatformQueue = crate::sys::IoCompletionPort;

#[cfg(not(windows))]
pub type PlatformQueue = LoopbackQueue;

/// In-process queue with completion-port semantics.
pub struct LoopbackQueue {
    tx: mpsc::UnboundedSender<RawEvent>,
    rx: Mutex<mpsc::UnboundedReceiver<RawEvent>>,
}

impl CompletionQueue for LoopbackQueue {
    fn open() -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        Ok(Self {
            tx,
            rx: Mutex::new(rx),
        })
    }

    fn wait_batch(&self, out: &mut Vec<RawEvent>, max: usize) -> Result<()> {
        let mut rx = self
            .rx
            .lock()
            .map_err(|_| WincError::CompletionPort("queue receiver poisoned".to_string()))?;
        let first = rx
            .blocking_recv()
            .ok_or_else(|| WincError::CompletionPort("queue closed".to_string()))?;
        out.push(first);
        while out.len() < max {
            match rx.try_recv() {
                Ok(event) => out.push(event),
                Err(_) => break,
            }
        }
        Ok(())
    }

    fn post(&self, event: RawEvent) -> Result<()> {
        self.tx
            .send(event)
            .map_err(|e| WincError::CompletionPort(format!("post failed: {}", e)))
    }

    fn raw_handle(&self) -> Option<isize> {
        None
    }
}
