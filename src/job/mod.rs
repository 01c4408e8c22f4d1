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

//! Job objects.
//!
//! A [`ResourceGroup`] owns one job handle from creation until drop. Member
//! processes (and the children they spawn) are subject to the group's
//! aggregate limits and can be terminated as a unit. Lifecycle events are
//! delivered through the shared [`Dispatcher`].

pub mod limits;

use crate::config::GroupProfile;
use crate::engine_core::errors::{Result, WincError};
use crate::engine_core::types::{CompletionKey, RawProcessHandle};
use crate::notify::{CompletionQueue, Dispatcher, Target};
use crate::sys::JobHandle;
use limits::{Accounting, ExtendedLimits, UiRestrictions};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

pub struct ResourceGroup {
    job: JobHandle,
    // The host binds a job to a completion port at most once. Never held
    // while calling into the dispatcher.
    port_bound: Mutex<bool>,
    associated: AtomicBool,
}

impl ResourceGroup {
    /// Create a new unnamed job object.
    pub fn create() -> Result<Self> {
        let job = JobHandle::create()?;
        Ok(Self {
            job,
            port_bound: Mutex::new(false),
            associated: AtomicBool::new(false),
        })
    }

    /// Create a job object with `profile` applied.
    pub fn with_profile(profile: &GroupProfile) -> Result<Self> {
        let group = Self::create()?;
        group.apply_profile(profile)?;
        Ok(group)
    }

    /// Correlation token echoed on every event for this group.
    pub fn completion_key(&self) -> CompletionKey {
        CompletionKey::new(self.job.as_raw() as usize)
    }

    /// Opaque job handle for the spawner. Remains owned by this group.
    pub fn raw_handle(&self) -> isize {
        self.job.as_raw()
    }

    /// Add `process` and its future descendants to the group.
    pub fn assign_process(&self, process: RawProcessHandle) -> Result<()> {
        self.job.assign(process)?;
        debug!("Assigned process {:#x} to job {}", process.as_raw(), self.completion_key());
        Ok(())
    }

    pub fn limits(&self) -> Result<ExtendedLimits> {
        Ok(ExtendedLimits::from_record(&self.job.limits()?))
    }

    /// Replace the whole limit set.
    pub fn set_limits(&self, limits: &ExtendedLimits) -> Result<()> {
        self.job.set_limits(&limits.to_record())
    }

    pub fn ui_restrictions(&self) -> Result<UiRestrictions> {
        Ok(UiRestrictions::from_bits(self.job.ui_restrictions()?))
    }

    pub fn set_ui_restrictions(&self, restrictions: &UiRestrictions) -> Result<()> {
        self.job.set_ui_restrictions(restrictions.to_bits())
    }

    pub fn apply_profile(&self, profile: &GroupProfile) -> Result<()> {
        self.set_limits(&profile.limits)?;
        self.set_ui_restrictions(&profile.ui_restrictions)
    }

    pub fn accounting(&self) -> Result<Accounting> {
        self.job.accounting()
    }

    /// Terminate every member with `exit_code`. Succeeds on an empty group.
    pub fn terminate(&self, exit_code: u32) -> Result<()> {
        self.job.terminate(exit_code)?;
        debug!("Terminated job {} with exit code {}", self.completion_key(), exit_code);
        Ok(())
    }

    /// Route this group's events to `target`, starting the shared
    /// dispatcher on first use. On failure nothing stays registered.
    pub fn associate_notifications(&self, target: &Arc<dyn Target>) -> Result<()> {
        let dispatcher = Dispatcher::shared()?;
        let key = self.completion_key();

        dispatcher.attach(key, target)?;
        if let Err(e) = self.bind_port(dispatcher.queue().raw_handle(), key) {
            dispatcher.detach(key);
            return Err(e);
        }
        self.associated.store(true, Ordering::SeqCst);
        debug!("Associated notifications for job {}", key);
        Ok(())
    }

    /// Stop routing events to the associated target. When this returns no
    /// callback for this group is running or will start, except when called
    /// from inside one of this group's callbacks.
    ///
    /// Concurrent callers each get that guarantee: the detach runs even when
    /// another caller already cleared the flag.
    pub fn deassociate_notifications(&self) {
        let was_associated = self.associated.swap(false, Ordering::SeqCst);
        if !was_associated && !*self.lock_port_bound() {
            return;
        }
        if let Some(dispatcher) = Dispatcher::existing() {
            dispatcher.detach(self.completion_key());
        }
    }

    pub fn is_associated(&self) -> bool {
        self.associated.load(Ordering::SeqCst)
    }

    fn bind_port(&self, port: Option<isize>, key: CompletionKey) -> Result<()> {
        let mut bound = self.lock_port_bound();
        if *bound {
            return Ok(());
        }
        match port {
            Some(port) => self.job.associate_port(port, key)?,
            None => {
                return Err(WincError::CompletionPort(
                    "event queue has no host handle".to_string(),
                ))
            }
        }
        *bound = true;
        Ok(())
    }

    fn lock_port_bound(&self) -> MutexGuard<'_, bool> {
        self.port_bound
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for ResourceGroup {
    fn drop(&mut self) {
        // Detach before the handle closes so a recycled handle value cannot
        // inherit this group's registration.
        self.deassociate_notifications();
    }
}
