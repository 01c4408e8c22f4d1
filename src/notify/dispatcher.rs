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

//! Shared job event dispatcher.
//!
//! One completion queue and one listener thread serve every job object in
//! the process. Jobs are registered by completion key; the listener drains
//! packets in batches and hands each one to the [`Target`] registered for
//! its key. Packets for keys that are not (or no longer) registered are
//! dropped silently.
//!
//! Two locks are involved. The registry lock guards the key map and is only
//! ever held for a lookup or a mutation. The delivery lock is held by the
//! listener from the lookup until the callback returns, and a detach from
//! any other thread takes it before touching the registry. A detach
//! therefore cannot return while a callback for the same key is running,
//! which is what lets an owner tear its target down safely after detaching.
//! The cost is that delivery is serialized across all jobs.
//!
//! Callbacks run on the listener thread, which already holds the delivery
//! lock, so calls made from inside a callback skip it. Every public method
//! may be called from a callback.

use crate::engine_core::constants::listener;
use crate::engine_core::errors::{Result, WincError};
use crate::engine_core::types::CompletionKey;
use crate::notify::message::JobMessage;
use crate::notify::queue::{CompletionQueue, PlatformQueue, RawEvent};
use crate::notify::slot::SharedSlot;
use crate::notify::target::Target;
use std::cell::Cell;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::thread;
use tracing::{debug, error, info, trace};

type Registry = HashMap<CompletionKey, Weak<dyn Target>>;

thread_local! {
    // Address of the dispatcher whose callback is running on this thread, or 0.
    static IN_CALLBACK: Cell<usize> = const { Cell::new(0) };
}

static SHARED: SharedSlot<Dispatcher<PlatformQueue>> = SharedSlot::new();

/// Marks the current thread as running a callback of one dispatcher.
struct CallbackScope {
    previous: usize,
}

impl CallbackScope {
    fn enter(dispatcher: usize) -> Self {
        Self {
            previous: IN_CALLBACK.with(|current| current.replace(dispatcher)),
        }
    }
}

impl Drop for CallbackScope {
    fn drop(&mut self) {
        IN_CALLBACK.with(|current| current.set(self.previous));
    }
}

pub struct Dispatcher<Q: CompletionQueue = PlatformQueue> {
    queue: Q,
    registry: Mutex<Registry>,
    delivery: Mutex<()>,
    listener_started: Mutex<bool>,
    listener_spawns: AtomicUsize,
    delivered: AtomicUsize,
    dropped: AtomicUsize,
}

impl Dispatcher<PlatformQueue> {
    /// The process-wide dispatcher, created and started on first use.
    ///
    /// Concurrent first callers race to publish their own queue; losers
    /// discard theirs. A failure to create the queue or start the listener
    /// is returned to the caller and may be retried by a later call.
    pub fn shared() -> Result<&'static Self> {
        let dispatcher = SHARED.get_or_try_init(|| {
            let dispatcher = Self::open()?;
            debug!("Created candidate job event queue");
            Ok::<_, WincError>(dispatcher)
        })?;
        dispatcher.ensure_listener()?;
        Ok(dispatcher)
    }

    /// The process-wide dispatcher if it has been published.
    pub fn existing() -> Option<&'static Self> {
        SHARED.get()
    }
}

impl<Q: CompletionQueue> Dispatcher<Q> {
    pub fn open() -> Result<Self> {
        Ok(Self::with_queue(Q::open()?))
    }

    pub fn with_queue(queue: Q) -> Self {
        Self {
            queue,
            registry: Mutex::new(HashMap::new()),
            delivery: Mutex::new(()),
            listener_started: Mutex::new(false),
            listener_spawns: AtomicUsize::new(0),
            delivered: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
        }
    }

    /// Start the listener thread unless it is already running.
    pub fn ensure_listener(&'static self) -> Result<()> {
        let mut started = self
            .listener_started
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *started {
            return Ok(());
        }

        thread::Builder::new()
            .name(listener::THREAD_NAME.to_string())
            .spawn(move || self.run())
            .map_err(|e| {
                WincError::CompletionPort(format!("Failed to start listener thread: {}", e))
            })?;

        *started = true;
        self.listener_spawns.fetch_add(1, Ordering::SeqCst);
        info!("Started job event listener thread");
        Ok(())
    }

    /// Register `target` as the owner of packets carrying `key`, replacing
    /// any previous owner. The dispatcher keeps only a weak reference.
    pub fn attach(&self, key: CompletionKey, target: &Arc<dyn Target>) -> Result<()> {
        self.lock_registry().insert(key, Arc::downgrade(target));
        debug!("Attached job events for {}", key);
        Ok(())
    }

    /// Unregister `key`. Once this returns no new callback for `key` will
    /// begin, and any callback already running for it has finished (unless
    /// called from that very callback).
    pub fn detach(&self, key: CompletionKey) {
        let _delivery = if self.in_callback() {
            None
        } else {
            Some(self.lock_delivery())
        };
        if self.lock_registry().remove(&key).is_some() {
            debug!("Detached job events for {}", key);
        }
    }

    pub fn is_attached(&self, key: CompletionKey) -> bool {
        self.lock_registry().contains_key(&key)
    }

    pub fn attached_count(&self) -> usize {
        self.lock_registry().len()
    }

    /// Post a synthetic packet through the queue.
    pub fn post(&self, key: CompletionKey, message: JobMessage) -> Result<()> {
        let (code, value) = message.encode();
        self.queue.post(RawEvent { key, code, value })
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    pub fn listener_spawns(&self) -> usize {
        self.listener_spawns.load(Ordering::SeqCst)
    }

    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }

    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    fn address(&self) -> usize {
        self as *const Self as usize
    }

    fn in_callback(&self) -> bool {
        IN_CALLBACK.with(|current| current.get() == self.address())
    }

    // Panicking callbacks are caught, so the registry is never left half-updated.
    fn lock_registry(&self) -> MutexGuard<'_, Registry> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_delivery(&self) -> MutexGuard<'_, ()> {
        self.delivery
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn run(&'static self) {
        let mut batch = Vec::with_capacity(listener::ENTRIES_PER_CALL);
        loop {
            batch.clear();
            if let Err(e) = self.queue.wait_batch(&mut batch, listener::ENTRIES_PER_CALL) {
                error!("Job event listener stopping: {}", e);
                *self
                    .listener_started
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner()) = false;
                return;
            }
            for event in &batch {
                self.dispatch(*event);
            }
        }
    }

    fn dispatch(&self, event: RawEvent) {
        let message = JobMessage::decode(event.code, event.value);
        let _delivery = self.lock_delivery();

        let target = {
            let mut registry = self.lock_registry();
            match registry.get(&event.key).map(Weak::upgrade) {
                Some(Some(target)) => target,
                Some(None) => {
                    registry.remove(&event.key);
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    trace!("Dropped {:?} for {}: target gone", message, event.key);
                    return;
                }
                None => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    trace!("Dropped {:?} for unregistered {}", message, event.key);
                    return;
                }
            }
        };

        // The last strong reference may be released here, so the target's
        // drop also runs inside the scope and may detach.
        let outcome = {
            let _scope = CallbackScope::enter(self.address());
            panic::catch_unwind(AssertUnwindSafe(move || {
                let routed = message.deliver(target.as_ref());
                drop(target);
                routed
            }))
        };

        match outcome {
            Ok(true) => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Ok(false) => trace!("Ignored {:?} for {}", message, event.key),
            Err(_) => error!("Target callback panicked on {:?} for {}", message, event.key),
        }
    }
}
