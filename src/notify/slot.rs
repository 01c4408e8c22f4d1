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

//! Process-wide slot published by compare-and-exchange.
//!
//! Racing initializers each build a candidate; the first to swap it into
//! the empty slot wins and every loser drops its own candidate and adopts
//! the winner. A failed build publishes nothing, so a later caller may try
//! the whole sequence again. Published values live for the rest of the
//! process.

use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use tracing::debug;

pub struct SharedSlot<T> {
    ptr: AtomicPtr<T>,
}

impl<T> SharedSlot<T> {
    pub const fn new() -> Self {
        Self {
            ptr: AtomicPtr::new(ptr::null_mut()),
        }
    }
}

impl<T> Default for SharedSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> SharedSlot<T> {
    pub fn get(&self) -> Option<&'static T> {
        let current = self.ptr.load(Ordering::Acquire);
        // SAFETY: non-null pointers in the slot come from `Box::into_raw` and
        // are never freed once published.
        unsafe { current.as_ref() }
    }

    pub fn get_or_try_init<E, F>(&self, init: F) -> Result<&'static T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(existing) = self.get() {
            return Ok(existing);
        }

        let candidate = Box::into_raw(Box::new(init()?));
        match self.ptr.compare_exchange(
            ptr::null_mut(),
            candidate,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            // SAFETY: `candidate` is now owned by the slot and never freed.
            Ok(_) => Ok(unsafe { &*candidate }),
            Err(winner) => {
                debug!("Lost shared slot publication race; discarding candidate");
                // SAFETY: the swap failed, so `candidate` is still exclusively ours.
                drop(unsafe { Box::from_raw(candidate) });
                // SAFETY: `winner` is a published, never-freed pointer.
                Ok(unsafe { &*winner })
            }
        }
    }
}
