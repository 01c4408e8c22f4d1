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

use crate::engine_core::types::ProcessId;

/// Event sink implemented by a container owner.
///
/// Callbacks run on the shared listener thread while the dispatcher's
/// registry lock is held, so delivery is serialized process-wide. Bodies
/// must be short and non-blocking; long work must be handed off (for
/// example through a channel). A callback may call
/// [`Dispatcher::attach`](crate::notify::Dispatcher::attach) or
/// [`Dispatcher::detach`](crate::notify::Dispatcher::detach); those are
/// applied as soon as the callback returns.
///
/// After detaching, an owner must still tolerate at most one final
/// callback that was already being dispatched.
pub trait Target: Send + Sync {
    /// The active process limit was exceeded.
    fn on_active_process_limit(&self) {}

    /// No processes remain in the job.
    fn on_exit_all(&self) {}

    /// A process joined the job.
    fn on_new_process(&self, _pid: ProcessId) {}

    /// A member process exited, normally or abnormally.
    fn on_exit_process(&self, _pid: ProcessId) {}

    /// The job memory ceiling was hit by `pid`.
    fn on_memory_limit(&self, _pid: ProcessId) {}
}
