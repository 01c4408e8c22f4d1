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

//! Job event notification: completion queue, listener and routing.

pub mod dispatcher;
pub mod message;
pub mod queue;
pub mod slot;
pub mod target;

pub use dispatcher::Dispatcher;
pub use message::{JobMessage, UnknownCode};
pub use queue::{CompletionQueue, LoopbackQueue, PlatformQueue, RawEvent};
pub use slot::SharedSlot;
pub use target::Target;
