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

use crate::engine_core::errors::{Result, WincError};
use crate::engine_core::types::{CompletionKey, IntegrityLevel, RawProcessHandle};
use crate::job::limits::{Accounting, LimitRecord};
use std::convert::Infallible;

const NO_JOBS: &str = "job objects are not available on this host";
const NO_TOKENS: &str = "access tokens are not available on this host";

/// Uninhabited: `create` always fails on this host.
pub struct JobHandle {
    never: Infallible,
}

impl JobHandle {
    pub fn create() -> Result<Self> {
        Err(WincError::ResourceGroup(NO_JOBS.to_string()))
    }

    pub fn as_raw(&self) -> isize {
        match self.never {}
    }

    pub fn assign(&self, _process: RawProcessHandle) -> Result<()> {
        match self.never {}
    }

    pub fn limits(&self) -> Result<LimitRecord> {
        match self.never {}
    }

    pub fn set_limits(&self, _record: &LimitRecord) -> Result<()> {
        match self.never {}
    }

    pub fn ui_restrictions(&self) -> Result<u32> {
        match self.never {}
    }

    pub fn set_ui_restrictions(&self, _bits: u32) -> Result<()> {
        match self.never {}
    }

    pub fn accounting(&self) -> Result<Accounting> {
        match self.never {}
    }

    pub fn terminate(&self, _exit_code: u32) -> Result<()> {
        match self.never {}
    }

    pub fn associate_port(&self, _port: isize, _key: CompletionKey) -> Result<()> {
        match self.never {}
    }
}

/// Uninhabited: both constructors always fail on this host.
pub struct TokenHandle {
    never: Infallible,
}

impl TokenHandle {
    pub fn current(_level: IntegrityLevel) -> Result<Self> {
        Err(WincError::Logon(NO_TOKENS.to_string()))
    }

    pub fn user(_username: &str, _password: &str, _level: IntegrityLevel) -> Result<Self> {
        Err(WincError::Logon(NO_TOKENS.to_string()))
    }

    pub fn as_raw(&self) -> isize {
        match self.never {}
    }

    pub fn user_sid(&self) -> Result<Vec<u8>> {
        match self.never {}
    }

    pub fn group_sid(&self) -> Result<Vec<u8>> {
        match self.never {}
    }
}

pub fn process_user_sid() -> Result<Vec<u8>> {
    Err(WincError::Sid(NO_TOKENS.to_string()))
}

pub fn process_integrity_sid() -> Result<Vec<u8>> {
    Err(WincError::Sid(NO_TOKENS.to_string()))
}
